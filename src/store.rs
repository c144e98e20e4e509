use thiserror::Error;

use crate::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("user index {index} out of range (store holds {len} users)")]
    OutOfRange { index: isize, len: usize },
}

/// The users fetched for this session, in API order.
///
/// Starts empty and is replaced in one go when the fetch completes.
#[derive(Debug, Default)]
pub struct UserStore {
    users: Vec<User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, users: Vec<User>) {
        self.users = users;
    }

    pub fn get(&self, index: isize) -> Result<&User, StoreError> {
        usize::try_from(index)
            .ok()
            .and_then(|idx| self.users.get(idx))
            .ok_or(StoreError::OutOfRange {
                index,
                len: self.users.len(),
            })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }
}
