use crate::store::{StoreError, UserStore};
use crate::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Hidden,
    Visible(usize),
}

/// Every field the detail popup shows for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetail {
    pub image_url: String,
    pub heading: String,
    pub email: String,
    pub city: String,
    pub phone: String,
    pub address: String,
    pub birthday: String,
}

impl From<&User> for UserDetail {
    fn from(user: &User) -> Self {
        Self {
            image_url: user.picture.large.clone(),
            heading: user.heading(),
            email: user.email.clone(),
            city: user.location.city.clone(),
            phone: user.contact_phone().to_string(),
            address: user.address_line(),
            birthday: user.birth_date(),
        }
    }
}

impl UserDetail {
    /// Labelled rows below the heading, in display order. The contact rows
    /// come first; everything from `Phone` on sits below the separator.
    pub fn rows(&self) -> [(&'static str, &str); 5] {
        [
            ("Email", &self.email),
            ("City", &self.city),
            ("Phone", &self.phone),
            ("Address", &self.address),
            ("Birthday", &self.birthday),
        ]
    }
}

pub const CONTACT_ROWS: usize = 2;

/// Wrap `index` into `0..len`. `None` when there is nothing to wrap into.
pub fn normalize(index: isize, len: usize) -> Option<usize> {
    let len = isize::try_from(len).ok().filter(|len| *len > 0)?;
    Some(index.rem_euclid(len) as usize)
}

/// Hidden / Visible(index) state machine behind the detail popup.
#[derive(Debug, Default)]
pub struct ModalController {
    state: ModalState,
    detail: Option<UserDetail>,
}

impl ModalController {
    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, ModalState::Visible(_))
    }

    pub fn detail(&self) -> Option<&UserDetail> {
        self.detail.as_ref()
    }

    /// Show the user at `index`, wrapping it into range first. The state is
    /// left untouched when the store has nothing to show.
    pub fn open(&mut self, store: &UserStore, index: isize) -> Result<usize, StoreError> {
        let target = normalize(index, store.len()).ok_or(StoreError::OutOfRange {
            index,
            len: store.len(),
        })?;
        let user = store.get(target as isize)?;
        self.detail = Some(UserDetail::from(user));
        self.state = ModalState::Visible(target);
        Ok(target)
    }

    pub fn next(&mut self, store: &UserStore) -> Result<Option<usize>, StoreError> {
        self.step(store, 1)
    }

    pub fn prev(&mut self, store: &UserStore) -> Result<Option<usize>, StoreError> {
        self.step(store, -1)
    }

    fn step(&mut self, store: &UserStore, delta: isize) -> Result<Option<usize>, StoreError> {
        match self.state {
            ModalState::Hidden => Ok(None),
            ModalState::Visible(current) => self.open(store, current as isize + delta).map(Some),
        }
    }

    pub fn close(&mut self) {
        self.state = ModalState::Hidden;
        self.detail = None;
    }
}
