use crate::store::{StoreError, UserStore};
use crate::user::User;

use super::gallery::{CardHandle, Gallery};
use super::modal::{ModalController, ModalState};
use super::search;

/// Named user intents. Every click, keystroke and submit ends up as one of
/// these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Open(CardHandle),
    Next,
    Prev,
    Close,
    Search(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Modal(ModalState),
    Filtered { visible: usize },
}

/// State shared by the gallery, the search line and the detail popup.
#[derive(Debug, Default)]
pub struct Session {
    store: UserStore,
    gallery: Gallery,
    modal: ModalController,
    query: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the fetched users and build their cards.
    ///
    /// Whatever was typed into the search line while loading is applied to
    /// the fresh cards.
    pub fn load(&mut self, users: Vec<User>) {
        self.store.load(users);
        self.gallery.render(&self.store);
        search::apply(&self.query, &self.store, &mut self.gallery);
    }

    pub fn store(&self) -> &UserStore {
        &self.store
    }

    pub fn gallery(&self) -> &Gallery {
        &self.gallery
    }

    pub fn modal(&self) -> &ModalController {
        &self.modal
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn dispatch(&mut self, action: Action) -> Result<Outcome, StoreError> {
        match action {
            Action::Open(handle) => {
                self.modal.open(&self.store, handle.index() as isize)?;
            }
            Action::Next => {
                self.modal.next(&self.store)?;
            }
            Action::Prev => {
                self.modal.prev(&self.store)?;
            }
            Action::Close => self.modal.close(),
            Action::Search(query) => {
                let visible = search::apply(&query, &self.store, &mut self.gallery);
                self.query = query;
                return Ok(Outcome::Filtered { visible });
            }
        }
        Ok(Outcome::Modal(self.modal.state()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(first: &str, last: &str) -> User {
        let mut user = User::default();
        user.name.first = first.to_string();
        user.name.last = last.to_string();
        user
    }

    fn three_users() -> Session {
        let mut session = Session::new();
        session.load(vec![
            person("Ann", "Lee"),
            person("Bob", "Lee"),
            person("Cid", "Fox"),
        ]);
        session
    }

    #[test]
    fn search_for_lee_hides_only_the_fox() {
        let mut session = three_users();
        let outcome = session.dispatch(Action::Search("lee".into())).unwrap();
        assert_eq!(outcome, Outcome::Filtered { visible: 2 });
        assert_eq!(
            session.gallery().visible_handles(),
            vec![CardHandle::new(0), CardHandle::new(1)]
        );
        assert_eq!(session.query(), "lee");
    }

    #[test]
    fn wraparound_forward_and_backward() {
        let mut session = three_users();
        session.dispatch(Action::Open(CardHandle::new(2))).unwrap();
        assert_eq!(
            session.dispatch(Action::Next).unwrap(),
            Outcome::Modal(ModalState::Visible(0))
        );

        session.dispatch(Action::Open(CardHandle::new(0))).unwrap();
        assert_eq!(
            session.dispatch(Action::Prev).unwrap(),
            Outcome::Modal(ModalState::Visible(2))
        );
    }

    #[test]
    fn close_twice_stays_hidden() {
        let mut session = three_users();
        session.dispatch(Action::Open(CardHandle::new(1))).unwrap();
        for _ in 0..2 {
            assert_eq!(
                session.dispatch(Action::Close).unwrap(),
                Outcome::Modal(ModalState::Hidden)
            );
        }
    }

    #[test]
    fn actions_before_load_are_inert() {
        let mut session = Session::new();
        assert_eq!(
            session.dispatch(Action::Search("lee".into())).unwrap(),
            Outcome::Filtered { visible: 0 }
        );
        assert!(session.dispatch(Action::Open(CardHandle::new(0))).is_err());
        assert_eq!(
            session.dispatch(Action::Next).unwrap(),
            Outcome::Modal(ModalState::Hidden)
        );
        assert_eq!(
            session.dispatch(Action::Prev).unwrap(),
            Outcome::Modal(ModalState::Hidden)
        );
        assert_eq!(session.modal().state(), ModalState::Hidden);
        assert!(session.gallery().is_empty());
    }

    #[test]
    fn query_typed_during_fetch_applies_on_load() {
        let mut session = Session::new();
        session.dispatch(Action::Search("fox".into())).unwrap();
        session.load(vec![person("Ann", "Lee"), person("Cid", "Fox")]);
        assert_eq!(session.gallery().visible_handles(), vec![CardHandle::new(1)]);
    }

    #[test]
    fn modal_navigation_ignores_search_filter() {
        let mut session = three_users();
        session.dispatch(Action::Search("fox".into())).unwrap();
        session.dispatch(Action::Open(CardHandle::new(2))).unwrap();
        assert_eq!(
            session.dispatch(Action::Next).unwrap(),
            Outcome::Modal(ModalState::Visible(0))
        );
    }
}
