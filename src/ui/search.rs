use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::store::UserStore;

use super::gallery::Gallery;

/// Show every card whose user's first or last name contains `query`,
/// ignoring case, and hide the rest. Returns the number left visible.
///
/// An empty query matches everyone. Cards whose user cannot be found are
/// hidden.
pub fn apply(query: &str, store: &UserStore, gallery: &mut Gallery) -> usize {
    let needle = query.to_lowercase();
    let mut shown = 0;
    for card in gallery.cards_mut() {
        card.visible = store
            .get(card.handle.index() as isize)
            .map(|user| user.matches_name(&needle))
            .unwrap_or(false);
        if card.visible {
            shown += 1;
        }
    }
    tracing::debug!(query, shown, "search applied");
    shown
}

/// The search line: a single-line text input.
#[derive(Default)]
pub struct SearchBox {
    input: Input,
}

impl SearchBox {
    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Feed a key to the input. Returns `Some(changed)` when the key was
    /// consumed, where `changed` reports whether the text itself changed.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<bool> {
        self.input
            .handle_event(&Event::Key(key))
            .map(|change| change.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn loaded(names: &[(&str, &str)]) -> (UserStore, Gallery) {
        let users = names
            .iter()
            .map(|(first, last)| {
                let mut user = User::default();
                user.name.first = first.to_string();
                user.name.last = last.to_string();
                user
            })
            .collect();
        let mut store = UserStore::new();
        store.load(users);
        let mut gallery = Gallery::new();
        gallery.render(&store);
        (store, gallery)
    }

    fn visibility(gallery: &Gallery) -> Vec<bool> {
        gallery.cards().iter().map(|card| card.visible).collect()
    }

    #[test]
    fn matches_last_name_case_insensitively() {
        let (store, mut gallery) = loaded(&[("Ann", "Lee"), ("Bob", "Lee"), ("Cid", "Fox")]);
        assert_eq!(apply("lee", &store, &mut gallery), 2);
        assert_eq!(visibility(&gallery), vec![true, true, false]);
        assert_eq!(apply("LEE", &store, &mut gallery), 2);
    }

    #[test]
    fn matches_first_name_substring() {
        let (store, mut gallery) = loaded(&[("Ann", "Lee"), ("Joanna", "Fox"), ("Cid", "Fox")]);
        apply("ann", &store, &mut gallery);
        assert_eq!(visibility(&gallery), vec![true, true, false]);
    }

    #[test]
    fn empty_query_shows_everything_again() {
        let (store, mut gallery) = loaded(&[("Ann", "Lee"), ("Cid", "Fox")]);
        apply("zzz", &store, &mut gallery);
        assert_eq!(visibility(&gallery), vec![false, false]);
        assert_eq!(apply("", &store, &mut gallery), 2);
        assert_eq!(visibility(&gallery), vec![true, true]);
    }

    #[test]
    fn does_not_match_across_first_and_last() {
        let (store, mut gallery) = loaded(&[("Ann", "Lee")]);
        assert_eq!(apply("ann lee", &store, &mut gallery), 0);
    }

    #[test]
    fn before_load_is_inert() {
        let store = UserStore::new();
        let mut gallery = Gallery::new();
        assert_eq!(apply("lee", &store, &mut gallery), 0);
        assert!(gallery.is_empty());
    }

    #[test]
    fn search_box_reports_value_changes() {
        let mut search = SearchBox::default();
        let typed = search.handle_key_event(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE));
        assert_eq!(typed, Some(true));
        assert_eq!(search.value(), "l");
        let moved = search.handle_key_event(KeyEvent::new(KeyCode::Left, KeyModifiers::NONE));
        assert_eq!(moved, Some(false));
        assert_eq!(search.visual_cursor(), 0);
    }
}
