use crate::store::UserStore;

/// Stable identity of a card; equal to the user's index in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardHandle(usize);

impl CardHandle {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

/// Summary of one user as shown in the gallery grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub handle: CardHandle,
    pub name: String,
    pub email: String,
    pub location: String,
    pub image_url: String,
    pub visible: bool,
}

#[derive(Debug, Default)]
pub struct Gallery {
    cards: Vec<Card>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one card per stored user, in store order.
    ///
    /// Existing cards are kept, so rendering twice duplicates the grid.
    pub fn render(&mut self, store: &UserStore) {
        let start = self.cards.len();
        self.cards
            .extend(store.iter().enumerate().map(|(index, user)| Card {
                handle: CardHandle::new(index),
                name: user.display_name(),
                email: user.email.clone(),
                location: user.location_line(),
                image_url: user.picture.medium.clone(),
                visible: true,
            }));
        tracing::debug!(added = self.cards.len() - start, "cards rendered");
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub(crate) fn cards_mut(&mut self) -> &mut [Card] {
        &mut self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter().filter(|card| card.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn visible_handles(&self) -> Vec<CardHandle> {
        self.visible().map(|card| card.handle).collect()
    }

    /// Move `delta` visible cards away from `from`, stopping at either end.
    ///
    /// Falls back to the first visible card when `from` is hidden or unset.
    pub fn step(&self, from: Option<CardHandle>, delta: isize) -> Option<CardHandle> {
        let handles = self.visible_handles();
        if handles.is_empty() {
            return None;
        }
        let Some(position) = from.and_then(|handle| handles.iter().position(|h| *h == handle))
        else {
            return handles.first().copied();
        };
        let last = handles.len() as isize - 1;
        let target = (position as isize + delta).clamp(0, last);
        handles.get(target as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    fn store_of(names: &[(&str, &str)]) -> UserStore {
        let users = names
            .iter()
            .map(|(first, last)| {
                let mut user = User::default();
                user.name.first = first.to_string();
                user.name.last = last.to_string();
                user.email = format!("{}@example.com", first.to_lowercase());
                user.location.city = "Reno".into();
                user.location.state = "Nevada".into();
                user
            })
            .collect();
        let mut store = UserStore::new();
        store.load(users);
        store
    }

    #[test]
    fn render_projects_users_in_order() {
        let store = store_of(&[("Ann", "Lee"), ("Bob", "Lee")]);
        let mut gallery = Gallery::new();
        gallery.render(&store);

        let cards = gallery.cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].handle, CardHandle::new(0));
        assert_eq!(cards[0].name, "Ann Lee");
        assert_eq!(cards[0].email, "ann@example.com");
        assert_eq!(cards[0].location, "Reno, Nevada");
        assert_eq!(cards[1].handle.index(), 1);
        assert!(cards.iter().all(|card| card.visible));
    }

    #[test]
    fn render_twice_duplicates() {
        let store = store_of(&[("Ann", "Lee")]);
        let mut gallery = Gallery::new();
        gallery.render(&store);
        gallery.render(&store);
        assert_eq!(gallery.cards().len(), 2);
    }

    #[test]
    fn render_of_empty_store_adds_nothing() {
        let mut gallery = Gallery::new();
        gallery.render(&UserStore::new());
        assert!(gallery.is_empty());
        assert_eq!(gallery.step(None, 1), None);
    }

    #[test]
    fn step_skips_hidden_cards_and_clamps() {
        let store = store_of(&[("A", "x"), ("B", "x"), ("C", "x"), ("D", "x")]);
        let mut gallery = Gallery::new();
        gallery.render(&store);
        gallery.cards_mut()[1].visible = false;

        let first = CardHandle::new(0);
        assert_eq!(gallery.step(Some(first), 1), Some(CardHandle::new(2)));
        assert_eq!(gallery.step(Some(first), -1), Some(first));
        assert_eq!(gallery.step(Some(first), 10), Some(CardHandle::new(3)));
        assert_eq!(gallery.step(Some(CardHandle::new(1)), 1), Some(first));
        assert_eq!(gallery.step(None, 0), Some(first));
    }
}
