//! A seat at the table.
//!
//! Grounded in the original `player.go`/`pile.go` (name, active flag,
//! ordered hand as a "pile") and the teacher's `poker-core::poker::Player`
//! for the Rust shape (plain struct, mutated only by its owning `Game`).

use crate::card::Card;
use crate::session::SessionHandle;

/// One seat in a [`crate::game::Game`].
///
/// The session reference is non-owning — a player's connection can drop
/// and the seat lives on as an inactive participant (§3 "Lifecycles").
pub struct Player {
    pub name: String,
    pub is_active: bool,
    pub is_completed: bool,
    pub hand: Vec<Card>,
    session: Option<SessionHandle>,
}

impl Player {
    pub fn new(name: impl Into<String>, session: Option<SessionHandle>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
            is_completed: false,
            hand: Vec::new(),
            session,
        }
    }

    /// A late-joining spectator/participant: inactive until an explicit
    /// activation the current protocol does not provide (§9 open question).
    pub fn new_inactive(name: impl Into<String>, session: Option<SessionHandle>) -> Self {
        let mut player = Self::new(name, session);
        player.is_active = false;
        player
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    pub fn set_session(&mut self, session: Option<SessionHandle>) {
        self.session = session;
    }

    pub fn has_card(&self, card: &Card) -> bool {
        self.hand.contains(card)
    }

    /// Remove `card` from hand; `false` if the player didn't hold it.
    pub fn remove_card(&mut self, card: &Card) -> bool {
        if let Some(pos) = self.hand.iter().position(|c| c == card) {
            self.hand.remove(pos);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Suit, Value};

    #[test]
    fn remove_card_reports_whether_it_was_held() {
        let mut p = Player::new("Alice", None);
        p.hand.push(Card::new(Value::Six, Suit::Clubs));
        assert!(p.remove_card(&Card::new(Value::Six, Suit::Clubs)));
        assert!(!p.remove_card(&Card::new(Value::Six, Suit::Clubs)));
        assert!(p.hand.is_empty());
    }

    #[test]
    fn new_inactive_starts_inactive() {
        let p = Player::new_inactive("Late Joiner", None);
        assert!(!p.is_active);
        assert!(!p.is_completed);
    }
}
