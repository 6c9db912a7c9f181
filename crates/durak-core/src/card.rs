//! Cards and the deck they are dealt from.
//!
//! Mirrors the 36-card French deck used by the original `rnixik/durak`
//! implementation (`card.go`, `deck.go`): ranks `6` through `A`, four suits.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A card rank. Discriminants are the rank's position in [`VALUES`], so
/// `value_index` is a plain cast rather than a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    #[serde(rename = "6")]
    Six = 0,
    #[serde(rename = "7")]
    Seven = 1,
    #[serde(rename = "8")]
    Eight = 2,
    #[serde(rename = "9")]
    Nine = 3,
    #[serde(rename = "10")]
    Ten = 4,
    #[serde(rename = "J")]
    Jack = 5,
    #[serde(rename = "Q")]
    Queen = 6,
    #[serde(rename = "K")]
    King = 7,
    #[serde(rename = "A")]
    Ace = 8,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Value::Six => "6",
            Value::Seven => "7",
            Value::Eight => "8",
            Value::Nine => "9",
            Value::Ten => "10",
            Value::Jack => "J",
            Value::Queen => "Q",
            Value::King => "K",
            Value::Ace => "A",
        };
        f.write_str(s)
    }
}

/// A card suit, in the order the deck is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Suit {
    #[default]
    #[serde(rename = "♣")]
    Clubs,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♠")]
    Spades,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Suit::Clubs => "♣",
            Suit::Diamonds => "♦",
            Suit::Hearts => "♥",
            Suit::Spades => "♠",
        };
        f.write_str(s)
    }
}

/// The nine ranks present in a 36-card Durak deck, in ascending order.
pub const VALUES: [Value; 9] = [
    Value::Six,
    Value::Seven,
    Value::Eight,
    Value::Nine,
    Value::Ten,
    Value::Jack,
    Value::Queen,
    Value::King,
    Value::Ace,
];

/// The four suits, in the order the deck is built.
pub const SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

/// A single playing card.
///
/// Comparison (`gt`/`lt`/...) is only meaningful within the same suit —
/// ranking across suits requires knowing the trump suit, which lives on
/// [`crate::game::Game`], not on the card itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub value: Value,
    pub suit: Suit,
}

impl Card {
    pub fn new(value: Value, suit: Suit) -> Self {
        Self { value, suit }
    }

    /// Index of this card's rank within [`VALUES`].
    pub fn value_index(&self) -> i32 {
        self.value as i32
    }

    /// `true` if this card strictly outranks `other` — same suit required.
    pub fn gt(&self, other: &Card) -> bool {
        self.suit == other.suit && self.value_index() > other.value_index()
    }

    /// `true` if this card outranks or ties `other` — same suit required.
    pub fn gte(&self, other: &Card) -> bool {
        self.suit == other.suit && self.value_index() >= other.value_index()
    }

    /// `true` if this card is strictly outranked by `other` — same suit required.
    pub fn lt(&self, other: &Card) -> bool {
        self.suit == other.suit && self.value_index() < other.value_index()
    }

    /// `true` if this card is outranked by or ties `other` — same suit required.
    pub fn lte(&self, other: &Card) -> bool {
        self.suit == other.suit && self.value_index() <= other.value_index()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.suit)
    }
}

/// Thrown when an operation needs a card but none is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeckError {
    #[error("no cards left in deck")]
    Empty,
}

/// The ordered talon cards are drawn from, top of the deck at the back
/// of the `Vec` (so `draw` is an O(1) `pop`).
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Build the full 36-card cross product of [`VALUES`] × [`SUITS`].
    pub fn new() -> Self {
        let mut cards = Vec::with_capacity(VALUES.len() * SUITS.len());
        for value in VALUES {
            for suit in SUITS {
                cards.push(Card::new(value, suit));
            }
        }
        Self { cards }
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle(&mut self, rng: &mut impl rand::Rng) {
        self.cards.shuffle(rng);
    }

    /// Draw the top card, or [`DeckError::Empty`] if the deck is exhausted.
    pub fn draw(&mut self) -> Result<Card, DeckError> {
        self.cards.pop().ok_or(DeckError::Empty)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Peek the bottom card (the last one that will be dealt) without
    /// removing it — used to expose the visible trump card while it still
    /// sits in the deck.
    pub fn bottom(&self) -> Option<&Card> {
        self.cards.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn new_deck_has_36_unique_cards() {
        let deck = Deck::new();
        assert_eq!(deck.len(), 36);
        let mut seen = std::collections::HashSet::new();
        for v in VALUES {
            for s in SUITS {
                assert!(seen.insert((v, s)));
            }
        }
    }

    #[test]
    fn draw_removes_top_card_and_errors_when_empty() {
        let mut deck = Deck::new();
        let mut drawn = Vec::new();
        for _ in 0..36 {
            drawn.push(deck.draw().unwrap());
        }
        assert_eq!(deck.draw(), Err(DeckError::Empty));
        assert_eq!(drawn.len(), 36);
    }

    #[test]
    fn shuffle_preserves_the_multiset_of_cards() {
        let mut deck = Deck::new();
        let before: std::collections::HashSet<_> = deck.clone().into_iter_cards().collect();
        let mut rng = StdRng::seed_from_u64(42);
        deck.shuffle(&mut rng);
        let after: std::collections::HashSet<_> = deck.into_iter_cards().collect();
        assert_eq!(before, after);
    }

    #[test]
    fn comparison_is_only_meaningful_within_a_suit() {
        let six_clubs = Card::new(Value::Six, Suit::Clubs);
        let ace_diamonds = Card::new(Value::Ace, Suit::Diamonds);
        assert!(!six_clubs.gt(&ace_diamonds));
        assert!(!six_clubs.lt(&ace_diamonds));

        let seven_clubs = Card::new(Value::Seven, Suit::Clubs);
        assert!(seven_clubs.gt(&six_clubs));
        assert!(six_clubs.lt(&seven_clubs));
        assert!(six_clubs.lte(&six_clubs));
        assert!(six_clubs.gte(&six_clubs));
    }

    impl Deck {
        fn into_iter_cards(self) -> impl Iterator<Item = Card> {
            self.cards.into_iter()
        }
    }
}
