//! The in-process AI participant: `Bot` (decision policy) plus `BotClient`
//! (the session wrapper the engine talks to).
//!
//! Grounded in `bot.go`/`bot_client.go`: two cooperative tasks — one
//! forwards the bot's chosen action into the Game's action queue, the
//! other is the decision loop reacting to incoming events — and a mirrored
//! `GameStateInfo` the bot keeps locally rather than reading Game state
//! directly (§4.4, §5 "duck-typed session abstraction").

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::card::{Card, Suit};
use crate::game::{GameHandle, PlayerAction};
use crate::protocol::{GameStateInfo, ServerEvent};
use crate::session::ClientSender;

/// Below this `tablePickUpValue`, the bot still considers the table safe
/// enough to throw another card (§4.4 step 3).
const PICK_UP_THRESHOLD: f64 = 0.25;

/// The session-facing half: implements [`ClientSender`] so the engine
/// cannot tell a bot from a remote player. `send_event` only pushes onto
/// an unbounded channel — never blocks.
pub struct BotClient {
    id: u64,
    nickname: String,
    incoming_tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ClientSender for BotClient {
    fn send_event(&self, event: &ServerEvent) {
        let _ = self.incoming_tx.send(event.clone());
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn nickname(&self) -> String {
        self.nickname.clone()
    }
}

/// Spawn a bot: returns the session handle Room/Lobby treat like any other
/// participant, plus the join handle of its decision-loop task (dropped by
/// most callers — the task tears itself down when its event channel closes).
pub fn spawn_bot_client(
    id: u64,
    nickname: String,
    game: GameHandle,
) -> (Arc<BotClient>, tokio::task::JoinHandle<()>) {
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let client = Arc::new(BotClient {
        id,
        nickname,
        incoming_tx,
    });

    let join = tokio::spawn(bot_decision_loop(incoming_rx, game));
    (client, join)
}

async fn bot_decision_loop(
    mut incoming_rx: mpsc::UnboundedReceiver<ServerEvent>,
    game: GameHandle,
) {
    let mut bot = Bot::default();
    while let Some(event) = incoming_rx.recv().await {
        bot.on_event(&event);
        if let Some(action) = bot.make_decision() {
            game.send(action);
        }
    }
}

/// The decision policy's private state — a mirror of the game, not a view
/// into it (§4.4: the bot consumes the same event stream a remote client
/// would see, never reaches into `Game` fields directly).
#[derive(Default)]
struct Bot {
    my_seat: Option<usize>,
    state: Option<GameStateInfo>,
    trump_suit: Suit,
    game_was_started: bool,
    game_is_over: bool,
    my_unbeaten_cards: HashSet<Card>,
    initial_players_num: usize,
}

impl Bot {
    fn on_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::GamePlayersEvent {
                your_player_index, ..
            } => {
                self.my_seat = Some(*your_player_index as usize);
            }
            ServerEvent::GameDealEvent { state, .. } => {
                self.initial_players_num = state.hand_sizes.len();
                if let Some(card) = &state.trump_card {
                    self.trump_suit = card.suit;
                }
                self.game_was_started = true;
                self.state = Some(state.clone());
            }
            ServerEvent::GameFirstAttackerEvent { state, .. }
            | ServerEvent::GameStartedEvent { state }
            | ServerEvent::GameStateEvent { state }
            | ServerEvent::GameAttackEvent { state, .. }
            | ServerEvent::GameDefendEvent { state, .. } => {
                self.state = Some(state.clone());
            }
            ServerEvent::NewRoundEvent { state } => {
                self.my_unbeaten_cards.clear();
                self.state = Some(state.clone());
            }
            ServerEvent::GameEndEvent { .. } => {
                self.game_is_over = true;
            }
            _ => {}
        }

        if let ServerEvent::GameAttackEvent {
            attacker_index,
            card,
            ..
        } = event
        {
            if Some(*attacker_index) == self.my_seat {
                self.my_unbeaten_cards.insert(*card);
            }
        }
        if let ServerEvent::GameDefendEvent { attacking_card, .. } = event {
            self.my_unbeaten_cards.remove(attacking_card);
        }
    }

    fn make_decision(&mut self) -> Option<PlayerAction> {
        let seat = self.my_seat?;
        if self.game_is_over || !self.game_was_started {
            return None;
        }
        let state = self.state.clone()?;
        if state.hand_sizes.len() < 2 {
            return None;
        }

        if state.defender_pick_up {
            self.my_unbeaten_cards.clear();
        }

        if state.can_attack {
            return self.decide_attack(seat, &state);
        }
        if state.can_defend {
            return self.decide_defend(seat, &state);
        }
        if state.can_complete {
            return Some(PlayerAction::Complete { seat });
        }
        None
    }

    fn decide_attack(&mut self, seat: usize, state: &GameStateInfo) -> Option<PlayerAction> {
        if state.battleground.is_empty() {
            let card = find_lowest_card(&state.your_hand, self.trump_suit)?;
            self.my_unbeaten_cards.insert(card);
            return Some(PlayerAction::Attack { seat, card });
        }

        let base_value = table_pick_up_value(state, self.initial_players_num, self.trump_suit, None);
        if base_value >= PICK_UP_THRESHOLD {
            return None;
        }
        let card = find_lowest_card(&state.your_hand, self.trump_suit)?;
        let with_card = table_pick_up_value(
            state,
            self.initial_players_num,
            self.trump_suit,
            Some(card),
        );
        if with_card >= PICK_UP_THRESHOLD {
            return None;
        }
        self.my_unbeaten_cards.insert(card);
        Some(PlayerAction::Attack { seat, card })
    }

    fn decide_defend(&self, seat: usize, state: &GameStateInfo) -> Option<PlayerAction> {
        for (idx, attacking_card) in state.battleground.iter().enumerate() {
            if state.defending_cards.contains_key(&idx) {
                continue;
            }
            return match find_best_defense(attacking_card, &state.your_hand, self.trump_suit) {
                Some(defending_card) => Some(PlayerAction::Defend {
                    seat,
                    attacking_card: *attacking_card,
                    defending_card,
                }),
                None => Some(PlayerAction::PickUp { seat }),
            };
        }
        None
    }
}

/// Prefers non-trump over trump; within the same suit-class, lower rank
/// wins (§4.4 `findLowestCard`).
fn find_lowest_card(hand: &[Card], trump_suit: Suit) -> Option<Card> {
    hand.iter()
        .copied()
        .min_by_key(|c| (c.suit == trump_suit, c.value_index()))
}

fn beats_under_trump(attacking_card: &Card, candidate: &Card, trump_suit: Suit) -> bool {
    if attacking_card.suit == trump_suit {
        candidate.suit == trump_suit && candidate.value_index() > attacking_card.value_index()
    } else {
        candidate.suit == trump_suit
            || (candidate.suit == attacking_card.suit
                && candidate.value_index() > attacking_card.value_index())
    }
}

fn find_best_defense(attacking_card: &Card, hand: &[Card], trump_suit: Suit) -> Option<Card> {
    hand.iter()
        .copied()
        .filter(|dc| beats_under_trump(attacking_card, dc, trump_suit))
        .min_by_key(|c| (c.suit == trump_suit, c.value_index()))
}

fn card_power(card: &Card, trump_suit: Suit) -> i32 {
    let idx = card.value_index();
    if card.suit == trump_suit { idx + 9 } else { idx }
}

/// Sum of the `n` highest powers obtainable — trump ranks (9..=17) exhaust
/// before non-trump ranks (0..=8) contribute.
fn max_possible_power(n: usize) -> f64 {
    let mut powers: Vec<i32> = (0..9).map(|i| i + 9).chain(0..9).collect();
    powers.sort_unstable_by(|a, b| b.cmp(a));
    powers.into_iter().take(n).map(|p| p as f64).sum()
}

/// `deckRemainsIndex × cardsPowerIndex` (§4.4) — how "dangerous" it looks
/// to keep feeding the table another card.
fn table_pick_up_value(
    state: &GameStateInfo,
    initial_players: usize,
    trump_suit: Suit,
    additional: Option<Card>,
) -> f64 {
    let deck_remains_index = if initial_players < 6 && initial_players > 0 {
        let denom = (36 - 6 * initial_players) as f64;
        if denom > 0.0 {
            (state.deck_remaining as f64 / denom).clamp(0.0, 1.0)
        } else {
            0.0
        }
    } else {
        0.0
    };

    let mut table_cards: Vec<Card> = state.battleground.clone();
    table_cards.extend(state.defending_cards.values().copied());
    if let Some(card) = additional {
        table_cards.push(card);
    }
    let n = table_cards.len();

    let attack_rate_index = if n == 0 {
        0.0
    } else {
        let sum: i32 = table_cards.iter().map(|c| card_power(c, trump_suit)).sum();
        let max_possible = max_possible_power(n);
        if max_possible > 0.0 {
            sum as f64 / max_possible
        } else {
            0.0
        }
    };

    let mut counts: HashMap<crate::card::Value, usize> = HashMap::new();
    for c in &table_cards {
        *counts.entry(c.value).or_insert(0) += 1;
    }
    let buckets = (n / 2).max(1) as f64;
    let triplets_index = counts.values().filter(|&&c| c >= 3).count() as f64 / buckets;
    let quartets_index = counts.values().filter(|&&c| c >= 4).count() as f64 / buckets;

    let cards_power_index = (10.0 * attack_rate_index + triplets_index + 2.0 * quartets_index) / 13.0;

    deck_remains_index * cards_power_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Value;

    #[test]
    fn find_lowest_card_prefers_non_trump() {
        let hand = vec![
            Card::new(Value::Six, Suit::Diamonds),
            Card::new(Value::Ace, Suit::Clubs),
        ];
        let lowest = find_lowest_card(&hand, Suit::Diamonds).unwrap();
        assert_eq!(lowest, Card::new(Value::Ace, Suit::Clubs));
    }

    #[test]
    fn find_best_defense_prefers_non_trump_and_lowest_rank() {
        let attacking = Card::new(Value::Eight, Suit::Clubs);
        let hand = vec![
            Card::new(Value::Nine, Suit::Clubs),
            Card::new(Value::Six, Suit::Diamonds),
            Card::new(Value::Ace, Suit::Clubs),
        ];
        let defense = find_best_defense(&attacking, &hand, Suit::Diamonds).unwrap();
        assert_eq!(defense, Card::new(Value::Nine, Suit::Clubs));
    }

    #[test]
    fn find_best_defense_returns_none_with_no_beating_card() {
        let attacking = Card::new(Value::Ace, Suit::Clubs);
        let hand = vec![Card::new(Value::Nine, Suit::Clubs)];
        assert!(find_best_defense(&attacking, &hand, Suit::Diamonds).is_none());
    }

    #[test]
    fn table_pick_up_value_is_zero_with_an_empty_table() {
        let state = GameStateInfo::default();
        let value = table_pick_up_value(&state, 2, Suit::Diamonds, None);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn decide_attack_throws_lowest_card_onto_an_empty_battleground() {
        let mut bot = Bot {
            my_seat: Some(0),
            trump_suit: Suit::Diamonds,
            game_was_started: true,
            initial_players_num: 2,
            ..Default::default()
        };
        let mut state = GameStateInfo {
            your_hand: vec![
                Card::new(Value::Nine, Suit::Clubs),
                Card::new(Value::Six, Suit::Clubs),
            ],
            hand_sizes: vec![2, 2],
            can_attack: true,
            ..Default::default()
        };
        state.trump_card = Some(Card::new(Value::Six, Suit::Diamonds));
        let action = bot.decide_attack(0, &state);
        match action {
            Some(PlayerAction::Attack { card, .. }) => {
                assert_eq!(card, Card::new(Value::Six, Suit::Clubs))
            }
            other => panic!("expected an attack, got a different decision: {}", other.is_some()),
        }
    }

    #[test]
    fn decide_defend_picks_up_when_no_card_beats_the_attack() {
        let bot = Bot {
            my_seat: Some(1),
            trump_suit: Suit::Diamonds,
            game_was_started: true,
            ..Default::default()
        };
        let state = GameStateInfo {
            your_hand: vec![Card::new(Value::Six, Suit::Clubs)],
            battleground: vec![Card::new(Value::Ace, Suit::Clubs)],
            can_defend: true,
            ..Default::default()
        };
        match bot.decide_defend(1, &state) {
            Some(PlayerAction::PickUp { seat }) => assert_eq!(seat, 1),
            other => panic!("expected a pick up, got: {}", other.is_some()),
        }
    }
}
