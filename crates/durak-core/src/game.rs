//! The authoritative rule engine — the largest single module, grounded in
//! `game.go`'s attack/defend/pickup/complete state machine and spec.md §4.3,
//! rebuilt as a single-consumer actor per §5 (own `playerActions` queue,
//! mutated only from inside `run`). AFK re-entry is grounded in the
//! teacher's `ws_handler.rs` `turn_counter`/`spawn_turn_timer` pattern.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use crate::card::{Card, Deck, Suit};
use crate::logger::GameLogger;
use crate::player::Player;
use crate::protocol::{GameStateInfo, ServerEvent};
use crate::session::SessionHandle;

pub const MAX_BATTLEGROUND: usize = 6;
pub const HAND_SIZE: usize = 6;
pub const DEFAULT_AFK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Preparing,
    Playing,
    End,
}

/// Intents the engine accepts into its single queue. `Attack`/`Defend`/
/// `PickUp`/`Complete` come from players via Room/Lobby (seat already
/// resolved); the rest are internal re-entries (late joins, disconnects,
/// AFK timer fires) that must route through this same queue rather than
/// mutate the Game from another task (§9 "Timers").
pub enum PlayerAction {
    Attack {
        seat: usize,
        card: Card,
    },
    Defend {
        seat: usize,
        attacking_card: Card,
        defending_card: Card,
    },
    PickUp {
        seat: usize,
    },
    Complete {
        seat: usize,
    },
    LateJoin {
        name: String,
        session: Option<SessionHandle>,
    },
    ClientRemoved {
        seat: usize,
    },
    AfkTimeout {
        generation: u64,
        seat: usize,
    },
}

/// Notifications the Game sends back to its owning Room. The Room never
/// reaches into Game state directly — it only reacts to these (§5).
#[derive(Debug, Clone)]
pub enum GameCallback {
    Ended { has_loser: bool, loser_index: i32 },
}

/// Cheap, cloneable handle Room/Lobby use to push actions into a running
/// Game without touching its internals.
#[derive(Clone)]
pub struct GameHandle {
    actions_tx: mpsc::UnboundedSender<PlayerAction>,
}

impl GameHandle {
    pub fn send(&self, action: PlayerAction) {
        // A closed queue means the game already ended; dropping is correct.
        let _ = self.actions_tx.send(action);
    }
}

pub struct Game {
    pub id: String,
    pub status: GameStatus,
    pub players: Vec<Player>,
    pub deck: Deck,
    pub discard_pile_size: usize,
    pub trump_suit: Suit,
    pub trump_card: Card,
    pub trump_card_owner: i32,
    pub attacker_index: usize,
    pub defender_index: usize,
    pub battleground: Vec<Card>,
    pub defending_cards: HashMap<usize, Card>,
    pub defender_pick_up: bool,

    turn_generation: Arc<AtomicU64>,
    afk_timeout: Duration,
    actions_rx: mpsc::UnboundedReceiver<PlayerAction>,
    actions_tx: mpsc::UnboundedSender<PlayerAction>,
    logger: Arc<dyn GameLogger>,
    on_ended: mpsc::UnboundedSender<GameCallback>,
}

impl Game {
    pub fn new(
        room_id: u64,
        players: Vec<Player>,
        logger: Arc<dyn GameLogger>,
        afk_timeout: Duration,
    ) -> (Game, GameHandle, mpsc::UnboundedReceiver<GameCallback>) {
        let (actions_tx, actions_rx) = mpsc::unbounded_channel();
        let (on_ended, ended_rx) = mpsc::unbounded_channel();
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();

        let game = Game {
            id: format!("{timestamp}-{room_id}"),
            status: GameStatus::Preparing,
            players,
            deck: Deck::new(),
            discard_pile_size: 0,
            trump_suit: Suit::default(),
            trump_card: Card::new(crate::card::Value::Six, Suit::Clubs),
            trump_card_owner: -1,
            attacker_index: 0,
            defender_index: 0,
            battleground: Vec::new(),
            defending_cards: HashMap::new(),
            defender_pick_up: false,
            turn_generation: Arc::new(AtomicU64::new(0)),
            afk_timeout,
            actions_rx,
            actions_tx: actions_tx.clone(),
            logger,
            on_ended,
        };
        (game, GameHandle { actions_tx }, ended_rx)
    }

    /// Deal, pick the first attacker, and run the single-consumer action
    /// loop until the game ends or the queue is closed.
    pub async fn run(mut self) {
        self.start();
        while let Some(action) = self.actions_rx.recv().await {
            match action {
                PlayerAction::Attack { seat, card } => self.perform_attack(seat, card),
                PlayerAction::Defend {
                    seat,
                    attacking_card,
                    defending_card,
                } => self.perform_defend(seat, attacking_card, defending_card),
                PlayerAction::PickUp { seat } => self.perform_pick_up(seat),
                PlayerAction::Complete { seat } => self.perform_complete(seat),
                PlayerAction::LateJoin { name, session } => self.handle_late_join(name, session),
                PlayerAction::ClientRemoved { seat } => self.handle_active_player_left(seat, false),
                PlayerAction::AfkTimeout { generation, seat } => {
                    if generation == self.turn_generation.load(Ordering::SeqCst) {
                        self.handle_active_player_left(seat, true);
                    }
                }
            }
            if self.status == GameStatus::End {
                break;
            }
        }
    }

    fn start(&mut self) {
        let mut rng = rand::thread_rng();
        self.deal(&mut rng);
        self.status = GameStatus::Playing;

        self.broadcast_per_seat(|g, s| ServerEvent::GamePlayersEvent {
            your_player_index: s as i32,
            player_names: g.players.iter().map(|p| p.name.clone()).collect(),
        });

        self.broadcast_per_seat(|g, s| ServerEvent::GameDealEvent {
            state: g.build_state_info(s),
            trump_card_is_owned_by_player_index: g.trump_card_owner,
        });

        let (attacker, reason_card) = self.select_first_attacker();
        self.attacker_index = attacker;
        self.defender_index = self
            .adjust_player_index(attacker as i64 + 1)
            .max(0) as usize;

        self.logger
            .log_game_begins(&self.id, &self.state_as_log_lines());

        self.broadcast_per_seat(move |g, s| ServerEvent::GameFirstAttackerEvent {
            reason_card,
            attacker_index: g.attacker_index,
            defender_index: g.defender_index,
            state: g.build_state_info(s),
        });
        self.broadcast_per_seat(|g, s| ServerEvent::GameStartedEvent {
            state: g.build_state_info(s),
        });

        self.restart_afk_timer(self.attacker_index);
    }

    // -- Dealing -----------------------------------------------------

    fn deal(&mut self, rng: &mut impl Rng) {
        self.deck = Deck::new();
        self.deck.shuffle(rng);

        let n = self.players.len();
        let mut last_drawn: Option<Card> = None;
        let mut last_recipient: Option<usize> = None;

        'dealing: loop {
            let mut dealt_any = false;
            for seat in 0..n {
                if self.players[seat].hand.len() >= HAND_SIZE {
                    continue;
                }
                match self.deck.draw() {
                    Ok(card) => {
                        last_drawn = Some(card);
                        last_recipient = Some(seat);
                        self.players[seat].hand.push(card);
                        dealt_any = true;
                    }
                    Err(_) => break 'dealing,
                }
            }
            if !dealt_any || self.players.iter().all(|p| p.hand.len() >= HAND_SIZE) {
                break;
            }
        }

        let last_card = last_drawn.expect("a 36-card deck deals at least one card to 2+ players");
        self.trump_suit = last_card.suit;
        if let Some(bottom) = self.deck.bottom() {
            self.trump_card = *bottom;
            self.trump_card_owner = -1;
        } else {
            self.trump_card = last_card;
            self.trump_card_owner = last_recipient.unwrap_or(0) as i32;
        }

        for p in &mut self.players {
            if p.hand.is_empty() {
                p.is_active = false;
            }
        }
    }

    fn select_first_attacker(&self) -> (usize, Card) {
        let mut best: Option<(usize, Card)> = None;
        for (i, p) in self.players.iter().enumerate() {
            for c in &p.hand {
                let beats_current = match best {
                    None => true,
                    Some((_, bc)) => c.value_index() <= bc.value_index(),
                };
                if c.suit == self.trump_suit && beats_current {
                    best = Some((i, *c));
                }
            }
        }
        if let Some(found) = best {
            return found;
        }

        let mut fallback: Option<(usize, Card)> = None;
        for (i, p) in self.players.iter().enumerate() {
            for c in &p.hand {
                let beats_current = match fallback {
                    None => true,
                    Some((_, bc)) => c.value_index() <= bc.value_index(),
                };
                if beats_current {
                    fallback = Some((i, *c));
                }
            }
        }
        fallback.expect("a freshly dealt game has at least one card in play")
    }

    // -- Validity checks (§4.3) --------------------------------------

    pub fn can_player_attack_with_card(&self, seat: usize, card: &Card) -> bool {
        if self.status != GameStatus::Playing || seat == self.defender_index {
            return false;
        }
        let Some(p) = self.players.get(seat) else {
            return false;
        };
        if !p.is_active || p.is_completed {
            return false;
        }
        if self.battleground.is_empty() && seat != self.attacker_index {
            return false;
        }
        if self.battleground.len() >= MAX_BATTLEGROUND {
            return false;
        }
        let defender_capacity =
            self.players[self.defender_index].hand.len() + self.defending_cards.len();
        if self.battleground.len() >= defender_capacity {
            return false;
        }
        if !p.has_card(card) {
            return false;
        }
        if self.battleground.is_empty() {
            return true;
        }
        self.battleground.iter().any(|c| c.value == card.value)
            || self.defending_cards.values().any(|c| c.value == card.value)
    }

    pub fn can_player_defend_with_card(
        &self,
        seat: usize,
        attacking_card: &Card,
        defending_card: &Card,
    ) -> bool {
        if self.status != GameStatus::Playing || seat != self.defender_index || self.defender_pick_up
        {
            return false;
        }
        let Some(p) = self.players.get(seat) else {
            return false;
        };
        if !p.has_card(defending_card) {
            return false;
        }
        let Some(idx) = self.battleground.iter().position(|c| c == attacking_card) else {
            return false;
        };
        if self.defending_cards.contains_key(&idx) {
            return false;
        }
        if attacking_card.suit == self.trump_suit {
            defending_card.suit == self.trump_suit
                && defending_card.value_index() > attacking_card.value_index()
        } else {
            defending_card.suit == self.trump_suit
                || (defending_card.suit == attacking_card.suit
                    && defending_card.value_index() > attacking_card.value_index())
        }
    }

    pub fn can_player_pick_up(&self, seat: usize) -> bool {
        self.status == GameStatus::Playing
            && seat == self.defender_index
            && self.players.get(seat).is_some_and(|p| p.is_active)
            && !self.battleground.is_empty()
            && !self.defender_pick_up
    }

    pub fn can_player_complete(&self, seat: usize) -> bool {
        if self.status != GameStatus::Playing {
            return false;
        }
        let Some(p) = self.players.get(seat) else {
            return false;
        };
        if !p.is_active || p.is_completed {
            return false;
        }

        let all_beaten = self.battleground.len() == self.defending_cards.len();
        if !all_beaten && !self.defender_pick_up {
            return false;
        }

        if seat == self.defender_index {
            all_beaten && self.all_attackers_completed()
        } else {
            !self.battleground.is_empty()
        }
    }

    fn all_attackers_completed(&self) -> bool {
        self.players
            .iter()
            .enumerate()
            .all(|(i, p)| i == self.defender_index || !p.is_active || p.is_completed)
    }

    /// True once nobody has anything left to do this round — every active
    /// player is completed, or is the defender and chose to pick up.
    fn round_is_over(&self) -> bool {
        self.players.iter().enumerate().all(|(i, p)| {
            !p.is_active || p.is_completed || (i == self.defender_index && self.defender_pick_up)
        })
    }

    // -- Actions (§4.3) ------------------------------------------------

    fn perform_attack(&mut self, seat: usize, card: Card) {
        if !self.can_player_attack_with_card(seat, &card) {
            return;
        }
        self.players[seat].remove_card(&card);
        self.battleground.push(card);

        self.logger
            .log_player_action_attack(&self.id, &card, &self.state_as_log_lines());
        self.broadcast_per_seat(move |g, s| ServerEvent::GameAttackEvent {
            state: g.build_state_info(s),
            attacker_index: seat,
            defender_index: g.defender_index,
            card,
        });
        self.restart_afk_timer(self.defender_index);
    }

    fn perform_defend(&mut self, seat: usize, attacking_card: Card, defending_card: Card) {
        if !self.can_player_defend_with_card(seat, &attacking_card, &defending_card) {
            return;
        }
        let idx = self
            .battleground
            .iter()
            .position(|c| *c == attacking_card)
            .expect("validated above");
        self.defending_cards.insert(idx, defending_card);
        self.players[seat].remove_card(&defending_card);
        for p in &mut self.players {
            p.is_completed = false;
        }

        self.logger.log_player_action_defend(
            &self.id,
            &attacking_card,
            &defending_card,
            &self.state_as_log_lines(),
        );
        self.broadcast_per_seat(move |g, s| ServerEvent::GameDefendEvent {
            state: g.build_state_info(s),
            attacking_card,
            defending_card,
        });

        if self.battleground.len() == self.defending_cards.len() {
            self.restart_afk_timer(self.attacker_index);
        } else {
            self.restart_afk_timer(self.defender_index);
        }
    }

    fn perform_pick_up(&mut self, seat: usize) {
        if !self.can_player_pick_up(seat) {
            return;
        }
        self.defender_pick_up = true;
        self.logger
            .log_player_action_pick_up(&self.id, &self.state_as_log_lines());

        if self.round_is_over() {
            self.end_round();
        } else {
            self.broadcast_per_seat(|g, s| ServerEvent::GameStateEvent {
                state: g.build_state_info(s),
            });
            self.restart_afk_timer(self.defender_index);
        }
    }

    fn perform_complete(&mut self, seat: usize) {
        if !self.can_player_complete(seat) {
            return;
        }
        self.players[seat].is_completed = true;
        self.logger
            .log_player_action_complete(&self.id, &self.state_as_log_lines());

        if self.round_is_over() {
            self.end_round();
        } else {
            self.broadcast_per_seat(|g, s| ServerEvent::GameStateEvent {
                state: g.build_state_info(s),
            });
        }
    }

    // -- Round / game lifecycle ------------------------------------------

    fn end_round(&mut self) {
        for p in &mut self.players {
            p.is_completed = false;
        }
        self.redeal();

        if self.defender_pick_up {
            let defender = self.defender_index;
            let mut picked: Vec<Card> = self.battleground.clone();
            picked.extend(self.defending_cards.values().copied());
            self.players[defender].hand.extend(picked);
        } else {
            self.discard_pile_size += self.battleground.len();
        }

        self.find_new_attacker();

        self.battleground.clear();
        self.defending_cards.clear();
        self.defender_pick_up = false;

        let active = self.active_count();
        if active < 2 {
            let loser_index = if active == 1 {
                self.players
                    .iter()
                    .position(|p| p.is_active)
                    .map(|i| i as i32)
                    .unwrap_or(-1)
            } else {
                -1
            };
            self.end_game(active == 1, loser_index);
        } else {
            self.broadcast_per_seat(|g, s| ServerEvent::NewRoundEvent {
                state: g.build_state_info(s),
            });
            self.restart_afk_timer(self.attacker_index);
        }
    }

    fn redeal(&mut self) {
        let n = self.players.len();
        let mut order = vec![self.attacker_index];
        for i in 0..n {
            if i != self.attacker_index && i != self.defender_index && self.players[i].is_active {
                order.push(i);
            }
        }
        order.push(self.defender_index);

        for seat in order {
            while self.players[seat].hand.len() < HAND_SIZE {
                match self.deck.draw() {
                    Ok(card) => self.players[seat].hand.push(card),
                    Err(_) => break,
                }
            }
            if self.players[seat].hand.is_empty() {
                self.players[seat].is_active = false;
            }
        }
    }

    fn find_new_attacker(&mut self) {
        let active = self.active_count();
        if active == 2 && self.defender_pick_up {
            return;
        }
        let advance = if self.defender_pick_up { 2 } else { 1 };
        let new_attacker = self.adjust_player_index(self.attacker_index as i64 + advance);
        if new_attacker < 0 {
            return;
        }
        let new_defender = self.adjust_player_index(new_attacker as i64 + 1);
        self.attacker_index = new_attacker as usize;
        if new_defender >= 0 {
            self.defender_index = new_defender as usize;
        }
    }

    /// `-1` if fewer than 2 active players remain; otherwise `i mod N`,
    /// skipping inactive seats.
    fn adjust_player_index(&self, i: i64) -> i32 {
        if self.active_count() < 2 {
            return -1;
        }
        let n = self.players.len() as i64;
        let mut idx = i.rem_euclid(n);
        while !self.players[idx as usize].is_active {
            idx = (idx + 1).rem_euclid(n);
        }
        idx as i32
    }

    fn active_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_active).count()
    }

    fn end_game(&mut self, has_loser: bool, loser_index: i32) {
        self.status = GameStatus::End;
        self.actions_rx.close();
        self.broadcast_per_seat(|g, s| ServerEvent::GameStateEvent {
            state: g.build_state_info(s),
        });
        self.broadcast_per_seat(move |_, _| ServerEvent::GameEndEvent {
            has_loser,
            loser_index,
        });
        self.logger
            .log_game_ends(&self.id, has_loser, loser_index, &self.state_as_log_lines());
        let _ = self.on_ended.send(GameCallback::Ended {
            has_loser,
            loser_index,
        });
    }

    fn handle_active_player_left(&mut self, seat: usize, is_afk: bool) {
        let Some(player) = self.players.get(seat) else {
            return;
        };
        if !player.is_active {
            return;
        }
        let active_before = self.active_count();
        self.players[seat].is_active = false;
        self.broadcast_per_seat(move |_, _| ServerEvent::GamePlayerLeftEvent {
            player_index: seat,
            is_afk,
        });

        if active_before <= 2 {
            self.end_game(true, seat as i32);
        }
    }

    fn handle_late_join(&mut self, name: String, session: Option<SessionHandle>) {
        let seat = self.players.len();
        self.players.push(Player::new_inactive(name, session));
        let event = ServerEvent::GameStateEvent {
            state: self.build_state_info(seat),
        };
        self.send_to(seat, event);
    }

    // -- Timers -----------------------------------------------------------

    fn restart_afk_timer(&self, seat: usize) {
        let generation = self.turn_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = self.actions_tx.clone();
        let timeout = self.afk_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(PlayerAction::AfkTimeout { generation, seat });
        });
    }

    // -- Fan-out ------------------------------------------------------------

    fn send_to(&self, seat: usize, event: ServerEvent) {
        if let Some(session) = self.players.get(seat).and_then(|p| p.session()) {
            session.send_event(&event);
        }
    }

    fn broadcast_per_seat(&self, f: impl Fn(&Game, usize) -> ServerEvent) {
        for seat in 0..self.players.len() {
            let event = f(self, seat);
            self.send_to(seat, event);
        }
    }

    fn build_state_info(&self, seat: usize) -> GameStateInfo {
        let player = &self.players[seat];
        GameStateInfo {
            your_hand: player.hand.clone(),
            hand_sizes: self.players.iter().map(|p| p.hand.len()).collect(),
            deck_remaining: self.deck.len(),
            discard_pile_size: self.discard_pile_size,
            trump_card: Some(self.trump_card),
            battleground: self.battleground.clone(),
            defending_cards: self.defending_cards.clone(),
            completed: self.players.iter().map(|p| p.is_completed).collect(),
            defender_pick_up: self.defender_pick_up,
            attacker_index: self.attacker_index as i32,
            defender_index: self.defender_index as i32,
            can_attack: player
                .hand
                .iter()
                .any(|c| self.can_player_attack_with_card(seat, c)),
            can_defend: self.battleground.iter().enumerate().any(|(idx, ac)| {
                !self.defending_cards.contains_key(&idx)
                    && player
                        .hand
                        .iter()
                        .any(|dc| self.can_player_defend_with_card(seat, ac, dc))
            }),
            can_pick_up: self.can_player_pick_up(seat),
            can_complete: self.can_player_complete(seat),
        }
    }

    fn state_as_log_lines(&self) -> String {
        format!(
            "State:\nplayers={} hand_sizes={:?}\ndeck={};battleground={};attacker={};defender={};trump={}{}\n",
            self.players.len(),
            self.players.iter().map(|p| p.hand.len()).collect::<Vec<_>>(),
            self.deck.len(),
            self.battleground.len(),
            self.attacker_index,
            self.defender_index,
            self.trump_card.value,
            self.trump_card.suit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Value;
    use crate::logger::NullLogger;
    use std::sync::Mutex;

    struct RecordingSession {
        id: u64,
        events: Mutex<Vec<ServerEvent>>,
    }

    impl crate::session::ClientSender for RecordingSession {
        fn send_event(&self, event: &ServerEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
        fn id(&self) -> u64 {
            self.id
        }
        fn nickname(&self) -> String {
            format!("seat-{}", self.id)
        }
    }

    fn make_players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(format!("p{i}"), None))
            .collect()
    }

    fn new_test_game(n: usize) -> Game {
        let (game, _handle, _ended_rx) =
            Game::new(1, make_players(n), Arc::new(NullLogger), Duration::from_secs(120));
        game
    }

    #[test]
    fn deal_gives_every_player_six_cards_and_conserves_the_deck() {
        let mut game = new_test_game(3);
        let mut rng = rand::thread_rng();
        game.deal(&mut rng);

        let total_in_hands: usize = game.players.iter().map(|p| p.hand.len()).sum();
        assert_eq!(total_in_hands + game.deck.len(), 36);
        for p in &game.players {
            assert!(p.hand.len() <= HAND_SIZE);
        }
    }

    #[test]
    fn select_first_attacker_prefers_lowest_trump() {
        let mut game = new_test_game(2);
        game.trump_suit = Suit::Diamonds;
        game.players[0].hand = vec![
            Card::new(Value::Ace, Suit::Diamonds),
            Card::new(Value::King, Suit::Clubs),
        ];
        game.players[1].hand = vec![
            Card::new(Value::Seven, Suit::Diamonds),
            Card::new(Value::Nine, Suit::Spades),
        ];

        let (attacker, reason) = game.select_first_attacker();
        assert_eq!(attacker, 1);
        assert_eq!(reason, Card::new(Value::Seven, Suit::Diamonds));
    }

    #[test]
    fn select_first_attacker_falls_back_to_globally_lowest_card_without_trump() {
        let mut game = new_test_game(2);
        game.trump_suit = Suit::Diamonds;
        game.players[0].hand = vec![Card::new(Value::King, Suit::Clubs)];
        game.players[1].hand = vec![Card::new(Value::Nine, Suit::Spades)];

        let (attacker, reason) = game.select_first_attacker();
        assert_eq!(attacker, 1);
        assert_eq!(reason, Card::new(Value::Nine, Suit::Spades));
    }

    fn two_player_game_in_progress() -> Game {
        let mut game = new_test_game(2);
        game.status = GameStatus::Playing;
        game.trump_suit = Suit::Diamonds;
        game.attacker_index = 0;
        game.defender_index = 1;
        game.players[0].hand = vec![
            Card::new(Value::Six, Suit::Clubs),
            Card::new(Value::Eight, Suit::Clubs),
        ];
        game.players[1].hand = vec![
            Card::new(Value::Seven, Suit::Clubs),
            Card::new(Value::Nine, Suit::Diamonds),
        ];
        game
    }

    #[test]
    fn attack_then_defend_clears_the_battleground_contribution() {
        let mut game = two_player_game_in_progress();
        game.perform_attack(0, Card::new(Value::Six, Suit::Clubs));
        assert_eq!(game.battleground, vec![Card::new(Value::Six, Suit::Clubs)]);
        assert!(!game.players[0].has_card(&Card::new(Value::Six, Suit::Clubs)));

        game.perform_defend(
            1,
            Card::new(Value::Six, Suit::Clubs),
            Card::new(Value::Seven, Suit::Clubs),
        );
        assert_eq!(
            game.defending_cards.get(&0),
            Some(&Card::new(Value::Seven, Suit::Clubs))
        );
        assert!(!game.players[1].has_card(&Card::new(Value::Seven, Suit::Clubs)));
    }

    #[test]
    fn attack_with_unheld_card_is_silently_ignored() {
        let mut game = two_player_game_in_progress();
        game.perform_attack(0, Card::new(Value::Ace, Suit::Spades));
        assert!(game.battleground.is_empty());
    }

    #[test]
    fn defend_must_beat_under_trump_rules() {
        let game = two_player_game_in_progress();
        // Non-trump attack: trump of any rank beats it.
        assert!(game.can_player_defend_with_card(
            1,
            &Card::new(Value::Six, Suit::Clubs),
            &Card::new(Value::Six, Suit::Diamonds)
        ));
        // Non-trump attack, same suit must be strictly higher.
        assert!(!game.can_player_defend_with_card(
            1,
            &Card::new(Value::Eight, Suit::Clubs),
            &Card::new(Value::Seven, Suit::Clubs)
        ));
    }

    #[test]
    fn pick_up_blocks_further_defends_until_round_end() {
        let mut game = two_player_game_in_progress();
        game.perform_attack(0, Card::new(Value::Six, Suit::Clubs));
        game.perform_pick_up(1);
        assert!(game.defender_pick_up);
        assert!(!game.can_player_defend_with_card(
            1,
            &Card::new(Value::Six, Suit::Clubs),
            &Card::new(Value::Seven, Suit::Clubs)
        ));
    }

    #[test]
    fn adjust_player_index_skips_inactive_seats() {
        let mut game = new_test_game(4);
        game.players[1].is_active = false;
        assert_eq!(game.adjust_player_index(1), 2);
    }

    #[test]
    fn adjust_player_index_returns_negative_one_below_two_active() {
        let mut game = new_test_game(3);
        game.players[1].is_active = false;
        game.players[2].is_active = false;
        assert_eq!(game.adjust_player_index(0), -1);
    }

    #[test]
    fn losing_seat_in_two_player_endgame_is_reported_as_the_loser() {
        let mut game = two_player_game_in_progress();
        game.handle_active_player_left(1, true);
        assert_eq!(game.status, GameStatus::End);
    }

    #[test]
    fn round_ends_when_a_hand_empties_with_no_deck_left_to_redeal() {
        let mut game = two_player_game_in_progress();
        game.deck = Deck::default();
        game.players[0].hand = vec![Card::new(Value::Six, Suit::Clubs)];
        game.players[1].hand = vec![Card::new(Value::Seven, Suit::Clubs)];

        game.perform_attack(0, Card::new(Value::Six, Suit::Clubs));
        game.perform_defend(
            1,
            Card::new(Value::Six, Suit::Clubs),
            Card::new(Value::Seven, Suit::Clubs),
        );
        game.perform_complete(0);
        game.perform_complete(1);

        assert_eq!(game.status, GameStatus::End);
        assert!(!game.players[0].is_active);
        assert!(!game.players[1].is_active);
        assert_eq!(game.discard_pile_size, 1);
    }

    #[test]
    fn unsuccessful_defense_rotates_attacker_to_the_next_seat() {
        let mut game = new_test_game(3);
        game.status = GameStatus::Playing;
        game.trump_suit = Suit::Diamonds;
        game.attacker_index = 0;
        game.defender_index = 1;
        game.deck = Deck::default();
        for p in &mut game.players {
            p.hand = vec![Card::new(Value::Six, Suit::Clubs)];
        }
        game.battleground = vec![Card::new(Value::King, Suit::Clubs)];
        game.defender_pick_up = true;

        game.perform_complete(0);
        game.perform_complete(2);

        assert_eq!(game.attacker_index, 2);
        assert_eq!(game.defender_index, 0);
    }

    #[tokio::test]
    async fn late_join_adds_an_inactive_seat_and_sends_it_a_snapshot() {
        let mut game = two_player_game_in_progress();
        let session = Arc::new(RecordingSession {
            id: 99,
            events: Mutex::new(Vec::new()),
        });
        game.handle_late_join("Newcomer".to_string(), Some(session.clone()));

        assert_eq!(game.players.len(), 3);
        assert!(!game.players[2].is_active);
        assert_eq!(session.events.lock().unwrap().len(), 1);
    }
}
