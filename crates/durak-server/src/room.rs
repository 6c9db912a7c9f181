//! The Room actor: membership, bot lifecycle, and the bridge between a
//! room's members and its running [`Game`] (spec.md §4.2). Grounded in the
//! teacher's `Room`/`RoomManager`, but — per §5's explicit recommendation —
//! given its own single-consumer command queue instead of sharing state
//! behind a lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use durak_core::bot::spawn_bot_client;
use durak_core::game::{Game, GameCallback, GameHandle, GameStatus, PlayerAction};
use durak_core::logger::GameLogger;
use durak_core::player::Player;
use durak_core::protocol::{GameCommand, RoomInfo, RoomInList, RoomMemberInfo, ServerEvent};
use durak_core::session::{ClientSender, SessionHandle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lobby::LobbyHandle;

/// Internal actor messages — distinct from [`durak_core::protocol::RoomCommand`],
/// the wire-level enum Lobby translates into these.
pub enum RoomCommand {
    AddClient(SessionHandle),
    RemoveClient(u64),
    WantToPlay(u64),
    WantToSpectate(u64),
    SetPlayerStatus { by: u64, member_id: u64, status: bool },
    StartGame(u64),
    DeleteGame(u64),
    AddBot(u64),
    RemoveBots(u64),
    GameAction(u64, GameCommand),
    GameEnded,
}

#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn send(&self, cmd: RoomCommand) {
        let _ = self.tx.send(cmd);
    }
}

struct Member {
    session: SessionHandle,
    want_to_play: bool,
    is_player: bool,
    is_bot: bool,
}

/// Placeholder session for a bot added before a [`Game`] exists — traded for
/// a real [`durak_core::bot::BotClient`] the moment `StartGame` runs (§4.4:
/// `spawnBotClient` needs a live `GameHandle`, which a pre-game room doesn't
/// have yet).
struct PendingBotSession {
    id: u64,
    nickname: String,
}

impl ClientSender for PendingBotSession {
    fn send_event(&self, _event: &ServerEvent) {}
    fn id(&self) -> u64 {
        self.id
    }
    fn nickname(&self) -> String {
        self.nickname.clone()
    }
}

pub struct Room {
    id: u64,
    owner: u64,
    order: Vec<u64>,
    members: HashMap<u64, Member>,

    game: Option<GameHandle>,
    current_game_status: Option<GameStatus>,
    game_seats: HashMap<u64, usize>,
    next_late_seat: usize,

    bot_tasks: Vec<JoinHandle<()>>,
    next_bot_id: Arc<AtomicU64>,

    lobby: LobbyHandle,
    logger: Arc<dyn GameLogger>,
    max_players: usize,
    afk_timeout: Duration,

    self_tx: mpsc::UnboundedSender<RoomCommand>,
    rx: mpsc::UnboundedReceiver<RoomCommand>,
}

impl Room {
    pub fn spawn(
        id: u64,
        owner: u64,
        lobby: LobbyHandle,
        logger: Arc<dyn GameLogger>,
        max_players: usize,
        afk_timeout: Duration,
        session_id_counter: Arc<AtomicU64>,
    ) -> RoomHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let room = Room {
            id,
            owner,
            order: Vec::new(),
            members: HashMap::new(),
            game: None,
            current_game_status: None,
            game_seats: HashMap::new(),
            next_late_seat: 0,
            bot_tasks: Vec::new(),
            next_bot_id: session_id_counter,
            lobby,
            logger,
            max_players,
            afk_timeout,
            self_tx: tx.clone(),
            rx,
        };
        tokio::spawn(room.run());
        RoomHandle { tx }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            let emptied = match cmd {
                RoomCommand::AddClient(session) => {
                    self.add_client(session);
                    false
                }
                RoomCommand::RemoveClient(id) => self.remove_client(id),
                RoomCommand::WantToPlay(id) => {
                    self.set_want_to_play(id, true);
                    false
                }
                RoomCommand::WantToSpectate(id) => {
                    self.set_want_to_play(id, false);
                    false
                }
                RoomCommand::SetPlayerStatus { by, member_id, status } => {
                    self.set_player_status(by, member_id, status);
                    false
                }
                RoomCommand::StartGame(by) => {
                    self.start_game(by);
                    false
                }
                RoomCommand::DeleteGame(by) => {
                    self.delete_game(by);
                    false
                }
                RoomCommand::AddBot(by) => {
                    self.add_bot(by);
                    false
                }
                RoomCommand::RemoveBots(by) => {
                    self.remove_bots(by);
                    false
                }
                RoomCommand::GameAction(session_id, cmd) => {
                    self.game_action(session_id, cmd);
                    false
                }
                RoomCommand::GameEnded => {
                    self.handle_game_ended();
                    false
                }
            };
            if emptied {
                break;
            }
        }
        self.shutdown();
    }

    fn player_count(&self) -> usize {
        self.members.values().filter(|m| m.is_player).count()
    }

    fn add_client(&mut self, session: SessionHandle) {
        let id = session.id();
        let auto_player = self.player_count() < 2;
        self.order.push(id);
        self.members.insert(
            id,
            Member {
                session: session.clone(),
                want_to_play: auto_player,
                is_player: auto_player,
                is_bot: false,
            },
        );

        session.send_event(&ServerEvent::RoomJoinedEvent {
            room: self.snapshot(),
        });
        self.broadcast_room_updated();
        self.notify_lobby_room_list();

        if let Some(game) = &self.game {
            let seat = self.next_late_seat;
            self.next_late_seat += 1;
            self.game_seats.insert(id, seat);
            game.send(PlayerAction::LateJoin {
                name: session.nickname(),
                session: Some(session),
            });
        }
    }

    /// Returns `true` if the room is now empty of humans and should shut down.
    fn remove_client(&mut self, id: u64) -> bool {
        let Some(_member) = self.members.remove(&id) else {
            return false;
        };
        self.order.retain(|&m| m != id);

        if let Some(seat) = self.game_seats.get(&id).copied() {
            if let Some(game) = &self.game {
                game.send(PlayerAction::ClientRemoved { seat });
            }
        }

        if self.members.values().all(|m| m.is_bot) {
            return true;
        }

        if id == self.owner {
            if let Some(&next_owner) = self.order.first() {
                self.owner = next_owner;
            }
        }

        self.broadcast_room_updated();
        self.notify_lobby_room_list();
        false
    }

    fn shutdown(&mut self) {
        for task in self.bot_tasks.drain(..) {
            task.abort();
        }
        self.lobby.room_list_removed(self.id);
    }

    fn add_bot(&mut self, by: u64) {
        if by != self.owner {
            self.error_to(by, "errorYouShouldBeOwner");
            return;
        }
        if self.game.is_some() {
            self.error_to(by, "errorGameHasBeenAlreadyStarted");
            return;
        }
        if self.members.len() >= self.max_players {
            self.error_to(by, "errorNumberOfPlayersExceededLimit");
            return;
        }
        let bot_id = self.next_bot_id.fetch_add(1, Ordering::SeqCst);
        let nickname = format!("Bot-{bot_id}");
        self.order.push(bot_id);
        self.members.insert(
            bot_id,
            Member {
                session: Arc::new(PendingBotSession {
                    id: bot_id,
                    nickname,
                }),
                want_to_play: true,
                is_player: true,
                is_bot: true,
            },
        );
        self.broadcast_room_updated();
        self.notify_lobby_room_list();
    }

    fn remove_bots(&mut self, by: u64) {
        if by != self.owner {
            self.error_to(by, "errorYouShouldBeOwner");
            return;
        }
        if self.game.is_some() {
            self.error_to(by, "errorGameHasBeenAlreadyStarted");
            return;
        }
        let bot_ids: Vec<u64> = self
            .members
            .iter()
            .filter(|(_, m)| m.is_bot)
            .map(|(&id, _)| id)
            .collect();
        for id in bot_ids {
            self.members.remove(&id);
            self.order.retain(|&m| m != id);
        }
        self.broadcast_room_updated();
        self.notify_lobby_room_list();
    }

    fn set_want_to_play(&mut self, id: u64, want: bool) {
        if self.game.is_some() {
            self.error_to(id, "errorCantChangeStatusGameHasBeenStarted");
            return;
        }
        let Some(member) = self.members.get_mut(&id) else {
            return;
        };
        member.want_to_play = want;
        if !want {
            member.is_player = false;
        }
        self.broadcast_room_updated();
    }

    fn set_player_status(&mut self, by: u64, member_id: u64, status: bool) {
        if by != self.owner {
            self.error_to(by, "errorYouShouldBeOwner");
            return;
        }
        if self.game.is_some() {
            self.error_to(by, "errorCantChangeStatusGameHasBeenStarted");
            return;
        }
        if status && self.player_count() >= self.max_players {
            self.error_to(by, "errorNumberOfPlayersExceededLimit");
            return;
        }
        let Some(member) = self.members.get_mut(&member_id) else {
            return;
        };
        member.is_player = status;
        self.broadcast_room_updated();
    }

    fn start_game(&mut self, by: u64) {
        if by != self.owner {
            self.error_to(by, "errorYouShouldBeOwner");
            return;
        }
        if self.game.is_some() {
            self.error_to(by, "errorGameHasBeenAlreadyStarted");
            return;
        }

        let player_ids: Vec<u64> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.members.get(id).is_some_and(|m| m.is_player))
            .collect();
        if player_ids.len() < 2 {
            self.error_to(by, "errorNeedOneMorePlayer");
            return;
        }

        let players: Vec<Player> = player_ids
            .iter()
            .map(|id| {
                let member = &self.members[id];
                Player::new(member.session.nickname(), Some(member.session.clone()))
            })
            .collect();

        let (mut game, handle, mut ended_rx) =
            Game::new(self.id, players, self.logger.clone(), self.afk_timeout);

        for (seat, &id) in player_ids.iter().enumerate() {
            self.game_seats.insert(id, seat);
            if self.members[&id].is_bot {
                let nickname = self.members[&id].session.nickname();
                let (bot_client, task) = spawn_bot_client(id, nickname, handle.clone());
                game.players[seat].set_session(Some(bot_client.clone()));
                self.bot_tasks.push(task);
                if let Some(member) = self.members.get_mut(&id) {
                    member.session = bot_client;
                }
            }
        }

        self.next_late_seat = player_ids.len();

        let forward_tx = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(GameCallback::Ended { .. }) = ended_rx.recv().await {
                let _ = forward_tx.send(RoomCommand::GameEnded);
            }
        });

        tokio::spawn(game.run());

        self.game = Some(handle);
        self.current_game_status = Some(GameStatus::Playing);
        self.broadcast_room_updated();
        self.notify_lobby_room_list();
    }

    fn delete_game(&mut self, by: u64) {
        if by != self.owner {
            self.error_to(by, "errorYouShouldBeOwner");
            return;
        }
        if self.current_game_status != Some(GameStatus::End) {
            self.error_to(by, "errorGameAlreadyDeleted");
            return;
        }
        self.game = None;
        self.current_game_status = None;
        self.game_seats.clear();
        self.next_late_seat = 0;
        for member in self.members.values_mut() {
            member.is_player = member.want_to_play;
        }
        self.broadcast_room_updated();
        self.notify_lobby_room_list();
    }

    fn game_action(&mut self, session_id: u64, cmd: GameCommand) {
        let Some(game) = &self.game else {
            return;
        };
        let Some(&seat) = self.game_seats.get(&session_id) else {
            return;
        };
        let action = match cmd {
            GameCommand::Attack { card } => PlayerAction::Attack { seat, card },
            GameCommand::Defend {
                attacking_card,
                defending_card,
            } => PlayerAction::Defend {
                seat,
                attacking_card,
                defending_card,
            },
            GameCommand::PickUp => PlayerAction::PickUp { seat },
            GameCommand::Complete => PlayerAction::Complete { seat },
        };
        game.send(action);
    }

    fn handle_game_ended(&mut self) {
        self.current_game_status = Some(GameStatus::End);
        self.broadcast_room_updated();
        self.notify_lobby_room_list();
    }

    fn error_to(&self, session_id: u64, message: &str) {
        if let Some(member) = self.members.get(&session_id) {
            member.session.send_event(&ServerEvent::ClientCommandError {
                message: message.to_string(),
            });
        }
    }

    fn broadcast_room_updated(&self) {
        let event = ServerEvent::RoomUpdatedEvent {
            room: self.snapshot(),
        };
        for member in self.members.values() {
            member.session.send_event(&event);
        }
    }

    fn snapshot(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            owner_id: self.owner,
            name: format!("Room {}", self.id),
            game_status: self.game_status_label(),
            members: self
                .order
                .iter()
                .filter_map(|id| {
                    self.members.get(id).map(|m| RoomMemberInfo {
                        id: *id,
                        nickname: m.session.nickname(),
                        want_to_play: m.want_to_play,
                        is_player: m.is_player,
                        is_bot: m.is_bot,
                    })
                })
                .collect(),
        }
    }

    fn game_status_label(&self) -> String {
        match self.current_game_status {
            None => "none".to_string(),
            Some(GameStatus::Preparing) => "preparing".to_string(),
            Some(GameStatus::Playing) => "playing".to_string(),
            Some(GameStatus::End) => "end".to_string(),
        }
    }

    fn notify_lobby_room_list(&self) {
        self.lobby.room_list_updated(RoomInList {
            id: self.id,
            owner_id: self.owner,
            name: format!("Room {}", self.id),
            game_status: self.game_status_label(),
            members_num: self.members.len(),
        });
    }
}
