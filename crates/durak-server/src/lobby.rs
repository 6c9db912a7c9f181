//! The Lobby actor: singleton session registry and command router (spec.md
//! §4.1). Grounded in the teacher's `RoomManager` — the one authority that
//! serialises membership changes — but turned from a `RwLock<HashMap<..>>`
//! into a single-consumer loop per §5 ("cooperative rather than locked
//! state"): every mutation of Lobby state happens inside `Lobby::run`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use durak_core::logger::GameLogger;
use durak_core::protocol::{
    ClientInfo, Command, GameCommand, LobbyCommand, RoomCommand as WireRoomCommand, RoomInList,
    ServerEvent,
};
use durak_core::session::{ClientSender, SessionHandle};
use tokio::sync::{mpsc, oneshot};

use crate::room::{Room, RoomCommand};

/// The per-session outbound queue a WebSocket write loop drains.
pub type SessionRx = mpsc::UnboundedReceiver<ServerEvent>;

/// The remote-session half of [`ClientSender`]; `send_event` only pushes
/// onto an unbounded channel, so it never blocks the actor that calls it
/// (§5 "Broadcast discipline").
struct WsSession {
    id: u64,
    tx: mpsc::UnboundedSender<ServerEvent>,
    nickname: std::sync::Mutex<String>,
}

impl ClientSender for WsSession {
    fn send_event(&self, event: &ServerEvent) {
        let _ = self.tx.send(event.clone());
    }

    fn id(&self) -> u64 {
        self.id
    }

    fn nickname(&self) -> String {
        self.nickname.lock().unwrap().clone()
    }
}

struct LobbySession {
    handle: Arc<WsSession>,
    room: Option<u64>,
}

pub enum LobbyMessage {
    Register {
        reply: oneshot::Sender<(u64, SessionRx)>,
    },
    Unregister {
        session_id: u64,
    },
    Command {
        session_id: u64,
        command: Command,
    },
    RoomListUpdated(RoomInList),
    RoomListRemoved(u64),
}

#[derive(Clone)]
pub struct LobbyHandle {
    tx: mpsc::UnboundedSender<LobbyMessage>,
}

impl LobbyHandle {
    pub async fn register(&self) -> (u64, SessionRx) {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self.tx.send(LobbyMessage::Register { reply });
        reply_rx.await.expect("lobby outlives its own registrations")
    }

    pub fn unregister(&self, session_id: u64) {
        let _ = self.tx.send(LobbyMessage::Unregister { session_id });
    }

    pub fn command(&self, session_id: u64, command: Command) {
        let _ = self.tx.send(LobbyMessage::Command { session_id, command });
    }

    pub(crate) fn room_list_updated(&self, room: RoomInList) {
        let _ = self.tx.send(LobbyMessage::RoomListUpdated(room));
    }

    pub(crate) fn room_list_removed(&self, room_id: u64) {
        let _ = self.tx.send(LobbyMessage::RoomListRemoved(room_id));
    }
}

pub struct Lobby {
    sessions: HashMap<u64, LobbySession>,
    rooms: HashMap<u64, RoomHandleRef>,
    room_list: HashMap<u64, RoomInList>,
    owned_rooms: HashMap<u64, u64>,
    next_session_id: Arc<AtomicU64>,
    next_room_id: Arc<AtomicU64>,
    logger: Arc<dyn GameLogger>,
    max_players_per_room: usize,
    afk_timeout: Duration,
    self_handle: LobbyHandle,
    rx: mpsc::UnboundedReceiver<LobbyMessage>,
}

type RoomHandleRef = crate::room::RoomHandle;

impl Lobby {
    pub fn spawn(
        logger: Arc<dyn GameLogger>,
        max_players_per_room: usize,
        afk_timeout: Duration,
    ) -> LobbyHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LobbyHandle { tx };
        let lobby = Lobby {
            sessions: HashMap::new(),
            rooms: HashMap::new(),
            room_list: HashMap::new(),
            owned_rooms: HashMap::new(),
            next_session_id: Arc::new(AtomicU64::new(1)),
            next_room_id: Arc::new(AtomicU64::new(1)),
            logger,
            max_players_per_room,
            afk_timeout,
            self_handle: handle.clone(),
            rx,
        };
        tokio::spawn(lobby.run());
        handle
    }

    async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                LobbyMessage::Register { reply } => self.handle_register(reply),
                LobbyMessage::Unregister { session_id } => self.handle_unregister(session_id),
                LobbyMessage::Command { session_id, command } => {
                    self.handle_command(session_id, command)
                }
                LobbyMessage::RoomListUpdated(room) => {
                    self.room_list.insert(room.id, room.clone());
                    self.broadcast(&ServerEvent::RoomInListUpdatedEvent { room });
                }
                LobbyMessage::RoomListRemoved(room_id) => {
                    self.room_list.remove(&room_id);
                    self.rooms.remove(&room_id);
                    self.owned_rooms.retain(|_, &mut rid| rid != room_id);
                    self.broadcast(&ServerEvent::RoomInListRemovedEvent { room_id });
                }
            }
        }
    }

    fn handle_register(&mut self, reply: oneshot::Sender<(u64, SessionRx)>) {
        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(WsSession {
            id,
            tx,
            nickname: std::sync::Mutex::new(String::new()),
        });
        self.sessions.insert(
            id,
            LobbySession {
                handle,
                room: None,
            },
        );
        let _ = reply.send((id, rx));
    }

    fn handle_unregister(&mut self, session_id: u64) {
        let Some(sess) = self.sessions.remove(&session_id) else {
            return;
        };
        if let Some(room_id) = sess.room {
            if let Some(handle) = self.rooms.get(&room_id) {
                handle.send(RoomCommand::RemoveClient(session_id));
            }
        }
        self.broadcast(&ServerEvent::ClientLeftEvent { id: session_id });
    }

    fn handle_command(&mut self, session_id: u64, command: Command) {
        if !self.sessions.contains_key(&session_id) {
            return;
        }
        match command {
            Command::Lobby(LobbyCommand::Join { nickname }) => self.handle_join(session_id, nickname),
            Command::Lobby(LobbyCommand::CreateRoom) => self.handle_create_room(session_id),
            Command::Lobby(LobbyCommand::JoinRoom { room_id }) => {
                self.handle_join_room(session_id, room_id)
            }
            Command::Room(cmd) => self.delegate_room(session_id, cmd),
            Command::Game(cmd) => self.delegate_game(session_id, cmd),
        }
    }

    fn handle_join(&mut self, session_id: u64, nickname: String) {
        let Some(sess) = self.sessions.get(&session_id) else {
            return;
        };
        *sess.handle.nickname.lock().unwrap() = nickname.clone();

        let announce = ServerEvent::ClientBroadCastJoinedEvent {
            id: session_id,
            nickname: nickname.clone(),
        };
        for (&id, s) in &self.sessions {
            if id != session_id {
                s.handle.send_event(&announce);
            }
        }

        let clients: Vec<ClientInfo> = self
            .sessions
            .iter()
            .map(|(&id, s)| ClientInfo {
                id,
                nickname: s.handle.nickname(),
            })
            .collect();
        let rooms: Vec<RoomInList> = self.room_list.values().cloned().collect();

        if let Some(sess) = self.sessions.get(&session_id) {
            sess.handle.send_event(&ServerEvent::ClientJoinedEvent {
                your_id: session_id,
                your_nickname: nickname,
                clients,
                rooms,
            });
        }
    }

    fn handle_create_room(&mut self, session_id: u64) {
        if self.owned_rooms.contains_key(&session_id) {
            self.send_error(session_id, "errorYouCanCreateOneRoomOnly");
            return;
        }
        self.leave_current_room(session_id);

        let room_id = self.next_room_id.fetch_add(1, Ordering::SeqCst);
        let room_handle = Room::spawn(
            room_id,
            session_id,
            self.self_handle.clone(),
            self.logger.clone(),
            self.max_players_per_room,
            self.afk_timeout,
            self.next_session_id.clone(),
        );
        self.rooms.insert(room_id, room_handle.clone());
        self.owned_rooms.insert(session_id, room_id);
        if let Some(sess) = self.sessions.get_mut(&session_id) {
            sess.room = Some(room_id);
        }

        let snapshot = RoomInList {
            id: room_id,
            owner_id: session_id,
            name: format!("Room {room_id}"),
            game_status: "none".to_string(),
            members_num: 0,
        };
        self.room_list.insert(room_id, snapshot.clone());
        self.broadcast(&ServerEvent::ClientCreatedRoomEvent { room: snapshot });

        let Some(sess) = self.sessions.get(&session_id) else {
            return;
        };
        let session_handle: SessionHandle = sess.handle.clone();
        room_handle.send(RoomCommand::AddClient(session_handle));
    }

    fn handle_join_room(&mut self, session_id: u64, room_id: u64) {
        let Some(sess) = self.sessions.get(&session_id) else {
            return;
        };
        if sess.room == Some(room_id) {
            return;
        }
        let Some(room_handle) = self.rooms.get(&room_id).cloned() else {
            self.send_error(session_id, "errorRoomDoesNotExist");
            return;
        };
        self.leave_current_room(session_id);

        let Some(sess) = self.sessions.get_mut(&session_id) else {
            return;
        };
        sess.room = Some(room_id);
        let session_handle: SessionHandle = sess.handle.clone();
        room_handle.send(RoomCommand::AddClient(session_handle));
    }

    fn leave_current_room(&mut self, session_id: u64) {
        let prior_room = self
            .sessions
            .get_mut(&session_id)
            .and_then(|s| s.room.take());
        if let Some(room_id) = prior_room {
            if let Some(handle) = self.rooms.get(&room_id) {
                handle.send(RoomCommand::RemoveClient(session_id));
            }
        }
    }

    fn delegate_room(&mut self, session_id: u64, cmd: WireRoomCommand) {
        let Some(room_id) = self.sessions.get(&session_id).and_then(|s| s.room) else {
            tracing::warn!(session_id, "room command with no current room, dropping");
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };
        let msg = match cmd {
            WireRoomCommand::WantToPlay => RoomCommand::WantToPlay(session_id),
            WireRoomCommand::WantToSpectate => RoomCommand::WantToSpectate(session_id),
            WireRoomCommand::SetPlayerStatus { member_id, status } => {
                RoomCommand::SetPlayerStatus {
                    by: session_id,
                    member_id,
                    status,
                }
            }
            WireRoomCommand::StartGame => RoomCommand::StartGame(session_id),
            WireRoomCommand::DeleteGame => RoomCommand::DeleteGame(session_id),
            WireRoomCommand::AddBot => RoomCommand::AddBot(session_id),
            WireRoomCommand::RemoveBots => RoomCommand::RemoveBots(session_id),
        };
        handle.send(msg);
    }

    fn delegate_game(&mut self, session_id: u64, cmd: GameCommand) {
        let Some(room_id) = self.sessions.get(&session_id).and_then(|s| s.room) else {
            tracing::warn!(session_id, "game command with no current room, dropping");
            return;
        };
        let Some(handle) = self.rooms.get(&room_id) else {
            return;
        };
        handle.send(RoomCommand::GameAction(session_id, cmd));
    }

    fn send_error(&self, session_id: u64, message: &str) {
        if let Some(sess) = self.sessions.get(&session_id) {
            sess.handle.send_event(&ServerEvent::ClientCommandError {
                message: message.to_string(),
            });
        }
    }

    fn broadcast(&self, event: &ServerEvent) {
        for s in self.sessions.values() {
            s.handle.send_event(event);
        }
    }
}
