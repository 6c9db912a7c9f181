//! Wire protocol: the command envelope clients send and the event envelope
//! the server sends back.
//!
//! Grounded in the original `client_command.go` / `events*.go` (a `{type,
//! subType, data}` command envelope, parsed in two steps because the shape
//! of `data` depends on `type`/`subType`) and, for the Rust encoding
//! discipline, `poker-core::protocol` (tagged enums, `#[serde(rename_all =
//! "camelCase")]`, doc comments on every wire variant).

use crate::card::Card;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

/// The raw `{type, subType, data}` envelope every client command arrives as.
///
/// `data` is left as an untyped [`serde_json::Value`] because its shape
/// depends on `kind`/`sub_type` — mirrors `ClientCommand.Data
/// json.RawMessage` in the original.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCommand {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "subType")]
    pub sub_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// A malformed or unrecognised command — per §7.2 this is logged and the
/// command is dropped, never surfaced to the client or crashed on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommandParseError {
    #[error("unknown command {kind}/{sub_type}")]
    UnknownCommand { kind: String, sub_type: String },
    #[error("malformed data for {kind}/{sub_type}: {source}")]
    MalformedData {
        kind: String,
        sub_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// `lobby/*` commands.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LobbyCommand {
    Join { nickname: String },
    CreateRoom,
    JoinRoom { room_id: u64 },
}

/// `room/*` commands.
#[derive(Debug, Clone, Deserialize)]
pub enum RoomCommand {
    WantToPlay,
    WantToSpectate,
    SetPlayerStatus { member_id: u64, status: bool },
    StartGame,
    DeleteGame,
    AddBot,
    RemoveBots,
}

/// `game/*` commands — one per player intent the engine accepts (§4.3).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GameCommand {
    Attack {
        card: Card,
    },
    Defend {
        attacking_card: Card,
        defending_card: Card,
    },
    PickUp,
    Complete,
}

/// A fully parsed client command, ready to route (§4.1 `onCommand`).
#[derive(Debug, Clone)]
pub enum Command {
    Lobby(LobbyCommand),
    Room(RoomCommand),
    Game(GameCommand),
}

impl RawCommand {
    /// Decode `data` into the typed command this envelope names.
    ///
    /// Protocol-contract violations (§7.2) are returned as
    /// [`CommandParseError`] — callers log and drop, never panic.
    pub fn parse(self) -> Result<Command, CommandParseError> {
        let RawCommand {
            kind,
            sub_type,
            data,
        } = self;

        let err_malformed = |source| CommandParseError::MalformedData {
            kind: kind.clone(),
            sub_type: sub_type.clone(),
            source,
        };

        match kind.as_str() {
            "lobby" => {
                let cmd = match sub_type.as_str() {
                    "join" => LobbyCommand::Join {
                        nickname: serde_json::from_value(data).map_err(err_malformed)?,
                    },
                    "createRoom" => LobbyCommand::CreateRoom,
                    "joinRoom" => LobbyCommand::JoinRoom {
                        room_id: serde_json::from_value(data).map_err(err_malformed)?,
                    },
                    _ => {
                        return Err(CommandParseError::UnknownCommand { kind, sub_type });
                    }
                };
                Ok(Command::Lobby(cmd))
            }
            "room" => {
                let cmd = match sub_type.as_str() {
                    "wantToPlay" => RoomCommand::WantToPlay,
                    "wantToSpectate" => RoomCommand::WantToSpectate,
                    "setPlayerStatus" => {
                        #[derive(Deserialize)]
                        struct Data {
                            #[serde(rename = "memberId")]
                            member_id: u64,
                            status: bool,
                        }
                        let d: Data = serde_json::from_value(data).map_err(err_malformed)?;
                        RoomCommand::SetPlayerStatus {
                            member_id: d.member_id,
                            status: d.status,
                        }
                    }
                    "startGame" => RoomCommand::StartGame,
                    "deleteGame" => RoomCommand::DeleteGame,
                    "addBot" => RoomCommand::AddBot,
                    "removeBots" => RoomCommand::RemoveBots,
                    _ => {
                        return Err(CommandParseError::UnknownCommand { kind, sub_type });
                    }
                };
                Ok(Command::Room(cmd))
            }
            "game" => {
                let cmd = match sub_type.as_str() {
                    "attack" => {
                        #[derive(Deserialize)]
                        struct Data {
                            card: Card,
                        }
                        let d: Data = serde_json::from_value(data).map_err(err_malformed)?;
                        GameCommand::Attack { card: d.card }
                    }
                    "defend" => {
                        #[derive(Deserialize)]
                        #[serde(rename_all = "camelCase")]
                        struct Data {
                            attacking_card: Card,
                            defending_card: Card,
                        }
                        let d: Data = serde_json::from_value(data).map_err(err_malformed)?;
                        GameCommand::Defend {
                            attacking_card: d.attacking_card,
                            defending_card: d.defending_card,
                        }
                    }
                    "pickUp" => GameCommand::PickUp,
                    "complete" => GameCommand::Complete,
                    _ => {
                        return Err(CommandParseError::UnknownCommand { kind, sub_type });
                    }
                };
                Ok(Command::Game(cmd))
            }
            _ => Err(CommandParseError::UnknownCommand { kind, sub_type }),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared snapshot types
// ---------------------------------------------------------------------------

/// Per-recipient snapshot of the game, sent after every state-changing
/// action (§3 `GameStateInfo`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GameStateInfo {
    pub your_hand: Vec<Card>,
    pub hand_sizes: Vec<usize>,
    pub deck_remaining: usize,
    pub discard_pile_size: usize,
    pub trump_card: Option<Card>,
    pub battleground: Vec<Card>,
    pub defending_cards: HashMap<usize, Card>,
    pub completed: Vec<bool>,
    pub defender_pick_up: bool,
    pub attacker_index: i32,
    pub defender_index: i32,
    pub can_attack: bool,
    pub can_defend: bool,
    pub can_pick_up: bool,
    pub can_complete: bool,
}

/// Lightweight seat info shared in lobby/room listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: u64,
    pub nickname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInList {
    pub id: u64,
    pub owner_id: u64,
    pub name: String,
    pub game_status: String,
    pub members_num: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMemberInfo {
    pub id: u64,
    pub nickname: String,
    pub want_to_play: bool,
    pub is_player: bool,
    pub is_bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: u64,
    pub owner_id: u64,
    pub name: String,
    pub game_status: String,
    pub members: Vec<RoomMemberInfo>,
}

// ---------------------------------------------------------------------------
// Server -> client events
// ---------------------------------------------------------------------------

/// A server-emitted event, tagged by struct name on the wire (§6, §9
/// "Event routing by name"): `{"name": "...", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum ServerEvent {
    // -- Lobby --------------------------------------------------------
    ClientJoinedEvent {
        your_id: u64,
        your_nickname: String,
        clients: Vec<ClientInfo>,
        rooms: Vec<RoomInList>,
    },
    ClientBroadCastJoinedEvent {
        id: u64,
        nickname: String,
    },
    ClientLeftEvent {
        id: u64,
    },
    ClientCreatedRoomEvent {
        room: RoomInList,
    },
    RoomInListUpdatedEvent {
        room: RoomInList,
    },
    RoomInListRemovedEvent {
        room_id: u64,
    },
    ClientCommandError {
        message: String,
    },

    // -- Room ----------------------------------------------------------
    RoomJoinedEvent {
        room: RoomInfo,
    },
    RoomUpdatedEvent {
        room: RoomInfo,
    },

    // -- Game ------------------------------------------------------------
    GamePlayersEvent {
        your_player_index: i32,
        player_names: Vec<String>,
    },
    GameDealEvent {
        state: GameStateInfo,
        trump_card_is_owned_by_player_index: i32,
    },
    GameFirstAttackerEvent {
        reason_card: Card,
        attacker_index: usize,
        defender_index: usize,
        state: GameStateInfo,
    },
    GameStartedEvent {
        state: GameStateInfo,
    },
    GameAttackEvent {
        state: GameStateInfo,
        attacker_index: usize,
        defender_index: usize,
        card: Card,
    },
    GameDefendEvent {
        state: GameStateInfo,
        attacking_card: Card,
        defending_card: Card,
    },
    GameStateEvent {
        state: GameStateInfo,
    },
    NewRoundEvent {
        state: GameStateInfo,
    },
    GamePlayerLeftEvent {
        player_index: usize,
        is_afk: bool,
    },
    GameEndEvent {
        has_loser: bool,
        loser_index: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Suit, Value};

    #[test]
    fn parses_lobby_join() {
        let raw = RawCommand {
            kind: "lobby".into(),
            sub_type: "join".into(),
            data: serde_json::json!("Alice"),
        };
        let parsed = raw.parse().unwrap();
        match parsed {
            Command::Lobby(LobbyCommand::Join { nickname }) => assert_eq!(nickname, "Alice"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_game_attack() {
        let raw = RawCommand {
            kind: "game".into(),
            sub_type: "attack".into(),
            data: serde_json::json!({"card": {"value": "6", "suit": "♦"}}),
        };
        match raw.parse().unwrap() {
            Command::Game(GameCommand::Attack { card }) => {
                assert_eq!(card, Card::new(Value::Six, Suit::Diamonds));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_subtype_is_a_parse_error_not_a_panic() {
        let raw = RawCommand {
            kind: "room".into(),
            sub_type: "doTheHustle".into(),
            data: serde_json::Value::Null,
        };
        assert!(matches!(
            raw.parse(),
            Err(CommandParseError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn malformed_data_is_a_parse_error_not_a_panic() {
        let raw = RawCommand {
            kind: "lobby".into(),
            sub_type: "joinRoom".into(),
            data: serde_json::json!("not-a-number"),
        };
        assert!(matches!(
            raw.parse(),
            Err(CommandParseError::MalformedData { .. })
        ));
    }

    #[test]
    fn event_envelope_round_trips() {
        let event = ServerEvent::GamePlayerLeftEvent {
            player_index: 2,
            is_afk: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"name\":\"GamePlayerLeftEvent\""));
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        match back {
            ServerEvent::GamePlayerLeftEvent {
                player_index,
                is_afk,
            } => {
                assert_eq!(player_index, 2);
                assert!(is_afk);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    impl Command {
        #[cfg(test)]
        fn describe(&self) -> &'static str {
            match self {
                Command::Lobby(_) => "lobby",
                Command::Room(_) => "room",
                Command::Game(_) => "game",
            }
        }
    }

    #[test]
    fn command_describe_matches_kind() {
        let raw = RawCommand {
            kind: "room".into(),
            sub_type: "startGame".into(),
            data: serde_json::Value::Null,
        };
        assert_eq!(raw.parse().unwrap().describe(), "room");
    }
}
