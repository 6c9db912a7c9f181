pub mod bot;
pub mod card;
pub mod game;
pub mod logger;
pub mod player;
pub mod protocol;
pub mod session;

pub use card::{Card, Deck, DeckError};
pub use game::{Game, GameCallback, GameHandle, GameStatus, PlayerAction};
pub use logger::{FileGameLogger, GameLogger, HandleGameLogger, NullLogger};
pub use player::Player;
pub use protocol::{Command, GameStateInfo, RawCommand, ServerEvent};
pub use session::{ClientSender, SessionHandle};
