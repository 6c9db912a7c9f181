//! The duck-typed capability the engine depends on to reach a participant.
//!
//! Grounded in the original `ClientSender` interface (`client.go`): the Game
//! and Room never hold a concrete transport, only this trait object, so a
//! remote WebSocket session and an in-process [`crate::bot::BotClient`] are
//! interchangeable (§9 "Duck-typed session abstraction").

use crate::protocol::ServerEvent;

/// A participant the engine can push events to.
///
/// Implementors must not block in `send_event` — a saturated or closed
/// outbound channel is dropped, not awaited (§5 "Broadcast discipline").
pub trait ClientSender: Send + Sync {
    fn send_event(&self, event: &ServerEvent);
    fn id(&self) -> u64;
    fn nickname(&self) -> String;
}

/// Shared-ownership handle to a [`ClientSender`], cheap to clone and to hand
/// to multiple players/rooms.
pub type SessionHandle = std::sync::Arc<dyn ClientSender>;
