//! Entrypoint configuration: flags with environment-variable fallback, the
//! way `poker-server::main` reads `PORT`/`STATIC_DIR` but promoted to
//! `clap` so every flag gets `--help` and validation for free.

use std::time::Duration;

use clap::Parser;

/// Default AFK/turn timeout, per spec.md §4.3 ("AfkTimeoutSeconds (120 s)").
pub const DEFAULT_AFK_TIMEOUT_SECS: u64 = 120;

/// `MaxPlayersInRoom` from the original `room.go`, quoted in spec.md §4.2.
pub const DEFAULT_MAX_PLAYERS_PER_ROOM: usize = 6;

#[derive(Debug, Clone, Parser)]
#[command(name = "durak-server", about = "Real-time multiplayer Durak server")]
pub struct Config {
    /// Address to bind the HTTP/WebSocket listener on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory of static assets served at `/`.
    #[arg(long, env = "STATIC_DIR", default_value = "./dist")]
    pub static_dir: String,

    /// Directory game logs are written under (`<dir>/YYYYMM/<gameId>.log`).
    #[arg(long, env = "LOG_DIR", default_value = "./logs")]
    pub log_dir: String,

    /// Seconds a seat may stay idle before being treated as AFK.
    #[arg(long, env = "AFK_TIMEOUT_SECS", default_value_t = DEFAULT_AFK_TIMEOUT_SECS)]
    pub afk_timeout_secs: u64,

    /// Maximum number of players allowed in a single room.
    #[arg(long, env = "MAX_PLAYERS_PER_ROOM", default_value_t = DEFAULT_MAX_PLAYERS_PER_ROOM)]
    pub max_players_per_room: usize,
}

impl Config {
    pub fn afk_timeout(&self) -> Duration {
        Duration::from_secs(self.afk_timeout_secs)
    }
}
