//! The `GameLogger` capability: best-effort, non-blocking game history.
//!
//! Grounded in `game_file_logger.go`: a per-game buffered channel drained by
//! a dedicated writer task that accumulates the whole log in memory and
//! flushes it as a single file write on `log_game_ends`. Errors never reach
//! gameplay (§4.5, §7.4) — they go to an error callback instead.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::card::Card;

/// The engine calls these from inside the Game loop; every method must be
/// non-blocking on that hot path (§4.5).
pub trait GameLogger: Send + Sync {
    fn log_game_begins(&self, game_id: &str, state: &str);
    fn log_player_action_attack(&self, game_id: &str, card: &Card, state: &str);
    fn log_player_action_defend(&self, game_id: &str, attacking: &Card, defending: &Card, state: &str);
    fn log_player_action_pick_up(&self, game_id: &str, state: &str);
    fn log_player_action_complete(&self, game_id: &str, state: &str);
    fn log_game_ends(&self, game_id: &str, has_loser: bool, loser_index: i32, state: &str);
}

/// No-op logger, useful for tests that don't want a filesystem dependency.
pub struct NullLogger;

impl GameLogger for NullLogger {
    fn log_game_begins(&self, _game_id: &str, _state: &str) {}
    fn log_player_action_attack(&self, _game_id: &str, _card: &Card, _state: &str) {}
    fn log_player_action_defend(&self, _game_id: &str, _attacking: &Card, _defending: &Card, _state: &str) {}
    fn log_player_action_pick_up(&self, _game_id: &str, _state: &str) {}
    fn log_player_action_complete(&self, _game_id: &str, _state: &str) {}
    fn log_game_ends(&self, _game_id: &str, _has_loser: bool, _loser_index: i32, _state: &str) {}
}

/// Writes one file per game under `<dir>/YYYYMM/<gameId>.log`, built from a
/// per-game buffered channel drained by a background writer task.
pub struct FileGameLogger {
    dir: PathBuf,
    err_callback: Arc<dyn Fn(std::io::Error) + Send + Sync>,
}

impl FileGameLogger {
    pub fn new(dir: impl Into<PathBuf>, err_callback: impl Fn(std::io::Error) + Send + Sync + 'static) -> Self {
        Self {
            dir: dir.into(),
            err_callback: Arc::new(err_callback),
        }
    }

    /// Spawn the writer task for one game and return a handle that buffers
    /// lines into it. Call once per game, at `log_game_begins` time.
    pub fn start_game(&self, game_id: &str, first_entry: String) -> GameLogHandle {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let dir = self.dir.clone();
        let game_id = game_id.to_string();
        let err_callback = self.err_callback.clone();

        tokio::spawn(async move {
            let mut contents = String::new();
            while let Some(lines) = rx.recv().await {
                contents.push_str(&lines);
            }
            if let Err(e) = write_log_file(&dir, &game_id, &contents).await {
                err_callback(e);
            }
        });

        let _ = tx.send(first_entry);
        GameLogHandle { tx }
    }
}

async fn write_log_file(dir: &std::path::Path, game_id: &str, contents: &str) -> std::io::Result<()> {
    let month_dir = dir.join(current_year_month());
    tokio::fs::create_dir_all(&month_dir).await?;
    let path = month_dir.join(format!("{game_id}.log"));
    tokio::fs::write(path, contents).await
}

fn current_year_month() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let days = secs / 86_400;
    // Civil-from-days (Howard Hinnant's algorithm), good enough for a log
    // directory name — no calendar crate needed for year/month only.
    let z = days as i64 + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{:04}{:02}", y, m)
}

/// A per-game sender into the background writer task.
#[derive(Clone)]
pub struct GameLogHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl GameLogHandle {
    fn push(&self, line: String) {
        // Dropped silently if the writer task already exited — logging
        // must never block or fail gameplay (§4.5).
        let _ = self.tx.send(line);
    }
}

/// Adapts a [`FileGameLogger`] plus the live per-game handles into the
/// [`GameLogger`] trait the engine calls, keyed by game id.
pub struct HandleGameLogger {
    file_logger: FileGameLogger,
    handles: std::sync::Mutex<std::collections::HashMap<String, GameLogHandle>>,
}

impl HandleGameLogger {
    pub fn new(file_logger: FileGameLogger) -> Self {
        Self {
            file_logger,
            handles: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    fn with_handle(&self, game_id: &str, f: impl FnOnce(&GameLogHandle)) {
        if let Some(h) = self.handles.lock().unwrap().get(game_id) {
            f(h);
        }
    }
}

impl GameLogger for HandleGameLogger {
    fn log_game_begins(&self, game_id: &str, state: &str) {
        let entry = format!("ENTRY Game begins. ID={game_id}\n{state}");
        let handle = self.file_logger.start_game(game_id, entry);
        self.handles
            .lock()
            .unwrap()
            .insert(game_id.to_string(), handle);
    }

    fn log_player_action_attack(&self, game_id: &str, card: &Card, state: &str) {
        self.with_handle(game_id, |h| {
            h.push(format!("ENTRY Attack. card={card};\n{state}"));
        });
    }

    fn log_player_action_defend(&self, game_id: &str, attacking: &Card, defending: &Card, state: &str) {
        self.with_handle(game_id, |h| {
            h.push(format!(
                "ENTRY Defend. attackingCard={attacking}; defendingCard={defending}\n{state}"
            ));
        });
    }

    fn log_player_action_pick_up(&self, game_id: &str, state: &str) {
        self.with_handle(game_id, |h| {
            h.push(format!("ENTRY PickUp.\n{state}"));
        });
    }

    fn log_player_action_complete(&self, game_id: &str, state: &str) {
        self.with_handle(game_id, |h| {
            h.push(format!("ENTRY Complete.\n{state}"));
        });
    }

    fn log_game_ends(&self, game_id: &str, has_loser: bool, loser_index: i32, state: &str) {
        self.with_handle(game_id, |h| {
            h.push(format!(
                "ENTRY Game ends. hasLoser={has_loser};loserIndex={loser_index}\n{state}"
            ));
        });
        // Dropping the handle closes its channel, which ends the writer
        // task's recv loop and triggers the single flushed file write.
        self.handles.lock().unwrap().remove(game_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Suit, Value};

    #[test]
    fn null_logger_accepts_everything() {
        let logger = NullLogger;
        logger.log_game_begins("g1", "state");
        logger.log_game_ends("g1", true, 2, "state");
    }

    #[tokio::test]
    async fn file_logger_writes_accumulated_contents_once() {
        let tmp = std::env::temp_dir().join(format!("durak-logger-test-{}", std::process::id()));
        let logger = HandleGameLogger::new(FileGameLogger::new(tmp.clone(), |_e| {}));
        logger.log_game_begins("game-1", "State: fresh\n");
        logger.log_player_action_attack("game-1", &Card::new(Value::Six, Suit::Clubs), "State: ...\n");
        logger.log_game_ends("game-1", false, -1, "State: done\n");

        // Give the writer task a beat to flush.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let month_dir = tmp.join(current_year_month());
        let path = month_dir.join("game-1.log");
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.contains("Game begins"));
        assert!(contents.contains("Attack"));
        assert!(contents.contains("Game ends"));

        let _ = tokio::fs::remove_dir_all(&tmp).await;
    }
}
