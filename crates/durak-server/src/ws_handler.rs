//! WebSocket transport for a single connection.
//!
//! Each connection registers with the [`Lobby`] immediately on upgrade
//! (spec.md §4.1 "every socket is a session the moment it connects, lobby
//! membership is implicit"), then the read half parses [`RawCommand`]s and
//! forwards them while the write half drains the session's outbound event
//! queue. Ping/pong/idle-timeout constants are pinned from the original
//! `client.go`, quoted in SPEC_FULL §6.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use durak_core::protocol::RawCommand;
use futures_util::{SinkExt, StreamExt};

use crate::lobby::LobbyHandle;

/// `writeWait` in the original `client.go`: time allowed to write a single
/// frame before the connection is considered dead.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
/// `pongWait`: time since the last pong before a connection is dropped.
const PONG_TIMEOUT: Duration = Duration::from_secs(60);
/// `pingPeriod`: 9/10 of `pongWait`, so a ping always lands before timeout.
const PING_PERIOD: Duration = Duration::from_secs(54);
/// `maxMessageSize`: client frames larger than this are rejected.
const MAX_MESSAGE_SIZE: usize = 512;

pub async fn handle_socket(socket: WebSocket, lobby: LobbyHandle) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (session_id, mut event_rx) = lobby.register().await;

    let write_handle = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(PING_PERIOD);
        ping_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    let Ok(text) = serde_json::to_string(&event) else { continue };
                    let write = ws_sink.send(Message::Text(text.into()));
                    if tokio::time::timeout(WRITE_TIMEOUT, write).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    let write = ws_sink.send(Message::Ping(Vec::new().into()));
                    if tokio::time::timeout(WRITE_TIMEOUT, write).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    let mut last_seen = tokio::time::Instant::now();
    let mut liveness_check = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            frame = ws_stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = tokio::time::Instant::now();
                        if text.len() > MAX_MESSAGE_SIZE {
                            tracing::warn!(session_id, "oversized frame dropped");
                            continue;
                        }
                        match serde_json::from_str::<RawCommand>(&text) {
                            Ok(raw) => match raw.parse() {
                                Ok(command) => lobby.command(session_id, command),
                                Err(e) => tracing::debug!(session_id, error = %e, "dropping unparseable command"),
                            },
                            Err(e) => tracing::debug!(session_id, error = %e, "dropping malformed frame"),
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_seen = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(session_id, error = %e, "socket read error");
                        break;
                    }
                }
            }
            _ = liveness_check.tick() => {
                if last_seen.elapsed() > PONG_TIMEOUT {
                    tracing::info!(session_id, "connection idle past pong timeout, closing");
                    break;
                }
            }
        }
    }

    write_handle.abort();
    lobby.unregister(session_id);
}
