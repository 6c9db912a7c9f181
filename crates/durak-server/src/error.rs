//! Transport/setup errors — the crate boundary the teacher left as ad hoc
//! `String`s upgraded to `thiserror`, per SPEC_FULL §7 ("the wider pack never
//! leaves a `String` error at a crate boundary"). Client-visible rule
//! rejections are not `Error`s: they travel as `ClientCommandError` data
//! (§6), never through this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server loop failed: {0}")]
    Serve(#[source] std::io::Error),
}
