//! Structured error kinds for the evolutionary engine.
//!
//! `Saturated` from the design notes is deliberately absent here: it's a boolean
//! no-op signal internal to [crate::genome::Genome], never surfaced as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NeatError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("duplicate node id {id}")]
    DuplicateNode { id: u16 },
}

pub type Result<T> = std::result::Result<T, NeatError>;
