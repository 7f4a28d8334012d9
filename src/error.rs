//! Crate-wide error type
//!
//! Everything here indicates a logic bug or a bad config file; nothing is
//! retried. A failing tick surfaces the error to the main loop unchanged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// `spawn` found no inactive instance left in the pool
    #[error("{kind} pool exhausted (capacity {capacity})")]
    PoolExhausted { kind: &'static str, capacity: usize },

    /// `initialize` called on a script that already ran its priming step
    #[error("script already initialized")]
    ScriptAlreadyInitialized,

    #[error("invalid time scale {0}: must be finite and non-negative")]
    InvalidTimeScale(f64),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;
