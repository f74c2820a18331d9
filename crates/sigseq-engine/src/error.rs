//! Error types for the sequencing engine.
//!
//! Almost nothing in the playback path is an error: unknown algorithm ids
//! fall back, out-of-range slot indices are warn-and-ignore, and starting a
//! mode while another runs is defined stop-then-start behavior. These
//! variants cover the argument-validation surface hosts and the CLI hit.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur at the engine's control surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An item index beyond the configured palette.
    #[error("item index {index} out of range for palette of {palette_len} items")]
    ItemOutOfRange {
        /// The offending item index.
        index: usize,
        /// Palette length, hum included.
        palette_len: usize,
    },

    /// A slot value that cannot be parsed or stored.
    #[error("invalid slot value '{value}': {message}")]
    InvalidSlotValue {
        /// The raw value.
        value: String,
        /// Why it was rejected.
        message: String,
    },
}

impl EngineError {
    /// Creates an invalid slot value error.
    pub fn invalid_slot_value(value: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSlotValue {
            value: value.into(),
            message: message.into(),
        }
    }
}
