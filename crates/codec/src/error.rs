//! Codec error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport-form text that is not valid base64.
    #[error("invalid transport pattern: {0}")]
    Transport(#[from] base64::DecodeError),

    /// A `%` in display text not followed by at least one hex digit.
    #[error("percent escape without a hex digit at byte {position}")]
    BadEscape { position: usize },
}
