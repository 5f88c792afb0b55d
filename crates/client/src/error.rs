//! Client error taxonomy.
//!
//! Four distinct outcomes, because callers treat them differently: session
//! expiry is handled globally and surfaces nothing, HTTP failures surface
//! verbatim, and a domain rejection is a normal answer that happens to say
//! no.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The daemon answered 401. The session event has already been
    /// broadcast by the time this error reaches the caller.
    #[error("session expired, authentication required")]
    SessionExpired,

    /// Non-2xx answer other than 401; `message` is the status text.
    #[error("server returned {code}: {message}")]
    Status { code: u16, message: String },

    /// 2xx answer whose envelope carried a rejection instead of `"ok"`.
    #[error("{0}")]
    Rejected(String),

    /// Connection, timeout, or body decoding failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Base URL that cannot be joined with an endpoint path.
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl Error {
    /// True when the caller should surface nothing and let the session
    /// context drive the reaction.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}
