//! HTTP control client for a rexwall firewall daemon.
//!
//! [`ApiClient`] wraps `reqwest` with a cookie store (the session credential
//! rides along automatically), joins every endpoint under `/api/`, and
//! funnels session invalidation through a [`SessionContext`] so the rest of
//! the program reacts to a 401 in exactly one place.

pub mod api;
pub mod error;
pub mod session;

pub use {
    api::ApiClient,
    error::{Error, Result},
    session::{SessionContext, SessionEvent},
};
