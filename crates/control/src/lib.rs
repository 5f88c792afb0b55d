//! Control-plane building blocks sitting between the HTTP client and a UI.
//!
//! - [`FilterDraft`] turns user-entered pattern text into a submission
//!   request, running the transcoding steps in the one order that is
//!   lossless.
//! - [`ServiceMonitor`] keeps a freshness-bounded mirror of one service and
//!   its filter list by polling, surviving partial failures.
//! - [`ActionDispatcher`] issues mutating commands behind a confirmation
//!   gate and reports outcomes through a notification sink.
//!
//! The daemon stays the single source of truth throughout: mutation acks
//! are advisory and the next poll is the convergence point.

pub mod dispatch;
pub mod form;
pub mod notify;
pub mod sync;

pub use {
    dispatch::{ActionDispatcher, Outcome},
    form::{FilterDraft, FormError},
    notify::{ConfirmationGate, NotificationSink},
    sync::{DEFAULT_POLL_INTERVAL, ServiceMonitor, ServiceSnapshot, SyncEvent},
};
