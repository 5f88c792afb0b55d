//! Presentation seams: notifications and confirmations.
//!
//! The control layer never talks to a terminal or a UI toolkit directly.
//! Outcomes go through [`NotificationSink`] and destructive commands pass a
//! [`ConfirmationGate`] first, so every flow is testable with recording
//! fakes and the binary decides how things actually look.

use async_trait::async_trait;

/// Where success and error notices go.
///
/// Callers pass a short title and a human-readable description. Notices
/// about a filter always carry the display form of its pattern, never the
/// transport form.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn success(&self, title: &str, description: &str);
    async fn error(&self, title: &str, description: &str);
}

/// Yes/no gate in front of destructive commands.
///
/// The dispatcher asks before sending anything; declining means no request
/// leaves the process and no state changes anywhere.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// `prompt` describes the action and the entity about to be affected.
    async fn confirm(&self, prompt: &str) -> bool;
}
