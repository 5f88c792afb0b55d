//! Confirmation-gated command surface.
//!
//! [`ActionDispatcher`] wraps the raw client calls with the two concerns a
//! frontend always ends up reimplementing: asking before destructive
//! commands and telling the operator what happened. Destructive commands
//! go through the [`ConfirmationGate`] first and send no request when the
//! operator declines. Every notification renders patterns in display form,
//! never in transport form.

use std::sync::Arc;

use tracing::debug;

use {
    rexwall_client::{ApiClient, Error as ClientError},
    rexwall_codec as codec,
    rexwall_protocol::{FilterAddRequest, RegexFilter, ServiceAddRequest},
};

use crate::notify::{ConfirmationGate, NotificationSink};

/// How a dispatched command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The daemon acknowledged the command.
    Done,
    /// The operator declined the confirmation prompt; no request was sent.
    Declined,
    /// The daemon rejected the submitted pattern. This is a field error
    /// for the caller to render next to the input, not a notification.
    InvalidPattern,
    /// The session died mid-command. Nothing is notified here: the session
    /// context already broadcast the invalidation.
    SessionExpired,
    /// The command failed; the reason also went to the sink.
    Failed(String),
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Display form of a transport pattern, falling back to the raw text when
/// it does not decode.
fn display_pattern(pattern: &str) -> String {
    codec::transport_to_display(pattern).unwrap_or_else(|_| pattern.to_string())
}

/// Commands with confirmation and notification wired in.
pub struct ActionDispatcher {
    client: ApiClient,
    sink: Arc<dyn NotificationSink>,
    gate: Arc<dyn ConfirmationGate>,
}

impl ActionDispatcher {
    pub fn new(
        client: ApiClient,
        sink: Arc<dyn NotificationSink>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self { client, sink, gate }
    }

    /// Collapse a command result into an [`Outcome`], notifying either way.
    async fn finish(
        &self,
        result: rexwall_client::Result<()>,
        ok_title: &str,
        ok_description: &str,
        err_title: &str,
    ) -> Outcome {
        match result {
            Ok(()) => {
                self.sink.success(ok_title, ok_description).await;
                Outcome::Done
            },
            Err(err) if err.is_session_expired() => Outcome::SessionExpired,
            Err(err) => {
                let reason = err.to_string();
                self.sink
                    .error(err_title, &format!("Error: {reason}"))
                    .await;
                Outcome::Failed(reason)
            },
        }
    }

    // ── Service lifecycle ────────────────────────────────────────────────

    pub async fn start_service(&self, service_id: &str) -> Outcome {
        self.finish(
            self.client.start_service(service_id).await,
            "Service start complete!",
            &format!("The service {service_id} has been started!"),
            "An error occurred while starting the service",
        )
        .await
    }

    pub async fn stop_service(&self, service_id: &str) -> Outcome {
        self.finish(
            self.client.stop_service(service_id).await,
            "Service stop complete!",
            &format!("The service {service_id} has been stopped!"),
            "An error occurred while stopping the service",
        )
        .await
    }

    pub async fn pause_service(&self, service_id: &str) -> Outcome {
        self.finish(
            self.client.pause_service(service_id).await,
            "Service pause complete!",
            &format!("The service {service_id} has been paused!"),
            "An error occurred while pausing the service",
        )
        .await
    }

    pub async fn add_service(&self, request: &ServiceAddRequest) -> Outcome {
        self.finish(
            self.client.add_service(request).await,
            "Service creation complete!",
            &format!(
                "The service {} has been added on port {}!",
                request.name, request.public_port
            ),
            "An error occurred while adding a new service",
        )
        .await
    }

    /// Deleting a service is irreversible, so it is gated.
    pub async fn delete_service(&self, service_id: &str) -> Outcome {
        let prompt = format!("Are you sure to delete the service '{service_id}'?");
        if !self.gate.confirm(&prompt).await {
            debug!(service = %service_id, "delete declined");
            return Outcome::Declined;
        }
        self.finish(
            self.client.delete_service(service_id).await,
            "Service delete complete!",
            &format!("The service {service_id} has been deleted!"),
            "An error occurred while deleting a service",
        )
        .await
    }

    /// Rebinding the internal port breaks anything attached to the old
    /// one, so it is gated.
    pub async fn regen_port(&self, service_id: &str) -> Outcome {
        let prompt =
            format!("Are you sure to change the internal port of the service '{service_id}'?");
        if !self.gate.confirm(&prompt).await {
            return Outcome::Declined;
        }
        self.finish(
            self.client.regen_port(service_id).await,
            "Service port regeneration completed!",
            &format!("The service {service_id} has changed the internal port!"),
            "An error occurred while changing the internal service port",
        )
        .await
    }

    // ── Filters ──────────────────────────────────────────────────────────

    /// Submit a filter built by [`FilterDraft`](crate::FilterDraft).
    ///
    /// A daemon-side "invalid regex" rejection becomes
    /// [`Outcome::InvalidPattern`] with no notification: syntax problems
    /// belong next to the input field, not in a toast.
    pub async fn add_filter(&self, request: &FilterAddRequest) -> Outcome {
        let display = display_pattern(&request.pattern);
        match self.client.add_filter(request).await {
            Ok(()) => {
                let sensitivity = if request.is_case_sensitive {
                    "case sensitive"
                } else {
                    "case insensitive"
                };
                self.sink
                    .success(
                        &format!("Regex {display} has been added"),
                        &format!(
                            "Successfully added {sensitivity} regex to {} service",
                            request.service_id
                        ),
                    )
                    .await;
                Outcome::Done
            },
            Err(err) if err.is_session_expired() => Outcome::SessionExpired,
            Err(ClientError::Rejected(reason)) if reason.eq_ignore_ascii_case("invalid regex") => {
                Outcome::InvalidPattern
            },
            Err(err) => {
                let reason = err.to_string();
                self.sink
                    .error(
                        "An error occurred while adding a new regex",
                        &format!("Error: {reason}"),
                    )
                    .await;
                Outcome::Failed(reason)
            },
        }
    }

    /// Gated: dropping an active filter restarts the firewall. The prompt
    /// and the notification quote the pattern as the operator typed it,
    /// with the find wrapper stripped.
    pub async fn delete_filter(&self, filter: &RegexFilter) -> Outcome {
        let display = display_pattern(&filter.pattern);
        let (_, shown) = codec::classify(&display);
        let prompt = format!(
            "Are you sure to delete the regex '{shown}'? This causes a restart of the firewall if it is active."
        );
        if !self.gate.confirm(&prompt).await {
            return Outcome::Declined;
        }
        self.finish(
            self.client.delete_filter(filter.id).await,
            "Regex delete complete!",
            &format!("The regex '{shown}' has been deleted!"),
            "An error occurred while deleting the regex",
        )
        .await
    }

    // ── Firewall ─────────────────────────────────────────────────────────

    /// Gated: stops every service, optionally deleting them too.
    pub async fn reset_firewall(&self, delete_services: bool) -> Outcome {
        let prompt = if delete_services {
            "Are you sure to reset the firewall? Every service will be stopped and deleted."
        } else {
            "Are you sure to reset the firewall? Every service will be stopped."
        };
        if !self.gate.confirm(prompt).await {
            return Outcome::Declined;
        }
        self.finish(
            self.client.reset_firewall(delete_services).await,
            "Firewall reset complete!",
            "The firewall state has been reset!",
            "An error occurred while resetting the firewall",
        )
        .await
    }
}
