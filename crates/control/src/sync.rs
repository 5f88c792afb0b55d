//! Polling mirror of one service's state.
//!
//! [`ServiceMonitor`] fetches the service metadata and, only when that
//! succeeds, the filter list, on a fixed cadence. The two fetches fail
//! differently on purpose: losing the service means the view itself is gone
//! (the service was probably deleted), while a failed filter fetch is a
//! blip that must not blank out a list the operator is looking at.
//!
//! The mirror takes no locks against user mutations. Commands fired while a
//! cycle is in flight may be overwritten in the snapshot for one interval;
//! the next cycle converges on whatever the daemon says. Stopping the
//! monitor discards in-flight results: nothing is applied and nothing is
//! emitted once the token is cancelled.

use std::{sync::Arc, time::Duration};

use {
    tokio::{
        sync::{RwLock, broadcast},
        task::JoinHandle,
        time,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, warn},
};

use {
    rexwall_client::ApiClient,
    rexwall_protocol::{RegexFilter, Service},
};

/// Cadence used when the caller has no opinion.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const EVENT_CAPACITY: usize = 64;

/// Latest successfully fetched state.
///
/// `service` stays `None` until the first metadata fetch lands. `filters`
/// keeps its previous value across failed filter fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSnapshot {
    pub service: Option<Service>,
    pub filters: Vec<RegexFilter>,
}

/// What a poll cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Fresh metadata and filters were applied to the snapshot.
    Updated,
    /// Metadata arrived but the filter list did not; the previous list
    /// stays in place and polling continues.
    FiltersUnavailable { reason: String },
    /// The service itself could not be fetched; the monitor has stopped.
    ServiceLost { reason: String },
}

/// Background poller for one service.
///
/// Each monitor owns its lifecycle; nothing is shared between monitors.
pub struct ServiceMonitor {
    service_id: String,
    snapshot: Arc<RwLock<ServiceSnapshot>>,
    events: broadcast::Sender<SyncEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ServiceMonitor {
    /// Spawn the poll loop: one cycle immediately, then one per `interval`
    /// until [`stop`](Self::stop) is called or a cycle is fatal.
    pub fn start(client: ApiClient, service_id: impl Into<String>, interval: Duration) -> Self {
        let service_id = service_id.into();
        let snapshot = Arc::new(RwLock::new(ServiceSnapshot::default()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cancel = CancellationToken::new();

        let worker = PollLoop {
            client,
            service_id: service_id.clone(),
            snapshot: Arc::clone(&snapshot),
            events: events.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(worker.run(interval));

        Self {
            service_id,
            snapshot,
            events,
            cancel,
            task,
        }
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Clone of the latest snapshot.
    pub async fn snapshot(&self) -> ServiceSnapshot {
        self.snapshot.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Stop polling. An in-flight cycle finishes its requests but applies
    /// and emits nothing.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// True once the loop has wound down, whether stopped or fatal.
    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop and wait for the loop to wind down.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

struct PollLoop {
    client: ApiClient,
    service_id: String,
    snapshot: Arc<RwLock<ServiceSnapshot>>,
    events: broadcast::Sender<SyncEvent>,
    cancel: CancellationToken,
}

impl PollLoop {
    async fn run(self, interval: Duration) {
        // The first tick fires immediately: that is the startup cycle.
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = self.cancel.cancelled() => break,
            }
            if !self.cycle().await {
                break;
            }
        }
        debug!(service = %self.service_id, "monitor loop finished");
    }

    /// One poll cycle. Returns false when polling must stop.
    async fn cycle(&self) -> bool {
        let service = match self.client.service(&self.service_id).await {
            Ok(service) => service,
            Err(err) if err.is_session_expired() => {
                debug!(service = %self.service_id, "session expired, monitor stopping");
                return false;
            },
            Err(err) => {
                if self.cancel.is_cancelled() {
                    return false;
                }
                warn!(service = %self.service_id, error = %err, "service fetch failed");
                let _ = self.events.send(SyncEvent::ServiceLost {
                    reason: err.to_string(),
                });
                return false;
            },
        };

        // Filters are only fetched once the metadata fetch succeeded.
        if self.cancel.is_cancelled() {
            return false;
        }
        let filters = match self.client.service_filters(&self.service_id).await {
            Ok(list) => Ok(list),
            Err(err) if err.is_session_expired() => return false,
            Err(err) => Err(err.to_string()),
        };

        // A response landing after stop() must not touch the snapshot.
        if self.cancel.is_cancelled() {
            return false;
        }

        let event = {
            let mut snapshot = self.snapshot.write().await;
            snapshot.service = Some(service);
            match filters {
                Ok(list) => {
                    snapshot.filters = list;
                    SyncEvent::Updated
                },
                Err(reason) => {
                    warn!(
                        service = %self.service_id,
                        error = %reason,
                        "filter list fetch failed, keeping previous list"
                    );
                    SyncEvent::FiltersUnavailable { reason }
                },
            }
        };
        let _ = self.events.send(event);
        true
    }
}
