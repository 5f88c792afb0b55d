//! Session invalidation context.
//!
//! The daemon authenticates with a session cookie. When any call comes back
//! 401 the credential is gone, and every live view of the firewall is stale
//! with it. Instead of each call site deciding what to do, invalidation is
//! announced once on a broadcast channel; pollers stop themselves and the
//! binary decides how to re-authenticate.

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 16;

/// Session-level event delivered to every subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request was answered with HTTP 401: the session credential is no
    /// longer valid and cached state should be abandoned.
    Invalidated,
}

/// Cloneable handle distributing session events.
#[derive(Debug, Clone)]
pub struct SessionContext {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Announce an invalidated session. A send with no subscribers is fine;
    /// the event is simply dropped.
    pub fn invalidate(&self) {
        let _ = self.tx.send(SessionEvent::Invalidated);
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let ctx = SessionContext::new();
        let mut first = ctx.subscribe();
        let mut second = ctx.subscribe();

        ctx.invalidate();

        assert_eq!(first.recv().await.unwrap(), SessionEvent::Invalidated);
        assert_eq!(second.recv().await.unwrap(), SessionEvent::Invalidated);
    }

    #[test]
    fn invalidate_without_subscribers_is_harmless() {
        SessionContext::new().invalidate();
    }
}
