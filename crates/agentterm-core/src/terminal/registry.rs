//! Live session table and pending delivery handles.
//!
//! Sessions hold a `Weak` reference back to this table and release their own
//! entries on teardown, so the table never outlives its terminal's interest
//! in a session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::session::{AgentSession, lock};

#[derive(Default)]
pub(crate) struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<AgentSession>>>,
    /// At most one pending delivery per session id.
    pending: Mutex<HashMap<String, CancellationToken>>,
}

impl SessionRegistry {
    pub(crate) fn insert(&self, session: Arc<AgentSession>) {
        lock(&self.sessions).insert(session.id().to_string(), session);
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<AgentSession>> {
        lock(&self.sessions).get(id).cloned()
    }

    /// Every live session, ordered by id.
    pub(crate) fn all(&self) -> Vec<Arc<AgentSession>> {
        let mut sessions: Vec<_> = lock(&self.sessions).values().cloned().collect();
        sessions.sort_by(|a, b| a.id().cmp(b.id()));
        sessions
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Record the pending delivery handle for `id`, cancelling any handle
    /// it replaces.
    pub(crate) fn arm(&self, id: &str, token: CancellationToken) {
        let previous = lock(&self.pending).insert(id.to_string(), token);
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Forget the pending handle for `id` without cancelling it. Called when
    /// delivery starts.
    pub(crate) fn disarm(&self, id: &str) {
        lock(&self.pending).remove(id);
    }

    pub(crate) fn pending_len(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Cancel the pending delivery for `id` and drop the session entry.
    /// Safe to call any number of times.
    pub(crate) fn release(&self, id: &str) {
        let pending = lock(&self.pending).remove(id);
        if let Some(token) = pending {
            token.cancel();
        }
        lock(&self.sessions).remove(id);
    }

    /// Empty the table, cancelling every pending delivery, and hand back the
    /// sessions that were live.
    pub(crate) fn drain(&self) -> Vec<Arc<AgentSession>> {
        let pending: Vec<CancellationToken> =
            lock(&self.pending).drain().map(|(_, token)| token).collect();
        for token in pending {
            token.cancel();
        }
        lock(&self.sessions).drain().map(|(_, session)| session).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_starts_empty() {
        let registry = SessionRegistry::default();
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.pending_len(), 0);
        assert!(registry.get("pty-1").is_none());
        assert!(registry.all().is_empty());
    }

    #[test]
    fn arm_replaces_and_cancels_previous_handle() {
        let registry = SessionRegistry::default();
        let first = CancellationToken::new();
        let second = CancellationToken::new();
        registry.arm("pty-1", first.clone());
        registry.arm("pty-1", second.clone());
        assert_eq!(registry.pending_len(), 1);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn disarm_forgets_without_cancelling() {
        let registry = SessionRegistry::default();
        let token = CancellationToken::new();
        registry.arm("pty-1", token.clone());
        registry.disarm("pty-1");
        assert_eq!(registry.pending_len(), 0);
        assert!(!token.is_cancelled());

        // A later release has nothing left to cancel.
        registry.release("pty-1");
        assert!(!token.is_cancelled());
    }

    #[test]
    fn release_cancels_pending_and_is_repeatable() {
        let registry = SessionRegistry::default();
        let token = CancellationToken::new();
        registry.arm("pty-1", token.clone());
        registry.release("pty-1");
        registry.release("pty-1");
        registry.release("unknown");
        assert!(token.is_cancelled());
        assert_eq!(registry.pending_len(), 0);
    }

    #[test]
    fn drain_cancels_every_pending_handle() {
        let registry = SessionRegistry::default();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        registry.arm("pty-1", a.clone());
        registry.arm("pty-2", b.clone());
        assert!(registry.drain().is_empty());
        assert!(a.is_cancelled() && b.is_cancelled());
        assert_eq!(registry.pending_len(), 0);
    }
}
