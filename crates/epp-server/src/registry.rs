//! Live-session registry.
//!
//! The server tracks every active session so that shutdown can signal
//! them and operators can inspect what is connected. Only the accept
//! path inserts; only session cleanup and stop remove. The map is owned
//! by one [`Server`](crate::Server) instance, never process-wide.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

/// A registry of active sessions, keyed by session identifier.
#[derive(Debug, Default)]
pub struct Registry {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

#[derive(Debug)]
struct SessionHandle {
    cancel: CancellationToken,
    peer_addr: Option<SocketAddr>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under `id` with its stop token.
    pub fn register(&self, id: &str, cancel: CancellationToken, peer_addr: Option<SocketAddr>) {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .insert(id.to_owned(), SessionHandle { cancel, peer_addr });
    }

    /// Removes a session when it terminates.
    pub fn unregister(&self, id: &str) {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .remove(id);
    }

    /// Signals every registered session to stop.
    pub fn cancel_all(&self) {
        let sessions = self
            .sessions
            .lock()
            .expect("session registry mutex poisoned");
        for handle in sessions.values() {
            handle.cancel.cancel();
        }
    }

    /// Returns `true` if `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .contains_key(id)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .len()
    }

    /// Returns `true` when no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Peer addresses of the live sessions, for operator introspection.
    #[must_use]
    pub fn peers(&self) -> Vec<(String, Option<SocketAddr>)> {
        self.sessions
            .lock()
            .expect("session registry mutex poisoned")
            .iter()
            .map(|(id, handle)| (id.clone(), handle.peer_addr))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_unregister() {
        let registry = Registry::new();
        registry.register("a", CancellationToken::new(), None);
        registry.register("b", CancellationToken::new(), None);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));

        registry.unregister("a");
        assert!(!registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn cancel_all_signals_every_session() {
        let registry = Registry::new();
        let first = CancellationToken::new();
        let second = CancellationToken::new();
        registry.register("a", first.clone(), None);
        registry.register("b", second.clone(), None);

        registry.cancel_all();

        assert!(first.is_cancelled());
        assert!(second.is_cancelled());
    }

    #[test]
    fn unregister_unknown_id_is_a_no_op() {
        let registry = Registry::new();
        registry.unregister("ghost");
        assert!(registry.is_empty());
    }
}
