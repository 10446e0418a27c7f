//! Process-scoped connectivity state.

use std::sync::Arc;
use tokio::sync::watch;

/// Online/offline flag owned by one client and broadcast to subscribers.
///
/// Only the external connectivity detector should change it, through
/// [`ApiClient::set_connectivity`](crate::ApiClient::set_connectivity).
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    /// Create the state with an initial value.
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Whether the device is currently online.
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribe to changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Set the flag and return the previous value. Subscribers are only
    /// notified when the value actually changes.
    pub fn set(&self, online: bool) -> bool {
        let mut previous = online;
        self.tx.send_if_modified(|current| {
            previous = *current;
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_returns_previous() {
        let connectivity = Connectivity::new(true);
        assert!(connectivity.set(false));
        assert!(!connectivity.is_online());
        assert!(!connectivity.set(true));
        assert!(connectivity.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_only() {
        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();

        connectivity.set(true);
        assert!(!rx.has_changed().unwrap());

        connectivity.set(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }

    #[test]
    fn test_clones_share_state() {
        let connectivity = Connectivity::new(false);
        let other = connectivity.clone();
        other.set(true);
        assert!(connectivity.is_online());
    }
}
