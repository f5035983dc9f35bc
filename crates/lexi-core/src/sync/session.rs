//! Session and connectivity providers consumed by the orchestrator.

use std::sync::Arc;

use tokio::sync::watch;

/// Source of the signed-in user; `None` keeps cycles local-only.
pub trait SessionProvider {
    fn current_user_id(&self) -> Option<String>;
}

/// Network reachability as seen by the host.
pub trait Connectivity {
    fn is_online(&self) -> bool;
}

/// Session with a fixed user.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    user_id: Option<String>,
}

impl StaticSession {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Session with nobody signed in.
    pub const fn signed_out() -> Self {
        Self { user_id: None }
    }
}

impl SessionProvider for StaticSession {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// Shared online flag that also publishes changes.
///
/// Clones share the flag; [`ConnectivityFlag::subscribe`] hands out
/// receivers that wake when it flips.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Update the flag, notifying subscribers only on change.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_session() {
        assert_eq!(StaticSession::new("u-1").current_user_id().as_deref(), Some("u-1"));
        assert!(StaticSession::signed_out().current_user_id().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_connectivity_flag_publishes_changes() {
        let flag = ConnectivityFlag::new(false);
        let mut rx = flag.subscribe();
        assert!(!flag.is_online());

        flag.set_online(false);
        assert!(!rx.has_changed().unwrap());

        flag.clone().set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
        assert!(flag.is_online());
    }
}
