//! Automatic sync triggers.

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::orchestrator::SyncOrchestrator;
use crate::store::{LocalStore, RemoteStore};

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// User asked for a sync.
    Manual,
    /// Periodic timer fired.
    Timer,
    /// Connectivity came back.
    Reconnect,
    /// The app became visible again.
    Visibility,
}

/// Event sources watched by [`SyncOrchestrator::run_triggers`].
pub struct SyncTriggers {
    /// Manual and visibility triggers; closing the channel stops the loop.
    pub requests: mpsc::Receiver<SyncTrigger>,
    /// Connectivity changes; a flip to online triggers a cycle.
    pub connectivity: Option<watch::Receiver<bool>>,
}

impl SyncTriggers {
    /// Create a trigger set and the sender feeding it.
    pub fn channel(
        capacity: usize,
        connectivity: Option<watch::Receiver<bool>>,
    ) -> (mpsc::Sender<SyncTrigger>, Self) {
        let (tx, requests) = mpsc::channel(capacity);
        (
            tx,
            Self {
                requests,
                connectivity,
            },
        )
    }
}

impl<L: LocalStore, R: RemoteStore> SyncOrchestrator<L, R> {
    /// Request a cycle of `table` for every trigger until the request
    /// channel closes. Returns the number of cycles requested.
    pub async fn run_triggers(&self, table: &str, triggers: SyncTriggers) -> usize {
        let SyncTriggers {
            mut requests,
            mut connectivity,
        } = triggers;

        let mut interval = tokio::time::interval(self.config().sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        interval.tick().await;

        let mut cycles = 0;
        loop {
            let trigger = tokio::select! {
                request = requests.recv() => match request {
                    Some(trigger) => trigger,
                    None => break,
                },
                _ = interval.tick() => SyncTrigger::Timer,
                online = wait_for_online(connectivity.as_mut()), if connectivity.is_some() => {
                    if online {
                        SyncTrigger::Reconnect
                    } else {
                        // Sender gone; stop watching
                        connectivity = None;
                        continue;
                    }
                }
            };

            tracing::debug!("Sync of '{table}' triggered by {trigger:?}");
            let report = self.request_sync(table).await;
            tracing::debug!("Triggered sync of '{table}' finished: {:?}", report.status);
            cycles += 1;
        }

        tracing::debug!("Trigger loop for '{table}' stopped after {cycles} cycles");
        cycles
    }
}

/// Resolve once the flag flips to online; `false` when the sender is gone.
async fn wait_for_online(connectivity: Option<&mut watch::Receiver<bool>>) -> bool {
    let Some(rx) = connectivity else {
        return std::future::pending().await;
    };
    loop {
        if rx.changed().await.is_err() {
            return false;
        }
        if *rx.borrow_and_update() {
            return true;
        }
    }
}
