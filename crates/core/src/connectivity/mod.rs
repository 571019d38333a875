//! Connectivity observation.
//!
//! The repository asks [`ConnectivityMonitor::is_online`] once per call; the
//! coordinator subscribes to changes to drive the offline flag.

mod probe;

pub use probe::{HttpConnectivityMonitor, ProbeConfig};

use tokio::sync::watch;

/// Current and streamed online status.
pub trait ConnectivityMonitor: Send + Sync {
    /// Point-in-time status.
    fn is_online(&self) -> bool;

    /// Receiver that observes every status change.
    fn subscribe(&self) -> watch::Receiver<bool>;
}

/// A connectivity monitor whose status only changes when told to.
///
/// Used when probing is disabled, and by tests.
#[derive(Debug)]
pub struct StaticConnectivity {
    tx: watch::Sender<bool>,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx }
    }

    /// Change the reported status, notifying subscribers if it differs.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
    }
}

impl ConnectivityMonitor for StaticConnectivity {
    fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
