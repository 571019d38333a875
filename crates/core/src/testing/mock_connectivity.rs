//! Mock connectivity monitor for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::connectivity::ConnectivityMonitor;

/// Connectivity monitor controlled by the test.
///
/// Counts point-in-time checks so tests can assert how often the engine
/// asked.
#[derive(Debug)]
pub struct MockConnectivity {
    tx: watch::Sender<bool>,
    checks: AtomicUsize,
}

impl MockConnectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self {
            tx,
            checks: AtomicUsize::new(0),
        }
    }

    /// Flip the reported status and notify subscribers.
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }

    /// Number of `is_online` calls so far.
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ConnectivityMonitor for MockConnectivity {
    fn is_online(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
