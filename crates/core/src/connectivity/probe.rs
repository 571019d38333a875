//! Connectivity monitor that periodically probes an HTTP endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use super::ConnectivityMonitor;

/// Probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Enable probing. When disabled the service assumes it is online.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// URL to probe. Any HTTP response counts as online.
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    /// Seconds between probes.
    #[serde(default = "default_interval")]
    pub probe_interval_secs: u64,
    /// Per-probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_probe_url() -> String {
    "https://api.themoviedb.org".to_string()
}

fn default_interval() -> u64 {
    15
}

fn default_probe_timeout() -> u64 {
    5
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            probe_url: default_probe_url(),
            probe_interval_secs: default_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

/// Connectivity monitor backed by a background HTTP probe loop.
pub struct HttpConnectivityMonitor {
    config: ProbeConfig,
    client: Client,
    status_tx: Arc<watch::Sender<bool>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl HttpConnectivityMonitor {
    /// Create a monitor that starts out assuming `initial`.
    pub fn new(config: ProbeConfig, initial: bool) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()?;
        let (status_tx, _) = watch::channel(initial);
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            client,
            status_tx: Arc::new(status_tx),
            shutdown_tx,
        })
    }

    /// Probe once and publish the result. Returns the new status.
    pub async fn probe_once(&self) -> bool {
        let online = probe(&self.client, &self.config.probe_url).await;
        publish(&self.status_tx, online);
        online
    }

    /// Spawn the probe loop.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        let client = self.client.clone();
        let url = self.config.probe_url.clone();
        let interval = Duration::from_secs(self.config.probe_interval_secs.max(1));
        let status_tx = Arc::clone(&self.status_tx);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("Starting connectivity probe against {}", url);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let online = probe(&client, &url).await;
                        publish(&status_tx, online);
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Connectivity probe shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the probe loop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

async fn probe(client: &Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(_) => true,
        Err(e) => {
            debug!("Connectivity probe failed: {}", e);
            false
        }
    }
}

fn publish(status_tx: &watch::Sender<bool>, online: bool) {
    status_tx.send_if_modified(|current| {
        if *current == online {
            return false;
        }
        info!(online, "Connectivity changed");
        *current = online;
        true
    });
}

impl ConnectivityMonitor for HttpConnectivityMonitor {
    fn is_online(&self) -> bool {
        *self.status_tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.status_tx.subscribe()
    }
}
