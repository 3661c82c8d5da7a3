//! Runs one watcher per provider group and multiplexes their errors.

use crate::config::Config;
use crate::error::{DdnsError, Result};
use crate::providers::create_provider;
use crate::resolver::{AddressResolver, HttpResolver};
use crate::watcher::Watcher;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Build the shared HTTP client.
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()?)
}

/// Build one watcher per provider group, sharing `resolver` and `client`.
pub fn build_watchers(
    config: &Config,
    resolver: Arc<dyn AddressResolver>,
    client: &reqwest::Client,
) -> Result<Vec<Watcher>> {
    let watchers = config
        .provider_configs()?
        .into_iter()
        .map(|group| {
            tracing::debug!(
                group = %group.group,
                provider = group.settings.name(),
                subdomains = ?group.names,
                "creating watcher"
            );
            Watcher::new(
                group.group,
                resolver.clone(),
                create_provider(&group.settings, client.clone()),
                group.names,
                config.propagation_window(),
            )
        })
        .collect();

    Ok(watchers)
}

/// Owner of every running watcher.
pub struct Supervisor {
    watchers: Vec<Watcher>,
    interval: Duration,
}

impl Supervisor {
    /// Create an empty supervisor ticking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            watchers: Vec::new(),
            interval,
        }
    }

    /// Create a supervisor with every watcher described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http_client(config)?;
        let resolver: Arc<dyn AddressResolver> =
            Arc::new(HttpResolver::new(client.clone(), config.web_ip.clone()));

        let mut supervisor = Self::new(config.update_interval());
        for watcher in build_watchers(config, resolver, &client)? {
            supervisor.add(watcher);
        }
        Ok(supervisor)
    }

    pub fn add(&mut self, watcher: Watcher) {
        self.watchers.push(watcher);
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Run every watcher until `shutdown` completes.
    ///
    /// Watcher errors are logged and never stop anything. A watcher task that
    /// dies early is logged as soon as it ends while the other groups keep
    /// running; a panic is re-raised once shutdown has completed. On shutdown
    /// every watcher is cancelled and awaited, sweeps included.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if self.watchers.is_empty() {
            return Err(DdnsError::Config(
                "No valid watchers were created, check the [watchers] configuration".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let mut tasks = JoinSet::new();

        info!(
            watchers = self.watchers.len(),
            interval_secs = self.interval.as_secs(),
            "Start watching periodically for changes"
        );

        for watcher in self.watchers {
            tasks.spawn(watcher.run(self.interval, cancel.clone(), tx.clone()));
        }
        drop(tx);

        tokio::pin!(shutdown);
        let mut panicked = None;

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupt signal received, stopping watchers");
                    break;
                }
                Some(err) = rx.recv() => {
                    error!(group = %err.group, error = %err.error, "watcher error");
                }
                Some(joined) = tasks.join_next() => {
                    error!(remaining = tasks.len(), "watcher stopped before shutdown");
                    record_exit(joined, &mut panicked);
                }
            }
        }

        cancel.cancel();
        rx.close();
        while let Some(err) = rx.recv().await {
            error!(group = %err.group, error = %err.error, "watcher error");
        }

        while let Some(joined) = tasks.join_next().await {
            record_exit(joined, &mut panicked);
        }

        if let Some(payload) = panicked {
            std::panic::resume_unwind(payload);
        }

        info!("All watchers stopped");
        Ok(())
    }
}

type PanicPayload = Box<dyn std::any::Any + Send + 'static>;

/// Log how a watcher task ended, keeping the first panic payload.
fn record_exit(
    joined: std::result::Result<(), tokio::task::JoinError>,
    panicked: &mut Option<PanicPayload>,
) {
    match joined {
        Ok(()) => {}
        Err(e) if e.is_panic() => {
            error!("watcher task panicked");
            let payload = e.into_panic();
            panicked.get_or_insert(payload);
        }
        Err(e) => warn!(error = %e, "watcher task ended abnormally"),
    }
}
