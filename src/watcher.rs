//! Watch-and-reconcile loop for one provider group.
//!
//! A [`Watcher`] owns the tracked names of a single group. Each pass fetches
//! the public address, resolves every name that is not waiting for
//! propagation, and asks the provider to update the ones that differ.
//! Passes of one watcher never overlap: [`Watcher::run`] only ticks again
//! once the previous pass has returned.

use crate::error::{DdnsError, Result};
use crate::pending::{PendingSet, DEFAULT_SWEEP_INTERVAL};
use crate::providers::{UpdateProvider, UpdateStatus};
use crate::resolver::AddressResolver;
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A name kept in sync with the public address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedName {
    /// Fully-qualified name.
    pub name: String,
    /// Group the name belongs to.
    pub group: String,
    /// Address seen on the last lookup, `None` if that lookup failed or
    /// has not happened yet.
    pub last_address: Option<IpAddr>,
}

/// What happened to one name during a pass.
#[derive(Debug)]
pub enum Outcome {
    /// Already pointing at the public address.
    Unchanged,
    /// The provider accepted the update.
    Updated(UpdateStatus),
    /// The name could not be resolved; skipped for this pass.
    LookupFailed(DdnsError),
    /// The provider rejected the update or could not be reached.
    UpdateFailed(DdnsError),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::LookupFailed(_) | Outcome::UpdateFailed(_))
    }

    pub fn error(&self) -> Option<&DdnsError> {
        match self {
            Outcome::LookupFailed(e) | Outcome::UpdateFailed(e) => Some(e),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Unchanged => "unchanged",
            Outcome::Updated(_) => "updated",
            Outcome::LookupFailed(_) | Outcome::UpdateFailed(_) => "failed",
        }
    }
}

/// Per-name line of a pass report.
#[derive(Debug)]
pub struct NameReport {
    pub name: String,
    /// Address the name resolved to, if the lookup succeeded.
    pub old_address: Option<IpAddr>,
    /// Public address the name should carry.
    pub new_address: IpAddr,
    pub outcome: Outcome,
}

/// Result of one reconcile pass. Not persisted.
#[derive(Debug)]
pub struct PassReport {
    pub group: String,
    pub public_address: IpAddr,
    pub checked_at: DateTime<Utc>,
    pub entries: Vec<NameReport>,
    /// Names skipped because they are waiting for propagation.
    pub pending: Vec<String>,
}

impl PassReport {
    /// Number of names the provider updated.
    pub fn updated(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Updated(_)))
            .count()
    }

    /// Number of names that failed.
    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }
}

/// Error reported by a watcher to its supervisor.
#[derive(Error, Debug)]
#[error("[{group}] {error}")]
pub struct WatcherError {
    pub group: String,
    #[source]
    pub error: DdnsError,
}

/// Reconcile loop of one provider group.
pub struct Watcher {
    group: String,
    resolver: Arc<dyn AddressResolver>,
    provider: Box<dyn UpdateProvider>,
    names: Vec<TrackedName>,
    pending: Arc<Mutex<PendingSet>>,
    sweep_interval: Duration,
}

impl Watcher {
    /// Create a watcher for `names`, leaving updated names alone for `window`.
    pub fn new(
        group: String,
        resolver: Arc<dyn AddressResolver>,
        provider: Box<dyn UpdateProvider>,
        names: Vec<String>,
        window: Duration,
    ) -> Self {
        let names = names
            .into_iter()
            .map(|name| TrackedName {
                name,
                group: group.clone(),
                last_address: None,
            })
            .collect();

        Self {
            group,
            resolver,
            provider,
            names,
            pending: Arc::new(Mutex::new(PendingSet::new(window))),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Override how often the background sweep runs.
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    /// Tracked names with the address seen on their last lookup.
    pub fn tracked(&self) -> &[TrackedName] {
        &self.names
    }

    /// Whether `name` is currently waiting for propagation.
    pub async fn is_pending(&self, name: &str) -> bool {
        self.pending.lock().await.is_pending(name, Instant::now())
    }

    /// Run one pass.
    ///
    /// Fails only when the public address cannot be obtained. Per-name
    /// failures are recorded in the report and the pass moves on.
    pub async fn run_pass(&mut self) -> Result<PassReport> {
        self.reconcile(false).await
    }

    /// Run one pass that updates every non-pending name, even when it
    /// already resolves to the public address.
    pub async fn force_pass(&mut self) -> Result<PassReport> {
        self.reconcile(true).await
    }

    async fn reconcile(&mut self, force: bool) -> Result<PassReport> {
        info!(group = %self.group, "starting DDNS check");

        let public = self.resolver.public_address().await?;
        debug!(group = %self.group, public_ip = %public, "public address resolved");

        {
            let evicted = self.pending.lock().await.sweep(Instant::now());
            if !evicted.is_empty() {
                debug!(group = %self.group, names = ?evicted, "propagation window elapsed");
            }
        }

        let mut report = PassReport {
            group: self.group.clone(),
            public_address: public,
            checked_at: Utc::now(),
            entries: Vec::with_capacity(self.names.len()),
            pending: Vec::new(),
        };

        for tracked in &mut self.names {
            if self
                .pending
                .lock()
                .await
                .is_pending(&tracked.name, Instant::now())
            {
                debug!(group = %self.group, subdomain = %tracked.name, "waiting for propagation, skipping");
                report.pending.push(tracked.name.clone());
                continue;
            }

            let current = match self.resolver.resolve_name(&tracked.name).await {
                Ok(ip) => ip,
                Err(e) => {
                    tracked.last_address = None;
                    warn!(
                        group = %self.group,
                        subdomain = %tracked.name,
                        error = %e,
                        "failed to resolve subdomain, skipping"
                    );
                    report.entries.push(NameReport {
                        name: tracked.name.clone(),
                        old_address: None,
                        new_address: public,
                        outcome: Outcome::LookupFailed(e),
                    });
                    continue;
                }
            };
            tracked.last_address = Some(current);

            if current == public && !force {
                debug!(group = %self.group, subdomain = %tracked.name, "up to date");
                report.entries.push(NameReport {
                    name: tracked.name.clone(),
                    old_address: Some(current),
                    new_address: public,
                    outcome: Outcome::Unchanged,
                });
                continue;
            }

            info!(
                group = %self.group,
                subdomain = %tracked.name,
                subdomain_ip = %current,
                public_ip = %public,
                "addresses differ, updating subdomain"
            );

            let outcome = match self.provider.update(&tracked.name, public).await {
                Ok(status) => {
                    self.pending
                        .lock()
                        .await
                        .mark_pending(&tracked.name, Instant::now());
                    info!(
                        group = %self.group,
                        subdomain = %tracked.name,
                        new_ip = %public,
                        ?status,
                        "subdomain updated, waiting for propagation"
                    );
                    Outcome::Updated(status)
                }
                Err(e) => {
                    error!(
                        group = %self.group,
                        subdomain = %tracked.name,
                        new_ip = %public,
                        error = %e,
                        "failed to update subdomain"
                    );
                    Outcome::UpdateFailed(e)
                }
            };

            report.entries.push(NameReport {
                name: tracked.name.clone(),
                old_address: Some(current),
                new_address: public,
                outcome,
            });
        }

        info!(
            group = %self.group,
            updated = report.updated(),
            failed = report.failed(),
            pending = report.pending.len(),
            "DDNS check finished"
        );
        Ok(report)
    }

    /// Run passes every `interval` until `cancel` fires.
    ///
    /// The first pass starts immediately. Errors go to `errors` and never
    /// stop the loop. The background sweep is stopped before returning.
    pub async fn run(
        mut self,
        interval: Duration,
        cancel: CancellationToken,
        errors: mpsc::Sender<WatcherError>,
    ) {
        let sweeper = tokio::spawn(sweep_pending(
            self.group.clone(),
            self.pending.clone(),
            self.sweep_interval,
            cancel.clone(),
        ));

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.run_pass() => result,
            };

            let failures = match result {
                Ok(report) => report
                    .entries
                    .into_iter()
                    .filter_map(|entry| match entry.outcome {
                        Outcome::UpdateFailed(e) => Some(e),
                        _ => None,
                    })
                    .collect(),
                Err(e) => vec![e],
            };

            for error in failures {
                let report = WatcherError {
                    group: self.group.clone(),
                    error,
                };
                if errors.send(report).await.is_err() {
                    debug!(group = %self.group, "error channel closed");
                }
            }
        }

        info!(group = %self.group, "close signal received, watcher stopped");

        if let Err(e) = sweeper.await {
            warn!(group = %self.group, error = %e, "pending sweep task failed");
        }
    }
}

async fn sweep_pending(
    group: String,
    pending: Arc<Mutex<PendingSet>>,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = pending.lock().await.sweep(Instant::now());
                if !evicted.is_empty() {
                    debug!(group = %group, names = ?evicted, "pending subdomains released");
                }
            }
        }
    }

    debug!(group = %group, "pending sweep stopped");
}
