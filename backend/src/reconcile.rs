//! Background reconciliation.
//!
//! Replays mirror writes parked in the outbox and forgets old webhook
//! delivery ids.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::config::{ReconcileConfig, WebhookConfig};
use crate::store::{StoreError, UserStore};

/// Counts from one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub applied: usize,
    pub superseded: usize,
    pub failed: usize,
    pub pruned: usize,
}

pub struct Reconciler {
    store: Arc<UserStore>,
    interval: Duration,
    batch_size: u32,
    retention: chrono::Duration,
}

impl Reconciler {
    pub fn new(store: Arc<UserStore>, reconcile: &ReconcileConfig, webhook: &WebhookConfig) -> Self {
        let retention_hours = i64::try_from(webhook.dedup_retention_hours).unwrap_or(i64::MAX / 3600);
        Self {
            store,
            interval: Duration::from_secs(reconcile.interval_secs),
            batch_size: reconcile.batch_size,
            retention: chrono::Duration::hours(retention_hours),
        }
    }

    /// Run passes every interval until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Reconciler started (interval {:?})", self.interval);

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.run_once() {
                Ok(report) if report != ReconcileReport::default() => {
                    tracing::info!(
                        applied = report.applied,
                        superseded = report.superseded,
                        failed = report.failed,
                        pruned = report.pruned,
                        "Reconciliation pass"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Reconciliation pass failed: {}", e),
            }
        }

        tracing::info!("Reconciler stopped");
    }

    /// One pass: drain a batch of the outbox, then prune the delivery ledger.
    ///
    /// Only the newest entry per user is replayed; it retires the older ones.
    pub fn run_once(&self) -> Result<ReconcileReport, StoreError> {
        let mut report = ReconcileReport::default();

        let mut seen = HashSet::new();
        let mut latest: Vec<_> = self
            .store
            .pending_syncs(self.batch_size)?
            .into_iter()
            .rev()
            .filter(|entry| seen.insert(entry.user_id.clone()))
            .collect();
        latest.reverse();

        for entry in latest {
            match self.store.replay_sync(&entry) {
                Ok(retired) => {
                    report.applied += 1;
                    report.superseded += retired.saturating_sub(1);
                }
                Err(e) => {
                    tracing::warn!(
                        outbox_id = %entry.id,
                        user_id = %entry.user_id,
                        attempts = entry.attempts + 1,
                        "Deferred mirror write failed again: {}",
                        e
                    );
                    self.store.fail_sync(&entry.id, &e.to_string())?;
                    report.failed += 1;
                }
            }
        }

        let cutoff = Utc::now() - self.retention;
        report.pruned = self.store.prune_events(cutoff)?;

        Ok(report)
    }
}
