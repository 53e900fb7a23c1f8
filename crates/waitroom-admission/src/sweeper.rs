//! Expiry sweeper: the background task that frees lapsed slots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use waitroom_tick::{TickConfig, TickScheduler};

use crate::{Coordinator, ExpireOutcome};

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// The sweep did not run because another one was still in progress.
    pub skipped: bool,
    /// Sessions evicted.
    pub evicted: usize,
    /// Waiting visitors moved into the freed slots.
    pub promoted: usize,
    /// Sessions whose expiry failed; they are retried next sweep.
    pub failed: usize,
    /// Lapsed sessions left for the next sweep by the batch limit.
    pub deferred: usize,
}

/// Periodically evicts lapsed sessions and promotes from the queue.
///
/// Each lapsed session goes through [`Coordinator::expire`] on its own, so
/// a failure on one is logged and the rest of the sweep carries on.
pub struct ExpirySweeper {
    coordinator: Arc<Coordinator>,
    /// 0 means no limit.
    batch_limit: usize,
    in_flight: AtomicBool,
}

impl ExpirySweeper {
    pub fn new(coordinator: Arc<Coordinator>, batch_limit: usize) -> Self {
        Self {
            coordinator,
            batch_limit,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Runs one sweep.
    ///
    /// Sweeps never overlap: if one is already running this returns a
    /// report with `skipped` set and does nothing.
    pub async fn sweep(&self) -> SweepReport {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("sweep already in progress, skipping");
            return SweepReport {
                skipped: true,
                ..SweepReport::default()
            };
        }
        let report = self.sweep_inner().await;
        self.in_flight.store(false, Ordering::Release);
        report
    }

    async fn sweep_inner(&self) -> SweepReport {
        let mut report = SweepReport::default();

        let mut lapsed = match self.coordinator.lapsed_members().await {
            Ok(lapsed) => lapsed,
            Err(e) => {
                tracing::error!(error = %e, "sweep could not read lapsed sessions");
                report.failed = 1;
                return report;
            }
        };
        if self.batch_limit > 0 && lapsed.len() > self.batch_limit {
            report.deferred = lapsed.len() - self.batch_limit;
            lapsed.truncate(self.batch_limit);
        }

        for id in lapsed {
            match self.coordinator.expire(&id).await {
                Ok(ExpireOutcome::Evicted { promoted }) => {
                    report.evicted += 1;
                    if promoted.is_some() {
                        report.promoted += 1;
                    }
                }
                Ok(ExpireOutcome::Retained | ExpireOutcome::Absent) => {}
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "failed to expire session");
                    report.failed += 1;
                }
            }
        }

        if report.evicted > 0 || report.failed > 0 {
            tracing::info!(
                evicted = report.evicted,
                promoted = report.promoted,
                failed = report.failed,
                deferred = report.deferred,
                "sweep finished"
            );
        }
        report
    }

    /// Sweeps on every tick until `shutdown` flips to `true`.
    pub async fn run(self: Arc<Self>, tick: TickConfig, mut shutdown: watch::Receiver<bool>) {
        let mut scheduler = TickScheduler::new(tick);
        tracing::info!(interval_ms = scheduler.interval().as_millis() as u64, "expiry sweeper started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = scheduler.wait_for_tick() => {
                    self.sweep().await;
                    scheduler.record_tick_end();
                }
            }
        }

        let metrics = scheduler.metrics();
        tracing::info!(
            sweeps = metrics.total_ticks,
            skipped = metrics.total_skipped,
            "expiry sweeper stopped"
        );
    }
}
