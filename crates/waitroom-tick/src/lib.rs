//! Fixed-interval tick scheduler for Waitroom.
//!
//! Drives periodic background work (the expiry sweep) at a fixed cadence
//! with skip-on-overrun semantics: when a run takes longer than the
//! interval, the ticks it missed are dropped and counted, never queued.
//! There is never more than one pending tick, so a slow sweep cannot build
//! up a backlog.
//!
//! # Integration
//!
//! The scheduler is designed to sit inside a task's `tokio::select!` loop:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         tick = scheduler.wait_for_tick() => {
//!             sweeper.sweep().await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```
//!
//! All timing uses Tokio's clock, so tests can drive the scheduler with
//! `tokio::time::pause()` and `advance()`.

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the tick scheduler.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks.
    pub interval: Duration,
    /// Random jitter (0..max) added to the *first* tick only, so several
    /// processes started together don't sweep in lockstep.
    pub initial_jitter: Duration,
    /// Fraction of the interval (0.0–1.0) a run may use before a warning
    /// is logged. Default: 0.80.
    pub budget_warn_threshold: f64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            initial_jitter: Duration::ZERO,
            budget_warn_threshold: 0.80,
        }
    }
}

impl TickConfig {
    /// Smallest interval the scheduler accepts.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Create a config for a specific interval with default settings.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis() as u64,
                "tick interval below minimum, clamping"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info (returned to caller each tick)
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired noticeably late.
    pub overrun: bool,
    /// How many whole ticks were dropped because the previous run was
    /// still going when they were due.
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Runtime metrics for the scheduler.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    /// Total ticks fired.
    pub total_ticks: u64,
    /// Ticks that fired late.
    pub total_overruns: u64,
    /// Ticks dropped instead of queued.
    pub total_skipped: u64,
    /// Duration of the most recent run reported via `record_tick_end`.
    pub last_run_time: Duration,
    /// Longest run observed.
    pub max_run_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-interval tick scheduler with skip-on-overrun.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    /// When the next tick should fire.
    next_tick: Instant,
    /// When the current run started. Set by `wait_for_tick`, consumed by
    /// `record_tick_end`.
    run_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Create a new scheduler from config.
    ///
    /// The first tick fires one interval from now, plus jitter.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter > Duration::ZERO {
            let max = config.initial_jitter.as_micros() as u64;
            Duration::from_micros(rand::rng().random_range(0..max.max(1)))
        } else {
            Duration::ZERO
        };

        debug!(
            interval_ms = config.interval.as_millis() as u64,
            jitter_us = jitter.as_micros() as u64,
            "tick scheduler created"
        );

        Self {
            next_tick: Instant::now() + config.interval + jitter,
            config,
            tick_count: 0,
            run_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Create a scheduler for a specific interval with default settings.
    pub fn every(interval: Duration) -> Self {
        Self::new(TickConfig::every(interval))
    }

    /// Wait until the next tick is due.
    ///
    /// If the caller comes back late (its previous run overran), the tick
    /// fires immediately, the missed ticks are counted as skipped, and the
    /// following tick is scheduled a full interval from now.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let due = self.next_tick;
        let interval = self.config.interval;

        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;
        self.run_start = Some(now);

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > interval / 10;
        let ticks_skipped = if overrun {
            (late_by.as_nanos() / interval.as_nanos()) as u64
        } else {
            0
        };
        if ticks_skipped > 0 {
            warn!(
                tick = self.tick_count,
                skipped = ticks_skipped,
                late_ms = late_by.as_millis() as u64,
                "previous run overran, skipping missed ticks"
            );
        }

        // Always schedule from now, never from the missed deadline.
        self.next_tick = now + interval;

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Record that the work for the current tick has finished.
    ///
    /// Updates run-time metrics and warns when a run uses most of the
    /// interval. A call without a preceding `wait_for_tick` is ignored.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.run_start.take() else {
            return;
        };
        let elapsed = start.elapsed();

        let utilization =
            elapsed.as_secs_f64() / self.config.interval.as_secs_f64();
        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_millis() as u64,
                interval_ms = self.config.interval.as_millis() as u64,
                "run is approaching the tick interval"
            );
        }

        self.metrics.last_run_time = elapsed;
        if elapsed > self.metrics.max_run_time {
            self.metrics.max_run_time = elapsed;
        }
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of current metrics.
    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    /// The configured interval.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }
}
