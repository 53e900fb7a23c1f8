//! Admission tuning knobs.

use std::time::Duration;

use waitroom_tick::TickConfig;

/// Configuration for admission control.
///
/// `Default` gives the values the waiting room ships with: one visitor at a
/// time, three-minute sessions, a sweep every minute.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionConfig {
    /// Maximum number of visitors admitted at once.
    pub capacity: usize,

    /// How long an admitted visitor keeps their slot without a refresh.
    pub session_ttl: Duration,

    /// Time between expiry sweeps.
    pub sweep_interval: Duration,

    /// Upper bound on a random delay before the first sweep, so replicas
    /// started together don't sweep in lockstep. Zero sweeps on schedule.
    pub sweep_jitter: Duration,

    /// Most sessions a single sweep will expire. 0 means no limit.
    /// Anything over the limit is picked up by the next sweep, which
    /// bounds the cost of one sweep when capacity is large.
    pub sweep_batch_limit: usize,

    /// Longest an operation waits for the admission lock before failing
    /// with [`AdmissionError::StoreUnavailable`](crate::AdmissionError).
    pub lock_timeout: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 1,
            session_ttl: Duration::from_secs(180),
            sweep_interval: Duration::from_secs(60),
            sweep_jitter: Duration::ZERO,
            sweep_batch_limit: 0,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl AdmissionConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `capacity` is at least 1.
    /// - `session_ttl` and `sweep_interval` are at least one second, which
    ///   keeps every fresh deadline strictly in the future.
    /// - `sweep_jitter` is at most one `sweep_interval`.
    /// - `lock_timeout` is at least one millisecond.
    pub fn validated(mut self) -> Self {
        if self.capacity == 0 {
            tracing::warn!("capacity of 0 would admit nobody, using 1");
            self.capacity = 1;
        }
        let one_sec = Duration::from_secs(1);
        if self.session_ttl < one_sec {
            tracing::warn!("session_ttl below 1s, clamping");
            self.session_ttl = one_sec;
        }
        if self.sweep_interval < one_sec {
            tracing::warn!("sweep_interval below 1s, clamping");
            self.sweep_interval = one_sec;
        }
        if self.sweep_jitter > self.sweep_interval {
            tracing::warn!("sweep_jitter above sweep_interval, clamping");
            self.sweep_jitter = self.sweep_interval;
        }
        self.lock_timeout = self.lock_timeout.max(Duration::from_millis(1));
        self
    }

    /// The sweeper's tick schedule.
    pub fn sweep_schedule(&self) -> TickConfig {
        TickConfig {
            interval: self.sweep_interval,
            initial_jitter: self.sweep_jitter,
            ..TickConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_shipped_values() {
        let cfg = AdmissionConfig::default();
        assert_eq!(cfg.capacity, 1);
        assert_eq!(cfg.session_ttl, Duration::from_secs(180));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(60));
        assert_eq!(cfg.sweep_batch_limit, 0);
    }

    #[test]
    fn test_validated_clamps_zero_values() {
        let cfg = AdmissionConfig {
            capacity: 0,
            session_ttl: Duration::ZERO,
            sweep_interval: Duration::from_millis(10),
            lock_timeout: Duration::ZERO,
            ..AdmissionConfig::default()
        }
        .validated();

        assert_eq!(cfg.capacity, 1);
        assert_eq!(cfg.session_ttl, Duration::from_secs(1));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(1));
        assert_eq!(cfg.lock_timeout, Duration::from_millis(1));
    }

    #[test]
    fn test_validated_caps_jitter_at_interval() {
        let cfg = AdmissionConfig {
            sweep_interval: Duration::from_secs(10),
            sweep_jitter: Duration::from_secs(30),
            ..AdmissionConfig::default()
        }
        .validated();

        assert_eq!(cfg.sweep_jitter, Duration::from_secs(10));
    }

    #[test]
    fn test_sweep_schedule_carries_interval_and_jitter() {
        let cfg = AdmissionConfig {
            sweep_interval: Duration::from_secs(15),
            sweep_jitter: Duration::from_secs(5),
            ..AdmissionConfig::default()
        };

        let tick = cfg.sweep_schedule();

        assert_eq!(tick.interval, Duration::from_secs(15));
        assert_eq!(tick.initial_jitter, Duration::from_secs(5));
    }

    #[test]
    fn test_validated_keeps_valid_values() {
        let cfg = AdmissionConfig {
            capacity: 50,
            ..AdmissionConfig::default()
        };
        assert_eq!(cfg.clone().validated(), cfg);
    }
}
