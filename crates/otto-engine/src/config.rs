//! Scheduler kernel configuration (spec §4.D, boundary checks from §8).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerConfigError {
    #[error("OTTO_SCHEDULER_TICK_MS must be >= 1000")]
    TickTooShort,
    #[error("OTTO_SCHEDULER_LOCK_LEASE_MS must be >= tick_ms")]
    LeaseShorterThanTick,
    #[error("OTTO_SCHEDULER_BATCH_SIZE must be >= 1")]
    BatchSizeZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tick_ms: u64,
    pub batch_size: usize,
    pub lock_lease_ms: i64,
}

impl SchedulerConfig {
    pub const DEFAULT_TICK_MS: u64 = 60_000;
    pub const DEFAULT_BATCH_SIZE: usize = 20;
    pub const DEFAULT_LOCK_LEASE_MS: i64 = 90_000;

    pub fn validated(self) -> Result<Self, SchedulerConfigError> {
        if self.tick_ms < 1000 {
            return Err(SchedulerConfigError::TickTooShort);
        }
        if self.batch_size < 1 {
            return Err(SchedulerConfigError::BatchSizeZero);
        }
        if self.lock_lease_ms < self.tick_ms as i64 {
            return Err(SchedulerConfigError::LeaseShorterThanTick);
        }
        Ok(self)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_ms: Self::DEFAULT_TICK_MS,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            lock_lease_ms: Self::DEFAULT_LOCK_LEASE_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(SchedulerConfig::default().validated().is_ok());
    }

    #[test]
    fn tick_below_one_second_is_rejected() {
        let cfg = SchedulerConfig { tick_ms: 500, ..SchedulerConfig::default() };
        assert_eq!(cfg.validated().unwrap_err(), SchedulerConfigError::TickTooShort);
    }

    #[test]
    fn lease_shorter_than_tick_is_rejected() {
        let cfg = SchedulerConfig { tick_ms: 5_000, lock_lease_ms: 1_000, ..SchedulerConfig::default() };
        assert_eq!(cfg.validated().unwrap_err(), SchedulerConfigError::LeaseShorterThanTick);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let cfg = SchedulerConfig { batch_size: 0, ..SchedulerConfig::default() };
        assert_eq!(cfg.validated().unwrap_err(), SchedulerConfigError::BatchSizeZero);
    }
}
