//! Scheduler configuration.

use std::time::Duration;

use sim_core::CoreConfig;

/// Default number of cores in the pool.
pub const DEFAULT_CORE_COUNT: usize = 2;

/// Default upper bound on the scheduler loop's sleep between passes.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Immutable configuration for a scheduler and its core pool.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SchedulerConfig {
    /// Number of cores, each driven by its own worker thread. Zero is treated
    /// as one.
    pub cores: usize,
    /// Fallback wake-up period of the scheduler loop.
    pub tick_interval: Duration,
    /// Configuration shared by every core in the pool.
    pub core: CoreConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cores: DEFAULT_CORE_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            core: CoreConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub(crate) fn core_count(&self) -> usize {
        self.cores.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::{SchedulerConfig, DEFAULT_TICK_INTERVAL};

    #[test]
    fn defaults_match_two_cores_at_one_hundred_millis() {
        let config = SchedulerConfig::default();
        assert_eq!(config.cores, 2);
        assert_eq!(config.tick_interval, DEFAULT_TICK_INTERVAL);
        assert_eq!(config.tick_interval.as_millis(), 100);
    }

    #[test]
    fn zero_cores_is_clamped_to_one() {
        let config = SchedulerConfig {
            cores: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.core_count(), 1);
    }
}
