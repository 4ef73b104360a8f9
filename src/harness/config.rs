//! Harness configuration
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::HarnessError;

/// How a contended workload is shaped
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WorkloadConfig {
    /// Number of threads that contend on the counter
    pub units: usize,
    /// How many times each unit increments
    pub increments_per_unit: u64,
    /// Stack size for each unit; `None` uses the platform default
    pub stack_size: Option<usize>,
    /// Upper bound on waiting for all units to finish
    pub finish_timeout: Duration,
}

impl WorkloadConfig {
    /// Default number of contending threads
    pub const DEFAULT_UNITS: usize = 4_000;
    /// Stack size of each unit
    pub const DEFAULT_STACK_SIZE: usize = 128 * 1024;
    /// Default bound on waiting for units
    pub const DEFAULT_FINISH_TIMEOUT: Duration = Duration::from_secs(30);

    /// Set the number of units
    pub fn with_units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    /// Set the increments each unit performs
    pub fn with_increments_per_unit(mut self, increments_per_unit: u64) -> Self {
        self.increments_per_unit = increments_per_unit;
        self
    }

    /// Set the stack size of each unit
    pub fn with_stack_size(mut self, stack_size: Option<usize>) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Set the bound on waiting for units to finish
    pub fn with_finish_timeout(mut self, finish_timeout: Duration) -> Self {
        self.finish_timeout = finish_timeout;
        self
    }

    /// Total increments issued across all units
    pub fn total_increments(&self) -> i128 {
        (self.units as i128).saturating_mul(self.increments_per_unit as i128)
    }

    /// Reject workloads with no units or no increments
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.units == 0 {
            return Err(HarnessError::InvalidConfig {
                reason: "units must be at least 1",
            });
        }
        if self.increments_per_unit == 0 {
            return Err(HarnessError::InvalidConfig {
                reason: "increments_per_unit must be at least 1",
            });
        }
        Ok(())
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            units: Self::DEFAULT_UNITS,
            increments_per_unit: 1,
            stack_size: Some(Self::DEFAULT_STACK_SIZE),
            finish_timeout: Self::DEFAULT_FINISH_TIMEOUT,
        }
    }
}

/// Timing of a visibility probe
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProbeConfig {
    /// Head start given to the spinning thread before the increment
    pub settle: Duration,
    /// How long the change may take to be observed
    pub window: Duration,
}

impl ProbeConfig {
    /// Default head start for the spinning thread
    pub const DEFAULT_SETTLE: Duration = Duration::from_millis(100);
    /// Default time allowed for the change to be seen
    pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

    /// Set the head start for the spinning thread
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Set the time allowed for the change to be seen
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            settle: Self::DEFAULT_SETTLE,
            window: Self::DEFAULT_WINDOW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_workloads() {
        assert!(WorkloadConfig::default().validate().is_ok());
        assert!(matches!(
            WorkloadConfig::default().with_units(0).validate(),
            Err(HarnessError::InvalidConfig { .. })
        ));
        assert!(matches!(
            WorkloadConfig::default().with_increments_per_unit(0).validate(),
            Err(HarnessError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn totals_multiply_units_by_increments() {
        let config = WorkloadConfig::default().with_increments_per_unit(3);
        assert_eq!(config.total_increments(), 12_000);
        let huge = config.with_increments_per_unit(u64::MAX);
        assert_eq!(huge.total_increments(), 4_000 * u64::MAX as i128);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn loads_partial_ron() {
        let workload: WorkloadConfig =
            ron::from_str("(units: 8, increments_per_unit: 1000)").expect("workload config");
        assert_eq!(workload.units, 8);
        assert_eq!(workload.increments_per_unit, 1000);
        assert_eq!(workload.finish_timeout, WorkloadConfig::DEFAULT_FINISH_TIMEOUT);

        let probe: ProbeConfig =
            ron::from_str("(window: (secs: 1, nanos: 0))").expect("probe config");
        assert_eq!(probe.window, Duration::from_secs(1));
        assert_eq!(probe.settle, ProbeConfig::DEFAULT_SETTLE);
    }
}
