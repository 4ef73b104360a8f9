//! Drives counters through contended workloads and reports what was observed
//!
//! The harness never decides pass or fail on its own. It returns reports, and
//! [Violation]s derived from them, which a verifier weighs against the
//! counter's [Guarantee](crate::Guarantee)s:
//! ```
//! use hazard_counters::{harness::{run_workload, WorkloadConfig}, AtomicCounter, Counter, Guarantee};
//! use std::sync::Arc;
//!
//! let counter = Arc::new(AtomicCounter::new());
//! let config = WorkloadConfig::default().with_units(64);
//! let report = run_workload(Arc::clone(&counter), &config).unwrap();
//! assert!(counter.provides(Guarantee::Atomicity));
//! assert_eq!(report.violation(), None);
//! assert_eq!(counter.get(), 64);
//! ```
mod config;
mod error;
mod latch;
mod probe;
mod workload;

pub use config::{ProbeConfig, WorkloadConfig};
pub use error::{HarnessError, Violation};
pub use latch::Latch;
pub use probe::{probe_visibility, ProbeReport};
pub use workload::{run_workload, WorkloadReport};

#[cfg(test)]
pub(crate) fn enable_logs() {
    use log::LevelFilter::Info;

    env_logger::builder()
        .filter_level(Info)
        .is_test(true)
        .try_init()
        .ok();
}
