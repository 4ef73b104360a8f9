//! Contended increment workload
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use super::{
    latch::{Arrival, Latch},
    HarnessError, Violation, WorkloadConfig,
};
use crate::{Counter, CounterKind};

/// What a workload observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadReport {
    pub kind: CounterKind,
    pub units: usize,
    /// Value the counter must hold if no update was lost
    pub expected: i128,
    /// Value read once the units were done
    pub observed: i128,
    /// Units that panicked
    pub failed_units: usize,
    /// Units still running when the wait timed out
    pub pending_units: usize,
    pub elapsed: Duration,
}

impl WorkloadReport {
    /// How many increments went missing
    pub fn lost_updates(&self) -> i128 {
        self.expected - self.observed
    }

    /// Every unit ran to completion
    pub fn is_complete(&self) -> bool {
        self.failed_units == 0 && self.pending_units == 0
    }

    pub fn violation(&self) -> Option<Violation> {
        (self.observed != self.expected).then(|| Violation::Atomicity {
            expected: self.expected,
            observed: self.observed,
        })
    }
}

/// Run `config.units` threads that all start on one signal and each
/// increment `counter` `config.increments_per_unit` times.
///
/// A unit that panics, or that is still running when `finish_timeout`
/// elapses, is logged and counted in the report. Only a failure to start
/// the workload is an error, as is a workload whose expected total does
/// not fit the counter's width.
pub fn run_workload<C>(counter: Arc<C>, config: &WorkloadConfig) -> Result<WorkloadReport, HarnessError>
where
    C: Counter + Send + Sync + ?Sized + 'static,
{
    config.validate()?;
    let kind = counter.kind();
    let expected = counter.get_i128().saturating_add(config.total_increments());
    let (min, max) = counter.bounds_i128();
    if !(min..=max).contains(&expected) {
        return Err(HarnessError::InvalidConfig {
            reason: "expected total does not fit the counter's width",
        });
    }
    let start = Arc::new(Latch::new(1));
    let done = Arc::new(Latch::new(config.units));
    let panicked = Arc::new(AtomicUsize::new(0));

    log::debug!(
        "spawning {} units of {} increments against a {kind} counter",
        config.units,
        config.increments_per_unit
    );
    let mut units = Vec::with_capacity(config.units);
    for i in 0..config.units {
        let name = format!("increment-{i}");
        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let counter = Arc::clone(&counter);
        let gate = Arc::clone(&start);
        let done = Arc::clone(&done);
        let panicked = Arc::clone(&panicked);
        let increments = config.increments_per_unit;
        let spawned = builder.spawn(move || {
            let _arrival = Arrival::new(&done, &panicked);
            gate.wait();
            for _ in 0..increments {
                counter.increment();
            }
        });
        match spawned {
            Ok(handle) => units.push(handle),
            Err(source) => {
                log::error!("could not spawn {name}: {source}");
                // let the units already waiting on the gate drain
                start.count_down();
                return Err(HarnessError::Spawn { unit: name, source });
            }
        }
    }

    let started = Instant::now();
    start.count_down();
    if !done.wait_timeout(config.finish_timeout) {
        log::warn!(
            "{} of {} units still running after {:?}",
            done.count(),
            config.units,
            config.finish_timeout
        );
    }
    let elapsed = started.elapsed();
    let pending_units = done.count();
    // panics are tallied on arrival, whether or not the unit is joined
    let failed_units = panicked.load(Ordering::SeqCst);

    // after a timeout, units still running are left detached
    for unit in units
        .into_iter()
        .filter(|unit| pending_units == 0 || unit.is_finished())
    {
        let _ = unit.join();
    }

    let report = WorkloadReport {
        kind,
        units: config.units,
        expected,
        observed: counter.get_i128(),
        failed_units,
        pending_units,
        elapsed,
    };
    match report.violation() {
        Some(violation) => log::warn!("{kind} counter: {violation}"),
        None => log::info!(
            "{kind} counter reached {} after {} units in {:?}",
            report.observed,
            report.units,
            report.elapsed
        ),
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        harness::enable_logs, AtomicCounter, AtomicCounterI32, AtomicCounterI8, Guarantee, PlainCounter,
    };
    use test_case::test_case;

    #[test]
    fn atomic_counter_never_loses_updates() {
        enable_logs();
        let report = run_workload(Arc::new(AtomicCounter::new()), &WorkloadConfig::default())
            .expect("workload must start");
        assert!(report.is_complete());
        assert_eq!(report.expected, 4_000);
        assert_eq!(report.observed, 4_000);
        assert_eq!(report.violation(), None);
    }

    #[test]
    fn atomic_counter_under_amplified_contention() {
        enable_logs();
        let config = WorkloadConfig::default()
            .with_units(16)
            .with_increments_per_unit(20_000);
        let report = run_workload(Arc::new(AtomicCounterI32::new()), &config)
            .expect("workload must start");
        assert!(report.is_complete());
        assert_eq!(report.observed, 320_000);
        assert_eq!(report.lost_updates(), 0);
    }

    #[test]
    fn expected_total_includes_the_starting_value() {
        enable_logs();
        let counter = Arc::new(AtomicCounter::new_from_offset(-10));
        let config = WorkloadConfig::default().with_units(4).with_increments_per_unit(5);
        let report = run_workload(Arc::clone(&counter), &config).expect("workload must start");
        assert_eq!(report.expected, 10);
        assert_eq!(counter.get(), 10);
    }

    /// Lost updates are likely but never certain, so only their direction is checked.
    #[test]
    fn plain_counter_may_lose_updates() {
        enable_logs();
        let config = WorkloadConfig::default()
            .with_units(16)
            .with_increments_per_unit(20_000);
        let report = run_workload(Arc::new(PlainCounter::new()), &config)
            .expect("workload must start");
        assert!(report.is_complete());
        assert!(
            report.observed <= report.expected,
            "racing increments can only lose updates, never invent them"
        );
        match report.violation() {
            Some(violation) => {
                assert_eq!(violation.broken_guarantee(), Guarantee::Atomicity);
                log::info!("reproduced: {violation} ({} lost)", report.lost_updates());
            }
            None => log::info!("no update was lost this run"),
        }
    }

    #[test_case(CounterKind::Atomic ; "atomic")]
    #[test_case(CounterKind::Plain ; "plain")]
    fn concurrent_increments_are_exact_when_guaranteed(kind: CounterKind) {
        enable_logs();
        let counter = kind.build_shared();
        assert_eq!(counter.get(), 0);
        let report = run_workload(Arc::clone(&counter), &WorkloadConfig::default())
            .expect("workload must start");
        if counter.provides(Guarantee::Atomicity) {
            assert_eq!(report.violation(), None, "{kind} counter must not lose updates");
        } else if let Some(violation) = report.violation() {
            log::info!("{kind} counter: {violation}");
        }
    }

    #[test]
    fn rejects_an_empty_workload() {
        let result = run_workload(
            Arc::new(AtomicCounter::new()),
            &WorkloadConfig::default().with_units(0),
        );
        assert!(matches!(result, Err(HarnessError::InvalidConfig { .. })));
    }

    #[test]
    fn reports_units_that_outlive_the_timeout() {
        enable_logs();
        struct Slow(AtomicCounter);
        impl Counter for Slow {
            type Unit = i64;
            fn get(&self) -> i64 { self.0.get() }
            fn set(&self, new_value: i64) { self.0.set(new_value) }
            fn increment(&self) {
                thread::sleep(Duration::from_millis(200));
                self.0.increment()
            }
            fn get_i128(&self) -> i128 { self.0.get_i128() }
            fn bounds_i128(&self) -> (i128, i128) { self.0.bounds_i128() }
            fn kind(&self) -> CounterKind { CounterKind::Atomic }
        }
        let config = WorkloadConfig::default()
            .with_units(2)
            .with_finish_timeout(Duration::from_millis(10));
        let report = run_workload(Arc::new(Slow(AtomicCounter::new())), &config)
            .expect("workload must start");
        assert_eq!(report.pending_units, 2);
        assert!(!report.is_complete());
    }

    #[test]
    fn reports_units_that_panic() {
        enable_logs();
        struct Faulty;
        impl Counter for Faulty {
            type Unit = i64;
            fn get(&self) -> i64 { 0 }
            fn set(&self, _: i64) {}
            fn increment(&self) { panic!("increment failed") }
            fn get_i128(&self) -> i128 { 0 }
            fn bounds_i128(&self) -> (i128, i128) { (i64::MIN as i128, i64::MAX as i128) }
            fn kind(&self) -> CounterKind { CounterKind::Plain }
        }
        let config = WorkloadConfig::default().with_units(3);
        let report = run_workload(Arc::new(Faulty), &config).expect("workload must start");
        assert_eq!(report.failed_units, 3);
        assert_eq!(report.pending_units, 0);
        assert_eq!(report.lost_updates(), 3);
    }

    #[test]
    fn counts_panics_of_units_left_behind_by_a_timeout() {
        enable_logs();
        struct FailFirst {
            calls: AtomicUsize,
        }
        impl Counter for FailFirst {
            type Unit = i64;
            fn get(&self) -> i64 { 0 }
            fn set(&self, _: i64) {}
            fn increment(&self) {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("increment failed");
                }
                thread::sleep(Duration::from_millis(500));
            }
            fn get_i128(&self) -> i128 { 0 }
            fn bounds_i128(&self) -> (i128, i128) { (i64::MIN as i128, i64::MAX as i128) }
            fn kind(&self) -> CounterKind { CounterKind::Plain }
        }
        let config = WorkloadConfig::default()
            .with_units(2)
            .with_finish_timeout(Duration::from_millis(100));
        let counter = Arc::new(FailFirst { calls: AtomicUsize::new(0) });
        let report = run_workload(counter, &config).expect("workload must start");
        assert_eq!(report.pending_units, 1, "the sleeping unit is still running");
        assert_eq!(report.failed_units, 1, "the panicked unit is counted even though it is not joined");
    }

    #[test]
    fn narrow_counters_reject_totals_past_their_width() {
        enable_logs();
        let result = run_workload(
            Arc::new(AtomicCounterI8::new()),
            &WorkloadConfig::default().with_units(200),
        );
        assert!(matches!(result, Err(HarnessError::InvalidConfig { .. })));

        let offset = run_workload(
            Arc::new(AtomicCounterI8::new_from_offset(100)),
            &WorkloadConfig::default().with_units(28),
        );
        assert!(matches!(offset, Err(HarnessError::InvalidConfig { .. })));
    }

    #[test]
    fn narrow_atomic_counters_fill_their_width_without_violations() {
        enable_logs();
        let counter = Arc::new(AtomicCounterI8::new());
        let report = run_workload(
            Arc::clone(&counter),
            &WorkloadConfig::default().with_units(127),
        )
        .expect("127 increments fit an i8");
        assert!(counter.provides(Guarantee::Atomicity));
        assert_eq!(report.violation(), None);
        assert_eq!(counter.get(), i8::MAX);
    }

    #[test]
    fn spawn_failure_is_reported() {
        enable_logs();
        let config = WorkloadConfig::default()
            .with_units(4)
            .with_stack_size(Some(usize::MAX));
        let counter = Arc::new(AtomicCounter::new());
        let result = run_workload(Arc::clone(&counter), &config);
        assert!(matches!(result, Err(HarnessError::Spawn { .. })));
        assert_eq!(counter.get(), 0, "no unit may run once spawning failed");
    }
}
