//! Cross-thread visibility probe
//!
//! A background thread spins on [Counter::get_i128] while the caller
//! increments once. Whether the spinner ever leaves its loop depends on the
//! counter: with unsynchronized storage the optimizer may hoist the load out
//! of the loop entirely, so the spinner keeps seeing the old value forever.
//!
//! The outcome for counters without [Guarantee::Visibility](crate::Guarantee::Visibility)
//! is best-effort. Adding anything to the spin loop, even a log call, tends
//! to make the hazard disappear.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::{latch::Latch, HarnessError, ProbeConfig, Violation};
use crate::{Counter, CounterKind};

/// What a probe observed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeReport {
    pub kind: CounterKind,
    /// The spinner saw the change within the window
    pub observed: bool,
    /// Time from the increment to the spinner noticing it
    pub latency: Option<Duration>,
    /// Value the incrementing thread read back right after its increment
    pub seen_by_writer: i128,
    pub window: Duration,
}

impl ProbeReport {
    pub fn violation(&self) -> Option<Violation> {
        (!self.observed).then(|| Violation::Visibility {
            window: self.window,
        })
    }
}

/// Spin until the counter moves away from `baseline` or the probe is abandoned.
/// Returns whether the change was seen.
#[inline(never)]
fn spin_until_changed<C>(counter: &C, baseline: i128, abandoned: &AtomicBool) -> bool
where
    C: Counter + ?Sized,
{
    while counter.get_i128() == baseline {
        if abandoned.load(Ordering::Relaxed) {
            return false;
        }
    }
    true
}

/// Increment `counter` once while another thread polls it, and report
/// whether (and how quickly) that thread noticed.
pub fn probe_visibility<C>(counter: Arc<C>, config: &ProbeConfig) -> Result<ProbeReport, HarnessError>
where
    C: Counter + Send + Sync + ?Sized + 'static,
{
    let kind = counter.kind();
    let baseline = counter.get_i128();
    let detected = Arc::new(Latch::new(1));
    let detected_at = Arc::new(Mutex::new(None::<Instant>));
    let abandoned = Arc::new(AtomicBool::new(false));

    let name = "visibility-probe".to_owned();
    let spinner = {
        let counter = Arc::clone(&counter);
        let detected = Arc::clone(&detected);
        let detected_at = Arc::clone(&detected_at);
        let abandoned = Arc::clone(&abandoned);
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::info!("detecting change from {baseline}");
                if spin_until_changed(&*counter, baseline, &abandoned) {
                    *detected_at.lock() = Some(Instant::now());
                    log::info!("change detected");
                    detected.count_down();
                }
            })
            .map_err(|source| HarnessError::Spawn { unit: name, source })?
    };

    thread::sleep(config.settle);
    let incremented_at = Instant::now();
    counter.increment();
    let seen_by_writer = counter.get_i128();
    let observed = detected.wait_timeout(config.window);
    if observed {
        if spinner.join().is_err() {
            log::error!("execution error in visibility probe");
        }
    } else {
        // left detached: the spinner may never reload the counter
        abandoned.store(true, Ordering::Relaxed);
        log::warn!(
            "{kind} counter: change not observed within {:?}",
            config.window
        );
    }

    let latency = observed
        .then(|| *detected_at.lock())
        .flatten()
        .map(|at| at.saturating_duration_since(incremented_at));
    Ok(ProbeReport {
        kind,
        observed,
        latency,
        seen_by_writer,
        window: config.window,
    })
}
