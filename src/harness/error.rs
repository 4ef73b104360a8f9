use std::{io, time::Duration};

use thiserror::Error;

/// Failures of the harness itself, never of the counter under test
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid harness configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    #[error("failed to spawn {unit}")]
    Spawn {
        unit: String,
        #[source]
        source: io::Error,
    },
}

/// A correctness violation observed after the fact
///
/// These are findings, not faults: for a counter without the matching
/// [Guarantee](crate::Guarantee) they are the expected outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("atomicity issue; expected: {expected}, actual: {observed}")]
    Atomicity { expected: i128, observed: i128 },
    #[error("visibility issue; the background thread did not see the change within {window:?}")]
    Visibility { window: Duration },
}

impl Violation {
    /// The guarantee this violation breaks
    pub fn broken_guarantee(&self) -> crate::Guarantee {
        match self {
            Self::Atomicity { .. } => crate::Guarantee::Atomicity,
            Self::Visibility { .. } => crate::Guarantee::Visibility,
        }
    }
}
