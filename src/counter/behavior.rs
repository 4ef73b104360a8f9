//! Counter behavioral elements
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use enumflags2::{bitflags, make_bitflags, BitFlags};


/// Concurrency guarantees a counter may provide
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum Guarantee {
  /// Read-modify-write happens as one indivisible step,
  /// so concurrent increments are never lost
  Atomicity = 1 << 0,
  /// A write made by one thread becomes observable
  /// by every other thread
  Visibility = 1 << 1,
  /// Every operation takes effect at a single instant
  /// consistent with one global total order
  Linearizability = 1 << 2,
}
impl Guarantee {
  /// Everything a linearizable counter promises
  pub const LINEARIZABLE: BitFlags<Guarantee> =
    make_bitflags!(Guarantee::{Atomicity | Visibility | Linearizability});
}

/// The counter variants
#[derive(
  Copy, Clone, Debug, PartialEq,
  Eq, PartialOrd, Ord, Hash,
  strum::EnumCount, strum::EnumIter,
  strum::Display, strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub enum CounterKind {
  /// Backed by a native atomic integer
  Atomic,
  /// Backed by unsynchronized storage
  Plain,
}
impl CounterKind {
  /// The guarantees counters of this kind provide
  pub fn guarantees(&self) -> BitFlags<Guarantee> {
    match self {
      Self::Atomic => Guarantee::LINEARIZABLE,
      Self::Plain => BitFlags::empty(),
    }
  }
  /// A fresh 64-bit counter of this kind that can be handed to other threads
  #[cfg(feature = "std")]
  pub fn build_shared(&self) -> SharedCounter {
    match self {
      Self::Atomic => std::sync::Arc::new(crate::AtomicCounter::new()),
      Self::Plain => std::sync::Arc::new(crate::PlainCounter::new()),
    }
  }
}

/// A 64-bit counter of either kind, shareable between threads
#[cfg(feature = "std")]
pub type SharedCounter = std::sync::Arc<dyn Counter<Unit = i64> + Send + Sync>;

/// Something that is a counter
pub trait Counter {
  type Unit: Sized + PartialEq + PartialOrd + Clone + core::fmt::Debug + Copy + core::hash::Hash;
  /// Get the current value
  fn get(&self) -> Self::Unit;
  /// Replace the current value unconditionally
  fn set(&self, new_value: Self::Unit);
  /// Add one to the current value
  fn increment(&self);
  /// Convenience method for getting the current value as i128
  fn get_i128(&self) -> i128;
  /// Smallest and largest representable values as i128
  fn bounds_i128(&self) -> (i128, i128);
  /// Which variant this is
  fn kind(&self) -> CounterKind;
  /// The concurrency guarantees this counter provides
  fn guarantees(&self) -> BitFlags<Guarantee> { self.kind().guarantees() }
  /// Does this counter provide the guarantee?
  fn provides(&self, guarantee: Guarantee) -> bool { self.guarantees().contains(guarantee) }
}
