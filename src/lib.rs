//! Integer counters that are, and are not, safe to share between threads
//!
//! ### Comes with
//! - [AtomicCounter]: lock-free, linearizable `get`/`set`/`increment` over a native atomic,
//!   using [sequentially consistent](::core::sync::atomic::Ordering::SeqCst) ordering.
//! - [PlainCounter]: the same interface over plain, unsynchronized storage, where
//!   `increment` is a separate read and write. It loses updates and can hide writes
//!   from other threads, on purpose.
//! - Both variants for every signed width (`i8` through `i64`, and `isize`), behind one [Counter] trait.
//! - [Guarantee] flags describing what each variant promises, so a verifier can tell a defect
//!   from an expected hazard.
//!
//! ### Optional features
//! - `std` (default): the `harness` module, which drives counters through contended
//!   workloads and visibility probes and reports what it saw
//! - `serde`: Enable de/serialization of counters and harness configuration
#![cfg_attr(not(feature = "std"), no_std)]

mod counter;
pub use counter::*;

#[cfg(feature = "std")]
pub mod harness;
