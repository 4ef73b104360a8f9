//! Counters

use core::{
    cell::UnsafeCell,
    fmt,
    sync::atomic::*,
};
use paste::paste;
#[cfg(feature = "serde")]
use serde::{ser::SerializeStruct, Deserialize, Serialize};

mod behavior;
pub use behavior::*;

/// Implements the counter variants for one or more integer widths
macro_rules! make_counter {
  (@Atomic $Unit:ident | $Atomic:ident ) => {
    paste!{
      #[doc = r#"A linearizable counter using ["# $Atomic r#"] / ([core::"# $Unit r#"])."#]
      #[doc = ""]
      #[doc = r"### Behavior  "]
      #[doc = "1. Every operation uses [Sequentially Consistent](Ordering::SeqCst) ordering.  "]
      #[doc = "2. [increment](Counter::increment) is a single `fetch_add`, so concurrent increments are never lost.  "]
      #[doc = "3. A value stored by one thread is observed by every later `get` on any thread.  "]
      #[doc = "4. Like the underlying [" $Atomic "], this wraps on overflow.  "]
      pub struct [<AtomicCounter $Unit:camel>] {
        /// The underlying atomic
        inner: $Atomic,
      }

      impl [<AtomicCounter $Unit:camel>] {
        /// The [atomic ordering](Ordering) used for every operation
        pub const ORDERING: Ordering = Ordering::SeqCst;
        /// Instantiate at zero
        pub const fn new() -> Self { Self { inner: $Atomic::new(0) } }
        /// Instantiate with offset value
        pub const fn new_from_offset(offset: $Unit) -> Self { Self { inner: $Atomic::new(offset) } }
        /// Consume the counter, returning its value
        pub fn into_inner(self) -> $Unit { self.inner.into_inner() }
      }

      impl Counter for [<AtomicCounter $Unit:camel>] {
        type Unit = $Unit;
        #[doc = "Get the current value"]
        #[doc = r"```"]
        #[doc = "use hazard_counters::{" [<AtomicCounter $Unit:camel>] " as C, Counter};"]
        #[doc = r#"let c = C::new();"# ]
        #[doc = r#"assert_eq!(c.get(), 0, "get returns initial value");"# ]
        #[doc = r#"c.increment();"# ]
        #[doc = r#"c.increment();"# ]
        #[doc = r#"c.increment();"# ]
        #[doc = r#"assert_eq!(c.get(), 3, "get returns post-increment value");"# ]
        #[doc = r"```"]
        fn get(&self) -> $Unit { self.inner.load(Self::ORDERING) }
        fn set(&self, new_value: $Unit) { self.inner.store(new_value, Self::ORDERING) }
        #[doc = "Add one in a single atomic step"]
        #[doc = r"```"]
        #[doc = "use hazard_counters::{" [<AtomicCounter $Unit:camel>] " as C, Counter};"]
        #[doc = "use std::{sync::Arc, thread};"]
        #[doc = r#"let c = Arc::new(C::new());"# ]
        #[doc = r#"let handles: Vec<_> = (0..8).map(|_| {"# ]
        #[doc = r#"  let c = Arc::clone(&c);"# ]
        #[doc = r#"  thread::spawn(move || (0..10).for_each(|_| c.increment()))"# ]
        #[doc = r#"}).collect();"# ]
        #[doc = r#"handles.into_iter().for_each(|h| h.join().unwrap());"# ]
        #[doc = r#"assert_eq!(c.get(), 80, "no increment is lost");"# ]
        #[doc = r"```"]
        fn increment(&self) { self.inner.fetch_add(1, Self::ORDERING); }
        fn get_i128(&self) -> i128 { self.get() as i128 }
        fn bounds_i128(&self) -> (i128, i128) { ($Unit::MIN as i128, $Unit::MAX as i128) }
        fn kind(&self) -> CounterKind { CounterKind::Atomic }
      }
    }
  };
  (@Plain $Unit:ident ) => {
    paste!{
      #[doc = r#"A counter over plain, unsynchronized [core::"# $Unit r#"] storage."#]
      #[doc = ""]
      #[doc = r"### Behavior  "]
      #[doc = "1. Reads and writes are ordinary memory accesses with no [ordering](Ordering) at all.  "]
      #[doc = "2. [increment](Counter::increment) is a read followed by a separate write; concurrent increments can be lost.  "]
      #[doc = "3. A thread polling [get](Counter::get) may never observe a value written by another thread.  "]
      #[doc = "4. Wraps on overflow.  "]
      #[doc = r"### Warning  "]
      #[doc = "This type is `Sync` even though it does nothing to make shared access safe. "]
      #[doc = "Touching one instance from several threads at once is a data race, and what you observe "]
      #[doc = "depends on the platform, the optimizer and the build profile. Use it only to reproduce those hazards."]
      pub struct [<PlainCounter $Unit:camel>] {
        /// The unsynchronized value
        inner: UnsafeCell<$Unit>,
      }

      // Concurrent use races on `inner`; there is no ordering or visibility guarantee.
      unsafe impl Sync for [<PlainCounter $Unit:camel>] {}

      impl [<PlainCounter $Unit:camel>] {
        /// Instantiate at zero
        pub const fn new() -> Self { Self { inner: UnsafeCell::new(0) } }
        /// Instantiate with offset value
        pub const fn new_from_offset(offset: $Unit) -> Self { Self { inner: UnsafeCell::new(offset) } }
        /// Consume the counter, returning its value
        pub fn into_inner(self) -> $Unit { self.inner.into_inner() }
      }

      impl Counter for [<PlainCounter $Unit:camel>] {
        type Unit = $Unit;
        #[doc = "Get the current value with a plain load"]
        #[doc = r"```"]
        #[doc = "use hazard_counters::{" [<PlainCounter $Unit:camel>] " as C, Counter};"]
        #[doc = r#"let c = C::new();"# ]
        #[doc = r#"c.set(42);"# ]
        #[doc = r#"assert_eq!(c.get(), 42, "get returns the set value");"# ]
        #[doc = r#"c.set(0);"# ]
        #[doc = r#"assert_eq!(c.get(), 0, "get returns the set value");"# ]
        #[doc = r"```"]
        fn get(&self) -> $Unit { unsafe { *self.inner.get() } }
        fn set(&self, new_value: $Unit) { unsafe { *self.inner.get() = new_value } }
        #[doc = "Read, then write back one more. Not atomic."]
        fn increment(&self) {
          let current = self.get();
          self.set(current.wrapping_add(1));
        }
        fn get_i128(&self) -> i128 { self.get() as i128 }
        fn bounds_i128(&self) -> (i128, i128) { ($Unit::MIN as i128, $Unit::MAX as i128) }
        fn kind(&self) -> CounterKind { CounterKind::Plain }
      }
    }
  };
  (@Common $Prefix:ident => $Unit:ident ) => {
    paste!{
      #[cfg(feature = "serde")]
      #[allow(non_snake_case)]
      mod [<serde_impls_ $Prefix $Unit:camel >] {
        use super::*;
        impl Serialize for [<$Prefix $Unit:camel>] {
          fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
              S: serde::Serializer
          {
            let name_str = stringify!([<$Prefix $Unit:camel>]);
            let mut counter = serializer.serialize_struct( name_str, 1 )?;
            counter.serialize_field("value", &self.get())?;
            counter.end()
          }
        }

        impl<'de> Deserialize<'de> for [<$Prefix $Unit:camel>] {
          fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
              where
                  D: serde::Deserializer<'de>
          {
            let name_str = stringify!([<$Prefix $Unit:camel>]);

            #[derive(Deserialize)]
            #[serde(field_identifier, rename_all = "lowercase")]
            enum Field { Value }

            struct [<$Prefix $Unit:camel Visitor>];
            impl<'de> serde::de::Visitor<'de> for [<$Prefix $Unit:camel Visitor>] {
              type Value = [<$Prefix $Unit:camel >];

              fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                let expecting_str = stringify!(struct [<$Prefix $Unit:camel>]);
                formatter.write_str(expecting_str)
              }

              fn visit_map<V>(self, mut map: V) -> Result< [<$Prefix $Unit:camel >], V::Error>
                where V: serde::de::MapAccess<'de>
              {
                let mut value = None;
                while let Some(key) = map.next_key()? {
                  match key {
                    Field::Value => {
                      if value.is_some() {
                        return Err(serde::de::Error::duplicate_field("value"));
                      }
                      let val: $Unit = map.next_value()?;
                      value = Some(val)
                    },
                  }
                }
                let value = value.ok_or_else(|| serde::de::Error::missing_field("value"))?;
                Ok([<$Prefix $Unit:camel >]::new_from_offset(value))
              }
            }
            const FIELDS: &'static [&'static str] = &["value"];
            deserializer.deserialize_struct(name_str, FIELDS, [<$Prefix $Unit:camel Visitor>])
          }
        }

      }

      impl fmt::Display for [<$Prefix $Unit:camel>] {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
          write!(f, "{}", self.get())
        }
      }

      impl fmt::Debug for [<$Prefix $Unit:camel>] {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
          f.debug_struct(stringify!([<$Prefix $Unit:camel>]))
            .field("value", &self.get())
            .finish()
        }
      }

      impl Clone for [<$Prefix $Unit:camel>] {
        fn clone(&self) -> Self {
          Self::new_from_offset(self.get())
        }
      }

      impl Default for [<$Prefix $Unit:camel>] {
        fn default() -> Self { Self::new() }
      }

      impl From<$Unit> for [<$Prefix $Unit:camel>] {
        fn from(x: $Unit) -> Self { Self::new_from_offset(x) }
      }

      impl From<&[<$Prefix $Unit:camel>]> for $Unit {
        fn from(counter: &[<$Prefix $Unit:camel>]) -> Self { counter.get() }
      }

      impl [<$Prefix $Unit:camel>] {
        #[doc = "Largest [representable value](" $Unit "::MAX)"]
        pub const MAX: $Unit = $Unit::MAX;
        #[doc = "Smallest [representable value](" $Unit "::MIN)"]
        pub const MIN: $Unit = $Unit::MIN;
        #[doc = r#"Convert to some type that impls [From] "# $Unit r#"."#]
        #[doc = r"```"]
        #[doc = "use hazard_counters::" [<$Prefix $Unit:camel>] " as C;"]
        #[doc = r#"let c = C::new_from_offset(7);"# ]
        #[doc = "let x: Option<" $Unit "> = c.to_x();"]
        #[doc = r#"assert_eq!(x, Some(7));"# ]
        #[doc = r"```"]
        pub fn to_x<X: From<$Unit>> (&self) -> X { X::from(self.get()) }
      }

      #[cfg(test)]
      #[allow(non_snake_case)]
      mod [<sequential_ $Prefix $Unit:camel >] {
        use super::*;
        use [<$Prefix $Unit:camel >] as C;

        #[test]
        fn set_then_get_round_trips() {
          let c = C::new();
          [0, 42, -1, C::MAX, C::MIN, 0].into_iter().for_each(|v| {
            c.set(v);
            assert_eq!(c.get(), v, "get must return the value just set");
          });
        }

        #[test]
        fn sequential_increments_add_up() {
          let c = C::new();
          (0..100).for_each(|_| c.increment());
          assert_eq!(c.get(), 100);
          assert_eq!(c.get_i128(), 100);
          assert_eq!(c.bounds_i128(), (C::MIN as i128, C::MAX as i128));
          assert_eq!(c.into_inner(), 100);
        }

        #[test]
        fn increment_wraps_at_max() {
          let c = C::new_from_offset(C::MAX);
          c.increment();
          assert_eq!(c.get(), C::MIN, "increment past MAX wraps like the native atomic");
        }

        #[test]
        fn conversions_and_clone_carry_the_value() {
          let c: C = (-5 as $Unit).into();
          let d = c.clone();
          c.increment();
          assert_eq!($Unit::from(&c), -4);
          assert_eq!(d.get(), -5, "clones are independent");
          assert_eq!(C::default().get(), 0);
        }
      }
    }
  };
  ($($Unit:ident | $Atomic:ident, )+) => {
    $(make_counter!{@Atomic $Unit | $Atomic})+
    $(make_counter!{@Plain $Unit})+
    $(make_counter!{@Common AtomicCounter => $Unit})+
    $(make_counter!{@Common PlainCounter => $Unit})+
  }
}

make_counter! {
  i8 | AtomicI8,
  i16 | AtomicI16,
  i32 | AtomicI32,
  i64 | AtomicI64,
  // i128 | AtomicI128,
  isize | AtomicIsize,
}

/// The canonical linearizable counter, 64 bits wide
pub type AtomicCounter = AtomicCounterI64;
/// The canonical racy counter, 64 bits wide
pub type PlainCounter = PlainCounterI64;
