// shared aliases + policy/result types
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::core::record::Record;

/// The underlying mapping type. `BTreeMap` gives deterministic iteration
/// order and structural `Eq`/`Hash` for free.
pub type Entries<V> = BTreeMap<String, V>;

/// Pure key-normalization function, resolved per variant and applied to every
/// key on construction and on direct lookups.
pub type KeyTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Computed default: receives only the missed (already normalized) key.
pub type DefaultFn<V> = Arc<dyn Fn(&str) -> V + Send + Sync>;

/// What a direct lookup miss produces.
pub enum DefaultPolicy<V> {
    /// Every miss returns a clone of this constant.
    Value(V),
    /// Every miss calls this with the missed key.
    Compute(DefaultFn<V>),
}

impl<V: Clone> Clone for DefaultPolicy<V> {
    fn clone(&self) -> Self {
        match self {
            DefaultPolicy::Value(v) => DefaultPolicy::Value(v.clone()),
            DefaultPolicy::Compute(f) => DefaultPolicy::Compute(Arc::clone(f)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for DefaultPolicy<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultPolicy::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultPolicy::Compute(_) => f.write_str("Compute(<fn>)"),
        }
    }
}

/// Result of a closed operation: either re-wrapped into the same variant, or
/// degraded to the bare map when re-wrapping would drop a required attribute.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Derived<V> {
    Wrapped(Record<V>),
    Plain(Entries<V>),
}

impl<V> Derived<V> {
    pub fn is_wrapped(&self) -> bool {
        matches!(self, Derived::Wrapped(_))
    }

    pub fn as_record(&self) -> Option<&Record<V>> {
        match self {
            Derived::Wrapped(r) => Some(r),
            Derived::Plain(_) => None,
        }
    }

    /// Collapse to the underlying map either way.
    pub fn into_map(self) -> Entries<V>
    where
        V: Clone,
    {
        match self {
            Derived::Wrapped(r) => r.to_map(),
            Derived::Plain(m) => m,
        }
    }
}

/// Values that `compact` may drop. Presence of a null-like value still counts
/// for required-attribute validation; only `compact` consults this.
pub trait Nullable {
    fn is_null(&self) -> bool;
}

impl<T> Nullable for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }
}

impl Nullable for serde_json::Value {
    fn is_null(&self) -> bool {
        matches!(self, serde_json::Value::Null)
    }
}

impl<'a> Nullable for &'a str {
    fn is_null(&self) -> bool {
        false
    }
}

macro_rules! never_null {
    ($($ty:ty),* $(,)?) => {
        $(impl Nullable for $ty {
            fn is_null(&self) -> bool {
                false
            }
        })*
    };
}

never_null!(String, bool, i32, i64, u32, u64, f64);
