//! strictmap-core: validated, immutable, delegated wrappers over key-value maps.
//!
//! Declare a [`Variant`] (required keys, default value policy, key
//! normalization, single-inheritance parent), instantiate it over a map, and
//! get back an immutable [`Record`] that forwards the safe map operations and
//! rejects the mutating ones.

pub mod core;

pub use crate::core::error::RecordError;
pub use crate::core::forward::{
    CLOSED_OPS, CallArgs, CallOutcome, FORBIDDEN_OPS, OpKind, READING_OPS, classify,
};
pub use crate::core::record::Record;
pub use crate::core::types::{DefaultPolicy, Derived, Entries, KeyTransform, Nullable};
pub use crate::core::variant::{Variant, VariantBuilder};
