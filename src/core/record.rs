// record construction, validation, direct lookup, equality
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::core::error::RecordError;
use crate::core::types::{DefaultPolicy, Entries};
use crate::core::variant::Variant;

/// An immutable, validated wrapper over one key-value map.
///
/// Construction takes ownership of the input map, normalizes its keys through
/// the variant's resolved key transform, and fail-fast checks every resolved
/// required attribute for presence. After that the record never changes; it
/// is cheap to clone and safe to share across threads.
pub struct Record<V> {
    pub(crate) variant: Arc<Variant<V>>,
    pub(crate) entries: Arc<Entries<V>>,
}

// no V: Clone bound needed, both fields are Arcs
impl<V> Clone for Record<V> {
    fn clone(&self) -> Self {
        Self {
            variant: Arc::clone(&self.variant),
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Record<V> {
    /// Validated construction of a record of `variant` over `input`.
    ///
    /// 1. The abstract base cannot be instantiated.
    /// 2. Keys are normalized through the resolved transform (collisions are
    ///    last-write-wins in the input's iteration order, undetected).
    /// 3. Every resolved required attribute, normalized first, must be
    ///    present. Presence, not truthiness: an explicit null value counts.
    ///    The first miss fails with the attribute as declared.
    pub fn new(variant: &Arc<Variant<V>>, input: Entries<V>) -> Result<Self, RecordError> {
        if variant.is_base() {
            return Err(RecordError::AbstractVariant);
        }
        let entries = prepare(variant, input);
        validate(variant, &entries)?;
        Ok(Self::from_parts(variant, entries))
    }

    // internal constructor for maps already normalized and known valid
    pub(crate) fn from_parts(variant: &Arc<Variant<V>>, entries: Entries<V>) -> Self {
        Self {
            variant: Arc::clone(variant),
            entries: Arc::new(entries),
        }
    }

    pub fn variant(&self) -> &Arc<Variant<V>> {
        &self.variant
    }

    /// Normalized lookup without the default policy: the stored value, if the
    /// normalized key is present.
    pub fn stored(&self, key: &str) -> Option<&V> {
        self.entries.get(&self.variant.normalize(key))
    }

    // forwarded reads: raw against the underlying map, no key normalization

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A fresh copy of the underlying map, fully decoupled from the record.
    pub fn to_map(&self) -> Entries<V>
    where
        V: Clone,
    {
        (*self.entries).clone()
    }
}

impl<V: Clone> Record<V> {
    /// Direct lookup: normalize the key, return a clone of the stored value,
    /// or fall through to the variant's resolved default policy. A read miss
    /// never errors; with no policy it is `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        let k = self.variant.normalize(key);
        if let Some(v) = self.entries.get(&k) {
            return Some(v.clone());
        }
        match self.variant.default_policy() {
            Some(DefaultPolicy::Value(d)) => Some(d.clone()),
            Some(DefaultPolicy::Compute(f)) => Some(f(&k)),
            None => None,
        }
    }
}

// equality: same variant (by identity) + equal maps
impl<V: PartialEq> PartialEq for Record<V> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.variant, &other.variant) && self.entries == other.entries
    }
}

impl<V: Eq> Eq for Record<V> {}

// hashing is structural over the map only, so equal maps hash equal even
// across different variants
impl<V: Hash> Hash for Record<V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

// equality against a bare map ignores the variant entirely
impl<V: PartialEq> PartialEq<Entries<V>> for Record<V> {
    fn eq(&self, other: &Entries<V>) -> bool {
        *self.entries == *other
    }
}

impl<V: fmt::Debug> fmt::Debug for Record<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("variant", &self.variant.name())
            .field("entries", &self.entries)
            .finish()
    }
}

// records serialize transparently as their map
impl<V: Serialize> Serialize for Record<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

/// Rebuild `input` with every key normalized. No transform resolved means the
/// map passes through untouched.
pub(crate) fn prepare<V>(variant: &Variant<V>, input: Entries<V>) -> Entries<V> {
    match variant.key_transform() {
        Some(t) => {
            let mut out = Entries::new();
            for (k, v) in input {
                // last write wins on a post-transform collision
                out.insert(t(&k), v);
            }
            out
        }
        None => input,
    }
}

/// Fail-fast presence check of every resolved required attribute against an
/// already normalized map. The error names the attribute as declared.
pub(crate) fn validate<V>(variant: &Variant<V>, entries: &Entries<V>) -> Result<(), RecordError> {
    if let Some(required) = variant.required_attributes() {
        for attr in required {
            if !entries.contains_key(&variant.normalize(&attr)) {
                return Err(RecordError::MissingRequiredAttribute { attribute: attr });
            }
        }
    }
    Ok(())
}
