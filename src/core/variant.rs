// variant configuration + inheritance resolution
/*

Each variant owns at most three settings:

    required attributes (additive across the chain)

    default value policy (nearest setting wins, no merging)

    key transform (nearest setting wins, no merging)

Resolution always walks from the variant itself toward the root and stops at
the first variant that explicitly set the property. Configuration lives in
per-variant records linked by an explicit parent reference; there is no
shared or global state anywhere.

*/
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::core::error::RecordError;
use crate::core::record::Record;
use crate::core::types::{DefaultPolicy, Entries, KeyTransform};

pub struct Variant<V> {
    name: String,
    parent: Option<Arc<Variant<V>>>,
    // None = never declared; Some(vec![]) = explicitly declared empty
    required: Option<Vec<String>>,
    default: Option<DefaultPolicy<V>>,
    key_transform: Option<KeyTransform>,
}

impl<V> Variant<V> {
    /// The abstract root of an inheritance chain. It carries no configuration
    /// and cannot be instantiated.
    pub fn base() -> Arc<Self> {
        Arc::new(Self {
            name: "base".to_owned(),
            parent: None,
            required: None,
            default: None,
            key_transform: None,
        })
    }

    /// Start a derived variant under `parent`.
    pub fn derive(parent: &Arc<Self>, name: impl Into<String>) -> VariantBuilder<V> {
        VariantBuilder {
            name: name.into(),
            parent: Arc::clone(parent),
            required: None,
            default: None,
            key_transform: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Variant<V>>> {
        self.parent.as_ref()
    }

    pub fn is_base(&self) -> bool {
        self.parent.is_none()
    }

    /// Resolved required attributes for this variant.
    ///
    /// A variant that declared its own attributes (even an empty list) gets
    /// the nearest ancestor's resolved list concatenated with its own, in
    /// declaration order, duplicates kept. A variant that declared none is a
    /// pure pass-through to its parent. `None` means no ancestor ever
    /// declared any, which is distinct from `Some(vec![])`.
    pub fn required_attributes(&self) -> Option<Vec<String>> {
        let inherited = self.parent.as_deref().and_then(Variant::required_attributes);
        match &self.required {
            Some(own) => {
                let mut out = inherited.unwrap_or_default();
                out.extend(own.iter().cloned());
                Some(out)
            }
            None => inherited,
        }
    }

    /// Nearest explicitly set default policy, walking toward the root.
    pub fn default_policy(&self) -> Option<&DefaultPolicy<V>> {
        if let Some(d) = self.default.as_ref() {
            return Some(d);
        }
        self.parent.as_deref()?.default_policy()
    }

    /// Nearest explicitly set key transform, walking toward the root.
    pub fn key_transform(&self) -> Option<&KeyTransform> {
        if let Some(t) = self.key_transform.as_ref() {
            return Some(t);
        }
        self.parent.as_deref()?.key_transform()
    }

    /// Apply the resolved key transform, if any.
    pub(crate) fn normalize(&self, key: &str) -> String {
        match self.key_transform() {
            Some(t) => t(key),
            None => key.to_owned(),
        }
    }

    /// Exact-shape structural match: true iff the candidate key set equals
    /// this variant's resolved required set (after key normalization) — no
    /// extra keys, no missing keys. A variant with no required attributes
    /// declared anywhere matches nothing.
    pub fn matches_shape<'a, I>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let Some(required) = self.required_attributes() else {
            return false;
        };
        let want: BTreeSet<String> = required.iter().map(|a| self.normalize(a)).collect();
        let got: BTreeSet<String> = keys.into_iter().map(str::to_owned).collect();
        want == got
    }

    /// Structural match against a bare map's keys.
    pub fn matches(&self, candidate: &Entries<V>) -> bool {
        self.matches_shape(candidate.keys().map(String::as_str))
    }

    /// Wrap `input` into a validated record of this variant.
    pub fn instantiate(self: &Arc<Self>, input: Entries<V>) -> Result<Record<V>, RecordError> {
        Record::new(self, input)
    }
}

impl<V: fmt::Debug> fmt::Debug for Variant<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// Builder for a derived variant. Every setting is optional; anything left
/// unset falls through to the parent chain at resolution time.
pub struct VariantBuilder<V> {
    name: String,
    parent: Arc<Variant<V>>,
    required: Option<Vec<String>>,
    default: Option<DefaultPolicy<V>>,
    key_transform: Option<KeyTransform>,
}

impl<V> VariantBuilder<V> {
    /// Declare required attributes, appended to the parent chain's. Calling
    /// with an empty iterator still counts as an explicit (empty)
    /// declaration.
    pub fn require<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .get_or_insert_with(Vec::new)
            .extend(attrs.into_iter().map(Into::into));
        self
    }

    /// Constant default: every lookup miss returns a clone of `value`.
    pub fn default_value(mut self, value: V) -> Self {
        self.default = Some(DefaultPolicy::Value(value));
        self
    }

    /// Computed default: every lookup miss calls `f` with the missed
    /// (normalized) key.
    pub fn default_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        self.default = Some(DefaultPolicy::Compute(Arc::new(f)));
        self
    }

    /// Key normalization applied to every key on construction and on direct
    /// lookups. Shadows any ancestor's transform outright.
    pub fn transform_keys<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.key_transform = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Arc<Variant<V>> {
        Arc::new(Variant {
            name: self.name,
            parent: Some(self.parent),
            required: self.required,
            default: self.default,
            key_transform: self.key_transform,
        })
    }
}
