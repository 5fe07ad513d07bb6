// operation classification + forwarding
/*

Forwarded access resolves in a fixed order:

    direct key match (normalized) — always wins, even over a same-named op

    Forbidden: would mutate the map — rejected, never reaches it

    Closed: result re-wrapped into the same variant, degrading to the bare
    map when a required attribute was lost

    Reading: raw result straight off the underlying map

    anything else — unknown attribute

The three name tables are the whole forwarding surface; nothing is dispatched
reflectively.

*/
use std::collections::BTreeSet;

use crate::core::error::RecordError;
use crate::core::record::{Record, prepare, validate};
use crate::core::types::{Derived, Entries, Nullable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Would mutate the map in place; permanently rejected.
    Forbidden,
    /// Result is re-wrapped into the same variant (or degrades).
    Closed,
    /// Raw, non-mutating read forwarded as-is.
    Reading,
}

pub const FORBIDDEN_OPS: &[&str] = &[
    "insert",
    "remove",
    "clear",
    "retain",
    "extend",
    "append",
    "split_off",
    "get_mut",
    "values_mut",
    "entry",
];

pub const CLOSED_OPS: &[&str] = &["merge", "except", "slice", "compact"];

pub const READING_OPS: &[&str] = &[
    "get",
    "len",
    "is_empty",
    "contains_key",
    "keys",
    "values",
    "to_map",
];

/// Classify an operation name against the fixed tables.
pub fn classify(name: &str) -> Option<OpKind> {
    if FORBIDDEN_OPS.contains(&name) {
        Some(OpKind::Forbidden)
    } else if CLOSED_OPS.contains(&name) {
        Some(OpKind::Closed)
    } else if READING_OPS.contains(&name) {
        Some(OpKind::Reading)
    } else {
        None
    }
}

/// Arguments for a dynamically dispatched operation.
#[derive(Debug, Clone)]
pub enum CallArgs<V> {
    None,
    Key(String),
    Keys(Vec<String>),
    Map(Entries<V>),
}

/// Everything a dynamically dispatched operation can produce.
#[derive(Debug, Clone)]
pub enum CallOutcome<V> {
    /// A stored value (key precedence) or a raw `get`.
    Value(Option<V>),
    Bool(bool),
    Count(usize),
    Keys(Vec<String>),
    Values(Vec<V>),
    /// A closed operation that re-wrapped.
    Wrapped(Record<V>),
    /// A closed operation that degraded, or `to_map`.
    Plain(Entries<V>),
}

impl<V> From<Derived<V>> for CallOutcome<V> {
    fn from(derived: Derived<V>) -> Self {
        match derived {
            Derived::Wrapped(r) => CallOutcome::Wrapped(r),
            Derived::Plain(m) => CallOutcome::Plain(m),
        }
    }
}

impl<V: Clone> Record<V> {
    /// Merge `additions` over this record's map (additions win on conflict)
    /// and re-wrap into the same variant. Merging only adds or overwrites
    /// keys, so the required attributes always survive and the result never
    /// degrades.
    pub fn merge(&self, additions: Entries<V>) -> Record<V> {
        let mut raw = (*self.entries).clone();
        raw.extend(additions);
        Record::from_parts(&self.variant, prepare(&self.variant, raw))
    }

    /// Drop the given keys (matched raw against the internal map) and re-wrap,
    /// degrading to the bare map if a required attribute was dropped.
    pub fn except<I, S>(&self, keys: I) -> Derived<V>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let drop: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_owned()).collect();
        let raw: Entries<V> = self
            .entries
            .iter()
            .filter(|(k, _)| !drop.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.rewrap(raw)
    }

    /// Keep only the given keys (matched raw) and re-wrap, degrading if a
    /// required attribute was left out.
    pub fn slice<I, S>(&self, keys: I) -> Derived<V>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keep: BTreeSet<String> = keys.into_iter().map(|k| k.as_ref().to_owned()).collect();
        let raw: Entries<V> = self
            .entries
            .iter()
            .filter(|(k, _)| keep.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.rewrap(raw)
    }

    // re-wrap a closed-op result, or degrade when validation would fail
    fn rewrap(&self, raw: Entries<V>) -> Derived<V> {
        let prepared = prepare(&self.variant, raw);
        match validate(&self.variant, &prepared) {
            Ok(()) => Derived::Wrapped(Record::from_parts(&self.variant, prepared)),
            Err(_) => Derived::Plain(prepared),
        }
    }
}

impl<V: Clone + Nullable> Record<V> {
    /// Drop null-like values and re-wrap, degrading if a required attribute
    /// held a null-like value and was dropped with it.
    pub fn compact(&self) -> Derived<V> {
        let raw: Entries<V> = self
            .entries
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.rewrap(raw)
    }

    /// Dynamic attribute-style dispatch mirroring the typed surface.
    ///
    /// A direct key match (normalized) always wins, even when the name is
    /// also an operation. Otherwise the name is classified: Forbidden fails
    /// with [`RecordError::MethodNotSupported`] without touching the map,
    /// Closed and Reading dispatch on the argument shape, and an unclassified
    /// name fails with [`RecordError::UnknownAttribute`].
    pub fn call(&self, name: &str, args: CallArgs<V>) -> Result<CallOutcome<V>, RecordError> {
        if let Some(v) = self.entries.get(&self.variant.normalize(name)) {
            return Ok(CallOutcome::Value(Some(v.clone())));
        }
        match classify(name) {
            Some(OpKind::Forbidden) => Err(RecordError::MethodNotSupported {
                operation: name.to_owned(),
            }),
            Some(OpKind::Closed) => self.call_closed(name, args),
            Some(OpKind::Reading) => self.call_reading(name, args),
            None => Err(RecordError::UnknownAttribute {
                name: name.to_owned(),
            }),
        }
    }

    fn call_closed(&self, name: &str, args: CallArgs<V>) -> Result<CallOutcome<V>, RecordError> {
        match (name, args) {
            ("merge", CallArgs::Map(additions)) => Ok(CallOutcome::Wrapped(self.merge(additions))),
            ("except", CallArgs::Keys(keys)) => Ok(self.except(keys).into()),
            ("slice", CallArgs::Keys(keys)) => Ok(self.slice(keys).into()),
            ("compact", CallArgs::None) => Ok(self.compact().into()),
            _ => Err(RecordError::InvalidArguments {
                operation: name.to_owned(),
            }),
        }
    }

    // raw reads, no key normalization and no default policy
    fn call_reading(&self, name: &str, args: CallArgs<V>) -> Result<CallOutcome<V>, RecordError> {
        match (name, args) {
            ("get", CallArgs::Key(k)) => Ok(CallOutcome::Value(self.entries.get(&k).cloned())),
            ("len", CallArgs::None) => Ok(CallOutcome::Count(self.len())),
            ("is_empty", CallArgs::None) => Ok(CallOutcome::Bool(self.is_empty())),
            ("contains_key", CallArgs::Key(k)) => {
                Ok(CallOutcome::Bool(self.entries.contains_key(&k)))
            }
            ("keys", CallArgs::None) => {
                Ok(CallOutcome::Keys(self.entries.keys().cloned().collect()))
            }
            ("values", CallArgs::None) => {
                Ok(CallOutcome::Values(self.entries.values().cloned().collect()))
            }
            ("to_map", CallArgs::None) => Ok(CallOutcome::Plain(self.to_map())),
            _ => Err(RecordError::InvalidArguments {
                operation: name.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::core::variant::Variant;

    fn person() -> Arc<Variant<Value>> {
        Variant::derive(&Variant::base(), "Person")
            .require(["name", "age"])
            .build()
    }

    fn m(pairs: &[(&str, Value)]) -> Entries<Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn jake() -> Record<Value> {
        person()
            .instantiate(m(&[
                ("name", json!("Jake")),
                ("age", json!(5)),
                ("toy", json!("Bear")),
            ]))
            .unwrap()
    }

    #[test]
    fn classification_tables_are_disjoint_and_complete() {
        for &op in FORBIDDEN_OPS {
            assert_eq!(classify(op), Some(OpKind::Forbidden));
        }
        for &op in CLOSED_OPS {
            assert_eq!(classify(op), Some(OpKind::Closed));
        }
        for &op in READING_OPS {
            assert_eq!(classify(op), Some(OpKind::Reading));
        }
        assert_eq!(classify("frobnicate"), None);
    }

    #[test]
    fn mutating_operations_are_rejected_and_touch_nothing() {
        let r = jake();
        let before = r.to_map();

        for &op in FORBIDDEN_OPS {
            let err = r.call(op, CallArgs::Key("age".to_owned())).unwrap_err();
            assert_eq!(
                err,
                RecordError::MethodNotSupported { operation: op.to_owned() }
            );
        }

        assert_eq!(r.to_map(), before);
    }

    #[test]
    fn unknown_names_fail_as_unknown_attribute() {
        let err = jake().call("frobnicate", CallArgs::None).unwrap_err();
        assert_eq!(
            err,
            RecordError::UnknownAttribute { name: "frobnicate".to_owned() }
        );
    }

    ///a stored key named like an operation must shadow the operation.
    #[test]
    fn direct_key_match_wins_over_a_same_named_operation() {
        let sneaky = Variant::derive(&Variant::base(), "Sneaky")
            .require(["len"])
            .build();
        let r = sneaky.instantiate(m(&[("len", json!(42))])).unwrap();

        let out = r.call("len", CallArgs::None).unwrap();
        assert!(matches!(out, CallOutcome::Value(Some(v)) if v == json!(42)));

        // without the key, the same name is the reading op again
        let plain = person()
            .instantiate(m(&[("name", json!("T")), ("age", json!(12))]))
            .unwrap();
        assert!(matches!(plain.call("len", CallArgs::None).unwrap(), CallOutcome::Count(2)));
    }

    #[test]
    fn merge_rewraps_into_the_same_variant_with_old_and_new_keys() {
        let r = jake();
        let merged = r.merge(m(&[("hat", json!("Red")), ("age", json!(6))]));

        assert!(Arc::ptr_eq(merged.variant(), r.variant()));
        assert_eq!(merged.get("name"), Some(json!("Jake")));
        assert_eq!(merged.get("hat"), Some(json!("Red")));
        // additions win on conflict
        assert_eq!(merged.get("age"), Some(json!(6)));
        // the original record is untouched
        assert_eq!(r.get("age"), Some(json!(5)));
    }

    #[test]
    fn merge_normalizes_the_added_keys() {
        let shouty = Variant::derive(&Variant::base(), "Shouty")
            .require(["name"])
            .transform_keys(|k| k.to_lowercase())
            .build();
        let r = shouty.instantiate(m(&[("NAME", json!("T"))])).unwrap();

        let merged = r.merge(m(&[("HAT", json!("Red"))]));
        assert!(merged.contains_key("hat"));
        assert!(!merged.contains_key("HAT"));
    }

    ///scenario: except over a non-required key re-wraps; except over a
    ///required key degrades to the bare map.
    #[test]
    fn except_rewraps_or_degrades_on_required_attributes() {
        let r = jake();

        let kept = r.except(["toy"]);
        let rec = kept.as_record().expect("dropping `toy` keeps Person valid");
        assert!(!rec.contains_key("toy"));
        assert_eq!(rec.get("name"), Some(json!("Jake")));

        let degraded = r.except(["age"]);
        assert!(!degraded.is_wrapped());
        let map = degraded.into_map();
        assert!(!map.contains_key("age"));
        assert_eq!(map.get("name"), Some(&json!("Jake")));
    }

    #[test]
    fn slice_rewraps_or_degrades_on_required_attributes() {
        let r = jake();

        let exact = r.slice(["name", "age"]);
        assert!(exact.is_wrapped());
        assert_eq!(exact.as_record().unwrap().len(), 2);

        let partial = r.slice(["name", "toy"]);
        assert!(!partial.is_wrapped());
        assert_eq!(partial.into_map().len(), 2);
    }

    #[test]
    fn compact_drops_nulls_and_follows_the_rewrap_policy() {
        let person = person();

        let r = person
            .instantiate(m(&[
                ("name", json!("T")),
                ("age", json!(12)),
                ("toy", Value::Null),
            ]))
            .unwrap();
        let compacted = r.compact();
        let rec = compacted.as_record().expect("only `toy` was null");
        assert!(!rec.contains_key("toy"));
        assert_eq!(rec.len(), 2);

        // a null required attribute passes construction but degrades compact
        let r = person
            .instantiate(m(&[("name", json!("T")), ("age", Value::Null)]))
            .unwrap();
        let degraded = r.compact();
        assert!(!degraded.is_wrapped());
        assert!(!degraded.into_map().contains_key("age"));
    }

    #[test]
    fn dynamic_closed_calls_mirror_the_typed_surface() {
        let r = jake();

        let out = r
            .call("merge", CallArgs::Map(m(&[("hat", json!("Red"))])))
            .unwrap();
        assert!(matches!(out, CallOutcome::Wrapped(ref rec) if rec.contains_key("hat")));

        let out = r.call("except", CallArgs::Keys(vec!["toy".to_owned()])).unwrap();
        assert!(matches!(out, CallOutcome::Wrapped(_)));

        let out = r.call("except", CallArgs::Keys(vec!["age".to_owned()])).unwrap();
        assert!(matches!(out, CallOutcome::Plain(_)));

        let out = r.call("slice", CallArgs::Keys(vec!["name".to_owned()])).unwrap();
        assert!(matches!(out, CallOutcome::Plain(_)));

        let out = r.call("compact", CallArgs::None).unwrap();
        assert!(matches!(out, CallOutcome::Wrapped(_)));
    }

    #[test]
    fn dynamic_reading_calls_are_raw() {
        let shouty = Variant::derive(&Variant::base(), "Shouty")
            .require(["name"])
            .transform_keys(|k| k.to_lowercase())
            .build();
        let r = shouty.instantiate(m(&[("NAME", json!("T"))])).unwrap();

        // raw forwarded reads skip key normalization entirely
        let out = r.call("contains_key", CallArgs::Key("NAME".to_owned())).unwrap();
        assert!(matches!(out, CallOutcome::Bool(false)));
        let out = r.call("contains_key", CallArgs::Key("name".to_owned())).unwrap();
        assert!(matches!(out, CallOutcome::Bool(true)));

        let out = r.call("keys", CallArgs::None).unwrap();
        assert!(matches!(out, CallOutcome::Keys(ref ks) if ks == &["name"]));

        let out = r.call("get", CallArgs::Key("NAME".to_owned())).unwrap();
        assert!(matches!(out, CallOutcome::Value(None)));

        let out = r.call("to_map", CallArgs::None).unwrap();
        assert!(matches!(out, CallOutcome::Plain(ref map) if map.len() == 1));
    }

    #[test]
    fn wrong_argument_shape_is_invalid_arguments() {
        let r = jake();

        let err = r.call("merge", CallArgs::None).unwrap_err();
        assert_eq!(err, RecordError::InvalidArguments { operation: "merge".to_owned() });

        let err = r.call("is_empty", CallArgs::Key("x".to_owned())).unwrap_err();
        assert_eq!(
            err,
            RecordError::InvalidArguments { operation: "is_empty".to_owned() }
        );
    }
}
