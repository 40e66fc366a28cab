//! Canonical serialization of store state.
//!
//! A stable, textual rendering of a store's state, used for equality
//! checks in tests and for diagnostics. `add_set`, `rem_set`, and
//! `op_set` (the effective set) are each rendered as an ordered array in
//! total order — never as a `serde_json` object keyed by some incidental
//! field, so two stores holding the same operations always render
//! byte-identically regardless of insertion order.

use crate::operation::Operation;
use crate::store::OperationTwoSet;
use serde_json::{json, Value};

/// Renders `store` as a canonical JSON value with three ordered arrays:
/// `add_set`, `rem_set`, `op_set` (the effective set).
pub fn to_canonical_json(store: &OperationTwoSet) -> Value {
    json!({
        "add_set": operations_to_json(store.add_set().iter()),
        "rem_set": operations_to_json(store.rem_set().iter()),
        "op_set": operations_to_json(store.effective().iter()),
    })
}

/// Same as [`to_canonical_json`], serialized to a compact string. Two
/// stores with equal `add_set`/`rem_set` pairs always produce an
/// identical string here, which is what makes this suitable for
/// equality assertions.
pub fn to_canonical_string(store: &OperationTwoSet) -> String {
    to_canonical_json(store).to_string()
}

fn operations_to_json<'a>(ops: impl Iterator<Item = &'a Operation>) -> Value {
    Value::Array(ops.map(|op| serde_json::to_value(op).unwrap_or(Value::Null)).collect())
}
