//! The CRDT fold engine.
//!
//! Materializing a document is a deterministic left-to-right reduction
//! over a store's effective operations, in total order, up to an
//! optional timestamp bound. A DELETE seals the fold: once one is
//! observed, the document is absent and stays absent for the rest of
//! the window, no matter what later-timestamped operations say.

use crate::error::Error;
use crate::operation::Operation;
use crate::store::OperationTwoSet;
use serde_json::Value;

/// Accumulates [`Error::PatchApplyError`]s encountered while folding,
/// keyed by the operation that produced them, without raising them. A
/// caller that wants visibility into skipped operations passes a
/// `&mut FoldDiagnostics` to [`document_at_with_diagnostics`]; a caller
/// that doesn't care calls [`document_at`], which discards them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoldDiagnostics {
    skipped: Vec<(Operation, Error)>,
}

impl FoldDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations skipped during the fold, paired with the error that
    /// caused them to be skipped.
    pub fn skipped(&self) -> &[(Operation, Error)] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.skipped.is_empty()
    }

    fn record(&mut self, op: Operation, err: Error) {
        self.skipped.push((op, err));
    }
}

/// Materializes `store`'s document considering every effective operation
/// (`document_at(u64::MAX)`).
pub fn document(store: &OperationTwoSet) -> Option<Value> {
    document_at(store, u64::MAX)
}

/// Materializes `store`'s document considering only effective operations
/// with `timestamp <= ts_limit`.
pub fn document_at(store: &OperationTwoSet, ts_limit: u64) -> Option<Value> {
    let mut diagnostics = FoldDiagnostics::new();
    document_at_with_diagnostics(store, ts_limit, &mut diagnostics)
}

/// Same as [`document_at`], but records any `PatchApplyError`s
/// encountered into `diagnostics` instead of discarding them.
pub fn document_at_with_diagnostics(
    store: &OperationTwoSet,
    ts_limit: u64,
    diagnostics: &mut FoldDiagnostics,
) -> Option<Value> {
    let mut doc: Option<Value> = None;
    let mut sealed = false;

    for op in store.effective() {
        if sealed {
            break;
        }
        if op.timestamp() > ts_limit {
            continue;
        }

        match &op {
            Operation::Create(_) => {
                if doc.is_none() {
                    doc = fold_step(&op, None, diagnostics);
                }
                // A CREATE seen once the document already exists is a
                // no-op: only the first CREATE in the order wins.
            }
            Operation::Update(_) => {
                if doc.is_some() {
                    doc = fold_step(&op, doc, diagnostics);
                }
                // An UPDATE with no document to transform is dropped.
            }
            Operation::Read(_) => {
                // Observational only; never changes `doc`.
            }
            Operation::Delete(_) => {
                doc = None;
                sealed = true;
            }
        }
    }

    doc
}

fn fold_step(
    op: &Operation,
    doc: Option<Value>,
    diagnostics: &mut FoldDiagnostics,
) -> Option<Value> {
    match op.try_process(doc.clone()) {
        Ok(result) => result,
        Err(err) => {
            diagnostics.record(op.copy(), err);
            doc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::Operation;
    use serde_json::json;

    fn patch(value: serde_json::Value) -> crate::operation::JsonPatch {
        json_patch::from_value(value).unwrap()
    }

    fn add_root(value: serde_json::Value) -> crate::operation::JsonPatch {
        patch(json!([{"op": "add", "path": "", "value": value}]))
    }

    fn replace(path: &str, value: serde_json::Value) -> crate::operation::JsonPatch {
        patch(json!([{"op": "replace", "path": path, "value": value}]))
    }

    #[test]
    fn empty_effective_set_returns_none() {
        let store = OperationTwoSet::new();
        assert_eq!(document(&store), None);
    }

    // A full create/update/delete/update-after-delete lifecycle.
    #[test]
    fn full_lifecycle_create_update_delete_update_after_delete() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        assert_eq!(document(&store), Some(json!({"n": 1})));

        store.add(Operation::update(20, replace("/n", json!(2))));
        assert_eq!(document(&store), Some(json!({"n": 2})));

        store.add(Operation::delete(30));
        assert_eq!(document(&store), None);

        store.add(Operation::update(40, replace("/n", json!(3))));
        assert_eq!(document(&store), None);
    }

    // The same log, queried at intermediate timestamps.
    #[test]
    fn time_travel_queries_at_intermediate_timestamps() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::update(20, replace("/n", json!(2))));
        store.add(Operation::delete(30));
        store.add(Operation::update(40, replace("/n", json!(3))));

        assert_eq!(document_at(&store, 15), Some(json!({"n": 1})));
        assert_eq!(document_at(&store, 25), Some(json!({"n": 2})));
        assert_eq!(document_at(&store, 35), None);
        assert_eq!(document_at(&store, 45), None);
    }

    // Retracting an update excludes it from the fold even though it was
    // added first.
    #[test]
    fn retracting_an_update_excludes_it_even_though_added_first() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        let update = Operation::update(20, replace("/n", json!(2)));
        store.add(update.clone());
        assert_eq!(document(&store), Some(json!({"n": 2})));

        store.remove(update);
        assert_eq!(document(&store), Some(json!({"n": 1})));
    }

    // Ties at the same timestamp resolve by kind rank, regardless of
    // insertion order: CREATE is always folded before an UPDATE at the
    // same timestamp, so the update is never dropped for "no doc yet".
    #[test]
    fn ties_at_the_same_timestamp_resolve_by_kind_rank() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::update(50, replace("/n", json!(99))));
        store.add(Operation::create(50, add_root(json!({"n": 1}))));
        assert_eq!(document_at(&store, 50), Some(json!({"n": 99})));

        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::delete(60));
        store.add(Operation::update(60, replace("/n", json!(2))));
        assert_eq!(document_at(&store, 60), None);
    }

    #[test]
    fn multiple_creates_only_the_first_wins() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::create(20, add_root(json!({"n": 999}))));
        assert_eq!(document(&store), Some(json!({"n": 1})));
    }

    #[test]
    fn multiple_deletes_first_seals_rest_are_no_ops() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::delete(20));
        store.add(Operation::delete(30));
        assert_eq!(document(&store), None);
        assert_eq!(document_at(&store, 25), None);
    }

    #[test]
    fn delete_seals_for_every_later_timestamp() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::delete(20));
        for ts in [20, 21, 100, u64::MAX] {
            assert_eq!(document_at(&store, ts), None, "ts={ts}");
        }
    }

    #[test]
    fn bad_patch_is_recorded_in_diagnostics_and_skipped() {
        let mut store = OperationTwoSet::new();
        store.add(Operation::create(10, add_root(json!({"n": 1}))));
        store.add(Operation::update(20, replace("/missing", json!(2))));

        let mut diagnostics = FoldDiagnostics::new();
        let doc = document_at_with_diagnostics(&store, u64::MAX, &mut diagnostics);

        assert_eq!(doc, Some(json!({"n": 1})));
        assert_eq!(diagnostics.skipped().len(), 1);
    }
}
