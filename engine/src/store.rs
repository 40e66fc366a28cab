//! The two-set operation store.
//!
//! `OperationTwoSet` holds every operation a replica knows about in two
//! ordered sets: operations proposed as effective (`add_set`) and
//! tombstones (`rem_set`). The effective set — the one the fold engine
//! actually materializes — is always `add_set \ rem_set`, recomputed on
//! demand rather than cached, so there is never a stale cache to
//! invalidate.

use crate::operation::{Operation, OperationKind};
use std::collections::BTreeSet;

/// An add-set / remove-set pair of operations, ordered by the total
/// order defined on [`Operation`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationTwoSet {
    add_set: BTreeSet<Operation>,
    rem_set: BTreeSet<Operation>,
}

impl OperationTwoSet {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `op` into the add-set. Returns whether the set changed.
    pub fn add(&mut self, op: Operation) -> bool {
        self.add_set.insert(op)
    }

    /// Inserts `op` into the remove-set. Does not require `op` to already
    /// be a member of the add-set — tombstones may arrive before (or
    /// instead of) the operation they retract, since replicas exchange
    /// the two sets independently. Returns whether the set changed.
    pub fn remove(&mut self, op: Operation) -> bool {
        self.rem_set.insert(op)
    }

    /// `add_set \ rem_set`, in total order. Computed fresh on
    /// every call; nothing here is cached.
    pub fn effective(&self) -> BTreeSet<Operation> {
        self.add_set.difference(&self.rem_set).cloned().collect()
    }

    /// Raw view of the add-set, in total order. Used by the canonical
    /// serialization surface to render `add_set` alongside `rem_set`/`op_set`.
    pub fn add_set(&self) -> &BTreeSet<Operation> {
        &self.add_set
    }

    /// Raw view of the remove-set, in total order.
    pub fn rem_set(&self) -> &BTreeSet<Operation> {
        &self.rem_set
    }

    /// Empties both sets.
    pub fn clear(&mut self) {
        self.add_set.clear();
        self.rem_set.clear();
    }

    /// True iff the effective set is empty.
    pub fn is_empty(&self) -> bool {
        self.effective().is_empty()
    }

    /// Count of operations of a given kind in the effective set.
    pub fn count(&self, kind: OperationKind) -> usize {
        self.effective().iter().filter(|op| op.kind() == kind).count()
    }

    /// Set-union of both `add_set`s and both `rem_set`s with `other`.
    /// Commutative, associative, and idempotent, since it is ordinary set
    /// union on each side.
    pub fn merge(&self, other: &OperationTwoSet) -> OperationTwoSet {
        OperationTwoSet {
            add_set: self.add_set.union(&other.add_set).cloned().collect(),
            rem_set: self.rem_set.union(&other.rem_set).cloned().collect(),
        }
    }

    /// Merges `other` into `self` in place, equivalent to
    /// `*self = self.merge(other)` but without the intermediate clone of
    /// `self`'s own sets.
    pub fn merge_in_place(&mut self, other: &OperationTwoSet) {
        self.add_set.extend(other.add_set.iter().cloned());
        self.rem_set.extend(other.rem_set.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(ts: u64) -> Operation {
        let patch: crate::operation::JsonPatch =
            json_patch::from_value(json!([{"op": "add", "path": "", "value": {"n": ts}}])).unwrap();
        Operation::create(ts, patch)
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = OperationTwoSet::new();
        assert!(store.add(create(1)));
        assert!(!store.add(create(1)));
        assert_eq!(store.effective().len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = OperationTwoSet::new();
        let op = create(1);
        assert!(store.remove(op.clone()));
        assert!(!store.remove(op));
    }

    #[test]
    fn remove_dominates_add_regardless_of_order() {
        let op = create(1);

        let mut add_then_remove = OperationTwoSet::new();
        add_then_remove.add(op.clone());
        add_then_remove.remove(op.clone());
        assert!(!add_then_remove.effective().contains(&op));

        let mut remove_then_add = OperationTwoSet::new();
        remove_then_add.remove(op.clone());
        remove_then_add.add(op.clone());
        assert!(!remove_then_add.effective().contains(&op));
    }

    #[test]
    fn clear_empties_both_sets() {
        let mut store = OperationTwoSet::new();
        let op = create(1);
        store.add(op.clone());
        store.remove(op);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.count(OperationKind::Create), 0);
    }

    #[test]
    fn count_filters_by_kind() {
        let mut store = OperationTwoSet::new();
        store.add(create(1));
        store.add(Operation::read(2));
        store.add(Operation::delete(3));
        assert_eq!(store.count(OperationKind::Create), 1);
        assert_eq!(store.count(OperationKind::Read), 1);
        assert_eq!(store.count(OperationKind::Delete), 1);
        assert_eq!(store.count(OperationKind::Update), 0);
    }

    #[test]
    fn merge_is_commutative_associative_and_idempotent() {
        let mut a = OperationTwoSet::new();
        a.add(create(1));
        let mut b = OperationTwoSet::new();
        b.add(create(2));
        let mut c = OperationTwoSet::new();
        c.add(Operation::delete(3));

        assert_eq!(a.merge(&b).effective(), b.merge(&a).effective());
        assert_eq!(
            a.merge(&b).merge(&c).effective(),
            a.merge(&b.merge(&c)).effective()
        );
        assert_eq!(a.merge(&a).effective(), a.effective());
    }

    #[test]
    fn merge_in_place_matches_merge() {
        let mut a = OperationTwoSet::new();
        a.add(create(1));
        let mut b = OperationTwoSet::new();
        b.add(create(2));

        let merged = a.merge(&b);
        a.merge_in_place(&b);
        assert_eq!(a, merged);
    }
}

// Property tests for the merge laws (commutativity, idempotence,
// associativity, remove-dominates-add) over arbitrary operation sets.
#[cfg(test)]
mod proptests {
    use super::*;
    use crate::operation::{JsonPatch, Operation};
    use proptest::prelude::*;
    use serde_json::json;

    fn arb_patch() -> impl Strategy<Value = JsonPatch> {
        (0u64..1000).prop_map(|n| {
            json_patch::from_value(json!([{"op": "add", "path": "", "value": {"n": n}}])).unwrap()
        })
    }

    fn arb_operation() -> impl Strategy<Value = Operation> {
        let ts = 0u64..50;
        prop_oneof![
            (ts.clone(), arb_patch()).prop_map(|(ts, patch)| Operation::create(ts, patch)),
            ts.clone().prop_map(Operation::read),
            (ts.clone(), arb_patch()).prop_map(|(ts, patch)| Operation::update(ts, patch)),
            ts.prop_map(Operation::delete),
        ]
    }

    fn arb_store() -> impl Strategy<Value = OperationTwoSet> {
        prop::collection::vec(arb_operation(), 0..10).prop_map(|ops| {
            let mut store = OperationTwoSet::new();
            for op in ops {
                store.add(op);
            }
            store
        })
    }

    proptest! {
        #[test]
        fn merge_is_commutative(a in arb_store(), b in arb_store()) {
            prop_assert_eq!(a.merge(&b).effective(), b.merge(&a).effective());
        }

        #[test]
        fn merge_is_idempotent(a in arb_store()) {
            prop_assert_eq!(a.merge(&a).effective(), a.effective());
        }

        #[test]
        fn merge_is_associative(a in arb_store(), b in arb_store(), c in arb_store()) {
            let lhs = a.merge(&b).merge(&c);
            let rhs = a.merge(&b.merge(&c));
            prop_assert_eq!(lhs.effective(), rhs.effective());
        }

        #[test]
        fn remove_dominates_add_for_any_operation(op in arb_operation()) {
            let mut add_then_remove = OperationTwoSet::new();
            add_then_remove.add(op.clone());
            add_then_remove.remove(op.clone());
            prop_assert!(!add_then_remove.effective().contains(&op));

            let mut remove_then_add = OperationTwoSet::new();
            remove_then_add.remove(op.clone());
            remove_then_add.add(op.clone());
            prop_assert!(!remove_then_add.effective().contains(&op));
        }
    }
}
