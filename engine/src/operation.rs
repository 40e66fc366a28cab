//! Operation value types and their total order.
//!
//! An [`Operation`] is an immutable, timestamped description of one of the
//! four things a replica can do to a document: create it, observe it,
//! update it, or delete it. Operations are the only thing a store holds;
//! materializing a document is always done by folding a set of them
//! (see [`crate::fold`]).

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// An RFC-6902 JSON Patch, realized directly as the `json-patch` crate's
/// own representation rather than a hand-rolled one — patch application
/// is an external library contract (see crate docs), not something this
/// engine reimplements.
pub type JsonPatch = json_patch::Patch;

/// The four closed operation kinds, ordered as required by the total
/// order in [`Operation`]'s `Ord` impl: `Create < Read < Update < Delete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
}

/// Seeds a document from the empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOp {
    pub ts: u64,
    pub patch: JsonPatch,
}

impl CreateOp {
    pub fn new(ts: u64, patch: JsonPatch) -> Self {
        Self { ts, patch }
    }
}

/// Observes the document without changing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadOp {
    pub ts: u64,
}

impl ReadOp {
    pub fn new(ts: u64) -> Self {
        Self { ts }
    }
}

/// Transforms an already-present document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOp {
    pub ts: u64,
    pub patch: JsonPatch,
}

impl UpdateOp {
    pub fn new(ts: u64, patch: JsonPatch) -> Self {
        Self { ts, patch }
    }
}

/// Marks the document permanently absent from this timestamp onward,
/// within one fold window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOp {
    pub ts: u64,
}

impl DeleteOp {
    pub fn new(ts: u64) -> Self {
        Self { ts }
    }
}

/// An immutable, timestamped descriptor of one CRDT operation.
///
/// Variants carry their own timestamp rather than the enum carrying one
/// field shared across variants, so that each op kind's payload stays
/// self-contained and constructible on its own (`CreateOp::new(...)`,
/// then wrapped: `Operation::Create(...)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Operation {
    Create(CreateOp),
    Read(ReadOp),
    Update(UpdateOp),
    Delete(DeleteOp),
}

// `json_patch::Patch` does not derive `Eq` (it wraps `serde_json::Value`,
// which can represent floats), but our total order never compares patch
// payloads for anything beyond "are these two canonical strings equal",
// which is reflexive and total for any value actually produced by this
// crate. Asserting `Eq` here is what lets `Operation` live in a
// `BTreeSet`.
impl Eq for Operation {}

impl Operation {
    /// Convenience constructor mirroring `CreateOp::new` + `Operation::Create`.
    pub fn create(ts: u64, patch: JsonPatch) -> Self {
        Operation::Create(CreateOp::new(ts, patch))
    }

    /// Convenience constructor mirroring `ReadOp::new` + `Operation::Read`.
    pub fn read(ts: u64) -> Self {
        Operation::Read(ReadOp::new(ts))
    }

    /// Convenience constructor mirroring `UpdateOp::new` + `Operation::Update`.
    pub fn update(ts: u64, patch: JsonPatch) -> Self {
        Operation::Update(UpdateOp::new(ts, patch))
    }

    /// Convenience constructor mirroring `DeleteOp::new` + `Operation::Delete`.
    pub fn delete(ts: u64) -> Self {
        Operation::Delete(DeleteOp::new(ts))
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Operation::Create(op) => op.ts,
            Operation::Read(op) => op.ts,
            Operation::Update(op) => op.ts,
            Operation::Delete(op) => op.ts,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Read(_) => OperationKind::Read,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Operation::Create(_))
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Operation::Delete(_))
    }

    /// Structural clone, named to match the fold-step vocabulary used
    /// throughout this module rather than relying on the reader to know
    /// `Clone::clone` is structural here too.
    pub fn copy(&self) -> Operation {
        self.clone()
    }

    /// The fold step. Never fails: a patch that cannot apply leaves `doc`
    /// unchanged. Callers that need to know *why* a patch failed (e.g.
    /// the fold engine, for its diagnostics channel) go through
    /// [`Operation::try_process`] instead.
    pub fn process(&self, doc: Option<Value>) -> Option<Value> {
        self.try_process(doc.clone()).unwrap_or(doc)
    }

    /// Fallible counterpart to [`Operation::process`], used internally by
    /// [`crate::fold`] to report `PatchApplyError`s through its optional
    /// diagnostics channel without changing the no-op-on-failure behavior
    /// the public, infallible `process` exposes.
    pub(crate) fn try_process(&self, doc: Option<Value>) -> Result<Option<Value>, Error> {
        match self {
            Operation::Create(op) => Ok(Some(apply_patch(Value::Null, &op.patch)?)),
            Operation::Read(_) => Ok(doc),
            Operation::Update(op) => {
                let base = doc.unwrap_or(Value::Null);
                Ok(Some(apply_patch(base, &op.patch)?))
            }
            Operation::Delete(_) => Ok(None),
        }
    }

    /// Canonical textual form of this operation's patch payload, used as
    /// the final tie-breaker in the total order. READ and DELETE
    /// carry no patch, so they contribute the empty string.
    fn patch_key(&self) -> String {
        match self {
            Operation::Create(op) => canonical_patch_string(&op.patch),
            Operation::Update(op) => canonical_patch_string(&op.patch),
            Operation::Read(_) | Operation::Delete(_) => String::new(),
        }
    }

    /// The tuple this operation sorts by: `(timestamp, kind_rank, patch_key)`.
    fn sort_key(&self) -> (u64, OperationKind, String) {
        (self.timestamp(), self.kind(), self.patch_key())
    }
}

fn apply_patch(mut doc: Value, patch: &JsonPatch) -> Result<Value, Error> {
    json_patch::patch(&mut doc, patch).map_err(|err| Error::PatchApplyError {
        reason: err.to_string(),
    })?;
    Ok(doc)
}

fn canonical_patch_string(patch: &JsonPatch) -> String {
    serde_json::to_string(patch).unwrap_or_default()
}

impl PartialOrd for Operation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Operation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}
