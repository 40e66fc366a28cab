//! The typed manager façade.
//!
//! `CrdtManager<T>` binds one [`OperationTwoSet`] to a schema identity and
//! a value shape `T`, and is the surface most callers touch directly: it
//! turns native values into operations on the way in, and folds the
//! document back into native values (softly, see [`crate::error::Error`])
//! on the way out.
//!
//! Rust has no method overloading, so the two conceptual `make_create`
//! signatures (`make_create(ts, value)` and `make_create(ts)` with a
//! default value) become two differently-named methods here:
//! [`CrdtManager::make_create`] and [`CrdtManager::make_create_default`].

use crate::error::Error;
use crate::fold::{self, FoldDiagnostics};
use crate::operation::{Operation, OperationKind};
use crate::store::OperationTwoSet;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// An opaque token naming the native value shape a manager reconstitutes
/// from JSON. Carries no behavior of its own — it is a label compared
/// for manager equality, not a registry or a type-level guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SchemaId {
    fn from(name: &str) -> Self {
        SchemaId::new(name)
    }
}

impl From<String> for SchemaId {
    fn from(name: String) -> Self {
        SchemaId::new(name)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-manager configuration, replacing the global mutable flags a
/// reflection-heavy design would reach for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// When set, the most recent [`Error::MapperError`] is retained and
    /// inspectable via [`CrdtManager::last_mapper_error`] instead of
    /// being discarded. The crate does not bundle a logging backend, so
    /// this does not print anything itself — it is a value a caller can
    /// forward to whatever sink they use.
    pub log_mapper_errors: bool,
    /// When set, [`CrdtManager::document_at`] (and therefore `document`,
    /// `value`, `value_at`) additionally records any
    /// [`Error::PatchApplyError`]s it absorbs into
    /// [`CrdtManager::last_diagnostics`]. Never changes what document is
    /// returned — the fold algorithm is unconditional.
    pub strict: bool,
}

/// Binds one operation store to a schema identity and a value shape.
pub struct CrdtManager<T> {
    store: OperationTwoSet,
    schema: SchemaId,
    options: ManagerOptions,
    default_ctor: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    last_fold_diagnostics: RefCell<FoldDiagnostics>,
    last_mapper_error: RefCell<Option<Error>>,
    _marker: PhantomData<T>,
}

impl<T> CrdtManager<T>
where
    T: Serialize + DeserializeOwned,
{
    /// A fresh, empty manager with default options and no default
    /// constructor registered.
    pub fn new(schema: impl Into<SchemaId>) -> Self {
        Self::with_options(schema, ManagerOptions::default())
    }

    pub fn with_options(schema: impl Into<SchemaId>, options: ManagerOptions) -> Self {
        Self {
            store: OperationTwoSet::new(),
            schema: schema.into(),
            options,
            default_ctor: None,
            last_fold_diagnostics: RefCell::new(FoldDiagnostics::new()),
            last_mapper_error: RefCell::new(None),
            _marker: PhantomData,
        }
    }

    /// Registers the zero-argument constructor [`CrdtManager::make_create_default`]
    /// consults. Replaces reflective default-instantiation with an
    /// explicit capability the caller supplies up front.
    pub fn with_default(mut self, ctor: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.default_ctor = Some(Arc::new(ctor));
        self
    }

    pub fn schema(&self) -> &SchemaId {
        &self.schema
    }

    pub fn options(&self) -> ManagerOptions {
        self.options
    }

    // ---- mutators ----

    /// Appends `op` to the add-set. Returns whether the store changed.
    pub fn append(&mut self, op: Operation) -> bool {
        self.store.add(op)
    }

    /// Places `op` in the remove-set, retracting it regardless of
    /// whether it was ever added.
    pub fn retract(&mut self, op: Operation) -> bool {
        self.store.remove(op)
    }

    pub fn clear(&mut self) {
        self.store.clear();
        *self.last_fold_diagnostics.borrow_mut() = FoldDiagnostics::new();
        *self.last_mapper_error.borrow_mut() = None;
    }

    /// Merges `other`'s store into this one in place.
    pub fn merge(&mut self, other: &CrdtManager<T>) {
        self.store.merge_in_place(&other.store);
    }

    // ---- queries ----

    pub fn document(&self) -> Option<Value> {
        self.document_at(u64::MAX)
    }

    pub fn document_at(&self, ts: u64) -> Option<Value> {
        if self.options.strict {
            let mut diagnostics = FoldDiagnostics::new();
            let doc = fold::document_at_with_diagnostics(&self.store, ts, &mut diagnostics);
            *self.last_fold_diagnostics.borrow_mut() = diagnostics;
            doc
        } else {
            fold::document_at(&self.store, ts)
        }
    }

    /// The document materialized at the latest timestamp, converted to
    /// `T` via `serde_json`. Soft-fails to `None` on a shape mismatch
    /// (the `MapperError` soft-fail policy) — the raw JSON stays reachable via
    /// [`CrdtManager::document`].
    pub fn value(&self) -> Option<T> {
        self.value_at(u64::MAX)
    }

    /// Alias for [`CrdtManager::value`].
    pub fn current_value(&self) -> Option<T> {
        self.value()
    }

    pub fn value_at(&self, ts: u64) -> Option<T> {
        let doc = self.document_at(ts)?;
        match serde_json::from_value(doc) {
            Ok(value) => Some(value),
            Err(err) => {
                let mapper_err = Error::MapperError {
                    schema: self.schema.0.clone(),
                    reason: err.to_string(),
                };
                if self.options.log_mapper_errors {
                    *self.last_mapper_error.borrow_mut() = Some(mapper_err);
                }
                None
            }
        }
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.store.count(kind)
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Whether the document is currently present.
    pub fn is_created(&self) -> bool {
        self.document().is_some()
    }

    /// Whether the document is currently absent *because* the effective
    /// set contains a DELETE that sealed the fold, as opposed to never
    /// having been created at all.
    pub fn is_deleted(&self) -> bool {
        self.document().is_none() && self.store.count(OperationKind::Delete) > 0
    }

    /// Patch-apply failures absorbed by the most recent call to
    /// [`CrdtManager::document`]/[`CrdtManager::document_at`] (and
    /// transitively `value`/`value_at`), when [`ManagerOptions::strict`]
    /// is set. Empty otherwise.
    pub fn last_diagnostics(&self) -> std::cell::Ref<'_, FoldDiagnostics> {
        self.last_fold_diagnostics.borrow()
    }

    /// The most recent mapper shape-mismatch, when
    /// [`ManagerOptions::log_mapper_errors`] is set. `None` otherwise, or
    /// if no mismatch has occurred yet.
    pub fn last_mapper_error(&self) -> std::cell::Ref<'_, Option<Error>> {
        self.last_mapper_error.borrow()
    }

    // ---- factory methods ----

    /// Builds a CREATE operation whose patch, applied to the empty
    /// document, reproduces `value`. The patch is computed by diffing
    /// the empty document against `value` through the same external
    /// diff collaborator `make_update` uses.
    pub fn make_create(&self, ts: u64, value: &T) -> Operation {
        let after = serde_json::to_value(value).unwrap_or(Value::Null);
        let patch = json_patch::diff(&Value::Null, &after);
        Operation::create(ts, patch)
    }

    /// Builds a CREATE operation from the manager's registered default
    /// constructor. Surfaced as [`Error::ConstructionError`] when none
    /// was registered via [`CrdtManager::with_default`] — unlike the
    /// soft-fail policies elsewhere in this façade, this one is reported
    /// to the caller directly.
    pub fn make_create_default(&self, ts: u64) -> Result<Operation, Error> {
        let ctor = self
            .default_ctor
            .as_ref()
            .ok_or_else(|| Error::ConstructionError {
                schema: self.schema.0.clone(),
            })?;
        Ok(self.make_create(ts, &ctor()))
    }

    pub fn make_read(&self, ts: u64) -> Operation {
        Operation::read(ts)
    }

    /// Builds an UPDATE operation whose patch, applied to the currently
    /// materialized document, produces `value`. The patch-diff contract
    /// is external: this diffs the current `document()`
    /// against `value` through `json_patch::diff`.
    pub fn make_update(&self, ts: u64, value: &T) -> Operation {
        let before = self.document().unwrap_or(Value::Null);
        let after = serde_json::to_value(value).unwrap_or(Value::Null);
        let patch = json_patch::diff(&before, &after);
        Operation::update(ts, patch)
    }

    pub fn make_delete(&self, ts: u64) -> Operation {
        Operation::delete(ts)
    }
}

impl<T> PartialEq for CrdtManager<T> {
    /// Two managers are equal iff they hold equal stores *and* their
    /// schema identities match — options, the default
    /// constructor, and cached diagnostics are not part of identity.
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.store == other.store
    }
}

impl<T> fmt::Debug for CrdtManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrdtManager")
            .field("schema", &self.schema)
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}

impl<T> Clone for CrdtManager<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            schema: self.schema.clone(),
            options: self.options,
            default_ctor: self.default_ctor.clone(),
            last_fold_diagnostics: RefCell::new(self.last_fold_diagnostics.borrow().clone()),
            last_mapper_error: RefCell::new(self.last_mapper_error.borrow().clone()),
            _marker: PhantomData,
        }
    }
}
