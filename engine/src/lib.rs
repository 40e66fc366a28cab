//! # oplog-crdt
//!
//! A deterministic operation-log CRDT engine for JSON documents.
//!
//! Independent replicas accept local CREATE / READ / UPDATE / DELETE
//! operations against a logically shared JSON document, and later merge
//! their operation sets so that all replicas converge on the same
//! document state — without locking or coordination at operation time.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine has no knowledge of files, network, or
//!   platform — transport, gossip/anti-entropy, and persistence are all
//!   left to a hosting application.
//! - **Deterministic**: two replicas holding the same effective operation
//!   set always fold to the same document, because operations are
//!   totally ordered (see [`operation`]).
//! - **Pure**: folding is a pure function of a store's contents and a
//!   timestamp bound; nothing here blocks or suspends.
//!
//! ## Core Concepts
//!
//! ### Operations
//!
//! Every change is an immutable, timestamped [`Operation`]:
//! - [`CreateOp`] — seeds the document from the empty value
//! - [`ReadOp`] — observes the document without changing it
//! - [`UpdateOp`] — transforms an already-present document
//! - [`DeleteOp`] — permanently absents the document for the rest of a
//!   fold window, regardless of later-timestamped operations
//!
//! ### Ordering
//!
//! Operations compare by `(timestamp, kind_rank, patch_hash)`. This
//! total order is the sole source of determinism across replicas — see
//! the `Ord` impl on [`Operation`].
//!
//! ### The two-set store
//!
//! [`OperationTwoSet`] holds an add-set and a remove-set; its effective
//! set is always `add_set \ rem_set`, recomputed on demand. [`merge`] is
//! ordinary set union on each side, which is what makes it commutative,
//! associative, and idempotent.
//!
//! [`merge`]: OperationTwoSet::merge
//!
//! ### Folding
//!
//! [`fold::document_at`] materializes a document by applying a store's
//! effective operations, in order, up to a timestamp bound — sealing
//! (becoming permanently absent) the moment it encounters a DELETE.
//!
//! ### The typed manager façade
//!
//! [`CrdtManager<T>`] binds a store to a schema identity and a value
//! shape, converting between `T` and JSON on the way in and out.
//!
//! ## Quick Start
//!
//! ```rust
//! use oplog_crdt::CrdtManager;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Widget {
//!     n: i64,
//! }
//!
//! let mut widget: CrdtManager<Widget> = CrdtManager::new("widget");
//!
//! let create = widget.make_create(10, &Widget { n: 1 });
//! widget.append(create);
//! assert_eq!(widget.value(), Some(Widget { n: 1 }));
//!
//! let update = widget.make_update(20, &Widget { n: 2 });
//! widget.append(update);
//! assert_eq!(widget.value(), Some(Widget { n: 2 }));
//!
//! let delete = widget.make_delete(30);
//! widget.append(delete);
//! assert_eq!(widget.value(), None);
//! ```
//!
//! ## What this crate does not do
//!
//! No network transport, no gossip/anti-entropy protocol, no
//! authentication, no garbage-collection of the operation log, no schema
//! evolution, no CLI, no environment variables, no file formats. Those
//! are either a hosting application's concern or an explicit non-goal.

pub mod canonical;
pub mod error;
pub mod fold;
pub mod manager;
pub mod operation;
pub mod store;

pub use canonical::{to_canonical_json, to_canonical_string};
pub use error::Error;
pub use fold::{document, document_at, document_at_with_diagnostics, FoldDiagnostics};
pub use manager::{CrdtManager, ManagerOptions, SchemaId};
pub use operation::{CreateOp, DeleteOp, JsonPatch, Operation, OperationKind, ReadOp, UpdateOp};
pub use store::OperationTwoSet;

/// Opaque, caller-chosen timestamp. The engine never invents one;
/// uniqueness across replicas is the caller's responsibility (e.g. a
/// hybrid logical clock) — the total order's tie-breakers keep folding
/// deterministic even when timestamps collide.
pub type Timestamp = u64;
