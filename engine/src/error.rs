//! Error types for the operation-log CRDT engine.
//!
//! None of these are fatal to the engine itself — the engine is a
//! soft-fail policy throughout. `PatchApplyError` is absorbed by the fold
//! (the offending operation becomes a no-op) and is only ever surfaced
//! through an optional diagnostics channel; `MapperError` degrades a typed
//! read to `None` while the raw JSON stays reachable; `ConstructionError`
//! is the one variant actually returned to a caller, since a manager with
//! no default constructor genuinely cannot synthesize a value.

use thiserror::Error;

/// All possible errors from the engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A CREATE/UPDATE patch failed to apply to the current document.
    /// Recovered locally: the fold treats the operation as a no-op and
    /// continues. Never returned from `document`/`document_at` directly —
    /// only ever surfaced via [`crate::fold::FoldDiagnostics`].
    #[error("patch failed to apply: {reason}")]
    PatchApplyError { reason: String },

    /// Conversion between JSON and a native value failed in the typed
    /// manager façade. The manager falls back to `None` for the typed
    /// read; `document`/`document_at` still return the raw JSON.
    #[error("value of shape '{schema}' could not be reconstructed from JSON: {reason}")]
    MapperError { schema: String, reason: String },

    /// The façade was asked to synthesize a default value for a manager
    /// with no default constructor.
    #[error("manager for schema '{schema}' has no default constructor")]
    ConstructionError { schema: String },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
