//! Error taxonomy for registration, table compilation, and dispatch.
//!
//! Registration-phase errors (`DuplicateRegistration`, `InvalidOverrider`,
//! `CyclicInheritance`, `UnregisteredType` for an unknown base) are returned
//! from [`Registry::compile`](crate::Registry::compile) and abort
//! initialization: a partially built dispatch table is unsafe to use.
//! Call-phase faults (`NoApplicableOverrider`, `FatalAmbiguity`,
//! `UnregisteredType`, `WrongArity`, `NullHandle`) indicate a contract
//! violation by the caller, not a transient condition; a system that passes
//! compilation with zero ambiguous cells never raises them.

use thiserror::Error;

use crate::registry::MethodId;
use crate::rtti::TypeKey;

/// Errors raised by the registry, the table compiler, and the dispatch core.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("class `{class}` registered twice with conflicting base sets")]
    DuplicateRegistration { class: String },

    #[error("invalid overrider for method `{method}`: {detail}")]
    InvalidOverrider { method: String, detail: String },

    #[error("cyclic inheritance involving class `{class}`")]
    CyclicInheritance { class: String },

    #[error("ambiguous call to `{method}` for ({classes})")]
    FatalAmbiguity { method: String, classes: String },

    #[error("no applicable overrider for `{method}` with ({classes})")]
    NoApplicableOverrider { method: String, classes: String },

    #[error("type key {key:?} has no dispatch vector (class never registered)")]
    UnregisteredType { key: TypeKey },

    #[error("method `{method}` takes {expected} virtual arguments, got {got}")]
    WrongArity {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("dispatch through a null handle")]
    NullHandle,

    #[error("unknown method id {method:?}")]
    UnknownMethod { method: MethodId },
}

/// Hook invoked with a structured fault before a call-phase error is
/// returned. Installed via
/// [`DispatchTables::with_fault_hook`](crate::DispatchTables::with_fault_hook);
/// the default behavior logs through `tracing::error!`.
pub type FaultHook = fn(&DispatchError);
