//! Open multiple dispatch over an explicit class hierarchy.
//!
//! Methods are declared separately from the types they dispatch on, and
//! implementations (overriders) attach to any combination of classes in a
//! registered inheritance DAG. All resolution work happens once, at table
//! compilation: for every reachable argument-class combination the most
//! specific overrider is selected ahead of time, ambiguities are detected
//! (with covariant-return narrowing as the tie-breaker), and the results
//! land in flat per-class vectors and dense per-method tables. A dispatch
//! at run time is a few array reads, independent of hierarchy size and
//! overrider count.
//!
//! The lifecycle has three phases:
//!
//! 1. **Registration**: a [`Registry`] collects classes with their direct
//!    bases, method declarations, and overriders. Single-threaded, at
//!    startup.
//! 2. **Compilation**: [`Registry::compile`] closes the hierarchy,
//!    validates every overrider, resolves every combination, and returns
//!    immutable [`DispatchTables`] plus a [`CompileReport`].
//! 3. **Dispatch**: [`DispatchTables::dispatch`] selects and invokes; the
//!    tables are shareable across threads. [`VirtualRef`] and [`FinalRef`]
//!    cache an argument's dispatch vector across calls.
//!
//! ```
//! use std::any::Any;
//! use multimethods::{Dispatchable, Registry, TypeKey};
//!
//! struct Animal;
//! struct Cat;
//!
//! impl Dispatchable for Animal {
//!     fn type_key(&self) -> TypeKey { TypeKey::of::<Animal>() }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//! impl Dispatchable for Cat {
//!     fn type_key(&self) -> TypeKey { TypeKey::of::<Cat>() }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! fn poke_cat(_args: &[&dyn Dispatchable]) -> Box<dyn Any> {
//!     Box::new("hiss".to_string())
//! }
//!
//! # fn main() -> Result<(), multimethods::DispatchError> {
//! let mut registry = Registry::new();
//! let animal = registry.register_type::<Animal>("Animal", &[])?;
//! let cat = registry.register_type::<Cat>("Cat", &[TypeKey::of::<Animal>()])?;
//!
//! let poke = registry.declare_method("poke", &[animal], None);
//! registry.add_overrider(poke, &[cat], None, poke_cat)?;
//!
//! let (tables, report) = registry.compile()?;
//! assert_eq!(report.ambiguous, 0);
//!
//! let reaction = tables.dispatch(poke, &[&Cat])?;
//! assert_eq!(reaction.downcast_ref::<String>().map(String::as_str), Some("hiss"));
//! # Ok(())
//! # }
//! ```

mod class_graph;
mod compile;
mod dispatch;
mod error;
mod registry;
mod rtti;
mod store;
mod vptr;

pub use class_graph::{ClassGraph, ClassId};
pub use compile::{AmbiguityPolicy, CompileReport};
pub use dispatch::{DispatchTables, DispatchVector};
pub use error::{DispatchError, FaultHook};
pub use registry::{ErasedFn, MethodId, OverriderId, Registry};
pub use rtti::{Dispatchable, KeyAllocator, TypeKey};
pub use store::{DenseStore, MapStore, VptrStore};
pub use vptr::{FinalRef, VirtualRef};
