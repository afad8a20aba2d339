//! Method registry: open-method declarations and their overriders.
//!
//! The registry is the write side of the system. During a single-threaded
//! startup window the caller registers classes, declares methods, and adds
//! overriders; [`Registry::compile`] then consumes the registry and
//! produces immutable [`DispatchTables`](crate::DispatchTables). There is
//! no way to add registrations after compilation.

use std::any::Any;

use crate::class_graph::{ClassGraph, ClassId};
use crate::compile::{self, AmbiguityPolicy, CompileReport};
use crate::dispatch::DispatchTables;
use crate::error::DispatchError;
use crate::rtti::{Dispatchable, TypeKey};
use crate::store::{MapStore, VptrStore};

/// Handle to a declared method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u32);

impl MethodId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a registered overrider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverriderId(u32);

/// Type-erased overrider entry point.
///
/// The entry receives the original argument objects and performs its own
/// cross-casts via [`Dispatchable::cast_to`]; generating typed thunks from
/// a signature is the job of a wrapper layer outside this crate.
pub type ErasedFn = fn(&[&dyn Dispatchable]) -> Box<dyn Any>;

/// An open-method declaration.
#[derive(Debug)]
pub(crate) struct MethodDecl {
    /// For diagnostics only.
    pub name: String,
    /// Declared (least-derived) class per virtual parameter position.
    pub params: Vec<ClassId>,
    /// Return class, when the return type is a registered class (or a
    /// smart handle to one). `None` means opaque to covariance.
    pub ret: Option<ClassId>,
}

/// A concrete implementation registered for a method.
#[derive(Debug)]
pub(crate) struct Overrider {
    pub params: Vec<ClassId>,
    pub ret: Option<ClassId>,
    pub entry: ErasedFn,
}

/// Registration-phase state: class graph, method declarations, overriders.
#[derive(Debug, Default)]
pub struct Registry {
    pub(crate) graph: ClassGraph,
    pub(crate) methods: Vec<MethodDecl>,
    /// Overriders per method, in registration order.
    pub(crate) overriders: Vec<Vec<Overrider>>,
    pub(crate) policy: AmbiguityPolicy,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under an explicit key. Bases may be forward
    /// references resolved at compile time.
    pub fn register_class(
        &mut self,
        key: TypeKey,
        name: &str,
        bases: &[TypeKey],
    ) -> Result<ClassId, DispatchError> {
        self.graph.register(key, name, bases)
    }

    /// Register a Rust type under its native [`TypeKey::of`] key.
    pub fn register_type<T: Any>(
        &mut self,
        name: &str,
        bases: &[TypeKey],
    ) -> Result<ClassId, DispatchError> {
        self.graph.register(TypeKey::of::<T>(), name, bases)
    }

    /// Declare an open method with its virtual parameter classes and,
    /// optionally, a class-typed return for covariant narrowing.
    pub fn declare_method(
        &mut self,
        name: &str,
        params: &[ClassId],
        ret: Option<ClassId>,
    ) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodDecl {
            name: name.to_string(),
            params: params.to_vec(),
            ret,
        });
        self.overriders.push(Vec::new());
        id
    }

    /// Register an overrider for `method`.
    ///
    /// Arity is validated immediately. The descendant checks (each
    /// parameter equal to or derived from the declared one, return
    /// covariant with the method return) require the compiled hierarchy
    /// and run at the start of [`compile`](Registry::compile), still
    /// inside the registration window, before any dispatch can occur.
    pub fn add_overrider(
        &mut self,
        method: MethodId,
        params: &[ClassId],
        ret: Option<ClassId>,
        entry: ErasedFn,
    ) -> Result<OverriderId, DispatchError> {
        let decl = self
            .methods
            .get(method.index())
            .ok_or(DispatchError::UnknownMethod { method })?;
        if params.len() != decl.params.len() {
            return Err(DispatchError::InvalidOverrider {
                method: decl.name.clone(),
                detail: format!(
                    "expected {} virtual parameters, got {}",
                    decl.params.len(),
                    params.len()
                ),
            });
        }

        let list = &mut self.overriders[method.index()];
        let id = OverriderId(list.len() as u32);
        list.push(Overrider {
            params: params.to_vec(),
            ret,
            entry,
        });
        Ok(id)
    }

    /// Select the behavior for combinations that stay ambiguous after
    /// covariant-return narrowing. Default: report and seal the cell.
    pub fn set_ambiguity_policy(&mut self, policy: AmbiguityPolicy) {
        self.policy = policy;
    }

    /// Compile the hierarchy and the dispatch tables, with the hash-map
    /// vector store.
    pub fn compile(self) -> Result<(DispatchTables<MapStore>, CompileReport), DispatchError> {
        self.compile_with::<MapStore>()
    }

    /// Compile with an explicit vector store backend.
    pub fn compile_with<S: VptrStore>(
        self,
    ) -> Result<(DispatchTables<S>, CompileReport), DispatchError> {
        compile::compile(self)
    }
}
