//! Constant-time dispatch over compiled tables.
//!
//! Each class owns a [`DispatchVector`]. For a single-parameter method the
//! vector slot holds the selected entry point directly. For a
//! multi-parameter method each argument's slot holds a group index on that
//! argument's axis; the indices combine through per-axis strides into one
//! cell of the method's dense table. Either way a call costs one slot read
//! per argument plus at most one table read, independent of hierarchy and
//! overrider counts.

use std::any::Any;
use std::sync::Arc;

use crate::class_graph::{ClassGraph, ClassId};
use crate::error::{DispatchError, FaultHook};
use crate::registry::{ErasedFn, MethodId};
use crate::rtti::{Dispatchable, TypeKey};
use crate::store::VptrStore;

/// One slot of a dispatch vector, or one cell of a method table.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SlotEntry {
    /// Selected overrider entry point.
    Exec(ErasedFn),
    /// Group index on one axis of a multi-parameter method.
    Group(u32),
    /// No applicable overrider for this combination.
    NotApplicable,
    /// Sealed ambiguous combination.
    Ambiguous,
}

/// Per-class dispatch vector, shared between the table store and cached
/// handles.
#[derive(Debug)]
pub struct DispatchVector {
    class: ClassId,
    slots: Box<[SlotEntry]>,
}

impl DispatchVector {
    pub(crate) fn new(class: ClassId, slots: Box<[SlotEntry]>) -> Self {
        DispatchVector { class, slots }
    }

    /// The class this vector belongs to.
    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Vectors are truncated to the last slot their class participates in;
    /// reading past the end means the class takes no part in the method.
    pub(crate) fn entry(&self, slot: u32) -> SlotEntry {
        self.slots
            .get(slot as usize)
            .copied()
            .unwrap_or(SlotEntry::NotApplicable)
    }
}

/// Compiled form of one method.
#[derive(Debug)]
pub(crate) struct CompiledMethod {
    pub name: String,
    /// Declared class per virtual position, for the participation check.
    pub declared: Vec<ClassId>,
    /// Dispatch-vector slot per virtual position.
    pub slots: Vec<u32>,
    /// Row-major strides; empty for single-parameter methods.
    pub strides: Vec<usize>,
    /// Dense resolution table; empty for single-parameter methods.
    pub table: Box<[SlotEntry]>,
}

impl CompiledMethod {
    fn arity(&self) -> usize {
        self.slots.len()
    }
}

/// Immutable compiled dispatch state.
///
/// Produced by [`Registry::compile`](crate::Registry::compile); safe to
/// share across threads and use concurrently.
#[derive(Debug)]
pub struct DispatchTables<S: VptrStore> {
    graph: ClassGraph,
    methods: Vec<CompiledMethod>,
    /// Vector per class, indexed by `ClassId`.
    vectors: Vec<Arc<DispatchVector>>,
    store: S,
    fault_hook: Option<FaultHook>,
}

impl<S: VptrStore> DispatchTables<S> {
    pub(crate) fn new(
        graph: ClassGraph,
        methods: Vec<CompiledMethod>,
        vectors: Vec<Arc<DispatchVector>>,
        store: S,
    ) -> Self {
        debug_assert!(graph.is_compiled());
        DispatchTables {
            graph,
            methods,
            vectors,
            store,
            fault_hook: None,
        }
    }

    /// Install a hook observing call-phase faults before they are
    /// returned. Without one, faults log through `tracing::error!`.
    pub fn with_fault_hook(mut self, hook: FaultHook) -> Self {
        self.fault_hook = Some(hook);
        self
    }

    /// The compiled class hierarchy, for read-only queries.
    pub fn graph(&self) -> &ClassGraph {
        &self.graph
    }

    /// The dispatch vector for a runtime type key.
    pub fn vector_for(&self, key: TypeKey) -> Result<&Arc<DispatchVector>, DispatchError> {
        match self.store.lookup(key) {
            Some(vector) => Ok(vector),
            None => Err(self.fault(DispatchError::UnregisteredType { key })),
        }
    }

    pub(crate) fn vector_of(&self, class: ClassId) -> &Arc<DispatchVector> {
        &self.vectors[class.index()]
    }

    /// Dispatch `method` over the runtime types of `args` and invoke the
    /// selected overrider.
    pub fn dispatch(
        &self,
        method: MethodId,
        args: &[&dyn Dispatchable],
    ) -> Result<Box<dyn Any>, DispatchError> {
        self.method_for(method, args.len())?;
        let mut vectors = Vec::with_capacity(args.len());
        for arg in args {
            vectors.push(self.vector_for(arg.type_key())?.as_ref());
        }
        let entry = self.select_from(method, &vectors)?;
        Ok(entry(args))
    }

    /// Select the overrider for a tuple of runtime type keys without
    /// invoking it.
    pub fn select(&self, method: MethodId, keys: &[TypeKey]) -> Result<ErasedFn, DispatchError> {
        self.method_for(method, keys.len())?;
        let mut vectors = Vec::with_capacity(keys.len());
        for &key in keys {
            vectors.push(self.vector_for(key)?.as_ref());
        }
        self.select_from(method, &vectors)
    }

    /// Dispatch with the first argument's vector already at hand (the
    /// cached-handle path).
    pub(crate) fn dispatch_with_first(
        &self,
        method: MethodId,
        first: &dyn Dispatchable,
        first_vector: &DispatchVector,
        rest: &[&dyn Dispatchable],
    ) -> Result<Box<dyn Any>, DispatchError> {
        self.method_for(method, 1 + rest.len())?;
        let mut vectors = Vec::with_capacity(1 + rest.len());
        vectors.push(first_vector);
        for arg in rest {
            vectors.push(self.vector_for(arg.type_key())?.as_ref());
        }
        let entry = self.select_from(method, &vectors)?;

        let mut args = Vec::with_capacity(1 + rest.len());
        args.push(first);
        args.extend_from_slice(rest);
        Ok(entry(&args))
    }

    /// Core selection: one slot read per argument, one table cell for
    /// multi-parameter methods.
    pub(crate) fn select_from(
        &self,
        method: MethodId,
        vectors: &[&DispatchVector],
    ) -> Result<ErasedFn, DispatchError> {
        let compiled = self.method_for(method, vectors.len())?;

        // Slots are shared between methods with disjoint participants, so
        // an argument outside the declared hierarchy must be rejected
        // before its slot is trusted.
        for (vector, &declared) in vectors.iter().zip(&compiled.declared) {
            if !self.graph.derives_from(vector.class(), declared) {
                return Err(self.no_applicable(compiled, vectors));
            }
        }

        let entry = if compiled.arity() == 1 {
            vectors[0].entry(compiled.slots[0])
        } else {
            let mut cell = 0usize;
            for (pos, vector) in vectors.iter().enumerate() {
                match vector.entry(compiled.slots[pos]) {
                    SlotEntry::Group(group) => cell += group as usize * compiled.strides[pos],
                    _ => return Err(self.no_applicable(compiled, vectors)),
                }
            }
            compiled
                .table
                .get(cell)
                .copied()
                .unwrap_or(SlotEntry::NotApplicable)
        };

        match entry {
            SlotEntry::Exec(entry) => Ok(entry),
            SlotEntry::Ambiguous => Err(self.fault(DispatchError::FatalAmbiguity {
                method: compiled.name.clone(),
                classes: self.describe(vectors),
            })),
            SlotEntry::NotApplicable | SlotEntry::Group(_) => {
                Err(self.no_applicable(compiled, vectors))
            }
        }
    }

    /// Resolve the compiled method and check the call's arity against its
    /// declaration. Runs before any vector lookup so that a malformed call
    /// is reported as such even when extra arguments are unregistered.
    fn method_for(
        &self,
        method: MethodId,
        got: usize,
    ) -> Result<&CompiledMethod, DispatchError> {
        let compiled = match self.methods.get(method.index()) {
            Some(compiled) => compiled,
            None => return Err(self.fault(DispatchError::UnknownMethod { method })),
        };
        if got != compiled.arity() {
            return Err(self.fault(DispatchError::WrongArity {
                method: compiled.name.clone(),
                expected: compiled.arity(),
                got,
            }));
        }
        Ok(compiled)
    }

    fn no_applicable(&self, compiled: &CompiledMethod, vectors: &[&DispatchVector]) -> DispatchError {
        self.fault(DispatchError::NoApplicableOverrider {
            method: compiled.name.clone(),
            classes: self.describe(vectors),
        })
    }

    fn describe(&self, vectors: &[&DispatchVector]) -> String {
        vectors
            .iter()
            .map(|v| self.graph.name(v.class()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub(crate) fn fault(&self, err: DispatchError) -> DispatchError {
        match self.fault_hook {
            Some(hook) => hook(&err),
            None => tracing::error!(error = %err, "dispatch fault"),
        }
        err
    }
}
