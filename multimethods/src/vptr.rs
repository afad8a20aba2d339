//! Cached dispatch handles.
//!
//! Looking an object's dispatch vector up in the store on every call is
//! wasted work when the same object is dispatched repeatedly. A
//! [`VirtualRef`] pairs an object reference with its vector, resolved once
//! at construction; calls through it skip the store for that argument. A
//! [`FinalRef`] goes further: when the object's exact runtime class is
//! known to be its static type, the vector comes straight from the class
//! graph with no store involvement at all.
//!
//! Handles may also be null. A null handle carries no object and no
//! vector; dispatching through it is a [`DispatchError::NullHandle`]
//! fault, not a crash.

use std::any::Any;

use crate::dispatch::{DispatchTables, DispatchVector};
use crate::error::DispatchError;
use crate::registry::MethodId;
use crate::rtti::Dispatchable;
use crate::store::VptrStore;

/// Type-erased handle: an object plus its dispatch vector.
pub struct VirtualRef<'a, S: VptrStore> {
    tables: &'a DispatchTables<S>,
    bound: Option<(&'a dyn Dispatchable, &'a DispatchVector)>,
}

impl<'a, S: VptrStore> Clone for VirtualRef<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: VptrStore> Copy for VirtualRef<'a, S> {}

impl<'a, S: VptrStore> VirtualRef<'a, S> {
    /// Bind `obj` to its dispatch vector, looked up once by runtime type
    /// key.
    pub fn bind(
        tables: &'a DispatchTables<S>,
        obj: &'a dyn Dispatchable,
    ) -> Result<Self, DispatchError> {
        let vector = tables.vector_for(obj.type_key())?.as_ref();
        Ok(VirtualRef {
            tables,
            bound: Some((obj, vector)),
        })
    }

    /// A handle bound to nothing.
    pub fn null(tables: &'a DispatchTables<S>) -> Self {
        VirtualRef {
            tables,
            bound: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.bound.is_none()
    }

    /// The bound object, or `None` for a null handle.
    pub fn get(&self) -> Option<&'a dyn Dispatchable> {
        self.bound.map(|(obj, _)| obj)
    }

    /// The cached dispatch vector, or `None` for a null handle.
    pub fn vector(&self) -> Option<&'a DispatchVector> {
        self.bound.map(|(_, vector)| vector)
    }

    /// Dispatch `method` with the bound object as the first virtual
    /// argument, reusing the cached vector for it.
    pub fn call(
        &self,
        method: MethodId,
        rest: &[&dyn Dispatchable],
    ) -> Result<Box<dyn Any>, DispatchError> {
        match self.bound {
            Some((obj, vector)) => self.tables.dispatch_with_first(method, obj, vector, rest),
            None => Err(self.tables.fault(DispatchError::NullHandle)),
        }
    }
}

/// Typed handle for an object whose exact runtime class is its static
/// type.
///
/// Construction resolves the vector through the class graph instead of the
/// store, trusting the caller's claim that `obj` is not a base view of
/// something more derived. Dispatch through a `FinalRef` selects exactly
/// what a store-resolved handle would; only the lookup differs.
pub struct FinalRef<'a, T: Dispatchable, S: VptrStore> {
    tables: &'a DispatchTables<S>,
    obj: &'a T,
    vector: &'a DispatchVector,
}

impl<'a, T: Dispatchable, S: VptrStore> Clone for FinalRef<'a, T, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T: Dispatchable, S: VptrStore> Copy for FinalRef<'a, T, S> {}

impl<'a, T: Dispatchable, S: VptrStore> FinalRef<'a, T, S> {
    /// Bind `obj`, resolving the vector from the class graph by its exact
    /// type key.
    pub fn bind(tables: &'a DispatchTables<S>, obj: &'a T) -> Result<Self, DispatchError> {
        let key = obj.type_key();
        let class = tables
            .graph()
            .class_by_key(key)
            .ok_or(DispatchError::UnregisteredType { key })?;
        Ok(FinalRef {
            tables,
            obj,
            vector: tables.vector_of(class).as_ref(),
        })
    }

    pub fn get(&self) -> &'a T {
        self.obj
    }

    /// Erase the static type, keeping the already-resolved vector.
    pub fn widen(&self) -> VirtualRef<'a, S> {
        VirtualRef {
            tables: self.tables,
            bound: Some((self.obj, self.vector)),
        }
    }

    /// Dispatch `method` with the bound object as the first virtual
    /// argument.
    pub fn call(
        &self,
        method: MethodId,
        rest: &[&dyn Dispatchable],
    ) -> Result<Box<dyn Any>, DispatchError> {
        self.tables
            .dispatch_with_first(method, self.obj, self.vector, rest)
    }
}
