//! Type identity: stable per-class keys and the object-side interface.
//!
//! The dispatch core never inspects objects directly. It needs exactly two
//! things from the outside: a stable identifier per registered class
//! ([`TypeKey`]), and a way to obtain that identifier from a live object
//! ([`Dispatchable::type_key`]). Two identifier sources are supported:
//!
//! - [`TypeKey::of`] derives a key from `std::any::TypeId`, the
//!   language-native facility. Keys are stable within a process but not
//!   small, so they pair with the hash-map table store.
//! - [`KeyAllocator`] hands out small sequential keys for hand-rolled
//!   identity schemes (a per-class counter assigned during registration, a
//!   tag field written in the constructor). Small keys pair with the dense
//!   table store.
//!
//! [`Dispatchable::cast_to`] is the cast collaborator: it adjusts an object
//! reference from a base view to a more specific one. The default answers
//! only the exact dynamic type; hierarchies built from embedded base
//! subobjects override it to delegate down the base chain, so a
//! diamond-shared base resolves to a single address no matter which path
//! reaches it. A type that cannot perform an adjustment returns `None`,
//! which the caller sees as an explicit failure rather than a misaligned
//! reference.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Stable identifier for a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(u64);

impl TypeKey {
    /// Key derived from the language-native `TypeId` of `T`.
    pub fn of<T: Any + ?Sized>() -> Self {
        let mut hasher = FxHasher::default();
        TypeId::of::<T>().hash(&mut hasher);
        TypeKey(hasher.finish())
    }

    /// Key from a caller-managed identifier source.
    pub const fn from_raw(raw: u64) -> Self {
        TypeKey(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

/// Allocator for small sequential type keys.
///
/// Keys start at zero and are suitable as direct indices into
/// [`DenseStore`](crate::store::DenseStore). Allocation happens during the
/// single-threaded registration window, alongside class registration.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next key. Keys are never reused.
    pub fn allocate(&mut self) -> TypeKey {
        let key = TypeKey(self.next);
        self.next += 1;
        key
    }
}

/// Object-side interface consumed by the dispatch core.
///
/// An implementation reports the key of the object's exact runtime class
/// and exposes the object for downcasting. For flat hierarchies (each
/// registered class is a standalone Rust type) the one-line implementations
/// suffice:
///
/// ```
/// use std::any::Any;
/// use multimethods::{Dispatchable, TypeKey};
///
/// struct Cat;
///
/// impl Dispatchable for Cat {
///     fn type_key(&self) -> TypeKey {
///         TypeKey::of::<Cat>()
///     }
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
/// }
/// ```
pub trait Dispatchable {
    /// Identifier of the object's exact runtime class.
    fn type_key(&self) -> TypeKey;

    /// The object, for downcasting to its concrete type.
    fn as_any(&self) -> &dyn Any;

    /// View this object as class `target`, adjusting the reference if the
    /// target is an embedded base subobject.
    ///
    /// The default handles the exact-type case only. Types with embedded
    /// bases override it and delegate to each base field in turn; shared
    /// (virtual) bases are stored once and so report one address through
    /// every path.
    fn cast_to(&self, target: TypeKey) -> Option<&dyn Any> {
        if self.type_key() == target {
            Some(self.as_any())
        } else {
            None
        }
    }
}
