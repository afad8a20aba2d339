//! Class hierarchy graph: registration, transitive closure, and ranks.
//!
//! Classes form a multiple-inheritance DAG. Registration records each class
//! with the keys of its direct bases; bases may be forward references,
//! resolved when the hierarchy is compiled. Compilation computes, per class:
//!
//! - the full ancestor set (transitive closure over direct bases,
//!   deduplicated, so a diamond-shared base appears once), and
//! - a rank: the longest-path depth from a root, so that
//!   `rank(child) > rank(base)` for every direct base.
//!
//! Ranks are not contiguous; they only preserve the partial order. Where a
//! deterministic total order is needed (tie-breaking in the table
//! compiler), the secondary key is registration order.

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};

use crate::error::DispatchError;
use crate::rtti::TypeKey;

/// Arena index of a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        ClassId(index as u32)
    }
}

/// A registered class record.
#[derive(Debug)]
pub(crate) struct ClassNode {
    key: TypeKey,
    name: String,
    /// Direct bases as registered, possibly forward references.
    base_keys: Vec<TypeKey>,
    /// Direct bases, resolved by `compile_hierarchy`.
    bases: Vec<ClassId>,
    /// Transitive ancestor set, excluding the class itself.
    ancestors: FxHashSet<ClassId>,
    rank: u32,
}

/// The class hierarchy.
///
/// Mutated only during the single-threaded registration window; read-only
/// once [`compile_hierarchy`](ClassGraph::compile_hierarchy) has run.
#[derive(Debug, Default)]
pub struct ClassGraph {
    classes: Vec<ClassNode>,
    by_key: IndexMap<TypeKey, ClassId, FxBuildHasher>,
    compiled: bool,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class with its direct bases.
    ///
    /// Idempotent: registering the same key with the same base set returns
    /// the existing id. Registering the same key with a different base set
    /// is a `DuplicateRegistration` defect (it indicates two distinct types
    /// sharing an identifier, not a legitimate re-registration).
    pub fn register(
        &mut self,
        key: TypeKey,
        name: &str,
        base_keys: &[TypeKey],
    ) -> Result<ClassId, DispatchError> {
        if let Some(&id) = self.by_key.get(&key) {
            let existing = &self.classes[id.index()];
            if existing.base_keys == base_keys {
                return Ok(id);
            }
            return Err(DispatchError::DuplicateRegistration {
                class: name.to_string(),
            });
        }

        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassNode {
            key,
            name: name.to_string(),
            base_keys: base_keys.to_vec(),
            bases: Vec::new(),
            ancestors: FxHashSet::default(),
            rank: 0,
        });
        self.by_key.insert(key, id);
        Ok(id)
    }

    /// Resolve base references, reject cycles, and compute ancestor sets
    /// and ranks.
    ///
    /// Fails with `UnregisteredType` if a base key was never registered and
    /// `CyclicInheritance` if the base relation is not a DAG. Both are
    /// registration defects that abort initialization.
    pub fn compile_hierarchy(&mut self) -> Result<(), DispatchError> {
        // Resolve forward base references.
        for idx in 0..self.classes.len() {
            let mut bases = Vec::with_capacity(self.classes[idx].base_keys.len());
            for &base_key in &self.classes[idx].base_keys {
                let base = self.by_key.get(&base_key).copied().ok_or(
                    DispatchError::UnregisteredType { key: base_key },
                )?;
                bases.push(base);
            }
            self.classes[idx].bases = bases;
        }

        // Kahn's algorithm over the base relation, roots first. Processing
        // order also fixes ranks: every base is finished before its
        // children, so rank(child) = 1 + max(rank(base)).
        let n = self.classes.len();
        let mut remaining: Vec<usize> = self.classes.iter().map(|c| c.bases.len()).collect();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (idx, node) in self.classes.iter().enumerate() {
            for base in &node.bases {
                children[base.index()].push(idx);
            }
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
        let mut head = 0;
        let mut processed = 0;
        while head < queue.len() {
            let idx = queue[head];
            head += 1;
            processed += 1;

            let bases = self.classes[idx].bases.clone();
            let mut ancestors = FxHashSet::default();
            let mut rank = 0;
            for base in bases {
                ancestors.insert(base);
                ancestors.extend(self.classes[base.index()].ancestors.iter().copied());
                rank = rank.max(self.classes[base.index()].rank + 1);
            }
            self.classes[idx].ancestors = ancestors;
            self.classes[idx].rank = rank;

            for &child in &children[idx] {
                remaining[child] -= 1;
                if remaining[child] == 0 {
                    queue.push(child);
                }
            }
        }

        if processed < n {
            // Any node with unprocessed bases sits on a cycle.
            let culprit = (0..n)
                .find(|&i| remaining[i] > 0)
                .map(|i| self.classes[i].name.clone())
                .unwrap_or_default();
            return Err(DispatchError::CyclicInheritance { class: culprit });
        }

        self.compiled = true;
        Ok(())
    }

    /// Reflexive descendant check: `child` is `base` or derives from it.
    pub fn derives_from(&self, child: ClassId, base: ClassId) -> bool {
        child == base || self.classes[child.index()].ancestors.contains(&base)
    }

    /// Strict ancestor check.
    pub fn is_ancestor(&self, base: ClassId, child: ClassId) -> bool {
        self.classes[child.index()].ancestors.contains(&base)
    }

    pub fn rank(&self, id: ClassId) -> u32 {
        self.classes[id.index()].rank
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.classes[id.index()].name
    }

    pub fn key(&self, id: ClassId) -> TypeKey {
        self.classes[id.index()].key
    }

    pub fn class_by_key(&self, key: TypeKey) -> Option<ClassId> {
        self.by_key.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Class ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(|i| ClassId(i as u32))
    }

    #[cfg(test)]
    pub(crate) fn ancestors(&self, id: ClassId) -> &FxHashSet<ClassId> {
        &self.classes[id.index()].ancestors
    }
}
