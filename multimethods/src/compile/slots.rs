//! Slot assignment: packing method positions into per-class vectors.
//!
//! Every (method, virtual position) pair needs an index into the dispatch
//! vectors of its participating classes. A single global index per pair
//! works but bloats every vector to the total position count. Instead,
//! positions are packed greedily: two pairs share a slot when no class
//! participates in both, so unrelated hierarchies overlap for free. A
//! class's vector only needs to reach the highest slot assigned to it.

use rustc_hash::FxHashSet;

use crate::class_graph::ClassId;

/// Result of packing: one slot per (method, position), and the vector
/// length each class requires.
pub(crate) struct SlotAssignment {
    /// `slots[method][position]` is the dispatch-vector index.
    pub slots: Vec<Vec<u32>>,
    /// Required vector length per class, indexed by `ClassId`.
    pub vector_len: Vec<usize>,
}

/// Assign slots. `participants[method][position]` lists the classes that
/// can appear at that position (the declared class and its descendants).
pub(crate) fn assign(participants: &[Vec<Vec<ClassId>>], class_count: usize) -> SlotAssignment {
    let mut used: Vec<FxHashSet<u32>> = vec![FxHashSet::default(); class_count];
    let mut slots = Vec::with_capacity(participants.len());
    let mut vector_len = vec![0usize; class_count];

    for method_parts in participants {
        let mut method_slots = Vec::with_capacity(method_parts.len());
        for classes in method_parts {
            // First-fit: lowest slot free in every participating class.
            let mut slot = 0u32;
            while classes.iter().any(|c| used[c.index()].contains(&slot)) {
                slot += 1;
            }
            for c in classes {
                used[c.index()].insert(slot);
                let needed = slot as usize + 1;
                if vector_len[c.index()] < needed {
                    vector_len[c.index()] = needed;
                }
            }
            method_slots.push(slot);
        }
        slots.push(method_slots);
    }

    SlotAssignment { slots, vector_len }
}
