//! Dispatch-table compilation.
//!
//! `compile` consumes a [`Registry`](crate::Registry) and produces
//! immutable [`DispatchTables`]: the hierarchy closure, one dispatch
//! vector per class, and per-method tables with every argument-class
//! combination resolved ahead of time. After this point a call performs
//! no search; it reads one slot per argument and, for multi-parameter
//! methods, one cell of a dense table.

mod slots;
mod specificity;

pub use specificity::AmbiguityPolicy;

use std::fmt;
use std::sync::Arc;

use crate::class_graph::{ClassGraph, ClassId};
use crate::dispatch::{CompiledMethod, DispatchTables, DispatchVector, SlotEntry};
use crate::error::DispatchError;
use crate::registry::{MethodDecl, Overrider, Registry};
use crate::store::VptrStore;

use specificity::Resolution;

/// Statistics from one compilation, for startup diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileReport {
    pub classes: usize,
    pub methods: usize,
    pub overriders: usize,
    /// Resolved table cells across all methods.
    pub cells: usize,
    /// Cells that remained ambiguous after covariant-return narrowing.
    /// Under the pick-any policy these cells are callable but still
    /// counted here.
    pub ambiguous: usize,
}

impl fmt::Display for CompileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} classes, {} methods, {} overriders, {} cells ({} ambiguous)",
            self.classes, self.methods, self.overriders, self.cells, self.ambiguous
        )
    }
}

/// Validate every overrider against the compiled hierarchy.
fn check_overriders(
    graph: &ClassGraph,
    methods: &[MethodDecl],
    overriders: &[Vec<Overrider>],
) -> Result<(), DispatchError> {
    for (decl, method_overriders) in methods.iter().zip(overriders) {
        if decl.params.is_empty() {
            return Err(DispatchError::InvalidOverrider {
                method: decl.name.clone(),
                detail: "method has no virtual parameters".to_string(),
            });
        }
        for ov in method_overriders {
            for (pos, (&param, &declared)) in ov.params.iter().zip(&decl.params).enumerate() {
                if !graph.derives_from(param, declared) {
                    return Err(DispatchError::InvalidOverrider {
                        method: decl.name.clone(),
                        detail: format!(
                            "parameter {pos}: `{}` does not derive from declared `{}`",
                            graph.name(param),
                            graph.name(declared)
                        ),
                    });
                }
            }
            if let (Some(ret), Some(declared)) = (ov.ret, decl.ret) {
                if !graph.derives_from(ret, declared) {
                    return Err(DispatchError::InvalidOverrider {
                        method: decl.name.clone(),
                        detail: format!(
                            "return `{}` is not covariant with declared `{}`",
                            graph.name(ret),
                            graph.name(declared)
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Classes that can appear at each virtual position: the declared class
/// and its descendants, in registration order.
fn collect_participants(graph: &ClassGraph, methods: &[MethodDecl]) -> Vec<Vec<Vec<ClassId>>> {
    methods
        .iter()
        .map(|decl| {
            decl.params
                .iter()
                .map(|&declared| {
                    graph
                        .ids()
                        .filter(|&c| graph.derives_from(c, declared))
                        .collect()
                })
                .collect()
        })
        .collect()
}

pub(crate) fn compile<S: VptrStore>(
    registry: Registry,
) -> Result<(DispatchTables<S>, CompileReport), DispatchError> {
    let Registry {
        mut graph,
        methods,
        overriders,
        policy,
    } = registry;

    graph.compile_hierarchy()?;
    check_overriders(&graph, &methods, &overriders)?;

    let participants = collect_participants(&graph, &methods);
    let assignment = slots::assign(&participants, graph.len());

    let mut vectors: Vec<Vec<SlotEntry>> = assignment
        .vector_len
        .iter()
        .map(|&len| vec![SlotEntry::NotApplicable; len])
        .collect();

    let mut report = CompileReport {
        classes: graph.len(),
        methods: methods.len(),
        overriders: overriders.iter().map(Vec::len).sum(),
        cells: 0,
        ambiguous: 0,
    };

    let mut compiled = Vec::with_capacity(methods.len());
    for (m, decl) in methods.iter().enumerate() {
        let method_overriders = &overriders[m];
        let method_slots = &assignment.slots[m];
        let arity = decl.params.len();

        let resolve = |tuple: &[ClassId], report: &mut CompileReport| {
            let (res, ambiguous) =
                specificity::resolve_tuple(&graph, method_overriders, tuple, policy);
            report.cells += 1;
            if ambiguous {
                report.ambiguous += 1;
                tracing::warn!(
                    method = %decl.name,
                    classes = %describe(&graph, tuple),
                    "ambiguous argument combination"
                );
            }
            match res {
                Resolution::Selected(i) => SlotEntry::Exec(method_overriders[i].entry),
                Resolution::NoMatch => SlotEntry::NotApplicable,
                Resolution::Ambiguous => SlotEntry::Ambiguous,
            }
        };

        if arity == 1 {
            // Single dispatch: the entry point lives directly in the
            // class's vector.
            for &class in &participants[m][0] {
                let entry = resolve(&[class], &mut report);
                vectors[class.index()][method_slots[0] as usize] = entry;
            }
            compiled.push(CompiledMethod {
                name: decl.name.clone(),
                declared: decl.params.clone(),
                slots: method_slots.clone(),
                strides: Vec::new(),
                table: Box::default(),
            });
        } else {
            // Multi dispatch: each class's slot holds its group index on
            // that axis; the combination resolves through a dense
            // row-major table.
            let dims: Vec<usize> = participants[m].iter().map(Vec::len).collect();
            for (pos, classes) in participants[m].iter().enumerate() {
                for (group, &class) in classes.iter().enumerate() {
                    vectors[class.index()][method_slots[pos] as usize] =
                        SlotEntry::Group(group as u32);
                }
            }

            let mut strides = vec![1usize; arity];
            for pos in (0..arity - 1).rev() {
                strides[pos] = strides[pos + 1] * dims[pos + 1];
            }

            let total: usize = dims.iter().product();
            let mut table = vec![SlotEntry::NotApplicable; total];
            let mut index = vec![0usize; arity];
            for cell in table.iter_mut() {
                let tuple: Vec<ClassId> = index
                    .iter()
                    .zip(&participants[m])
                    .map(|(&i, classes)| classes[i])
                    .collect();
                *cell = resolve(&tuple, &mut report);

                // Odometer increment over the participant grid.
                for pos in (0..arity).rev() {
                    index[pos] += 1;
                    if index[pos] < dims[pos] {
                        break;
                    }
                    index[pos] = 0;
                }
            }

            compiled.push(CompiledMethod {
                name: decl.name.clone(),
                declared: decl.params.clone(),
                slots: method_slots.clone(),
                strides,
                table: table.into_boxed_slice(),
            });
        }
    }

    let vectors: Vec<Arc<DispatchVector>> = graph
        .ids()
        .zip(vectors)
        .map(|(class, slots)| Arc::new(DispatchVector::new(class, slots.into_boxed_slice())))
        .collect();

    let mut store = S::default();
    for (class, vector) in graph.ids().zip(&vectors) {
        store.store(graph.key(class), Arc::clone(vector));
    }

    tracing::debug!(report = %report, "dispatch tables compiled");
    Ok((DispatchTables::new(graph, compiled, vectors, store), report))
}

fn describe(graph: &ClassGraph, tuple: &[ClassId]) -> String {
    tuple
        .iter()
        .map(|&c| graph.name(c))
        .collect::<Vec<_>>()
        .join(", ")
}
