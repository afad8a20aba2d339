//! Overrider selection for one runtime type tuple.
//!
//! The resolution algorithm, per tuple of concrete argument classes:
//!
//! 1. **Filter applicable**: keep overriders whose every parameter is an
//!    ancestor of (or equal to) the corresponding tuple class.
//! 2. **Find maximal**: keep overriders no other applicable overrider is
//!    strictly more specific than. Specificity is a partial order; the
//!    maximal set can have several members.
//! 3. **Narrow by covariant return**: when several overriders are maximal
//!    and one of them has a return class strictly below every other's,
//!    select it. Such combinations are not counted ambiguous.
//! 4. **Policy**: combinations still unresolved are sealed as ambiguous,
//!    or, under the opt-in pick-any policy, filled with the
//!    latest-registered maximal overrider while still being counted in the
//!    compilation report.

use crate::class_graph::{ClassGraph, ClassId};
use crate::registry::Overrider;

/// Ambiguity policy for combinations that covariant-return narrowing
/// cannot resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmbiguityPolicy {
    /// Seal the combination; calling through it is a fatal fault.
    #[default]
    Report,
    /// Pick the latest-registered maximal overrider, deterministically.
    /// The combination still counts as ambiguous in the report. Opt-in:
    /// silent arbitrary selection is a correctness hazard.
    PickAny,
}

/// Outcome for one type tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Index of the selected overrider in registration order.
    Selected(usize),
    /// No applicable overrider.
    NoMatch,
    /// Genuinely ambiguous; sealed.
    Ambiguous,
}

/// An overrider is applicable to `(C1..Cn)` iff each parameter is `Ci` or
/// an ancestor of `Ci`.
pub(crate) fn is_applicable(graph: &ClassGraph, ov: &Overrider, tuple: &[ClassId]) -> bool {
    ov.params
        .iter()
        .zip(tuple)
        .all(|(&param, &class)| graph.derives_from(class, param))
}

/// `a` is more specific than `b` iff every parameter of `a` is equal to or
/// derived from `b`'s, with at least one strictly derived position.
pub(crate) fn is_more_specific(graph: &ClassGraph, a: &Overrider, b: &Overrider) -> bool {
    let mut some_strict = false;
    for (&pa, &pb) in a.params.iter().zip(&b.params) {
        if !graph.derives_from(pa, pb) {
            return false;
        }
        if pa != pb {
            some_strict = true;
        }
    }
    some_strict
}

/// Maximally specific members of `applicable`: those no other applicable
/// overrider is strictly more specific than.
pub(crate) fn maximal_set(
    graph: &ClassGraph,
    overriders: &[Overrider],
    applicable: &[usize],
) -> Vec<usize> {
    applicable
        .iter()
        .copied()
        .filter(|&i| {
            !applicable
                .iter()
                .any(|&j| j != i && is_more_specific(graph, &overriders[j], &overriders[i]))
        })
        .collect()
}

/// Covariant-return narrowing: the unique maximal overrider whose return
/// class is equal to or derived from every other maximal member's return
/// class, when all of them have class-typed returns.
pub(crate) fn narrow_by_return(
    graph: &ClassGraph,
    overriders: &[Overrider],
    maximal: &[usize],
) -> Option<usize> {
    let mut rets = Vec::with_capacity(maximal.len());
    for &i in maximal {
        match overriders[i].ret {
            Some(ret) => rets.push(ret),
            None => return None,
        }
    }

    let mut winner = None;
    for (pos, &ret) in rets.iter().enumerate() {
        if rets.iter().all(|&other| graph.derives_from(ret, other)) {
            if winner.is_some() {
                // Two returns each below all others means equal returns:
                // no unique most-derived.
                return None;
            }
            winner = Some(maximal[pos]);
        }
    }
    winner
}

/// Resolve one type tuple. The second value reports whether the
/// combination counted as ambiguous (pick-any resolved cells still count).
pub(crate) fn resolve_tuple(
    graph: &ClassGraph,
    overriders: &[Overrider],
    tuple: &[ClassId],
    policy: AmbiguityPolicy,
) -> (Resolution, bool) {
    let applicable: Vec<usize> = (0..overriders.len())
        .filter(|&i| is_applicable(graph, &overriders[i], tuple))
        .collect();

    if applicable.is_empty() {
        return (Resolution::NoMatch, false);
    }

    let maximal = maximal_set(graph, overriders, &applicable);
    if maximal.len() == 1 {
        return (Resolution::Selected(maximal[0]), false);
    }

    if let Some(winner) = narrow_by_return(graph, overriders, &maximal) {
        return (Resolution::Selected(winner), false);
    }

    match policy {
        AmbiguityPolicy::Report => (Resolution::Ambiguous, true),
        AmbiguityPolicy::PickAny => match maximal.last() {
            // `maximal` is in registration order; the last entry is the
            // latest-registered candidate.
            Some(&last) => (Resolution::Selected(last), true),
            None => (Resolution::NoMatch, false),
        },
    }
}
