//! Registration order must not affect compiled resolution.
//!
//! Classes may be registered before their bases and overriders in any
//! order; the compiled tables depend only on the declared hierarchy and
//! overrider set.

use std::any::Any;
use std::collections::HashMap;

use proptest::prelude::*;

use multimethods::{
    ClassGraph, Dispatchable, DispatchTables, MapStore, MethodId, Registry, TypeKey,
};

struct Tagged {
    key: TypeKey,
}

impl Dispatchable for Tagged {
    fn type_key(&self) -> TypeKey {
        self.key
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

const ANIMAL: u64 = 1;
const MAMMAL: u64 = 2;
const CARNIVORE: u64 = 3;
const DOG: u64 = 4;
const CAT: u64 = 5;
const BULLDOG: u64 = 6;

const CLASSES: &[(u64, &str, &[u64])] = &[
    (ANIMAL, "Animal", &[]),
    (MAMMAL, "Mammal", &[ANIMAL]),
    (CARNIVORE, "Carnivore", &[ANIMAL]),
    (DOG, "Dog", &[MAMMAL, CARNIVORE]),
    (CAT, "Cat", &[MAMMAL]),
    (BULLDOG, "Bulldog", &[DOG]),
];

fn poke_animal(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("animal")
}
fn poke_dog(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("dog")
}
fn poke_cat(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("cat")
}
fn meet_base(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("sniff")
}
fn meet_cat_dog(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("flee")
}
fn meet_dog_cat(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new("chase")
}

fn build(
    class_order: &[usize],
    overrider_order: &[usize],
) -> (DispatchTables<MapStore>, MethodId, MethodId) {
    let mut registry = Registry::new();
    let mut ids = HashMap::new();
    for &i in class_order {
        let (key, name, bases) = CLASSES[i];
        let base_keys: Vec<TypeKey> = bases.iter().map(|&b| TypeKey::from_raw(b)).collect();
        let id = registry
            .register_class(TypeKey::from_raw(key), name, &base_keys)
            .unwrap();
        ids.insert(key, id);
    }
    let id = |key: u64| ids[&key];

    let poke = registry.declare_method("poke", &[id(ANIMAL)], None);
    let meet = registry.declare_method("meet", &[id(ANIMAL), id(ANIMAL)], None);

    type Entry = fn(&[&dyn Dispatchable]) -> Box<dyn Any>;
    let poke_overriders: [(u64, Entry); 3] =
        [(ANIMAL, poke_animal), (DOG, poke_dog), (CAT, poke_cat)];
    let meet_overriders: [((u64, u64), Entry); 3] = [
        ((ANIMAL, ANIMAL), meet_base),
        ((CAT, DOG), meet_cat_dog),
        ((DOG, CAT), meet_dog_cat),
    ];
    for &i in overrider_order {
        let (param, entry) = poke_overriders[i];
        registry.add_overrider(poke, &[id(param)], None, entry).unwrap();
        let ((a, b), entry) = meet_overriders[i];
        registry
            .add_overrider(meet, &[id(a), id(b)], None, entry)
            .unwrap();
    }

    let (tables, report) = registry.compile().unwrap();
    assert_eq!(report.ambiguous, 0);
    (tables, poke, meet)
}

fn tag(result: Box<dyn Any>) -> &'static str {
    *result.downcast_ref::<&str>().unwrap()
}

proptest! {
    #[test]
    fn resolution_is_registration_order_independent(
        class_order in Just((0..CLASSES.len()).collect::<Vec<_>>()).prop_shuffle(),
        overrider_order in Just((0..3usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        let (tables, poke, meet) = build(&class_order, &overrider_order);

        let expected = [
            (ANIMAL, "animal"),
            (MAMMAL, "animal"),
            (CARNIVORE, "animal"),
            (DOG, "dog"),
            (CAT, "cat"),
            (BULLDOG, "dog"),
        ];
        for (key, want) in expected {
            let obj = Tagged { key: TypeKey::from_raw(key) };
            let got = tag(tables.dispatch(poke, &[&obj]).unwrap());
            prop_assert_eq!(got, want);
        }

        let pairs = [
            ((CAT, DOG), "flee"),
            ((DOG, CAT), "chase"),
            ((BULLDOG, CAT), "chase"),
            ((CAT, BULLDOG), "flee"),
            ((CAT, CAT), "sniff"),
            ((MAMMAL, CARNIVORE), "sniff"),
        ];
        for ((a, b), want) in pairs {
            let a = Tagged { key: TypeKey::from_raw(a) };
            let b = Tagged { key: TypeKey::from_raw(b) };
            let got = tag(tables.dispatch(meet, &[&a, &b]).unwrap());
            prop_assert_eq!(got, want);
        }
    }

    #[test]
    fn ranks_respect_every_edge_in_random_dags(
        n in 2usize..10,
        raw_edges in prop::collection::vec((any::<u8>(), any::<u8>()), 0..24),
        order in Just((0..10usize).collect::<Vec<_>>()).prop_shuffle(),
    ) {
        // Edges always point from a lower to a higher index, so the
        // relation is a DAG by construction.
        let mut bases: Vec<Vec<u64>> = vec![Vec::new(); n];
        let mut edges = Vec::new();
        for (a, b) in raw_edges {
            let a = a as usize % n;
            let b = b as usize % n;
            if a < b {
                let base = a as u64;
                if !bases[b].contains(&base) {
                    bases[b].push(base);
                    edges.push((a, b));
                }
            }
        }

        let mut graph = ClassGraph::new();
        let mut ids = HashMap::new();
        for &i in order.iter().filter(|&&i| i < n) {
            let base_keys: Vec<TypeKey> =
                bases[i].iter().map(|&b| TypeKey::from_raw(b)).collect();
            let id = graph
                .register(TypeKey::from_raw(i as u64), &format!("C{i}"), &base_keys)
                .unwrap();
            ids.insert(i, id);
        }
        graph.compile_hierarchy().unwrap();

        for &(a, b) in &edges {
            prop_assert!(graph.derives_from(ids[&b], ids[&a]));
            prop_assert!(graph.rank(ids[&b]) > graph.rank(ids[&a]));
        }
        // Transitivity through shared midpoints.
        for &(a, b) in &edges {
            for &(c, d) in &edges {
                if b == c {
                    prop_assert!(graph.derives_from(ids[&d], ids[&a]));
                }
            }
        }
    }
}
