use std::any::Any;

use criterion::{criterion_group, criterion_main, Criterion};

use multimethods::{
    Dispatchable, DispatchTables, MapStore, MethodId, Registry, TypeKey, VirtualRef,
};

struct Animal;
struct Cat;
struct Dog;

macro_rules! dispatchable {
    ($ty:ty) => {
        impl Dispatchable for $ty {
            fn type_key(&self) -> TypeKey {
                TypeKey::of::<$ty>()
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

dispatchable!(Animal);
dispatchable!(Cat);
dispatchable!(Dog);

fn noise(_: &[&dyn Dispatchable]) -> Box<dyn Any> {
    Box::new(0u32)
}

fn setup() -> (DispatchTables<MapStore>, MethodId, MethodId) {
    let mut registry = Registry::new();
    let animal = registry.register_type::<Animal>("Animal", &[]).unwrap();
    let cat = registry
        .register_type::<Cat>("Cat", &[TypeKey::of::<Animal>()])
        .unwrap();
    let dog = registry
        .register_type::<Dog>("Dog", &[TypeKey::of::<Animal>()])
        .unwrap();

    let poke = registry.declare_method("poke", &[animal], None);
    registry.add_overrider(poke, &[animal], None, noise).unwrap();
    registry.add_overrider(poke, &[cat], None, noise).unwrap();
    registry.add_overrider(poke, &[dog], None, noise).unwrap();

    let meet = registry.declare_method("meet", &[animal, animal], None);
    registry
        .add_overrider(meet, &[animal, animal], None, noise)
        .unwrap();
    registry.add_overrider(meet, &[cat, dog], None, noise).unwrap();
    registry.add_overrider(meet, &[dog, cat], None, noise).unwrap();

    let (tables, _) = registry.compile().unwrap();
    (tables, poke, meet)
}

fn bench_dispatch(c: &mut Criterion) {
    let (tables, poke, meet) = setup();
    let cat = Cat;
    let dog = Dog;

    c.bench_function("dispatch/unary", |b| {
        b.iter(|| tables.dispatch(poke, &[&cat]).unwrap())
    });

    c.bench_function("dispatch/binary", |b| {
        b.iter(|| tables.dispatch(meet, &[&cat, &dog]).unwrap())
    });

    c.bench_function("select/unary", |b| {
        let key = cat.type_key();
        b.iter(|| tables.select(poke, &[key]).unwrap())
    });

    let handle = VirtualRef::bind(&tables, &cat).unwrap();
    c.bench_function("dispatch/cached_handle", |b| {
        b.iter(|| handle.call(meet, &[&dog]).unwrap())
    });
}

fn bench_compile(c: &mut Criterion) {
    c.bench_function("compile/small_hierarchy", |b| b.iter(setup));
}

criterion_group!(benches, bench_dispatch, bench_compile);
criterion_main!(benches);
