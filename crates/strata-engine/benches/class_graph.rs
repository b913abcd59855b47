use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use strata_engine::{BaseRef, BuildDirector, ClassBlueprint, Value};

fn blueprint(name: &str, members: usize) -> ClassBlueprint {
    let mut blueprint = ClassBlueprint::new(name).virtual_method("tick", |_, _| Ok(Value::Int(0)));
    for i in 0..members {
        blueprint = blueprint.constant(format!("{}_{}", name, i), i as i64);
    }
    blueprint
}

/// One base with `width` direct children
fn wide_graph(width: usize) -> BuildDirector {
    let mut director = BuildDirector::new();
    let base = director.add_class(blueprint("Base", 16), []).unwrap();
    for i in 0..width {
        director
            .add_class(blueprint(&format!("Child{}", i), 4), [BaseRef::from(&base)])
            .unwrap();
    }
    director
}

/// A single inheritance chain `depth` classes long
fn deep_graph(depth: usize) -> BuildDirector {
    let mut director = BuildDirector::new();
    let mut parent = director.add_class(blueprint("Level0", 4), []).unwrap();
    for i in 1..depth {
        parent = director
            .add_class(blueprint(&format!("Level{}", i), 4), [BaseRef::from(&parent)])
            .unwrap();
    }
    director
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in [16usize, 128] {
        group.bench_with_input(BenchmarkId::new("wide", size), &size, |b, &size| {
            b.iter(|| wide_graph(black_box(size)));
        });
        group.bench_with_input(BenchmarkId::new("deep", size), &size, |b, &size| {
            b.iter(|| deep_graph(black_box(size)));
        });
    }

    group.finish();
}

fn bench_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize");

    for size in [16usize, 128] {
        group.bench_with_input(BenchmarkId::new("wide", size), &size, |b, &size| {
            b.iter(|| {
                let mut director = wide_graph(size);
                director.finalize_all().unwrap();
                director
            });
        });
        group.bench_with_input(BenchmarkId::new("deep", size), &size, |b, &size| {
            b.iter(|| {
                let mut director = deep_graph(size);
                director.finalize_all().unwrap();
                director
            });
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut director = deep_graph(64);
    director.finalize_all().unwrap();
    let leaf = director.class("Level63").unwrap().clone();
    let mut instance = leaf.instantiate(&[]).unwrap();

    c.bench_function("dispatch_inherited_virtual", |b| {
        b.iter(|| instance.call(black_box("tick"), &[]).unwrap());
    });
    c.bench_function("dispatch_constant", |b| {
        b.iter(|| instance.call(black_box("Level0_3"), &[]).unwrap());
    });
}

criterion_group!(benches, bench_build, bench_finalize, bench_dispatch);
criterion_main!(benches);
