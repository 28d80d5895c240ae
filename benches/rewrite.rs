#![allow(unused)]
extern crate dotweave;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dotweave::prelude::*;
use std::hint::black_box;

/// Build a module with `roots` tracking roots, each owning a derived class and a
/// referenced, unmarked class
fn synthetic_module(roots: usize) -> Module {
    let mut module = Module::new("Bench");
    for i in 0..roots {
        let account = TypeBuilder::class("Bench", &format!("Account{i}"))
            .auto_property("Code", corlib::string())
            .auto_property("Balance", corlib::system("Decimal"))
            .build(&mut module)
            .unwrap();
        let account = module.type_ref(account).unwrap();

        let entity = TypeBuilder::class("Bench", &format!("Entity{i}"))
            .abstract_type()
            .track_changes()
            .auto_property("Id", corlib::guid())
            .auto_property("Account", account)
            .build(&mut module)
            .unwrap();
        let entity = module.type_ref(entity).unwrap();

        TypeBuilder::class("Bench", &format!("Document{i}"))
            .extends(entity)
            .auto_property("Number", corlib::string())
            .auto_property("Pages", corlib::int32())
            .build(&mut module)
            .unwrap();
    }
    module
}

/// Benchmark a full rewrite of freshly built modules of increasing size
fn bench_rewrite(c: &mut Criterion) {
    let rewriter = ChangeTrackingRewriter::new(RewriteConfig::default()).unwrap();

    let mut group = c.benchmark_group("rewrite");
    for roots in [10, 100, 1000] {
        let module = synthetic_module(roots);
        group.throughput(Throughput::Elements(module.types.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(roots), &module, |b, module| {
            b.iter_batched(
                || module.clone(),
                |mut module| {
                    let report = rewriter.rewrite(black_box(&mut module)).unwrap();
                    black_box(report)
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();

    // A second run only finds markers
    let mut woven = synthetic_module(1000);
    rewriter.rewrite(&mut woven).unwrap();
    c.bench_function("rewrite_already_woven", |b| {
        b.iter_batched(
            || woven.clone(),
            |mut module| black_box(rewriter.rewrite(&mut module).unwrap()),
            criterion::BatchSize::LargeInput,
        );
    });
}

/// Benchmark setter dispatch through an instrumented property
fn bench_instrumented_setter(c: &mut Criterion) {
    let mut module = synthetic_module(1);
    ChangeTrackingRewriter::new(RewriteConfig::default())
        .unwrap()
        .rewrite(&mut module)
        .unwrap();

    let mut emulator = Emulator::new().unwrap();
    emulator.load(module);
    let document = emulator
        .create_instance("Bench", "Bench.Document0", &[])
        .unwrap();

    let mut pages = 0;
    c.bench_function("instrumented_setter", |b| {
        b.iter(|| {
            pages += 1;
            emulator
                .set_property(document, "Pages", EmValue::I32(black_box(pages)))
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_rewrite, bench_instrumented_setter);
criterion_main!(benches);
