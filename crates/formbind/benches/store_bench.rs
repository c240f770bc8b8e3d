//! Microbenchmarks for store mutation and binding projection.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use formbind::{FieldBinding, create_form};

const FIELD_COUNT: usize = 64;

fn field_names() -> Vec<String> {
    (0..FIELD_COUNT).map(|i| format!("field{i}")).collect()
}

fn bench_set_value(c: &mut Criterion) {
    let names = field_names();
    let (store, _control) = create_form(names.iter().map(|n| (n.clone(), 0i64)));

    let mut i = 0usize;
    c.bench_function("set_value/64_fields", |b| {
        b.iter(|| {
            let name = &names[i % FIELD_COUNT];
            store.set_value(black_box(name), black_box(i as i64));
            i += 1;
        });
    });
}

fn bench_view(c: &mut Criterion) {
    let names = field_names();
    let (_store, control) = create_form(names.iter().map(|n| (n.clone(), 0i64)));
    let binding = FieldBinding::new(&control, &names[0]);

    c.bench_function("view/64_fields", |b| {
        b.iter(|| black_box(binding.view()));
    });
}

fn bench_notify(c: &mut Criterion) {
    let names = field_names();
    let (store, _control) = create_form(names.iter().map(|n| (n.clone(), 0i64)));
    let subs: Vec<_> = (0..16).map(|_| store.subscribe(|snap| {
        black_box(snap.version);
    })).collect();

    c.bench_function("set_value/16_subscribers", |b| {
        b.iter(|| store.set_value(black_box("field0"), black_box(1)));
    });
    drop(subs);
}

criterion_group!(benches, bench_set_value, bench_view, bench_notify);
criterion_main!(benches);
