use criterion::{Criterion, black_box, criterion_group, criterion_main};
use uq_core::{CharClasses, derive_password};

fn bench_derive(c: &mut Criterion) {
    let none = CharClasses::empty();
    let symbols = CharClasses::SYMBOL;

    c.bench_function("derive_full", |b| {
        b.iter(|| derive_password(black_box("correct horse"), black_box("example.com"), None, none))
    });

    c.bench_function("derive_filtered_truncated", |b| {
        b.iter(|| {
            derive_password(
                black_box("correct horse"),
                black_box("example.com"),
                Some(16),
                symbols,
            )
        })
    });
}

criterion_group!(benches, bench_derive);
criterion_main!(benches);
