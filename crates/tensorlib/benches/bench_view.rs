use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tensorlib::Tensor3;

fn sample_tensor() -> Tensor3<u8> {
    Tensor3::from_shape_val([256, 256, 3], 0_u8).expect("valid shape")
}

fn bench_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("View");

    let tensor = sample_tensor();

    group.bench_function("chained_at", |b| {
        b.iter(|| {
            let t = black_box(&tensor);
            let mut acc = 0u32;
            for i in 0..t.outer_extent() {
                let row = t.at(i);
                for j in 0..row.outer_extent() {
                    acc += u32::from(*row.at(j).at(1));
                }
            }
            acc
        })
    });

    group.bench_function("multi_index", |b| {
        b.iter(|| {
            let t = black_box(&tensor);
            let mut acc = 0u32;
            for i in 0..256 {
                for j in 0..256 {
                    acc += u32::from(t[[i, j, 1]]);
                }
            }
            acc
        })
    });

    group.bench_function("swap_outer", |b| {
        b.iter_batched(
            sample_tensor,
            |mut t| {
                for i in 0..128 {
                    t.swap_outer(i, 255 - i).expect("indices in range");
                }
                t
            },
            criterion::BatchSize::LargeInput,
        )
    });

    group.bench_function("clone", |b| b.iter(|| black_box(&tensor).clone()));

    group.finish();
}

criterion_group!(benches, bench_view);
criterion_main!(benches);
