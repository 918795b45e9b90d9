//! Statistics and packing throughput over horizontal slices of increasing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ncpack_core::packing::{pack, ADD_OFFSET, FILL_VALUE, SCALE_FACTOR};
use ncpack_core::{ArrayData, Attributes, DataType};
use ncpack_quant::{Distribution, PackedDescriptor};

const SIZES: &[usize] = &[90 * 180, 360 * 720, 4 * 360 * 720];

fn field(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 7919) % 1000) as f64 * 0.05).collect()
}

fn bench_distribution(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribution");
    for &n in SIZES {
        let values = field(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, v| {
            b.iter(|| Distribution::of(black_box(v)))
        });
    }
    group.finish();
}

fn bench_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack_u16");
    for &n in SIZES {
        let values = field(n);
        let desc = PackedDescriptor::derive(&Distribution::of(&values), &[n], 1000.0);
        let mut attrs = Attributes::new();
        attrs.set(FILL_VALUE, ArrayData::U16(vec![u16::MAX]));
        attrs.set(SCALE_FACTOR, desc.scale_factor);
        attrs.set(ADD_OFFSET, desc.add_offset);

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, v| {
            b.iter(|| pack(black_box(&attrs), DataType::U16, black_box(v)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_distribution, bench_pack);
criterion_main!(benches);
