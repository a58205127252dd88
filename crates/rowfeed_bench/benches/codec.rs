//! Tokenizer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowfeed_bench::{mixed_line, random_field};
use rowfeed_codec::{parse_line, split_raw, RowSplitter};

/// Quoted tokenizer against raw splitting on plain lines.
fn bench_plain(c: &mut Criterion) {
    let mut group = c.benchmark_group("plain");

    for fields in [4usize, 16, 64] {
        let line = (0..fields)
            .map(|_| random_field(8))
            .collect::<Vec<_>>()
            .join(",");
        group.throughput(Throughput::Bytes(line.len() as u64));

        group.bench_with_input(BenchmarkId::new("tokenizer", fields), &line, |b, line| {
            b.iter(|| black_box(parse_line(black_box(line), ',').unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("split_raw", fields), &line, |b, line| {
            b.iter(|| black_box(split_raw(black_box(line), ",")));
        });
    }

    group.finish();
}

/// Lines with quoted fields and embedded delimiters.
fn bench_quoted(c: &mut Criterion) {
    let mut group = c.benchmark_group("quoted");
    let splitter = RowSplitter::new(",", true).unwrap();

    for fields in [4usize, 16, 64] {
        let line = mixed_line(fields, 8);
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fields), &line, |b, line| {
            b.iter(|| black_box(splitter.split(black_box(line)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plain, bench_quoted);

criterion_main!(benches);
