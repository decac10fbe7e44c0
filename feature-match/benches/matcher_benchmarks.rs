use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feature_core::DescriptorMatrix;
use feature_match::{LshIndex, LshParams, Matcher, MatcherConfig};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Random rows plus a perturbed copy of each, as query/train sets
fn create_descriptor_sets(rows: usize, bytes: usize) -> (DescriptorMatrix, DescriptorMatrix) {
    let mut rng = StdRng::seed_from_u64(rows as u64);
    let train: Vec<Vec<u8>> = (0..rows).map(|_| (0..bytes).map(|_| rng.gen()).collect()).collect();
    let query: Vec<Vec<u8>> = train
        .iter()
        .map(|row| {
            let mut noisy = row.clone();
            for _ in 0..6 {
                let bit = rng.gen_range(0..bytes * 8);
                noisy[bit / 8] ^= 1 << (bit % 8);
            }
            noisy
        })
        .collect();
    (
        DescriptorMatrix::from_binary_rows(bytes, &query),
        DescriptorMatrix::from_binary_rows(bytes, &train),
    )
}

fn bench_match_descriptors(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_descriptors");
    let matcher = Matcher::new(MatcherConfig::default()).expect("default config is valid");

    for &rows in &[100usize, 500, 2000] {
        for &bytes in &[32usize, 64] {
            let (query, train) = create_descriptor_sets(rows, bytes);
            group.bench_with_input(
                BenchmarkId::new(format!("{} rows", rows), format!("{} bytes", bytes)),
                &(query, train),
                |b, (query, train)| b.iter(|| black_box(matcher.match_descriptors(black_box(query), black_box(train)))),
            );
        }
    }
    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let (_, train) = create_descriptor_sets(2000, 32);
    let mut group = c.benchmark_group("lsh_index");

    for level in 0..=2 {
        let params = LshParams {
            multi_probe_level: level,
            ..LshParams::default()
        };
        group.bench_function(BenchmarkId::new("build", level), |b| {
            b.iter(|| black_box(LshIndex::build(train.binary_rows().collect(), 32, black_box(&params))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_match_descriptors, bench_index_build);
criterion_main!(benches);
