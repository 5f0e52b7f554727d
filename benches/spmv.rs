//! Benchmark for the iterated product on a single rank

use criterion::{criterion_group, criterion_main, Criterion};
use num_complex::Complex64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use qwalk::{
    reconcile_communications, sort_csr, spmv_series, CsrMatrix, DistCsrMatrix, PartitionTable,
    SeriesCache, SingleComm,
};

fn random_matrix(n: usize, nnz_per_row: usize, seed: u64) -> CsrMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut entries = Vec::with_capacity(n * nnz_per_row);
    for row in 0..n {
        for _ in 0..nnz_per_row {
            entries.push((
                row,
                rng.gen_range(0..n),
                Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)),
            ));
        }
    }
    CsrMatrix::from_triplets(n, n, &entries)
}

fn bench_spmv_series(criterion: &mut Criterion) {
    let n = 4096;
    let comm = SingleComm;
    let table = PartitionTable::new(n, 1);
    let global = random_matrix(n, 16, 1);
    let mut a = DistCsrMatrix::from_global(&global, &table, 0);
    sort_csr(&mut a);
    reconcile_communications(&mut a, &table, &comm).unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let u: Vec<Complex64> = (0..n)
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let mut v = vec![Complex64::new(0.0, 0.0); n];
    let mut cache = SeriesCache::new();

    criterion.bench_function("spmv_series 4096x16", |bencher| {
        bencher.iter(|| {
            spmv_series(&a, &u, &table, 1, 1, 1, &mut v, &mut cache, &comm).unwrap();
        });
    });
}

criterion_group!(benches, bench_spmv_series);
criterion_main!(benches);
