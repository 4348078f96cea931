use criterion::{black_box, criterion_group, criterion_main, Criterion};

use dbbact::{FdrMethod, Matrix, PermutationTest, Transform};

/// terms x sequences matrix where every 10th term is higher in the foreground
fn matrix(n_terms: usize, n_fg: usize, n_bg: usize) -> (Matrix<f64>, Vec<bool>) {
    let cols = n_fg + n_bg;
    let mut data = Vec::with_capacity(n_terms * cols);
    for term in 0..n_terms {
        for col in 0..cols {
            let base = ((term * 7 + col * 13) % 5) as f64;
            let shift = if term % 10 == 0 && col < n_fg { 3.0 } else { 0.0 };
            data.push(base + shift);
        }
    }
    let labels = (0..cols).map(|col| col < n_fg).collect();
    (Matrix::from_vec(n_terms, cols, data).unwrap(), labels)
}

fn permutation_benchmark(c: &mut Criterion) {
    let (m, labels) = matrix(500, 40, 60);

    c.bench_function("dsfdr 500 terms", |b| {
        let test = PermutationTest::default();
        b.iter(|| test.run(black_box(&m), black_box(&labels)).unwrap())
    });

    c.bench_function("dsfdr 500 terms rank", |b| {
        let test = PermutationTest::default().transform(Transform::Rank);
        b.iter(|| test.run(black_box(&m), black_box(&labels)).unwrap())
    });

    c.bench_function("grouped bh 500 terms", |b| {
        let test = PermutationTest::default().fdr_method(FdrMethod::GroupedBh);
        b.iter(|| test.run(black_box(&m), black_box(&labels)).unwrap())
    });
}

criterion_group!(dsfdr, permutation_benchmark);
criterion_main!(dsfdr);
