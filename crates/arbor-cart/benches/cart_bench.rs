//! Criterion benchmarks for arbor-cart: tree growth, split search, and prediction.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use arbor_cart::{Dataset, FeatureSpec, TreeConfig, Value, best_categorical_split};

fn make_classification(n_samples: usize, n_continuous: usize, n_classes: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let categories = ["a", "b", "c", "d", "e", "f", "g", "h"];
    let mut rows = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let class = i % n_classes;
        labels.push(format!("class{class}"));
        let mut row: Vec<Value> = (0..n_continuous)
            .map(|f| {
                let base = if f < 3 { class as f64 * 3.0 } else { 0.0 };
                Value::from(base + rng.r#gen::<f64>() * 0.5)
            })
            .collect();
        row.push(Value::from(categories[rng.gen_range(0..categories.len())]));
        rows.push(row);
    }
    let mut features: Vec<FeatureSpec> = (0..n_continuous)
        .map(|f| FeatureSpec::continuous(format!("f{f}")))
        .collect();
    features.push(FeatureSpec::categorical("tag"));
    Dataset::new(rows, &labels, features).unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let dataset = make_classification(1000, 20, 5, 42);
    let cfg = TreeConfig::new().with_max_depth(6).with_min_samples_leaf(5);

    c.bench_function("cart_fit_1000x21_5class_depth6", |b| {
        b.iter(|| cfg.fit(&dataset).unwrap());
    });
}

fn bench_predict_batch(c: &mut Criterion) {
    let dataset = make_classification(1000, 20, 5, 42);
    let tree = TreeConfig::new()
        .with_max_depth(6)
        .with_min_samples_leaf(5)
        .fit(&dataset)
        .unwrap();

    c.bench_function("cart_predict_batch_1000", |b| {
        b.iter(|| tree.predict(dataset.rows()).unwrap());
    });
}

fn bench_categorical_search(c: &mut Criterion) {
    // 12 categories: 2^11 - 1 bipartitions per call.
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let values: Vec<String> = (0..2000).map(|_| format!("cat{}", rng.gen_range(0..12))).collect();
    let labels: Vec<usize> = (0..2000).map(|_| rng.gen_range(0..3)).collect();

    c.bench_function("cart_categorical_split_12cats_2000", |b| {
        b.iter(|| best_categorical_split(&values, &labels, 3, arbor_cart::Criterion::Gini, 1));
    });
}

criterion_group!(benches, bench_fit, bench_predict_batch, bench_categorical_search);
criterion_main!(benches);
