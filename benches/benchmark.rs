// Query path benchmarks: boolean evaluation, hybrid retrieval, full scans
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use furnix::{query, Catalog, CatalogIndexes, HybridRetriever, Item, Vector};
use rand::prelude::*;

const WORDS: [&str; 12] = [
    "oak", "walnut", "velvet", "linen", "sofa", "chair", "table", "lamp", "round", "modern",
    "rustic", "brass",
];

fn generate_random_vector(rng: &mut StdRng, dim: usize) -> Vector {
    let data: Vec<f32> = (0..dim).map(|_| rng.random_range(-1.0f32..1.0f32)).collect();
    Vector::new(data)
}

fn generate_indexes(size: usize, dim: usize) -> CatalogIndexes {
    let mut rng = StdRng::seed_from_u64(42);
    let items: Vec<Item> = (0..size)
        .map(|i| {
            let words: Vec<&str> = (0..4).map(|_| WORDS[rng.random_range(0..WORDS.len())]).collect();
            Item::new(format!("item{}", i), words.join(" "), generate_random_vector(&mut rng, dim))
        })
        .collect();
    CatalogIndexes::build(Catalog::from_items(items).unwrap()).unwrap()
}

fn benchmark_boolean(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean");
    let indexes = generate_indexes(10_000, 8);

    for q in ["oak", "sofa AND velvet", "(oak OR walnut) AND (sofa OR chair) NOT brass"] {
        group.bench_with_input(BenchmarkId::from_parameter(q), q, |b, q| {
            b.iter(|| query::evaluate(black_box(q), &indexes.terms));
        });
    }

    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [1_000, 10_000, 50_000].iter() {
        let indexes = generate_indexes(*size, 128);
        let mut rng = StdRng::seed_from_u64(7);
        let probe = generate_random_vector(&mut rng, 128);

        group.bench_with_input(BenchmarkId::new("full_scan", size), size, |b, _| {
            b.iter(|| indexes.vectors.search(black_box(&probe), 10).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("hybrid", size), size, |b, _| {
            let retriever = HybridRetriever::new(&indexes);
            b.iter(|| retriever.retrieve(black_box("sofa OR chair"), &probe, 10).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_boolean, benchmark_search);
criterion_main!(benches);
