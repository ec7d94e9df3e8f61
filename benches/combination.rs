use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use predicate_encryption::{
    attributes::{attribute_set, CiphertextIndex, KeyIndex},
    distributed::{combine, combine_key_material, partial_decaps, split_decryption_key, DistributionConfig},
    kem::PredicateKem,
    scheme::PredicateScheme,
    setup::{SchemeId, SetupConfig},
};

type E = ark_bls12_381::Bls12_381;

fn bench_combine(c: &mut Criterion) {
    let mut rng = ark_std::test_rng();
    let mut group = c.benchmark_group("combine");

    let (pe, msk) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap();
    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
        .unwrap();
    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
        .unwrap();
    let (_, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();

    for size in 2..=6 {
        let servers = 1 << size;
        let t = servers / 2 + 1;

        let shares = split_decryption_key(&dk, &DistributionConfig::new(servers, t), &mut rng).unwrap();
        let partials: Vec<_> = shares
            .iter()
            .take(t)
            .map(|share| partial_decaps(&pe, &encapsulated, share).unwrap())
            .collect();

        group.bench_with_input(BenchmarkId::new("key_shares", servers), &shares, |b, inp| {
            b.iter(|| combine(inp));
        });
        group.bench_with_input(BenchmarkId::new("key_material", servers), &partials, |b, inp| {
            b.iter(|| combine_key_material(inp));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_combine);
criterion_main!(benches);
