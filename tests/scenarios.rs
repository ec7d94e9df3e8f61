use ark_ec::pairing::Pairing;
use predicate_encryption::{
    attributes::{attribute_set, Attribute, CiphertextIndex, KeyIndex},
    distributed::{combine, combine_key_material, partial_decaps, split_decryption_key, DistributionConfig},
    encryption::PlainText,
    hybrid,
    kem::{Blake2bKdf, KeyDerivationFunction, PredicateKem, SymmetricKeyPredicateKem},
    policy::AccessPolicy,
    scheme::PredicateScheme,
    setup::{SchemeId, SetupConfig},
    PredEncError,
};

type E = ark_bls12_381::Bls12_381;
type Fr = <E as Pairing>::ScalarField;

fn fuzzy_scheme() -> (
    PredicateScheme<E>,
    predicate_encryption::setup::MasterSecret<Fr>,
) {
    let mut rng = ark_std::test_rng();
    PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap()
}

#[test]
fn test_overlap_meeting_threshold_decrypts() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = fuzzy_scheme();

    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
        .unwrap();
    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
        .unwrap();

    let m = PlainText::random(&mut rng);
    let ct = pe.encrypt(&m, &ek, &mut rng).unwrap();
    assert_eq!(pe.decrypt(&ct, &dk).unwrap(), m);
}

#[test]
fn test_overlap_below_threshold_is_unqualified() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = fuzzy_scheme();

    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "D"])), &mut rng)
        .unwrap();
    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
        .unwrap();

    let ct = pe.encrypt(&PlainText::random(&mut rng), &ek, &mut rng).unwrap();
    assert!(matches!(pe.decrypt(&ct, &dk), Err(PredEncError::UnqualifiedKey(_))));

    let (_, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
    assert!(matches!(pe.decaps(&encapsulated, &dk), Err(PredEncError::UnqualifiedKey(_))));
}

#[test]
fn test_any_three_of_five_servers_rebuild_the_key() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = fuzzy_scheme();
    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
        .unwrap();

    let shares = split_decryption_key(&dk, &DistributionConfig::new(5, 3), &mut rng).unwrap();
    let first = combine(&[shares[0].clone(), shares[1].clone(), shares[2].clone()]).unwrap();
    let spread = combine(&[shares[1].clone(), shares[3].clone(), shares[4].clone()]).unwrap();

    assert_eq!(first, spread);
    assert_eq!(first, dk);

    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
        .unwrap();
    let (material, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
    assert_eq!(pe.decaps(&encapsulated, &spread).unwrap(), material);

    let partials: Vec<_> = [0, 2, 4]
        .iter()
        .map(|&i| partial_decaps(&pe, &encapsulated, &shares[i]).unwrap())
        .collect();
    assert_eq!(combine_key_material(&partials).unwrap(), material);

    assert!(matches!(
        combine(&shares[..2]),
        Err(PredEncError::InvalidShareSet(_))
    ));
}

#[test]
fn test_kem_wrapping_derives_from_inner_material() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = fuzzy_scheme();
    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C"])), &mut rng)
        .unwrap();
    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C"])))
        .unwrap();

    let kdf = Blake2bKdf::default();
    let kem = SymmetricKeyPredicateKem::new(pe.clone(), kdf.clone());
    let (key, encapsulated) = PredicateKem::<E>::encaps(&kem, &ek, &mut rng).unwrap();

    let material = pe.decaps(&encapsulated, &dk).unwrap();
    assert_eq!(kdf.derive(&material).unwrap(), key);
    assert_eq!(PredicateKem::<E>::decaps(&kem, &encapsulated, &dk).unwrap(), key);

    let sealed = hybrid::encrypt::<E, _, _>(&kem, &ek, b"payload", &mut rng).unwrap();
    assert_eq!(hybrid::decrypt(&kem, &sealed, &dk).unwrap(), b"payload".to_vec());
}

#[test]
fn test_every_scheme_round_trips_through_the_kem() {
    let mut rng = ark_std::test_rng();
    let policy = AccessPolicy::gate(
        2,
        vec![
            AccessPolicy::leaf(Attribute::from_label("doctor")),
            AccessPolicy::leaf(Attribute::from_label("cardiology")),
            AccessPolicy::any_of(vec![
                AccessPolicy::leaf(Attribute::from_label("senior")),
                AccessPolicy::leaf(Attribute::from_label("on-call")),
            ])
            .unwrap(),
        ],
    )
    .unwrap();
    let holder = attribute_set::<Fr>(&["doctor", "on-call"]);
    let outsider = attribute_set::<Fr>(&["nurse", "on-call"]);
    let bob = Attribute::from_identity(b"bob");

    let cases = [
        (
            SchemeId::Identity,
            KeyIndex::Identity(bob),
            KeyIndex::Identity(Attribute::from_identity(b"eve")),
            CiphertextIndex::Identity(bob),
        ),
        (
            SchemeId::KeyPolicy,
            KeyIndex::Policy(policy.clone()),
            KeyIndex::Policy(AccessPolicy::leaf(Attribute::from_label("nurse"))),
            CiphertextIndex::Attributes(holder.clone()),
        ),
        (
            SchemeId::CiphertextPolicy,
            KeyIndex::Attributes(holder.clone()),
            KeyIndex::Attributes(outsider),
            CiphertextIndex::Policy(policy.clone()),
        ),
    ];

    for (scheme, qualified, unqualified, ct_index) in cases {
        let (pe, msk) = PredicateScheme::<E>::setup(scheme, &SetupConfig::with_universe(4), &mut rng).unwrap();
        let ek = pe.generate_encryption_key(&ct_index).unwrap();
        let (material, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();

        let dk = pe.generate_decryption_key(&msk, &qualified, &mut rng).unwrap();
        assert_eq!(pe.decaps(&encapsulated, &dk).unwrap(), material, "{}", scheme.as_str());

        let other = pe.generate_decryption_key(&msk, &unqualified, &mut rng).unwrap();
        assert!(
            matches!(pe.decaps(&encapsulated, &other), Err(PredEncError::UnqualifiedKey(_))),
            "{}",
            scheme.as_str()
        );
    }
}

#[test]
fn test_larger_overlap_yields_same_material() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = fuzzy_scheme();
    let ek = pe
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D", "E", "F"])))
        .unwrap();
    let (material, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();

    for labels in [
        vec!["A", "B", "C"],
        vec!["D", "E", "F"],
        vec!["A", "C", "E", "F"],
        vec!["A", "B", "C", "D", "E", "F"],
    ] {
        let dk = pe
            .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&labels)), &mut rng)
            .unwrap();
        assert_eq!(pe.decaps(&encapsulated, &dk).unwrap(), material, "{:?}", labels);
    }
}
