use ark_ec::pairing::Pairing;
use predicate_encryption::{
    attributes::{attribute_set, Attribute, CiphertextIndex, KeyIndex},
    decryption::DecryptionKey,
    distributed::{partial_decaps, split_decryption_key, DistributionConfig},
    encryption::{CipherText, PlainText},
    hybrid,
    kem::{Blake2bKdf, PredicateKem, SymmetricKeyPredicateKem},
    policy::AccessPolicy,
    repr::{Representable, Representation, Restore},
    scheme::PredicateScheme,
    setup::{PublicParameters, SchemeId, SetupConfig},
    PredEncError,
};

type E = ark_bls12_381::Bls12_381;
type Fr = <E as Pairing>::ScalarField;

fn assert_stable<T>(value: &T, pp: &PublicParameters<E>)
where
    T: Representable + Restore<E> + PartialEq + std::fmt::Debug,
{
    let bytes = value.to_bytes().unwrap();
    let restored = <T as Restore<E>>::from_bytes(&bytes, pp).unwrap();
    assert_eq!(&restored, value);
    assert_eq!(restored.to_bytes().unwrap(), bytes);
}

fn policy() -> AccessPolicy<Fr> {
    AccessPolicy::gate(
        2,
        vec![
            AccessPolicy::leaf(Attribute::from_label("A")),
            AccessPolicy::leaf(Attribute::from_label("B")),
            AccessPolicy::any_of(vec![
                AccessPolicy::leaf(Attribute::from_label("C")),
                AccessPolicy::leaf(Attribute::from_label("D")),
            ])
            .unwrap(),
        ],
    )
    .unwrap()
}

#[test]
fn test_every_object_is_stable_under_reserialization() {
    let mut rng = ark_std::test_rng();
    let attributes = attribute_set::<Fr>(&["A", "B", "C"]);
    let carol = Attribute::from_identity(b"carol");

    let cases = [
        (
            SchemeId::Identity,
            SetupConfig::with_universe(4),
            KeyIndex::Identity(carol),
            CiphertextIndex::Identity(carol),
        ),
        (
            SchemeId::Fuzzy,
            SetupConfig::new(4, 2),
            KeyIndex::Attributes(attributes.clone()),
            CiphertextIndex::Attributes(attribute_set(&["B", "C", "D"])),
        ),
        (
            SchemeId::KeyPolicy,
            SetupConfig::with_universe(4),
            KeyIndex::Policy(policy()),
            CiphertextIndex::Attributes(attributes.clone()),
        ),
        (
            SchemeId::CiphertextPolicy,
            SetupConfig::with_universe(4),
            KeyIndex::Attributes(attributes.clone()),
            CiphertextIndex::Policy(policy()),
        ),
    ];

    for (scheme, config, key_index, ct_index) in cases {
        let (pe, msk) = PredicateScheme::<E>::setup(scheme, &config, &mut rng).unwrap();
        let pp = pe.public_parameters();

        let pp_bytes = pp.to_bytes().unwrap();
        let restored_pp = PublicParameters::<E>::from_bytes(&pp_bytes).unwrap();
        assert_eq!(restored_pp.to_bytes().unwrap(), pp_bytes);

        assert_stable(&msk, pp);
        assert_stable(&key_index, pp);
        assert_stable(&ct_index, pp);

        let dk = pe.generate_decryption_key(&msk, &key_index, &mut rng).unwrap();
        let ek = pe.generate_encryption_key(&ct_index).unwrap();
        assert_stable(&dk, pp);
        assert_stable(&ek, pp);

        let m = PlainText::random(&mut rng);
        let ct = pe.encrypt(&m, &ek, &mut rng).unwrap();
        assert_stable(&m, pp);
        assert_stable(&ct, pp);

        let (_, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
        assert_stable(&encapsulated, pp);

        let shares = split_decryption_key(&dk, &DistributionConfig::new(3, 2), &mut rng).unwrap();
        assert_stable(&shares[1], pp);
        assert_stable(&partial_decaps(&pe, &encapsulated, &shares[2]).unwrap(), pp);

        let kem = SymmetricKeyPredicateKem::new(pe.clone(), Blake2bKdf::default());
        let sealed = hybrid::encrypt::<E, _, _>(&kem, &ek, b"stable", &mut rng).unwrap();
        assert_stable(&sealed, pp);

        let restored_ct = <CipherText<E> as Restore<E>>::from_bytes(&ct.to_bytes().unwrap(), &restored_pp).unwrap();
        assert_eq!(pe.decrypt(&restored_ct, &dk).unwrap(), m, "{}", scheme.as_str());
    }

    assert_stable(&policy(), &{
        let (pe, _) = PredicateScheme::<E>::setup(SchemeId::KeyPolicy, &SetupConfig::with_universe(4), &mut rng).unwrap();
        pe.public_parameters().clone()
    });
}

#[test]
fn test_restored_key_decrypts_after_transport() {
    let mut rng = ark_std::test_rng();
    let (pe, msk) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap();

    let pp = PublicParameters::<E>::from_bytes(&pe.public_parameters().to_bytes().unwrap()).unwrap();
    let receiver = PredicateScheme::new(pp);

    let dk = pe
        .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
        .unwrap();
    let dk_bytes = dk.to_bytes().unwrap();

    let ek = receiver
        .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
        .unwrap();
    let (material, encapsulated) = receiver.encaps(&ek, &mut rng).unwrap();

    let restored = <DecryptionKey<E> as Restore<E>>::from_bytes(&dk_bytes, receiver.public_parameters()).unwrap();
    assert_eq!(pe.decaps(&encapsulated, &restored).unwrap(), material);
}

#[test]
fn test_garbage_is_a_format_error() {
    let mut rng = ark_std::test_rng();
    let (pe, _) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(4, 2), &mut rng).unwrap();
    let pp = pe.public_parameters();

    let result = <DecryptionKey<E> as Restore<E>>::from_bytes(&[0xde, 0xad], pp);
    assert!(matches!(result, Err(PredEncError::SerializationFormat(_))));

    let wrong_shape = Representation::List(vec![Representation::Int(1)]);
    let result = <PlainText<E> as Restore<E>>::from_repr(&wrong_shape, pp);
    assert!(matches!(result, Err(PredEncError::SerializationFormat(_))));
}
