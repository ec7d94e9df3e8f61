//! Distributed decryption keys
//!
//! A decryption key is split across `n` servers so that any `t` of them can
//! rebuild it (or decapsulate together) while fewer learn nothing. Every group
//! element `X` of the key is masked per server as `X + G · P_X(j)`, where
//! `P_X` is a random polynomial of degree `t - 1` with `P_X(0) = 0` and `G` is
//! the group generator. Decapsulation is linear in the key's group elements,
//! so Lagrange interpolation over server ids removes the masks both on the
//! keys themselves and on per-server decapsulation results in `GT`.
//!
//! Collecting shares from the servers is up to the caller.

use ark_ec::{
    pairing::{Pairing, PairingOutput},
    PrimeGroup,
};
use ark_ff::Zero;
use ark_poly::{univariate::DensePolynomial, Polynomial};
use ark_std::rand::RngCore;
use blake2::{Blake2b512, Digest};
use tracing::debug;

use crate::attributes::KeyIndex;
use crate::decryption::DecryptionKey;
use crate::encryption::EncapsulatedKey;
use crate::engine::{interpolate_at_zero, lagrange_coefficients};
use crate::error::PredEncError;
use crate::kem::KeyMaterial;
use crate::repr::Representable;
use crate::scheme::PredicateScheme;
use crate::setup::{MasterSecret, SchemeId};
use crate::utils::random_polynomial;

/// Number of servers and how many of them must cooperate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DistributionConfig {
    pub servers: usize,
    pub threshold: usize,
}

impl DistributionConfig {
    pub fn new(servers: usize, threshold: usize) -> Self {
        DistributionConfig { servers, threshold }
    }

    pub fn validate(&self) -> Result<(), PredEncError> {
        if self.threshold == 0 {
            return Err(PredEncError::InvalidParameter(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.threshold > self.servers {
            return Err(PredEncError::InvalidParameter(format!(
                "threshold ({}) must not exceed number of servers ({})",
                self.threshold, self.servers
            )));
        }
        if self.servers > u32::MAX as usize {
            return Err(PredEncError::InvalidParameter(format!(
                "too many servers: {}",
                self.servers
            )));
        }
        Ok(())
    }
}

/// One server's fragment of a decryption key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyShare<E: Pairing> {
    /// Server identifier, 1-indexed
    pub server_id: u32,
    pub threshold: usize,
    /// A key of the original shape whose group elements are masked
    pub key: DecryptionKey<E>,
}

impl<E: Pairing> KeyShare<E> {
    pub fn key_index(&self) -> KeyIndex<E::ScalarField> {
        self.key.key_index()
    }
}

/// One server's decapsulation result computed with its key share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialKeyMaterial<E: Pairing> {
    pub server_id: u32,
    pub threshold: usize,
    pub scheme: SchemeId,
    pub key_index: KeyIndex<E::ScalarField>,
    /// Blake2b-512 digest of the encapsulated key this result was computed for
    pub encapsulation: Vec<u8>,
    pub element: PairingOutput<E>,
}

/// Common view over anything carrying a server id and a target key index.
trait ServerShare<E: Pairing> {
    fn server_id(&self) -> u32;
    fn threshold(&self) -> usize;
    fn scheme(&self) -> SchemeId;
    fn key_index(&self) -> KeyIndex<E::ScalarField>;
    /// Digest of the encapsulation a result belongs to; empty for key shares.
    fn encapsulation(&self) -> &[u8];
}

impl<E: Pairing> ServerShare<E> for KeyShare<E> {
    fn server_id(&self) -> u32 {
        self.server_id
    }
    fn threshold(&self) -> usize {
        self.threshold
    }
    fn scheme(&self) -> SchemeId {
        self.key.scheme()
    }
    fn key_index(&self) -> KeyIndex<E::ScalarField> {
        self.key.key_index()
    }
    fn encapsulation(&self) -> &[u8] {
        &[]
    }
}

impl<E: Pairing> ServerShare<E> for PartialKeyMaterial<E> {
    fn server_id(&self) -> u32 {
        self.server_id
    }
    fn threshold(&self) -> usize {
        self.threshold
    }
    fn scheme(&self) -> SchemeId {
        self.scheme
    }
    fn key_index(&self) -> KeyIndex<E::ScalarField> {
        self.key_index.clone()
    }
    fn encapsulation(&self) -> &[u8] {
        &self.encapsulation
    }
}

/// Checks the share set and returns the `t` shares with the smallest server ids.
///
/// # Errors
/// Returns `InvalidShareSet` on an empty set, a zero threshold, mismatched
/// scheme, key index, encapsulation or threshold, a zero or repeated server
/// id, or fewer than `t` shares
fn select_shares<E: Pairing, S: ServerShare<E>>(shares: &[S]) -> Result<Vec<&S>, PredEncError> {
    let first = shares
        .first()
        .ok_or_else(|| PredEncError::InvalidShareSet("no shares given".to_string()))?;
    let threshold = first.threshold();
    if threshold == 0 {
        return Err(PredEncError::InvalidShareSet(
            "threshold must be at least 1".to_string(),
        ));
    }
    let scheme = first.scheme();
    let index = first.key_index();
    let encapsulation = first.encapsulation();

    for share in shares {
        if share.server_id() == 0 {
            return Err(PredEncError::InvalidShareSet(
                "server ids start at 1".to_string(),
            ));
        }
        if share.threshold() != threshold {
            return Err(PredEncError::InvalidShareSet(format!(
                "share from server {} has threshold {}, expected {}",
                share.server_id(),
                share.threshold(),
                threshold
            )));
        }
        if share.scheme() != scheme || share.key_index() != index {
            return Err(PredEncError::InvalidShareSet(format!(
                "share from server {} targets a different key index",
                share.server_id()
            )));
        }
        if share.encapsulation() != encapsulation {
            return Err(PredEncError::InvalidShareSet(format!(
                "share from server {} was computed for a different encapsulated key",
                share.server_id()
            )));
        }
    }

    let mut selected: Vec<&S> = shares.iter().collect();
    selected.sort_by_key(|share| share.server_id());
    if let Some(pair) = selected.windows(2).find(|w| w[0].server_id() == w[1].server_id()) {
        return Err(PredEncError::InvalidShareSet(format!(
            "duplicate share from server {}",
            pair[0].server_id()
        )));
    }
    if selected.len() < threshold {
        return Err(PredEncError::InvalidShareSet(format!(
            "need at least {} shares, got {}",
            threshold,
            selected.len()
        )));
    }

    selected.truncate(threshold);
    Ok(selected)
}

/// Splits a decryption key into `config.servers` shares, any `config.threshold`
/// of which combine back to it.
pub fn split_decryption_key<E: Pairing, R: RngCore>(
    dk: &DecryptionKey<E>,
    config: &DistributionConfig,
    rng: &mut R,
) -> Result<Vec<KeyShare<E>>, PredEncError> {
    config.validate()?;

    let (g1, g2) = dk.group_components();
    let degree = config.threshold - 1;
    let zero = E::ScalarField::zero();
    let g1_masks: Vec<DensePolynomial<E::ScalarField>> =
        g1.iter().map(|_| random_polynomial(zero, degree, rng)).collect();
    let g2_masks: Vec<DensePolynomial<E::ScalarField>> =
        g2.iter().map(|_| random_polynomial(zero, degree, rng)).collect();

    let shares = (1..=config.servers as u32)
        .map(|server_id| {
            let x = E::ScalarField::from(server_id as u64);
            let masked_g1: Vec<E::G1> = g1
                .iter()
                .zip(&g1_masks)
                .map(|(element, mask)| *element + E::G1::generator() * mask.evaluate(&x))
                .collect();
            let masked_g2: Vec<E::G2> = g2
                .iter()
                .zip(&g2_masks)
                .map(|(element, mask)| *element + E::G2::generator() * mask.evaluate(&x))
                .collect();

            Ok(KeyShare {
                server_id,
                threshold: config.threshold,
                key: dk.with_group_components(&masked_g1, &masked_g2)?,
            })
        })
        .collect::<Result<Vec<_>, PredEncError>>()?;

    debug!(
        servers = config.servers,
        threshold = config.threshold,
        index = dk.key_index().kind(),
        "split decryption key"
    );
    Ok(shares)
}

/// Key generation for the distributed setting: the full key exists only
/// transiently while it is split.
pub fn generate_key_shares<E: Pairing, R: RngCore>(
    scheme: &PredicateScheme<E>,
    msk: &MasterSecret<E::ScalarField>,
    index: &KeyIndex<E::ScalarField>,
    config: &DistributionConfig,
    rng: &mut R,
) -> Result<Vec<KeyShare<E>>, PredEncError> {
    config.validate()?;
    let dk = scheme.generate_decryption_key(msk, index, rng)?;
    split_decryption_key(&dk, config, rng)
}

/// Rebuilds the decryption key from at least `t` shares.
///
/// # Errors
/// Returns `InvalidShareSet` if the shares do not form a valid qualified set
pub fn combine<E: Pairing>(shares: &[KeyShare<E>]) -> Result<DecryptionKey<E>, PredEncError> {
    let selected = select_shares::<E, _>(shares)?;
    let points: Vec<E::ScalarField> = selected
        .iter()
        .map(|share| E::ScalarField::from(share.server_id as u64))
        .collect();
    let coefficients = lagrange_coefficients(&points)?;

    let template = &selected[0].key;
    let (template_g1, template_g2) = template.group_components();
    let mut g1 = vec![E::G1::zero(); template_g1.len()];
    let mut g2 = vec![E::G2::zero(); template_g2.len()];

    for (share, coefficient) in selected.iter().zip(coefficients) {
        let (share_g1, share_g2) = share.key.group_components();
        if share_g1.len() != g1.len() || share_g2.len() != g2.len() {
            return Err(PredEncError::InvalidShareSet(format!(
                "share from server {} has a different key shape",
                share.server_id
            )));
        }
        for (acc, element) in g1.iter_mut().zip(share_g1) {
            *acc += element * coefficient;
        }
        for (acc, element) in g2.iter_mut().zip(share_g2) {
            *acc += element * coefficient;
        }
    }

    debug!(shares = selected.len(), "combined key shares");
    template.with_group_components(&g1, &g2)
}

/// Decapsulates with a single server's key share.
///
/// The result alone reveals nothing about the key material; `t` of them are
/// needed in [`combine_key_material`].
pub fn partial_decaps<E: Pairing>(
    scheme: &PredicateScheme<E>,
    encapsulated: &EncapsulatedKey<E>,
    share: &KeyShare<E>,
) -> Result<PartialKeyMaterial<E>, PredEncError> {
    let element = scheme.decaps_element(encapsulated, &share.key)?;
    Ok(PartialKeyMaterial {
        server_id: share.server_id,
        threshold: share.threshold,
        scheme: share.key.scheme(),
        key_index: share.key_index(),
        encapsulation: encapsulation_digest(encapsulated)?,
        element,
    })
}

/// Blake2b-512 over the canonical bytes of an encapsulated key.
pub fn encapsulation_digest<E: Pairing>(encapsulated: &EncapsulatedKey<E>) -> Result<Vec<u8>, PredEncError> {
    let mut hasher = Blake2b512::new();
    hasher.update(b"predicate-encryption/encapsulation");
    hasher.update(encapsulated.to_bytes()?);
    Ok(hasher.finalize().to_vec())
}

/// Interpolates per-server decapsulation results into the key material.
///
/// All partials must come from the same encapsulated key; mixing them is an
/// `InvalidShareSet` error.
pub fn combine_key_material<E: Pairing>(
    partials: &[PartialKeyMaterial<E>],
) -> Result<KeyMaterial, PredEncError> {
    let selected = select_shares::<E, _>(partials)?;
    let points: Vec<(E::ScalarField, PairingOutput<E>)> = selected
        .iter()
        .map(|partial| (E::ScalarField::from(partial.server_id as u64), partial.element))
        .collect();

    debug!(partials = selected.len(), "combining partial key material");
    KeyMaterial::from_element(&interpolate_at_zero(&points)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{attribute_set, CiphertextIndex};
    use crate::kem::PredicateKem;
    use crate::repr::{Representation, Restore};
    use crate::setup::SetupConfig;

    type E = ark_bls12_381::Bls12_381;

    fn fixture() -> (PredicateScheme<E>, DecryptionKey<E>, Vec<KeyShare<E>>) {
        let mut rng = ark_std::test_rng();
        let (pe, msk) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap();
        let dk = pe
            .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
            .unwrap();
        let shares = split_decryption_key(&dk, &DistributionConfig::new(5, 3), &mut rng).unwrap();
        (pe, dk, shares)
    }

    fn pick(shares: &[KeyShare<E>], ids: &[u32]) -> Vec<KeyShare<E>> {
        shares
            .iter()
            .filter(|share| ids.contains(&share.server_id))
            .cloned()
            .collect()
    }

    #[test]
    fn test_any_threshold_subset_combines_to_key() {
        let (_, dk, shares) = fixture();
        assert_eq!(shares.len(), 5);
        assert_eq!(combine(&pick(&shares, &[1, 2, 3])).unwrap(), dk);
        assert_eq!(combine(&pick(&shares, &[2, 4, 5])).unwrap(), dk);
        assert_eq!(combine(&shares).unwrap(), dk);
    }

    #[test]
    fn test_single_share_is_masked() {
        let (_, dk, shares) = fixture();
        assert!(shares.iter().all(|share| share.key != dk));
        assert!(shares.iter().all(|share| share.key_index() == dk.key_index()));
    }

    #[test]
    fn test_invalid_share_sets() {
        let mut rng = ark_std::test_rng();
        let (pe, _, shares) = fixture();

        assert!(matches!(combine::<E>(&[]), Err(PredEncError::InvalidShareSet(_))));
        assert!(matches!(
            combine(&pick(&shares, &[1, 2])),
            Err(PredEncError::InvalidShareSet(_))
        ));

        let mut duplicated = pick(&shares, &[1, 2]);
        duplicated.push(shares[0].clone());
        assert!(matches!(combine(&duplicated), Err(PredEncError::InvalidShareSet(_))));

        let (_, other_msk) =
            PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap();
        let other = generate_key_shares(
            &PredicateScheme::new(pe.public_parameters().clone()),
            &other_msk,
            &KeyIndex::Attributes(attribute_set(&["A", "B", "D"])),
            &DistributionConfig::new(5, 3),
            &mut rng,
        )
        .unwrap();
        let mut mixed = pick(&shares, &[1, 2]);
        mixed.push(other[2].clone());
        assert!(matches!(combine(&mixed), Err(PredEncError::InvalidShareSet(_))));
    }

    #[test]
    fn test_partial_decaps_combines_to_key_material() {
        let mut rng = ark_std::test_rng();
        let (pe, dk, shares) = fixture();
        let ek = pe
            .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
            .unwrap();
        let (material, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
        assert_eq!(pe.decaps(&encapsulated, &dk).unwrap(), material);

        let partials: Vec<PartialKeyMaterial<E>> = pick(&shares, &[1, 3, 5])
            .iter()
            .map(|share| partial_decaps(&pe, &encapsulated, share).unwrap())
            .collect();
        assert_eq!(combine_key_material(&partials).unwrap(), material);
        assert_ne!(KeyMaterial::from_element(&partials[0].element).unwrap(), material);
        assert!(matches!(
            combine_key_material(&partials[..2]),
            Err(PredEncError::InvalidShareSet(_))
        ));
    }

    #[test]
    fn test_zero_threshold_share_is_rejected() {
        let (pe, _, shares) = fixture();

        let mut repr = shares[0].to_repr().unwrap();
        if let Representation::Map(entries) = &mut repr {
            entries.insert("threshold".to_string(), Representation::Int(0));
        }
        assert!(matches!(
            KeyShare::from_repr(&repr, pe.public_parameters()),
            Err(PredEncError::SerializationFormat(_))
        ));

        let mut zero = shares[0].clone();
        zero.threshold = 0;
        assert!(matches!(combine(&[zero]), Err(PredEncError::InvalidShareSet(_))));
    }

    #[test]
    fn test_partials_from_different_encapsulations_are_rejected() {
        let mut rng = ark_std::test_rng();
        let (pe, _, shares) = fixture();
        let ek = pe
            .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
            .unwrap();
        let (_, first) = pe.encaps(&ek, &mut rng).unwrap();
        let (_, second) = pe.encaps(&ek, &mut rng).unwrap();

        let partials = vec![
            partial_decaps(&pe, &first, &shares[0]).unwrap(),
            partial_decaps(&pe, &first, &shares[1]).unwrap(),
            partial_decaps(&pe, &second, &shares[2]).unwrap(),
        ];
        assert!(matches!(
            combine_key_material(&partials),
            Err(PredEncError::InvalidShareSet(_))
        ));
        assert_eq!(partials[0].encapsulation, encapsulation_digest(&first).unwrap());
    }

    #[test]
    fn test_distribution_config_validation() {
        assert!(DistributionConfig::new(5, 0).validate().is_err());
        assert!(DistributionConfig::new(2, 3).validate().is_err());
        assert!(DistributionConfig::new(5, 5).validate().is_ok());
    }
}
