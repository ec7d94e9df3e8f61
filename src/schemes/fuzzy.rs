//! Large-universe fuzzy identity-based encryption.
//!
//! A key for the attribute set `ω` shares the master secret `y` with a random
//! polynomial `q` of degree `d - 1`; each attribute `i ∈ ω` gets
//! `(R_i, D_i) = (g^{r_i}, g2^{q(i)} · T(i)^{r_i})`. A ciphertext for `ω'`
//! decapsulates whenever `|ω ∩ ω'| ≥ d`.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_poly::Polynomial;
use ark_std::rand::RngCore;
use tracing::trace;

use crate::attributes::{overlap, Attribute, AttributeSet};
use crate::engine::{reconstruct, KeyComponent};
use crate::error::PredEncError;
use crate::schemes::{encaps_attributes, AttributeCiphertext};
use crate::setup::{MasterSecret, PublicParameters};
use crate::utils::{random_polynomial, random_unit};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FuzzyKey<E: Pairing> {
    pub attributes: AttributeSet<E::ScalarField>,
    pub components: BTreeMap<Attribute<E::ScalarField>, KeyComponent<E>>,
}

impl<E: Pairing> Hash for FuzzyKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attributes.hash(state);
        self.components.hash(state);
    }
}

pub(crate) fn keygen<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    msk: &MasterSecret<E::ScalarField>,
    attributes: &AttributeSet<E::ScalarField>,
    rng: &mut R,
) -> Result<FuzzyKey<E>, PredEncError> {
    pp.validate_attribute_set(attributes)?;

    let q = random_polynomial(msk.y(), pp.threshold - 1, rng);
    let mut components = BTreeMap::new();
    for attribute in attributes {
        let r: E::ScalarField = random_unit(rng);
        let h = pp.hash_attribute(attribute)?;
        components.insert(
            *attribute,
            KeyComponent {
                r: pp.g * r,
                d: pp.g2 * q.evaluate(&attribute.value()) + h * r,
            },
        );
    }

    trace!(attributes = attributes.len(), "issued fuzzy key");
    Ok(FuzzyKey {
        attributes: attributes.clone(),
        components,
    })
}

pub(crate) fn encaps<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    attributes: &AttributeSet<E::ScalarField>,
    rng: &mut R,
) -> Result<(PairingOutput<E>, AttributeCiphertext<E>), PredEncError> {
    let s: E::ScalarField = random_unit(rng);
    let ct = encaps_attributes(pp, attributes, s)?;
    Ok((pp.blinding * s, ct))
}

pub(crate) fn decaps<E: Pairing>(
    pp: &PublicParameters<E>,
    ct: &AttributeCiphertext<E>,
    key: &FuzzyKey<E>,
) -> Result<PairingOutput<E>, PredEncError> {
    let qualified = overlap(&key.attributes, &ct.attributes);
    reconstruct(
        &qualified,
        &key.components,
        &ct.elements,
        ct.e_two_prime,
        pp.threshold,
    )
}
