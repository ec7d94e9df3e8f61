//! Ciphertext-policy attribute-based encryption over threshold-gate trees.
//!
//! Setup publishes `g1 = g^β` and `Y = e(g, g2)^α`. A key for attributes `S`
//! is `D = g2^{(α + r)/β}` plus `(g^{r_j}, g2^r · T(j)^{r_j})` per `j ∈ S`.
//! Encapsulation shares `s` down the policy; leaf `y` carries
//! `(C_y, C'_y) = (g^{q_y(0)}, T(a_y)^{q_y(0)})` and the root carries `C = g1^s`.
//! Recovering `A = e(g, g2)^{rs}` from the leaves gives `e(C, D) / A = Y^s`.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ff::Field;
use ark_std::rand::RngCore;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::attributes::{Attribute, AttributeSet};
use crate::engine::{leaf_share, reconstruct_policy, KeyComponent};
use crate::error::PredEncError;
use crate::policy::AccessPolicy;
use crate::setup::{MasterSecret, PublicParameters};
use crate::utils::random_unit;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CiphertextPolicyKey<E: Pairing> {
    pub attributes: AttributeSet<E::ScalarField>,
    pub d: E::G2,
    pub components: BTreeMap<Attribute<E::ScalarField>, KeyComponent<E>>,
}

/// Ciphertext components attached to one policy leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafCiphertext<E: Pairing> {
    pub c: E::G1,
    pub c_prime: E::G2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyCiphertext<E: Pairing> {
    pub policy: AccessPolicy<E::ScalarField>,
    pub c: E::G1,
    /// One entry per policy leaf, in depth-first order
    pub leaves: Vec<LeafCiphertext<E>>,
}

impl<E: Pairing> Hash for CiphertextPolicyKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attributes.hash(state);
        self.d.hash(state);
        self.components.hash(state);
    }
}

impl<E: Pairing> Hash for LeafCiphertext<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.c.hash(state);
        self.c_prime.hash(state);
    }
}

impl<E: Pairing> Hash for PolicyCiphertext<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.policy.hash(state);
        self.c.hash(state);
        self.leaves.hash(state);
    }
}

pub(crate) fn keygen<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    msk: &MasterSecret<E::ScalarField>,
    attributes: &AttributeSet<E::ScalarField>,
    rng: &mut R,
) -> Result<CiphertextPolicyKey<E>, PredEncError> {
    pp.validate_attribute_set(attributes)?;

    let beta_inv = msk
        .beta()?
        .inverse()
        .ok_or_else(|| PredEncError::InvalidKey("β must be invertible".to_string()))?;
    let r: E::ScalarField = random_unit(rng);
    let g2_r = pp.g2 * r;

    let mut components = BTreeMap::new();
    for attribute in attributes {
        let r_j: E::ScalarField = random_unit(rng);
        let h = pp.hash_attribute(attribute)?;
        components.insert(
            *attribute,
            KeyComponent {
                r: pp.g * r_j,
                d: g2_r + h * r_j,
            },
        );
    }

    trace!(attributes = attributes.len(), "issued ciphertext-policy key");
    Ok(CiphertextPolicyKey {
        attributes: attributes.clone(),
        d: pp.g2 * ((msk.y() + r) * beta_inv),
        components,
    })
}

pub(crate) fn encaps<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    policy: &AccessPolicy<E::ScalarField>,
    rng: &mut R,
) -> Result<(PairingOutput<E>, PolicyCiphertext<E>), PredEncError> {
    policy.validate()?;

    let s: E::ScalarField = random_unit(rng);
    let shares = policy.share_secret(s, rng);
    let leaves = policy
        .leaves()
        .par_iter()
        .zip(shares.par_iter())
        .map(|(attribute, share)| {
            Ok(LeafCiphertext {
                c: pp.g * *share,
                c_prime: pp.hash_attribute(attribute)? * *share,
            })
        })
        .collect::<Result<Vec<_>, PredEncError>>()?;

    Ok((
        pp.blinding * s,
        PolicyCiphertext {
            policy: policy.clone(),
            c: pp.g1 * s,
            leaves,
        },
    ))
}

pub(crate) fn decaps<E: Pairing>(
    ct: &PolicyCiphertext<E>,
    key: &CiphertextPolicyKey<E>,
) -> Result<PairingOutput<E>, PredEncError> {
    if ct.leaves.len() != ct.policy.leaf_count() {
        return Err(PredEncError::InvalidKey(format!(
            "ciphertext has {} leaf components for a policy with {} leaves",
            ct.leaves.len(),
            ct.policy.leaf_count()
        )));
    }

    let mut leaf_value = |position: usize,
                          attribute: &Attribute<E::ScalarField>|
     -> Result<PairingOutput<E>, PredEncError> {
        let component = key.components.get(attribute).ok_or_else(|| {
            PredEncError::InvalidKey("decryption key lacks a component for a listed attribute".to_string())
        })?;
        let leaf = &ct.leaves[position];
        Ok(leaf_share(leaf.c, component, leaf.c_prime))
    };

    match reconstruct_policy(&ct.policy, &key.attributes, &mut leaf_value)? {
        Some(a) => Ok(E::pairing(ct.c, key.d) - a),
        None => {
            debug!("key attributes do not satisfy ciphertext policy");
            Err(PredEncError::UnqualifiedKey(
                "key attributes do not satisfy the ciphertext policy".to_string(),
            ))
        }
    }
}
