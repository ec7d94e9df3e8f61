//! Key-policy attribute-based encryption over threshold-gate trees.
//!
//! The master secret is shared down the key's policy; leaf `x` labelled with
//! attribute `a` gets `(R_x, D_x) = (g^{r_x}, g2^{q_x(0)} · T(a)^{r_x})`.
//! Ciphertexts are attribute-set ciphertexts, identical to the fuzzy scheme's.

use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_std::rand::RngCore;
use tracing::{debug, trace};

use crate::attributes::{Attribute, AttributeSet};
use crate::engine::{leaf_share, reconstruct_policy, KeyComponent};
use crate::error::PredEncError;
use crate::policy::AccessPolicy;
use crate::schemes::{encaps_attributes, AttributeCiphertext};
use crate::setup::{MasterSecret, PublicParameters};
use crate::utils::random_unit;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPolicyKey<E: Pairing> {
    pub policy: AccessPolicy<E::ScalarField>,
    /// One component per policy leaf, in depth-first order
    pub leaves: Vec<KeyComponent<E>>,
}

impl<E: Pairing> Hash for KeyPolicyKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.policy.hash(state);
        self.leaves.hash(state);
    }
}

pub(crate) fn keygen<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    msk: &MasterSecret<E::ScalarField>,
    policy: &AccessPolicy<E::ScalarField>,
    rng: &mut R,
) -> Result<KeyPolicyKey<E>, PredEncError> {
    policy.validate()?;

    let shares = policy.share_secret(msk.y(), rng);
    let leaves = policy
        .leaves()
        .iter()
        .zip(shares)
        .map(|(attribute, share)| {
            let r: E::ScalarField = random_unit(rng);
            let h = pp.hash_attribute(attribute)?;
            Ok(KeyComponent {
                r: pp.g * r,
                d: pp.g2 * share + h * r,
            })
        })
        .collect::<Result<Vec<_>, PredEncError>>()?;

    trace!(leaves = leaves.len(), "issued key-policy key");
    Ok(KeyPolicyKey {
        policy: policy.clone(),
        leaves,
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
    ct: &AttributeCiphertext<E>,
    key: &KeyPolicyKey<E>,
) -> Result<PairingOutput<E>, PredEncError> {
    if key.leaves.len() != key.policy.leaf_count() {
        return Err(PredEncError::InvalidKey(format!(
            "key has {} leaf components for a policy with {} leaves",
            key.leaves.len(),
            key.policy.leaf_count()
        )));
    }

    let mut leaf_value = |position: usize,
                          attribute: &Attribute<E::ScalarField>|
     -> Result<PairingOutput<E>, PredEncError> {
        let element = ct.elements.get(attribute).ok_or_else(|| {
            PredEncError::InvalidKey("ciphertext lacks a component for a listed attribute".to_string())
        })?;
        Ok(leaf_share(ct.e_two_prime, &key.leaves[position], *element))
    };

    match reconstruct_policy(&key.policy, &ct.attributes, &mut leaf_value)? {
        Some(value) => Ok(value),
        None => {
            debug!("ciphertext attributes do not satisfy key policy");
            Err(PredEncError::UnqualifiedKey(
                "ciphertext attributes do not satisfy the key policy".to_string(),
            ))
        }
    }
}
