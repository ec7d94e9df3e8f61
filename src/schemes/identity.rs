//! Exact-match identity-based encryption.
//!
//! Keys are `(R, D) = (g^r, g2^y · T(id)^r)` and ciphertexts `(g^s, T(id)^s)`;
//! a matching pair yields `e(g^s, D) / e(R, T(id)^s) = Y^s` with no interpolation.

use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_std::rand::RngCore;
use tracing::debug;

use crate::attributes::Attribute;
use crate::engine::{leaf_share, KeyComponent};
use crate::error::PredEncError;
use crate::setup::{MasterSecret, PublicParameters};
use crate::utils::random_unit;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityKey<E: Pairing> {
    pub identity: Attribute<E::ScalarField>,
    pub component: KeyComponent<E>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityCiphertext<E: Pairing> {
    pub identity: Attribute<E::ScalarField>,
    pub c1: E::G1,
    pub c2: E::G2,
}

impl<E: Pairing> Hash for IdentityKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
        self.component.hash(state);
    }
}

impl<E: Pairing> Hash for IdentityCiphertext<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
        self.c1.hash(state);
        self.c2.hash(state);
    }
}

pub(crate) fn keygen<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    msk: &MasterSecret<E::ScalarField>,
    identity: &Attribute<E::ScalarField>,
    rng: &mut R,
) -> Result<IdentityKey<E>, PredEncError> {
    let r: E::ScalarField = random_unit(rng);
    let h = pp.hash_attribute(identity)?;

    Ok(IdentityKey {
        identity: *identity,
        component: KeyComponent {
            r: pp.g * r,
            d: pp.g2 * msk.y() + h * r,
        },
    })
}

pub(crate) fn encaps<E: Pairing, R: RngCore>(
    pp: &PublicParameters<E>,
    identity: &Attribute<E::ScalarField>,
    rng: &mut R,
) -> Result<(PairingOutput<E>, IdentityCiphertext<E>), PredEncError> {
    let s: E::ScalarField = random_unit(rng);
    let h = pp.hash_attribute(identity)?;

    Ok((
        pp.blinding * s,
        IdentityCiphertext {
            identity: *identity,
            c1: pp.g * s,
            c2: h * s,
        },
    ))
}

pub(crate) fn decaps<E: Pairing>(
    ct: &IdentityCiphertext<E>,
    key: &IdentityKey<E>,
) -> Result<PairingOutput<E>, PredEncError> {
    if ct.identity != key.identity {
        debug!("identity mismatch between key and ciphertext");
        return Err(PredEncError::UnqualifiedKey(
            "key identity does not match ciphertext identity".to_string(),
        ));
    }
    Ok(leaf_share(ct.c1, &key.component, ct.c2))
}
