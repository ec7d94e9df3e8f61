//! Concrete constructions behind each [`SchemeId`](crate::setup::SchemeId).
//!
//! Every construction exposes the same three internal operations (`keygen`,
//! `encaps`, `decaps`) and differs only in how the blinding value is
//! reconstructed: a single pairing ratio, Lagrange over an attribute overlap,
//! or Lagrange at every gate of an access policy.

pub mod ciphertext_policy;
pub mod fuzzy;
pub mod identity;
pub mod key_policy;

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use ark_ec::pairing::Pairing;
use rayon::prelude::*;

use crate::attributes::{Attribute, AttributeSet};
use crate::error::PredEncError;
use crate::setup::PublicParameters;

/// Ciphertext components for an attribute-set index: `E'' = g^s` and
/// `E_i = T(i)^s` for every attribute `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeCiphertext<E: Pairing> {
    pub attributes: AttributeSet<E::ScalarField>,
    pub e_two_prime: E::G1,
    pub elements: BTreeMap<Attribute<E::ScalarField>, E::G2>,
}

impl<E: Pairing> Hash for AttributeCiphertext<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attributes.hash(state);
        self.e_two_prime.hash(state);
        self.elements.hash(state);
    }
}

/// Encapsulates under an attribute set with exponent `s`.
pub(crate) fn encaps_attributes<E: Pairing>(
    pp: &PublicParameters<E>,
    attributes: &AttributeSet<E::ScalarField>,
    s: E::ScalarField,
) -> Result<AttributeCiphertext<E>, PredEncError> {
    pp.validate_attribute_set(attributes)?;

    let elements = attributes
        .par_iter()
        .map(|attribute| Ok((*attribute, pp.hash_attribute(attribute)? * s)))
        .collect::<Result<BTreeMap<_, _>, PredEncError>>()?;

    Ok(AttributeCiphertext {
        attributes: attributes.clone(),
        e_two_prime: pp.g * s,
        elements,
    })
}
