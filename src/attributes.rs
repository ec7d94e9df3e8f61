//! Policy index model
//!
//! Attributes are elements of the scalar field `Zp`. They can be created from
//! integers, or from string labels and identities which are hashed into `Zp`.
//! A [`KeyIndex`] describes what a decryption key was issued for and a
//! [`CiphertextIndex`] describes what a ciphertext was encrypted for.

use std::collections::BTreeSet;

use ark_ff::PrimeField;

use crate::policy::AccessPolicy;
use crate::utils::hash_to_field;

const ATTRIBUTE_DOMAIN: &[u8] = b"predicate-encryption/attribute";
const IDENTITY_DOMAIN: &[u8] = b"predicate-encryption/identity";

/// A single attribute, represented as an element of `Zp`.
///
/// Ordering follows the canonical integer value of the field element, which
/// fixes the subset selection rule used during reconstruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute<F: PrimeField>(F);

impl<F: PrimeField> Attribute<F> {
    pub fn new(value: F) -> Self {
        Attribute(value)
    }

    pub fn from_u64(value: u64) -> Self {
        Attribute(F::from(value))
    }

    /// Hashes a string label into `Zp`.
    pub fn from_label(label: &str) -> Self {
        Attribute(hash_to_field(ATTRIBUTE_DOMAIN, label.as_bytes()))
    }

    /// Hashes an identity string into `Zp` for the exact-match scheme.
    pub fn from_identity(identity: &[u8]) -> Self {
        Attribute(hash_to_field(IDENTITY_DOMAIN, identity))
    }

    pub fn value(&self) -> F {
        self.0
    }
}

pub type AttributeSet<F> = BTreeSet<Attribute<F>>;

/// Builds an attribute set from string labels.
pub fn attribute_set<F: PrimeField>(labels: &[&str]) -> AttributeSet<F> {
    labels.iter().map(|label| Attribute::from_label(label)).collect()
}

/// What a decryption key was issued for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyIndex<F: PrimeField> {
    Identity(Attribute<F>),
    Attributes(AttributeSet<F>),
    Policy(AccessPolicy<F>),
}

/// What a ciphertext was encrypted for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CiphertextIndex<F: PrimeField> {
    Identity(Attribute<F>),
    Attributes(AttributeSet<F>),
    Policy(AccessPolicy<F>),
}

impl<F: PrimeField> KeyIndex<F> {
    pub fn kind(&self) -> &'static str {
        match self {
            KeyIndex::Identity(_) => "identity",
            KeyIndex::Attributes(_) => "attributes",
            KeyIndex::Policy(_) => "policy",
        }
    }
}

impl<F: PrimeField> CiphertextIndex<F> {
    pub fn kind(&self) -> &'static str {
        match self {
            CiphertextIndex::Identity(_) => "identity",
            CiphertextIndex::Attributes(_) => "attributes",
            CiphertextIndex::Policy(_) => "policy",
        }
    }
}

/// Attributes common to both sets, in ascending order.
pub fn overlap<F: PrimeField>(a: &AttributeSet<F>, b: &AttributeSet<F>) -> AttributeSet<F> {
    a.intersection(b).copied().collect()
}
