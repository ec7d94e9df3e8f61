use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ff::PrimeField;
use ark_std::{rand::RngCore, UniformRand};

use crate::attributes::CiphertextIndex;
use crate::schemes::{
    ciphertext_policy::PolicyCiphertext, identity::IdentityCiphertext, AttributeCiphertext,
};
use crate::security::constant_time_eq_pairing;
use crate::setup::SchemeId;

/// Public encryption target: a scheme together with the ciphertext index to encrypt for.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncryptionKey<F: PrimeField> {
    pub scheme: SchemeId,
    pub index: CiphertextIndex<F>,
}

/// A message in the target group `GT`.
#[derive(Clone, Copy, Debug)]
pub struct PlainText<E: Pairing>(PairingOutput<E>);

impl<E: Pairing> PlainText<E> {
    pub fn new(value: PairingOutput<E>) -> Self {
        PlainText(value)
    }

    /// Samples a uniformly random plaintext element.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        PlainText(PairingOutput::<E>::rand(rng))
    }

    pub fn value(&self) -> PairingOutput<E> {
        self.0
    }
}

impl<E: Pairing> PartialEq for PlainText<E> {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq_pairing(&self.0, &other.0)
    }
}

impl<E: Pairing> Eq for PlainText<E> {}

impl<E: Pairing> Hash for PlainText<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Everything a ciphertext carries except the message-blinding term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncapsulatedKey<E: Pairing> {
    Identity(IdentityCiphertext<E>),
    Fuzzy(AttributeCiphertext<E>),
    KeyPolicy(AttributeCiphertext<E>),
    CiphertextPolicy(PolicyCiphertext<E>),
}

impl<E: Pairing> EncapsulatedKey<E> {
    pub fn scheme(&self) -> SchemeId {
        match self {
            EncapsulatedKey::Identity(_) => SchemeId::Identity,
            EncapsulatedKey::Fuzzy(_) => SchemeId::Fuzzy,
            EncapsulatedKey::KeyPolicy(_) => SchemeId::KeyPolicy,
            EncapsulatedKey::CiphertextPolicy(_) => SchemeId::CiphertextPolicy,
        }
    }

    /// The index this ciphertext was produced for.
    pub fn ciphertext_index(&self) -> CiphertextIndex<E::ScalarField> {
        match self {
            EncapsulatedKey::Identity(ct) => CiphertextIndex::Identity(ct.identity),
            EncapsulatedKey::Fuzzy(ct) | EncapsulatedKey::KeyPolicy(ct) => {
                CiphertextIndex::Attributes(ct.attributes.clone())
            }
            EncapsulatedKey::CiphertextPolicy(ct) => CiphertextIndex::Policy(ct.policy.clone()),
        }
    }
}

impl<E: Pairing> Hash for EncapsulatedKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme().hash(state);
        match self {
            EncapsulatedKey::Identity(ct) => ct.hash(state),
            EncapsulatedKey::Fuzzy(ct) | EncapsulatedKey::KeyPolicy(ct) => ct.hash(state),
            EncapsulatedKey::CiphertextPolicy(ct) => ct.hash(state),
        }
    }
}

/// A full ciphertext: `blinded = m · Y^s` plus the encapsulated components.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CipherText<E: Pairing> {
    pub blinded: PairingOutput<E>,
    pub encapsulated: EncapsulatedKey<E>,
}

impl<E: Pairing> CipherText<E> {
    pub fn scheme(&self) -> SchemeId {
        self.encapsulated.scheme()
    }
}

impl<E: Pairing> Hash for CipherText<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.blinded.hash(state);
        self.encapsulated.hash(state);
    }
}
