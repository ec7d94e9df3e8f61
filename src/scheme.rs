//! The predicate scheme front end.
//!
//! [`PredicateScheme`] holds the public parameters and dispatches every
//! operation by [`SchemeId`] to the matching construction. The access
//! predicate of each construction is exposed as a [`PredicateKind`] so callers
//! can check qualification without touching any group element.

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ff::PrimeField;
use ark_std::rand::RngCore;
use tracing::debug;

use crate::attributes::{overlap, CiphertextIndex, KeyIndex};
use crate::decryption::DecryptionKey;
use crate::encryption::{CipherText, EncapsulatedKey, EncryptionKey, PlainText};
use crate::error::PredEncError;
use crate::schemes::{ciphertext_policy, fuzzy, identity, key_policy};
use crate::setup::{setup, MasterSecret, PublicParameters, SchemeId, SetupConfig};

/// The matching rule between a key index and a ciphertext index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// Identities must be equal
    Equality,
    /// Attribute sets must share at least `threshold` elements
    ThresholdOverlap { threshold: usize },
    /// The attribute set on one side must satisfy the access policy on the other
    AccessStructure,
}

impl PredicateKind {
    pub fn for_scheme(scheme: SchemeId, threshold: usize) -> Self {
        match scheme {
            SchemeId::Identity => PredicateKind::Equality,
            SchemeId::Fuzzy => PredicateKind::ThresholdOverlap { threshold },
            SchemeId::KeyPolicy | SchemeId::CiphertextPolicy => PredicateKind::AccessStructure,
        }
    }

    /// Evaluates the predicate.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the index kinds do not fit this predicate
    pub fn is_satisfied<F: PrimeField>(
        &self,
        key: &KeyIndex<F>,
        ct: &CiphertextIndex<F>,
    ) -> Result<bool, PredEncError> {
        match (self, key, ct) {
            (PredicateKind::Equality, KeyIndex::Identity(a), CiphertextIndex::Identity(b)) => Ok(a == b),
            (
                PredicateKind::ThresholdOverlap { threshold },
                KeyIndex::Attributes(a),
                CiphertextIndex::Attributes(b),
            ) => Ok(overlap(a, b).len() >= *threshold),
            (PredicateKind::AccessStructure, KeyIndex::Policy(policy), CiphertextIndex::Attributes(attributes))
            | (PredicateKind::AccessStructure, KeyIndex::Attributes(attributes), CiphertextIndex::Policy(policy)) => {
                Ok(policy.is_satisfied_by(attributes))
            }
            _ => Err(PredEncError::InvalidKey(format!(
                "{:?} predicate cannot compare a {} key index with a {} ciphertext index",
                self,
                key.kind(),
                ct.kind()
            ))),
        }
    }
}

/// A configured predicate encryption scheme.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateScheme<E: Pairing> {
    pp: PublicParameters<E>,
}

impl<E: Pairing> PredicateScheme<E> {
    pub fn new(pp: PublicParameters<E>) -> Self {
        PredicateScheme { pp }
    }

    /// Runs setup and returns the scheme together with the master secret.
    pub fn setup<R: RngCore>(
        scheme: SchemeId,
        config: &SetupConfig,
        rng: &mut R,
    ) -> Result<(Self, MasterSecret<E::ScalarField>), PredEncError> {
        let (pp, msk) = setup(scheme, config, rng)?;
        Ok((PredicateScheme::new(pp), msk))
    }

    pub fn public_parameters(&self) -> &PublicParameters<E> {
        &self.pp
    }

    pub fn scheme(&self) -> SchemeId {
        self.pp.scheme
    }

    pub fn predicate(&self) -> PredicateKind {
        PredicateKind::for_scheme(self.pp.scheme, self.pp.threshold)
    }

    /// Wraps a ciphertext index into an encryption key after checking it fits this scheme.
    pub fn generate_encryption_key(
        &self,
        index: &CiphertextIndex<E::ScalarField>,
    ) -> Result<EncryptionKey<E::ScalarField>, PredEncError> {
        match (self.pp.scheme, index) {
            (SchemeId::Identity, CiphertextIndex::Identity(_)) => {}
            (SchemeId::Fuzzy | SchemeId::KeyPolicy, CiphertextIndex::Attributes(attributes)) => {
                self.pp.validate_attribute_set(attributes)?
            }
            (SchemeId::CiphertextPolicy, CiphertextIndex::Policy(policy)) => policy.validate()?,
            (scheme, index) => {
                return Err(PredEncError::InvalidKey(format!(
                    "the {} scheme does not encrypt for a {} index",
                    scheme.as_str(),
                    index.kind()
                )))
            }
        }
        Ok(EncryptionKey {
            scheme: self.pp.scheme,
            index: index.clone(),
        })
    }

    pub fn generate_decryption_key<R: RngCore>(
        &self,
        msk: &MasterSecret<E::ScalarField>,
        index: &KeyIndex<E::ScalarField>,
        rng: &mut R,
    ) -> Result<DecryptionKey<E>, PredEncError> {
        self.pp.check_master_secret(msk)?;

        let key = match (self.pp.scheme, index) {
            (SchemeId::Identity, KeyIndex::Identity(id)) => {
                DecryptionKey::Identity(identity::keygen(&self.pp, msk, id, rng)?)
            }
            (SchemeId::Fuzzy, KeyIndex::Attributes(attributes)) => {
                DecryptionKey::Fuzzy(fuzzy::keygen(&self.pp, msk, attributes, rng)?)
            }
            (SchemeId::KeyPolicy, KeyIndex::Policy(policy)) => {
                DecryptionKey::KeyPolicy(key_policy::keygen(&self.pp, msk, policy, rng)?)
            }
            (SchemeId::CiphertextPolicy, KeyIndex::Attributes(attributes)) => {
                DecryptionKey::CiphertextPolicy(ciphertext_policy::keygen(&self.pp, msk, attributes, rng)?)
            }
            (scheme, index) => {
                return Err(PredEncError::InvalidKey(format!(
                    "the {} scheme does not issue keys for a {} index",
                    scheme.as_str(),
                    index.kind()
                )))
            }
        };

        debug!(scheme = self.pp.scheme.as_str(), index = index.kind(), "issued decryption key");
        Ok(key)
    }

    /// Samples fresh randomness and returns `(Y^s, encapsulated key)`.
    pub(crate) fn encaps_element<R: RngCore>(
        &self,
        ek: &EncryptionKey<E::ScalarField>,
        rng: &mut R,
    ) -> Result<(PairingOutput<E>, EncapsulatedKey<E>), PredEncError> {
        if ek.scheme != self.pp.scheme {
            return Err(PredEncError::InvalidKey(format!(
                "encryption key belongs to the {} scheme, not {}",
                ek.scheme.as_str(),
                self.pp.scheme.as_str()
            )));
        }

        let (key, encapsulated) = match (self.pp.scheme, &ek.index) {
            (SchemeId::Identity, CiphertextIndex::Identity(id)) => {
                let (key, ct) = identity::encaps(&self.pp, id, rng)?;
                (key, EncapsulatedKey::Identity(ct))
            }
            (SchemeId::Fuzzy, CiphertextIndex::Attributes(attributes)) => {
                let (key, ct) = fuzzy::encaps(&self.pp, attributes, rng)?;
                (key, EncapsulatedKey::Fuzzy(ct))
            }
            (SchemeId::KeyPolicy, CiphertextIndex::Attributes(attributes)) => {
                let (key, ct) = key_policy::encaps(&self.pp, attributes, rng)?;
                (key, EncapsulatedKey::KeyPolicy(ct))
            }
            (SchemeId::CiphertextPolicy, CiphertextIndex::Policy(policy)) => {
                let (key, ct) = ciphertext_policy::encaps(&self.pp, policy, rng)?;
                (key, EncapsulatedKey::CiphertextPolicy(ct))
            }
            (scheme, index) => {
                return Err(PredEncError::InvalidKey(format!(
                    "the {} scheme does not encrypt for a {} index",
                    scheme.as_str(),
                    index.kind()
                )))
            }
        };

        debug!(scheme = self.pp.scheme.as_str(), index = ek.index.kind(), "encapsulated key");
        Ok((key, encapsulated))
    }

    /// Recovers `Y^s` from an encapsulated key.
    ///
    /// # Errors
    /// - `InvalidKey` if the key or ciphertext belongs to another scheme
    /// - `UnqualifiedKey` if the key does not satisfy the ciphertext's predicate
    pub(crate) fn decaps_element(
        &self,
        encapsulated: &EncapsulatedKey<E>,
        dk: &DecryptionKey<E>,
    ) -> Result<PairingOutput<E>, PredEncError> {
        if encapsulated.scheme() != self.pp.scheme || dk.scheme() != self.pp.scheme {
            return Err(PredEncError::InvalidKey(format!(
                "cannot decapsulate a {} ciphertext with a {} key under the {} scheme",
                encapsulated.scheme().as_str(),
                dk.scheme().as_str(),
                self.pp.scheme.as_str()
            )));
        }

        let predicate = self.predicate();
        if !predicate.is_satisfied(&dk.key_index(), &encapsulated.ciphertext_index())? {
            debug!(scheme = self.pp.scheme.as_str(), "predicate not satisfied");
            return Err(PredEncError::UnqualifiedKey(format!(
                "decryption key does not satisfy the {:?} predicate",
                predicate
            )));
        }

        match (encapsulated, dk) {
            (EncapsulatedKey::Identity(ct), DecryptionKey::Identity(key)) => identity::decaps(ct, key),
            (EncapsulatedKey::Fuzzy(ct), DecryptionKey::Fuzzy(key)) => fuzzy::decaps(&self.pp, ct, key),
            (EncapsulatedKey::KeyPolicy(ct), DecryptionKey::KeyPolicy(key)) => key_policy::decaps(ct, key),
            (EncapsulatedKey::CiphertextPolicy(ct), DecryptionKey::CiphertextPolicy(key)) => {
                ciphertext_policy::decaps(ct, key)
            }
            _ => Err(PredEncError::InvalidKey(
                "key and ciphertext variants do not match".to_string(),
            )),
        }
    }

    /// Encrypts a `GT` element: `blinded = m · Y^s`.
    pub fn encrypt<R: RngCore>(
        &self,
        plaintext: &PlainText<E>,
        ek: &EncryptionKey<E::ScalarField>,
        rng: &mut R,
    ) -> Result<CipherText<E>, PredEncError> {
        let (key, encapsulated) = self.encaps_element(ek, rng)?;
        Ok(CipherText {
            blinded: plaintext.value() + key,
            encapsulated,
        })
    }

    pub fn decrypt(&self, ct: &CipherText<E>, dk: &DecryptionKey<E>) -> Result<PlainText<E>, PredEncError> {
        let key = self.decaps_element(&ct.encapsulated, dk)?;
        Ok(PlainText::new(ct.blinded - key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::{attribute_set, Attribute};
    use crate::policy::AccessPolicy;

    type E = ark_bls12_381::Bls12_381;
    type Fr = <E as Pairing>::ScalarField;

    #[test]
    fn test_predicate_kinds() {
        let key = KeyIndex::<Fr>::Attributes(attribute_set(&["A", "B", "C"]));
        let ct = CiphertextIndex::Attributes(attribute_set(&["B", "C", "D"]));

        assert!(PredicateKind::ThresholdOverlap { threshold: 2 }.is_satisfied(&key, &ct).unwrap());
        assert!(!PredicateKind::ThresholdOverlap { threshold: 3 }.is_satisfied(&key, &ct).unwrap());
        assert!(matches!(
            PredicateKind::Equality.is_satisfied(&key, &ct),
            Err(PredEncError::InvalidKey(_))
        ));

        let policy = AccessPolicy::any_of(vec![
            AccessPolicy::leaf(Attribute::from_label("X")),
            AccessPolicy::leaf(Attribute::from_label("A")),
        ])
        .unwrap();
        assert!(PredicateKind::AccessStructure
            .is_satisfied(&key, &CiphertextIndex::Policy(policy))
            .unwrap());
    }

    #[test]
    fn test_encrypt_decrypt_each_scheme() {
        let mut rng = ark_std::test_rng();
        let policy = AccessPolicy::all_of(vec![
            AccessPolicy::leaf(Attribute::from_label("A")),
            AccessPolicy::leaf(Attribute::from_label("B")),
        ])
        .unwrap();
        let attributes = attribute_set(&["A", "B", "C"]);
        let alice = Attribute::from_identity(b"alice");

        let cases = [
            (SchemeId::Identity, KeyIndex::Identity(alice), CiphertextIndex::Identity(alice)),
            (
                SchemeId::Fuzzy,
                KeyIndex::Attributes(attributes.clone()),
                CiphertextIndex::Attributes(attributes.clone()),
            ),
            (
                SchemeId::KeyPolicy,
                KeyIndex::Policy(policy.clone()),
                CiphertextIndex::Attributes(attributes.clone()),
            ),
            (
                SchemeId::CiphertextPolicy,
                KeyIndex::Attributes(attributes.clone()),
                CiphertextIndex::Policy(policy.clone()),
            ),
        ];

        for (scheme, key_index, ct_index) in cases {
            let (pe, msk) = PredicateScheme::<E>::setup(scheme, &SetupConfig::with_universe(4), &mut rng).unwrap();
            let dk = pe.generate_decryption_key(&msk, &key_index, &mut rng).unwrap();
            let ek = pe.generate_encryption_key(&ct_index).unwrap();

            let m = PlainText::random(&mut rng);
            let ct = pe.encrypt(&m, &ek, &mut rng).unwrap();
            assert_eq!(pe.decrypt(&ct, &dk).unwrap(), m, "{}", scheme.as_str());
        }
    }

    #[test]
    fn test_scheme_mismatch_is_invalid_key() {
        let mut rng = ark_std::test_rng();
        let (fuzzy, msk) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(4, 2), &mut rng).unwrap();
        let (ident, _) = PredicateScheme::<E>::setup(SchemeId::Identity, &SetupConfig::with_universe(4), &mut rng).unwrap();

        assert!(matches!(
            ident.generate_decryption_key(&msk, &KeyIndex::Identity(Attribute::from_u64(1)), &mut rng),
            Err(PredEncError::InvalidKey(_))
        ));
        assert!(matches!(
            fuzzy.generate_encryption_key(&CiphertextIndex::Identity(Attribute::from_u64(1))),
            Err(PredEncError::InvalidKey(_))
        ));

        let dk = fuzzy
            .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B"])), &mut rng)
            .unwrap();
        let alice = Attribute::from_identity(b"alice");
        let ek = ident.generate_encryption_key(&CiphertextIndex::Identity(alice)).unwrap();
        let ct = ident.encrypt(&PlainText::random(&mut rng), &ek, &mut rng).unwrap();
        assert!(matches!(fuzzy.decrypt(&ct, &dk), Err(PredEncError::InvalidKey(_))));
        assert!(matches!(ident.decrypt(&ct, &dk), Err(PredEncError::InvalidKey(_))));
    }
}
