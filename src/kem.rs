//! Predicate key encapsulation and key derivation.
//!
//! [`PredicateKem`] is implemented directly by [`PredicateScheme`] with
//! [`KeyMaterial`] as the shared secret. [`SymmetricKeyPredicateKem`] wraps any
//! predicate KEM with a [`KeyDerivationFunction`] and is itself a predicate KEM
//! whose shared secret is a [`SymmetricKey`].

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_serialize::CanonicalSerialize;
use ark_std::rand::RngCore;
use blake2::{Blake2b512, Digest};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::attributes::{CiphertextIndex, KeyIndex};
use crate::decryption::DecryptionKey;
use crate::encryption::{EncapsulatedKey, EncryptionKey};
use crate::error::PredEncError;
use crate::scheme::{PredicateKind, PredicateScheme};
use crate::security::constant_time_eq_bytes;
use crate::setup::{MasterSecret, PublicParameters};

/// Length in bytes of a derived symmetric key.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Predicate-based key encapsulation mechanism.
pub trait PredicateKem<E: Pairing> {
    /// Shared secret produced by `encaps` and recovered by `decaps`.
    type Key: Clone + Debug + PartialEq + Eq + Hash;

    fn public_parameters(&self) -> &PublicParameters<E>;

    /// The access predicate a decryption key must satisfy.
    fn predicate(&self) -> PredicateKind;

    fn generate_encryption_key(
        &self,
        index: &CiphertextIndex<E::ScalarField>,
    ) -> Result<EncryptionKey<E::ScalarField>, PredEncError>;

    fn generate_decryption_key<R: RngCore>(
        &self,
        msk: &MasterSecret<E::ScalarField>,
        index: &KeyIndex<E::ScalarField>,
        rng: &mut R,
    ) -> Result<DecryptionKey<E>, PredEncError>;

    /// Samples a fresh shared secret and the encapsulation that carries it.
    fn encaps<R: RngCore>(
        &self,
        ek: &EncryptionKey<E::ScalarField>,
        rng: &mut R,
    ) -> Result<(Self::Key, EncapsulatedKey<E>), PredEncError>;

    /// Recovers the shared secret. Deterministic in its inputs.
    ///
    /// # Errors
    /// - `InvalidKey` on scheme mismatch
    /// - `UnqualifiedKey` if the key does not satisfy the predicate
    fn decaps(
        &self,
        encapsulated: &EncapsulatedKey<E>,
        dk: &DecryptionKey<E>,
    ) -> Result<Self::Key, PredEncError>;
}

/// Canonical compressed encoding of a recovered `GT` element.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    pub fn from_element<E: Pairing>(element: &PairingOutput<E>) -> Result<Self, PredEncError> {
        let mut bytes = Vec::with_capacity(element.compressed_size());
        element.serialize_compressed(&mut bytes)?;
        Ok(KeyMaterial(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq_bytes(&self.0, &other.0)
    }
}

impl Eq for KeyMaterial {}

impl Hash for KeyMaterial {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial([REDACTED; {} bytes])", self.0.len())
    }
}

impl<E: Pairing> PredicateKem<E> for PredicateScheme<E> {
    type Key = KeyMaterial;

    fn public_parameters(&self) -> &PublicParameters<E> {
        PredicateScheme::public_parameters(self)
    }

    fn predicate(&self) -> PredicateKind {
        PredicateScheme::predicate(self)
    }

    fn generate_encryption_key(
        &self,
        index: &CiphertextIndex<E::ScalarField>,
    ) -> Result<EncryptionKey<E::ScalarField>, PredEncError> {
        PredicateScheme::generate_encryption_key(self, index)
    }

    fn generate_decryption_key<R: RngCore>(
        &self,
        msk: &MasterSecret<E::ScalarField>,
        index: &KeyIndex<E::ScalarField>,
        rng: &mut R,
    ) -> Result<DecryptionKey<E>, PredEncError> {
        PredicateScheme::generate_decryption_key(self, msk, index, rng)
    }

    fn encaps<R: RngCore>(
        &self,
        ek: &EncryptionKey<E::ScalarField>,
        rng: &mut R,
    ) -> Result<(KeyMaterial, EncapsulatedKey<E>), PredEncError> {
        let (element, encapsulated) = self.encaps_element(ek, rng)?;
        Ok((KeyMaterial::from_element(&element)?, encapsulated))
    }

    fn decaps(
        &self,
        encapsulated: &EncapsulatedKey<E>,
        dk: &DecryptionKey<E>,
    ) -> Result<KeyMaterial, PredEncError> {
        let element = self.decaps_element(encapsulated, dk)?;
        KeyMaterial::from_element(&element)
    }
}

/// A 256-bit symmetric key derived from key material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    pub fn new(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        SymmetricKey(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq_bytes(&self.0, &other.0)
    }
}

impl Eq for SymmetricKey {}

impl Hash for SymmetricKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Turns a KEM shared secret of type `M` into a symmetric key.
pub trait KeyDerivationFunction<M> {
    fn derive(&self, material: &M) -> Result<SymmetricKey, PredEncError>;
}

/// Blake2b-512 over a length-prefixed context string and the key material,
/// truncated to 32 bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blake2bKdf {
    context: Vec<u8>,
}

impl Blake2bKdf {
    pub fn new(context: &[u8]) -> Self {
        Blake2bKdf {
            context: context.to_vec(),
        }
    }
}

impl Default for Blake2bKdf {
    fn default() -> Self {
        Blake2bKdf::new(b"predicate-encryption/kdf")
    }
}

impl KeyDerivationFunction<KeyMaterial> for Blake2bKdf {
    fn derive(&self, material: &KeyMaterial) -> Result<SymmetricKey, PredEncError> {
        let mut hasher = Blake2b512::new();
        hasher.update((self.context.len() as u64).to_le_bytes());
        hasher.update(&self.context);
        hasher.update(material.as_bytes());
        let mut digest = hasher.finalize();

        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        key.copy_from_slice(&digest[..SYMMETRIC_KEY_SIZE]);
        digest.as_mut_slice().zeroize();
        Ok(SymmetricKey(key))
    }
}

/// A predicate KEM whose shared secret is passed through a KDF.
///
/// Public parameters, predicate inspection and key generation are forwarded
/// unchanged to the wrapped KEM.
#[derive(Clone, Debug)]
pub struct SymmetricKeyPredicateKem<K, D> {
    inner: K,
    kdf: D,
}

impl<K, D> SymmetricKeyPredicateKem<K, D> {
    pub fn new(inner: K, kdf: D) -> Self {
        SymmetricKeyPredicateKem { inner, kdf }
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }
}

impl<E, K, D> PredicateKem<E> for SymmetricKeyPredicateKem<K, D>
where
    E: Pairing,
    K: PredicateKem<E>,
    D: KeyDerivationFunction<K::Key>,
{
    type Key = SymmetricKey;

    fn public_parameters(&self) -> &PublicParameters<E> {
        self.inner.public_parameters()
    }

    fn predicate(&self) -> PredicateKind {
        self.inner.predicate()
    }

    fn generate_encryption_key(
        &self,
        index: &CiphertextIndex<E::ScalarField>,
    ) -> Result<EncryptionKey<E::ScalarField>, PredEncError> {
        self.inner.generate_encryption_key(index)
    }

    fn generate_decryption_key<R: RngCore>(
        &self,
        msk: &MasterSecret<E::ScalarField>,
        index: &KeyIndex<E::ScalarField>,
        rng: &mut R,
    ) -> Result<DecryptionKey<E>, PredEncError> {
        self.inner.generate_decryption_key(msk, index, rng)
    }

    fn encaps<R: RngCore>(
        &self,
        ek: &EncryptionKey<E::ScalarField>,
        rng: &mut R,
    ) -> Result<(SymmetricKey, EncapsulatedKey<E>), PredEncError> {
        let (material, encapsulated) = self.inner.encaps(ek, rng)?;
        trace!("deriving symmetric key from encapsulated material");
        Ok((self.kdf.derive(&material)?, encapsulated))
    }

    fn decaps(
        &self,
        encapsulated: &EncapsulatedKey<E>,
        dk: &DecryptionKey<E>,
    ) -> Result<SymmetricKey, PredEncError> {
        let material = self.inner.decaps(encapsulated, dk)?;
        self.kdf.derive(&material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::attribute_set;
    use crate::setup::{SchemeId, SetupConfig};

    type E = ark_bls12_381::Bls12_381;

    fn fuzzy_scheme() -> (PredicateScheme<E>, MasterSecret<<E as Pairing>::ScalarField>) {
        let mut rng = ark_std::test_rng();
        PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap()
    }

    #[test]
    fn test_decaps_is_deterministic() {
        let mut rng = ark_std::test_rng();
        let (pe, msk) = fuzzy_scheme();
        let dk = pe
            .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
            .unwrap();
        let ek = PredicateKem::generate_encryption_key(
            &pe,
            &CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])),
        )
        .unwrap();

        let (material, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
        assert_eq!(pe.decaps(&encapsulated, &dk).unwrap(), material);
        assert_eq!(pe.decaps(&encapsulated, &dk).unwrap(), pe.decaps(&encapsulated, &dk).unwrap());
        assert_eq!(material.to_hex().len(), 2 * material.as_bytes().len());
    }

    #[test]
    fn test_decaps_unqualified() {
        let mut rng = ark_std::test_rng();
        let (pe, msk) = fuzzy_scheme();
        let dk = pe
            .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "D"])), &mut rng)
            .unwrap();
        let ek = PredicateKem::generate_encryption_key(
            &pe,
            &CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])),
        )
        .unwrap();

        let (_, encapsulated) = pe.encaps(&ek, &mut rng).unwrap();
        assert!(matches!(
            pe.decaps(&encapsulated, &dk),
            Err(PredEncError::UnqualifiedKey(_))
        ));
    }

    #[test]
    fn test_symmetric_wrapper_forwards() {
        let mut rng = ark_std::test_rng();
        let (pe, msk) = fuzzy_scheme();
        let kem = SymmetricKeyPredicateKem::new(pe.clone(), Blake2bKdf::default());

        assert_eq!(PredicateKem::<E>::predicate(&kem), pe.predicate());
        assert_eq!(PredicateKem::<E>::public_parameters(&kem), pe.public_parameters());

        let index = KeyIndex::Attributes(attribute_set(&["A", "B", "C"]));
        let dk = PredicateKem::<E>::generate_decryption_key(&kem, &msk, &index, &mut rng).unwrap();
        let ek = PredicateKem::<E>::generate_encryption_key(
            &kem,
            &CiphertextIndex::Attributes(attribute_set(&["A", "B", "C"])),
        )
        .unwrap();

        let (key, encapsulated) = PredicateKem::<E>::encaps(&kem, &ek, &mut rng).unwrap();
        assert_eq!(PredicateKem::<E>::decaps(&kem, &encapsulated, &dk).unwrap(), key);

        let material = pe.decaps(&encapsulated, &dk).unwrap();
        assert_eq!(Blake2bKdf::default().derive(&material).unwrap(), key);
        assert_ne!(Blake2bKdf::new(b"other").derive(&material).unwrap(), key);
    }
}
