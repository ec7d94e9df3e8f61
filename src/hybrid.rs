//! Hybrid encryption of byte payloads under a predicate KEM.
//!
//! The payload is sealed with ChaCha20-Poly1305 under the symmetric key the
//! KEM produces. The scheme tag is bound as associated data.

use ark_ec::pairing::Pairing;
use ark_std::rand::RngCore;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};

use crate::decryption::DecryptionKey;
use crate::encryption::{EncapsulatedKey, EncryptionKey};
use crate::error::PredEncError;
use crate::kem::{PredicateKem, SymmetricKey};

/// Nonce length for ChaCha20-Poly1305.
pub const NONCE_SIZE: usize = 12;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HybridCiphertext<E: Pairing> {
    pub encapsulated: EncapsulatedKey<E>,
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext followed by the 16-byte authentication tag
    pub payload: Vec<u8>,
}

fn cipher(key: &SymmetricKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Encapsulates a fresh key for `ek` and seals `plaintext` under it.
pub fn encrypt<E, K, R>(
    kem: &K,
    ek: &EncryptionKey<E::ScalarField>,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<HybridCiphertext<E>, PredEncError>
where
    E: Pairing,
    K: PredicateKem<E, Key = SymmetricKey>,
    R: RngCore,
{
    let (key, encapsulated) = kem.encaps(ek, rng)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let payload = cipher(&key)
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: encapsulated.scheme().as_str().as_bytes(),
            },
        )
        .map_err(|e| PredEncError::Symmetric(format!("encryption failed: {}", e)))?;

    Ok(HybridCiphertext {
        encapsulated,
        nonce,
        payload,
    })
}

/// Recovers the symmetric key with `dk` and opens the payload.
///
/// # Errors
/// Fails with the KEM's error if the key is unqualified, and with `Symmetric`
/// if authentication fails.
pub fn decrypt<E, K>(
    kem: &K,
    ct: &HybridCiphertext<E>,
    dk: &DecryptionKey<E>,
) -> Result<Vec<u8>, PredEncError>
where
    E: Pairing,
    K: PredicateKem<E, Key = SymmetricKey>,
{
    let key = kem.decaps(&ct.encapsulated, dk)?;

    cipher(&key)
        .decrypt(
            Nonce::from_slice(&ct.nonce),
            Payload {
                msg: &ct.payload,
                aad: ct.encapsulated.scheme().as_str().as_bytes(),
            },
        )
        .map_err(|e| PredEncError::Symmetric(format!("decryption failed: {}", e)))
}
