//! Security utilities for protecting sensitive cryptographic data
//!
//! This module provides:
//! - A zeroizing wrapper for secret scalars (master secrets)
//! - Constant-time comparison of field elements, byte strings and pairing outputs

use ark_ec::pairing::{Pairing, PairingOutput};
use ark_ff::Field;
use ark_serialize::CanonicalSerialize;
use ark_std::vec::Vec;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Wrapper for sensitive scalar field elements that ensures zeroization on drop
///
/// # Security
/// - Automatically zeroizes memory when dropped
/// - Equality is evaluated over canonical encodings in constant time
/// - Prevents accidental leakage through Debug trait
#[derive(Clone)]
pub struct SensitiveScalar<F: Field> {
    value: F,
}

impl<F: Field> SensitiveScalar<F> {
    /// Create a new sensitive scalar from a field element
    pub fn new(value: F) -> Self {
        Self { value }
    }

    /// Get a reference to the inner value
    ///
    /// # Security Warning
    /// The caller must ensure this reference is not used to leak the value
    pub fn expose_secret(&self) -> &F {
        &self.value
    }
}

impl<F: Field> Zeroize for SensitiveScalar<F> {
    fn zeroize(&mut self) {
        // arkworks field elements do not expose their limbs, so overwrite with zero
        self.value = F::zero();
    }
}

impl<F: Field> ZeroizeOnDrop for SensitiveScalar<F> {}

impl<F: Field> Drop for SensitiveScalar<F> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<F: Field> PartialEq for SensitiveScalar<F> {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(&self.value, &other.value)
    }
}

impl<F: Field> Eq for SensitiveScalar<F> {}

// Prevent debug output from leaking sensitive data
impl<F: Field> std::fmt::Debug for SensitiveScalar<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SensitiveScalar([REDACTED])")
    }
}

/// Constant-time equality comparison for field elements
///
/// # Security Note
/// The underlying arkworks field operations may not be constant-time; only
/// the final comparison of the canonical encodings is.
pub fn constant_time_eq<F: Field>(a: &F, b: &F) -> bool {
    let mut a_bytes = Vec::new();
    let mut b_bytes = Vec::new();

    // If serialization fails, treat as not equal
    if a.serialize_compressed(&mut a_bytes).is_err() {
        return false;
    }
    if b.serialize_compressed(&mut b_bytes).is_err() {
        return false;
    }

    constant_time_eq_bytes(&a_bytes, &b_bytes)
}

/// Constant-time byte slice comparison
///
/// Only the length check short-circuits; lengths are public.
pub fn constant_time_eq_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}

/// Constant-time equality comparison for pairing outputs
pub fn constant_time_eq_pairing<E: Pairing>(a: &PairingOutput<E>, b: &PairingOutput<E>) -> bool {
    let mut a_bytes = Vec::new();
    let mut b_bytes = Vec::new();

    if a.serialize_compressed(&mut a_bytes).is_err() {
        return false;
    }
    if b.serialize_compressed(&mut b_bytes).is_err() {
        return false;
    }

    constant_time_eq_bytes(&a_bytes, &b_bytes)
}
