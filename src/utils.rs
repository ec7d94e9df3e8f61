use ark_ff::{Field, PrimeField};
use ark_poly::{univariate::DensePolynomial, DenseUVPolynomial};
use ark_std::{rand::RngCore, UniformRand};
use blake2::{Blake2b512, Digest};

use crate::error::PredEncError;

/// Evaluates the Lagrange basis polynomial for `points[j]` at `x`:
/// `Π_{k≠j} (x - points[k]) / (points[j] - points[k])`.
///
/// # Errors
/// Returns an error if `j` is out of range or the points are not pairwise distinct
pub fn lagrange_basis_at<F: Field>(points: &[F], j: usize, x: F) -> Result<F, PredEncError> {
    let xj = *points.get(j).ok_or_else(|| {
        PredEncError::Interpolation(format!(
            "basis index {} out of range for {} points",
            j,
            points.len()
        ))
    })?;

    let mut numerator = F::one();
    let mut denominator = F::one();
    for (k, xk) in points.iter().enumerate() {
        if k == j {
            continue;
        }
        numerator *= x - xk;
        denominator *= xj - xk;
    }

    let denominator_inv = denominator.inverse().ok_or_else(|| {
        PredEncError::Interpolation("interpolation points must be pairwise distinct".to_string())
    })?;

    Ok(numerator * denominator_inv)
}

/// Samples a uniformly random element of `Zp*`.
pub fn random_unit<F: Field, R: RngCore>(rng: &mut R) -> F {
    loop {
        let candidate = F::rand(rng);
        if !candidate.is_zero() {
            return candidate;
        }
    }
}

/// Samples a random polynomial of the given degree whose constant term is `constant`.
pub fn random_polynomial<F: Field, R: RngCore>(
    constant: F,
    degree: usize,
    rng: &mut R,
) -> DensePolynomial<F> {
    let mut coefficients = Vec::with_capacity(degree + 1);
    coefficients.push(constant);
    coefficients.extend((0..degree).map(|_| F::rand(rng)));
    DensePolynomial::from_coefficients_vec(coefficients)
}

/// Hashes `data` into the scalar field under a domain separation tag.
pub fn hash_to_field<F: PrimeField>(domain: &[u8], data: &[u8]) -> F {
    let mut hasher = Blake2b512::new();
    hasher.update((domain.len() as u64).to_le_bytes());
    hasher.update(domain);
    hasher.update(data);
    F::from_le_bytes_mod_order(&hasher.finalize())
}
