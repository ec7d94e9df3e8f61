//! Threshold reconstruction engine
//!
//! Given the qualified overlap between a key and a ciphertext, the engine picks
//! a fixed subset of exactly `d` indices (ascending by their integer value in
//! `Zp`), computes Lagrange coefficients at zero over that subset and combines
//! the per-index pairing values in `GT`. The same interpolation runs at every
//! gate of an access policy and over server ids when key shares are combined.
//!
//! `GT` is written additively, as in arkworks: `a + b` is the group product and
//! `a * x` is exponentiation.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use ark_ec::{
    pairing::{Pairing, PairingOutput},
    PrimeGroup,
};
use ark_ff::{PrimeField, Zero};
use tracing::trace;

use crate::attributes::{Attribute, AttributeSet};
use crate::error::PredEncError;
use crate::policy::AccessPolicy;
use crate::utils::lagrange_basis_at;

/// Per-attribute decryption key component `(R, D)` with `R = g^r` and
/// `D = g2^{q(i)} · T(i)^r` (construction specific).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyComponent<E: Pairing> {
    pub r: E::G1,
    pub d: E::G2,
}

impl<E: Pairing> Hash for KeyComponent<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.r.hash(state);
        self.d.hash(state);
    }
}

/// Lagrange coefficients at zero for every point of `points`.
///
/// # Errors
/// Returns an error if the points are not pairwise distinct
pub fn lagrange_coefficients<F: PrimeField>(points: &[F]) -> Result<Vec<F>, PredEncError> {
    (0..points.len())
        .map(|j| lagrange_basis_at(points, j, F::zero()))
        .collect()
}

/// Deterministically selects exactly `threshold` attributes: the smallest ones
/// by canonical integer value.
///
/// # Errors
/// Returns `InsufficientAttributes` if fewer than `threshold` attributes qualify
pub fn select_subset<F: PrimeField>(
    qualified: &AttributeSet<F>,
    threshold: usize,
) -> Result<Vec<Attribute<F>>, PredEncError> {
    if threshold == 0 {
        return Err(PredEncError::InvalidParameter(
            "threshold must be at least 1".to_string(),
        ));
    }
    if qualified.len() < threshold {
        return Err(PredEncError::InsufficientAttributes {
            required: threshold,
            got: qualified.len(),
        });
    }
    Ok(qualified.iter().take(threshold).copied().collect())
}

/// Interpolates group-valued shares `(x_i, v_i)` at zero: `Σ Δ_i · v_i`.
///
/// # Errors
/// Returns an error if no shares are given or the `x_i` are not distinct
pub fn interpolate_at_zero<G: PrimeGroup>(
    shares: &[(G::ScalarField, G)],
) -> Result<G, PredEncError> {
    if shares.is_empty() {
        return Err(PredEncError::Interpolation(
            "nothing to interpolate".to_string(),
        ));
    }
    let points: Vec<G::ScalarField> = shares.iter().map(|(x, _)| *x).collect();
    let coefficients = lagrange_coefficients(&points)?;

    let mut acc = G::zero();
    for ((_, value), coefficient) in shares.iter().zip(coefficients) {
        acc += *value * coefficient;
    }
    Ok(acc)
}

/// Pairing value contributed by a single matched component:
/// `e(c1, D) / e(R, c2)`.
pub fn leaf_share<E: Pairing>(c1: E::G1, key: &KeyComponent<E>, c2: E::G2) -> PairingOutput<E> {
    E::multi_pairing([c1, -key.r], [key.d, c2])
}

/// Recovers `Π_{i∈S} (e(E'', D_i) / e(R_i, E_i))^{Δ_i}` for the selected subset `S`
/// of the qualified attributes.
///
/// # Errors
/// - `InsufficientAttributes` if `|qualified| < threshold`
/// - `InvalidKey` if a selected attribute lacks a key or ciphertext component
pub fn reconstruct<E: Pairing>(
    qualified: &AttributeSet<E::ScalarField>,
    key_components: &BTreeMap<Attribute<E::ScalarField>, KeyComponent<E>>,
    cipher_components: &BTreeMap<Attribute<E::ScalarField>, E::G2>,
    e_two_prime: E::G1,
    threshold: usize,
) -> Result<PairingOutput<E>, PredEncError> {
    let selected = select_subset(qualified, threshold)?;
    let points: Vec<E::ScalarField> = selected.iter().map(|a| a.value()).collect();
    let coefficients = lagrange_coefficients(&points)?;

    let mut lhs = Vec::with_capacity(2 * selected.len());
    let mut rhs = Vec::with_capacity(2 * selected.len());
    for (attribute, delta) in selected.iter().zip(coefficients) {
        let key = key_components.get(attribute).ok_or_else(|| {
            PredEncError::InvalidKey("decryption key lacks a component for a qualified attribute".to_string())
        })?;
        let element = cipher_components.get(attribute).ok_or_else(|| {
            PredEncError::InvalidKey("ciphertext lacks a component for a qualified attribute".to_string())
        })?;

        // Exponents are pulled into G1 so that a single multi-pairing suffices.
        lhs.push(e_two_prime * delta);
        rhs.push(key.d);
        lhs.push(-(key.r * delta));
        rhs.push(*element);
    }

    trace!(selected = selected.len(), "reconstructing blinding value");
    Ok(E::multi_pairing(lhs, rhs))
}

/// Evaluates an access policy bottom-up, interpolating at every gate over the
/// first `k` satisfied children (child numbers `1..=n`).
///
/// `leaf_value` receives the depth-first position of a leaf and its attribute;
/// it is only called for leaves whose attribute is in `available`. Returns
/// `None` when the policy is not satisfied.
pub fn reconstruct_policy<F, G, L>(
    policy: &AccessPolicy<F>,
    available: &AttributeSet<F>,
    leaf_value: &mut L,
) -> Result<Option<G>, PredEncError>
where
    F: PrimeField,
    G: PrimeGroup<ScalarField = F>,
    L: FnMut(usize, &Attribute<F>) -> Result<G, PredEncError>,
{
    evaluate_node(policy, 0, available, leaf_value)
}

fn evaluate_node<F, G, L>(
    node: &AccessPolicy<F>,
    offset: usize,
    available: &AttributeSet<F>,
    leaf_value: &mut L,
) -> Result<Option<G>, PredEncError>
where
    F: PrimeField,
    G: PrimeGroup<ScalarField = F>,
    L: FnMut(usize, &Attribute<F>) -> Result<G, PredEncError>,
{
    match node {
        AccessPolicy::Leaf(attribute) => {
            if available.contains(attribute) {
                leaf_value(offset, attribute).map(Some)
            } else {
                Ok(None)
            }
        }
        AccessPolicy::Gate {
            threshold,
            children,
        } => {
            let mut shares = Vec::with_capacity(*threshold);
            let mut child_offset = offset;
            for (position, child) in children.iter().enumerate() {
                if shares.len() == *threshold {
                    break;
                }
                if let Some(value) = evaluate_node(child, child_offset, available, leaf_value)? {
                    shares.push((F::from(position as u64 + 1), value));
                }
                child_offset += child.leaf_count();
            }

            if shares.len() < *threshold {
                return Ok(None);
            }
            interpolate_at_zero(&shares).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::random_polynomial;
    use ark_ec::PrimeGroup;
    use ark_poly::Polynomial;
    use ark_std::UniformRand;

    type E = ark_bls12_381::Bls12_381;
    type Fr = <E as Pairing>::ScalarField;
    type G1 = <E as Pairing>::G1;
    type G2 = <E as Pairing>::G2;

    fn attrs(values: &[u64]) -> AttributeSet<Fr> {
        values.iter().map(|&v| Attribute::from_u64(v)).collect()
    }

    #[test]
    fn test_select_subset_is_smallest_first() {
        let qualified = attrs(&[40, 3, 17, 8]);
        let selected = select_subset(&qualified, 3).unwrap();
        let values: Vec<Fr> = selected.iter().map(|a| a.value()).collect();
        assert_eq!(values, vec![Fr::from(3u64), Fr::from(8u64), Fr::from(17u64)]);
    }

    #[test]
    fn test_select_subset_insufficient() {
        let qualified = attrs(&[1, 2]);
        assert_eq!(
            select_subset(&qualified, 3),
            Err(PredEncError::InsufficientAttributes {
                required: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_interpolate_in_g1() {
        let mut rng = ark_std::test_rng();
        let secret = Fr::rand(&mut rng);
        let poly = random_polynomial(secret, 2, &mut rng);
        let g = G1::generator();

        let shares: Vec<(Fr, G1)> = [2u64, 7, 11]
            .iter()
            .map(|&x| {
                let x = Fr::from(x);
                (x, g * poly.evaluate(&x))
            })
            .collect();
        assert_eq!(interpolate_at_zero(&shares).unwrap(), g * secret);
    }

    #[test]
    fn test_interpolate_rejects_duplicate_points() {
        let g = G1::generator();
        let shares = vec![(Fr::from(1u64), g), (Fr::from(1u64), g)];
        assert!(matches!(
            interpolate_at_zero(&shares),
            Err(PredEncError::Interpolation(_))
        ));
    }

    /// Builds key/ciphertext components for a degree-(d-1) polynomial q with
    /// q(0) = y and returns them together with the expected `e(g, g2)^{y s}`.
    fn fixture(
        attributes: &[u64],
        d: usize,
    ) -> (
        BTreeMap<Attribute<Fr>, KeyComponent<E>>,
        BTreeMap<Attribute<Fr>, G2>,
        G1,
        PairingOutput<E>,
    ) {
        let mut rng = ark_std::test_rng();
        let g = G1::generator();
        let g2 = G2::rand(&mut rng);
        let y = Fr::rand(&mut rng);
        let s = Fr::rand(&mut rng);
        let q = random_polynomial(y, d - 1, &mut rng);

        let mut keys = BTreeMap::new();
        let mut elements = BTreeMap::new();
        for &value in attributes {
            let attribute = Attribute::from_u64(value);
            let t = G2::rand(&mut rng);
            let r = Fr::rand(&mut rng);
            keys.insert(
                attribute,
                KeyComponent {
                    r: g * r,
                    d: g2 * q.evaluate(&attribute.value()) + t * r,
                },
            );
            elements.insert(attribute, t * s);
        }
        (keys, elements, g * s, E::pairing(g, g2) * (y * s))
    }

    #[test]
    fn test_reconstruct_recovers_blinding_value() {
        let (keys, elements, e_two_prime, expected) = fixture(&[1, 2, 3, 4], 3);
        let qualified = attrs(&[1, 2, 3, 4]);
        let value = reconstruct(&qualified, &keys, &elements, e_two_prime, 3).unwrap();
        assert_eq!(value, expected);
    }

    #[test]
    fn test_reconstruct_is_subset_independent() {
        let (keys, elements, e_two_prime, expected) = fixture(&[1, 2, 3, 4, 5], 3);

        let first = reconstruct(&attrs(&[1, 2, 3]), &keys, &elements, e_two_prime, 3).unwrap();
        let second = reconstruct(&attrs(&[2, 4, 5]), &keys, &elements, e_two_prime, 3).unwrap();
        let larger = reconstruct(&attrs(&[1, 3, 4, 5]), &keys, &elements, e_two_prime, 3).unwrap();

        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(larger, expected);
    }

    #[test]
    fn test_reconstruct_insufficient_attributes() {
        let (keys, elements, e_two_prime, _) = fixture(&[1, 2, 3], 3);
        let result = reconstruct(&attrs(&[1, 2]), &keys, &elements, e_two_prime, 3);
        assert_eq!(
            result,
            Err(PredEncError::InsufficientAttributes {
                required: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_reconstruct_missing_component() {
        let (keys, elements, e_two_prime, _) = fixture(&[1, 2, 3], 2);
        let result = reconstruct(&attrs(&[1, 9]), &keys, &elements, e_two_prime, 2);
        assert!(matches!(result, Err(PredEncError::InvalidKey(_))));
    }

    #[test]
    fn test_reconstruct_policy_over_scalars_in_exponent() {
        let mut rng = ark_std::test_rng();
        let a = Attribute::<Fr>::from_u64(1);
        let b = Attribute::<Fr>::from_u64(2);
        let c = Attribute::<Fr>::from_u64(3);
        let policy = AccessPolicy::any_of(vec![
            AccessPolicy::all_of(vec![AccessPolicy::leaf(a), AccessPolicy::leaf(b)]).unwrap(),
            AccessPolicy::leaf(c),
        ])
        .unwrap();

        let secret = Fr::rand(&mut rng);
        let shares = policy.share_secret(secret, &mut rng);
        let g = G1::generator();

        let mut leaf =
            |position: usize, _: &Attribute<Fr>| -> Result<G1, PredEncError> { Ok(g * shares[position]) };
        let via_and = reconstruct_policy(&policy, &[a, b].into_iter().collect(), &mut leaf).unwrap();
        let via_c = reconstruct_policy(&policy, &[c].into_iter().collect(), &mut leaf).unwrap();
        let none = reconstruct_policy(&policy, &[a].into_iter().collect(), &mut leaf).unwrap();

        assert_eq!(via_and, Some(g * secret));
        assert_eq!(via_c, Some(g * secret));
        assert_eq!(none, None);
    }
}
