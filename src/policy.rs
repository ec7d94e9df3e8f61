//! Access structures built from threshold gates.
//!
//! A gate with threshold `k` over `n` children is satisfied when at least `k`
//! children are satisfied; AND and OR are the `n`-of-`n` and `1`-of-`n` cases.
//! Children are numbered `1..=n`, and these numbers are the interpolation
//! points used when a gate is reconstructed.

use ark_ff::PrimeField;
use ark_poly::Polynomial;
use ark_std::rand::RngCore;

use crate::attributes::{Attribute, AttributeSet};
use crate::error::PredEncError;
use crate::utils::random_polynomial;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessPolicy<F: PrimeField> {
    Leaf(Attribute<F>),
    Gate {
        threshold: usize,
        children: Vec<AccessPolicy<F>>,
    },
}

impl<F: PrimeField> AccessPolicy<F> {
    pub fn leaf(attribute: Attribute<F>) -> Self {
        AccessPolicy::Leaf(attribute)
    }

    /// Creates a `threshold`-of-`children.len()` gate.
    ///
    /// # Errors
    /// Returns an error if there are no children or the threshold is outside `1..=children.len()`
    pub fn gate(threshold: usize, children: Vec<AccessPolicy<F>>) -> Result<Self, PredEncError> {
        if children.is_empty() {
            return Err(PredEncError::InvalidParameter(
                "a gate needs at least one child".to_string(),
            ));
        }
        if threshold == 0 || threshold > children.len() {
            return Err(PredEncError::InvalidParameter(format!(
                "gate threshold ({}) must be between 1 and the number of children ({})",
                threshold,
                children.len()
            )));
        }
        Ok(AccessPolicy::Gate {
            threshold,
            children,
        })
    }

    pub fn all_of(children: Vec<AccessPolicy<F>>) -> Result<Self, PredEncError> {
        let threshold = children.len();
        Self::gate(threshold, children)
    }

    pub fn any_of(children: Vec<AccessPolicy<F>>) -> Result<Self, PredEncError> {
        Self::gate(1, children)
    }

    /// Re-checks gate thresholds of a tree that was not built through [`AccessPolicy::gate`].
    pub fn validate(&self) -> Result<(), PredEncError> {
        match self {
            AccessPolicy::Leaf(_) => Ok(()),
            AccessPolicy::Gate {
                threshold,
                children,
            } => {
                if children.is_empty() || *threshold == 0 || *threshold > children.len() {
                    return Err(PredEncError::InvalidParameter(format!(
                        "malformed gate: threshold {} over {} children",
                        threshold,
                        children.len()
                    )));
                }
                children.iter().try_for_each(|child| child.validate())
            }
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            AccessPolicy::Leaf(_) => 1,
            AccessPolicy::Gate { children, .. } => children.iter().map(|c| c.leaf_count()).sum(),
        }
    }

    /// Leaf attributes in depth-first order. An attribute may occur more than once.
    pub fn leaves(&self) -> Vec<Attribute<F>> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<Attribute<F>>) {
        match self {
            AccessPolicy::Leaf(attribute) => out.push(*attribute),
            AccessPolicy::Gate { children, .. } => {
                children.iter().for_each(|child| child.collect_leaves(out))
            }
        }
    }

    /// The distinct attributes mentioned anywhere in the tree.
    pub fn attributes(&self) -> AttributeSet<F> {
        self.leaves().into_iter().collect()
    }

    pub fn is_satisfied_by(&self, attributes: &AttributeSet<F>) -> bool {
        match self {
            AccessPolicy::Leaf(attribute) => attributes.contains(attribute),
            AccessPolicy::Gate {
                threshold,
                children,
            } => {
                children
                    .iter()
                    .filter(|child| child.is_satisfied_by(attributes))
                    .count()
                    >= *threshold
            }
        }
    }

    /// Shares `secret` down the tree, returning one share per leaf in depth-first order.
    ///
    /// Each gate with threshold `k` gets a random polynomial of degree `k - 1`
    /// whose constant term is the gate's share; child `i` receives its value at `i`.
    pub fn share_secret<R: RngCore>(&self, secret: F, rng: &mut R) -> Vec<F> {
        let mut shares = Vec::with_capacity(self.leaf_count());
        self.share_into(secret, rng, &mut shares);
        shares
    }

    fn share_into<R: RngCore>(&self, secret: F, rng: &mut R, out: &mut Vec<F>) {
        match self {
            AccessPolicy::Leaf(_) => out.push(secret),
            AccessPolicy::Gate {
                threshold,
                children,
            } => {
                let polynomial = random_polynomial(secret, threshold - 1, rng);
                for (position, child) in children.iter().enumerate() {
                    let share = polynomial.evaluate(&F::from(position as u64 + 1));
                    child.share_into(share, rng, out);
                }
            }
        }
    }
}
