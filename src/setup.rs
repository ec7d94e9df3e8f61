use ark_ec::{
    pairing::{Pairing, PairingOutput},
    CurveGroup, PrimeGroup, VariableBaseMSM,
};
use ark_ff::{Field, PrimeField};
use ark_std::{rand::RngCore, UniformRand};
use tracing::debug;

use crate::attributes::{Attribute, AttributeSet};
use crate::error::PredEncError;
use crate::security::SensitiveScalar;
use crate::utils::{lagrange_basis_at, random_unit};

/// Identifies one of the supported predicate encryption variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemeId {
    /// Exact identity match
    Identity,
    /// Threshold overlap of attribute sets
    Fuzzy,
    /// Key carries an access policy, ciphertext carries attributes
    KeyPolicy,
    /// Ciphertext carries an access policy, key carries attributes
    CiphertextPolicy,
}

impl SchemeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeId::Identity => "identity",
            SchemeId::Fuzzy => "fuzzy",
            SchemeId::KeyPolicy => "key-policy",
            SchemeId::CiphertextPolicy => "ciphertext-policy",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, PredEncError> {
        match tag {
            "identity" => Ok(SchemeId::Identity),
            "fuzzy" => Ok(SchemeId::Fuzzy),
            "key-policy" => Ok(SchemeId::KeyPolicy),
            "ciphertext-policy" => Ok(SchemeId::CiphertextPolicy),
            other => Err(PredEncError::SerializationFormat(format!(
                "unknown scheme tag '{}'",
                other
            ))),
        }
    }
}

/// Parameters chosen at setup time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupConfig {
    /// Maximum number of attributes in an attribute-set index (`n`)
    pub universe_size: usize,
    /// Minimum overlap required by the fuzzy scheme (`d`); 1 for every other scheme
    pub threshold: usize,
}

impl SetupConfig {
    pub fn new(universe_size: usize, threshold: usize) -> Self {
        SetupConfig {
            universe_size,
            threshold,
        }
    }

    /// Configuration for schemes that do not use an overlap threshold.
    pub fn with_universe(universe_size: usize) -> Self {
        SetupConfig::new(universe_size, 1)
    }

    pub fn validate(&self, scheme: SchemeId) -> Result<(), PredEncError> {
        if self.universe_size == 0 {
            return Err(PredEncError::InvalidParameter(
                "universe size must be at least 1".to_string(),
            ));
        }
        if self.threshold == 0 {
            return Err(PredEncError::InvalidParameter(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.threshold > self.universe_size {
            return Err(PredEncError::InvalidParameter(format!(
                "threshold ({}) must not exceed universe size ({})",
                self.threshold, self.universe_size
            )));
        }
        if scheme != SchemeId::Fuzzy && self.threshold != 1 {
            return Err(PredEncError::InvalidParameter(format!(
                "the {} scheme has no overlap threshold, got {}",
                scheme.as_str(),
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Public parameters produced once by setup and shared read-only afterwards.
///
/// `g1` is `g^y` for the identity, fuzzy and key-policy schemes and `g^β` for
/// the ciphertext-policy scheme. `blinding` is `Y = e(g, g2)^y` (resp. `e(g, g2)^α`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicParameters<E: Pairing> {
    pub scheme: SchemeId,
    pub universe_size: usize,
    pub threshold: usize,
    pub g: E::G1,
    pub g1: E::G1,
    pub g2: E::G2,
    /// Points `t_1..t_{n+1}` defining the attribute map `T`
    pub t: Vec<E::G2>,
    pub blinding: PairingOutput<E>,
}

/// The authority's secret. Never leaves the issuing authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MasterSecret<F: PrimeField> {
    scheme: SchemeId,
    y: SensitiveScalar<F>,
    beta: Option<SensitiveScalar<F>>,
}

impl<F: PrimeField> MasterSecret<F> {
    pub(crate) fn new(scheme: SchemeId, y: F, beta: Option<F>) -> Self {
        MasterSecret {
            scheme,
            y: SensitiveScalar::new(y),
            beta: beta.map(SensitiveScalar::new),
        }
    }

    pub fn scheme(&self) -> SchemeId {
        self.scheme
    }

    pub(crate) fn y(&self) -> F {
        *self.y.expose_secret()
    }

    pub(crate) fn beta(&self) -> Result<F, PredEncError> {
        self.beta
            .as_ref()
            .map(|beta| *beta.expose_secret())
            .ok_or_else(|| {
                PredEncError::InvalidKey(format!(
                    "{} master secret carries no β component",
                    self.scheme.as_str()
                ))
            })
    }

    pub(crate) fn has_beta(&self) -> bool {
        self.beta.is_some()
    }
}

/// Runs setup for `scheme`.
///
/// # Errors
/// Returns an error if the configuration is invalid for the scheme
pub fn setup<E: Pairing, R: RngCore>(
    scheme: SchemeId,
    config: &SetupConfig,
    rng: &mut R,
) -> Result<(PublicParameters<E>, MasterSecret<E::ScalarField>), PredEncError> {
    config.validate(scheme)?;

    let g = E::G1::generator();
    let g2 = E::G2::rand(rng);
    let t: Vec<E::G2> = (0..=config.universe_size)
        .map(|_| E::G2::rand(rng))
        .collect();
    let y: E::ScalarField = random_unit(rng);

    let (g1, blinding, msk) = match scheme {
        SchemeId::CiphertextPolicy => {
            let beta: E::ScalarField = random_unit(rng);
            (
                g * beta,
                E::pairing(g, g2) * y,
                MasterSecret::new(scheme, y, Some(beta)),
            )
        }
        _ => {
            let g1 = g * y;
            (g1, E::pairing(g1, g2), MasterSecret::new(scheme, y, None))
        }
    };

    debug!(
        scheme = scheme.as_str(),
        universe_size = config.universe_size,
        threshold = config.threshold,
        "generated public parameters"
    );

    Ok((
        PublicParameters {
            scheme,
            universe_size: config.universe_size,
            threshold: config.threshold,
            g,
            g1,
            g2,
            t,
            blinding,
        },
        msk,
    ))
}

impl<E: Pairing> PublicParameters<E> {
    pub fn config(&self) -> SetupConfig {
        SetupConfig::new(self.universe_size, self.threshold)
    }

    /// Evaluates the attribute map `T(x) = g2^{x^n} · Π_{j=1}^{n+1} t_j^{Δ_{j,N}(x)}`
    /// with `N = {1, .., n+1}`.
    pub fn hash_attribute(&self, attribute: &Attribute<E::ScalarField>) -> Result<E::G2, PredEncError> {
        let x = attribute.value();
        let n = self.universe_size;
        if self.t.len() != n + 1 {
            return Err(PredEncError::InvalidParameter(format!(
                "expected {} attribute map points, found {}",
                n + 1,
                self.t.len()
            )));
        }

        let points: Vec<E::ScalarField> = (1..=n as u64 + 1).map(|j| E::ScalarField::from(j)).collect();
        let mut scalars = Vec::with_capacity(n + 2);
        scalars.push(x.pow([n as u64]));
        for j in 0..points.len() {
            scalars.push(lagrange_basis_at(&points, j, x)?);
        }

        let mut bases = Vec::with_capacity(n + 2);
        bases.push(self.g2);
        bases.extend_from_slice(&self.t);
        let bases = E::G2::normalize_batch(&bases);

        E::G2::msm(&bases, &scalars).map_err(|e| {
            PredEncError::InvalidParameter(format!("MSM failed in attribute map: {:?}", e))
        })
    }

    /// Checks that an attribute-set index fits the universe bound.
    pub fn validate_attribute_set(&self, attributes: &AttributeSet<E::ScalarField>) -> Result<(), PredEncError> {
        if attributes.is_empty() {
            return Err(PredEncError::InvalidParameter(
                "attribute set must not be empty".to_string(),
            ));
        }
        if attributes.len() > self.universe_size {
            return Err(PredEncError::InvalidParameter(format!(
                "attribute set of size {} exceeds universe size {}",
                attributes.len(),
                self.universe_size
            )));
        }
        Ok(())
    }

    /// Checks that a master secret was produced by setup for this scheme.
    pub(crate) fn check_master_secret(&self, msk: &MasterSecret<E::ScalarField>) -> Result<(), PredEncError> {
        if msk.scheme() != self.scheme {
            return Err(PredEncError::InvalidKey(format!(
                "master secret belongs to the {} scheme, not {}",
                msk.scheme().as_str(),
                self.scheme.as_str()
            )));
        }
        Ok(())
    }
}
