use std::hash::{Hash, Hasher};

use ark_ec::pairing::Pairing;

use crate::attributes::KeyIndex;
use crate::engine::KeyComponent;
use crate::error::PredEncError;
use crate::schemes::{
    ciphertext_policy::CiphertextPolicyKey, fuzzy::FuzzyKey, identity::IdentityKey,
    key_policy::KeyPolicyKey,
};
use crate::setup::SchemeId;

/// A decryption key, tagged by the scheme that issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecryptionKey<E: Pairing> {
    Identity(IdentityKey<E>),
    Fuzzy(FuzzyKey<E>),
    KeyPolicy(KeyPolicyKey<E>),
    CiphertextPolicy(CiphertextPolicyKey<E>),
}

impl<E: Pairing> DecryptionKey<E> {
    pub fn scheme(&self) -> SchemeId {
        match self {
            DecryptionKey::Identity(_) => SchemeId::Identity,
            DecryptionKey::Fuzzy(_) => SchemeId::Fuzzy,
            DecryptionKey::KeyPolicy(_) => SchemeId::KeyPolicy,
            DecryptionKey::CiphertextPolicy(_) => SchemeId::CiphertextPolicy,
        }
    }

    /// The index this key was issued for.
    pub fn key_index(&self) -> KeyIndex<E::ScalarField> {
        match self {
            DecryptionKey::Identity(key) => KeyIndex::Identity(key.identity),
            DecryptionKey::Fuzzy(key) => KeyIndex::Attributes(key.attributes.clone()),
            DecryptionKey::KeyPolicy(key) => KeyIndex::Policy(key.policy.clone()),
            DecryptionKey::CiphertextPolicy(key) => KeyIndex::Attributes(key.attributes.clone()),
        }
    }

    /// Flattens the key into its `G1` and `G2` elements in a fixed order.
    ///
    /// Decapsulation is linear in these elements, which is what lets
    /// distributed shares be combined component-wise.
    pub fn group_components(&self) -> (Vec<E::G1>, Vec<E::G2>) {
        match self {
            DecryptionKey::Identity(key) => (vec![key.component.r], vec![key.component.d]),
            DecryptionKey::Fuzzy(key) => split_components(key.components.values()),
            DecryptionKey::KeyPolicy(key) => split_components(key.leaves.iter()),
            DecryptionKey::CiphertextPolicy(key) => {
                let (g1, mut rest) = split_components(key.components.values());
                let mut g2 = Vec::with_capacity(rest.len() + 1);
                g2.push(key.d);
                g2.append(&mut rest);
                (g1, g2)
            }
        }
    }

    /// Rebuilds a key of the same shape with its group elements replaced.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the element counts do not match this key's shape
    pub fn with_group_components(&self, g1: &[E::G1], g2: &[E::G2]) -> Result<Self, PredEncError> {
        let (expected_g1, expected_g2) = self.group_component_counts();
        if g1.len() != expected_g1 || g2.len() != expected_g2 {
            return Err(PredEncError::InvalidKey(format!(
                "expected {} G1 and {} G2 elements, got {} and {}",
                expected_g1,
                expected_g2,
                g1.len(),
                g2.len()
            )));
        }

        let rebuilt = match self {
            DecryptionKey::Identity(key) => DecryptionKey::Identity(IdentityKey {
                identity: key.identity,
                component: KeyComponent { r: g1[0], d: g2[0] },
            }),
            DecryptionKey::Fuzzy(key) => DecryptionKey::Fuzzy(FuzzyKey {
                attributes: key.attributes.clone(),
                components: key
                    .components
                    .keys()
                    .zip(merge_components(g1, g2))
                    .map(|(attribute, component)| (*attribute, component))
                    .collect(),
            }),
            DecryptionKey::KeyPolicy(key) => DecryptionKey::KeyPolicy(KeyPolicyKey {
                policy: key.policy.clone(),
                leaves: merge_components(g1, g2).collect(),
            }),
            DecryptionKey::CiphertextPolicy(key) => DecryptionKey::CiphertextPolicy(CiphertextPolicyKey {
                attributes: key.attributes.clone(),
                d: g2[0],
                components: key
                    .components
                    .keys()
                    .zip(merge_components(g1, &g2[1..]))
                    .map(|(attribute, component)| (*attribute, component))
                    .collect(),
            }),
        };
        Ok(rebuilt)
    }

    fn group_component_counts(&self) -> (usize, usize) {
        match self {
            DecryptionKey::Identity(_) => (1, 1),
            DecryptionKey::Fuzzy(key) => (key.components.len(), key.components.len()),
            DecryptionKey::KeyPolicy(key) => (key.leaves.len(), key.leaves.len()),
            DecryptionKey::CiphertextPolicy(key) => (key.components.len(), key.components.len() + 1),
        }
    }
}

fn split_components<'a, E: Pairing>(
    components: impl Iterator<Item = &'a KeyComponent<E>>,
) -> (Vec<E::G1>, Vec<E::G2>) {
    components.map(|c| (c.r, c.d)).unzip()
}

fn merge_components<'a, E: Pairing>(
    g1: &'a [E::G1],
    g2: &'a [E::G2],
) -> impl Iterator<Item = KeyComponent<E>> + 'a {
    g1.iter().zip(g2).map(|(r, d)| KeyComponent { r: *r, d: *d })
}

impl<E: Pairing> Hash for DecryptionKey<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.scheme().hash(state);
        match self {
            DecryptionKey::Identity(key) => key.hash(state),
            DecryptionKey::Fuzzy(key) => key.hash(state),
            DecryptionKey::KeyPolicy(key) => key.hash(state),
            DecryptionKey::CiphertextPolicy(key) => key.hash(state),
        }
    }
}
