//! Context-dependent persistence
//!
//! Every persisted object maps to a [`Representation`]: a nested,
//! self-describing key/value tree whose leaves are integers, strings and
//! byte strings. Group and field elements are stored as their canonical
//! compressed encodings. Turning a representation back into an object needs
//! the matching [`PublicParameters`], which fix the scheme, the attribute
//! universe and the groups the encoded elements must belong to.
//!
//! Representations travel as bytes through `bincode`.

use std::collections::BTreeMap;

use ark_ec::pairing::Pairing;
use ark_ff::PrimeField;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Serialize};

use crate::attributes::{Attribute, AttributeSet, CiphertextIndex, KeyIndex};
use crate::decryption::DecryptionKey;
use crate::distributed::{KeyShare, PartialKeyMaterial};
use crate::encryption::{CipherText, EncapsulatedKey, EncryptionKey, PlainText};
use crate::engine::KeyComponent;
use crate::error::PredEncError;
use crate::hybrid::{HybridCiphertext, NONCE_SIZE};
use crate::policy::AccessPolicy;
use crate::schemes::{
    ciphertext_policy::{CiphertextPolicyKey, LeafCiphertext, PolicyCiphertext},
    fuzzy::FuzzyKey,
    identity::{IdentityCiphertext, IdentityKey},
    key_policy::KeyPolicyKey,
    AttributeCiphertext,
};
use crate::setup::{MasterSecret, PublicParameters, SchemeId, SetupConfig};

/// A tagged nested value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Representation {
    Int(u64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Representation>),
    Map(BTreeMap<String, Representation>),
}

impl Representation {
    pub fn map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Representation)>,
    {
        Representation::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        )
    }

    fn kind(&self) -> &'static str {
        match self {
            Representation::Int(_) => "int",
            Representation::Str(_) => "string",
            Representation::Bytes(_) => "bytes",
            Representation::List(_) => "list",
            Representation::Map(_) => "map",
        }
    }

    fn unexpected(&self, expected: &str) -> PredEncError {
        PredEncError::SerializationFormat(format!("expected {}, found {}", expected, self.kind()))
    }

    /// Looks up `key` in a map.
    pub fn field(&self, key: &str) -> Result<&Representation, PredEncError> {
        match self {
            Representation::Map(entries) => entries
                .get(key)
                .ok_or_else(|| PredEncError::SerializationFormat(format!("missing field '{}'", key))),
            other => Err(other.unexpected("map")),
        }
    }

    pub fn as_int(&self) -> Result<u64, PredEncError> {
        match self {
            Representation::Int(value) => Ok(*value),
            other => Err(other.unexpected("int")),
        }
    }

    pub fn as_str(&self) -> Result<&str, PredEncError> {
        match self {
            Representation::Str(value) => Ok(value),
            other => Err(other.unexpected("string")),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], PredEncError> {
        match self {
            Representation::Bytes(value) => Ok(value),
            other => Err(other.unexpected("bytes")),
        }
    }

    pub fn as_list(&self) -> Result<&[Representation], PredEncError> {
        match self {
            Representation::List(value) => Ok(value),
            other => Err(other.unexpected("list")),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PredEncError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PredEncError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Objects that can be written out as a [`Representation`].
pub trait Representable {
    fn to_repr(&self) -> Result<Representation, PredEncError>;

    fn to_bytes(&self) -> Result<Vec<u8>, PredEncError> {
        self.to_repr()?.to_bytes()
    }
}

/// Objects that can be read back given the public parameters they belong to.
pub trait Restore<E: Pairing>: Sized {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError>;

    fn from_bytes(bytes: &[u8], pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        Self::from_repr(&Representation::from_bytes(bytes)?, pp)
    }
}

fn encode<T: CanonicalSerialize>(value: &T) -> Result<Representation, PredEncError> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value.serialize_compressed(&mut bytes)?;
    Ok(Representation::Bytes(bytes))
}

fn decode<T: CanonicalDeserialize>(repr: &Representation) -> Result<T, PredEncError> {
    let mut reader = repr.as_bytes()?;
    let value = T::deserialize_compressed(&mut reader)?;
    if !reader.is_empty() {
        return Err(PredEncError::SerializationFormat(format!(
            "{} trailing bytes after element",
            reader.len()
        )));
    }
    Ok(value)
}

fn int(value: usize) -> Representation {
    Representation::Int(value as u64)
}

fn decode_usize(repr: &Representation) -> Result<usize, PredEncError> {
    usize::try_from(repr.as_int()?)
        .map_err(|_| PredEncError::SerializationFormat("integer out of range".to_string()))
}

fn tag(value: &str) -> Representation {
    Representation::Str(value.to_string())
}

fn expect_type(repr: &Representation, expected: &str) -> Result<(), PredEncError> {
    let found = repr.field("type")?.as_str()?;
    if found != expected {
        return Err(PredEncError::SerializationFormat(format!(
            "expected a {}, found a {}",
            expected, found
        )));
    }
    Ok(())
}

/// Reads the scheme tag and checks it against the public parameters.
fn expect_scheme<E: Pairing>(repr: &Representation, pp: &PublicParameters<E>) -> Result<SchemeId, PredEncError> {
    let scheme = SchemeId::from_tag(repr.field("scheme")?.as_str()?)?;
    if scheme != pp.scheme {
        return Err(PredEncError::SerializationFormat(format!(
            "object belongs to the {} scheme but the parameters are for {}",
            scheme.as_str(),
            pp.scheme.as_str()
        )));
    }
    Ok(scheme)
}

fn context_error(err: PredEncError) -> PredEncError {
    match err {
        PredEncError::SerializationFormat(_) => err,
        other => PredEncError::SerializationFormat(other.to_string()),
    }
}

fn attribute_set_repr<F: PrimeField>(attributes: &AttributeSet<F>) -> Result<Representation, PredEncError> {
    Ok(Representation::List(
        attributes
            .iter()
            .map(|attribute| encode(&attribute.value()))
            .collect::<Result<_, _>>()?,
    ))
}

fn attribute_from_repr<F: PrimeField>(repr: &Representation) -> Result<Attribute<F>, PredEncError> {
    Ok(Attribute::new(decode(repr)?))
}

/// Decodes an attribute set; entries must be strictly ascending so the
/// encoding stays canonical.
fn attribute_set_from_repr<F: PrimeField>(repr: &Representation) -> Result<AttributeSet<F>, PredEncError> {
    let items: Vec<Attribute<F>> = repr
        .as_list()?
        .iter()
        .map(attribute_from_repr)
        .collect::<Result<_, _>>()?;
    if items.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(PredEncError::SerializationFormat(
            "attribute set entries must be strictly ascending".to_string(),
        ));
    }
    Ok(items.into_iter().collect())
}

fn policy_repr<F: PrimeField>(policy: &AccessPolicy<F>) -> Result<Representation, PredEncError> {
    match policy {
        AccessPolicy::Leaf(attribute) => Ok(Representation::map([
            ("type", tag("leaf")),
            ("attribute", encode(&attribute.value())?),
        ])),
        AccessPolicy::Gate {
            threshold,
            children,
        } => Ok(Representation::map([
            ("type", tag("gate")),
            ("threshold", int(*threshold)),
            (
                "children",
                Representation::List(children.iter().map(policy_repr).collect::<Result<_, _>>()?),
            ),
        ])),
    }
}

fn policy_from_repr<F: PrimeField>(repr: &Representation) -> Result<AccessPolicy<F>, PredEncError> {
    match repr.field("type")?.as_str()? {
        "leaf" => Ok(AccessPolicy::leaf(attribute_from_repr(repr.field("attribute")?)?)),
        "gate" => {
            let threshold = decode_usize(repr.field("threshold")?)?;
            let children = repr
                .field("children")?
                .as_list()?
                .iter()
                .map(policy_from_repr)
                .collect::<Result<Vec<_>, _>>()?;
            AccessPolicy::gate(threshold, children).map_err(context_error)
        }
        other => Err(PredEncError::SerializationFormat(format!(
            "unknown policy node '{}'",
            other
        ))),
    }
}

fn component_repr<E: Pairing>(component: &KeyComponent<E>) -> Result<Representation, PredEncError> {
    Ok(Representation::map([
        ("r", encode(&component.r)?),
        ("d", encode(&component.d)?),
    ]))
}

fn component_from_repr<E: Pairing>(repr: &Representation) -> Result<KeyComponent<E>, PredEncError> {
    Ok(KeyComponent {
        r: decode(repr.field("r")?)?,
        d: decode(repr.field("d")?)?,
    })
}

fn attribute_components_repr<E: Pairing>(
    components: &BTreeMap<Attribute<E::ScalarField>, KeyComponent<E>>,
) -> Result<Representation, PredEncError> {
    Ok(Representation::List(
        components
            .iter()
            .map(|(attribute, component)| {
                Ok(Representation::map([
                    ("attribute", encode(&attribute.value())?),
                    ("component", component_repr(component)?),
                ]))
            })
            .collect::<Result<_, PredEncError>>()?,
    ))
}

/// Decodes per-attribute key components, which must cover exactly `attributes`.
fn attribute_components_from_repr<E: Pairing>(
    repr: &Representation,
    attributes: &AttributeSet<E::ScalarField>,
) -> Result<BTreeMap<Attribute<E::ScalarField>, KeyComponent<E>>, PredEncError> {
    let components = repr
        .as_list()?
        .iter()
        .map(|entry| {
            Ok((
                attribute_from_repr(entry.field("attribute")?)?,
                component_from_repr(entry.field("component")?)?,
            ))
        })
        .collect::<Result<BTreeMap<_, _>, PredEncError>>()?;
    if components.len() != attributes.len() || !components.keys().eq(attributes.iter()) {
        return Err(PredEncError::SerializationFormat(
            "key components do not match the key's attributes".to_string(),
        ));
    }
    Ok(components)
}

impl<E: Pairing> Representable for PublicParameters<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("public-parameters")),
            ("scheme", tag(self.scheme.as_str())),
            ("universe_size", int(self.universe_size)),
            ("threshold", int(self.threshold)),
            ("g", encode(&self.g)?),
            ("g1", encode(&self.g1)?),
            ("g2", encode(&self.g2)?),
            (
                "t",
                Representation::List(self.t.iter().map(encode).collect::<Result<_, _>>()?),
            ),
            ("blinding", encode(&self.blinding)?),
        ]))
    }
}

impl<E: Pairing> PublicParameters<E> {
    /// Public parameters are the context for everything else and restore on their own.
    pub fn from_repr(repr: &Representation) -> Result<Self, PredEncError> {
        expect_type(repr, "public-parameters")?;
        let scheme = SchemeId::from_tag(repr.field("scheme")?.as_str()?)?;
        let config = SetupConfig::new(
            decode_usize(repr.field("universe_size")?)?,
            decode_usize(repr.field("threshold")?)?,
        );
        config.validate(scheme).map_err(context_error)?;

        let t = repr
            .field("t")?
            .as_list()?
            .iter()
            .map(decode)
            .collect::<Result<Vec<E::G2>, _>>()?;
        if t.len() != config.universe_size + 1 {
            return Err(PredEncError::SerializationFormat(format!(
                "expected {} attribute map points, found {}",
                config.universe_size + 1,
                t.len()
            )));
        }

        Ok(PublicParameters {
            scheme,
            universe_size: config.universe_size,
            threshold: config.threshold,
            g: decode(repr.field("g")?)?,
            g1: decode(repr.field("g1")?)?,
            g2: decode(repr.field("g2")?)?,
            t,
            blinding: decode(repr.field("blinding")?)?,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PredEncError> {
        Self::from_repr(&Representation::from_bytes(bytes)?)
    }
}

impl<F: PrimeField> Representable for MasterSecret<F> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        let mut entries = vec![
            ("type", tag("master-secret")),
            ("scheme", tag(self.scheme().as_str())),
            ("y", encode(&self.y())?),
        ];
        if self.has_beta() {
            entries.push(("beta", encode(&self.beta()?)?));
        }
        Ok(Representation::map(entries))
    }
}

impl<E: Pairing> Restore<E> for MasterSecret<E::ScalarField> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "master-secret")?;
        let scheme = expect_scheme(repr, pp)?;
        let beta = match scheme {
            SchemeId::CiphertextPolicy => Some(decode(repr.field("beta")?)?),
            _ => None,
        };
        Ok(MasterSecret::new(scheme, decode(repr.field("y")?)?, beta))
    }
}

impl<F: PrimeField> Representable for AccessPolicy<F> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        policy_repr(self)
    }
}

impl<E: Pairing> Restore<E> for AccessPolicy<E::ScalarField> {
    fn from_repr(repr: &Representation, _pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        policy_from_repr(repr)
    }
}

impl<F: PrimeField> Representable for KeyIndex<F> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        let value = match self {
            KeyIndex::Identity(identity) => encode(&identity.value())?,
            KeyIndex::Attributes(attributes) => attribute_set_repr(attributes)?,
            KeyIndex::Policy(policy) => policy_repr(policy)?,
        };
        Ok(Representation::map([("kind", tag(self.kind())), ("value", value)]))
    }
}

impl<E: Pairing> Restore<E> for KeyIndex<E::ScalarField> {
    fn from_repr(repr: &Representation, _pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        let value = repr.field("value")?;
        match repr.field("kind")?.as_str()? {
            "identity" => Ok(KeyIndex::Identity(attribute_from_repr(value)?)),
            "attributes" => Ok(KeyIndex::Attributes(attribute_set_from_repr(value)?)),
            "policy" => Ok(KeyIndex::Policy(policy_from_repr(value)?)),
            other => Err(PredEncError::SerializationFormat(format!(
                "unknown key index kind '{}'",
                other
            ))),
        }
    }
}

impl<F: PrimeField> Representable for CiphertextIndex<F> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        let value = match self {
            CiphertextIndex::Identity(identity) => encode(&identity.value())?,
            CiphertextIndex::Attributes(attributes) => attribute_set_repr(attributes)?,
            CiphertextIndex::Policy(policy) => policy_repr(policy)?,
        };
        Ok(Representation::map([("kind", tag(self.kind())), ("value", value)]))
    }
}

impl<E: Pairing> Restore<E> for CiphertextIndex<E::ScalarField> {
    fn from_repr(repr: &Representation, _pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        let value = repr.field("value")?;
        match repr.field("kind")?.as_str()? {
            "identity" => Ok(CiphertextIndex::Identity(attribute_from_repr(value)?)),
            "attributes" => Ok(CiphertextIndex::Attributes(attribute_set_from_repr(value)?)),
            "policy" => Ok(CiphertextIndex::Policy(policy_from_repr(value)?)),
            other => Err(PredEncError::SerializationFormat(format!(
                "unknown ciphertext index kind '{}'",
                other
            ))),
        }
    }
}

impl<F: PrimeField> Representable for EncryptionKey<F> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("encryption-key")),
            ("scheme", tag(self.scheme.as_str())),
            ("index", self.index.to_repr()?),
        ]))
    }
}

impl<E: Pairing> Restore<E> for EncryptionKey<E::ScalarField> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "encryption-key")?;
        Ok(EncryptionKey {
            scheme: expect_scheme(repr, pp)?,
            index: CiphertextIndex::from_repr(repr.field("index")?, pp)?,
        })
    }
}

impl<E: Pairing> Representable for DecryptionKey<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        let mut entries = vec![
            ("type", tag("decryption-key")),
            ("scheme", tag(self.scheme().as_str())),
        ];
        match self {
            DecryptionKey::Identity(key) => {
                entries.push(("identity", encode(&key.identity.value())?));
                entries.push(("component", component_repr(&key.component)?));
            }
            DecryptionKey::Fuzzy(key) => {
                entries.push(("attributes", attribute_set_repr(&key.attributes)?));
                entries.push(("components", attribute_components_repr(&key.components)?));
            }
            DecryptionKey::KeyPolicy(key) => {
                entries.push(("policy", policy_repr(&key.policy)?));
                entries.push((
                    "leaves",
                    Representation::List(key.leaves.iter().map(component_repr).collect::<Result<_, _>>()?),
                ));
            }
            DecryptionKey::CiphertextPolicy(key) => {
                entries.push(("attributes", attribute_set_repr(&key.attributes)?));
                entries.push(("d", encode(&key.d)?));
                entries.push(("components", attribute_components_repr(&key.components)?));
            }
        }
        Ok(Representation::map(entries))
    }
}

impl<E: Pairing> Restore<E> for DecryptionKey<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "decryption-key")?;
        match expect_scheme(repr, pp)? {
            SchemeId::Identity => Ok(DecryptionKey::Identity(IdentityKey {
                identity: attribute_from_repr(repr.field("identity")?)?,
                component: component_from_repr(repr.field("component")?)?,
            })),
            SchemeId::Fuzzy => {
                let attributes = attribute_set_from_repr(repr.field("attributes")?)?;
                pp.validate_attribute_set(&attributes).map_err(context_error)?;
                let components = attribute_components_from_repr(repr.field("components")?, &attributes)?;
                Ok(DecryptionKey::Fuzzy(FuzzyKey {
                    attributes,
                    components,
                }))
            }
            SchemeId::KeyPolicy => {
                let policy = policy_from_repr(repr.field("policy")?)?;
                let leaves = repr
                    .field("leaves")?
                    .as_list()?
                    .iter()
                    .map(component_from_repr)
                    .collect::<Result<Vec<_>, _>>()?;
                if leaves.len() != policy.leaf_count() {
                    return Err(PredEncError::SerializationFormat(format!(
                        "{} leaf components for a policy with {} leaves",
                        leaves.len(),
                        policy.leaf_count()
                    )));
                }
                Ok(DecryptionKey::KeyPolicy(KeyPolicyKey { policy, leaves }))
            }
            SchemeId::CiphertextPolicy => {
                let attributes = attribute_set_from_repr(repr.field("attributes")?)?;
                pp.validate_attribute_set(&attributes).map_err(context_error)?;
                let components = attribute_components_from_repr(repr.field("components")?, &attributes)?;
                Ok(DecryptionKey::CiphertextPolicy(CiphertextPolicyKey {
                    attributes,
                    d: decode(repr.field("d")?)?,
                    components,
                }))
            }
        }
    }
}

fn attribute_ciphertext_repr<E: Pairing>(
    ct: &AttributeCiphertext<E>,
    entries: &mut Vec<(&'static str, Representation)>,
) -> Result<(), PredEncError> {
    entries.push(("attributes", attribute_set_repr(&ct.attributes)?));
    entries.push(("e_two_prime", encode(&ct.e_two_prime)?));
    entries.push((
        "elements",
        Representation::List(
            ct.attributes
                .iter()
                .map(|attribute| {
                    let element = ct.elements.get(attribute).ok_or_else(|| {
                        PredEncError::SerializationFormat("ciphertext is missing an attribute element".to_string())
                    })?;
                    encode(element)
                })
                .collect::<Result<_, _>>()?,
        ),
    ));
    Ok(())
}

fn attribute_ciphertext_from_repr<E: Pairing>(
    repr: &Representation,
    pp: &PublicParameters<E>,
) -> Result<AttributeCiphertext<E>, PredEncError> {
    let attributes = attribute_set_from_repr(repr.field("attributes")?)?;
    pp.validate_attribute_set(&attributes).map_err(context_error)?;

    let elements = repr.field("elements")?.as_list()?;
    if elements.len() != attributes.len() {
        return Err(PredEncError::SerializationFormat(format!(
            "{} elements for {} attributes",
            elements.len(),
            attributes.len()
        )));
    }
    let elements = attributes
        .iter()
        .zip(elements)
        .map(|(attribute, element)| Ok((*attribute, decode(element)?)))
        .collect::<Result<BTreeMap<_, _>, PredEncError>>()?;

    Ok(AttributeCiphertext {
        attributes,
        e_two_prime: decode(repr.field("e_two_prime")?)?,
        elements,
    })
}

impl<E: Pairing> Representable for EncapsulatedKey<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        let mut entries = vec![
            ("type", tag("encapsulated-key")),
            ("scheme", tag(self.scheme().as_str())),
        ];
        match self {
            EncapsulatedKey::Identity(ct) => {
                entries.push(("identity", encode(&ct.identity.value())?));
                entries.push(("c1", encode(&ct.c1)?));
                entries.push(("c2", encode(&ct.c2)?));
            }
            EncapsulatedKey::Fuzzy(ct) | EncapsulatedKey::KeyPolicy(ct) => {
                attribute_ciphertext_repr(ct, &mut entries)?
            }
            EncapsulatedKey::CiphertextPolicy(ct) => {
                entries.push(("policy", policy_repr(&ct.policy)?));
                entries.push(("c", encode(&ct.c)?));
                entries.push((
                    "leaves",
                    Representation::List(
                        ct.leaves
                            .iter()
                            .map(|leaf| {
                                Ok(Representation::map([
                                    ("c", encode(&leaf.c)?),
                                    ("c_prime", encode(&leaf.c_prime)?),
                                ]))
                            })
                            .collect::<Result<_, PredEncError>>()?,
                    ),
                ));
            }
        }
        Ok(Representation::map(entries))
    }
}

impl<E: Pairing> Restore<E> for EncapsulatedKey<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "encapsulated-key")?;
        match expect_scheme(repr, pp)? {
            SchemeId::Identity => Ok(EncapsulatedKey::Identity(IdentityCiphertext {
                identity: attribute_from_repr(repr.field("identity")?)?,
                c1: decode(repr.field("c1")?)?,
                c2: decode(repr.field("c2")?)?,
            })),
            SchemeId::Fuzzy => Ok(EncapsulatedKey::Fuzzy(attribute_ciphertext_from_repr(repr, pp)?)),
            SchemeId::KeyPolicy => Ok(EncapsulatedKey::KeyPolicy(attribute_ciphertext_from_repr(repr, pp)?)),
            SchemeId::CiphertextPolicy => {
                let policy = policy_from_repr(repr.field("policy")?)?;
                let leaves = repr
                    .field("leaves")?
                    .as_list()?
                    .iter()
                    .map(|leaf| {
                        Ok(LeafCiphertext {
                            c: decode(leaf.field("c")?)?,
                            c_prime: decode(leaf.field("c_prime")?)?,
                        })
                    })
                    .collect::<Result<Vec<_>, PredEncError>>()?;
                if leaves.len() != policy.leaf_count() {
                    return Err(PredEncError::SerializationFormat(format!(
                        "{} leaf ciphertexts for a policy with {} leaves",
                        leaves.len(),
                        policy.leaf_count()
                    )));
                }
                Ok(EncapsulatedKey::CiphertextPolicy(PolicyCiphertext {
                    policy,
                    c: decode(repr.field("c")?)?,
                    leaves,
                }))
            }
        }
    }
}

impl<E: Pairing> Representable for CipherText<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("ciphertext")),
            ("blinded", encode(&self.blinded)?),
            ("encapsulated", self.encapsulated.to_repr()?),
        ]))
    }
}

impl<E: Pairing> Restore<E> for CipherText<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "ciphertext")?;
        Ok(CipherText {
            blinded: decode(repr.field("blinded")?)?,
            encapsulated: EncapsulatedKey::from_repr(repr.field("encapsulated")?, pp)?,
        })
    }
}

impl<E: Pairing> Representable for PlainText<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("plaintext")),
            ("value", encode(&self.value())?),
        ]))
    }
}

impl<E: Pairing> Restore<E> for PlainText<E> {
    fn from_repr(repr: &Representation, _pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "plaintext")?;
        Ok(PlainText::new(decode(repr.field("value")?)?))
    }
}

fn decode_server_id(repr: &Representation) -> Result<u32, PredEncError> {
    match u32::try_from(repr.as_int()?) {
        Ok(0) => Err(PredEncError::SerializationFormat("server ids start at 1".to_string())),
        Ok(id) => Ok(id),
        Err(_) => Err(PredEncError::SerializationFormat("server id out of range".to_string())),
    }
}

fn decode_share_threshold(repr: &Representation) -> Result<usize, PredEncError> {
    match decode_usize(repr)? {
        0 => Err(PredEncError::SerializationFormat(
            "share threshold must be at least 1".to_string(),
        )),
        threshold => Ok(threshold),
    }
}

impl<E: Pairing> Representable for KeyShare<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("key-share")),
            ("server_id", Representation::Int(self.server_id as u64)),
            ("threshold", int(self.threshold)),
            ("key", self.key.to_repr()?),
        ]))
    }
}

impl<E: Pairing> Restore<E> for KeyShare<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "key-share")?;
        Ok(KeyShare {
            server_id: decode_server_id(repr.field("server_id")?)?,
            threshold: decode_share_threshold(repr.field("threshold")?)?,
            key: DecryptionKey::from_repr(repr.field("key")?, pp)?,
        })
    }
}

impl<E: Pairing> Representable for PartialKeyMaterial<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("partial-key-material")),
            ("scheme", tag(self.scheme.as_str())),
            ("server_id", Representation::Int(self.server_id as u64)),
            ("threshold", int(self.threshold)),
            ("key_index", self.key_index.to_repr()?),
            ("encapsulation", Representation::Bytes(self.encapsulation.clone())),
            ("element", encode(&self.element)?),
        ]))
    }
}

impl<E: Pairing> Restore<E> for PartialKeyMaterial<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "partial-key-material")?;
        let encapsulation = repr.field("encapsulation")?.as_bytes()?;
        if encapsulation.len() != 64 {
            return Err(PredEncError::SerializationFormat(
                "encapsulation digest must be 64 bytes".to_string(),
            ));
        }
        Ok(PartialKeyMaterial {
            server_id: decode_server_id(repr.field("server_id")?)?,
            threshold: decode_share_threshold(repr.field("threshold")?)?,
            scheme: expect_scheme(repr, pp)?,
            key_index: KeyIndex::from_repr(repr.field("key_index")?, pp)?,
            encapsulation: encapsulation.to_vec(),
            element: decode(repr.field("element")?)?,
        })
    }
}

impl<E: Pairing> Representable for HybridCiphertext<E> {
    fn to_repr(&self) -> Result<Representation, PredEncError> {
        Ok(Representation::map([
            ("type", tag("hybrid-ciphertext")),
            ("encapsulated", self.encapsulated.to_repr()?),
            ("nonce", Representation::Bytes(self.nonce.to_vec())),
            ("payload", Representation::Bytes(self.payload.clone())),
        ]))
    }
}

impl<E: Pairing> Restore<E> for HybridCiphertext<E> {
    fn from_repr(repr: &Representation, pp: &PublicParameters<E>) -> Result<Self, PredEncError> {
        expect_type(repr, "hybrid-ciphertext")?;
        let nonce: [u8; NONCE_SIZE] = repr
            .field("nonce")?
            .as_bytes()?
            .try_into()
            .map_err(|_| PredEncError::SerializationFormat(format!("nonce must be {} bytes", NONCE_SIZE)))?;
        Ok(HybridCiphertext {
            encapsulated: EncapsulatedKey::from_repr(repr.field("encapsulated")?, pp)?,
            nonce,
            payload: repr.field("payload")?.as_bytes()?.to_vec(),
        })
    }
}
