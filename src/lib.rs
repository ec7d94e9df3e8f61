//! Predicate Encryption
//!
//! This library implements a family of pairing-based predicate encryption
//! schemes over a common threshold reconstruction engine:
//!
//! - **Identity**: exact identity match
//! - **Fuzzy**: a key for attribute set `ω` opens ciphertexts for `ω'` when
//!   `|ω ∩ ω'| ≥ d` (Sahai–Waters, large universe)
//! - **Key-policy ABE**: keys carry a tree of threshold gates, ciphertexts carry attributes
//! - **Ciphertext-policy ABE**: ciphertexts carry the policy, keys carry attributes
//!
//! ## Key Components
//!
//! - **Setup**: generate public parameters and the master secret
//! - **Reconstruction engine**: Lagrange interpolation at zero over a fixed subset of qualified indices
//! - **KEM**: encapsulate/decapsulate key material, derive symmetric keys, seal payloads
//! - **Distributed keys**: split a decryption key across servers and recombine any `t` shares
//! - **Representation**: context-dependent persistence of every object
//!
//! ## Example
//!
//! ```rust,no_run
//! use ark_bls12_381::Bls12_381;
//! use predicate_encryption::{
//!     attributes::{attribute_set, CiphertextIndex, KeyIndex},
//!     encryption::PlainText,
//!     scheme::PredicateScheme,
//!     setup::{SchemeId, SetupConfig},
//! };
//!
//! type E = Bls12_381;
//!
//! let mut rng = ark_std::test_rng();
//!
//! // Universe of 6 attributes, overlap threshold 3
//! let (pe, msk) = PredicateScheme::<E>::setup(SchemeId::Fuzzy, &SetupConfig::new(6, 3), &mut rng).unwrap();
//!
//! let dk = pe
//!     .generate_decryption_key(&msk, &KeyIndex::Attributes(attribute_set(&["A", "B", "C", "E"])), &mut rng)
//!     .unwrap();
//! let ek = pe
//!     .generate_encryption_key(&CiphertextIndex::Attributes(attribute_set(&["A", "B", "C", "D"])))
//!     .unwrap();
//!
//! let m = PlainText::random(&mut rng);
//! let ct = pe.encrypt(&m, &ek, &mut rng).unwrap();
//! assert_eq!(pe.decrypt(&ct, &dk).unwrap(), m);
//! ```

pub mod attributes;
pub mod decryption;
pub mod distributed;
pub mod encryption;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod kem;
pub mod policy;
pub mod repr;
pub mod scheme;
pub mod schemes;
pub mod security;
pub mod setup;
pub mod utils;

pub use error::PredEncError;
