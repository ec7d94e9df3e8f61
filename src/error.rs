//! Error types for the predicate encryption library
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredEncError {
    /// Key, ciphertext or master secret does not belong to the scheme invoked
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    /// Fewer qualified indices than the reconstruction threshold
    #[error("Insufficient attributes: need at least {required}, got {got}")]
    InsufficientAttributes { required: usize, got: usize },
    /// The decryption key does not satisfy the ciphertext's predicate
    #[error("Unqualified key: {0}")]
    UnqualifiedKey(String),
    /// Preconditions for combining distributed key shares are violated
    #[error("Invalid share set: {0}")]
    InvalidShareSet(String),
    /// Malformed or context-mismatched representation
    #[error("Serialization format error: {0}")]
    SerializationFormat(String),
    /// Invalid setup or configuration parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Lagrange interpolation over non-distinct points
    #[error("Interpolation error: {0}")]
    Interpolation(String),
    /// Symmetric encryption or authentication failure
    #[error("Symmetric cipher error: {0}")]
    Symmetric(String),
}

impl From<ark_serialize::SerializationError> for PredEncError {
    fn from(err: ark_serialize::SerializationError) -> Self {
        PredEncError::SerializationFormat(err.to_string())
    }
}

impl From<bincode::Error> for PredEncError {
    fn from(err: bincode::Error) -> Self {
        PredEncError::SerializationFormat(err.to_string())
    }
}
