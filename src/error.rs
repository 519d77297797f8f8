use thiserror::Error;

/// Failures of [`LayeredMap`](crate::LayeredMap) operations.
///
/// Keys are carried in their `Debug` form so the error is not generic over
/// the key type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayeredMapError {
    #[error("Key not found in any layer: {key}")]
    NotFound { key: String },
    #[error("Key not found in the innermost layer: {key}")]
    KeyNotInInnermost { key: String },
    #[error("Cannot drop the only remaining layer")]
    NoParent,
}

pub type Result<T> = std::result::Result<T, LayeredMapError>;
