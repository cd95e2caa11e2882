//! Animation error types

use thiserror::Error;

/// Easing name errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EasingError {
    /// The name does not follow `family[.direction][(args)]`
    #[error("malformed easing `{0}`")]
    Syntax(String),

    /// The family is not one of the supported curves
    #[error("unknown easing `{0}`")]
    Unknown(String),
}

/// Timeline errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// A position parameter could not be parsed
    #[error("malformed timeline position `{0}`")]
    Position(String),

    #[error(transparent)]
    Easing(#[from] EasingError),
}
