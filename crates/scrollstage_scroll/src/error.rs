//! Scroll error types

use thiserror::Error;

/// Errors from the scroll crate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrollError {
    /// A boundary rule such as `top 50%` could not be parsed
    #[error("malformed boundary rule `{0}`")]
    Boundary(String),
}
