//! Error types for scrollstage_app

use thiserror::Error;

use scrollstage_core::{ConfigError, CoreError, SelectorError};

/// Errors raised while building or driving a stage
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A document operation failed
    #[error("document error: {0}")]
    Document(#[from] CoreError),
}

/// Result type for scrollstage_app operations
pub type Result<T> = std::result::Result<T, StageError>;
