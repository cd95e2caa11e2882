//! Core error types

use thiserror::Error;

use crate::document::ElementId;

/// Selector parse errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector is not in the supported subset
    #[error("invalid selector `{selector}` at offset {position}")]
    Invalid { selector: String, position: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read a configuration file
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration is not valid TOML for [`StageConfig`](crate::config::StageConfig)
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// A configured selector does not parse
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Document and model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The element was removed or never existed
    #[error("element {0:?} is not attached to the document")]
    UnknownElement(ElementId),

    #[error(transparent)]
    Selector(#[from] SelectorError),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
