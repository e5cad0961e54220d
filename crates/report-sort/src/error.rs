//! Error types for report sorting.

use std::fmt;

use report_sort_core::TreeError;

/// Error returned by a user hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by a user hook.
pub type HookResult = std::result::Result<(), HookError>;

/// Result type alias for sort operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Which hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Fired before the sort runs.
    PreSort,
    /// Fired after layout completes.
    PostSort,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::PreSort => f.write_str("pre-sort"),
            HookStage::PostSort => f.write_str("post-sort"),
        }
    }
}

/// Errors that can occur while scanning, sorting or rendering a report.
///
/// Unknown columns and values that fail to parse as their declared type are
/// not errors: sorting degrades to a no-op or to text comparison instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The host tree rejected an operation.
    #[error("Host tree error: {0}")]
    Tree(#[from] TreeError),

    /// A user hook failed. The failure is passed through untouched.
    #[error("The {stage} hook failed: {source}")]
    Hook {
        stage: HookStage,
        #[source]
        source: HookError,
    },

    /// Configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration parsed but holds an unusable value.
    #[error("Invalid value for option '{option}': {message}")]
    InvalidOption { option: String, message: String },

    /// A direction string was not `asc`, `desc` or `none`.
    #[error("Unknown sort direction '{0}'")]
    UnknownDirection(String),

    /// The root already carries the init flag of another sorter.
    #[error("Report root is already initialized by another sorter")]
    AlreadyInitialized,
}

impl Error {
    /// Create a hook error.
    pub fn hook(stage: HookStage, source: HookError) -> Self {
        Self::Hook { stage, source }
    }

    /// Create an option error.
    pub fn invalid_option(option: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            message: message.into(),
        }
    }
}
