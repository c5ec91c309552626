//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `doppel.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A referenced target name does not exist in the configuration.
    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    /// A required field is missing from the configuration.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// The number of output paths does not match the number of requested targets.
    #[error("number of requested targets ({targets}) does not match the number of output paths ({outputs})")]
    MismatchedOutputs {
        /// How many targets generation was requested for.
        targets: usize,
        /// How many output paths were configured.
        outputs: usize,
    },

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
