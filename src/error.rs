use std::path::PathBuf;

use thiserror::Error;

/// Main application error type covering every startup failure mode.
///
/// Validation problems are not errors in this sense: they are converted into
/// diagnostic events at the narrowest enclosing scope (one schema, one
/// document) and never unwind past the batch loop.
#[derive(Error, Debug)]
pub enum XmlValidatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid glob pattern '{pattern}': {details}")]
    Pattern { pattern: String, details: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LibXML2 internal error: {details}")]
    LibXml2Internal { details: String },
}

/// LibXML2-specific error types for FFI-level failures.
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Schema parser context creation failed")]
    ParserContextFailed,

    #[error("Validation context creation failed")]
    ValidationContextFailed,

    #[error("Path is not representable for libxml2: {file}")]
    BadPath { file: PathBuf },
}

impl From<crate::config::ConfigError> for XmlValidatorError {
    fn from(err: crate::config::ConfigError) -> Self {
        XmlValidatorError::Config(err.to_string())
    }
}

impl From<LibXml2Error> for XmlValidatorError {
    fn from(err: LibXml2Error) -> Self {
        XmlValidatorError::LibXml2Internal {
            details: err.to_string(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, XmlValidatorError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
