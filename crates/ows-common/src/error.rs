//! Error types for failures outside the OGC exception vocabulary.
//!
//! Request faults are reported as [`Exception`](crate::Exception) values. The
//! errors here cover the plumbing around them: writing XML documents and
//! loading capabilities snapshots.

use thiserror::Error;

use crate::exception::{no_applicable_code, Exception};

/// Result type alias using OwsError.
pub type OwsResult<T> = Result<T, OwsError>;

#[derive(Debug, Error)]
pub enum OwsError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML document has no root element")]
    MissingRootElement,

    #[error("Invalid capabilities: {0}")]
    Capabilities(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl OwsError {
    /// Convert into an exception so a transport can still answer with a report.
    pub fn to_exception(&self) -> Exception {
        no_applicable_code(&self.to_string())
    }
}

impl From<std::io::Error> for OwsError {
    fn from(err: std::io::Error) -> Self {
        OwsError::InternalError(err.to_string())
    }
}
