//! OGC exception values and exception reports.
//!
//! Every protocol failure is an [`Exception`]: a code from the OGC vocabulary,
//! a message and a locator naming the parameter at fault. Operations collect
//! them into [`Exceptions`], and an [`ExceptionReport`] renders the collection
//! into the wire document of a protocol family.

use std::borrow::Cow;
use std::fmt;

/// OGC Web Services Common exception codes shared by every protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwsExceptionCode {
    MissingParameterValue,
    InvalidParameterValue,
    OperationNotSupported,
    VersionNegotiationFailed,
    NoApplicableCode,
}

impl OwsExceptionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingParameterValue => "MissingParameterValue",
            Self::InvalidParameterValue => "InvalidParameterValue",
            Self::OperationNotSupported => "OperationNotSupported",
            Self::VersionNegotiationFailed => "VersionNegotiationFailed",
            Self::NoApplicableCode => "NoApplicableCode",
        }
    }
}

impl fmt::Display for OwsExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OGC exception.
///
/// The code is kept as a string so that the common codes and the codes of
/// each protocol family can live in one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{text}")]
pub struct Exception {
    code: Cow<'static, str>,
    text: String,
    locator: String,
}

impl Exception {
    pub fn new(
        code: impl Into<Cow<'static, str>>,
        text: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            text: text.into(),
            locator: locator.into(),
        }
    }

    /// An exception that only carries a code.
    pub fn with_code(code: &'static str) -> Self {
        Self::new(code, String::new(), String::new())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// The human readable message, empty for codes that need no text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// HTTP status a transport would normally answer this exception with.
    pub fn http_status_code(&self) -> u16 {
        match self.code() {
            "LayerNotDefined" | "StyleNotDefined" => 404,
            "NoApplicableCode" | "OperationProcessingFailed" => 500,
            "OperationNotSupported" => 501,
            "CannotLockAllFeatures" | "FeaturesNotLocked" | "LockHasExpired" => 403,
            "ResponseCacheExpired" => 410,
            _ => 400,
        }
    }
}

/// An ordered collection of exceptions.
///
/// Order is the order in which the exceptions were found; reports keep it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exceptions(Vec<Exception>);

impl Exceptions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, exception: Exception) {
        self.0.push(exception);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Exception> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Exception] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Exception> {
        self.0
    }

    /// `Ok(value)` when nothing was collected, the collection otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Exceptions> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Exceptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, exception) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", exception.code(), exception.text())?;
        }
        Ok(())
    }
}

impl std::error::Error for Exceptions {}

impl From<Exception> for Exceptions {
    fn from(exception: Exception) -> Self {
        Self(vec![exception])
    }
}

impl From<Vec<Exception>> for Exceptions {
    fn from(exceptions: Vec<Exception>) -> Self {
        Self(exceptions)
    }
}

impl Extend<Exception> for Exceptions {
    fn extend<I: IntoIterator<Item = Exception>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<Exception> for Exceptions {
    fn from_iter<I: IntoIterator<Item = Exception>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Exceptions {
    type Item = Exception;
    type IntoIter = std::vec::IntoIter<Exception>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Exceptions {
    type Item = &'a Exception;
    type IntoIter = std::slice::Iter<'a, Exception>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Renders exceptions into the error document of a protocol family.
pub trait ExceptionReport {
    /// Render the exceptions, in order, into a complete XML document.
    fn report(&self, exceptions: &[Exception]) -> Vec<u8>;
}

// === OWS Common constructors ===

/// A mandatory key is absent.
pub fn missing_parameter_value(key: &str) -> Exception {
    Exception::new(
        OwsExceptionCode::MissingParameterValue.as_str(),
        format!("Missing key: {}", key),
        key,
    )
}

/// A mandatory key is present but its value could not be used.
pub fn missing_parameter_value_with(key: &str, value: &str) -> Exception {
    Exception::new(
        OwsExceptionCode::MissingParameterValue.as_str(),
        format!("{} key got incorrect value: {}", key, value),
        key,
    )
}

/// The request body could not be read at all.
pub fn missing_request_body() -> Exception {
    Exception::new(
        OwsExceptionCode::MissingParameterValue.as_str(),
        "Could not determine REQUEST",
        "",
    )
}

pub fn invalid_parameter_value(value: &str, locator: &str) -> Exception {
    Exception::new(
        OwsExceptionCode::InvalidParameterValue.as_str(),
        format!("{} contains a invalid value: {}", locator, value),
        locator,
    )
}

pub fn operation_not_supported(operation: &str) -> Exception {
    Exception::new(
        OwsExceptionCode::OperationNotSupported.as_str(),
        format!("This service does not know the operation: {}", operation),
        operation,
    )
}

pub fn version_negotiation_failed(version: &str) -> Exception {
    Exception::new(
        OwsExceptionCode::VersionNegotiationFailed.as_str(),
        format!("{} is an invalid version number", version),
        "VERSION",
    )
}

pub fn no_applicable_code(message: &str) -> Exception {
    Exception::new(OwsExceptionCode::NoApplicableCode.as_str(), message, "")
}
