//! WFS 2.0.0 exception codes and the OWS 1.1 ExceptionReport.

use quick_xml::escape::escape;
use std::fmt;

use ows_common::{Exception, ExceptionReport};

/// Exception codes defined by WFS 2.0.0 (Table 3) on top of the OWS common ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WfsExceptionCode {
    CannotLockAllFeatures,
    DuplicateStoredQueryIdValue,
    DuplicateStoredQueryParameterName,
    FeaturesNotLocked,
    InvalidLockId,
    InvalidValue,
    LockHasExpired,
    OperationParsingFailed,
    OperationProcessingFailed,
    ResponseCacheExpired,
}

impl WfsExceptionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CannotLockAllFeatures => "CannotLockAllFeatures",
            Self::DuplicateStoredQueryIdValue => "DuplicateStoredQueryIDValue",
            Self::DuplicateStoredQueryParameterName => "DuplicateStoredQueryParameterName",
            Self::FeaturesNotLocked => "FeaturesNotLocked",
            Self::InvalidLockId => "InvalidLockID",
            Self::InvalidValue => "InvalidValue",
            Self::LockHasExpired => "LockHasExpired",
            Self::OperationParsingFailed => "OperationParsingFailed",
            Self::OperationProcessingFailed => "OperationProcessingFailed",
            Self::ResponseCacheExpired => "ResponseCacheExpired",
        }
    }
}

impl fmt::Display for WfsExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WfsExceptionCode> for Exception {
    /// An exception carrying only the code.
    fn from(code: WfsExceptionCode) -> Self {
        Exception::with_code(code.as_str())
    }
}

pub fn cannot_lock_all_features() -> Exception {
    WfsExceptionCode::CannotLockAllFeatures.into()
}

pub fn duplicate_stored_query_id_value() -> Exception {
    WfsExceptionCode::DuplicateStoredQueryIdValue.into()
}

pub fn duplicate_stored_query_parameter_name() -> Exception {
    WfsExceptionCode::DuplicateStoredQueryParameterName.into()
}

pub fn features_not_locked() -> Exception {
    WfsExceptionCode::FeaturesNotLocked.into()
}

pub fn invalid_lock_id() -> Exception {
    WfsExceptionCode::InvalidLockId.into()
}

pub fn invalid_value() -> Exception {
    WfsExceptionCode::InvalidValue.into()
}

pub fn lock_has_expired() -> Exception {
    WfsExceptionCode::LockHasExpired.into()
}

/// `parameter` names what was found, `value` becomes the locator.
pub fn operation_parsing_failed(parameter: &str, value: &str) -> Exception {
    Exception::new(
        WfsExceptionCode::OperationParsingFailed.as_str(),
        format!("Failed to parse the operation, found: {}", parameter),
        value,
    )
}

pub fn operation_processing_failed() -> Exception {
    WfsExceptionCode::OperationProcessingFailed.into()
}

pub fn response_cache_expired() -> Exception {
    WfsExceptionCode::ResponseCacheExpired.into()
}

const REPORT_PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/ows/1.1 http://schemas.opengis.net/ows/1.1.0/owsExceptionReport.xsd" version="2.0.0" xml:lang="en">"#;

/// Renders an OWS 1.1 `ExceptionReport` as WFS 2.0.0 responds with.
#[derive(Debug, Clone, Copy, Default)]
pub struct WfsExceptionReport;

impl ExceptionReport for WfsExceptionReport {
    fn report(&self, exceptions: &[Exception]) -> Vec<u8> {
        let mut xml = String::from(REPORT_PREAMBLE);
        for exception in exceptions {
            xml.push_str(&format!(
                "\n <Exception exceptionCode=\"{}\"",
                escape(exception.code())
            ));
            if !exception.locator().is_empty() {
                xml.push_str(&format!(" locator=\"{}\"", escape(exception.locator())));
            }
            xml.push_str(&format!(">{}</Exception>", escape(exception.text())));
        }
        xml.push_str("\n</ExceptionReport>");
        xml.into_bytes()
    }
}
