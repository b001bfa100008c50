//! Parsing and validation steps shared by the WFS operations.

use tracing::debug;

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::{BaseRequest, Crs, Exceptions};

use crate::capabilities::WfsCapabilities;
use crate::{OUTPUTFORMAT, REQUEST, SERVICE, SERVICE_TYPE, TYPENAMES, VERSION};

/// Root attributes a request models itself; everything else is preserved.
pub(crate) const RESERVED_ATTRIBUTES: &[&str] = &[SERVICE, VERSION];

/// Reports for a query without a single token.
pub(crate) fn empty_query() -> Exceptions {
    Exceptions::from(vec![
        missing_parameter_value(VERSION),
        missing_parameter_value(REQUEST),
    ])
}

/// SERVICE is implicit for the data operations, VERSION is mandatory.
pub(crate) fn base_request(service: &str, version: &str, exceptions: &mut Exceptions) -> BaseRequest {
    if version.is_empty() {
        exceptions.push(missing_parameter_value(VERSION));
    }
    let service = if service.is_empty() { SERVICE_TYPE } else { service };
    BaseRequest::new(service, version)
}

pub(crate) fn check_request(request: &str, operation: &str, exceptions: &mut Exceptions) {
    if !request.is_empty() && !request.eq_ignore_ascii_case(operation) {
        exceptions.push(invalid_parameter_value(request, REQUEST));
    }
}

pub(crate) fn parse_crs(value: &str, locator: &str, exceptions: &mut Exceptions) -> Option<Crs> {
    if value.is_empty() {
        return None;
    }
    match Crs::parse(value) {
        Ok(crs) => Some(crs),
        Err(err) => {
            debug!(error = %err, "invalid CRS");
            exceptions.push(invalid_parameter_value(value, locator));
            None
        }
    }
}

pub(crate) fn parse_optional_u32(
    value: Option<&str>,
    token: &str,
    exceptions: &mut Exceptions,
) -> Option<u32> {
    let value = value?;
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            exceptions.push(invalid_parameter_value(value, token));
            None
        }
    }
}

/// Type names in an XML `typeNames` attribute are whitespace separated.
pub(crate) fn split_type_names(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

// === Validation steps ===

pub(crate) fn validate_base(
    base: &BaseRequest,
    capabilities: &dyn WfsCapabilities,
    exceptions: &mut Exceptions,
) {
    if !base.service.eq_ignore_ascii_case(capabilities.service_type()) {
        exceptions.push(invalid_parameter_value(&base.service, SERVICE));
    }
    if base.version != capabilities.service_version() {
        exceptions.push(invalid_parameter_value(&base.version, VERSION));
    }
}

pub(crate) fn validate_type_names(
    type_names: &[String],
    capabilities: &dyn WfsCapabilities,
    exceptions: &mut Exceptions,
) {
    for name in type_names {
        if !capabilities.has_feature_type(name) {
            exceptions.push(invalid_parameter_value(name, TYPENAMES));
        }
    }
}

pub(crate) fn validate_output_format(
    operation: &str,
    format: Option<&str>,
    capabilities: &dyn WfsCapabilities,
    exceptions: &mut Exceptions,
) {
    if let Some(format) = format {
        if !capabilities.supports_format(operation, format) {
            exceptions.push(invalid_parameter_value(format, OUTPUTFORMAT));
        }
    }
}
