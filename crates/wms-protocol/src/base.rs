//! Parsing and validation steps shared by the WMS operations.

use serde::{Deserialize, Serialize};
use tracing::debug;

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::{BaseRequest, BoundingBox, Crs, Exceptions, OwsResult, XmlBuilder};

use crate::capabilities::WmsCapabilities;
use crate::exceptions::{invalid_crs, invalid_dimension_value, missing_dimension_value};
use crate::{BBOX, CRS, ELEVATION, EXCEPTIONS, HEIGHT, REQUEST, SERVICE, SERVICE_TYPE, TIME, VERSION, WIDTH};

/// Root attributes a request models itself; everything else is preserved.
pub(crate) const RESERVED_ATTRIBUTES: &[&str] = &[SERVICE, VERSION];

/// Map size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

/// Reports for a query without a single token.
pub(crate) fn empty_query() -> Exceptions {
    Exceptions::from(vec![
        missing_parameter_value(VERSION),
        missing_parameter_value(REQUEST),
    ])
}

/// Build the common fields; a missing VERSION is reported.
pub(crate) fn base_request(service: &str, version: &str, exceptions: &mut Exceptions) -> BaseRequest {
    if version.is_empty() {
        exceptions.push(missing_parameter_value(VERSION));
    }
    let service = if service.is_empty() { SERVICE_TYPE } else { service };
    BaseRequest::new(service, version)
}

/// REQUEST is implicit for the endpoint, but when given it has to name the operation.
pub(crate) fn check_request(request: &str, operation: &str, exceptions: &mut Exceptions) {
    if !request.is_empty() && !request.eq_ignore_ascii_case(operation) {
        exceptions.push(invalid_parameter_value(request, REQUEST));
    }
}

pub(crate) fn parse_crs(value: &str, locator: &str, exceptions: &mut Exceptions) -> Crs {
    match Crs::parse(value) {
        Ok(crs) => crs,
        Err(err) => {
            debug!(error = %err, "invalid CRS");
            exceptions.push(invalid_parameter_value(value, locator));
            Crs::default()
        }
    }
}

pub(crate) fn parse_bbox(value: &str, exceptions: &mut Exceptions) -> BoundingBox {
    if value.is_empty() {
        exceptions.push(missing_parameter_value(BBOX));
        return BoundingBox::default();
    }
    BoundingBox::parse_kvp(value).unwrap_or_else(|exception| {
        exceptions.push(exception);
        BoundingBox::default()
    })
}

/// A mandatory pixel count; empty is missing, anything else must be an integer.
pub(crate) fn parse_pixels(value: &str, token: &str, exceptions: &mut Exceptions) -> u32 {
    if value.is_empty() {
        exceptions.push(missing_parameter_value(token));
        return 0;
    }
    value.parse().unwrap_or_else(|_| {
        exceptions.push(invalid_parameter_value(value, token));
        0
    })
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

/// TRUE or FALSE, in any case.
pub(crate) fn parse_bool(value: Option<&str>, token: &str, exceptions: &mut Exceptions) -> Option<bool> {
    let value = value?;
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        exceptions.push(invalid_parameter_value(value, token));
        None
    }
}

pub(crate) fn format_bool(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// `<BoundingBox crs="..."><LowerCorner>x y</LowerCorner><UpperCorner>x y</UpperCorner></BoundingBox>`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct BoundingBoxXml {
    #[serde(rename = "@crs", default)]
    crs: Option<String>,
    #[serde(rename = "LowerCorner", default)]
    lower_corner: String,
    #[serde(rename = "UpperCorner", default)]
    upper_corner: String,
}

impl BoundingBoxXml {
    pub(crate) fn into_bbox(self, exceptions: &mut Exceptions) -> BoundingBox {
        let mut corner = |text: &str| {
            BoundingBox::parse_corner(text).unwrap_or_else(|| {
                exceptions.push(invalid_parameter_value(text, "BoundingBox"));
                [0.0, 0.0]
            })
        };
        let lower_corner = corner(&self.lower_corner);
        let upper_corner = corner(&self.upper_corner);

        let crs = match self.crs.as_deref() {
            Some(raw) if !raw.is_empty() => Some(parse_crs(raw, "BoundingBox", exceptions)),
            _ => None,
        };

        BoundingBox {
            lower_corner,
            upper_corner,
            crs,
        }
    }
}

pub(crate) fn write_bbox(builder: &mut XmlBuilder, bbox: &BoundingBox) -> OwsResult<()> {
    let crs = bbox.crs.as_ref().map(|c| c.to_string()).unwrap_or_default();
    let attributes: Vec<(&str, &str)> = if crs.is_empty() {
        Vec::new()
    } else {
        vec![("crs", crs.as_str())]
    };
    builder.start("BoundingBox", &attributes, &[])?;
    builder.text_element("LowerCorner", &BoundingBox::corner_text(bbox.lower_corner))?;
    builder.text_element("UpperCorner", &BoundingBox::corner_text(bbox.upper_corner))?;
    builder.end("BoundingBox")
}

/// `<Size><Width>..</Width><Height>..</Height></Size>`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SizeXml {
    #[serde(rename = "Width", default)]
    width: String,
    #[serde(rename = "Height", default)]
    height: String,
}

impl SizeXml {
    pub(crate) fn into_size(self, exceptions: &mut Exceptions) -> Size {
        Size {
            width: parse_pixels(&self.width, WIDTH, exceptions),
            height: parse_pixels(&self.height, HEIGHT, exceptions),
        }
    }
}

pub(crate) fn write_size(builder: &mut XmlBuilder, size: Size) -> OwsResult<()> {
    builder.start("Size", &[], &[])?;
    builder.text_element("Width", &size.width.to_string())?;
    builder.text_element("Height", &size.height.to_string())?;
    builder.end("Size")
}

// === Validation steps ===

pub(crate) fn validate_base(
    base: &BaseRequest,
    capabilities: &dyn WmsCapabilities,
    exceptions: &mut Exceptions,
) {
    if !base.service.eq_ignore_ascii_case(capabilities.service_type()) {
        exceptions.push(invalid_parameter_value(&base.service, SERVICE));
    }
    if base.version != capabilities.service_version() {
        exceptions.push(invalid_parameter_value(&base.version, VERSION));
    }
}

pub(crate) fn validate_crs(crs: &Crs, capabilities: &dyn WmsCapabilities, exceptions: &mut Exceptions) {
    if crs.is_empty() {
        exceptions.push(missing_parameter_value(CRS));
    } else if !capabilities.supports_crs(crs) {
        exceptions.push(invalid_crs(&crs.to_string()));
    }
}

pub(crate) fn validate_bbox(bbox: &BoundingBox, exceptions: &mut Exceptions) {
    if bbox.is_degenerate() {
        exceptions.push(invalid_parameter_value(&bbox.to_kvp(), BBOX));
    }
}

pub(crate) fn validate_size(size: Size, capabilities: &dyn WmsCapabilities, exceptions: &mut Exceptions) {
    let limits = [
        (size.width, capabilities.max_width(), WIDTH),
        (size.height, capabilities.max_height(), HEIGHT),
    ];
    for (value, max, token) in limits {
        if value == 0 || max.map(|m| value > m).unwrap_or(false) {
            exceptions.push(invalid_parameter_value(&value.to_string(), token));
        }
    }
}

pub(crate) fn validate_exceptions_format(
    format: Option<&str>,
    capabilities: &dyn WmsCapabilities,
    exceptions: &mut Exceptions,
) {
    if let Some(format) = format {
        if !capabilities.supports_exception_format(format) {
            exceptions.push(invalid_parameter_value(format, EXCEPTIONS));
        }
    }
}

/// TIME and ELEVATION against the dimensions of every requested layer.
pub(crate) fn validate_dimensions<'a>(
    layers: impl Iterator<Item = &'a str>,
    time: Option<&str>,
    elevation: Option<&str>,
    capabilities: &dyn WmsCapabilities,
    exceptions: &mut Exceptions,
) {
    for layer in layers {
        for (dimension, value) in [(TIME, time), (ELEVATION, elevation)] {
            match value {
                Some(value) if !capabilities.accepts_dimension_value(layer, dimension, value) => {
                    exceptions.push(invalid_dimension_value(dimension, value));
                }
                None if capabilities.requires_dimension(layer, dimension) => {
                    exceptions.push(missing_dimension_value(dimension));
                }
                _ => {}
            }
        }
    }
}
