//! WMS 1.3.0 exception codes and the ServiceExceptionReport.

use quick_xml::escape::escape;
use std::fmt;

use ows_common::{Exception, ExceptionReport};

/// Exception codes defined by WMS 1.3.0 on top of the OWS common ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WmsExceptionCode {
    InvalidFormat,
    InvalidCRS,
    LayerNotDefined,
    StyleNotDefined,
    LayerNotQueryable,
    InvalidPoint,
    CurrentUpdateSequence,
    InvalidUpdateSequence,
    MissingDimensionValue,
    InvalidDimensionValue,
}

impl WmsExceptionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "InvalidFormat",
            Self::InvalidCRS => "InvalidCRS",
            Self::LayerNotDefined => "LayerNotDefined",
            Self::StyleNotDefined => "StyleNotDefined",
            Self::LayerNotQueryable => "LayerNotQueryable",
            Self::InvalidPoint => "InvalidPoint",
            Self::CurrentUpdateSequence => "CurrentUpdateSequence",
            Self::InvalidUpdateSequence => "InvalidUpdateSequence",
            Self::MissingDimensionValue => "MissingDimensionValue",
            Self::InvalidDimensionValue => "InvalidDimensionValue",
        }
    }
}

impl fmt::Display for WmsExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn wms_exception(code: WmsExceptionCode, text: String, locator: &str) -> Exception {
    Exception::new(code.as_str(), text, locator)
}

/// The format (FORMAT or INFO_FORMAT, named by `locator`) is not offered.
pub fn invalid_format(format: &str, locator: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::InvalidFormat,
        format!("Request contains a format not offered by the server: {}", format),
        locator,
    )
}

pub fn invalid_crs(crs: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::InvalidCRS,
        format!(
            "Request contains a CRS not offered by the server for one or more of the layers in the request: {}",
            crs
        ),
        "CRS",
    )
}

/// `locator` is LAYERS or QUERY_LAYERS depending on where the name came from.
pub fn layer_not_defined(layer: &str, locator: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::LayerNotDefined,
        format!("The layer: {} is not known by the server", layer),
        locator,
    )
}

/// LAYERS and STYLES could not be paired up.
pub fn style_not_defined() -> Exception {
    wms_exception(
        WmsExceptionCode::StyleNotDefined,
        "There is a one-to-one correspondence between the values in the LAYERS parameter and the values in the STYLES parameter"
            .to_string(),
        "STYLES",
    )
}

pub fn style_not_defined_for(style: &str, layer: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::StyleNotDefined,
        format!("The style: {} is not known by the server for the layer: {}", style, layer),
        "STYLES",
    )
}

pub fn layer_not_queryable(layer: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::LayerNotQueryable,
        format!("Layer: {} can not be queried", layer),
        "QUERY_LAYERS",
    )
}

/// I and J are reported together.
pub fn invalid_point(i: &str, j: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::InvalidPoint,
        format!("The parameters I and J are invalid, given: {}, {}", i, j),
        "I,J",
    )
}

pub fn current_update_sequence() -> Exception {
    wms_exception(
        WmsExceptionCode::CurrentUpdateSequence,
        "The UPDATESEQUENCE is equal to the current value of the service metadata".to_string(),
        "UPDATESEQUENCE",
    )
}

pub fn invalid_update_sequence() -> Exception {
    wms_exception(
        WmsExceptionCode::InvalidUpdateSequence,
        "The UPDATESEQUENCE is greater than the current value of the service metadata".to_string(),
        "UPDATESEQUENCE",
    )
}

pub fn missing_dimension_value(dimension: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::MissingDimensionValue,
        format!("The dimension: {} has no default and was not given", dimension),
        dimension,
    )
}

pub fn invalid_dimension_value(dimension: &str, value: &str) -> Exception {
    wms_exception(
        WmsExceptionCode::InvalidDimensionValue,
        format!("The dimension: {} does not accept the value: {}", dimension, value),
        dimension,
    )
}

const REPORT_PREAMBLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ServiceExceptionReport version="1.3.0" xmlns="http://www.opengis.net/ogc" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.opengis.net/ogc http://schemas.opengis.net/wms/1.3.0/exceptions_1_3_0.xsd">"#;

/// Renders a WMS 1.3.0 `ServiceExceptionReport`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmsExceptionReport;

impl ExceptionReport for WmsExceptionReport {
    fn report(&self, exceptions: &[Exception]) -> Vec<u8> {
        let mut xml = String::from(REPORT_PREAMBLE);
        for exception in exceptions {
            xml.push_str(&format!(
                "\n <ServiceException code=\"{}\"",
                escape(exception.code())
            ));
            if !exception.locator().is_empty() {
                xml.push_str(&format!(" locator=\"{}\"", escape(exception.locator())));
            }
            xml.push_str(&format!(
                ">{}</ServiceException>",
                escape(exception.text())
            ));
        }
        xml.push_str("\n</ServiceExceptionReport>");
        xml.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ows_common::exception::missing_parameter_value;

    #[test]
    fn test_wms_exceptions() {
        let tests = [
            (invalid_format("image/bmp", "FORMAT"), "InvalidFormat", "FORMAT"),
            (invalid_crs("EPSG:1"), "InvalidCRS", "CRS"),
            (layer_not_defined("roads", "LAYERS"), "LayerNotDefined", "LAYERS"),
            (style_not_defined(), "StyleNotDefined", "STYLES"),
            (style_not_defined_for("red", "roads"), "StyleNotDefined", "STYLES"),
            (layer_not_queryable("roads"), "LayerNotQueryable", "QUERY_LAYERS"),
            (invalid_point("a", "1"), "InvalidPoint", "I,J"),
            (current_update_sequence(), "CurrentUpdateSequence", "UPDATESEQUENCE"),
            (invalid_update_sequence(), "InvalidUpdateSequence", "UPDATESEQUENCE"),
            (missing_dimension_value("TIME"), "MissingDimensionValue", "TIME"),
            (invalid_dimension_value("ELEVATION", "9"), "InvalidDimensionValue", "ELEVATION"),
        ];

        for (k, (exception, code, locator)) in tests.iter().enumerate() {
            assert_eq!(exception.code(), *code, "test {}", k);
            assert_eq!(exception.locator(), *locator, "test {}", k);
            assert!(!exception.text().is_empty(), "test {}", k);
        }
        assert_eq!(
            invalid_point("a", "1").text(),
            "The parameters I and J are invalid, given: a, 1"
        );
    }

    #[test]
    fn test_report() {
        let report = WmsExceptionReport.report(&[
            layer_not_defined("a<b", "LAYERS"),
            Exception::default(),
            missing_parameter_value("VERSION"),
        ]);

        let expected = format!(
            "{}\n{}\n{}\n{}\n{}",
            REPORT_PREAMBLE,
            r#" <ServiceException code="LayerNotDefined" locator="LAYERS">The layer: a&lt;b is not known by the server</ServiceException>"#,
            r#" <ServiceException code=""></ServiceException>"#,
            r#" <ServiceException code="MissingParameterValue" locator="VERSION">Missing key: VERSION</ServiceException>"#,
            "</ServiceExceptionReport>"
        );
        assert_eq!(String::from_utf8(report).unwrap(), expected);
    }

    #[test]
    fn test_empty_report() {
        let report = String::from_utf8(WmsExceptionReport.report(&[])).unwrap();
        assert!(report.starts_with(REPORT_PREAMBLE));
        assert!(report.ends_with("\n</ServiceExceptionReport>"));
    }
}
