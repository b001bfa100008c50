//! WMS GetCapabilities request.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

use ows_common::exception::{
    invalid_parameter_value, missing_parameter_value, version_negotiation_failed,
};
use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    BaseRequest, Exceptions, KvpBinding, OperationKvp, OperationRequest, OwsResult, QueryValues,
    XmlBuilder,
};

use crate::base::check_request;
use crate::capabilities::WmsCapabilities;
use crate::exceptions::{current_update_sequence, invalid_format, invalid_update_sequence};
use crate::{FORMAT, GETCAPABILITIES, REQUEST, SERVICE, UPDATESEQUENCE, VERSION};

const RESERVED_ATTRIBUTES: &[&str] = &[SERVICE, VERSION, UPDATESEQUENCE];

/// Flat KVP form of GetCapabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCapabilitiesKvp {
    pub service: String,
    pub request: String,
    pub version: Option<String>,
    pub format: Option<String>,
    pub update_sequence: Option<String>,
}

impl OperationKvp for GetCapabilitiesKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(GetCapabilitiesKvp, required SERVICE => service),
        kvp_binding!(GetCapabilitiesKvp, required REQUEST => request),
        kvp_binding!(GetCapabilitiesKvp, optional VERSION => version),
        kvp_binding!(GetCapabilitiesKvp, optional FORMAT => format),
        kvp_binding!(GetCapabilitiesKvp, optional UPDATESEQUENCE => update_sequence),
    ];
}

impl GetCapabilitiesKvp {
    /// Read the KVP form from a query; SERVICE is upper-cased.
    pub fn from_query(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(Exceptions::from(vec![
                missing_parameter_value(SERVICE),
                missing_parameter_value(REQUEST),
            ]));
        }
        let mut kvp = Self::parse_query(query)?;
        kvp.service = kvp.service.to_uppercase();
        Ok(kvp)
    }
}

/// A WMS 1.3.0 GetCapabilities request. VERSION is optional here, so the
/// base version may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCapabilities {
    #[serde(flatten)]
    pub base: BaseRequest,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub update_sequence: Option<String>,
}

impl GetCapabilities {
    pub fn from_kvp(kvp: &GetCapabilitiesKvp) -> Result<Self, Exceptions> {
        let mut exceptions = Exceptions::new();

        check_request(&kvp.request, GETCAPABILITIES, &mut exceptions);
        if kvp.service.is_empty() {
            exceptions.push(missing_parameter_value(SERVICE));
        }

        let request = Self {
            base: BaseRequest::new(
                kvp.service.as_str(),
                kvp.version.clone().unwrap_or_default(),
            ),
            format: kvp.format.clone(),
            update_sequence: kvp.update_sequence.clone(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> GetCapabilitiesKvp {
        GetCapabilitiesKvp {
            service: self.base.service.clone(),
            request: GETCAPABILITIES.to_string(),
            version: Some(self.base.version.clone()).filter(|v| !v.is_empty()),
            format: self.format.clone(),
            update_sequence: self.update_sequence.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetCapabilitiesXml {
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@updateSequence", default)]
    update_sequence: Option<String>,
    #[serde(rename = "Format", default)]
    format: Option<String>,
}

/// Numeric sequences compare as numbers, anything else as text.
fn compare_sequence(requested: &str, current: &str) -> Ordering {
    match (requested.parse::<u64>(), current.parse::<u64>()) {
        (Ok(requested), Ok(current)) => requested.cmp(&current),
        _ => requested.cmp(current),
    }
}

impl OperationRequest for GetCapabilities {
    type Capabilities = dyn WmsCapabilities;

    fn request_type(&self) -> &'static str {
        GETCAPABILITIES
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        let kvp = GetCapabilitiesKvp::from_query(query)?;
        Self::from_kvp(&kvp)
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let (xml, attributes): (GetCapabilitiesXml, _) =
            decode_request(body, GETCAPABILITIES, RESERVED_ATTRIBUTES)?;

        if xml.service.is_empty() {
            return Err(missing_parameter_value(SERVICE).into());
        }

        let mut base = BaseRequest::new(xml.service, xml.version);
        base.attributes = attributes;
        Ok(Self {
            base,
            format: xml.format,
            update_sequence: xml.update_sequence,
        })
    }

    fn build_kvp(&self) -> QueryValues {
        self.to_kvp().to_query()
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        let mut attributes = vec![("service", self.base.service.as_str())];
        if !self.base.version.is_empty() {
            attributes.push(("version", self.base.version.as_str()));
        }
        if let Some(sequence) = &self.update_sequence {
            attributes.push(("updateSequence", sequence.as_str()));
        }

        let mut builder = XmlBuilder::new()?;
        builder.start(GETCAPABILITIES, &attributes, &self.base.attributes)?;
        builder.optional_element("Format", self.format.as_deref())?;
        builder.end(GETCAPABILITIES)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        if !self.base.service.eq_ignore_ascii_case(capabilities.service_type()) {
            exceptions.push(invalid_parameter_value(&self.base.service, SERVICE));
        }
        if !self.base.version.is_empty() && self.base.version != capabilities.service_version() {
            exceptions.push(version_negotiation_failed(&self.base.version));
        }
        if let Some(format) = &self.format {
            if !capabilities.supports_format(GETCAPABILITIES, format) {
                exceptions.push(invalid_format(format, FORMAT));
            }
        }

        if let (Some(requested), Some(current)) =
            (self.update_sequence.as_deref(), capabilities.update_sequence())
        {
            match compare_sequence(requested, current) {
                Ordering::Equal => exceptions.push(current_update_sequence()),
                Ordering::Greater => exceptions.push(invalid_update_sequence()),
                Ordering::Less => {}
            }
        }

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "GetCapabilities failed validation");
        }
        exceptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitiesSnapshot;
    use ows_common::{Crs, ServiceCapabilities, XmlAttribute};

    fn capabilities() -> CapabilitiesSnapshot {
        CapabilitiesSnapshot {
            formats: crate::capabilities::OperationFormats {
                get_capabilities: vec!["text/xml".to_string()],
                ..Default::default()
            },
            update_sequence: Some("10".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_kvp() {
        let query = QueryValues::parse("service=wms&request=GetCapabilities&FORMAT=text/xml");
        let request = GetCapabilities::parse_kvp(&query).unwrap();
        assert_eq!(request.base, BaseRequest::new("WMS", ""));
        assert_eq!(request.format.as_deref(), Some("text/xml"));
        assert!(request.validate(&capabilities()).is_empty());
    }

    #[test]
    fn test_parse_kvp_missing_tokens() {
        assert_eq!(
            GetCapabilities::parse_kvp(&QueryValues::new()).unwrap_err().into_vec(),
            vec![
                missing_parameter_value(SERVICE),
                missing_parameter_value(REQUEST),
            ]
        );
        assert_eq!(
            GetCapabilities::parse_kvp(&QueryValues::parse("REQUEST=GetCapabilities"))
                .unwrap_err()
                .into_vec(),
            vec![missing_parameter_value(SERVICE)]
        );
    }

    #[test]
    fn test_build_kvp_omits_empty_version() {
        let request = GetCapabilities {
            base: BaseRequest::new("WMS", ""),
            ..Default::default()
        };
        assert_eq!(
            request.build_kvp().to_query_string(),
            "REQUEST=GetCapabilities&SERVICE=WMS"
        );
    }

    #[test]
    fn test_xml_round_trip() {
        let mut request = GetCapabilities {
            base: BaseRequest::new("WMS", "1.3.0"),
            format: Some("text/xml".to_string()),
            update_sequence: Some("9".to_string()),
        };
        request.base.attributes = vec![XmlAttribute::new("xmlns", "http://www.opengis.net/wms")];

        let xml = String::from_utf8(request.build_xml().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<GetCapabilities service=\"WMS\" version=\"1.3.0\" updateSequence=\"9\" xmlns=\"http://www.opengis.net/wms\">\n <Format>text/xml</Format>\n</GetCapabilities>"
        );
        assert_eq!(GetCapabilities::parse_xml(xml.as_bytes()).unwrap(), request);
    }

    #[test]
    fn test_validate() {
        let caps = capabilities();
        let request = |version: &str, format: Option<&str>, sequence: Option<&str>| GetCapabilities {
            base: BaseRequest::new("WMS", version),
            format: format.map(str::to_string),
            update_sequence: sequence.map(str::to_string),
        };

        assert!(request("1.3.0", None, Some("9")).validate(&caps).is_empty());
        assert_eq!(
            request("1.1.1", Some("image/png"), Some("10")).validate(&caps).into_vec(),
            vec![
                version_negotiation_failed("1.1.1"),
                invalid_format("image/png", FORMAT),
                current_update_sequence(),
            ]
        );
        assert_eq!(
            request("", None, Some("11")).validate(&caps).into_vec(),
            vec![invalid_update_sequence()]
        );
    }

    /// A service that speaks an older protocol version.
    struct Legacy(CapabilitiesSnapshot);

    impl ServiceCapabilities for Legacy {
        fn service_type(&self) -> &str {
            self.0.service_type()
        }
        fn service_version(&self) -> &str {
            "1.1.1"
        }
        fn supports_crs(&self, crs: &Crs) -> bool {
            self.0.supports_crs(crs)
        }
        fn supports_format(&self, operation: &str, format: &str) -> bool {
            self.0.supports_format(operation, format)
        }
    }

    impl WmsCapabilities for Legacy {
        fn has_layer(&self, layer: &str) -> bool {
            self.0.has_layer(layer)
        }
        fn has_style(&self, layer: &str, style: &str) -> bool {
            self.0.has_style(layer, style)
        }
        fn is_queryable(&self, layer: &str) -> bool {
            self.0.is_queryable(layer)
        }
        fn supports_exception_format(&self, format: &str) -> bool {
            self.0.supports_exception_format(format)
        }
        fn accepts_dimension_value(&self, layer: &str, dimension: &str, value: &str) -> bool {
            self.0.accepts_dimension_value(layer, dimension, value)
        }
        fn requires_dimension(&self, layer: &str, dimension: &str) -> bool {
            self.0.requires_dimension(layer, dimension)
        }
        fn max_width(&self) -> Option<u32> {
            self.0.max_width()
        }
        fn max_height(&self) -> Option<u32> {
            self.0.max_height()
        }
        fn layer_limit(&self) -> Option<usize> {
            self.0.layer_limit()
        }
        fn update_sequence(&self) -> Option<&str> {
            self.0.update_sequence()
        }
    }

    #[test]
    fn test_validate_against_service_version() {
        let caps = Legacy(capabilities());
        let request = |version: &str| GetCapabilities {
            base: BaseRequest::new("WMS", version),
            ..Default::default()
        };

        assert!(request("1.1.1").validate(&caps).is_empty());
        assert_eq!(
            request("1.3.0").validate(&caps).into_vec(),
            vec![version_negotiation_failed("1.3.0")]
        );
    }

    #[test]
    fn test_compare_sequence() {
        assert_eq!(compare_sequence("9", "10"), Ordering::Less);
        assert_eq!(compare_sequence("2025-01-02", "2025-01-01"), Ordering::Greater);
    }
}
