//! WFS DescribeFeatureType request.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    split_list, BaseRequest, Exceptions, KvpBinding, OperationKvp, OperationRequest, OwsResult,
    QueryValues, XmlBuilder,
};

use crate::base::{
    base_request, check_request, empty_query, validate_base, validate_output_format,
    validate_type_names, RESERVED_ATTRIBUTES,
};
use crate::capabilities::WfsCapabilities;
use crate::{DESCRIBEFEATURETYPE, OUTPUTFORMAT, REQUEST, SERVICE, TYPENAMES, VERSION};

/// Flat KVP form of DescribeFeatureType.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescribeFeatureTypeKvp {
    pub service: String,
    pub version: String,
    pub request: String,
    pub type_names: Option<String>,
    pub output_format: Option<String>,
}

impl OperationKvp for DescribeFeatureTypeKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(DescribeFeatureTypeKvp, required SERVICE => service),
        kvp_binding!(DescribeFeatureTypeKvp, required VERSION => version),
        kvp_binding!(DescribeFeatureTypeKvp, required REQUEST => request),
        kvp_binding!(DescribeFeatureTypeKvp, optional TYPENAMES => type_names),
        kvp_binding!(DescribeFeatureTypeKvp, optional OUTPUTFORMAT => output_format),
    ];
}

/// A WFS 2.0.0 DescribeFeatureType request. No type names means every
/// feature type of the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescribeFeatureType {
    #[serde(flatten)]
    pub base: BaseRequest,
    #[serde(default)]
    pub type_names: Vec<String>,
    #[serde(default)]
    pub output_format: Option<String>,
}

impl DescribeFeatureType {
    pub fn from_kvp(kvp: &DescribeFeatureTypeKvp) -> Result<Self, Exceptions> {
        let mut exceptions = Exceptions::new();

        check_request(&kvp.request, DESCRIBEFEATURETYPE, &mut exceptions);
        let base = base_request(&kvp.service, &kvp.version, &mut exceptions);

        let request = Self {
            base,
            type_names: kvp.type_names.as_deref().map(split_list).unwrap_or_default(),
            output_format: kvp.output_format.clone(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> DescribeFeatureTypeKvp {
        DescribeFeatureTypeKvp {
            service: self.base.service.clone(),
            version: self.base.version.clone(),
            request: DESCRIBEFEATURETYPE.to_string(),
            type_names: Some(self.type_names.join(",")).filter(|t| !t.is_empty()),
            output_format: self.output_format.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DescribeFeatureTypeXml {
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@outputFormat", default)]
    output_format: Option<String>,
    #[serde(rename = "TypeName", default)]
    type_names: Vec<String>,
}

impl OperationRequest for DescribeFeatureType {
    type Capabilities = dyn WfsCapabilities;

    fn request_type(&self) -> &'static str {
        DESCRIBEFEATURETYPE
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(empty_query());
        }
        let kvp = DescribeFeatureTypeKvp::parse_query(query)?;
        Self::from_kvp(&kvp)
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let reserved = [RESERVED_ATTRIBUTES, &["outputFormat"][..]].concat();
        let (xml, attributes): (DescribeFeatureTypeXml, _) =
            decode_request(body, DESCRIBEFEATURETYPE, &reserved)?;
        let mut exceptions = Exceptions::new();

        let mut base = base_request(&xml.service, &xml.version, &mut exceptions);
        base.attributes = attributes;
        let request = Self {
            base,
            type_names: xml.type_names,
            output_format: xml.output_format,
        };
        exceptions.into_result(request)
    }

    fn build_kvp(&self) -> QueryValues {
        self.to_kvp().to_query()
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        let mut attributes = self.base.root_attributes().to_vec();
        if let Some(format) = &self.output_format {
            attributes.push(("outputFormat", format.as_str()));
        }

        let mut builder = XmlBuilder::new()?;
        builder.start(DESCRIBEFEATURETYPE, &attributes, &self.base.attributes)?;
        for name in &self.type_names {
            builder.text_element("TypeName", name)?;
        }
        builder.end(DESCRIBEFEATURETYPE)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        validate_base(&self.base, capabilities, &mut exceptions);
        validate_type_names(&self.type_names, capabilities, &mut exceptions);
        validate_output_format(
            DESCRIBEFEATURETYPE,
            self.output_format.as_deref(),
            capabilities,
            &mut exceptions,
        );

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "DescribeFeatureType failed validation");
        }
        exceptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitiesSnapshot;
    use ows_common::exception::{invalid_parameter_value, missing_parameter_value};

    fn capabilities() -> CapabilitiesSnapshot {
        CapabilitiesSnapshot::from_yaml(
            r#"
output_formats:
  describe_feature_type: ["application/gml+xml; version=3.2"]
feature_types:
  - name: ns:roads
    default_crs: EPSG:28992
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_kvp() {
        let query = QueryValues::parse("SERVICE=WFS&VERSION=2.0.0&REQUEST=DescribeFeatureType&TYPENAMES=ns:roads");
        let request = DescribeFeatureType::parse_kvp(&query).unwrap();
        assert_eq!(request.type_names, vec!["ns:roads"]);
        assert_eq!(request.output_format, None);
        assert!(request.validate(&capabilities()).is_empty());
    }

    #[test]
    fn test_parse_kvp_missing_version() {
        let query = QueryValues::parse("REQUEST=DescribeFeatureType");
        assert_eq!(
            DescribeFeatureType::parse_kvp(&query).unwrap_err().into_vec(),
            vec![missing_parameter_value(VERSION)]
        );
    }

    #[test]
    fn test_round_trips() {
        let request = DescribeFeatureType {
            base: BaseRequest::new("WFS", "2.0.0"),
            type_names: vec!["ns:roads".to_string(), "ns:rivers".to_string()],
            output_format: Some("application/gml+xml; version=3.2".to_string()),
        };

        let query = request.build_kvp();
        assert_eq!(query.first_ignore_case(TYPENAMES), Some("ns:roads,ns:rivers"));
        assert_eq!(DescribeFeatureType::parse_kvp(&query).unwrap(), request);

        let xml = String::from_utf8(request.build_xml().unwrap()).unwrap();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<DescribeFeatureType service=\"WFS\" version=\"2.0.0\" outputFormat=\"application/gml+xml; version=3.2\">\n <TypeName>ns:roads</TypeName>\n <TypeName>ns:rivers</TypeName>\n</DescribeFeatureType>"
        );
        assert_eq!(DescribeFeatureType::parse_xml(xml.as_bytes()).unwrap(), request);
    }

    #[test]
    fn test_validate() {
        let request = DescribeFeatureType {
            base: BaseRequest::new("WFS", "2.0.0"),
            type_names: vec!["ns:roads".to_string(), "ns:lakes".to_string()],
            output_format: Some("application/json".to_string()),
        };
        assert_eq!(
            request.validate(&capabilities()).into_vec(),
            vec![
                invalid_parameter_value("ns:lakes", TYPENAMES),
                invalid_parameter_value("application/json", OUTPUTFORMAT),
            ]
        );
    }
}
