//! WFS GetCapabilities request.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::exception::{
    invalid_parameter_value, missing_parameter_value, version_negotiation_failed,
};
use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    split_list, BaseRequest, Exceptions, KvpBinding, OperationKvp, OperationRequest, OwsResult,
    QueryValues, XmlBuilder,
};

use crate::base::{check_request, RESERVED_ATTRIBUTES};
use crate::capabilities::WfsCapabilities;
use crate::{ACCEPTVERSIONS, GETCAPABILITIES, REQUEST, SERVICE, VERSION};

/// Flat KVP form of GetCapabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetCapabilitiesKvp {
    pub service: String,
    pub request: String,
    pub version: Option<String>,
    pub accept_versions: Option<String>,
}

impl OperationKvp for GetCapabilitiesKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(GetCapabilitiesKvp, required SERVICE => service),
        kvp_binding!(GetCapabilitiesKvp, required REQUEST => request),
        kvp_binding!(GetCapabilitiesKvp, optional VERSION => version),
        kvp_binding!(GetCapabilitiesKvp, optional ACCEPTVERSIONS => accept_versions),
    ];
}

/// A WFS 2.0.0 GetCapabilities request. SERVICE is mandatory and VERSION
/// optional here, unlike the other operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCapabilities {
    #[serde(flatten)]
    pub base: BaseRequest,
    #[serde(default)]
    pub accept_versions: Vec<String>,
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
            accept_versions: kvp
                .accept_versions
                .as_deref()
                .map(split_list)
                .unwrap_or_default(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> GetCapabilitiesKvp {
        GetCapabilitiesKvp {
            service: self.base.service.clone(),
            request: GETCAPABILITIES.to_string(),
            version: Some(self.base.version.clone()).filter(|v| !v.is_empty()),
            accept_versions: Some(self.accept_versions.join(",")).filter(|v| !v.is_empty()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetCapabilitiesXml {
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "AcceptVersions", default)]
    accept_versions: AcceptVersionsXml,
}

#[derive(Debug, Default, Deserialize)]
struct AcceptVersionsXml {
    #[serde(rename = "Version", default)]
    versions: Vec<String>,
}

impl OperationRequest for GetCapabilities {
    type Capabilities = dyn WfsCapabilities;

    fn request_type(&self) -> &'static str {
        GETCAPABILITIES
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(Exceptions::from(vec![
                missing_parameter_value(SERVICE),
                missing_parameter_value(REQUEST),
            ]));
        }
        let kvp = GetCapabilitiesKvp::parse_query(query)?;
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
            accept_versions: xml.accept_versions.versions,
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

        let mut builder = XmlBuilder::new()?;
        builder.start(GETCAPABILITIES, &attributes, &self.base.attributes)?;
        if !self.accept_versions.is_empty() {
            builder.start("AcceptVersions", &[], &[])?;
            for version in &self.accept_versions {
                builder.text_element("Version", version)?;
            }
            builder.end("AcceptVersions")?;
        }
        builder.end(GETCAPABILITIES)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        if !self.base.service.eq_ignore_ascii_case(capabilities.service_type()) {
            exceptions.push(invalid_parameter_value(&self.base.service, SERVICE));
        }
        let version = capabilities.service_version();
        if !self.base.version.is_empty() && self.base.version != version {
            exceptions.push(version_negotiation_failed(&self.base.version));
        }
        if !self.accept_versions.is_empty() && !self.accept_versions.iter().any(|v| v == version) {
            exceptions.push(version_negotiation_failed(&self.accept_versions.join(",")));
        }

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "GetCapabilities failed validation");
        }
        exceptions
    }
}
