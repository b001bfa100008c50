//! The contract every operation request fulfils.

use serde::{Deserialize, Serialize};

use crate::error::OwsResult;
use crate::exception::Exceptions;
use crate::kvp::QueryValues;
use crate::xml::XmlAttribute;

/// Fields every operation request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseRequest {
    pub service: String,
    pub version: String,
    /// Root element attributes from an XML body that are not modelled, kept
    /// so the request can be written back unchanged.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<XmlAttribute>,
}

impl BaseRequest {
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
            attributes: Vec::new(),
        }
    }

    /// Attributes for the root element of the XML encoding.
    pub fn root_attributes(&self) -> [(&str, &str); 2] {
        [
            ("service", self.service.as_str()),
            ("version", self.version.as_str()),
        ]
    }
}

/// A single service operation, convertible between KVP, XML and this
/// structured form, and checkable against capabilities.
pub trait OperationRequest: Sized {
    /// Capabilities the validator queries, usually a family trait object.
    type Capabilities: ?Sized;

    /// Operation name as used for REQUEST and the XML root element.
    fn request_type(&self) -> &'static str;

    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions>;

    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions>;

    fn build_kvp(&self) -> QueryValues;

    fn build_xml(&self) -> OwsResult<Vec<u8>>;

    /// Check the request against the capabilities. Empty means valid.
    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions;
}
