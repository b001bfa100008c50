//! WFS capabilities queries and an in-memory snapshot implementing them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use ows_common::{Crs, OwsError, OwsResult, ServiceCapabilities};

use crate::{DESCRIBEFEATURETYPE, GETCAPABILITIES, GETFEATURE, SERVICE_TYPE, VERSION_2_0_0};

/// What the WFS validators need to know about the server.
pub trait WfsCapabilities: ServiceCapabilities {
    fn has_feature_type(&self, name: &str) -> bool;

    /// Whether features of `feature_type` can be returned in `crs`.
    fn supports_feature_type_crs(&self, feature_type: &str, crs: &Crs) -> bool;

    /// The CountDefault constraint: the most features one response may hold.
    fn count_default(&self) -> Option<u32>;
}

/// Output formats offered per operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputFormats {
    #[serde(default)]
    pub get_capabilities: Vec<String>,
    #[serde(default)]
    pub describe_feature_type: Vec<String>,
    #[serde(default)]
    pub get_feature: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTypeCapabilities {
    /// Qualified name, e.g. `ns:roads`.
    pub name: String,
    pub default_crs: String,
    #[serde(default)]
    pub other_crs: Vec<String>,
}

impl FeatureTypeCapabilities {
    fn crs(&self) -> impl Iterator<Item = Crs> + '_ {
        std::iter::once(&self.default_crs)
            .chain(self.other_crs.iter())
            .filter_map(|c| match Crs::parse(c) {
                Ok(crs) => Some(crs),
                Err(err) => {
                    warn!(feature_type = %self.name, crs = %c, error = %err, "ignoring unparsable CRS");
                    None
                }
            })
    }
}

/// Capabilities of a WFS 2.0.0 service, typically loaded from YAML.
///
/// ```yaml
/// output_formats:
///   get_feature: ["application/gml+xml; version=3.2", "application/json"]
/// feature_types:
///   - name: ns:roads
///     default_crs: urn:ogc:def:crs:EPSG::28992
///     other_crs: ["EPSG:4326"]
/// count_default: 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesSnapshot {
    #[serde(default)]
    pub output_formats: OutputFormats,

    #[serde(default)]
    pub feature_types: Vec<FeatureTypeCapabilities>,

    #[serde(default = "default_count")]
    pub count_default: Option<u32>,
}

impl Default for CapabilitiesSnapshot {
    fn default() -> Self {
        Self {
            output_formats: OutputFormats::default(),
            feature_types: Vec::new(),
            count_default: default_count(),
        }
    }
}

fn default_count() -> Option<u32> {
    Some(1000)
}

impl CapabilitiesSnapshot {
    /// Parse a snapshot from YAML.
    pub fn from_yaml(yaml: &str) -> OwsResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| OwsError::Capabilities(e.to_string()))
    }

    /// Load a snapshot from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> OwsResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let snapshot = Self::from_yaml(&content)?;
        info!(
            path = %path.display(),
            feature_types = snapshot.feature_types.len(),
            "Loaded WFS capabilities snapshot"
        );
        Ok(snapshot)
    }

    fn feature_type(&self, name: &str) -> Option<&FeatureTypeCapabilities> {
        self.feature_types.iter().find(|f| f.name == name)
    }
}

impl ServiceCapabilities for CapabilitiesSnapshot {
    fn service_type(&self) -> &str {
        SERVICE_TYPE
    }

    fn service_version(&self) -> &str {
        VERSION_2_0_0
    }

    /// A CRS is supported when any feature type offers it.
    fn supports_crs(&self, crs: &Crs) -> bool {
        self.feature_types
            .iter()
            .any(|f| f.crs().any(|c| &c == crs))
    }

    fn supports_format(&self, operation: &str, format: &str) -> bool {
        let formats = match operation {
            GETCAPABILITIES => &self.output_formats.get_capabilities,
            DESCRIBEFEATURETYPE => &self.output_formats.describe_feature_type,
            GETFEATURE => &self.output_formats.get_feature,
            _ => return false,
        };
        formats.iter().any(|f| f == format)
    }
}

impl WfsCapabilities for CapabilitiesSnapshot {
    fn has_feature_type(&self, name: &str) -> bool {
        self.feature_type(name).is_some()
    }

    fn supports_feature_type_crs(&self, feature_type: &str, crs: &Crs) -> bool {
        self.feature_type(feature_type)
            .map(|f| f.crs().any(|c| &c == crs))
            .unwrap_or(false)
    }

    fn count_default(&self) -> Option<u32> {
        self.count_default
    }
}
