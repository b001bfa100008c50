//! WMS capabilities queries and an in-memory snapshot implementing them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

use ows_common::{Crs, OwsError, OwsResult, ServiceCapabilities};

use crate::{GETCAPABILITIES, GETFEATUREINFO, GETMAP, SERVICE_TYPE, VERSION_1_3_0};

/// What the WMS validators need to know about the server.
pub trait WmsCapabilities: ServiceCapabilities {
    fn has_layer(&self, layer: &str) -> bool;

    /// Whether `layer` offers the named style.
    fn has_style(&self, layer: &str, style: &str) -> bool;

    fn is_queryable(&self, layer: &str) -> bool;

    fn supports_exception_format(&self, format: &str) -> bool;

    /// Whether `value` is acceptable for the dimension of `layer`. Layers
    /// without the dimension accept anything.
    fn accepts_dimension_value(&self, layer: &str, dimension: &str, value: &str) -> bool;

    /// Whether `layer` has the dimension but no default for it.
    fn requires_dimension(&self, layer: &str, dimension: &str) -> bool;

    fn max_width(&self) -> Option<u32>;

    fn max_height(&self) -> Option<u32>;

    fn layer_limit(&self) -> Option<usize>;

    fn update_sequence(&self) -> Option<&str>;
}

/// Formats offered per operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationFormats {
    #[serde(default)]
    pub get_capabilities: Vec<String>,
    #[serde(default)]
    pub get_map: Vec<String>,
    #[serde(default)]
    pub get_feature_info: Vec<String>,
}

/// A layer dimension such as TIME or ELEVATION.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionCapabilities {
    pub name: String,
    /// Allowed values; empty means any value.
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub default: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerCapabilities {
    pub name: String,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub queryable: bool,
    #[serde(default)]
    pub dimensions: Vec<DimensionCapabilities>,
}

impl LayerCapabilities {
    fn dimension(&self, name: &str) -> Option<&DimensionCapabilities> {
        self.dimensions
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

/// Capabilities of a WMS 1.3.0 service, typically loaded from YAML.
///
/// ```yaml
/// crs: ["EPSG:4326", "EPSG:3857"]
/// formats:
///   get_map: ["image/png"]
///   get_feature_info: ["application/json"]
/// layers:
///   - name: gfs_TMP
///     styles: [gradient]
///     queryable: true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesSnapshot {
    /// CRS identifiers in either short or URN form.
    #[serde(default)]
    pub crs: Vec<String>,

    #[serde(default)]
    pub formats: OperationFormats,

    #[serde(default = "default_exception_formats")]
    pub exceptions: Vec<String>,

    #[serde(default)]
    pub layers: Vec<LayerCapabilities>,

    #[serde(default = "default_max_size")]
    pub max_width: Option<u32>,

    #[serde(default = "default_max_size")]
    pub max_height: Option<u32>,

    #[serde(default)]
    pub layer_limit: Option<usize>,

    #[serde(default)]
    pub update_sequence: Option<String>,
}

impl Default for CapabilitiesSnapshot {
    fn default() -> Self {
        Self {
            crs: Vec::new(),
            formats: OperationFormats::default(),
            exceptions: default_exception_formats(),
            layers: Vec::new(),
            max_width: default_max_size(),
            max_height: default_max_size(),
            layer_limit: None,
            update_sequence: None,
        }
    }
}

fn default_exception_formats() -> Vec<String> {
    vec!["XML".to_string(), "INIMAGE".to_string(), "BLANK".to_string()]
}

fn default_max_size() -> Option<u32> {
    Some(4096)
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
            layers = snapshot.layers.len(),
            "Loaded WMS capabilities snapshot"
        );
        Ok(snapshot)
    }

    fn layer(&self, name: &str) -> Option<&LayerCapabilities> {
        self.layers.iter().find(|l| l.name == name)
    }
}

impl ServiceCapabilities for CapabilitiesSnapshot {
    fn service_type(&self) -> &str {
        SERVICE_TYPE
    }

    fn service_version(&self) -> &str {
        VERSION_1_3_0
    }

    fn supports_crs(&self, crs: &Crs) -> bool {
        self.crs
            .iter()
            .filter_map(|c| Crs::parse(c).ok())
            .any(|c| &c == crs)
    }

    fn supports_format(&self, operation: &str, format: &str) -> bool {
        let formats = match operation {
            GETCAPABILITIES => &self.formats.get_capabilities,
            GETMAP => &self.formats.get_map,
            GETFEATUREINFO => &self.formats.get_feature_info,
            _ => return false,
        };
        formats.iter().any(|f| f == format)
    }
}

impl WmsCapabilities for CapabilitiesSnapshot {
    fn has_layer(&self, layer: &str) -> bool {
        self.layer(layer).is_some()
    }

    fn has_style(&self, layer: &str, style: &str) -> bool {
        self.layer(layer)
            .map(|l| l.styles.iter().any(|s| s == style))
            .unwrap_or(false)
    }

    fn is_queryable(&self, layer: &str) -> bool {
        self.layer(layer).map(|l| l.queryable).unwrap_or(false)
    }

    fn supports_exception_format(&self, format: &str) -> bool {
        self.exceptions.iter().any(|f| f == format)
    }

    fn accepts_dimension_value(&self, layer: &str, dimension: &str, value: &str) -> bool {
        match self.layer(layer).and_then(|l| l.dimension(dimension)) {
            Some(d) => d.values.is_empty() || d.values.iter().any(|v| v == value),
            None => true,
        }
    }

    fn requires_dimension(&self, layer: &str, dimension: &str) -> bool {
        self.layer(layer)
            .and_then(|l| l.dimension(dimension))
            .map(|d| d.default.is_none())
            .unwrap_or(false)
    }

    fn max_width(&self) -> Option<u32> {
        self.max_width
    }

    fn max_height(&self) -> Option<u32> {
        self.max_height
    }

    fn layer_limit(&self) -> Option<usize> {
        self.layer_limit
    }

    fn update_sequence(&self) -> Option<&str> {
        self.update_sequence.as_deref()
    }
}
