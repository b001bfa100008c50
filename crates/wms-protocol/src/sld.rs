//! Layer and style selection shared by GetMap and GetFeatureInfo.

use serde::{Deserialize, Serialize};

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::{split_list, Exception, Exceptions, OwsResult, XmlBuilder};

use crate::capabilities::WmsCapabilities;
use crate::exceptions::{layer_not_defined, style_not_defined, style_not_defined_for};
use crate::LAYERS;

/// A layer with the style to draw it in; `None` is the layer's default style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedLayer {
    pub name: String,
    #[serde(default)]
    pub style: Option<String>,
}

impl NamedLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// The ordered layers of a map request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledLayerDescriptor {
    pub named_layers: Vec<NamedLayer>,
}

impl StyledLayerDescriptor {
    pub fn new(named_layers: Vec<NamedLayer>) -> Self {
        Self { named_layers }
    }

    /// Pair the LAYERS and STYLES lists.
    ///
    /// Without styles every layer gets its default style; otherwise both
    /// lists must have the same length. An empty style entry also means the
    /// default style.
    pub fn from_kvp(layers: &str, styles: &str) -> Result<Self, Exception> {
        let layers = split_list(layers);
        let styles = split_list(styles);

        if styles.is_empty() {
            return Ok(Self::new(layers.into_iter().map(NamedLayer::new).collect()));
        }
        if layers.len() != styles.len() {
            return Err(style_not_defined());
        }

        let named_layers = layers
            .into_iter()
            .zip(styles)
            .map(|(name, style)| NamedLayer {
                name,
                style: Some(style).filter(|s| !s.is_empty()),
            })
            .collect();
        Ok(Self::new(named_layers))
    }

    /// LAYERS value.
    pub fn layers_kvp(&self) -> String {
        self.layer_names().collect::<Vec<_>>().join(",")
    }

    /// STYLES value; empty when every layer uses its default style.
    pub fn styles_kvp(&self) -> String {
        if self.named_layers.iter().all(|l| l.style.is_none()) {
            return String::new();
        }
        self.named_layers
            .iter()
            .map(|l| l.style.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.named_layers.iter().map(|l| l.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.named_layers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.named_layers.len()
    }

    /// Check every layer and style against the capabilities.
    pub fn validate(&self, capabilities: &dyn WmsCapabilities, exceptions: &mut Exceptions) {
        if self.is_empty() {
            exceptions.push(missing_parameter_value(LAYERS));
            return;
        }
        if let Some(limit) = capabilities.layer_limit() {
            if self.len() > limit {
                exceptions.push(invalid_parameter_value(&self.layers_kvp(), LAYERS));
            }
        }

        for layer in &self.named_layers {
            if !capabilities.has_layer(&layer.name) {
                exceptions.push(layer_not_defined(&layer.name, LAYERS));
                continue;
            }
            if let Some(style) = &layer.style {
                if !capabilities.has_style(&layer.name, style) {
                    exceptions.push(style_not_defined_for(style, &layer.name));
                }
            }
        }
    }

    pub(crate) fn write_xml(&self, builder: &mut XmlBuilder) -> OwsResult<()> {
        builder.start("StyledLayerDescriptor", &[], &[])?;
        for layer in &self.named_layers {
            builder.start("NamedLayer", &[], &[])?;
            builder.text_element("Name", &layer.name)?;
            if let Some(style) = &layer.style {
                builder.start("NamedStyle", &[], &[])?;
                builder.text_element("Name", style)?;
                builder.end("NamedStyle")?;
            }
            builder.end("NamedLayer")?;
        }
        builder.end("StyledLayerDescriptor")
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SldXml {
    #[serde(rename = "NamedLayer", default)]
    named_layers: Vec<NamedLayerXml>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedLayerXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "NamedStyle", default)]
    named_style: Option<NamedStyleXml>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedStyleXml {
    #[serde(rename = "Name", default)]
    name: String,
}

impl From<SldXml> for StyledLayerDescriptor {
    fn from(xml: SldXml) -> Self {
        let named_layers = xml
            .named_layers
            .into_iter()
            .map(|layer| NamedLayer {
                name: layer.name,
                style: layer
                    .named_style
                    .map(|s| s.name)
                    .filter(|s| !s.is_empty()),
            })
            .collect();
        Self::new(named_layers)
    }
}
