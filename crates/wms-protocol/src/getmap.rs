//! WMS GetMap request.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    BaseRequest, BoundingBox, Crs, Exceptions, KvpBinding, OperationKvp, OperationRequest,
    OwsResult, QueryValues, XmlBuilder,
};

use crate::base::{
    base_request, check_request, empty_query, format_bool, parse_bbox, parse_bool, parse_crs,
    parse_pixels, validate_base, validate_bbox, validate_crs, validate_dimensions,
    validate_exceptions_format, validate_size, write_bbox, write_size, BoundingBoxXml, Size,
    SizeXml, RESERVED_ATTRIBUTES,
};
use crate::capabilities::WmsCapabilities;
use crate::exceptions::invalid_format;
use crate::sld::{SldXml, StyledLayerDescriptor};
use crate::{
    BBOX, BGCOLOR, CRS, ELEVATION, EXCEPTIONS, FORMAT, GETMAP, HEIGHT, LAYERS, REQUEST, SERVICE,
    STYLES, TIME, TRANSPARENT, VERSION, WIDTH,
};

/// The mandatory map tokens, shared with GetFeatureInfo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapKvp {
    pub layers: String,
    pub styles: String,
    pub crs: String,
    pub bbox: String,
    pub width: String,
    pub height: String,
    pub format: String,
}

/// The decoded map tokens.
pub(crate) struct MapSelection {
    pub styled_layer_descriptor: StyledLayerDescriptor,
    pub crs: Crs,
    pub bounding_box: BoundingBox,
    pub size: Size,
}

impl MapKvp {
    /// Coerce the map tokens, reporting every failure.
    pub(crate) fn decode(&self, exceptions: &mut Exceptions) -> MapSelection {
        let styled_layer_descriptor = StyledLayerDescriptor::from_kvp(&self.layers, &self.styles)
            .unwrap_or_else(|exception| {
                exceptions.push(exception);
                StyledLayerDescriptor::default()
            });

        MapSelection {
            styled_layer_descriptor,
            crs: parse_crs(&self.crs, CRS, exceptions),
            bounding_box: parse_bbox(&self.bbox, exceptions),
            size: Size {
                width: parse_pixels(&self.width, WIDTH, exceptions),
                height: parse_pixels(&self.height, HEIGHT, exceptions),
            },
        }
    }

    pub(crate) fn encode(
        styled_layer_descriptor: &StyledLayerDescriptor,
        crs: &Crs,
        bounding_box: &BoundingBox,
        size: Size,
        format: &str,
    ) -> Self {
        Self {
            layers: styled_layer_descriptor.layers_kvp(),
            styles: styled_layer_descriptor.styles_kvp(),
            crs: crs.to_string(),
            bbox: bounding_box.to_kvp(),
            width: size.width.to_string(),
            height: size.height.to_string(),
            format: format.to_string(),
        }
    }
}

/// Flat KVP form of GetMap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetMapKvp {
    pub service: String,
    pub version: String,
    pub request: String,
    pub map: MapKvp,
    pub transparent: Option<String>,
    pub bgcolor: Option<String>,
    pub exceptions: Option<String>,
    pub time: Option<String>,
    pub elevation: Option<String>,
}

impl OperationKvp for GetMapKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(GetMapKvp, required SERVICE => service),
        kvp_binding!(GetMapKvp, required VERSION => version),
        kvp_binding!(GetMapKvp, required REQUEST => request),
        kvp_binding!(GetMapKvp, required LAYERS => map.layers),
        kvp_binding!(GetMapKvp, required STYLES => map.styles),
        kvp_binding!(GetMapKvp, required CRS => map.crs),
        kvp_binding!(GetMapKvp, required BBOX => map.bbox),
        kvp_binding!(GetMapKvp, required WIDTH => map.width),
        kvp_binding!(GetMapKvp, required HEIGHT => map.height),
        kvp_binding!(GetMapKvp, required FORMAT => map.format),
        kvp_binding!(GetMapKvp, optional TRANSPARENT => transparent),
        kvp_binding!(GetMapKvp, optional BGCOLOR => bgcolor),
        kvp_binding!(GetMapKvp, optional EXCEPTIONS => exceptions),
        kvp_binding!(GetMapKvp, optional TIME => time),
        kvp_binding!(GetMapKvp, optional ELEVATION => elevation),
    ];
}

impl GetMapKvp {
    /// Read the KVP form from a query; SERVICE is upper-cased.
    pub fn from_query(query: &QueryValues) -> Result<Self, Exceptions> {
        if query.is_empty() {
            return Err(empty_query());
        }
        let mut kvp = Self::parse_query(query)?;
        kvp.service = kvp.service.to_uppercase();
        Ok(kvp)
    }
}

/// Size, format and background of the rendered map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub size: Size,
    pub format: String,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub bgcolor: Option<String>,
}

/// A WMS 1.3.0 GetMap request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetMap {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub styled_layer_descriptor: StyledLayerDescriptor,
    pub crs: Crs,
    pub bounding_box: BoundingBox,
    pub output: Output,
    #[serde(default)]
    pub exceptions: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub elevation: Option<String>,
}

impl GetMap {
    /// Build the structured request from its KVP form.
    pub fn from_kvp(kvp: &GetMapKvp) -> Result<Self, Exceptions> {
        let mut exceptions = Exceptions::new();

        check_request(&kvp.request, GETMAP, &mut exceptions);
        let base = base_request(&kvp.service, &kvp.version, &mut exceptions);
        let map = kvp.map.decode(&mut exceptions);
        let transparent = parse_bool(kvp.transparent.as_deref(), TRANSPARENT, &mut exceptions);

        let request = Self {
            base,
            styled_layer_descriptor: map.styled_layer_descriptor,
            crs: map.crs,
            bounding_box: map.bounding_box,
            output: Output {
                size: map.size,
                format: kvp.map.format.clone(),
                transparent,
                bgcolor: kvp.bgcolor.clone(),
            },
            exceptions: kvp.exceptions.clone(),
            time: kvp.time.clone(),
            elevation: kvp.elevation.clone(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> GetMapKvp {
        GetMapKvp {
            service: self.base.service.clone(),
            version: self.base.version.clone(),
            request: GETMAP.to_string(),
            map: MapKvp::encode(
                &self.styled_layer_descriptor,
                &self.crs,
                &self.bounding_box,
                self.output.size,
                &self.output.format,
            ),
            transparent: self.output.transparent.map(|t| format_bool(t).to_string()),
            bgcolor: self.output.bgcolor.clone(),
            exceptions: self.exceptions.clone(),
            time: self.time.clone(),
            elevation: self.elevation.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetMapXml {
    #[serde(rename = "@service", default)]
    service: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "StyledLayerDescriptor", default)]
    styled_layer_descriptor: SldXml,
    #[serde(rename = "CRS", default)]
    crs: String,
    #[serde(rename = "BoundingBox", default)]
    bounding_box: BoundingBoxXml,
    #[serde(rename = "Output", default)]
    output: OutputXml,
    #[serde(rename = "Exceptions", default)]
    exceptions: Option<String>,
    #[serde(rename = "Time", default)]
    time: Option<String>,
    #[serde(rename = "Elevation", default)]
    elevation: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputXml {
    #[serde(rename = "Size", default)]
    size: SizeXml,
    #[serde(rename = "Format", default)]
    format: String,
    #[serde(rename = "Transparent", default)]
    transparent: Option<String>,
    #[serde(rename = "BGcolor", default)]
    bgcolor: Option<String>,
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

impl OperationRequest for GetMap {
    type Capabilities = dyn WmsCapabilities;

    fn request_type(&self) -> &'static str {
        GETMAP
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        let kvp = GetMapKvp::from_query(query)?;
        let request = Self::from_kvp(&kvp)?;
        debug!(layers = request.styled_layer_descriptor.len(), "parsed GetMap KVP");
        Ok(request)
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let (xml, attributes): (GetMapXml, _) = decode_request(body, GETMAP, RESERVED_ATTRIBUTES)?;
        let mut exceptions = Exceptions::new();

        let mut base = base_request(&xml.service, &xml.version, &mut exceptions);
        base.attributes = attributes;
        let crs = parse_crs(&xml.crs, CRS, &mut exceptions);
        let bounding_box = xml.bounding_box.into_bbox(&mut exceptions);
        let size = xml.output.size.into_size(&mut exceptions);
        let transparent = parse_bool(xml.output.transparent.as_deref(), TRANSPARENT, &mut exceptions);

        let request = Self {
            base,
            styled_layer_descriptor: xml.styled_layer_descriptor.into(),
            crs,
            bounding_box,
            output: Output {
                size,
                format: xml.output.format,
                transparent,
                bgcolor: xml.output.bgcolor,
            },
            exceptions: xml.exceptions,
            time: xml.time,
            elevation: xml.elevation,
        };
        exceptions.into_result(request)
    }

    fn build_kvp(&self) -> QueryValues {
        self.to_kvp().to_query()
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        let mut builder = XmlBuilder::new()?;
        builder.start(GETMAP, &self.base.root_attributes(), &self.base.attributes)?;
        self.styled_layer_descriptor.write_xml(&mut builder)?;
        builder.text_element("CRS", &self.crs.to_string())?;
        write_bbox(&mut builder, &self.bounding_box)?;

        builder.start("Output", &[], &[])?;
        write_size(&mut builder, self.output.size)?;
        builder.text_element("Format", &self.output.format)?;
        let transparent = self.output.transparent.map(|t| t.to_string());
        builder.optional_element("Transparent", transparent.as_deref())?;
        builder.optional_element("BGcolor", self.output.bgcolor.as_deref())?;
        builder.end("Output")?;

        builder.optional_element("Exceptions", self.exceptions.as_deref())?;
        builder.optional_element("Time", self.time.as_deref())?;
        builder.optional_element("Elevation", self.elevation.as_deref())?;
        builder.end(GETMAP)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        validate_base(&self.base, capabilities, &mut exceptions);
        self.styled_layer_descriptor.validate(capabilities, &mut exceptions);
        validate_crs(&self.crs, capabilities, &mut exceptions);
        validate_bbox(&self.bounding_box, &mut exceptions);
        validate_size(self.output.size, capabilities, &mut exceptions);

        if self.output.format.is_empty() {
            exceptions.push(missing_parameter_value(FORMAT));
        } else if !capabilities.supports_format(GETMAP, &self.output.format) {
            exceptions.push(invalid_format(&self.output.format, FORMAT));
        }
        if let Some(bgcolor) = &self.output.bgcolor {
            if !is_hex_color(bgcolor) {
                exceptions.push(invalid_parameter_value(bgcolor, BGCOLOR));
            }
        }
        validate_exceptions_format(self.exceptions.as_deref(), capabilities, &mut exceptions);
        validate_dimensions(
            self.styled_layer_descriptor.layer_names(),
            self.time.as_deref(),
            self.elevation.as_deref(),
            capabilities,
            &mut exceptions,
        );

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "GetMap failed validation");
        }
        exceptions
    }
}
