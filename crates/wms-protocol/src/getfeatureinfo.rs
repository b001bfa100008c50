//! WMS GetFeatureInfo request.
//!
//! A GetFeatureInfo carries the map selection of the GetMap it was issued
//! from, plus the layers to query and the pixel that was clicked.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use ows_common::exception::{invalid_parameter_value, missing_parameter_value};
use ows_common::kvp_binding;
use ows_common::xml::decode_request;
use ows_common::{
    split_list, BaseRequest, BoundingBox, Crs, Exceptions, KvpBinding, OperationKvp,
    OperationRequest, OwsResult, QueryValues, XmlBuilder,
};

use crate::base::{
    base_request, check_request, empty_query, parse_crs, parse_optional_u32, validate_base,
    validate_bbox, validate_crs, validate_exceptions_format, validate_size, write_bbox, write_size,
    BoundingBoxXml, Size, SizeXml, RESERVED_ATTRIBUTES,
};
use crate::capabilities::WmsCapabilities;
use crate::exceptions::{invalid_format, invalid_point, layer_not_defined, layer_not_queryable};
use crate::getmap::MapKvp;
use crate::sld::{SldXml, StyledLayerDescriptor};
use crate::{
    BBOX, CRS, EXCEPTIONS, FEATURE_COUNT, FORMAT, GETFEATUREINFO, HEIGHT, I, INFO_FORMAT, J,
    LAYERS, QUERY_LAYERS, REQUEST, SERVICE, STYLES, VERSION, WIDTH,
};

/// Flat KVP form of GetFeatureInfo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetFeatureInfoKvp {
    pub service: String,
    pub version: String,
    pub request: String,
    pub map: MapKvp,
    pub query_layers: String,
    pub info_format: String,
    pub i: String,
    pub j: String,
    pub feature_count: Option<String>,
    pub exceptions: Option<String>,
}

impl OperationKvp for GetFeatureInfoKvp {
    const BINDINGS: &'static [KvpBinding<Self>] = &[
        kvp_binding!(GetFeatureInfoKvp, required SERVICE => service),
        kvp_binding!(GetFeatureInfoKvp, required VERSION => version),
        kvp_binding!(GetFeatureInfoKvp, required REQUEST => request),
        kvp_binding!(GetFeatureInfoKvp, required LAYERS => map.layers),
        kvp_binding!(GetFeatureInfoKvp, required STYLES => map.styles),
        kvp_binding!(GetFeatureInfoKvp, required CRS => map.crs),
        kvp_binding!(GetFeatureInfoKvp, required BBOX => map.bbox),
        kvp_binding!(GetFeatureInfoKvp, required WIDTH => map.width),
        kvp_binding!(GetFeatureInfoKvp, required HEIGHT => map.height),
        kvp_binding!(GetFeatureInfoKvp, required FORMAT => map.format),
        kvp_binding!(GetFeatureInfoKvp, required QUERY_LAYERS => query_layers),
        kvp_binding!(GetFeatureInfoKvp, required INFO_FORMAT => info_format),
        kvp_binding!(GetFeatureInfoKvp, required I => i),
        kvp_binding!(GetFeatureInfoKvp, required J => j),
        kvp_binding!(GetFeatureInfoKvp, optional FEATURE_COUNT => feature_count),
        kvp_binding!(GetFeatureInfoKvp, optional EXCEPTIONS => exceptions),
    ];
}

impl GetFeatureInfoKvp {
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

/// A WMS 1.3.0 GetFeatureInfo request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetFeatureInfo {
    #[serde(flatten)]
    pub base: BaseRequest,
    pub styled_layer_descriptor: StyledLayerDescriptor,
    pub crs: Crs,
    pub bounding_box: BoundingBox,
    pub size: Size,
    /// Format of the originating map; may be empty in XML bodies.
    #[serde(default)]
    pub format: String,
    pub query_layers: Vec<String>,
    /// Pixel column.
    pub i: u32,
    /// Pixel row.
    pub j: u32,
    pub info_format: String,
    #[serde(default)]
    pub feature_count: Option<u32>,
    #[serde(default)]
    pub exceptions: Option<String>,
}

/// I and J are reported together when either is not a pixel index.
fn parse_point(i: &str, j: &str, exceptions: &mut Exceptions) -> (u32, u32) {
    match (i.parse(), j.parse()) {
        (Ok(i), Ok(j)) => (i, j),
        _ => {
            exceptions.push(invalid_point(i, j));
            (0, 0)
        }
    }
}

impl GetFeatureInfo {
    /// Build the structured request from its KVP form.
    pub fn from_kvp(kvp: &GetFeatureInfoKvp) -> Result<Self, Exceptions> {
        let mut exceptions = Exceptions::new();

        check_request(&kvp.request, GETFEATUREINFO, &mut exceptions);
        let base = base_request(&kvp.service, &kvp.version, &mut exceptions);
        let map = kvp.map.decode(&mut exceptions);
        let (i, j) = parse_point(&kvp.i, &kvp.j, &mut exceptions);
        let feature_count =
            parse_optional_u32(kvp.feature_count.as_deref(), FEATURE_COUNT, &mut exceptions);

        let request = Self {
            base,
            styled_layer_descriptor: map.styled_layer_descriptor,
            crs: map.crs,
            bounding_box: map.bounding_box,
            size: map.size,
            format: kvp.map.format.clone(),
            query_layers: split_list(&kvp.query_layers),
            i,
            j,
            info_format: kvp.info_format.clone(),
            feature_count,
            exceptions: kvp.exceptions.clone(),
        };
        exceptions.into_result(request)
    }

    pub fn to_kvp(&self) -> GetFeatureInfoKvp {
        GetFeatureInfoKvp {
            service: self.base.service.clone(),
            version: self.base.version.clone(),
            request: GETFEATUREINFO.to_string(),
            map: MapKvp::encode(
                &self.styled_layer_descriptor,
                &self.crs,
                &self.bounding_box,
                self.size,
                &self.format,
            ),
            query_layers: self.query_layers.join(","),
            info_format: self.info_format.clone(),
            i: self.i.to_string(),
            j: self.j.to_string(),
            feature_count: self.feature_count.map(|c| c.to_string()),
            exceptions: self.exceptions.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GetFeatureInfoXml {
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
    #[serde(rename = "Size", default)]
    size: SizeXml,
    #[serde(rename = "Format", default)]
    format: String,
    #[serde(rename = "QueryLayers", default)]
    query_layers: Vec<String>,
    #[serde(rename = "I", default)]
    i: String,
    #[serde(rename = "J", default)]
    j: String,
    #[serde(rename = "InfoFormat", default)]
    info_format: String,
    #[serde(rename = "FeatureCount", default)]
    feature_count: Option<String>,
    #[serde(rename = "Exceptions", default)]
    exceptions: Option<String>,
}

impl OperationRequest for GetFeatureInfo {
    type Capabilities = dyn WmsCapabilities;

    fn request_type(&self) -> &'static str {
        GETFEATUREINFO
    }

    #[instrument(skip_all)]
    fn parse_kvp(query: &QueryValues) -> Result<Self, Exceptions> {
        let kvp = GetFeatureInfoKvp::from_query(query)?;
        let request = Self::from_kvp(&kvp)?;
        debug!(query_layers = request.query_layers.len(), "parsed GetFeatureInfo KVP");
        Ok(request)
    }

    #[instrument(skip_all)]
    fn parse_xml(body: &[u8]) -> Result<Self, Exceptions> {
        let (xml, attributes): (GetFeatureInfoXml, _) =
            decode_request(body, GETFEATUREINFO, RESERVED_ATTRIBUTES)?;
        let mut exceptions = Exceptions::new();

        let mut base = base_request(&xml.service, &xml.version, &mut exceptions);
        base.attributes = attributes;
        let crs = parse_crs(&xml.crs, CRS, &mut exceptions);
        let bounding_box = xml.bounding_box.into_bbox(&mut exceptions);
        let size = xml.size.into_size(&mut exceptions);
        let (i, j) = parse_point(&xml.i, &xml.j, &mut exceptions);
        let feature_count =
            parse_optional_u32(xml.feature_count.as_deref(), FEATURE_COUNT, &mut exceptions);

        let request = Self {
            base,
            styled_layer_descriptor: xml.styled_layer_descriptor.into(),
            crs,
            bounding_box,
            size,
            format: xml.format,
            query_layers: xml.query_layers,
            i,
            j,
            info_format: xml.info_format,
            feature_count,
            exceptions: xml.exceptions,
        };
        exceptions.into_result(request)
    }

    fn build_kvp(&self) -> QueryValues {
        self.to_kvp().to_query()
    }

    fn build_xml(&self) -> OwsResult<Vec<u8>> {
        let mut builder = XmlBuilder::new()?;
        builder.start(GETFEATUREINFO, &self.base.root_attributes(), &self.base.attributes)?;
        self.styled_layer_descriptor.write_xml(&mut builder)?;
        builder.text_element("CRS", &self.crs.to_string())?;
        write_bbox(&mut builder, &self.bounding_box)?;
        write_size(&mut builder, self.size)?;
        if !self.format.is_empty() {
            builder.text_element("Format", &self.format)?;
        }
        for layer in &self.query_layers {
            builder.text_element("QueryLayers", layer)?;
        }
        builder.text_element("I", &self.i.to_string())?;
        builder.text_element("J", &self.j.to_string())?;
        builder.text_element("InfoFormat", &self.info_format)?;
        let feature_count = self.feature_count.map(|c| c.to_string());
        builder.optional_element("FeatureCount", feature_count.as_deref())?;
        builder.optional_element("Exceptions", self.exceptions.as_deref())?;
        builder.end(GETFEATUREINFO)?;
        builder.finish()
    }

    fn validate(&self, capabilities: &Self::Capabilities) -> Exceptions {
        let mut exceptions = Exceptions::new();

        validate_base(&self.base, capabilities, &mut exceptions);
        self.styled_layer_descriptor.validate(capabilities, &mut exceptions);

        if self.query_layers.is_empty() {
            exceptions.push(missing_parameter_value(QUERY_LAYERS));
        }
        for layer in &self.query_layers {
            if !capabilities.has_layer(layer) {
                exceptions.push(layer_not_defined(layer, QUERY_LAYERS));
            } else if !capabilities.is_queryable(layer) {
                exceptions.push(layer_not_queryable(layer));
            }
        }

        if self.info_format.is_empty() {
            exceptions.push(missing_parameter_value(INFO_FORMAT));
        } else if !capabilities.supports_format(GETFEATUREINFO, &self.info_format) {
            exceptions.push(invalid_format(&self.info_format, INFO_FORMAT));
        }

        validate_crs(&self.crs, capabilities, &mut exceptions);
        validate_bbox(&self.bounding_box, &mut exceptions);
        validate_size(self.size, capabilities, &mut exceptions);

        if self.i >= self.size.width || self.j >= self.size.height {
            exceptions.push(invalid_point(&self.i.to_string(), &self.j.to_string()));
        }
        if self.feature_count == Some(0) {
            exceptions.push(invalid_parameter_value("0", FEATURE_COUNT));
        }
        validate_exceptions_format(self.exceptions.as_deref(), capabilities, &mut exceptions);

        if !exceptions.is_empty() {
            debug!(count = exceptions.len(), "GetFeatureInfo failed validation");
        }
        exceptions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitiesSnapshot;
    use crate::exceptions::style_not_defined;

    const QUERY: &str = "SERVICE=WMS&VERSION=1.3.0&REQUEST=GetFeatureInfo&LAYERS=gfs_TMP,goes_IR\
        &STYLES=&CRS=EPSG:4326&BBOX=-180,-90,180,90&WIDTH=256&HEIGHT=256&FORMAT=image/png\
        &QUERY_LAYERS=gfs_TMP&INFO_FORMAT=application/json&I=128&J=64&FEATURE_COUNT=5";

    const XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetFeatureInfo service="WMS" version="1.3.0">
 <StyledLayerDescriptor>
  <NamedLayer>
   <Name>gfs_TMP</Name>
  </NamedLayer>
  <NamedLayer>
   <Name>goes_IR</Name>
  </NamedLayer>
 </StyledLayerDescriptor>
 <CRS>EPSG:4326</CRS>
 <BoundingBox>
  <LowerCorner>-180 -90</LowerCorner>
  <UpperCorner>180 90</UpperCorner>
 </BoundingBox>
 <Size>
  <Width>256</Width>
  <Height>256</Height>
 </Size>
 <Format>image/png</Format>
 <QueryLayers>gfs_TMP</QueryLayers>
 <I>128</I>
 <J>64</J>
 <InfoFormat>application/json</InfoFormat>
 <FeatureCount>5</FeatureCount>
</GetFeatureInfo>"#;

    fn capabilities() -> CapabilitiesSnapshot {
        CapabilitiesSnapshot::from_yaml(
            r#"
crs: ["EPSG:4326"]
formats:
  get_feature_info: ["application/json"]
layers:
  - name: gfs_TMP
    queryable: true
  - name: goes_IR
"#,
        )
        .unwrap()
    }

    fn expected() -> GetFeatureInfo {
        GetFeatureInfo {
            base: BaseRequest::new("WMS", "1.3.0"),
            styled_layer_descriptor: StyledLayerDescriptor::from_kvp("gfs_TMP,goes_IR", "").unwrap(),
            crs: Crs::new("EPSG", 4326),
            bounding_box: BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
            size: Size {
                width: 256,
                height: 256,
            },
            format: "image/png".to_string(),
            query_layers: vec!["gfs_TMP".to_string()],
            i: 128,
            j: 64,
            info_format: "application/json".to_string(),
            feature_count: Some(5),
            exceptions: None,
        }
    }

    #[test]
    fn test_parse_kvp() {
        let request = GetFeatureInfo::parse_kvp(&QueryValues::parse(QUERY)).unwrap();
        assert_eq!(request, expected());
        assert!(request.validate(&capabilities()).is_empty());
    }

    #[test]
    fn test_parse_kvp_invalid_point() {
        let query = QueryValues::parse(&QUERY.replace("I=128", "I=x"));
        assert_eq!(
            GetFeatureInfo::parse_kvp(&query).unwrap_err().into_vec(),
            vec![invalid_point("x", "64")]
        );
    }

    #[test]
    fn test_parse_kvp_errors() {
        let query = QueryValues::parse(
            "VERSION=1.3.0&LAYERS=a&STYLES=x,y&BBOX=1&BBOX=2&FEATURE_COUNT=many",
        );
        assert_eq!(
            GetFeatureInfo::parse_kvp(&query).unwrap_err().into_vec(),
            vec![invalid_parameter_value(BBOX, "1,2")]
        );

        let query = QueryValues::parse(&format!("{}&FEATURE_COUNT=", QUERY));
        assert_eq!(
            GetFeatureInfo::parse_kvp(&query).unwrap_err().into_vec(),
            vec![invalid_parameter_value("5,", FEATURE_COUNT)]
        );

        let query = QUERY
            .replace("STYLES=", "STYLES=a,b,c")
            .replace("FEATURE_COUNT=5", "FEATURE_COUNT=many");
        assert_eq!(
            GetFeatureInfo::parse_kvp(&QueryValues::parse(&query)).unwrap_err().into_vec(),
            vec![
                style_not_defined(),
                invalid_parameter_value("many", FEATURE_COUNT),
            ]
        );
    }

    #[test]
    fn test_build_kvp_round_trip() {
        let request = expected();
        let query = request.build_kvp();
        assert_eq!(query.first_ignore_case(STYLES), Some(""));
        assert_eq!(query.first_ignore_case(QUERY_LAYERS), Some("gfs_TMP"));
        assert_eq!(GetFeatureInfo::parse_kvp(&query).unwrap(), request);
    }

    #[test]
    fn test_xml_round_trip() {
        assert_eq!(GetFeatureInfo::parse_xml(XML.as_bytes()).unwrap(), expected());
        let xml = String::from_utf8(expected().build_xml().unwrap()).unwrap();
        assert_eq!(xml, XML);
    }

    #[test]
    fn test_validate() {
        let mut request = expected();
        request.query_layers = vec!["goes_IR".to_string(), "roads".to_string()];
        request.info_format = "text/html".to_string();
        request.i = 256;
        request.feature_count = Some(0);

        assert_eq!(
            request.validate(&capabilities()).into_vec(),
            vec![
                layer_not_queryable("goes_IR"),
                layer_not_defined("roads", QUERY_LAYERS),
                invalid_format("text/html", INFO_FORMAT),
                invalid_point("256", "64"),
                invalid_parameter_value("0", FEATURE_COUNT),
            ]
        );
    }

    #[test]
    fn test_validate_missing_query_layers() {
        let mut request = expected();
        request.query_layers.clear();
        request.info_format.clear();
        assert_eq!(
            request.validate(&capabilities()).into_vec(),
            vec![
                missing_parameter_value(QUERY_LAYERS),
                missing_parameter_value(INFO_FORMAT),
            ]
        );
    }
}
