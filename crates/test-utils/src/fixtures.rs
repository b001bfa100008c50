//! Common test fixtures for the WMS and WFS request tests.
//!
//! The capabilities fixtures live as YAML files under `testdata/`; the
//! constants below embed the same files so tests can parse them without I/O.

/// WMS 1.3.0 capabilities snapshot.
pub const WMS_CAPABILITIES_YAML: &str = include_str!("../testdata/wms_capabilities.yaml");

/// WFS 2.0.0 capabilities snapshot.
pub const WFS_CAPABILITIES_YAML: &str = include_str!("../testdata/wfs_capabilities.yaml");

/// Common CRS identifiers.
pub mod crs {
    /// WGS84 geographic
    pub const EPSG_4326: &str = "EPSG:4326";

    /// Web Mercator
    pub const EPSG_3857: &str = "EPSG:3857";

    /// Amersfoort / RD New, in URN form
    pub const URN_28992: &str = "urn:ogc:def:crs:EPSG::28992";
}

/// WMS requests matching [`WMS_CAPABILITIES_YAML`](super::WMS_CAPABILITIES_YAML).
pub mod wms {
    /// Parameters of a GetMap request.
    #[derive(Debug, Clone, Copy)]
    pub struct GetMapParams {
        pub service: &'static str,
        pub version: &'static str,
        pub request: &'static str,
        pub layers: &'static str,
        pub styles: &'static str,
        pub crs: &'static str,
        pub bbox: &'static str,
        pub width: u32,
        pub height: u32,
        pub format: &'static str,
    }

    /// A GetMap that passes validation.
    pub const DEFAULT_GETMAP: GetMapParams = GetMapParams {
        service: "WMS",
        version: "1.3.0",
        request: "GetMap",
        layers: "gfs_TMP_2m",
        styles: "temperature",
        crs: super::crs::EPSG_4326,
        bbox: "-130,20,-60,55",
        width: 256,
        height: 256,
        format: "image/png",
    };

    impl GetMapParams {
        /// Converts parameters to a query string.
        pub fn to_query_string(&self) -> String {
            format!(
                "SERVICE={}&VERSION={}&REQUEST={}&LAYERS={}&STYLES={}&CRS={}&BBOX={}&WIDTH={}&HEIGHT={}&FORMAT={}",
                self.service,
                self.version,
                self.request,
                self.layers,
                self.styles,
                self.crs,
                self.bbox,
                self.width,
                self.height,
                self.format
            )
        }
    }

    /// A GetFeatureInfo that passes validation.
    pub const GETFEATUREINFO_QUERY: &str = "SERVICE=WMS&VERSION=1.3.0&REQUEST=GetFeatureInfo\
        &LAYERS=gfs_TMP_2m,mrms_reflectivity&STYLES=&CRS=EPSG:4326&BBOX=-130,20,-60,55\
        &WIDTH=256&HEIGHT=256&FORMAT=image/png&QUERY_LAYERS=gfs_TMP_2m,mrms_reflectivity\
        &INFO_FORMAT=application/json&I=128&J=64&FEATURE_COUNT=5";

    /// A GetMap XML body with namespace declarations on the root.
    pub const GETMAP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetMap xmlns="http://www.opengis.net/sld" xmlns:se="http://www.opengis.net/se" service="WMS" version="1.3.0">
 <StyledLayerDescriptor>
  <NamedLayer>
   <Name>gfs_TMP_2m</Name>
   <NamedStyle>
    <Name>temperature</Name>
   </NamedStyle>
  </NamedLayer>
  <NamedLayer>
   <Name>goes18_C13</Name>
  </NamedLayer>
 </StyledLayerDescriptor>
 <CRS>EPSG:3857</CRS>
 <BoundingBox>
  <LowerCorner>-20037508 -20037508</LowerCorner>
  <UpperCorner>20037508 20037508</UpperCorner>
 </BoundingBox>
 <Output>
  <Size>
   <Width>512</Width>
   <Height>512</Height>
  </Size>
  <Format>image/jpeg</Format>
  <Transparent>false</Transparent>
 </Output>
 <Exceptions>XML</Exceptions>
 <Time>2024-01-01T06:00:00Z</Time>
</GetMap>"#;
}

/// WFS requests matching [`WFS_CAPABILITIES_YAML`](super::WFS_CAPABILITIES_YAML).
pub mod wfs {
    /// A GetFeature that passes validation.
    pub const GETFEATURE_QUERY: &str = "SERVICE=WFS&VERSION=2.0.0&REQUEST=GetFeature\
        &TYPENAMES=ns:roads&SRSNAME=EPSG:4326&BBOX=4.5,51.5,5.5,52.5,EPSG:4326\
        &COUNT=100&STARTINDEX=0&RESULTTYPE=hits&OUTPUTFORMAT=application/json";

    /// A GetFeature XML body with prefixed elements.
    pub const GETFEATURE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:GetFeature xmlns:wfs="http://www.opengis.net/wfs/2.0" xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:gml="http://www.opengis.net/gml/3.2" service="WFS" version="2.0.0" count="25">
 <wfs:Query typeNames="ns:roads" srsName="urn:ogc:def:crs:EPSG::28992">
  <wfs:PropertyName>name</wfs:PropertyName>
  <fes:Filter>
   <fes:BBOX>
    <gml:Envelope srsName="urn:ogc:def:crs:EPSG::28992">
     <gml:lowerCorner>120000 480000</gml:lowerCorner>
     <gml:upperCorner>130000 490000</gml:upperCorner>
    </gml:Envelope>
   </fes:BBOX>
  </fes:Filter>
 </wfs:Query>
</wfs:GetFeature>"#;
}
