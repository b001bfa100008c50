//! End-to-end tests of the WMS request layer against the shared fixtures.

use ows_common::exception::{
    invalid_parameter_value, missing_parameter_value, version_negotiation_failed,
};
use ows_common::{OperationRequest, OwsError, QueryValues};
use test_utils::{fixtures, init_tracing, require_test_file, WMS_CAPABILITIES_YAML};
use wms_protocol::exceptions::{
    current_update_sequence, invalid_crs, invalid_dimension_value, invalid_format,
    invalid_point, invalid_update_sequence, layer_not_defined, missing_dimension_value,
    style_not_defined_for,
};
use wms_protocol::{
    CapabilitiesSnapshot, GetMap, WmsCapabilities, WmsRequest, BBOX, BGCOLOR, ELEVATION,
    EXCEPTIONS, FORMAT, LAYERS, REQUEST, TIME, VERSION, WIDTH,
};

fn capabilities() -> CapabilitiesSnapshot {
    CapabilitiesSnapshot::from_yaml(WMS_CAPABILITIES_YAML).unwrap()
}

// ============================================================================
// Capabilities fixture
// ============================================================================

#[test]
fn test_load_capabilities_file() {
    init_tracing();
    let path = require_test_file!("wms_capabilities.yaml");
    let caps = CapabilitiesSnapshot::load(path).unwrap();
    assert_eq!(caps.layers.len(), 3);
    assert_eq!(caps.layer_limit(), Some(3));
    assert_eq!(caps.update_sequence(), Some("42"));
    assert!(caps.requires_dimension("mrms_reflectivity", ELEVATION));
    assert!(!caps.requires_dimension("gfs_TMP_2m", TIME));
}

#[test]
fn test_load_rejects_malformed_snapshot() {
    let dir = test_utils::temp_test_dir();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "layers: {}").unwrap();
    assert!(matches!(
        CapabilitiesSnapshot::load(&path),
        Err(OwsError::Capabilities(_))
    ));
    assert!(matches!(
        CapabilitiesSnapshot::load(dir.path().join("absent.yaml")),
        Err(OwsError::InternalError(_))
    ));
}

// ============================================================================
// KVP
// ============================================================================

#[test]
fn test_getmap_fixture_is_valid() {
    init_tracing();
    let query = QueryValues::parse(&fixtures::wms::DEFAULT_GETMAP.to_query_string());
    let request = WmsRequest::handle_kvp(&query, &capabilities()).unwrap();
    assert_eq!(request.request_type(), "GetMap");
}

#[test]
fn test_getmap_kvp_round_trip() {
    let query = QueryValues::parse(&fixtures::wms::DEFAULT_GETMAP.to_query_string());
    let request = GetMap::parse_kvp(&query).unwrap();
    let rebuilt = request.build_kvp();
    assert_eq!(rebuilt.first_ignore_case(BBOX), Some("-130.000000,20.000000,-60.000000,55.000000"));
    assert_eq!(GetMap::parse_kvp(&rebuilt).unwrap(), request);
}

#[test]
fn test_empty_query() {
    assert_eq!(
        WmsRequest::parse_kvp(&QueryValues::new()).unwrap_err().into_vec(),
        vec![missing_parameter_value(VERSION), missing_parameter_value(REQUEST)]
    );
}

#[test]
fn test_repeated_token_is_reported_once() {
    let query = QueryValues::parse(
        "SERVICE=WMS&VERSION=1.3.0&REQUEST=GetMap&LAYERS=gfs_TMP_2m&STYLES=&CRS=EPSG:4326\
         &BBOX=1,2,3,4&bbox=5,6,7,8&WIDTH=256&HEIGHT=256&FORMAT=image/png",
    );
    assert_eq!(
        WmsRequest::parse_kvp(&query).unwrap_err().into_vec(),
        vec![invalid_parameter_value(BBOX, "1,2,3,4,5,6,7,8")]
    );
}

#[test]
fn test_getmap_validation_reports_every_problem() {
    init_tracing();
    let query = QueryValues::parse(
        "SERVICE=WMS&VERSION=1.3.0&REQUEST=GetMap\
         &LAYERS=gfs_TMP_2m,unknown,goes18_C13,mrms_reflectivity&STYLES=temperature,,bogus,\
         &CRS=EPSG:28992&BBOX=10,10,5,5&WIDTH=4096&HEIGHT=256&FORMAT=image/gif\
         &BGCOLOR=red&EXCEPTIONS=JSON&TIME=2030-01-01T00:00:00Z",
    );
    let request = WmsRequest::parse_kvp(&query).unwrap();

    assert_eq!(
        request.validate(&capabilities()).into_vec(),
        vec![
            invalid_parameter_value("gfs_TMP_2m,unknown,goes18_C13,mrms_reflectivity", LAYERS),
            layer_not_defined("unknown", LAYERS),
            style_not_defined_for("bogus", "goes18_C13"),
            invalid_crs("EPSG:28992"),
            invalid_parameter_value("10.000000,10.000000,5.000000,5.000000", BBOX),
            invalid_parameter_value("4096", WIDTH),
            invalid_format("image/gif", FORMAT),
            invalid_parameter_value("red", BGCOLOR),
            invalid_parameter_value("JSON", EXCEPTIONS),
            invalid_dimension_value(TIME, "2030-01-01T00:00:00Z"),
            missing_dimension_value(ELEVATION),
        ]
    );
}

#[test]
fn test_handle_kvp_renders_service_exception_report() {
    let query = QueryValues::parse(
        "SERVICE=WMS&VERSION=1.3.0&REQUEST=GetMap&LAYERS=gfs_TMP_2m&STYLES=\
         &CRS=EPSG:28992&BBOX=-130,20,-60,55&WIDTH=256&HEIGHT=256&FORMAT=image/png",
    );
    let report = WmsRequest::handle_kvp(&query, &capabilities()).unwrap_err();
    let report = String::from_utf8(report).unwrap();
    assert!(report.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ServiceExceptionReport"));
    assert!(report.contains("<ServiceException code=\"InvalidCRS\" locator=\"CRS\">"));
    assert!(report.ends_with("\n</ServiceExceptionReport>"));
}

#[test]
fn test_getfeatureinfo_fixture() {
    let caps = capabilities();
    let query = QueryValues::parse(fixtures::wms::GETFEATUREINFO_QUERY);
    let request = WmsRequest::parse_kvp(&query).unwrap();
    assert!(request.validate(&caps).is_empty());

    let query = QueryValues::parse(&fixtures::wms::GETFEATUREINFO_QUERY.replace("I=128", "I=256"));
    let request = WmsRequest::parse_kvp(&query).unwrap();
    assert_eq!(request.validate(&caps).into_vec(), vec![invalid_point("256", "64")]);
}

#[test]
fn test_getcapabilities_update_sequence() {
    let caps = capabilities();
    let validate = |query: &str| {
        WmsRequest::parse_kvp(&QueryValues::parse(query))
            .unwrap()
            .validate(&caps)
            .into_vec()
    };

    assert!(validate("SERVICE=WMS&REQUEST=GetCapabilities&UPDATESEQUENCE=7").is_empty());
    assert_eq!(
        validate("SERVICE=wms&REQUEST=GetCapabilities&UPDATESEQUENCE=42"),
        vec![current_update_sequence()]
    );
    assert_eq!(
        validate("SERVICE=WMS&REQUEST=GetCapabilities&UPDATESEQUENCE=43"),
        vec![invalid_update_sequence()]
    );
    assert_eq!(
        validate("SERVICE=WMS&REQUEST=GetCapabilities&VERSION=1.1.1"),
        vec![version_negotiation_failed("1.1.1")]
    );
}

// ============================================================================
// XML
// ============================================================================

#[test]
fn test_getmap_xml_fixture() {
    init_tracing();
    let request = WmsRequest::parse_xml(fixtures::wms::GETMAP_XML.as_bytes()).unwrap();
    assert!(request.validate(&capabilities()).is_empty());

    let WmsRequest::GetMap(getmap) = &request else {
        panic!("expected GetMap, got {:?}", request);
    };
    assert_eq!(getmap.base.attributes.len(), 2);
    assert_eq!(getmap.styled_layer_descriptor.styles_kvp(), "temperature,");
    assert_eq!(getmap.output.transparent, Some(false));
}

#[test]
fn test_getmap_xml_round_trip_keeps_attributes() {
    let request = GetMap::parse_xml(fixtures::wms::GETMAP_XML.as_bytes()).unwrap();
    let xml = request.build_xml().unwrap();
    assert_eq!(GetMap::parse_xml(&xml).unwrap(), request);

    let xml = String::from_utf8(xml).unwrap();
    assert!(xml.contains(r#"<GetMap service="WMS" version="1.3.0" xmlns="http://www.opengis.net/sld" xmlns:se="http://www.opengis.net/se">"#));
}

#[test]
fn test_getmap_xml_to_kvp() {
    let mut request = GetMap::parse_xml(fixtures::wms::GETMAP_XML.as_bytes()).unwrap();
    let query = request.build_kvp();
    assert_eq!(query.first_ignore_case("TRANSPARENT"), Some("FALSE"));

    request.base.attributes.clear();
    assert_eq!(GetMap::parse_kvp(&query).unwrap(), request);
}
