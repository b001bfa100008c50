//! End-to-end tests of the WFS request layer against the shared fixtures.

use ows_common::exception::{
    invalid_parameter_value, missing_parameter_value, version_negotiation_failed,
};
use ows_common::{BoundingBox, Crs, ExceptionReport, OperationRequest, QueryValues};
use test_utils::{fixtures, init_tracing, require_test_file, WFS_CAPABILITIES_YAML};
use wfs_protocol::exceptions::operation_parsing_failed;
use wfs_protocol::{
    CapabilitiesSnapshot, Filter, GetFeature, WfsCapabilities, WfsExceptionReport, WfsRequest,
    COUNT, GETFEATURE, REQUEST, SRSNAME, VERSION,
};

fn capabilities() -> CapabilitiesSnapshot {
    CapabilitiesSnapshot::from_yaml(WFS_CAPABILITIES_YAML).unwrap()
}

// ============================================================================
// Capabilities fixture
// ============================================================================

#[test]
fn test_load_capabilities_file() {
    init_tracing();
    let path = require_test_file!("wfs_capabilities.yaml");
    let caps = CapabilitiesSnapshot::load(path).unwrap();
    assert_eq!(caps.feature_types.len(), 2);
    assert_eq!(caps.count_default(), Some(500));
    assert!(caps.supports_feature_type_crs("ns:roads", &Crs::new("EPSG", 28992)));
}

// ============================================================================
// KVP
// ============================================================================

#[test]
fn test_getfeature_fixture_is_valid() {
    init_tracing();
    let query = QueryValues::parse(fixtures::wfs::GETFEATURE_QUERY);
    let request = WfsRequest::handle_kvp(&query, &capabilities()).unwrap();

    let WfsRequest::GetFeature(getfeature) = request else {
        panic!("expected GetFeature, got {:?}", request);
    };
    assert_eq!(getfeature.result_type.as_deref(), Some("hits"));
    assert_eq!(getfeature.start_index, Some(0));
    assert_eq!(
        getfeature.query.filter,
        Some(Filter::BoundingBox(
            BoundingBox::new(4.5, 51.5, 5.5, 52.5).with_crs(Crs::new("EPSG", 4326))
        ))
    );
}

#[test]
fn test_empty_query() {
    assert_eq!(
        WfsRequest::parse_kvp(&QueryValues::new()).unwrap_err().into_vec(),
        vec![missing_parameter_value(VERSION), missing_parameter_value(REQUEST)]
    );
}

#[test]
fn test_describe_every_feature_type() {
    let query = QueryValues::parse("SERVICE=WFS&VERSION=2.0.0&REQUEST=DescribeFeatureType");
    let request = WfsRequest::parse_kvp(&query).unwrap();
    assert!(request.validate(&capabilities()).is_empty());
}

#[test]
fn test_getcapabilities_accept_versions() {
    let caps = capabilities();
    let validate = |query: &str| {
        WfsRequest::parse_kvp(&QueryValues::parse(query))
            .unwrap()
            .validate(&caps)
            .into_vec()
    };

    assert!(validate("SERVICE=WFS&REQUEST=GetCapabilities&ACCEPTVERSIONS=1.1.0,2.0.0").is_empty());
    assert_eq!(
        validate("SERVICE=WFS&REQUEST=GetCapabilities&ACCEPTVERSIONS=1.1.0"),
        vec![version_negotiation_failed("1.1.0")]
    );
}

#[test]
fn test_getfeature_limits() {
    let query = QueryValues::parse(
        "SERVICE=WFS&VERSION=2.0.0&REQUEST=GetFeature&TYPENAMES=ns:rivers\
         &SRSNAME=EPSG:3857&COUNT=501",
    );
    let request = WfsRequest::parse_kvp(&query).unwrap();
    assert_eq!(
        request.validate(&capabilities()).into_vec(),
        vec![
            invalid_parameter_value(fixtures::crs::EPSG_3857, SRSNAME),
            invalid_parameter_value("501", COUNT),
        ]
    );
}

#[test]
fn test_conflicting_filters_report() {
    let query = QueryValues::parse(
        "SERVICE=WFS&VERSION=2.0.0&REQUEST=GetFeature&TYPENAMES=ns:roads\
         &BBOX=0,0,1,1&RESOURCEID=roads.1",
    );
    let exceptions = WfsRequest::parse_kvp(&query).unwrap_err();
    assert_eq!(
        exceptions.as_slice(),
        &[operation_parsing_failed("BBOX,RESOURCEID", GETFEATURE)]
    );

    let report = String::from_utf8(WfsExceptionReport.report(exceptions.as_slice())).unwrap();
    assert!(report.contains(
        "\n <Exception exceptionCode=\"OperationParsingFailed\" locator=\"GetFeature\">"
    ));
    assert!(report.ends_with("</Exception>\n</ExceptionReport>"));
}

// ============================================================================
// XML
// ============================================================================

#[test]
fn test_getfeature_xml_fixture() {
    init_tracing();
    let request = GetFeature::parse_xml(fixtures::wfs::GETFEATURE_XML.as_bytes()).unwrap();
    assert!(request.validate(&capabilities()).is_empty());

    assert_eq!(request.count, Some(25));
    assert_eq!(request.base.attributes.len(), 3);
    assert_eq!(request.query.property_names, vec!["name"]);
    assert_eq!(request.query.srs_name, Some(Crs::new("EPSG", 28992)));
    assert_eq!(
        request.query.filter,
        Some(Filter::BoundingBox(
            BoundingBox::new(120000.0, 480000.0, 130000.0, 490000.0)
                .with_crs(Crs::new("EPSG", 28992))
        ))
    );
}

#[test]
fn test_getfeature_xml_round_trip() {
    let request = GetFeature::parse_xml(fixtures::wfs::GETFEATURE_XML.as_bytes()).unwrap();
    let xml = request.build_xml().unwrap();
    assert_eq!(GetFeature::parse_xml(&xml).unwrap(), request);
}

#[test]
fn test_getfeature_xml_to_kvp() {
    let mut request = GetFeature::parse_xml(fixtures::wfs::GETFEATURE_XML.as_bytes()).unwrap();
    let query = request.build_kvp();
    assert_eq!(query.first_ignore_case(SRSNAME), Some(fixtures::crs::URN_28992));

    request.base.attributes.clear();
    assert_eq!(GetFeature::parse_kvp(&query).unwrap(), request);
}

#[test]
fn test_xml_dispatch_by_root() {
    let request = WfsRequest::parse_xml(fixtures::wfs::GETFEATURE_XML.as_bytes()).unwrap();
    assert_eq!(request.request_type(), GETFEATURE);
}
