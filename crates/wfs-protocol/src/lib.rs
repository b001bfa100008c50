//! OGC WFS 2.0.0 request layer.
//!
//! Converts GetCapabilities, DescribeFeatureType and GetFeature requests
//! between their KVP, XML and structured forms, and validates them against a
//! [`WfsCapabilities`](capabilities::WfsCapabilities) implementation.

pub mod base;
pub mod capabilities;
pub mod describefeaturetype;
pub mod exceptions;
pub mod getcapabilities;
pub mod getfeature;
pub mod request;

pub use capabilities::{CapabilitiesSnapshot, FeatureTypeCapabilities, WfsCapabilities};
pub use describefeaturetype::{DescribeFeatureType, DescribeFeatureTypeKvp};
pub use exceptions::{WfsExceptionCode, WfsExceptionReport};
pub use getcapabilities::{GetCapabilities, GetCapabilitiesKvp};
pub use getfeature::{Filter, GetFeature, GetFeatureKvp, Query};
pub use request::WfsRequest;

pub const SERVICE_TYPE: &str = "WFS";
pub const VERSION_2_0_0: &str = "2.0.0";

// Operations
pub const GETCAPABILITIES: &str = "GetCapabilities";
pub const DESCRIBEFEATURETYPE: &str = "DescribeFeatureType";
pub const GETFEATURE: &str = "GetFeature";

// Tokens shared by every operation
pub const SERVICE: &str = "SERVICE";
pub const VERSION: &str = "VERSION";
pub const REQUEST: &str = "REQUEST";
pub const OUTPUTFORMAT: &str = "OUTPUTFORMAT";

// GetCapabilities tokens
pub const ACCEPTVERSIONS: &str = "ACCEPTVERSIONS";

// DescribeFeatureType and GetFeature tokens
pub const TYPENAMES: &str = "TYPENAMES";
pub const SRSNAME: &str = "SRSNAME";
pub const PROPERTYNAME: &str = "PROPERTYNAME";
pub const SORTBY: &str = "SORTBY";
pub const BBOX: &str = "BBOX";
pub const RESOURCEID: &str = "RESOURCEID";
pub const COUNT: &str = "COUNT";
pub const STARTINDEX: &str = "STARTINDEX";
pub const RESULTTYPE: &str = "RESULTTYPE";

// RESULTTYPE values
pub const RESULTS: &str = "results";
pub const HITS: &str = "hits";
