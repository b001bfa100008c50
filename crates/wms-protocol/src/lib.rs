//! OGC WMS 1.3.0 request layer.
//!
//! Converts GetCapabilities, GetMap and GetFeatureInfo requests between their
//! KVP, XML and structured forms, and validates them against a
//! [`WmsCapabilities`](capabilities::WmsCapabilities) implementation.

pub mod base;
pub mod capabilities;
pub mod exceptions;
pub mod getcapabilities;
pub mod getfeatureinfo;
pub mod getmap;
pub mod request;
pub mod sld;

pub use base::Size;
pub use capabilities::{CapabilitiesSnapshot, WmsCapabilities};
pub use exceptions::{WmsExceptionCode, WmsExceptionReport};
pub use getcapabilities::{GetCapabilities, GetCapabilitiesKvp};
pub use getfeatureinfo::{GetFeatureInfo, GetFeatureInfoKvp};
pub use getmap::{GetMap, GetMapKvp, MapKvp, Output};
pub use request::WmsRequest;
pub use sld::{NamedLayer, StyledLayerDescriptor};

pub const SERVICE_TYPE: &str = "WMS";
pub const VERSION_1_3_0: &str = "1.3.0";

// Operations
pub const GETCAPABILITIES: &str = "GetCapabilities";
pub const GETMAP: &str = "GetMap";
pub const GETFEATUREINFO: &str = "GetFeatureInfo";

// Tokens shared by every operation
pub const SERVICE: &str = "SERVICE";
pub const VERSION: &str = "VERSION";
pub const REQUEST: &str = "REQUEST";

// GetCapabilities tokens
pub const UPDATESEQUENCE: &str = "UPDATESEQUENCE";

// GetMap tokens
pub const LAYERS: &str = "LAYERS";
pub const STYLES: &str = "STYLES";
pub const CRS: &str = "CRS";
pub const BBOX: &str = "BBOX";
pub const WIDTH: &str = "WIDTH";
pub const HEIGHT: &str = "HEIGHT";
pub const FORMAT: &str = "FORMAT";
pub const TRANSPARENT: &str = "TRANSPARENT";
pub const BGCOLOR: &str = "BGCOLOR";
pub const EXCEPTIONS: &str = "EXCEPTIONS";
pub const TIME: &str = "TIME";
pub const ELEVATION: &str = "ELEVATION";

// GetFeatureInfo tokens
pub const QUERY_LAYERS: &str = "QUERY_LAYERS";
pub const INFO_FORMAT: &str = "INFO_FORMAT";
pub const I: &str = "I";
pub const J: &str = "J";
pub const FEATURE_COUNT: &str = "FEATURE_COUNT";
