//! Common types shared by the OGC protocol crates.
//!
//! Holds the wire primitives (bounding box, CRS), the exception model, the
//! KVP binding tables and the XML helpers every operation codec builds on.

pub mod bbox;
pub mod capabilities;
pub mod crs;
pub mod error;
pub mod exception;
pub mod kvp;
pub mod request;
pub mod xml;

pub use bbox::BoundingBox;
pub use capabilities::ServiceCapabilities;
pub use crs::{Crs, CrsParseError};
pub use error::{OwsError, OwsResult};
pub use exception::{Exception, ExceptionReport, Exceptions, OwsExceptionCode};
pub use kvp::{KvpBinding, OperationKvp, QueryValues};
pub use request::{BaseRequest, OperationRequest};
pub use xml::{strip_duplicate_attr, XmlAttribute, XmlBuilder};

/// Split a comma separated KVP list; the empty string is the empty list.
pub fn split_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        Vec::new()
    } else {
        value.split(',').map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert!(split_list("").is_empty());
        assert_eq!(split_list("a"), vec!["a"]);
        assert_eq!(split_list("a,,b"), vec!["a", "", "b"]);
    }
}
