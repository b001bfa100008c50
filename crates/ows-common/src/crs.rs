//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

const URN_PREFIX: &str = "urn:ogc:def:crs:";

/// A CRS identifier: authority namespace plus numeric code.
///
/// The zero value (empty namespace, code 0) stands for "no CRS given".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs {
    pub namespace: String,
    pub code: u32,
}

impl Crs {
    pub fn new(namespace: impl Into<String>, code: u32) -> Self {
        Self {
            namespace: namespace.into(),
            code,
        }
    }

    /// Parse a CRS string as found in requests.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326"
    /// - "urn:ogc:def:crs:EPSG::4326" (the version segment may be filled in)
    /// - "" (yields the zero value)
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let (namespace, code) = match s.strip_prefix(URN_PREFIX) {
            Some(rest) => {
                // <authority>:<version>:<code>, version usually empty
                let mut parts = rest.splitn(3, ':');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(ns), Some(_version), Some(code)) if !ns.is_empty() => (ns, code),
                    _ => return Err(CrsParseError::InvalidFormat(s.to_string())),
                }
            }
            None => s
                .split_once(':')
                .ok_or_else(|| CrsParseError::InvalidFormat(s.to_string()))?,
        };

        let code = code
            .parse()
            .map_err(|_| CrsParseError::InvalidCode(s.to_string()))?;

        Ok(Self::new(namespace, code))
    }

    /// True for the zero value.
    pub fn is_empty(&self) -> bool {
        self.namespace.is_empty() && self.code == 0
    }

    /// Render in URN form: "urn:ogc:def:crs:EPSG::4326".
    pub fn to_urn(&self) -> String {
        format!("{}{}::{}", URN_PREFIX, self.namespace, self.code)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        write!(f, "{}:{}", self.namespace, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Invalid CRS format: {0}. Expected 'AUTHORITY:CODE' or 'urn:ogc:def:crs:AUTHORITY::CODE'")]
    InvalidFormat(String),

    #[error("Invalid CRS code in: {0}")]
    InvalidCode(String),
}
