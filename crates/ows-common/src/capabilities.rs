//! Capabilities as seen by the validators.
//!
//! A validator only asks membership questions of the server metadata. Each
//! protocol family extends [`ServiceCapabilities`] with its own queries and
//! ships a snapshot type implementing them.

use crate::crs::Crs;

/// Queries shared by every OGC service family.
pub trait ServiceCapabilities {
    /// Service type, e.g. `WMS` or `WFS`.
    fn service_type(&self) -> &str;

    /// Protocol version the service speaks.
    fn service_version(&self) -> &str;

    /// Whether the service can answer in the given CRS.
    fn supports_crs(&self, crs: &Crs) -> bool;

    /// Whether `format` is offered for the named operation.
    fn supports_format(&self, operation: &str, format: &str) -> bool;
}
