//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::crs::Crs;
use crate::exception::{invalid_parameter_value, Exception};

/// Locator used when a bounding box literal cannot be parsed.
const BBOX_LOCATOR: &str = "boundingbox";

/// A bounding box as it appears on the wire.
///
/// The corners are kept exactly as they were parsed. A box whose lower corner
/// lies above or right of its upper corner is still a valid value here; the
/// operation validators reject it against the capabilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lower_corner: [f64; 2],
    pub upper_corner: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Crs>,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            lower_corner: [min_x, min_y],
            upper_corner: [max_x, max_y],
            crs: None,
        }
    }

    /// Attach a CRS to this bounding box.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    /// Parse a BBOX parameter: "minx,miny,maxx,maxy" with an optional trailing CRS.
    pub fn parse_kvp(s: &str) -> Result<Self, Exception> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(invalid_parameter_value(s, BBOX_LOCATOR));
        }

        let mut coords = [0.0f64; 4];
        for (slot, part) in coords.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| invalid_parameter_value(s, BBOX_LOCATOR))?;
        }

        let crs = match parts.get(4) {
            Some(raw) if !raw.is_empty() => {
                Some(Crs::parse(raw).map_err(|_| invalid_parameter_value(s, BBOX_LOCATOR))?)
            }
            _ => None,
        };

        Ok(Self {
            lower_corner: [coords[0], coords[1]],
            upper_corner: [coords[2], coords[3]],
            crs,
        })
    }

    /// Parse a GML corner ("x y") pair as used by the XML encodings.
    pub fn parse_corner(s: &str) -> Option<[f64; 2]> {
        let mut parts = s.split_whitespace();
        let x = parts.next()?.parse().ok()?;
        let y = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some([x, y])
    }

    /// Render the four coordinates as a KVP value with six decimals.
    pub fn to_kvp(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.lower_corner[0], self.lower_corner[1], self.upper_corner[0], self.upper_corner[1]
        )
    }

    /// Like [`BoundingBox::to_kvp`] but with the CRS URN appended when one is set.
    pub fn to_kvp_with_crs(&self) -> String {
        match &self.crs {
            Some(crs) if !crs.is_empty() => format!("{},{}", self.to_kvp(), crs.to_urn()),
            _ => self.to_kvp(),
        }
    }

    /// Render a corner as a GML "x y" pair.
    pub fn corner_text(corner: [f64; 2]) -> String {
        format!("{} {}", corner[0], corner[1])
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.upper_corner[0] - self.lower_corner[0]
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.upper_corner[1] - self.lower_corner[1]
    }

    /// True when the box has no area or its corners are swapped.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kvp_bbox() {
        let bbox = BoundingBox::parse_kvp("-125.0,24.0,-66.0,50.0").unwrap();
        assert_eq!(bbox.lower_corner, [-125.0, 24.0]);
        assert_eq!(bbox.upper_corner, [-66.0, 50.0]);
        assert!(bbox.crs.is_none());
    }

    #[test]
    fn test_parse_kvp_keeps_swapped_corners() {
        let bbox = BoundingBox::parse_kvp("0,0,-100,-100").unwrap();
        assert_eq!(bbox.upper_corner, [-100.0, -100.0]);
        assert!(bbox.is_degenerate());
    }

    #[test]
    fn test_parse_kvp_with_crs_suffix() {
        let bbox = BoundingBox::parse_kvp("1,2,3,4,urn:ogc:def:crs:EPSG::28992").unwrap();
        assert_eq!(bbox.crs, Some(Crs::new("EPSG", 28992)));
        assert_eq!(
            bbox.to_kvp_with_crs(),
            "1.000000,2.000000,3.000000,4.000000,urn:ogc:def:crs:EPSG::28992"
        );
    }

    #[test]
    fn test_parse_corner() {
        assert_eq!(BoundingBox::parse_corner("-180 -90"), Some([-180.0, -90.0]));
        assert_eq!(BoundingBox::parse_corner("1"), None);
        assert_eq!(BoundingBox::parse_corner("1 2 3"), None);
    }
}
