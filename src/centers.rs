//! Region center lookup.
//!
//! Camera focus targets are not derived from geometry (a centroid can fall
//! outside a concave or multi-part region, or in the wrong hemisphere for
//! far-flung territories) but come from a curated table mapping region codes
//! to hand-picked `[lat, lng]` coordinates.

use crate::geometry::LngLat;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CenterTableError {
    #[error("failed to read center table: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse center table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Curated table of region focus coordinates.
///
/// Unknown codes are an expected condition (region lists and the table can
/// drift apart) and are handled by the caller, not treated as an error here.
#[derive(Debug, Clone, Default)]
pub struct CenterTable {
    centers: HashMap<String, LngLat>,
}

/// On-disk form: `{"DEU": [51.0, 9.0], ...}` with latitude first, matching
/// the common atlas convention for hand-maintained data.
#[derive(Deserialize)]
struct RawTable(HashMap<String, [f64; 2]>);

impl CenterTable {
    pub fn from_json(bytes: &[u8]) -> Result<Self, CenterTableError> {
        let raw: RawTable = serde_json::from_slice(bytes)?;
        let centers = raw
            .0
            .into_iter()
            .filter_map(|(code, [lat, lng])| {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
                    warn!(code = %code, lat, lng, "dropping out-of-range center entry");
                    return None;
                }
                Some((code.to_ascii_uppercase(), LngLat { lng, lat }))
            })
            .collect::<HashMap<_, _>>();
        info!(entries = centers.len(), "center table loaded");
        Ok(Self { centers })
    }

    pub async fn load(path: &Path) -> Result<Self, CenterTableError> {
        let bytes = tokio::fs::read(path).await?;
        Self::from_json(&bytes)
    }

    /// Focus coordinate for a region, if the table knows it.
    pub fn get(&self, code: &str) -> Option<LngLat> {
        self.centers.get(&code.to_ascii_uppercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"{
        "DEU": [51.0, 9.0],
        "nzl": [-42.0, 174.0],
        "BAD": [123.0, 9.0]
    }"#;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = CenterTable::from_json(TABLE.as_bytes()).unwrap();
        let center = table.get("deu").unwrap();
        assert_eq!(center.lat, 51.0);
        assert_eq!(center.lng, 9.0);
        assert!(table.get("NZL").is_some());
    }

    #[test]
    fn test_lat_lng_order() {
        let table = CenterTable::from_json(TABLE.as_bytes()).unwrap();
        let center = table.get("NZL").unwrap();
        assert_eq!(center.lat, -42.0);
        assert_eq!(center.lng, 174.0);
    }

    #[test]
    fn test_unknown_code_is_none() {
        let table = CenterTable::from_json(TABLE.as_bytes()).unwrap();
        assert!(table.get("ATL").is_none());
    }

    #[test]
    fn test_out_of_range_entries_dropped() {
        let table = CenterTable::from_json(TABLE.as_bytes()).unwrap();
        assert!(table.get("BAD").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(CenterTable::from_json(b"[]").is_err());
    }
}
