//! Physical bin coordinates within a warehouse location.

use serde::{Deserialize, Serialize};

/// Where a lot physically sits inside a location.
///
/// Captured on each assignment line at commit time so pick lists keep
/// showing where the stock was, even if the lot is later moved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinCoordinates {
    pub aisle: Option<String>,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub bin: Option<String>,
    pub zone: Option<String>,
}

impl BinCoordinates {
    /// Human-readable coordinate path, e.g. `A3 / R2 / S1 / B4 (cold)`.
    ///
    /// Empty components are skipped; returns `None` when nothing is set.
    #[must_use]
    pub fn display_path(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.aisle, &self.rack, &self.shelf, &self.bin]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        if parts.is_empty() && self.zone.is_none() {
            return None;
        }
        let mut path = parts.join(" / ");
        if let Some(zone) = &self.zone {
            if path.is_empty() {
                path = format!("({zone})");
            } else {
                path = format!("{path} ({zone})");
            }
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_path_full() {
        let coords = BinCoordinates {
            aisle: Some("A3".into()),
            rack: Some("R2".into()),
            shelf: Some("S1".into()),
            bin: Some("B4".into()),
            zone: Some("cold".into()),
        };
        assert_eq!(coords.display_path().unwrap(), "A3 / R2 / S1 / B4 (cold)");
    }

    #[test]
    fn test_display_path_partial() {
        let coords = BinCoordinates {
            aisle: Some("A1".into()),
            bin: Some("B9".into()),
            ..BinCoordinates::default()
        };
        assert_eq!(coords.display_path().unwrap(), "A1 / B9");
    }

    #[test]
    fn test_display_path_empty() {
        assert_eq!(BinCoordinates::default().display_path(), None);
    }
}
