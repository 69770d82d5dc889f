//! Coordinate extraction for GIS `POINT` geometry strings.

use anyhow::{Result, bail};
use regex::Regex;
use std::sync::LazyLock;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)").expect("numeric token pattern is valid")
});

/// Extracts `(latitude, longitude)` from a string of the form `"POINT (LON LAT)"`.
///
/// Every numeric token in the input is collected; the second is the latitude
/// and the first the longitude, since the geometry lists longitude first.
///
/// # Errors
///
/// Returns an error if the string holds fewer than two numeric tokens.
pub fn point_to_coords(point: &str) -> Result<(f64, f64)> {
    let mut numbers = NUMBER.find_iter(point).map(|m| m.as_str());

    let (Some(lon), Some(lat)) = (numbers.next(), numbers.next()) else {
        bail!("geometry {point:?} does not contain a longitude and latitude");
    };

    Ok((lat.parse()?, lon.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_swaps_to_lat_lon() {
        let (lat, lon) = point_to_coords("POINT (-87.65 41.85)").unwrap();
        assert_eq!(lat, 41.85);
        assert_eq!(lon, -87.65);
    }

    #[test]
    fn test_point_with_trailing_newline() {
        let (lat, lon) = point_to_coords("POINT (-87.62 41.88)\n").unwrap();
        assert_eq!((lat, lon), (41.88, -87.62));
    }

    #[test]
    fn test_point_integer_and_signed_values() {
        let (lat, lon) = point_to_coords("POINT (+122 37)").unwrap();
        assert_eq!((lat, lon), (37.0, 122.0));
    }

    #[test]
    fn test_point_leading_decimal() {
        let (lat, lon) = point_to_coords("POINT (-.5 .25)").unwrap();
        assert_eq!((lat, lon), (0.25, -0.5));
    }

    #[test]
    fn test_point_missing_latitude() {
        let err = point_to_coords("POINT (-87.62)").unwrap_err();
        assert!(err.to_string().contains("POINT (-87.62)"));
    }

    #[test]
    fn test_point_empty() {
        assert!(point_to_coords("").is_err());
        assert!(point_to_coords("POINT EMPTY").is_err());
    }
}
