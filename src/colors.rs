//! Named HSV ranges used by the segmenter.
//!
//! Hue follows the OpenCV 8-bit convention (0..=179), saturation and value
//! span 0..=255. A range whose lower hue is greater than its upper hue wraps
//! around the top of the hue circle, which is how red is usually expressed.

use std::path::Path;

use opencv::core::Scalar;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const MAX_HUE: u8 = 179;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv(pub u8, pub u8, pub u8);

impl Hsv {
    pub fn to_scalar(self) -> Scalar {
        Scalar::new(self.0 as f64, self.1 as f64, self.2 as f64, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub name: String,
    pub lower: Hsv,
    pub upper: Hsv,
}

impl ColorRange {
    pub fn new(name: impl Into<String>, lower: Hsv, upper: Hsv) -> Self {
        Self {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// True when the hue interval crosses 179 -> 0.
    pub fn wraps_hue(&self) -> bool {
        self.lower.0 > self.upper.0
    }

    /// The inclusive bound pairs the mask is built from.
    ///
    /// A wrapping range is split into `[lower.h, 179]` and `[0, upper.h]`.
    pub fn bounds(&self) -> Vec<(Scalar, Scalar)> {
        if self.wraps_hue() {
            vec![
                (
                    self.lower.to_scalar(),
                    Hsv(MAX_HUE, self.upper.1, self.upper.2).to_scalar(),
                ),
                (
                    Hsv(0, self.lower.1, self.lower.2).to_scalar(),
                    self.upper.to_scalar(),
                ),
            ]
        } else {
            vec![(self.lower.to_scalar(), self.upper.to_scalar())]
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidColorRange {
            name: self.name.clone(),
            reason: reason.to_owned(),
        };
        if self.lower.0 > MAX_HUE || self.upper.0 > MAX_HUE {
            return Err(invalid("hue must be within 0..=179"));
        }
        if self.lower.1 > self.upper.1 {
            return Err(invalid("saturation lower bound exceeds upper bound"));
        }
        if self.lower.2 > self.upper.2 {
            return Err(invalid("value lower bound exceeds upper bound"));
        }
        Ok(())
    }
}

pub fn default_color_ranges() -> Vec<ColorRange> {
    vec![
        ColorRange::new("Blue", Hsv(100, 80, 50), Hsv(140, 255, 255)),
        ColorRange::new("Red", Hsv(0, 150, 100), Hsv(10, 255, 255)),
        ColorRange::new("Green", Hsv(40, 80, 50), Hsv(80, 255, 255)),
    ]
}

/// Load ranges from a JSON array, keeping file order.
pub fn load_color_ranges(path: impl AsRef<Path>) -> Result<Vec<ColorRange>> {
    let contents = std::fs::read_to_string(path)?;
    let ranges: Vec<ColorRange> = serde_json::from_str(&contents)?;
    for range in &ranges {
        range.validate()?;
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_ranges_are_valid_and_ordered() {
        let ranges = default_color_ranges();
        let names: Vec<_> = ranges.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Blue", "Red", "Green"]);
        for range in &ranges {
            range.validate().unwrap();
        }
    }

    #[test]
    fn wrapping_hue_splits_into_two_bounds() {
        let red = ColorRange::new("Red", Hsv(170, 120, 70), Hsv(10, 255, 255));
        assert!(red.wraps_hue());

        let bounds = red.bounds();
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[0].0, Scalar::new(170.0, 120.0, 70.0, 0.0));
        assert_eq!(bounds[0].1, Scalar::new(179.0, 255.0, 255.0, 0.0));
        assert_eq!(bounds[1].0, Scalar::new(0.0, 120.0, 70.0, 0.0));
        assert_eq!(bounds[1].1, Scalar::new(10.0, 255.0, 255.0, 0.0));
    }

    #[test]
    fn rejects_inverted_saturation() {
        let range = ColorRange::new("Odd", Hsv(10, 200, 0), Hsv(20, 100, 255));
        assert!(matches!(
            range.validate(),
            Err(Error::InvalidColorRange { .. })
        ));
    }

    #[test]
    fn rejects_hue_out_of_range() {
        let range = ColorRange::new("Odd", Hsv(10, 0, 0), Hsv(200, 255, 255));
        assert!(range.validate().is_err());
    }

    #[test]
    fn loads_ranges_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "Yellow", "lower": [20, 100, 100], "upper": [30, 255, 255]}},
                {{"name": "Blue", "lower": [100, 80, 50], "upper": [140, 255, 255]}}
            ]"#
        )
        .unwrap();

        let ranges = load_color_ranges(file.path()).unwrap();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].name, "Yellow");
        assert_eq!(ranges[0].lower, Hsv(20, 100, 100));
        assert_eq!(ranges[1].name, "Blue");
    }

    #[test]
    fn empty_config_is_not_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(load_color_ranges(file.path()).unwrap().is_empty());
    }

    #[test]
    fn invalid_range_in_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "Bad", "lower": [0, 255, 0], "upper": [10, 0, 255]}}]"#
        )
        .unwrap();
        assert!(matches!(
            load_color_ranges(file.path()),
            Err(Error::InvalidColorRange { .. })
        ));
    }
}
