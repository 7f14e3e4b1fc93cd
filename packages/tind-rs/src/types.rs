use core::fmt;
use serde::{Deserialize, Serialize};

/// Upper bound on input, option and output slots per indicator.
pub const MAX_SLOTS: usize = 10;

/// Indicator classification.
///
/// Only affects how hosts plot results (overlays share the input's range).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum Category {
    Overlay = 1,
    Indicator = 2,
    Math = 3,
    Simple = 4,
    Comparative = 5,
}

impl Category {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Overlay => "overlay",
            Category::Indicator => "indicator",
            Category::Math => "math",
            Category::Simple => "simple",
            Category::Comparative => "comparative",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Category::Overlay,
            2 => Category::Indicator,
            3 => Category::Math,
            4 => Category::Simple,
            5 => Category::Comparative,
            _ => return None,
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn category_codes_round_trip_and_serialize_lowercase() {
        for c in [
            Category::Overlay,
            Category::Indicator,
            Category::Math,
            Category::Simple,
            Category::Comparative,
        ] {
            assert_eq!(Category::from_code(c as i32), Some(c));
            assert_eq!(serde_json::to_string(&c).unwrap(), format!("\"{c}\""));
        }
        assert_eq!(Category::from_code(0), None);
    }
}
