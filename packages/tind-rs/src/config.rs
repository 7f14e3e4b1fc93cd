use crate::error::{Result, TindError};
use serde::{Deserialize, Serialize};

/// How host adapters shape batch results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdapterConfig {
    /// Left-pad outputs back to the input length.
    pub pad_left: bool,
    /// Sentinel written into the padded warm-up rows.
    #[serde(with = "pad_value")]
    pub pad_value: f64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            pad_left: true,
            pad_value: f64::NAN,
        }
    }
}

impl AdapterConfig {
    pub fn unpadded() -> Self {
        Self {
            pad_left: false,
            ..Self::default()
        }
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| TindError::invalid_option(format!("adapter config: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TindError::invalid_option(format!("adapter config: {e}")))
    }
}

// JSON has no NaN; `null` stands for it.
mod pad_value {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        if v.is_nan() {
            s.serialize_none()
        } else {
            s.serialize_some(v)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::AdapterConfig;

    #[test]
    fn defaults_pad_with_nan() {
        let c = AdapterConfig::default();
        assert!(c.pad_left);
        assert!(c.pad_value.is_nan());
        assert!(!AdapterConfig::unpadded().pad_left);
    }

    #[test]
    fn loads_partial_json() {
        let c = AdapterConfig::from_json(r#"{"pad_value": 0.0}"#).unwrap();
        assert!(c.pad_left);
        assert_eq!(c.pad_value, 0.0);

        let c = AdapterConfig::from_json(r#"{"pad_left": false, "pad_value": null}"#).unwrap();
        assert!(!c.pad_left);
        assert!(c.pad_value.is_nan());

        assert!(AdapterConfig::from_json(r#"{"padding": 1}"#).is_err());
    }

    #[test]
    fn nan_survives_a_json_round_trip() {
        let json = AdapterConfig::default().to_json().unwrap();
        assert_eq!(json, r#"{"pad_left":true,"pad_value":null}"#);
        assert!(AdapterConfig::from_json(&json).unwrap().pad_value.is_nan());
    }
}
