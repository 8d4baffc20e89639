use std::collections::HashMap;
use std::sync::Arc;

use crate::error::MediaError;
use crate::spectrum::Spectrum;

/// A single typed value in a scene-description parameter dictionary.
#[derive(Clone)]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(String),
    FloatArray(Vec<f64>),
    Spectrum(Arc<dyn Spectrum>),
}

/// "A factory per concrete medium accepting a parameter dictionary
/// (string → typed values)" — spec.md §6. Scene loaders build one of these
/// per medium/provider and hand it to that type's `from_params`.
#[derive(Clone, Default)]
pub struct ParamSet {
    values: HashMap<String, ParamValue>,
}

impl ParamSet {
    pub fn new() -> Self {
        ParamSet::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.values.get(key) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.values.get(key) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Float(v)) => *v as i64,
            _ => default,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParamValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn get_float_array(&self, key: &str) -> Option<&[f64]> {
        match self.values.get(key) {
            Some(ParamValue::FloatArray(v)) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn get_spectrum(&self, key: &str) -> Option<Arc<dyn Spectrum>> {
        match self.values.get(key) {
            Some(ParamValue::Spectrum(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn require_float_array(&self, key: &str) -> Result<&[f64], MediaError> {
        self.get_float_array(key)
            .ok_or_else(|| MediaError::MissingParameter(key.to_string()))
    }

    pub fn require_string(&self, key: &str) -> Result<&str, MediaError> {
        self.get_string(key)
            .ok_or_else(|| MediaError::MissingParameter(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_when_absent() {
        let params = ParamSet::new();
        assert_eq!(params.get_float("scale", 1.0), 1.0);
        assert_eq!(params.get_bool("flag", true), true);
    }

    #[test]
    fn round_trips_set_values() {
        let params = ParamSet::new()
            .set("scale", ParamValue::Float(2.5))
            .set("name", ParamValue::Str("fog".into()));
        assert_eq!(params.get_float("scale", 0.0), 2.5);
        assert_eq!(params.get_string("name"), Some("fog"));
    }

    #[test]
    fn missing_required_is_an_error() {
        let params = ParamSet::new();
        assert!(params.require_string("path").is_err());
    }
}
