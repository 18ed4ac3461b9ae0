use super::estimator::Estimator;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

/// Serialized parameters of a fitted preprocessing + estimator chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub model_version: String,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub numerical: Vec<ScaledFeature>,
    #[serde(default = "default_feature_range")]
    pub feature_range: [f64; 2],
    #[serde(default)]
    pub clip: bool,
    #[serde(default)]
    pub categorical: Vec<EncodedFeature>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
    pub estimator: Estimator,
}

/// Min-max scaler statistics for one numerical feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledFeature {
    pub name: String,
    pub data_min: f64,
    pub data_max: f64,
}

/// One-hot encoder vocabulary for one categorical feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFeature {
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    #[default]
    Ignore,
    Error,
}

fn default_feature_range() -> [f64; 2] {
    [0.0, 1.0]
}

impl ModelArtifact {
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ModelArtifact = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Width of the encoded row handed to the estimator.
    pub fn encoded_width(&self) -> usize {
        self.numerical.len()
            + self
                .categorical
                .iter()
                .map(|f| f.categories.len())
                .sum::<usize>()
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(Error::artifact(format!(
                "unsupported format version {} (expected {})",
                self.format_version, SUPPORTED_FORMAT_VERSION
            )));
        }

        if self.feature_names.is_empty() {
            return Err(Error::artifact("no feature names"));
        }

        let mut seen = HashSet::new();
        for name in &self.feature_names {
            if !seen.insert(name.as_str()) {
                return Err(Error::artifact(format!("duplicate feature '{}'", name)));
            }
        }

        let mut routed = HashSet::new();
        let routed_names = self
            .numerical
            .iter()
            .map(|f| &f.name)
            .chain(self.categorical.iter().map(|f| &f.name));
        for name in routed_names {
            if !seen.contains(name.as_str()) {
                return Err(Error::artifact(format!(
                    "feature '{}' is not among feature_names",
                    name
                )));
            }
            if !routed.insert(name.as_str()) {
                return Err(Error::artifact(format!(
                    "feature '{}' is routed more than once",
                    name
                )));
            }
        }
        if let Some(unrouted) = self
            .feature_names
            .iter()
            .find(|name| !routed.contains(name.as_str()))
        {
            return Err(Error::artifact(format!(
                "feature '{}' is neither numerical nor categorical",
                unrouted
            )));
        }

        for feature in &self.numerical {
            if !feature.data_min.is_finite() || !feature.data_max.is_finite() {
                return Err(Error::artifact(format!(
                    "scaler range for '{}' is not finite",
                    feature.name
                )));
            }
            if feature.data_min > feature.data_max {
                return Err(Error::artifact(format!(
                    "scaler range for '{}' has data_min > data_max",
                    feature.name
                )));
            }
        }

        let [range_min, range_max] = self.feature_range;
        if range_min.is_nan() || range_max.is_nan() || range_min >= range_max {
            return Err(Error::artifact(format!(
                "minimum of feature_range must be smaller than maximum, got [{}, {}]",
                range_min, range_max
            )));
        }

        for feature in &self.categorical {
            let mut categories = HashSet::new();
            if let Some(dup) = feature
                .categories
                .iter()
                .find(|c| !categories.insert(c.as_str()))
            {
                return Err(Error::artifact(format!(
                    "duplicate category '{}' for '{}'",
                    dup, feature.name
                )));
            }
        }

        let width = self.encoded_width();
        if width == 0 {
            return Err(Error::artifact("encoded rows have no columns"));
        }
        self.estimator.validate(width)
    }
}
