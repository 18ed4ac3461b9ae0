use super::{EncodedFeature, FeatureKind, ModelArtifact, Predictor, ScaledFeature};
use crate::table::{Column, ColumnData, Table};
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// A fitted pipeline: min-max scaling for numerical features, one-hot
/// encoding for categorical features, then the estimator.
#[derive(Debug, Clone)]
pub struct Pipeline {
    artifact: ModelArtifact,
    vocabularies: Vec<HashMap<String, usize>>,
}

impl Pipeline {
    /// Validates `artifact` and indexes its category vocabularies.
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self> {
        artifact.validate()?;

        let vocabularies = artifact
            .categorical
            .iter()
            .map(|feature| {
                feature
                    .categories
                    .iter()
                    .enumerate()
                    .map(|(i, category)| (category.clone(), i))
                    .collect()
            })
            .collect();

        Ok(Self {
            artifact,
            vocabularies,
        })
    }

    /// Loads and validates the artifact at `path`. A missing or invalid
    /// artifact is an error.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading model artifact from: {}", path.display());

        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::artifact(format!("failed to read {}: {}", path.display(), e))
        })?;
        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        let pipeline = Self::from_artifact(artifact)?;

        info!(
            "Loaded model '{}' with features {:?}",
            pipeline.model_version(),
            pipeline.feature_names()
        );
        Ok(pipeline)
    }

    pub fn model_version(&self) -> &str {
        &self.artifact.model_version
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    fn check_feature_names(&self, features: &Table) -> Result<()> {
        let names = features.column_names();
        if names != self.artifact.feature_names {
            return Err(Error::schema(format!(
                "feature names must match those seen at fit time: expected {:?}, got {:?}",
                self.artifact.feature_names, names
            )));
        }
        Ok(())
    }

    /// Routes the columns named by a branch and keeps only those of `kind`.
    /// Any column dropped by the kind filter is a schema error.
    fn route<'a>(
        &self,
        features: &'a Table,
        names: &[&str],
        kind: FeatureKind,
    ) -> Result<Vec<&'a Column>> {
        let branch = features.select(names)?;
        let selected = kind.select(&branch).len();
        if selected != names.len() {
            let offending = branch
                .columns()
                .iter()
                .find(|c| !kind.matches(c))
                .map(|c| (c.name.clone(), c.data.dtype()))
                .unwrap_or_default();
            return Err(Error::schema(format!(
                "feature '{}' must be {:?} but the column is {}",
                offending.0, kind, offending.1
            )));
        }

        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            if let Some(column) = features.column(name) {
                columns.push(column);
            }
        }
        Ok(columns)
    }

    fn scale(
        &self,
        feature: &ScaledFeature,
        values: &[f64],
        out: &mut [f64],
        width: usize,
        offset: usize,
    ) -> Result<()> {
        let [range_min, range_max] = self.artifact.feature_range;
        let data_range = match feature.data_max - feature.data_min {
            r if r == 0.0 => 1.0,
            r => r,
        };

        for (row, &x) in values.iter().enumerate() {
            if !x.is_finite() {
                return Err(Error::prediction(format!(
                    "Input contains NaN or infinity in feature '{}' at row {}",
                    feature.name, row
                )));
            }
            let mut scaled =
                (x - feature.data_min) / data_range * (range_max - range_min) + range_min;
            if self.artifact.clip {
                scaled = scaled.clamp(range_min, range_max);
            }
            out[row * width + offset] = scaled;
        }
        Ok(())
    }

    fn encode(
        &self,
        feature: &EncodedFeature,
        vocabulary: &HashMap<String, usize>,
        values: &[String],
        out: &mut [f64],
        width: usize,
        offset: usize,
    ) -> Result<()> {
        let mut unknown: Vec<&str> = Vec::new();
        for (row, value) in values.iter().enumerate() {
            match vocabulary.get(value) {
                Some(&index) => out[row * width + offset + index] = 1.0,
                None => {
                    if !unknown.contains(&value.as_str()) {
                        unknown.push(value);
                    }
                }
            }
        }

        if !unknown.is_empty() {
            if self.artifact.handle_unknown == super::HandleUnknown::Error {
                return Err(Error::prediction(format!(
                    "Found unknown categories {:?} in column '{}' during transform",
                    unknown, feature.name
                )));
            }
            debug!(
                "Ignoring unknown categories {:?} in column '{}'",
                unknown, feature.name
            );
        }
        Ok(())
    }

    /// Builds the row-major design matrix fed to the estimator.
    fn transform(&self, features: &Table) -> Result<Vec<f64>> {
        self.check_feature_names(features)?;

        let numerical_names: Vec<&str> = self
            .artifact
            .numerical
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let categorical_names: Vec<&str> = self
            .artifact
            .categorical
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let numerical = self.route(features, &numerical_names, FeatureKind::Numerical)?;
        let categorical = self.route(features, &categorical_names, FeatureKind::Categorical)?;

        let width = self.artifact.encoded_width();
        let mut matrix = vec![0.0; features.n_rows() * width];

        let mut offset = 0;
        for (feature, column) in self.artifact.numerical.iter().zip(numerical) {
            if let Some(values) = column.data.numeric_values() {
                self.scale(feature, &values, &mut matrix, width, offset)?;
            }
            offset += 1;
        }
        for ((feature, vocabulary), column) in self
            .artifact
            .categorical
            .iter()
            .zip(&self.vocabularies)
            .zip(categorical)
        {
            if let ColumnData::Text(values) = &column.data {
                self.encode(feature, vocabulary, values, &mut matrix, width, offset)?;
            }
            offset += feature.categories.len();
        }

        Ok(matrix)
    }
}

impl Predictor for Pipeline {
    fn predict(&self, features: &Table) -> Result<Vec<f64>> {
        let matrix = self.transform(features)?;
        let width = self.artifact.encoded_width();

        let predictions: Vec<f64> = matrix
            .chunks_exact(width)
            .map(|row| self.artifact.estimator.predict_row(row))
            .collect();

        debug!("Predicted {} rows", predictions.len());
        Ok(predictions)
    }
}
