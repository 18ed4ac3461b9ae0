use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fitted regressor evaluated on the encoded feature row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Linear {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    Forest {
        trees: Vec<RegressionTree>,
        #[serde(default)]
        aggregation: Aggregation,
        #[serde(default)]
        base_score: f64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Bagged ensembles average their trees.
    #[default]
    Mean,
    /// Boosted ensembles add their trees.
    Sum,
}

/// Regression tree in flat array layout. Node 0 is the root; a node is a
/// leaf when its left child is `-1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

const LEAF: i64 = -1;

impl RegressionTree {
    pub fn num_nodes(&self) -> usize {
        self.value.len()
    }

    fn validate(&self, width: usize) -> Result<()> {
        let n = self.num_nodes();
        if n == 0 {
            return Err(Error::artifact("tree has no nodes"));
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(Error::artifact("tree arrays have different lengths"));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                continue;
            }
            // Children always come after their parent, so traversal terminates.
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(Error::artifact(format!(
                        "node {} has invalid child index {}",
                        node, child
                    )));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= width {
                return Err(Error::artifact(format!(
                    "node {} splits on feature {} but rows have {} columns",
                    node, feature, width
                )));
            }
        }
        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0usize;
        while self.children_left[idx] != LEAF {
            let value = row[self.feature[idx] as usize];
            idx = if value <= self.threshold[idx] {
                self.children_left[idx] as usize
            } else {
                self.children_right[idx] as usize
            };
        }
        self.value[idx]
    }
}

impl Estimator {
    pub fn validate(&self, width: usize) -> Result<()> {
        match self {
            Self::Linear {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != width {
                    return Err(Error::artifact(format!(
                        "linear estimator has {} coefficients but rows have {} columns",
                        coefficients.len(),
                        width
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(Error::artifact("linear estimator has non-finite weights"));
                }
                Ok(())
            }
            Self::Forest { trees, .. } => {
                if trees.is_empty() {
                    return Err(Error::artifact("forest has no trees"));
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(width).map_err(|e| match e {
                        Error::Artifact(msg) => Error::artifact(format!("tree {}: {}", i, msg)),
                        other => other,
                    })?;
                }
                Ok(())
            }
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            Self::Linear {
                coefficients,
                intercept,
            } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(row)
                        .map(|(w, x)| w * x)
                        .sum::<f64>()
            }
            Self::Forest {
                trees,
                aggregation,
                base_score,
            } => {
                let total: f64 = trees.iter().map(|t| t.predict_row(row)).sum();
                match aggregation {
                    Aggregation::Mean => base_score + total / trees.len() as f64,
                    Aggregation::Sum => base_score + total,
                }
            }
        }
    }
}
