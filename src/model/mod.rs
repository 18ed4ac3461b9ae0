mod artifact;
mod estimator;
mod pipeline;

pub use artifact::*;
pub use estimator::*;
pub use pipeline::Pipeline;

use crate::Result;
use crate::table::{Column, ColumnData, Table};

/// Anything that turns a feature table into one prediction per row.
pub trait Predictor: Send + Sync {
    fn predict(&self, features: &Table) -> Result<Vec<f64>>;
}

/// Which preprocessing branch a column is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Numerical,
    Categorical,
}

impl FeatureKind {
    pub fn of(data: &ColumnData) -> Self {
        match data {
            ColumnData::Integer(_) | ColumnData::Numeric(_) => Self::Numerical,
            ColumnData::Text(_) => Self::Categorical,
        }
    }

    pub fn matches(self, column: &Column) -> bool {
        Self::of(&column.data) == self
    }

    /// Columns of `table` with this kind, in table order.
    pub fn select(self, table: &Table) -> Vec<&Column> {
        table.columns().iter().filter(|c| self.matches(c)).collect()
    }
}
