mod types;

pub use types::*;

use crate::ingest::{self, FileKind};
use crate::model::Predictor;
use crate::table::{Column, ColumnData, Table};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::debug;

pub const ID_COLUMN: &str = "ID";

/// Model inputs, in the order the pipeline was fitted on.
pub const FEATURE_COLUMNS: [&str; 5] = ["loc", "title", "bedroom", "bathroom", "parking_space"];

pub const REQUIRED_COLUMNS: [&str; 6] = [
    ID_COLUMN,
    "loc",
    "title",
    "bedroom",
    "bathroom",
    "parking_space",
];

/// Float IDs at or above this magnitude may already have been rounded.
const MAX_EXACT_ID: f64 = 9_007_199_254_740_992.0;

pub fn round_price(price: f64) -> f64 {
    (price * 1000.0).round() / 1000.0
}

/// Rounds a model output, rejecting values JSON cannot carry.
fn house_price(price: f64, row: usize) -> Result<f64> {
    if !price.is_finite() {
        return Err(Error::prediction(format!(
            "Model output at row {} is not a finite number: {}",
            row, price
        )));
    }
    Ok(round_price(price))
}

/// Fails unless the model was fitted on [`FEATURE_COLUMNS`] in that order.
pub fn check_model_features(feature_names: &[String]) -> Result<()> {
    if feature_names.iter().map(String::as_str).ne(FEATURE_COLUMNS) {
        return Err(Error::artifact(format!(
            "model features {:?} do not match the request features {:?}",
            feature_names, FEATURE_COLUMNS
        )));
    }
    Ok(())
}

/// Request-to-prediction glue around a shared, read-only model.
pub struct InferenceService {
    model: Arc<dyn Predictor>,
}

impl InferenceService {
    pub fn new(model: Arc<dyn Predictor>) -> Self {
        Self { model }
    }

    pub fn single_prediction(&self, request: &SinglePredictionRequest) -> Result<PredictionResult> {
        let features = Table::new(vec![
            Column::text("loc", vec![request.loc.clone()]),
            Column::text("title", vec![request.title.clone()]),
            Column::integer("bedroom", vec![request.bedroom]),
            Column::integer("bathroom", vec![request.bathroom]),
            Column::numeric("parking_space", vec![request.parking_space]),
        ])?;

        let prices = self.model.predict(&features)?;
        let price = prices
            .first()
            .copied()
            .ok_or_else(|| Error::internal("model returned no prediction"))?;

        Ok(PredictionResult {
            id: request.id,
            house_price: house_price(price, 0)?,
        })
    }

    /// Parses an uploaded file by extension and predicts every row.
    pub fn bulk_prediction(
        &self,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<BulkPredictionResponse> {
        let kind = FileKind::from_filename(filename)?;
        let table = ingest::read_table(kind, bytes)?;
        self.predict_table(&table)
    }

    /// Predicts every row of an already parsed table. Extra columns are
    /// ignored; the result keeps the input row order.
    pub fn predict_table(&self, table: &Table) -> Result<BulkPredictionResponse> {
        if let Some(missing) = REQUIRED_COLUMNS.iter().find(|c| table.column(c).is_none()) {
            return Err(Error::missing_column(*missing));
        }

        if table.n_rows() == 0 {
            debug!("Bulk upload has no rows");
            return Ok(BulkPredictionResponse {
                predictions: Vec::new(),
            });
        }

        let ids = extract_ids(table)?;
        let features = table.select(&FEATURE_COLUMNS)?;
        let prices = self.model.predict(&features)?;

        if prices.len() != ids.len() {
            return Err(Error::internal(format!(
                "model returned {} predictions for {} rows",
                prices.len(),
                ids.len()
            )));
        }

        let predictions = ids
            .into_iter()
            .zip(prices)
            .enumerate()
            .map(|(row, (id, price))| {
                Ok(PredictionResult {
                    id,
                    house_price: house_price(price, row)?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(BulkPredictionResponse { predictions })
    }
}

fn extract_ids(table: &Table) -> Result<Vec<i64>> {
    let column = table
        .column(ID_COLUMN)
        .ok_or_else(|| Error::missing_column(ID_COLUMN))?;

    let values = match &column.data {
        ColumnData::Integer(values) => return Ok(values.clone()),
        ColumnData::Numeric(values) => values,
        ColumnData::Text(_) => return Err(Error::parse("ID column must contain integers")),
    };

    values
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_ID {
                Ok(value as i64)
            } else {
                Err(Error::parse(format!(
                    "ID at row {} is not an integer: {}",
                    row, value
                )))
            }
        })
        .collect()
}
