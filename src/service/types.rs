use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinglePredictionRequest {
    #[serde(rename = "ID")]
    pub id: i64,
    pub loc: String,
    pub title: String,
    pub bedroom: i64,
    pub bathroom: i64,
    pub parking_space: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "ID")]
    pub id: i64,
    pub house_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkPredictionResponse {
    pub predictions: Vec<PredictionResult>,
}
