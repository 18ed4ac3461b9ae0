use axum::{
    Router,
    body::Body,
    http::{Request, header},
};
use house_price_service::{
    model::{ModelArtifact, Pipeline, Predictor},
    server::{self, AppState},
    service::InferenceService,
};
use rust_xlsxwriter::Workbook;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "house-price-test-boundary";

pub const CSV_HEADER: &str = "ID,loc,title,bedroom,bathroom,parking_space";

/// Artifact with hand-checkable predictions.
///
/// Encoded row: `[bedroom, bathroom, parking_space, loc=Ajah, loc=Lekki,
/// title=Duplex, title=Flat]`, scaled from `[1, 5]`, `[1, 5]`, `[0, 4]`.
/// `Lekki, Duplex, 4, 3, 2.0` predicts `6335.12345`.
pub fn sample_artifact_json() -> Value {
    json!({
        "format_version": 1,
        "model_version": "test-v1",
        "feature_names": ["loc", "title", "bedroom", "bathroom", "parking_space"],
        "numerical": [
            {"name": "bedroom", "data_min": 1.0, "data_max": 5.0},
            {"name": "bathroom", "data_min": 1.0, "data_max": 5.0},
            {"name": "parking_space", "data_min": 0.0, "data_max": 4.0}
        ],
        "categorical": [
            {"name": "loc", "categories": ["Ajah", "Lekki"]},
            {"name": "title", "categories": ["Duplex", "Flat"]}
        ],
        "estimator": {
            "kind": "linear",
            "coefficients": [1000.0, 500.0, 250.0, 100.0, 200.0, 10.0, 20.0],
            "intercept": 5000.12345
        }
    })
}

pub fn create_test_pipeline() -> Pipeline {
    let artifact: ModelArtifact = serde_json::from_value(sample_artifact_json()).unwrap();
    Pipeline::from_artifact(artifact).unwrap()
}

/// Write `artifact` to a temp dir and return its path
pub async fn write_artifact(dir: &TempDir, artifact: &Value) -> PathBuf {
    let path = dir.path().join("model.json");
    tokio::fs::write(&path, artifact.to_string()).await.unwrap();
    path
}

pub fn create_test_app_with(model: impl Predictor + 'static, legacy_bulk_errors: bool) -> Router {
    let state = AppState {
        service: Arc::new(InferenceService::new(Arc::new(model))),
        legacy_bulk_errors,
    };
    server::router(state, None)
}

/// Sample-artifact app that rejects bodies over `max_upload_bytes`
pub fn create_limited_test_app(max_upload_bytes: usize) -> Router {
    let state = AppState {
        service: Arc::new(InferenceService::new(Arc::new(create_test_pipeline()))),
        legacy_bulk_errors: false,
    };
    server::router(state, Some(max_upload_bytes))
}

/// App backed by the sample artifact
pub fn create_test_app() -> Router {
    create_test_app_with(create_test_pipeline(), false)
}

pub fn single_prediction_uri(
    id: i64,
    loc: &str,
    title: &str,
    bedroom: i64,
    bathroom: i64,
    parking_space: f64,
) -> String {
    format!(
        "{}?ID={}&loc={}&title={}&bedroom={}&bathroom={}&parking_space={}",
        server::SINGLE_PREDICTION_PATH,
        id,
        loc.replace(' ', "%20"),
        title.replace(' ', "%20"),
        bedroom,
        bathroom,
        parking_space
    )
}

/// Hand-built multipart body with a single file field
pub fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn bulk_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(server::BULK_PREDICTION_PATH)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content)))
        .unwrap()
}

/// CSV with the required header followed by `rows`
pub fn csv_bytes(rows: &[&str]) -> Vec<u8> {
    let mut csv = String::from(CSV_HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(row);
    }
    csv.push('\n');
    csv.into_bytes()
}

/// Spreadsheet row: ID, loc, title, bedroom, bathroom, parking_space
pub type SheetRow<'a> = (i64, &'a str, &'a str, i64, i64, f64);

pub fn xlsx_bytes(rows: &[SheetRow]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in CSV_HEADER.split(',').enumerate() {
        sheet.write_string(0, col as u16, header).unwrap();
    }
    for (i, (id, loc, title, bedroom, bathroom, parking_space)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number(row, 0, *id as f64).unwrap();
        sheet.write_string(row, 1, *loc).unwrap();
        sheet.write_string(row, 2, *title).unwrap();
        sheet.write_number(row, 3, *bedroom as f64).unwrap();
        sheet.write_number(row, 4, *bathroom as f64).unwrap();
        sheet.write_number(row, 5, *parking_space).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// True when `value` carries no more than three decimals
pub fn has_three_decimals(value: f64) -> bool {
    (value * 1000.0).round() / 1000.0 == value
}

pub const SAMPLE_CONFIG_YAML: &str = r#"
server:
  host: "127.0.0.1"
  port: 9000
  logs:
    level: "debug"
  max_upload_bytes: 1048576
  legacy_bulk_errors: true

model:
  path: "/srv/models/model_v2.json"
"#;

pub const MINIMAL_CONFIG_YAML: &str = r#"
model:
  path: "model/model_v1.json"
"#;

pub const INVALID_CONFIG_YAML: &str = r#"
server:
  port: "not-a-number"
"#;
