use house_price_service::{Error, config, model::Pipeline, server};
use pretty_assertions::assert_eq;
use serde_json::json;

mod common;
use common::{
    INVALID_CONFIG_YAML, MINIMAL_CONFIG_YAML, SAMPLE_CONFIG_YAML, sample_artifact_json,
    write_artifact,
};

async fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    tokio::fs::write(&path, content).await.unwrap();
    path
}

#[tokio::test]
async fn test_load_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, SAMPLE_CONFIG_YAML).await;

    let config = config::load_from(&path).await.unwrap();

    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.logs.level, "debug");
    assert_eq!(config.server.max_upload_bytes, Some(1_048_576));
    assert!(config.server.legacy_bulk_errors);
    assert_eq!(config.model.path, "/srv/models/model_v2.json");
}

#[tokio::test]
async fn test_load_applies_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, MINIMAL_CONFIG_YAML).await;

    let config = config::load_from(&path).await.unwrap();

    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8000);
    assert_eq!(config.server.logs.level, "info");
    assert_eq!(config.server.max_upload_bytes, None);
    assert!(!config.server.legacy_bulk_errors);
    assert_eq!(config.model.path, "model/model_v1.json");
}

#[tokio::test]
async fn test_load_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, INVALID_CONFIG_YAML).await;

    let err = config::load_from(&path).await.unwrap_err();
    assert!(matches!(err, Error::Yaml(_)));
}

#[tokio::test]
async fn test_load_missing_config() {
    let dir = tempfile::tempdir().unwrap();

    let err = config::load_from(dir.path().join("absent.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn test_bundled_config_and_artifact_load() {
    let config = config::load_from(concat!(env!("CARGO_MANIFEST_DIR"), "/config.yaml"))
        .await
        .unwrap();
    let artifact_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(&config.model.path);

    let pipeline = Pipeline::load(&artifact_path).await.unwrap();

    assert_eq!(pipeline.model_version(), "v1");
    assert_eq!(
        pipeline.feature_names(),
        ["loc", "title", "bedroom", "bathroom", "parking_space"]
    );
}

#[tokio::test]
async fn test_incompatible_artifact_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut artifact = sample_artifact_json();
    artifact["estimator"] = json!({"kind": "neural_net", "layers": []});
    let path = write_artifact(&dir, &artifact).await;

    let err = Pipeline::load(&path).await.unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[tokio::test]
async fn test_sample_artifact_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_artifact(&dir, &sample_artifact_json()).await;

    let pipeline = Pipeline::load(&path).await.unwrap();
    assert_eq!(pipeline.model_version(), "test-v1");
}

#[tokio::test]
async fn test_model_path_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, SAMPLE_CONFIG_YAML).await;
    let config = config::load_from(&path).await.unwrap();

    let kept = config::apply_model_path_override(config.clone(), None);
    assert_eq!(kept.model.path, "/srv/models/model_v2.json");

    let overridden =
        config::apply_model_path_override(config, Some("/tmp/model_v3.json".to_string()));
    assert_eq!(overridden.model.path, "/tmp/model_v3.json");
    assert_eq!(overridden.server.port, 9000);
}

async fn config_for_artifact(
    dir: &tempfile::TempDir,
    artifact: &serde_json::Value,
) -> config::Config {
    let artifact_path = write_artifact(dir, artifact).await;
    let config_path = write_config(dir, MINIMAL_CONFIG_YAML).await;
    let config = config::load_from(&config_path).await.unwrap();
    config::apply_model_path_override(config, Some(artifact_path.display().to_string()))
}

#[tokio::test]
async fn test_build_app_with_sample_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for_artifact(&dir, &sample_artifact_json()).await;

    assert!(server::build_app(&config).await.is_ok());
}

#[tokio::test]
async fn test_build_app_rejects_reordered_features() {
    let dir = tempfile::tempdir().unwrap();
    let mut artifact = sample_artifact_json();
    artifact["feature_names"] = json!(["title", "loc", "bedroom", "bathroom", "parking_space"]);
    let config = config_for_artifact(&dir, &artifact).await;

    let err = server::build_app(&config).await.err().unwrap();
    assert!(matches!(err, Error::Artifact(_)));
    assert!(err.to_string().contains("do not match the request features"));
}

#[tokio::test]
async fn test_build_app_rejects_missing_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(&dir, MINIMAL_CONFIG_YAML).await;
    let config = config::load_from(&config_path).await.unwrap();
    let config = config::apply_model_path_override(
        config,
        Some(dir.path().join("absent.json").display().to_string()),
    );

    let err = server::build_app(&config).await.err().unwrap();
    assert!(matches!(err, Error::Artifact(_)));
}
