use std::path::{Path, PathBuf};

use signer_config::shared::{DriverConfig, SignerConfig};
use signer_config::{Environment, LoadConfigError, load_config_from};

fn fixtures(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn environment_file_overrides_base() {
    let config: DriverConfig = load_config_from(&fixtures("valid"), Environment::Dev).unwrap();

    assert_eq!(config.pipeline.id, 1);
    assert_eq!(config.pipeline.inputs, vec![0, 1]);
    assert_eq!(
        config.signer,
        SignerConfig {
            cheap_latency_ms: 5,
            expensive_latency_ms: 10,
        }
    );
}

#[test]
fn environment_file_may_use_json() {
    let config: DriverConfig = load_config_from(&fixtures("valid"), Environment::Prod).unwrap();

    assert_eq!(config.pipeline.id, 42);
    assert_eq!(config.pipeline.inputs, vec![3, 5, 8]);
    assert_eq!(config.signer.cheap_latency_ms, 1000);
}

#[test]
fn missing_directory_is_reported() {
    let err = load_config_from::<DriverConfig>(&fixtures("absent"), Environment::Dev).unwrap_err();

    assert!(matches!(err, LoadConfigError::MissingDirectory(_)));
}

#[test]
fn missing_environment_file_lists_attempted_paths() {
    let err =
        load_config_from::<DriverConfig>(&fixtures("malformed"), Environment::Prod).unwrap_err();

    match err {
        LoadConfigError::MissingLayer { layer, candidates, .. } => {
            assert_eq!(layer, "prod");
            assert_eq!(candidates.len(), 3);
            assert!(candidates[0].ends_with("prod.yaml"));
            assert!(candidates[2].ends_with("prod.json"));
        }
        other => panic!("Expected MissingLayer, got: {other:?}"),
    }
}

#[test]
fn malformed_file_is_attributed_to_its_path() {
    let err =
        load_config_from::<DriverConfig>(&fixtures("malformed"), Environment::Dev).unwrap_err();

    match err {
        LoadConfigError::InvalidLayer { layer, path, .. } => {
            assert_eq!(layer, "dev");
            assert!(path.ends_with("dev.yaml"));
        }
        other => panic!("Expected InvalidLayer, got: {other:?}"),
    }
}
