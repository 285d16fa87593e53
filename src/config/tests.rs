use super::*;
use serial_test::serial;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use tempfile::TempDir;

const ALL_VARS: &[&str] = &[
    "ONSEN_PORT",
    "ONSEN_BIND_ADDR",
    "ONSEN_DATA_DIR",
    "ONSEN_INDEX_DIR",
    "ONSEN_EMBEDDER_PATH",
    "ONSEN_RERANKER_PATH",
    "ONSEN_QDRANT_URL",
    "ONSEN_CACHE_CAPACITY",
    "ONSEN_CACHE_TTL_SECS",
    "ONSEN_SEMANTIC_WEIGHT",
    "ONSEN_INITIAL_K",
    "ONSEN_FINAL_K",
    "ONSEN_CONFIDENCE_THRESHOLD",
    "ONSEN_CE_WEIGHT",
    "ONSEN_LLM_WEIGHT",
    "ONSEN_EXTRACTION",
    "ONSEN_LLM_MODELS",
    "ONSEN_QUERY_TIMEOUT_SECS",
    "ONSEN_GENERAL_PARTITION",
    "ONSEN_PARTITION_KEYWORDS",
];

fn with_env_vars<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    clear_onsen_env();
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for (key, value) in vars {
        unsafe { env::set_var(key, value) };
    }

    let result = f();

    clear_onsen_env();
    result
}

fn clear_onsen_env() {
    // SAFETY: Test code only, we accept the thread-safety risk in tests.
    for key in ALL_VARS {
        unsafe { env::remove_var(key) };
    }
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.port, 8000);
    assert_eq!(
        config.bind_addr,
        IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1))
    );
    assert_eq!(config.data_dir, PathBuf::from("./data"));
    assert_eq!(config.index_dir, PathBuf::from("./.index"));
    assert!(config.embedder_path.is_none());
    assert!(config.reranker_path.is_none());
    assert!(config.qdrant_url.is_none());
    assert_eq!(config.cache_capacity, 128);
    assert_eq!(config.cache_ttl_secs, 300);
    assert_eq!(config.final_k, 3);
    assert_eq!(config.general_partition, "onsen");
    assert!(!config.extraction_enabled());
}

#[test]
fn test_socket_addr() {
    let config = Config::default();
    assert_eq!(config.socket_addr(), "127.0.0.1:8000");

    let config = Config {
        port: 3000,
        bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0)),
        ..Default::default()
    };
    assert_eq!(config.socket_addr(), "0.0.0.0:3000");
}

#[test]
#[serial]
fn test_from_env_with_defaults() {
    let config = with_env_vars(&[], || Config::from_env().expect("should parse with defaults"));

    assert_eq!(config.port, 8000);
    assert_eq!(config.vector_backend(), crate::vectordb::VectorBackend::Memory);
    assert_eq!(config.extraction, ExtractionMode::Auto);
}

#[test]
#[serial]
fn test_from_env_overrides() {
    let config = with_env_vars(
        &[
            ("ONSEN_PORT", "9100"),
            ("ONSEN_BIND_ADDR", "0.0.0.0"),
            ("ONSEN_DATA_DIR", "/srv/chunks"),
            ("ONSEN_QDRANT_URL", "http://qdrant:6334"),
            ("ONSEN_CACHE_CAPACITY", "16"),
            ("ONSEN_SEMANTIC_WEIGHT", "0.7"),
            ("ONSEN_CONFIDENCE_THRESHOLD", "-2.5"),
            ("ONSEN_LLM_MODELS", "gemini-2.0-flash, gpt-4o-mini ,"),
            ("ONSEN_GENERAL_PARTITION", "general"),
        ],
        || Config::from_env().expect("should parse"),
    );

    assert_eq!(config.port, 9100);
    assert_eq!(config.socket_addr(), "0.0.0.0:9100");
    assert_eq!(config.data_dir, PathBuf::from("/srv/chunks"));
    assert_eq!(config.cache_capacity, 16);
    assert_eq!(config.confidence_threshold, -2.5);
    assert_eq!(config.llm_models, vec!["gemini-2.0-flash", "gpt-4o-mini"]);
    assert!(config.extraction_enabled());
    assert!(matches!(
        config.vector_backend(),
        crate::vectordb::VectorBackend::Qdrant { ref url, .. } if url == "http://qdrant:6334"
    ));

    let pipeline = config.pipeline_config();
    assert!((pipeline.fusion.semantic - 0.7).abs() < 1e-9);
    assert!((pipeline.fusion.lexical - 0.3).abs() < 1e-9);
    assert_eq!(pipeline.result_cache.capacity, 16);
    assert_eq!(pipeline.general_partition, "general");
    assert!(pipeline.extractor.enabled);
}

#[test]
#[serial]
fn test_blank_optional_paths_are_ignored() {
    let config = with_env_vars(
        &[("ONSEN_EMBEDDER_PATH", "  "), ("ONSEN_RERANKER_PATH", "")],
        || Config::from_env().expect("should parse"),
    );
    assert!(config.embedder_path.is_none());
    assert!(config.reranker_path.is_none());
}

#[test]
#[serial]
fn test_invalid_port() {
    let err = with_env_vars(&[("ONSEN_PORT", "0")], Config::from_env).expect_err("port 0");
    assert!(matches!(err, ConfigError::InvalidPort { .. }));

    let err = with_env_vars(&[("ONSEN_PORT", "http")], Config::from_env).expect_err("not a number");
    assert!(matches!(err, ConfigError::PortParseError { .. }));
}

#[test]
#[serial]
fn test_invalid_numeric_value() {
    let err = with_env_vars(&[("ONSEN_FINAL_K", "three")], Config::from_env).expect_err("bad k");
    assert!(matches!(
        err,
        ConfigError::InvalidValue {
            name: "ONSEN_FINAL_K",
            ..
        }
    ));
}

#[test]
#[serial]
fn test_extraction_mode_parsing() {
    let config = with_env_vars(
        &[("ONSEN_EXTRACTION", "off"), ("ONSEN_LLM_MODELS", "m")],
        || Config::from_env().expect("parse"),
    );
    assert!(!config.extraction_enabled());

    let err = with_env_vars(&[("ONSEN_EXTRACTION", "sometimes")], Config::from_env)
        .expect_err("bad mode");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
#[serial]
fn test_partition_keywords_from_env() {
    let config = with_env_vars(
        &[("ONSEN_PARTITION_KEYWORDS", "dogo=道後|dogo;ginzan=銀山")],
        || Config::from_env().expect("parse"),
    );
    assert_eq!(
        config.partition_keywords.partitions().collect::<Vec<_>>(),
        vec!["dogo", "ginzan"]
    );

    let err = with_env_vars(&[("ONSEN_PARTITION_KEYWORDS", "broken")], Config::from_env)
        .expect_err("bad table");
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn test_validate_paths() {
    let dir = TempDir::new().expect("tempdir");
    let file = dir.path().join("file.txt");
    std::fs::write(&file, "x").expect("write");

    assert!(Config::default().validate().is_ok());

    let config = Config {
        data_dir: file.clone(),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));

    let config = Config {
        embedder_path: Some(dir.path().join("missing")),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::PathNotFound { .. })
    ));

    let config = Config {
        reranker_path: Some(file),
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotADirectory { .. })
    ));
}

#[test]
fn test_validate_settings() {
    let config = Config {
        extraction: ExtractionMode::On,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSetting { .. })
    ));

    let config = Config {
        final_k: 0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidSetting { .. })
    ));

    let config = Config {
        semantic_weight: 1.5,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_model_configs_follow_paths() {
    let config = Config::default();
    assert!(config.embedder_config().model_path.is_none());
    assert!(config.reranker_config().model_path.is_none());

    let config = Config {
        reranker_path: Some(PathBuf::from("/models/reranker")),
        ..Default::default()
    };
    assert_eq!(
        config.reranker_config().model_path,
        Some(PathBuf::from("/models/reranker"))
    );
}
