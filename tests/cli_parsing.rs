//! Tests for CLI parsing and start-up from a catalog file.

use std::io::Write;

use clap::Parser;
use tempfile::{NamedTempFile, TempDir};

use affiliate_hub::config::LogFormat;
use affiliate_hub::error_handling::InitializationError;
use affiliate_hub::{Config, Marketplace, Opt};

fn catalog_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_flags_override_defaults() {
    let opt = Opt::try_parse_from([
        "affiliate_hub",
        "--bind",
        "0.0.0.0:9000",
        "--cache-ttl-secs",
        "60",
        "--default-affiliate-code",
        "keyempire",
        "--log-format",
        "json",
    ])
    .unwrap();
    let config = Config::from(opt);

    assert_eq!(config.bind.port(), 9000);
    assert_eq!(config.cache_ttl().as_secs(), 60);
    assert_eq!(config.default_affiliate_code, "keyempire");
    assert!(matches!(config.log_format, LogFormat::Json));
}

#[test]
fn test_invalid_flag_values_are_rejected() {
    assert!(Opt::try_parse_from(["affiliate_hub", "--bind", "not-an-address"]).is_err());
    assert!(Opt::try_parse_from(["affiliate_hub", "--log-level", "loud"]).is_err());
    assert!(Opt::try_parse_from(["affiliate_hub", "--cache-ttl-secs", "-5"]).is_err());
}

#[tokio::test]
async fn test_marketplace_from_catalog_flag() {
    let catalog = catalog_file(
        r#"{
            "default_profile": "cs2",
            "profiles": [
                {"name": "roblox", "products": ["Wave"]},
                {"name": "cs2", "products": ["Neverlose"], "cache_file": "cs2.json"}
            ]
        }"#,
    );
    let data_dir = TempDir::new().unwrap();
    let opt = Opt::try_parse_from([
        "affiliate_hub",
        "--catalog",
        catalog.path().to_str().unwrap(),
        "--data-dir",
        data_dir.path().to_str().unwrap(),
    ])
    .unwrap();

    let marketplace = Marketplace::init(&Config::from(opt)).await.unwrap();

    assert_eq!(marketplace.default_profile(), "cs2");
    assert_eq!(
        marketplace.aggregator("cs2").unwrap().cache_path(),
        data_dir.path().join("cs2.json")
    );
    assert_eq!(marketplace.aggregators().count(), 2);
}

#[tokio::test]
async fn test_invalid_catalog_aborts_startup() {
    let catalog = catalog_file(
        r#"{"profiles": [{"name": "a", "products": []}],
            "resellers": [{"name": "Bad", "domains": ["bad.example"],
                           "pattern": {"type": "path", "pattern": "/no-placeholder"}}]}"#,
    );
    let data_dir = TempDir::new().unwrap();
    let config = Config {
        catalog: Some(catalog.path().to_path_buf()),
        data_dir: data_dir.path().to_path_buf(),
        ..Config::default()
    };

    assert!(matches!(
        Marketplace::init(&config).await,
        Err(InitializationError::CatalogError(_))
    ));
}
