//! Tests for error types

use std::path::PathBuf;

use kg_sweep::experiment::RunName;
use kg_sweep::metrics::MetricsDocument;
use kg_sweep::Error;

#[test]
fn test_invalid_run_name_error() {
    let error = RunName::parse("not-a-run").unwrap_err();
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid run name"));
    assert!(error_str.contains("not-a-run"));
}

#[test]
fn test_metrics_parse_error_names_line() {
    let error = MetricsDocument::parse_str("a: 1\n\nb 2\n").unwrap_err();
    assert!(matches!(error, Error::MetricsParse { line: 3, .. }));
    assert!(format!("{error}").contains("line 3"));
}

#[test]
fn test_missing_average_metrics_error() {
    let error = MetricsDocument::parse_str("forward metrics: {'mrr': 0.1}")
        .unwrap()
        .average_metrics()
        .unwrap_err();
    assert!(format!("{error}").contains("average metrics"));
}

#[test]
fn test_unknown_version_error() {
    let error = Error::UnknownVersion {
        version: "v9".to_string(),
        root: PathBuf::from("/data"),
        available: "v1, v2".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Unknown dataset version 'v9'"));
    assert!(error_str.contains("/data"));
    assert!(error_str.contains("v1, v2"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("no epochs to sweep".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid sweep configuration"));
    assert!(error_str.contains("no epochs to sweep"));
}

#[test]
fn test_launch_failed_error() {
    let error = Error::LaunchFailed {
        run: "v1_lr1e-05_bs256_ep10".to_string(),
        status: "exit code 1".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("v1_lr1e-05_bs256_ep10"));
    assert!(error_str.contains("exit code 1"));
    assert!(error_str.contains("Re-run the sweep"));
}

#[test]
fn test_table_error() {
    let error = Error::Table("unknown dimension 'syntax'".to_string());
    assert!(format!("{error}").contains("Results table error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_error_debug() {
    let error = Error::Config("test".to_string());
    let debug_str = format!("{error:?}");
    assert!(debug_str.contains("Config"));
}
