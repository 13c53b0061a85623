//! End-to-end import of CSV files against the in-memory store.

use std::io::Write;

use assert_matches::assert_matches;
use tempfile::NamedTempFile;

use mudclub_core::import::OnError;
use mudclub_core::observer::NoopObserver;
use mudclub_core::role::RoleKind;
use mudclub_importer::config::{ConfigError, ImportConfig};
use mudclub_importer::reader::read_path;
use mudclub_importer::runner::{run, ImportError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn dry_run(role: RoleKind) -> ImportConfig {
    ImportConfig {
        role,
        dry_run: true,
        ..ImportConfig::default()
    }
}

const MEMBERS: &str = "\
dni,name,surname,nickname,birthday,address,email,phone,sex
12345X,Ana,Ruiz,,01/05/2010,,ana@example.com,,f
,Eva,Gil,,2011-03-04,,,,mujer
12.345-x,Ana,Ruiz,Anita,,,,,
,Luis,,,,,,,h
";

// ---------------------------------------------------------------------------
// Test: a file with duplicates and a bad row
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dry_run_reconciles_duplicates_and_reports_failures() {
    let file = csv_file(MEMBERS);
    let rows = read_path(file.path(), true).unwrap();
    assert_eq!(rows.len(), 4);

    let summary = run(&dry_run(RoleKind::Player), rows, &NoopObserver)
        .await
        .unwrap();

    assert_eq!(summary.created, 2);
    assert_eq!(summary.linked, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].line, 5);
    assert!(!summary.aborted);
}

#[tokio::test]
async fn test_abort_policy_stops_the_file() {
    let file = csv_file(",Luis,,,,,,,\n,Eva,Gil\n");
    let rows = read_path(file.path(), false).unwrap();

    let config = ImportConfig {
        on_error: OnError::Abort,
        ..dry_run(RoleKind::Coach)
    };
    let summary = run(&config, rows, &NoopObserver).await.unwrap();

    assert!(summary.aborted);
    assert_eq!(summary.processed(), 1);
    assert_eq!(summary.failed[0].line, 1);
}

#[tokio::test]
async fn test_summary_serializes_for_json_output() {
    let file = csv_file(MEMBERS);
    let rows = read_path(file.path(), true).unwrap();
    let summary = run(&dry_run(RoleKind::Parent), rows, &NoopObserver)
        .await
        .unwrap();

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["created"], 2);
    assert_eq!(json["failed"][0]["line"], 5);
}

// ---------------------------------------------------------------------------
// Test: a real run needs a database URL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_database_url_is_a_config_error() {
    let config = ImportConfig::default();
    let err = run(&config, Vec::new(), &NoopObserver).await.unwrap_err();
    assert_matches!(err, ImportError::Config(ConfigError::MissingDatabaseUrl));
}
