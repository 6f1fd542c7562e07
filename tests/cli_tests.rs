//! End-to-end tests for the `listings` binary.

use serde_json::{Value, json};
use std::process::Command;
use tempfile::TempDir;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{csv_row, csv_text, write_csv};

fn listings(workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("listings"));
    cmd.current_dir(workdir.path())
        .env("LISTINGS_PROFILE", "test")
        .env("LISTINGS_LOG_LEVEL", "error")
        .env(
            "LISTINGS_DATABASE_URL",
            format!(
                "sqlite://{}?mode=rwc",
                workdir.path().join("listings.db").display()
            ),
        );
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

#[test]
fn dry_run_prints_grouped_rows() {
    let workdir = TempDir::new().unwrap();
    let file = write_csv(&csv_text(&[
        csv_row("1460 Broadway", "10036", 1),
        csv_row("144 Grand Street", "10013", 666),
        csv_row("1460 Broadway", "10036", 2),
    ]))
    .unwrap();

    let output = listings(&workdir)
        .args(["import", "--dry-run"])
        .arg(file.path())
        .output()
        .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["1460 Broadway"].as_array().unwrap().len(), 2);
    assert_eq!(json["144 Grand Street"][0]["unitNumber"], 666);
    assert!(!workdir.path().join("listings.db").exists());
}

#[test]
fn missing_file_fails_with_path_in_message() {
    let workdir = TempDir::new().unwrap();

    let output = listings(&workdir)
        .args(["import", "--dry-run", "/fake-path.csv"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/fake-path.csv"));
}

#[test]
fn migrate_reports_applied_count() {
    let workdir = TempDir::new().unwrap();

    let first = listings(&workdir).arg("migrate").output().unwrap();
    assert!(first.status.success());
    assert_eq!(stdout_json(&first), json!({ "applied": 2 }));

    let second = listings(&workdir).arg("migrate").output().unwrap();
    assert_eq!(stdout_json(&second), json!({ "applied": 0 }));
}

#[tokio::test]
async fn import_then_list_buildings() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "lat": "40.7205", "lon": "-73.9995" }])),
        )
        .mount(&mock_server)
        .await;

    let workdir = TempDir::new().unwrap();
    let file = write_csv(&csv_text(&[
        csv_row("144 Grand Street", "10013", 666),
        csv_row("144 Grand Street", "10013", 667),
    ]))
    .unwrap();
    let base_url = mock_server.uri();

    let (import, buildings) = tokio::task::spawn_blocking(move || {
        let import = listings(&workdir)
            .env("LISTINGS_GEOCODER_PROVIDER", "nominatim")
            .env("LISTINGS_GEOCODER_BASE_URL", &base_url)
            .args(["import", "--failure-mode", "isolate"])
            .arg(file.path())
            .output()
            .unwrap();
        let buildings = listings(&workdir).arg("buildings").output().unwrap();
        (import, buildings)
    })
    .await
    .unwrap();

    assert!(
        import.status.success(),
        "{}",
        String::from_utf8_lossy(&import.stderr)
    );
    let report = stdout_json(&import);
    assert_eq!(report["totals"]["buildings_created"], 1);
    assert_eq!(report["totals"]["units_created"], 2);
    assert_eq!(report["groups"][0]["units_created"], json!([666, 667]));

    assert!(buildings.status.success());
    let listed = stdout_json(&buildings);
    assert_eq!(listed[0]["address"], "144 Grand Street");
    assert_eq!(listed[0]["latitude"], 40.7205);
    assert_eq!(listed[0]["stored_units"], 2);
}
