//! Integration tests for the import reconciler against an in-memory store.

use anyhow::Result;
use listings::error::{ImportError, ImportErrorKind};
use listings::geocoding::GeoPoint;
use listings::import::{FailureMode, ImportOptions, parse_csv_str};
use std::time::Duration;

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{FakeGeocoder, FakeResponse, Harness, csv_row, csv_text, write_csv};

fn isolate() -> ImportOptions {
    ImportOptions {
        failure_mode: FailureMode::Isolate,
        ..ImportOptions::default()
    }
}

#[tokio::test]
async fn creates_one_building_per_address() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[
        csv_row("1460 Broadway", "10036", 1),
        csv_row("144 Grand Street", "10013", 10),
        csv_row("1460 Broadway", "10036", 2),
    ]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    assert_eq!(report.totals.buildings_created, 2);
    assert_eq!(report.totals.units_created, 3);
    assert_eq!(harness.all_buildings().await?.len(), 2);

    let broadway = harness.building("1460 Broadway").await?.unwrap();
    assert_eq!(broadway.city, "New York");
    assert_eq!(broadway.latitude, 40.7128);
    assert_eq!(broadway.longitude, -74.006);
    assert_eq!(broadway.number_of_units, 10);
    assert_eq!(report.group("1460 Broadway").unwrap().building_id, broadway.id);

    let mut calls = harness.geocoder.calls();
    calls.sort();
    assert_eq!(
        calls,
        vec![
            "144 Grand Street New York 10013".to_string(),
            "1460 Broadway New York 10036".to_string(),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn second_run_creates_nothing() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[
        csv_row("1460 Broadway", "10036", 1),
        csv_row("1460 Broadway", "10036", 2),
        csv_row("144 Grand Street", "10013", 10),
    ]))?;
    let importer = harness.importer(ImportOptions::default());

    importer.import_units(&grouped).await?;
    let second = importer.import_units(&grouped).await?;

    assert_eq!(second.totals.buildings_created, 0);
    assert_eq!(second.totals.buildings_reused, 2);
    assert_eq!(second.totals.units_created, 0);
    assert_eq!(second.totals.units_skipped, 3);
    assert_eq!(harness.all_buildings().await?.len(), 2);
    assert_eq!(harness.all_units().await?.len(), 3);
    assert_eq!(harness.geocoder.calls().len(), 2);
    Ok(())
}

#[tokio::test]
async fn existing_building_is_reused_without_geocoding() -> Result<()> {
    let harness = Harness::new().await?;
    let existing = harness.insert_building("1460 Broadway").await?;
    let grouped = parse_csv_str(&csv_text(&[csv_row("1460 Broadway", "10036", 42)]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    let group = report.group("1460 Broadway").unwrap();
    assert!(!group.building_created);
    assert_eq!(group.building_id, existing.id);
    assert_eq!(group.units_created, vec![42]);
    assert!(harness.geocoder.calls().is_empty());

    assert_eq!(harness.all_buildings().await?.len(), 1);
    let units = harness.all_units().await?;
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].building_id, existing.id);
    assert_eq!(units[0].unit_number, 42);
    Ok(())
}

#[tokio::test]
async fn existing_building_keeps_stored_location_fields() -> Result<()> {
    let harness = Harness::new().await?;
    let existing = harness.insert_building("1460 Broadway").await?;
    let grouped = parse_csv_str(&csv_text(&[
        "1460 Broadway,Brooklyn,NJ,10099,43,12,1500,true,750,1".to_string(),
    ]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    let group = report.group("1460 Broadway").unwrap();
    assert!(!group.building_created);
    assert_eq!(group.building_id, existing.id);
    assert_eq!(group.units_created, vec![43]);
    assert!(harness.geocoder.calls().is_empty());

    let stored = harness.building("1460 Broadway").await?.unwrap();
    assert_eq!(stored.city, "New York");
    assert_eq!(stored.state, "NY");
    assert_eq!(stored.zip_code, "10036");
    assert_eq!(stored.number_of_units, 10);
    assert_eq!(stored.latitude, existing.latitude);
    assert_eq!(harness.all_buildings().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn existing_unit_is_skipped() -> Result<()> {
    let harness = Harness::new().await?;
    let building = harness.insert_building("1460 Broadway").await?;
    harness.insert_unit(building.id, 555).await?;
    let grouped = parse_csv_str(&csv_text(&[csv_row("1460 Broadway", "10036", 555)]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    let group = report.group("1460 Broadway").unwrap();
    assert!(group.units_created.is_empty());
    assert_eq!(group.units_skipped, vec![555]);
    assert_eq!(harness.all_units().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn imports_single_row_into_empty_store() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[csv_row("144 Grand Street", "10013", 666)]))?;

    harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    let buildings = harness.all_buildings().await?;
    let units = harness.all_units().await?;
    assert_eq!(buildings.len(), 1);
    assert_eq!(units.len(), 1);
    assert_eq!(buildings[0].address, "144 Grand Street");
    assert_eq!(buildings[0].zip_code, "10013");
    assert_eq!(units[0].building_id, buildings[0].id);
    assert_eq!(units[0].unit_number, 666);
    Ok(())
}

#[tokio::test]
async fn import_file_reads_and_imports() -> Result<()> {
    let harness = Harness::new().await?;
    let file = write_csv(&csv_text(&[csv_row("144 Grand Street", "10013", 666)]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_file(file.path())
        .await?;

    assert_eq!(report.totals.units_created, 1);
    assert!(report.is_success());
    Ok(())
}

#[tokio::test]
async fn zero_geocode_results_fail_fast() -> Result<()> {
    let harness =
        Harness::with_geocoder(FakeGeocoder::answering(FakeResponse::Empty)).await?;
    let grouped = parse_csv_str(&csv_text(&[csv_row("Nowhere Lane", "00000", 1)]))?;

    let err = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ImportErrorKind::Geocoding);
    match err {
        ImportError::Geocoding { address, .. } => assert_eq!(address, "Nowhere Lane"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(harness.all_buildings().await?.is_empty());
    assert!(harness.all_units().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn isolate_mode_keeps_healthy_groups() -> Result<()> {
    let geocoder = FakeGeocoder::new().with_response("Nowhere Lane", FakeResponse::Fail);
    let harness = Harness::with_geocoder(geocoder).await?;
    let grouped = parse_csv_str(&csv_text(&[
        csv_row("Nowhere Lane", "00000", 1),
        csv_row("144 Grand Street", "10013", 666),
    ]))?;

    let report = harness.importer(isolate()).import_units(&grouped).await?;

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].address, "Nowhere Lane");
    assert_eq!(report.failures[0].kind, ImportErrorKind::Geocoding);
    assert_eq!(report.totals.failed_groups, 1);
    assert_eq!(report.totals.units_created, 1);

    let buildings = harness.all_buildings().await?;
    assert_eq!(buildings.len(), 1);
    assert_eq!(buildings[0].address, "144 Grand Street");
    Ok(())
}

#[tokio::test]
async fn duplicate_unit_numbers_in_one_file_are_both_created_by_default() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[
        csv_row("1460 Broadway", "10036", 7),
        csv_row("1460 Broadway", "10036", 7),
    ]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    assert_eq!(report.group("1460 Broadway").unwrap().units_created, vec![7, 7]);
    assert_eq!(harness.all_units().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn dedupe_within_batch_keeps_first_occurrence() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[
        csv_row("1460 Broadway", "10036", 7),
        csv_row("1460 Broadway", "10036", 7),
        csv_row("1460 Broadway", "10036", 8),
    ]))?;
    let options = ImportOptions {
        dedupe_within_batch: true,
        ..ImportOptions::default()
    };

    let report = harness.importer(options).import_units(&grouped).await?;

    let group = report.group("1460 Broadway").unwrap();
    assert_eq!(group.units_created, vec![7, 8]);
    assert_eq!(group.units_skipped, vec![7]);
    assert_eq!(harness.all_units().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn slow_geocoder_times_out() -> Result<()> {
    let point = GeoPoint {
        latitude: 1.0,
        longitude: 2.0,
    };
    let geocoder =
        FakeGeocoder::answering(FakeResponse::Delay(Duration::from_millis(500), point));
    let harness = Harness::with_geocoder(geocoder).await?;
    let grouped = parse_csv_str(&csv_text(&[csv_row("1460 Broadway", "10036", 1)]))?;
    let options = ImportOptions {
        geocode_timeout: Duration::from_millis(20),
        ..ImportOptions::default()
    };

    let err = harness
        .importer(options)
        .import_units(&grouped)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ImportErrorKind::Timeout);
    assert!(matches!(err, ImportError::Timeout { timeout_ms: 20, .. }));
    assert!(harness.all_buildings().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_input_produces_empty_report() -> Result<()> {
    let harness = Harness::new().await?;
    let grouped = parse_csv_str(&csv_text(&[]))?;

    let report = harness
        .importer(ImportOptions::default())
        .import_units(&grouped)
        .await?;

    assert!(report.groups.is_empty());
    assert_eq!(report.totals.groups, 0);
    Ok(())
}
