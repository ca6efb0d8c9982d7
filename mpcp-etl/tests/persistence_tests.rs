//! SQLite persistence through the full pipeline

mod helpers;

use std::sync::Arc;

use sqlx::Row;
use tempfile::TempDir;

use helpers::*;
use mpcp_etl::db::sqlite::INGESTED_AT_COLUMN;
use mpcp_etl::services::FieldAnalyzer;
use mpcp_etl::{BeamTypeDispatcher, IngestSettings};

fn settings() -> IngestSettings {
    IngestSettings {
        analyze_images: false,
        ..IngestSettings::default()
    }
}

#[tokio::test]
async fn test_electron_record_round_trip() {
    let (_db_dir, gateway) = temp_gateway().await.unwrap();
    let gateway = Arc::new(gateway);
    let root = TempDir::new().unwrap();
    let folder = MeasurementFolder::create(root.path(), SCENARIO_A_FOLDER)
        .with_marker(true)
        .with_csv(&[
            ("BeamGroup/BeamOutputChange [%]", "0.98"),
            ("BeamGroup/BeamUniformityChange [%]", "bad"),
        ]);

    let dispatcher = BeamTypeDispatcher::new(settings(), Arc::new(FieldAnalyzer::new()), gateway.clone());
    dispatcher.process_folder(folder.path()).await.unwrap();

    let pool = gateway.pool();
    for column in [
        INGESTED_AT_COLUMN,
        "beam_type",
        "machine_serial",
        "acquisition_time",
        "is_baseline",
        "relative_output",
        "relative_uniformity",
        "flatness_horizontal",
        "symmetry_vertical",
    ] {
        assert!(
            has_column(pool, "beam_6e", column).await.unwrap(),
            "beam_6e is missing column {}",
            column
        );
    }
    assert!(!has_column(pool, "beam_6e", "center_shift").await.unwrap());

    let row = sqlx::query(
        "SELECT machine_serial, acquisition_time, is_baseline, relative_output, \
         relative_uniformity, flatness_horizontal FROM beam_6e",
    )
    .fetch_one(pool)
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>("machine_serial"), "SN6543");
    assert_eq!(row.get::<String, _>("acquisition_time"), "2025-09-19T07:41:49");
    assert!(row.get::<bool, _>("is_baseline"));
    assert_eq!(row.get::<f64, _>("relative_output"), 0.98);
    assert_eq!(row.get::<f64, _>("relative_uniformity"), -1.0);
    assert_eq!(row.get::<Option<f64>, _>("flatness_horizontal"), None);
}

#[tokio::test]
async fn test_geometry_record_stores_leaf_json() {
    let (_db_dir, gateway) = temp_gateway().await.unwrap();
    let gateway = Arc::new(gateway);
    let root = TempDir::new().unwrap();
    let rows = geometry_csv_rows();
    let rows: Vec<(&str, &str)> = rows.iter().map(|(n, v)| (n.as_str(), v.as_str())).collect();
    let folder = MeasurementFolder::create(root.path(), SCENARIO_B_FOLDER)
        .with_marker(false)
        .with_csv(&rows);

    let dispatcher = BeamTypeDispatcher::new(settings(), Arc::new(FieldAnalyzer::new()), gateway.clone());
    dispatcher.process_folder(folder.path()).await.unwrap();

    let columns = get_table_columns(gateway.pool(), "geometry_6x").await.unwrap();
    let column_type = |name: &str| {
        columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.r#type.clone())
    };
    assert_eq!(column_type("mlc_leaves_a").as_deref(), Some("TEXT"));
    assert_eq!(column_type("isocenter_size").as_deref(), Some("REAL"));
    assert_eq!(column_type("couch_rtn_large").as_deref(), Some("REAL"));

    let row = sqlx::query("SELECT mlc_leaves_a, mlc_backlash_b, couch_rtn_large FROM geometry_6x")
        .fetch_one(gateway.pool())
        .await
        .unwrap();
    let leaves: serde_json::Value =
        serde_json::from_str(&row.get::<String, _>("mlc_leaves_a")).unwrap();
    let leaves = leaves.as_object().unwrap();
    assert_eq!(leaves.len(), 40);
    assert_eq!(leaves["leaf_11"].as_f64(), Some(11.25));
    assert_eq!(leaves["leaf_50"].as_f64(), Some(50.25));
    assert!(!leaves.contains_key("leaf_51"));

    let backlash: serde_json::Value =
        serde_json::from_str(&row.get::<String, _>("mlc_backlash_b")).unwrap();
    assert_eq!(backlash["leaf_30"].as_f64(), Some(0.1));

    // Not in the export
    assert_eq!(row.get::<f64, _>("couch_rtn_large"), -1.0);
}

#[tokio::test]
async fn test_records_accumulate_per_table() {
    let (_db_dir, gateway) = temp_gateway().await.unwrap();
    let gateway = Arc::new(gateway);
    let root = TempDir::new().unwrap();
    let dispatcher = BeamTypeDispatcher::new(settings(), Arc::new(FieldAnalyzer::new()), gateway.clone());

    for (name, output) in [
        ("NDS-WKS-SN6543-2025-09-19-07-41-49-0004-BeamCheckTemplate6e", "0.98"),
        ("NDS-WKS-SN6543-2025-09-20-07-39-02-0004-BeamCheckTemplate6e", "1.02"),
        ("NDS-WKS-SN6543-2025-09-20-07-44-17-0005-BeamCheckTemplate2.5x", "0.31"),
    ] {
        let folder = MeasurementFolder::create(root.path(), name)
            .with_marker(false)
            .with_csv(&[("BeamGroup/BeamOutputChange [%]", output)]);
        dispatcher.process_folder(folder.path()).await.unwrap();
    }

    let count = |table: &'static str| {
        let pool = gateway.pool().clone();
        async move {
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap()
        }
    };
    assert_eq!(count("beam_6e").await, 2);
    assert_eq!(count("beam_2_5x").await, 1);
}
