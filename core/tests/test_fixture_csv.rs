use std::path::PathBuf;

use bodytrend_core::config::ProjectionConfig;
use bodytrend_core::projection::{first_to_last_changes, project, ProjectionRequest};
use bodytrend_core::types::SplitTable;
use bodytrend_core::{Cell, MeasurementTable};
use chrono::NaiveDate;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/metingen.csv")
}

fn cell(raw: &str) -> Option<Cell> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else if let Ok(x) = t.parse::<f64>() {
        Some(Cell::Number(x))
    } else {
        Some(Cell::Text(t.to_string()))
    }
}

fn load_split() -> SplitTable {
    let mut rdr = csv::Reader::from_path(fixture()).expect("open fixture");
    let columns: Vec<String> = rdr
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    let data = rdr
        .records()
        .map(|r| r.expect("record").iter().map(cell).collect())
        .collect();
    SplitTable {
        columns,
        data,
        index: None,
    }
}

#[test]
fn spreadsheet_export_projects_with_skipped_note_column() {
    let cfg = ProjectionConfig::default();
    let table = MeasurementTable::from_split(load_split(), &cfg.category_column).expect("table");
    assert_eq!(table.labels().len(), 6);
    assert_eq!(table.rows().len(), 4);

    let today = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
    let r = project(&ProjectionRequest::new(&table, today, &cfg)).expect("projection");

    assert_eq!(r.unparsed_labels, vec!["notitie".to_string()]);
    assert_eq!(r.historical.weight.len(), 5);
    assert_eq!(r.historical.weight[1].value, 105.1);
    assert_eq!(
        r.historical.weight.last().unwrap().date,
        NaiveDate::from_ymd_opt(2025, 9, 29).unwrap()
    );

    assert_eq!(r.projections.weight.len(), 4);
    assert_eq!(
        r.projections.weight[0].date,
        NaiveDate::from_ymd_opt(2025, 10, 6).unwrap()
    );
    assert!(r.regression.weight.slope < 0.0);
    assert!(r.regression.muscle.slope > 0.0);
    assert!(r.summary.metrics.fat_pct.change < 0.0);
}

#[test]
fn split_json_from_the_dashboard_is_accepted() {
    let raw = r#"{
        "columns": ["categorie", "01/09", "08/09", "15/09"],
        "index": [0, 1, 2],
        "data": [
            ["Gewicht", 105.6, "105,1", 104.9],
            ["Vet %", 27.9, 27.7, 27.6],
            ["Skeletspiermassa", 41.2, 41.2, 41.3]
        ]
    }"#;
    let table = MeasurementTable::from_json(raw, "categorie").expect("table");
    let today = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();

    let changes = first_to_last_changes(&table, &Default::default(), today).expect("changes");
    assert!((changes.weight + 0.7).abs() < 1e-9);

    let r = project(&ProjectionRequest::new(&table, today, &ProjectionConfig::default())).unwrap();
    assert_eq!(r.historical.fat_pct.len(), 3);
}

#[test]
fn broken_split_json_points_at_the_bad_field() {
    let raw = r#"{"columns": ["categorie", "01/09"], "data": [["Gewicht", [1, 2]]]}"#;
    let err = MeasurementTable::from_json(raw, "categorie").unwrap_err();
    assert!(err.to_string().contains("data"), "{err}");
}
