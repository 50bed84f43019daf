use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;
use serde_json as json;
use serde_path_to_error as spte;

use crate::config::{Horizon, ProjectionConfig};
use crate::dates::normalize;
use crate::metrics::Metrics;
use crate::projection::{project, to_envelope, ProjectionRequest};
use crate::types::MeasurementTable;

// ──────────────────────────────────────────────────────────────────────────────
// Prosessglobale tellere (kun observasjon, påvirker aldri resultatet)
// ──────────────────────────────────────────────────────────────────────────────

static METRICS: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new() {
    Ok(m) => Some(m),
    Err(e) => {
        log::warn!("metrics registry unavailable: {e}");
        None
    }
});

fn value_err(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// `None` → dagens dato (lokal tid); ellers `YYYY-MM-DD`.
fn reference_date(reference_now: Option<&str>) -> PyResult<NaiveDate> {
    match reference_now {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|e| PyValueError::new_err(format!("reference_now '{s}': {e}"))),
    }
}

fn parse_config(config_json: Option<&str>) -> PyResult<ProjectionConfig> {
    let Some(raw) = config_json else {
        return Ok(ProjectionConfig::default());
    };
    let mut de = json::Deserializer::from_str(raw);
    spte::deserialize(&mut de)
        .map_err(|e| PyValueError::new_err(format!("config parse at {}: {}", e.path(), e.inner())))
}

// ──────────────────────────────────────────────────────────────────────────────
// PyO3-FUNKSJONER
// ──────────────────────────────────────────────────────────────────────────────

/// Projeksjon for dashboardet. Tabellen er pandas `to_json(orient="split")`.
/// Feil i selve beregningen kommer tilbake som `{"error": ..., "message": ...}`;
/// bare ugyldig input gir `ValueError`.
#[pyfunction]
#[pyo3(signature = (table_json, weeks_ahead = Horizon::DEFAULT_WEEKS, reference_now = None, config_json = None))]
fn calculate_body_projections_json(
    table_json: &str,
    weeks_ahead: u32,
    reference_now: Option<&str>,
    config_json: Option<&str>,
) -> PyResult<String> {
    let cfg = parse_config(config_json)?;
    let horizon = Horizon::try_from(weeks_ahead).map_err(value_err)?;
    let table = MeasurementTable::from_json(table_json, &cfg.category_column).map_err(value_err)?;
    let today = reference_date(reference_now)?;

    let req = ProjectionRequest::new(&table, today, &cfg).with_horizon(horizon);
    let result = project(&req);
    if let Some(m) = METRICS.as_ref() {
        m.observe(&result);
    }
    Ok(to_envelope(&result).to_string())
}

/// Tolker en JSON-liste med datoetiketter; nyttig for å vise hvilke kolonner som hoppes over.
#[pyfunction]
#[pyo3(signature = (labels_json, reference_now = None))]
fn normalize_date_labels_json(labels_json: &str, reference_now: Option<&str>) -> PyResult<String> {
    let mut de = json::Deserializer::from_str(labels_json);
    let labels: Vec<String> = spte::deserialize(&mut de)
        .map_err(|e| PyValueError::new_err(format!("labels parse at {}: {}", e.path(), e.inner())))?;
    let today = reference_date(reference_now)?;

    let normalized = normalize(&labels, today);
    json::to_string(&normalized).map_err(value_err)
}

#[pyfunction]
fn metrics_text() -> String {
    METRICS.as_ref().map(Metrics::gather_text).unwrap_or_default()
}

// ──────────────────────────────────────────────────────────────────────────────
// PyO3-MODUL
// ──────────────────────────────────────────────────────────────────────────────

#[pymodule]
fn bodytrend_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(calculate_body_projections_json, m)?)?;
    m.add_function(wrap_pyfunction!(normalize_date_labels_json, m)?)?;
    m.add_function(wrap_pyfunction!(metrics_text, m)?)?;
    Ok(())
}
