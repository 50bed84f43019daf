//! Projeksjon av kroppssammensetning: datoetiketter → trendlinjer → ukentlige
//! fremskrivninger fra siste måling.

use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::config::{CategoryNames, Horizon, ProjectionConfig};
use crate::dates::{normalize, ParsedLabel};
use crate::error::ProjectionError;
use crate::regression::{fit, TrendFit};
use crate::types::{
    CategoryRow, MeasurementTable, Metric, MetricSummary, PerMetric, ProjectionResult,
    ProjectionSummary, TrendPoint,
};

/// Minste antall tolkbare datoer for en tilpasning.
pub const MIN_DATES: usize = 3;

/// Alt én projeksjon trenger. Lever kun så lenge kallet varer.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionRequest<'a> {
    pub table: &'a MeasurementTable,
    pub horizon: Horizon,
    pub reference_now: NaiveDate,
    pub categories: &'a CategoryNames,
    pub sort_by_date: bool,
}

impl<'a> ProjectionRequest<'a> {
    pub fn new(
        table: &'a MeasurementTable,
        reference_now: NaiveDate,
        config: &'a ProjectionConfig,
    ) -> Self {
        Self {
            table,
            horizon: config.weeks_ahead,
            reference_now,
            categories: &config.categories,
            sort_by_date: config.sort_by_date,
        }
    }

    pub fn with_horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }
}

pub fn project(req: &ProjectionRequest<'_>) -> Result<ProjectionResult, ProjectionError> {
    let labels = req.table.labels();
    if labels.len() < MIN_DATES {
        return Err(ProjectionError::InsufficientData {
            found: labels.len(),
            needed: MIN_DATES,
        });
    }

    let normalized = normalize(labels, req.reference_now);
    let unparsed_labels: Vec<String> = normalized
        .unparsed_labels(labels)
        .into_iter()
        .map(str::to_owned)
        .collect();
    if normalized.parsed.len() < MIN_DATES {
        return Err(ProjectionError::DateParseError {
            found: normalized.parsed.len(),
            needed: MIN_DATES,
            examples: unparsed_labels.iter().take(3).cloned().collect(),
        });
    }
    if !unparsed_labels.is_empty() {
        log::debug!("skipping {} unparsed date labels: {:?}", unparsed_labels.len(), unparsed_labels);
    }

    let rows = resolve_rows(req.table, req.categories)?;

    let mut parsed = normalized.parsed;
    if req.sort_by_date {
        // stabil: like datoer beholder kolonnerekkefølgen
        parsed.sort_by_key(|p| p.date);
    }
    let (first_date, last_date) = match (parsed.first(), parsed.last()) {
        (Some(f), Some(l)) => (f.date, l.date),
        _ => return Err(ProjectionError::calculation("no parsed dates")),
    };

    let days: Vec<i64> = parsed.iter().map(|p| (p.date - first_date).num_days()).collect();
    let days_f: Vec<f64> = days.iter().map(|&d| d as f64).collect();

    let values = PerMetric::try_from_fn(|m| extract_values(rows.get(m), &parsed, labels))?;
    let fits: PerMetric<TrendFit> = PerMetric::try_from_fn(|m| {
        fit(&days_f, values.get(m)).map_err(|e| {
            ProjectionError::calculation(format!("regression for '{}': {e}", rows.get(m).category))
        })
    })?;

    let checkpoints = future_checkpoints(first_date, last_date, req.horizon)?;

    let historical = PerMetric::from_fn(|m| {
        parsed
            .iter()
            .zip(&days)
            .zip(values.get(m))
            .map(|((p, &day), &value)| TrendPoint {
                date: p.date,
                day,
                value,
            })
            .collect::<Vec<_>>()
    });

    let projections = PerMetric::from_fn(|m| {
        let line = fits.get(m);
        checkpoints
            .iter()
            .map(|&(date, day)| TrendPoint {
                date,
                day,
                value: line.predict(day as f64),
            })
            .collect::<Vec<_>>()
    });

    let metrics = PerMetric::try_from_fn(|m| summarize(historical.get(m), projections.get(m)))?;

    log::debug!(
        "projection over {} dates ({first_date}..{last_date}), {} weeks ahead",
        parsed.len(),
        req.horizon.weeks()
    );

    Ok(ProjectionResult {
        historical,
        projections,
        regression: fits,
        summary: ProjectionSummary {
            metrics,
            weeks_ahead: req.horizon.weeks(),
        },
        unparsed_labels,
    })
}

fn resolve_rows<'t>(
    table: &'t MeasurementTable,
    categories: &CategoryNames,
) -> Result<PerMetric<&'t CategoryRow>, ProjectionError> {
    let missing: Vec<String> = Metric::ALL
        .into_iter()
        .map(|m| categories.name(m))
        .filter(|name| table.row(name).is_none())
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return Err(ProjectionError::MissingCategories { missing });
    }
    PerMetric::try_from_fn(|m| {
        table
            .row(categories.name(m))
            .ok_or_else(|| ProjectionError::MissingCategories {
                missing: vec![categories.name(m).to_owned()],
            })
    })
}

/// Verdier på de tolkede posisjonene, indeksjustert mot dagene.
fn extract_values(
    row: &CategoryRow,
    parsed: &[ParsedLabel],
    labels: &[String],
) -> Result<Vec<f64>, ProjectionError> {
    parsed
        .iter()
        .map(|p| {
            let at = || format!("category '{}' at '{}'", row.category, labels[p.index]);
            match row.cells.get(p.index) {
                Some(Some(cell)) => cell
                    .as_number()
                    .map_err(|e| ProjectionError::calculation(format!("{}: {e}", at()))),
                _ => Err(ProjectionError::calculation(format!("{}: missing value", at()))),
            }
        })
        .collect()
}

/// Ukentlige sjekkpunkter fra siste måling: (dato, dager siden første).
fn future_checkpoints(
    first_date: NaiveDate,
    last_date: NaiveDate,
    horizon: Horizon,
) -> Result<Vec<(NaiveDate, i64)>, ProjectionError> {
    (1..=i64::from(horizon.weeks()))
        .map(|w| {
            let date = last_date
                .checked_add_signed(Duration::weeks(w))
                .ok_or_else(|| ProjectionError::calculation("projection date out of range"))?;
            Ok((date, (date - first_date).num_days()))
        })
        .collect()
}

fn summarize(
    historical: &[TrendPoint],
    projected: &[TrendPoint],
) -> Result<MetricSummary, ProjectionError> {
    match (historical.last(), projected.last()) {
        (Some(h), Some(p)) => Ok(MetricSummary {
            current: h.value,
            projected_end: p.value,
            change: p.value - h.value,
        }),
        _ => Err(ProjectionError::calculation("empty series")),
    }
}

/// Endring fra første til siste måling per måltype (kortene "sinds start").
/// `None` ved færre enn to tolkbare datoer, manglende rader eller ikke-numeriske celler.
pub fn first_to_last_changes(
    table: &MeasurementTable,
    categories: &CategoryNames,
    reference_now: NaiveDate,
) -> Option<PerMetric<f64>> {
    let mut parsed = normalize(table.labels(), reference_now).parsed;
    if parsed.len() < 2 {
        return None;
    }
    parsed.sort_by_key(|p| p.date);
    let (first, last) = (parsed.first()?.index, parsed.last()?.index);

    let value_at = |row: &CategoryRow, idx: usize| -> Option<f64> {
        row.cells.get(idx)?.as_ref()?.as_number().ok()
    };
    PerMetric::try_from_fn(|m| {
        let row = table.row(categories.name(m)).ok_or(())?;
        match (value_at(row, first), value_at(row, last)) {
            (Some(a), Some(b)) => Ok(b - a),
            _ => Err(()),
        }
    })
    .ok()
}

/// JSON for Python-grensen: resultatet, eller feilkonvolutten.
pub fn project_json(req: &ProjectionRequest<'_>) -> Value {
    to_envelope(&project(req))
}

pub fn to_envelope(result: &Result<ProjectionResult, ProjectionError>) -> Value {
    match result {
        Ok(r) => serde_json::to_value(r)
            .unwrap_or_else(|e| ProjectionError::calculation(e.to_string()).to_json()),
        Err(e) => e.to_json(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn nums(xs: &[f64]) -> Vec<Option<Cell>> {
        xs.iter().map(|&x| Some(Cell::Number(x))).collect()
    }

    fn table(labels: &[&str], w: &[f64], f: &[f64], s: &[f64]) -> MeasurementTable {
        MeasurementTable::new(labels.iter().copied())
            .with_row("Gewicht", nums(w))
            .unwrap()
            .with_row("Vet %", nums(f))
            .unwrap()
            .with_row("Skeletspiermassa", nums(s))
            .unwrap()
    }

    #[test]
    fn checkpoints_start_from_last_observation() {
        let cps = future_checkpoints(ymd(2025, 9, 1), ymd(2025, 9, 15), Horizon::try_from(2).unwrap())
            .unwrap();
        assert_eq!(cps, vec![(ymd(2025, 9, 22), 21), (ymd(2025, 9, 29), 28)]);
    }

    #[test]
    fn out_of_order_columns_are_sorted_before_fitting() {
        let t = table(
            &["15/09/2025", "01/09/2025", "08/09/2025"],
            &[88.6, 90.0, 89.3],
            &[27.0, 28.0, 27.5],
            &[40.0, 40.0, 40.0],
        );
        let cfg = ProjectionConfig::default();
        let req = ProjectionRequest::new(&t, ymd(2025, 10, 1), &cfg);
        let r = project(&req).unwrap();
        assert!(r.regression.weight.slope < 0.0);
        assert_eq!(r.historical.weight[0].date, ymd(2025, 9, 1));
        assert_eq!(r.summary.metrics.weight.current, 88.6);

        let unsorted = ProjectionConfig {
            sort_by_date: false,
            ..ProjectionConfig::default()
        };
        let req = ProjectionRequest::new(&t, ymd(2025, 10, 1), &unsorted);
        let r = project(&req).unwrap();
        assert_eq!(r.historical.weight[0].day, 0);
        assert_eq!(r.historical.weight[1].day, -14);
        assert_eq!(r.summary.metrics.weight.current, 89.3);
    }

    #[test]
    fn blank_cell_at_parsed_position_is_a_calculation_error() {
        let t = MeasurementTable::new(["01/09/2025", "08/09/2025", "15/09/2025"])
            .with_row("Gewicht", vec![Some(90.0.into()), None, Some(88.6.into())])
            .unwrap()
            .with_row("Vet %", nums(&[28.0, 27.5, 27.0]))
            .unwrap()
            .with_row("Skeletspiermassa", nums(&[40.0, 40.1, 40.2]))
            .unwrap();
        let cfg = ProjectionConfig::default();
        let err = project(&ProjectionRequest::new(&t, ymd(2025, 10, 1), &cfg)).unwrap_err();
        assert_eq!(err.kind(), "calculation_error");
        assert!(err.to_string().contains("08/09/2025"), "{err}");
    }

    #[test]
    fn first_to_last_uses_chronological_ends() {
        let t = table(
            &["08/09/2025", "01/09/2025"],
            &[89.0, 90.0],
            &[27.5, 28.0],
            &[40.5, 40.0],
        );
        let ch = first_to_last_changes(&t, &CategoryNames::default(), ymd(2025, 10, 1)).unwrap();
        assert!((ch.weight + 1.0).abs() < 1e-9);
        assert!((ch.muscle - 0.5).abs() < 1e-9);
    }
}
