use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use serde_path_to_error as spte;

use crate::error::TableError;
use crate::regression::TrendFit;

/// Kroppsmål som projiseres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "gewicht")]
    Weight,
    #[serde(rename = "vet_pct")]
    FatPct,
    #[serde(rename = "spier")]
    Muscle,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Weight, Metric::FatPct, Metric::Muscle];

    /// JSON-nøkkel brukt av dashboardet.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Weight => "gewicht",
            Metric::FatPct => "vet_pct",
            Metric::Muscle => "spier",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::FatPct => "%",
            Metric::Weight | Metric::Muscle => "kg",
        }
    }
}

/// Én verdi per [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerMetric<T> {
    #[serde(rename = "gewicht")]
    pub weight: T,
    #[serde(rename = "vet_pct")]
    pub fat_pct: T,
    #[serde(rename = "spier")]
    pub muscle: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            weight: f(Metric::Weight),
            fat_pct: f(Metric::FatPct),
            muscle: f(Metric::Muscle),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Metric) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            weight: f(Metric::Weight)?,
            fat_pct: f(Metric::FatPct)?,
            muscle: f(Metric::Muscle)?,
        })
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Weight => &self.weight,
            Metric::FatPct => &self.fat_pct,
            Metric::Muscle => &self.muscle,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Metric, &T) -> U) -> PerMetric<U> {
        PerMetric::from_fn(|m| f(m, self.get(m)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, &T)> {
        Metric::ALL.into_iter().map(move |m| (m, self.get(m)))
    }
}

/// Celle fra regnearket. Tomme celler er `None` i [`CategoryRow::cells`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    /// Tallverdi; tekst godtas med `.` eller `,` som desimalskille.
    pub fn as_number(&self) -> Result<f64, String> {
        match self {
            Cell::Number(v) if v.is_finite() => Ok(*v),
            Cell::Number(v) => Err(format!("non-finite value {v}")),
            Cell::Text(s) => {
                let t = s.trim().replace(',', ".");
                t.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("could not convert '{s}' to a number"))
            }
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub category: String,
    pub cells: Vec<Option<Cell>>,
}

/// Pandas `to_dict(orient="split")`; `index` ignoreres.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitTable {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Option<Cell>>>,
    #[serde(default)]
    pub index: Option<Value>,
}

/// Måletabell: én rad per kategori, én kolonne per datoetikett (eldste først).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MeasurementTable {
    labels: Vec<String>,
    rows: Vec<CategoryRow>,
}

impl MeasurementTable {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builder-variant av [`push_row`](Self::push_row).
    pub fn with_row(
        mut self,
        category: impl Into<String>,
        cells: Vec<Option<Cell>>,
    ) -> Result<Self, TableError> {
        self.push_row(category, cells)?;
        Ok(self)
    }

    /// Legger til en kategorirad. Korte rader fylles med tomme celler.
    pub fn push_row(
        &mut self,
        category: impl Into<String>,
        mut cells: Vec<Option<Cell>>,
    ) -> Result<(), TableError> {
        let category = category.into();
        if self.row(&category).is_some() {
            return Err(TableError::DuplicateCategory(category));
        }
        if cells.len() > self.labels.len() {
            return Err(TableError::RowTooLong {
                category,
                cells: cells.len(),
                labels: self.labels.len(),
            });
        }
        cells.resize(self.labels.len(), None);
        for c in cells.iter_mut() {
            if c.as_ref().is_some_and(Cell::is_blank) {
                *c = None;
            }
        }
        self.rows.push(CategoryRow { category, cells });
        Ok(())
    }

    /// Bygger tabellen fra split-formatet. Kategorikolonnen finnes på navn,
    /// ellers brukes første kolonne.
    pub fn from_split(split: SplitTable, category_column: &str) -> Result<Self, TableError> {
        if split.columns.is_empty() {
            return Err(TableError::NoColumns);
        }
        let cat_idx = split
            .columns
            .iter()
            .position(|c| c.trim() == category_column)
            .unwrap_or(0);

        let labels = split
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != cat_idx)
            .map(|(_, c)| c.clone());
        let mut table = Self::new(labels);

        for (row_no, mut raw) in split.data.into_iter().enumerate() {
            if raw.len() <= cat_idx {
                return Err(TableError::CategoryNotText { row: row_no });
            }
            let category = match raw.remove(cat_idx) {
                Some(Cell::Text(s)) if !s.trim().is_empty() => s.trim().to_string(),
                _ => return Err(TableError::CategoryNotText { row: row_no }),
            };
            table.push_row(category, raw)?;
        }
        Ok(table)
    }

    pub fn from_json(json_str: &str, category_column: &str) -> Result<Self, TableError> {
        let mut de = serde_json::Deserializer::from_str(json_str);
        let split: SplitTable = spte::deserialize(&mut de).map_err(|e| TableError::Json {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        })?;
        Self::from_split(split, category_column)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn rows(&self) -> &[CategoryRow] {
        &self.rows
    }

    pub fn row(&self, category: &str) -> Option<&CategoryRow> {
        self.rows.iter().find(|r| r.category == category)
    }

    /// Standard kolonnenavn for en ny økt: `dd/mm` av datoen.
    pub fn session_label(date: NaiveDate) -> String {
        date.format("%d/%m").to_string()
    }

    /// Skriver en måleøkt: oppdaterer kolonnen `label` hvis den finnes,
    /// ellers legges en ny kolonne til. Bare eksisterende kategorier skrives;
    /// ukjente nøkler returneres.
    pub fn upsert_session(&mut self, label: &str, entry: &MeasurementEntry) -> Vec<String> {
        let col = match self.labels.iter().position(|l| l == label) {
            Some(i) => i,
            None => {
                self.labels.push(label.to_string());
                for row in self.rows.iter_mut() {
                    row.cells.push(None);
                }
                self.labels.len() - 1
            }
        };

        let mut ignored = Vec::new();
        for (category, value) in entry.iter() {
            match self.rows.iter_mut().find(|r| r.category == category) {
                Some(row) => row.cells[col] = Some(Cell::Number(value)),
                None => ignored.push(category.to_string()),
            }
        }
        log::debug!(
            "upsert_session label={label} col={col} written={} ignored={:?}",
            entry.len() - ignored.len(),
            ignored
        );
        ignored
    }
}

/// Én måleøkt som skal skrives: kategori → verdi, i innsettingsrekkefølge.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementEntry {
    values: Vec<(String, f64)>,
}

impl MeasurementEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Setter inn eller overskriver verdien for `category`.
    pub fn insert(&mut self, category: impl Into<String>, value: f64) {
        let category = category.into();
        match self.values.iter_mut().find(|(c, _)| *c == category) {
            Some(slot) => slot.1 = value,
            None => self.values.push((category, value)),
        }
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(c, v)| (c.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for MeasurementEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (c, v) in &self.values {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

/// Ett punkt på en tidslinje: dato, dager siden første måling, verdi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub day: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub current: f64,
    pub projected_end: f64,
    /// Projisert minus sist observerte verdi.
    pub change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSummary {
    #[serde(flatten)]
    pub metrics: PerMetric<MetricSummary>,
    pub weeks_ahead: u32,
}

/// Resultatet fra [`crate::projection::project`]. Bygges én gang, muteres ikke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionResult {
    pub historical: PerMetric<Vec<TrendPoint>>,
    pub projections: PerMetric<Vec<TrendPoint>>,
    pub regression: PerMetric<TrendFit>,
    pub summary: ProjectionSummary,
    /// Datoetiketter som ikke kunne tolkes (utelatt fra tilpasningen).
    pub unparsed_labels: Vec<String>,
}
