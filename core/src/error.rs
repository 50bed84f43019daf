use serde_json::{json, Value};
use thiserror::Error;

/// Feil fra projeksjonsgrensen. Alle varianter returneres som verdier,
/// aldri som panikk, slik at UI-et alltid har noe å vise.
///
/// Meldingene er på nederlandsk fordi de vises direkte i dashboardet.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("Minimaal {needed} metingen nodig voor betrouwbare projecties (gevonden: {found})")]
    InsufficientData { found: usize, needed: usize },

    #[error("Niet alle categorieën gevonden, ontbrekend: {}", .missing.join(", "))]
    MissingCategories { missing: Vec<String> },

    #[error("Kan niet genoeg datums parsen (gevonden: {found}, nodig: {needed}). Formaten: {examples:?}")]
    DateParseError {
        found: usize,
        needed: usize,
        examples: Vec<String>,
    },

    #[error("Fout bij berekenen projecties: {message}")]
    CalculationError { message: String },
}

impl ProjectionError {
    /// Maskinlesbar feiltype (stabil streng for UI og metrikker).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
            Self::MissingCategories { .. } => "missing_categories",
            Self::DateParseError { .. } => "date_parse_error",
            Self::CalculationError { .. } => "calculation_error",
        }
    }

    /// Antall målinger funnet, for de variantene som bærer det.
    pub fn current_measurements(&self) -> Option<usize> {
        match self {
            Self::InsufficientData { found, .. } | Self::DateParseError { found, .. } => Some(*found),
            _ => None,
        }
    }

    pub(crate) fn calculation(message: impl Into<String>) -> Self {
        Self::CalculationError {
            message: message.into(),
        }
    }

    /// JSON-konvolutt: `{"error": kind, "message": ..., "current_measurements": n}`.
    pub fn to_json(&self) -> Value {
        let mut out = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        if let Some(n) = self.current_measurements() {
            out["current_measurements"] = json!(n);
        }
        if let Self::MissingCategories { missing } = self {
            out["missing"] = json!(missing);
        }
        out
    }
}

/// Strukturfeil i måletabellen (kontraktbrudd fra regnearkadapteren).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("table parse at {path}: {message}")]
    Json { path: String, message: String },

    #[error("table has no columns")]
    NoColumns,

    #[error("row {row}: category cell is missing or not text")]
    CategoryNotText { row: usize },

    #[error("duplicate category row '{0}'")]
    DuplicateCategory(String),

    #[error("row '{category}' has {cells} cells but the table has {labels} date columns")]
    RowTooLong {
        category: String,
        cells: usize,
        labels: usize,
    },
}

/// Brudd på forutsetningene til OLS-tilpasningen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("days and values differ in length ({days} vs {values})")]
    LengthMismatch { days: usize, values: usize },

    #[error("need at least 2 points for a regression, got {0}")]
    TooFewPoints(usize),

    #[error("all day offsets are identical, slope is undefined")]
    ZeroDayVariance,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weeks_ahead must be a positive number of weeks")]
    ZeroHorizon,

    #[error("config io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse at {path}: {message}")]
    Parse { path: String, message: String },
}

/// Feil fra fritekst-parsing via språkmodellen.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("GROQ_API_KEY is not set")]
    MissingApiKey,

    #[error("language model request failed: {0}")]
    Transport(String),

    #[error("language model returned no content")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response failed validation: {0}")]
    Invalid(String),

    #[error("gave up after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: u32, last: Box<EntryError> },
}
