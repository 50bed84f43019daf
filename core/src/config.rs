use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;

use crate::error::ConfigError;
use crate::types::{Metric, PerMetric};

/// Projeksjonshorisont i hele uker (alltid ≥ 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Horizon(NonZeroU32);

impl Horizon {
    pub const DEFAULT_WEEKS: u32 = 4;

    pub fn weeks(self) -> u32 {
        self.0.get()
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self(NonZeroU32::MIN.saturating_add(Self::DEFAULT_WEEKS - 1))
    }
}

impl TryFrom<u32> for Horizon {
    type Error = ConfigError;

    fn try_from(weeks: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(weeks).map(Self).ok_or(ConfigError::ZeroHorizon)
    }
}

impl From<Horizon> for u32 {
    fn from(h: Horizon) -> u32 {
        h.weeks()
    }
}

/// Radnavn i måletabellen for hver måltype.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryNames {
    pub weight: String,
    pub fat_pct: String,
    pub muscle: String,
}

impl Default for CategoryNames {
    fn default() -> Self {
        Self {
            weight: "Gewicht".into(),
            fat_pct: "Vet %".into(),
            muscle: "Skeletspiermassa".into(),
        }
    }
}

impl CategoryNames {
    pub fn name(&self, metric: Metric) -> &str {
        match metric {
            Metric::Weight => &self.weight,
            Metric::FatPct => &self.fat_pct,
            Metric::Muscle => &self.muscle,
        }
    }

    pub fn as_per_metric(&self) -> PerMetric<&str> {
        PerMetric::from_fn(|m| self.name(m))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub weeks_ahead: Horizon,
    /// Navnet på kolonnen med kategorinavn.
    pub category_column: String,
    pub categories: CategoryNames,
    /// Sorter observasjoner på dato før tilpasning.
    pub sort_by_date: bool,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            weeks_ahead: Horizon::default(),
            category_column: "categorie".into(),
            categories: CategoryNames::default(),
            sort_by_date: true,
        }
    }
}

/// Leser konfig fra disk (JSON).
/// Hvis filen ikke finnes, returneres default-konfig.
pub fn load_config(path: impl AsRef<Path>) -> Result<ProjectionConfig, ConfigError> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    if !path.exists() {
        log::info!("config not found at {shown}, using defaults");
        return Ok(ProjectionConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: shown.clone(),
        source,
    })?;
    let mut de = serde_json::Deserializer::from_str(&contents);
    let cfg: ProjectionConfig = spte::deserialize(&mut de).map_err(|e| ConfigError::Parse {
        path: format!("{shown}:{}", e.path()),
        message: e.inner().to_string(),
    })?;
    log::info!(
        "config loaded from {shown} (weeks_ahead={}, sort_by_date={})",
        cfg.weeks_ahead.weeks(),
        cfg.sort_by_date
    );
    Ok(cfg)
}

/// Lagrer konfig til disk som JSON (pretty-print).
pub fn save_config(cfg: &ProjectionConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let shown = path.display().to_string();
    let json = serde_json::to_string_pretty(cfg).map_err(|e| ConfigError::Parse {
        path: shown.clone(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: shown.clone(),
        source,
    })?;
    log::info!("config saved to {shown}");
    Ok(())
}
