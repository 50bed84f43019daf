//! Trendlinjer og fremskrivninger for kroppssammensetning (vekt, fett%,
//! skjelettmuskelmasse) fra regnearkbaserte måletabeller.

pub mod cli;
pub mod config;
pub mod dates;
pub mod entry;
pub mod error;
pub mod metrics;
pub mod projection;
pub mod regression;
pub mod types;

#[cfg(feature = "python")]
mod py;

pub use config::{load_config, save_config, Horizon, ProjectionConfig};
pub use dates::{normalize, DateStrategy, NormalizedLabels};
pub use error::{ProjectionError, TableError};
pub use projection::{project, ProjectionRequest};
pub use regression::{fit, TrendFit};
pub use types::{Cell, MeasurementEntry, MeasurementTable, Metric, PerMetric, ProjectionResult};
