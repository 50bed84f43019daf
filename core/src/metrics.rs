use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::ProjectionError;
use crate::types::ProjectionResult;

/// Prometheus-tellere for projeksjonskjernen. Eies av kalleren (Python-modulen
/// eller CLI-et); selve beregningen rører dem ikke.
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Registry,
    projections_total: IntCounterVec,
    unparsed_total: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        let projections_total = IntCounterVec::new(
            Opts::new("bodytrend_projections_total", "Projection requests by outcome"),
            &["outcome"],
        )?;
        let unparsed_total = IntCounter::new(
            "bodytrend_date_labels_unparsed_total",
            "Date labels skipped because no strategy recognised them",
        )?;
        registry.register(Box::new(projections_total.clone()))?;
        registry.register(Box::new(unparsed_total.clone()))?;
        Ok(Self {
            registry,
            projections_total,
            unparsed_total,
        })
    }

    /// Teller utfallet (`ok` eller feiltypen) og antall hoppede etiketter.
    pub fn observe(&self, result: &Result<ProjectionResult, ProjectionError>) {
        let outcome = match result {
            Ok(r) => {
                self.unparsed_total.inc_by(r.unparsed_labels.len() as u64);
                "ok"
            }
            Err(e) => e.kind(),
        };
        self.projections_total.with_label_values(&[outcome]).inc();
    }

    pub fn projections(&self, outcome: &str) -> u64 {
        self.projections_total.with_label_values(&[outcome]).get()
    }

    pub fn unparsed_labels(&self) -> u64 {
        self.unparsed_total.get()
    }

    /// Tekstformat for scraping.
    pub fn gather_text(&self) -> String {
        let mut buf = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buf) {
            log::warn!("metrics encode failed: {e}");
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_are_counted_by_kind() {
        let m = Metrics::new().unwrap();
        m.observe(&Err(ProjectionError::InsufficientData { found: 1, needed: 3 }));
        m.observe(&Err(ProjectionError::InsufficientData { found: 2, needed: 3 }));
        assert_eq!(m.projections("insufficient_data"), 2);
        assert_eq!(m.projections("ok"), 0);
        assert!(m.gather_text().contains("bodytrend_projections_total"));
    }
}
