use std::fmt::Write;

use crate::config::CategoryNames;
use crate::types::{Metric, ProjectionResult};

/// Kort tekstrapport per måltype: nå, projisert, endring, stigning/uke og r².
pub fn render_report(result: &ProjectionResult, names: &CategoryNames) -> String {
    let mut out = String::new();
    let weeks = result.summary.weeks_ahead;
    let _ = writeln!(out, "--- Projectie ({weeks} weken) ---");

    for m in Metric::ALL {
        let s = result.summary.metrics.get(m);
        let fit = result.regression.get(m);
        let unit = m.unit();
        let _ = writeln!(
            out,
            "{:<18} nu {:>6.1}{unit}  -> {:>6.1}{unit}  ({:+.1}{unit})  {:+.2}{unit}/week  r²={:.0}% ({:?})",
            names.name(m),
            s.current,
            s.projected_end,
            s.change,
            fit.slope * 7.0,
            fit.r_squared * 100.0,
            fit.confidence,
        );
    }

    if !result.unparsed_labels.is_empty() {
        let _ = writeln!(out, "Overgeslagen datums: {}", result.unparsed_labels.join(", "));
    }
    out
}

pub fn print_projection_report(result: &ProjectionResult, names: &CategoryNames) {
    print!("{}", render_report(result, names));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionConfig;
    use crate::projection::{project, ProjectionRequest};
    use crate::types::{Cell, MeasurementTable};
    use chrono::NaiveDate;

    #[test]
    fn report_lists_every_metric_and_skipped_labels() {
        let nums = |xs: [f64; 3]| xs.iter().map(|&x| Some(Cell::Number(x))).collect::<Vec<_>>();
        let t = MeasurementTable::new(["01/09/2025", "x", "08/09/2025", "15/09/2025"])
            .with_row("Gewicht", vec![Some(90.0.into()), None, Some(89.3.into()), Some(88.6.into())])
            .unwrap()
            .with_row("Vet %", vec![Some(28.0.into()), None, Some(27.5.into()), Some(27.0.into())])
            .unwrap()
            .with_row("Skeletspiermassa", {
                let mut v = nums([40.0, 40.1, 40.2]);
                v.insert(1, None);
                v
            })
            .unwrap();
        let cfg = ProjectionConfig::default();
        let today = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        let r = project(&ProjectionRequest::new(&t, today, &cfg)).unwrap();

        let text = render_report(&r, &cfg.categories);
        assert!(text.starts_with("--- Projectie (4 weken) ---"));
        for name in ["Gewicht", "Vet %", "Skeletspiermassa"] {
            assert!(text.contains(name), "{text}");
        }
        assert!(text.contains("-0.70kg/week"), "{text}");
        assert!(text.contains("Overgeslagen datums: x"));
    }
}
