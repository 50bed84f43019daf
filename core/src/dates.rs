//! Datoetiketter fra regnearket → kalenderdatoer.
//!
//! Hver etikett prøves mot en fast, ordnet kjede av strategier; første treff
//! vinner. Etiketter som ingen strategi forstår telles som `unparsed` og
//! påvirker ikke de andre.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Én tolkningsstrategi i kjeden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateStrategy {
    /// Full dato med fast chrono-format.
    ExactPattern(&'static str),
    /// `dd/mm` eller `dd-mm`; året utledes fra referansedatoen.
    PartialDayMonth,
    /// Tolerant dag-først tolkning som siste utvei.
    PermissiveFallback,
}

impl DateStrategy {
    pub const ALL: [DateStrategy; 9] = [
        DateStrategy::ExactPattern("%d/%m/%Y"),
        DateStrategy::ExactPattern("%d/%m/%y"),
        DateStrategy::ExactPattern("%d-%m-%Y"),
        DateStrategy::ExactPattern("%d-%m-%y"),
        DateStrategy::ExactPattern("%Y-%m-%d"),
        DateStrategy::ExactPattern("%d.%m.%Y"),
        DateStrategy::ExactPattern("%d.%m.%y"),
        DateStrategy::PartialDayMonth,
        DateStrategy::PermissiveFallback,
    ];

    /// Kjør strategien på en (allerede trimmet) etikett.
    pub fn apply(self, label: &str, reference_now: NaiveDate) -> Option<NaiveDate> {
        match self {
            DateStrategy::ExactPattern(fmt) => parse_exact(label, fmt),
            DateStrategy::PartialDayMonth => parse_day_month(label, reference_now),
            DateStrategy::PermissiveFallback => parse_permissive(label, reference_now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParsedLabel {
    /// Posisjon i den opprinnelige etikettlisten.
    pub index: usize,
    pub date: NaiveDate,
    pub strategy: DateStrategy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NormalizedLabels {
    /// I samme rekkefølge som input, ikke sortert.
    pub parsed: Vec<ParsedLabel>,
    pub unparsed: Vec<usize>,
}

impl NormalizedLabels {
    pub fn unparsed_count(&self) -> usize {
        self.unparsed.len()
    }

    pub fn unparsed_labels<'a>(&self, labels: &'a [String]) -> Vec<&'a str> {
        self.unparsed
            .iter()
            .filter_map(|&i| labels.get(i).map(String::as_str))
            .collect()
    }
}

/// Tolk alle etiketter. Duplikater behandles hver for seg.
pub fn normalize<S: AsRef<str>>(labels: &[S], reference_now: NaiveDate) -> NormalizedLabels {
    let mut out = NormalizedLabels::default();
    for (index, raw) in labels.iter().enumerate() {
        match normalize_label(raw.as_ref(), reference_now) {
            Some((date, strategy)) => out.parsed.push(ParsedLabel {
                index,
                date,
                strategy,
            }),
            None => {
                log::debug!("date label #{index} '{}' not recognised", raw.as_ref());
                out.unparsed.push(index);
            }
        }
    }
    out
}

/// Tolk én etikett; returnerer også hvilken strategi som traff.
pub fn normalize_label(label: &str, reference_now: NaiveDate) -> Option<(NaiveDate, DateStrategy)> {
    let clean = label.trim();
    if clean.is_empty() {
        return None;
    }
    DateStrategy::ALL
        .into_iter()
        .find_map(|s| s.apply(clean, reference_now).map(|d| (d, s)))
}

/// `%Y` i chrono godtar 1..n sifre; krev fire så `01/09/25` går videre til `%y`.
fn parse_exact(label: &str, fmt: &str) -> Option<NaiveDate> {
    let date = NaiveDate::parse_from_str(label, fmt).ok()?;
    if fmt.contains("%Y") && !(1000..=9999).contains(&date.year()) {
        return None;
    }
    Some(date)
}

/// Nyligste passerte forekomst av (dag, måned) sett fra `reference_now`.
/// `None` når datoen ikke finnes i det aktuelle året (f.eks. 29/02).
pub fn infer_year(day: u32, month: u32, reference_now: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(reference_now.year(), month, day)?;
    if this_year > reference_now {
        NaiveDate::from_ymd_opt(reference_now.year() - 1, month, day)
    } else {
        Some(this_year)
    }
}

fn parse_day_month(label: &str, reference_now: NaiveDate) -> Option<NaiveDate> {
    ['/', '-'].into_iter().find_map(|sep| {
        let (d, m) = label.split_once(sep)?;
        if m.contains(sep) {
            return None;
        }
        let day = d.trim().parse::<u32>().ok()?;
        let month = m.trim().parse::<u32>().ok()?;
        infer_year(day, month, reference_now)
    })
}

const MONTHS: [(&str, u32); 24] = [
    ("januari", 1),
    ("january", 1),
    ("februari", 2),
    ("february", 2),
    ("maart", 3),
    ("march", 3),
    ("april", 4),
    ("mei", 5),
    ("may", 5),
    ("juni", 6),
    ("june", 6),
    ("juli", 7),
    ("july", 7),
    ("augustus", 8),
    ("august", 8),
    ("september", 9),
    ("oktober", 10),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("mrt", 3),
    ("okt", 10),
    ("sept", 9),
    ("jun", 6),
];

fn month_from_name(token: &str) -> Option<u32> {
    let t = token.to_lowercase();
    if t.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .find(|(name, _)| *name == t || (t.len() == 3 && name.starts_with(&t)))
        .map(|(_, m)| *m)
}

fn expand_year(token: &str) -> Option<i32> {
    let y = token.parse::<i32>().ok()?;
    match token.len() {
        2 => Some(2000 + y),
        4 => Some(y),
        _ => None,
    }
}

fn parse_permissive(label: &str, reference_now: NaiveDate) -> Option<NaiveDate> {
    let tokens: Vec<&str> = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let numeric = |t: &str| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit());

    match tokens.as_slice() {
        // 2025-09-01 00:00:00, 2025/9/1, 1 9 2025, ...
        [a, b, c, ..] if numeric(a) && numeric(b) && numeric(c) => {
            if a.len() == 4 {
                NaiveDate::from_ymd_opt(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?)
            } else {
                NaiveDate::from_ymd_opt(expand_year(c)?, b.parse().ok()?, a.parse().ok()?)
            }
        }
        // 1 sep 2025 / 1 september
        [d, name, rest @ ..] if numeric(d) && !numeric(name) && rest.len() <= 1 => {
            let day = d.parse().ok()?;
            let month = month_from_name(name)?;
            match rest {
                [y] => NaiveDate::from_ymd_opt(expand_year(y)?, month, day),
                _ => infer_year(day, month, reference_now),
            }
        }
        // 15 9 (dag måned uten år, med mellomrom eller punktum)
        [d, m] if numeric(d) && numeric(m) => {
            infer_year(d.parse().ok()?, m.parse().ok()?, reference_now)
        }
        _ => None,
    }
}
