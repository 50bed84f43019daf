use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;

use bodytrend_core::cli::print_projection_report;
use bodytrend_core::config::{load_config, Horizon};
use bodytrend_core::projection::{project, project_json, ProjectionRequest};
use bodytrend_core::MeasurementTable;

/// Projiser vekt, fett% og muskelmasse fra en eksportert måletabell
/// (pandas `to_json(orient="split")`).
#[derive(Parser, Debug)]
#[command(name = "bodytrend", version)]
struct Args {
    /// JSON-fil med måletabellen
    table: PathBuf,

    /// Antall uker fremover (overstyrer konfig)
    #[arg(long)]
    weeks: Option<u32>,

    /// Referansedato (YYYY-MM-DD), default i dag
    #[arg(long)]
    today: Option<NaiveDate>,

    #[arg(long, default_value = "bodytrend.json")]
    config: PathBuf,

    /// Skriv hele resultatet som JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = load_config(&args.config)?;
    if let Some(w) = args.weeks {
        cfg.weeks_ahead = Horizon::try_from(w)?;
    }

    let raw = std::fs::read_to_string(&args.table)
        .with_context(|| format!("reading {}", args.table.display()))?;
    let table = MeasurementTable::from_json(&raw, &cfg.category_column)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let req = ProjectionRequest::new(&table, today, &cfg);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&project_json(&req))?);
        return Ok(());
    }

    match project(&req) {
        Ok(result) => {
            print_projection_report(&result, &cfg.categories);
            Ok(())
        }
        Err(e) => {
            eprintln!("ℹ️ {e}");
            std::process::exit(2);
        }
    }
}
