//! CLI wrapper that supports both:
//!   cargo run -- drafts.csv > totals.csv
//!   cargo run -- --input drafts.csv --output totals.csv --rates rates.csv

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command, value_parser};
use csv::{ReaderBuilder, WriterBuilder};
use std::{
    fs::File,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};
use trade_entry::FormConfig;
use trade_entry::batch::{DraftRow, process_row};
use trade_entry::rates::FixedRates;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // ---------------------------------------------------------------- flags
    let matches = Command::new("trade-entry")
        .about("Derive lump sums, conversions and totals for security transactions")
        .arg(
            Arg::new("input")
                .long("input")
                .value_name("FILE")
                .help("Input drafts CSV"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .value_name("FILE")
                .help("Output CSV (defaults to stdout)"),
        )
        .arg(
            Arg::new("rates")
                .long("rates")
                .value_name("FILE")
                .help("Exchange rates CSV with base,term,rate columns"),
        )
        .arg(
            Arg::new("amount-scale")
                .long("amount-scale")
                .value_name("N")
                .value_parser(value_parser!(u32))
                .help("Decimal places for currencies without an ISO exception (default 2)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Log per-field edits (-v debug, -vv trace)"),
        )
        .arg(Arg::new("INPUT").index(1).hide(true))
        .arg(Arg::new("OUTPUT").index(2).hide(true))
        .get_matches();

    // ---------------------------------------------------------------- logging
    // logs go to STDERR, keeping STDOUT clean for CSV
    let level = match matches.get_count("verbose") {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_target(false)
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    // ---------------------------------------------------- positional fallbacks
    let path = |flag: &str, pos: &str| {
        matches
            .get_one::<String>(flag)
            .or_else(|| matches.get_one::<String>(pos))
            .map(PathBuf::from)
    };
    let in_path = path("input", "INPUT");
    let out_path = path("output", "OUTPUT");

    let infile = match in_path {
        Some(p) => File::open(&p).with_context(|| format!("opening {}", p.display()))?,
        None => {
            eprintln!("Usage: trade-entry [--rates rates.csv] drafts.csv > totals.csv");
            std::process::exit(1);
        }
    };

    let mut config = FormConfig::default();
    if let Some(scale) = matches.get_one::<u32>("amount-scale") {
        config.default_amount_scale = *scale;
    }

    let rates = match matches.get_one::<String>("rates") {
        Some(p) => {
            let file = File::open(p).with_context(|| format!("opening {p}"))?;
            let rates = FixedRates::from_csv(file)?;
            info!("Loaded {} exchange rates", rates.len());
            rates
        }
        None => FixedRates::new(),
    };
    let rates = Arc::new(rates);

    // ---------------------------------------------------------------- emit
    let sink: Box<dyn Write> = match out_path {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout()),
    };
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(sink);

    // ---------------------------------------------------------------- ingest
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(infile);

    let (mut written, mut incomplete) = (0usize, 0usize);
    for (idx, row) in rdr.deserialize::<DraftRow>().enumerate() {
        let row = match row {
            Ok(r) => r,
            Err(e) => {
                error!(row = idx + 1, %e, "csv-deserialize");
                continue;
            }
        };
        match process_row(&row, config, &rates) {
            Ok(out) => {
                if !out.errors.is_empty() {
                    warn!(row = idx + 1, errors = %out.errors, "draft cannot be confirmed");
                    incomplete += 1;
                }
                wtr.serialize(out)?;
                written += 1;
            }
            Err(e) => error!(row = idx + 1, %e, "draft rejected"),
        }
    }
    wtr.flush()?;
    info!("Finished: {written} drafts written, {incomplete} incomplete");
    Ok(())
}
