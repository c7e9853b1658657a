use chrono::NaiveDateTime;
use clap::Parser;
use ddplot::{config, drawdown, graphing, refprice, results};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use ddplot::graphing::SeriesGroup;
use ddplot::refprice::PricePoint;

/// Plots equity curves and drawdowns from backtest result CSVs.
#[derive(Debug, Parser)]
#[command(name = "ddplot", version)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, default_value = "config.json")]
    config: PathBuf,
    /// Overrides the chart output file from the config.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Cli::parse();

    if let Err(err) = run(&args) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config::read_config(&args.config)?;
    if let Some(out) = &args.out {
        config.chart.output_file = out.display().to_string();
    }

    let files = results::list_result_files(Path::new(&config.results_dir))?;
    info!("found {} result files in {}", files.len(), config.results_dir);

    let columns = config.result_columns();
    let window = config.window();
    let mut groups = Vec::new();
    for path in &files {
        // one bad file must not take down the rest of the chart
        match load_group(path, &columns, window) {
            Ok(group) => {
                info!(
                    "{}: {} samples, worst drawdown {:.2}%",
                    group.balances.name,
                    group.balances.samples.len(),
                    group.drawdown.running_worst.last().copied().unwrap_or(0.0) * 100.0
                );
                groups.push(group);
            }
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    if groups.is_empty() {
        return Err("no result files could be loaded".into());
    }

    let reference = match &config.reference {
        Some(reference) => load_reference(reference, &groups),
        None => None,
    };
    let reference_view = reference
        .as_ref()
        .map(|(symbol, points)| (symbol.as_str(), points.as_slice()));

    graphing::plot_chart(&config.chart, &groups, reference_view)?;
    info!("chart saved to {}", config.chart.output_file);
    Ok(())
}

fn load_group(
    path: &Path,
    columns: &results::Columns,
    window: drawdown::Window,
) -> Result<SeriesGroup, Box<dyn std::error::Error>> {
    let balances = results::read_balance_series(path, columns)?;
    let drawdown = drawdown::compute(&balances.balances(), window)?;
    Ok(SeriesGroup { balances, drawdown })
}

/// The overlay spans the union of the loaded series; a failed DB read only
/// costs the overlay, never the chart.
fn load_reference(
    reference: &config::ReferenceConfig,
    groups: &[SeriesGroup],
) -> Option<(String, Vec<PricePoint>)> {
    let (from, to) = combined_span(groups)?;
    match refprice::load_price_series(Path::new(&reference.db_path), &reference.symbol, from, to) {
        Ok(points) => {
            info!(
                "loaded {} reference prices for {}",
                points.len(),
                reference.symbol
            );
            Some((reference.symbol.clone(), points))
        }
        Err(err) => {
            warn!(
                "skipping reference overlay for {}: {}",
                reference.symbol, err
            );
            None
        }
    }
}

fn combined_span(groups: &[SeriesGroup]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let mut span: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for group in groups {
        if let Some((from, to)) = group.balances.time_span() {
            span = Some(match span {
                Some((lo, hi)) => (lo.min(from), hi.max(to)),
                None => (from, to),
            });
        }
    }
    span
}
