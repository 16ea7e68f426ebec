//! intrinsic-value: estimate a company's intrinsic value per share with a DCF model.
//!
//! Reads a normalized market-data snapshot (statements, quote, price history,
//! benchmark yields), derives the discount rate and prints a sanity-check report.
//!
//! Usage:
//!   cargo run -p intrinsic-value -- --snapshot demos/gm_snapshot.json --as-of 2020-12-11
//!   cargo run -p intrinsic-value -- --snapshot demos/gm_snapshot.json --as-of 2020-12-11 --wacc 0.12
//!   RUST_LOG_FORMAT=json cargo run -p intrinsic-value -- --snapshot demos/gm_snapshot.json --json

use anyhow::Result;
use chrono::{Local, NaiveDate};
use fundamental_analysis::ValuationEngine;
use valuation_core::{
    MarketDataSource, PriceHistorySource, RiskFreeRateSource, StatementSource, ValuationConfig, ValuationReport,
};

mod config;
mod report;
mod snapshot;

use config::{load_config, print_usage, CliArgs};
use snapshot::SnapshotSource;

/// Gathers every engine input from the collaborators, then runs the engine.
async fn run_valuation<S>(source: &S, config: &ValuationConfig, as_of: NaiveDate) -> Result<ValuationReport>
where
    S: StatementSource + MarketDataSource + PriceHistorySource + RiskFreeRateSource,
{
    let engine = ValuationEngine::new(config.clone())?;
    let company = config.company.as_str();

    let (historicals, capital, prices, risk_free_rate) = tokio::try_join!(
        source.historical_financials(company),
        source.capital_structure(company),
        source.aligned_prices(company, as_of, config.lookback_days),
        source.risk_free_rate(as_of, config.lookback_days),
    )?;

    tracing::info!(
        "{}: {} annual periods, {} aligned closes, risk-free rate {:.2}%",
        company,
        historicals.len(),
        prices.len(),
        risk_free_rate * 100.0
    );

    Ok(engine.valuate_detailed(&historicals, &capital, &prices, risk_free_rate)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "intrinsic_value=info,fundamental_analysis=info".into())
    };
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match CliArgs::parse(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{:#}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    let source = SnapshotSource::load(&cli.snapshot).await?;
    let config = load_config(&cli, source.ticker())?;
    let as_of = cli.as_of.unwrap_or_else(|| Local::now().date_naive());

    tracing::info!(
        "Valuing {} as of {} ({}-day beta window, {}-year horizon)",
        config.company,
        as_of,
        config.lookback_days,
        config.horizon_years
    );

    let report = match run_valuation(&source, &config, as_of).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("{}: valuation failed: {:#}", config.company, e);
            return Err(e);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report::render(&report, as_of));
    }

    Ok(())
}
