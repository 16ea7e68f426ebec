use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use valuation_core::ValuationConfig;

/// Parsed command-line flags
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub snapshot: PathBuf,
    pub ticker: Option<String>,
    pub as_of: Option<NaiveDate>,
    pub wacc: Option<f64>,
    pub json: bool,
}

impl CliArgs {
    pub fn parse(args: &[String]) -> Result<Self> {
        // A flag directly followed by another flag has no value
        fn value_of<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a String>> {
            match args.iter().position(|a| a == flag) {
                None => Ok(None),
                Some(i) => match args.get(i + 1) {
                    Some(value) if !value.starts_with("--") => Ok(Some(value)),
                    _ => bail!("{} requires a value", flag),
                },
            }
        }

        let snapshot = match value_of(args, "--snapshot")? {
            Some(path) => PathBuf::from(path),
            None => bail!("--snapshot PATH is required"),
        };

        let as_of = value_of(args, "--as-of")?
            .map(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d"))
            .transpose()
            .context("--as-of must be YYYY-MM-DD")?;

        let wacc = value_of(args, "--wacc")?
            .map(|v| v.parse::<f64>())
            .transpose()
            .context("--wacc must be a decimal rate such as 0.12")?;

        Ok(Self {
            snapshot,
            ticker: value_of(args, "--ticker")?.cloned(),
            as_of,
            wacc,
            json: args.iter().any(|a| a == "--json"),
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  intrinsic-value --snapshot PATH [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --ticker SYM       Company to value (default: VALUATION_TICKER or the snapshot's ticker)");
    eprintln!("  --as-of DATE       End of the price lookback window, YYYY-MM-DD (default: today)");
    eprintln!("  --wacc RATE        Override the derived WACC, e.g. 0.12");
    eprintln!("  --json             Print the full valuation report as JSON");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  VALUATION_LOOKBACK_DAYS, VALUATION_MARKET_RISK_PREMIUM, VALUATION_LONG_TERM_GROWTH,");
    eprintln!("  VALUATION_COST_OF_DEBT, VALUATION_TAX_RATE, VALUATION_HORIZON_YEARS, VALUATION_WACC_OVERRIDE");
}

/// Builds the valuation assumptions from a variable lookup, falling back to defaults.
pub fn config_from_vars<F>(lookup: F, company: String) -> Result<ValuationConfig>
where
    F: Fn(&str) -> Option<String>,
{
    fn parse_or<T: FromStr>(raw: Option<String>, name: &str, default: T) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match raw {
            Some(value) => value
                .trim()
                .parse()
                .with_context(|| format!("{} has an invalid value '{}'", name, value)),
            None => Ok(default),
        }
    }

    let defaults = ValuationConfig::for_company(company);
    let wacc_override = match lookup("VALUATION_WACC_OVERRIDE") {
        Some(value) => Some(
            value
                .trim()
                .parse::<f64>()
                .with_context(|| format!("VALUATION_WACC_OVERRIDE has an invalid value '{}'", value))?,
        ),
        None => defaults.wacc_override,
    };

    Ok(ValuationConfig {
        lookback_days: parse_or(lookup("VALUATION_LOOKBACK_DAYS"), "VALUATION_LOOKBACK_DAYS", defaults.lookback_days)?,
        market_risk_premium: parse_or(
            lookup("VALUATION_MARKET_RISK_PREMIUM"),
            "VALUATION_MARKET_RISK_PREMIUM",
            defaults.market_risk_premium,
        )?,
        long_term_growth: parse_or(
            lookup("VALUATION_LONG_TERM_GROWTH"),
            "VALUATION_LONG_TERM_GROWTH",
            defaults.long_term_growth,
        )?,
        cost_of_debt: parse_or(lookup("VALUATION_COST_OF_DEBT"), "VALUATION_COST_OF_DEBT", defaults.cost_of_debt)?,
        tax_rate: parse_or(lookup("VALUATION_TAX_RATE"), "VALUATION_TAX_RATE", defaults.tax_rate)?,
        horizon_years: parse_or(lookup("VALUATION_HORIZON_YEARS"), "VALUATION_HORIZON_YEARS", defaults.horizon_years)?,
        wacc_override,
        company: defaults.company,
    })
}

/// Flags win over environment variables, which win over defaults.
pub fn load_config(args: &CliArgs, snapshot_ticker: &str) -> Result<ValuationConfig> {
    let company = args
        .ticker
        .clone()
        .or_else(|| std::env::var("VALUATION_TICKER").ok())
        .unwrap_or_else(|| snapshot_ticker.to_string());

    let mut config = config_from_vars(|key| std::env::var(key).ok(), company)?;
    if args.wacc.is_some() {
        config.wacc_override = args.wacc;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_cli_args() {
        let parsed = CliArgs::parse(&args(&[
            "--snapshot",
            "demos/gm_snapshot.json",
            "--as-of",
            "2020-12-11",
            "--wacc",
            "0.12",
            "--json",
        ]))
        .unwrap();

        assert_eq!(parsed.snapshot, PathBuf::from("demos/gm_snapshot.json"));
        assert_eq!(parsed.as_of, NaiveDate::from_ymd_opt(2020, 12, 11));
        assert_eq!(parsed.wacc, Some(0.12));
        assert!(parsed.json);
        assert!(parsed.ticker.is_none());
    }

    #[test]
    fn test_snapshot_flag_required() {
        assert!(CliArgs::parse(&args(&["--json"])).is_err());
    }

    #[test]
    fn test_flag_without_value_rejected() {
        assert!(CliArgs::parse(&args(&["--snapshot", "--json"])).is_err());
        assert!(CliArgs::parse(&args(&["--snapshot"])).is_err());
        assert!(CliArgs::parse(&args(&["--snapshot", "gm.json", "--ticker", "--json"])).is_err());
        assert!(CliArgs::parse(&args(&["--snapshot", "gm.json", "--wacc"])).is_err());
    }

    #[test]
    fn test_bad_date_rejected() {
        assert!(CliArgs::parse(&args(&["--snapshot", "x.json", "--as-of", "11/12/2020"])).is_err());
    }

    #[test]
    fn test_config_defaults_without_vars() {
        let config = config_from_vars(|_| None, "GM".to_string()).unwrap();
        assert_eq!(config, ValuationConfig::for_company("GM"));
    }

    #[test]
    fn test_config_reads_vars() {
        let vars: HashMap<&str, &str> = [
            ("VALUATION_LOOKBACK_DAYS", "250"),
            ("VALUATION_LONG_TERM_GROWTH", "0.02"),
            ("VALUATION_HORIZON_YEARS", "10"),
            ("VALUATION_WACC_OVERRIDE", " 0.09 "),
        ]
        .into_iter()
        .collect();

        let config = config_from_vars(|k| vars.get(k).map(|v| v.to_string()), "F".to_string()).unwrap();
        assert_eq!(config.company, "F");
        assert_eq!(config.lookback_days, 250);
        assert_eq!(config.long_term_growth, 0.02);
        assert_eq!(config.horizon_years, 10);
        assert_eq!(config.wacc_override, Some(0.09));
        assert_eq!(config.tax_rate, 0.30);
    }

    #[test]
    fn test_config_rejects_garbage() {
        let result = config_from_vars(
            |k| (k == "VALUATION_TAX_RATE").then(|| "thirty".to_string()),
            "GM".to_string(),
        );
        assert!(result.is_err());
    }
}
