//! Normalized market-data snapshot standing in for the statement, quote and
//! price-history providers.
//!
//! A snapshot is one JSON document holding the income-statement columns, the
//! balance-sheet lines the valuation needs, the quoted market cap, daily closes
//! for the company and its benchmark index, and benchmark-yield observations.
//! Provider quirks (missing EBIT line, missing net-debt line, abbreviated market
//! cap, figures quoted in thousands, trailing-twelve-months column) are resolved
//! here so the engine receives plain numbers.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use valuation_core::{
    AlignedPrices, CapitalStructure, FinancialPeriod, HistoricalFinancials, MarketDataSource, NetDebtSource,
    OperatingEarnings, PriceHistorySource, PricePoint, RiskFreeRateSource, StatementSource, ValuationError,
};

/// Income-statement column label used for the trailing twelve months
const TRAILING_TWELVE_MONTHS: &str = "ttm";

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub ticker: String,
    /// Multiplier turning statement figures into currency units (1000 when quoted in thousands)
    #[serde(default = "default_statement_scale")]
    pub statement_scale: f64,
    pub income_statement: Vec<IncomeStatementColumn>,
    pub balance_sheet: BalanceSheet,
    pub market_cap: MarketCapQuote,
    pub prices: PriceHistory,
    /// Benchmark yield quoted in percent (0.93 means 0.93%)
    pub risk_free_yields: Vec<PricePoint>,
}

fn default_statement_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomeStatementColumn {
    pub period: String,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    pub total_revenue: f64,
    pub operating_earnings: OperatingEarnings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceSheet {
    pub net_debt: NetDebtSource,
    pub shares_issued: f64,
}

/// Market cap as a number or as quoted text such as `"49.83B"`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MarketCapQuote {
    Amount(f64),
    Abbreviated(String),
}

impl MarketCapQuote {
    pub fn value(&self) -> Result<f64, ValuationError> {
        match self {
            MarketCapQuote::Amount(value) => Ok(*value),
            MarketCapQuote::Abbreviated(text) => parse_abbreviated_amount(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceHistory {
    pub subject: Vec<PricePoint>,
    pub benchmark: Vec<PricePoint>,
}

/// Parses `"1.2T"`, `"49.83B"`, `"850.5M"`, `"12K"` or a plain `"1,234"`.
pub fn parse_abbreviated_amount(text: &str) -> Result<f64, ValuationError> {
    let cleaned = text.trim().replace(',', "");
    let (digits, multiplier) = match cleaned.chars().last().map(|c| c.to_ascii_uppercase()) {
        Some('T') => (&cleaned[..cleaned.len() - 1], 1e12),
        Some('B') => (&cleaned[..cleaned.len() - 1], 1e9),
        Some('M') => (&cleaned[..cleaned.len() - 1], 1e6),
        Some('K') => (&cleaned[..cleaned.len() - 1], 1e3),
        Some(_) => (cleaned.as_str(), 1.0),
        None => {
            return Err(ValuationError::InvalidData("market cap quote is empty".to_string()));
        }
    };

    digits
        .trim()
        .parse::<f64>()
        .map(|value| value * multiplier)
        .map_err(|e| ValuationError::InvalidData(format!("cannot parse amount '{}': {}", text, e)))
}

pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing snapshot {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self, ValuationError> {
        let snapshot: Snapshot = serde_json::from_str(text)
            .map_err(|e| ValuationError::Source(format!("malformed snapshot: {}", e)))?;
        if !snapshot.statement_scale.is_finite() || snapshot.statement_scale <= 0.0 {
            return Err(ValuationError::InvalidData(format!(
                "statement_scale must be positive, got {}",
                snapshot.statement_scale
            )));
        }
        Ok(Self { snapshot })
    }

    pub fn ticker(&self) -> &str {
        &self.snapshot.ticker
    }

    fn check_company(&self, company: &str) -> Result<(), ValuationError> {
        if self.snapshot.ticker.eq_ignore_ascii_case(company) {
            Ok(())
        } else {
            Err(ValuationError::Source(format!(
                "snapshot holds {}, not {}",
                self.snapshot.ticker, company
            )))
        }
    }
}

#[async_trait]
impl StatementSource for SnapshotSource {
    async fn historical_financials(&self, company: &str) -> Result<HistoricalFinancials, ValuationError> {
        self.check_company(company)?;
        let scale = self.snapshot.statement_scale;

        let mut periods = Vec::with_capacity(self.snapshot.income_statement.len());
        for column in &self.snapshot.income_statement {
            if column.period.trim().eq_ignore_ascii_case(TRAILING_TWELVE_MONTHS) {
                tracing::debug!("{}: skipping trailing-twelve-months column", company);
                continue;
            }
            let period_end = column.period_end.ok_or_else(|| {
                ValuationError::InvalidData(format!("income statement column {} has no period_end", column.period))
            })?;
            periods.push(FinancialPeriod::new(
                column.period.clone(),
                period_end,
                column.total_revenue * scale,
                column.operating_earnings.ebit() * scale,
            ));
        }

        HistoricalFinancials::new(periods)
    }
}

#[async_trait]
impl MarketDataSource for SnapshotSource {
    async fn capital_structure(&self, company: &str) -> Result<CapitalStructure, ValuationError> {
        self.check_company(company)?;
        let scale = self.snapshot.statement_scale;
        let balance_sheet = &self.snapshot.balance_sheet;

        if let NetDebtSource::Derived { .. } = balance_sheet.net_debt {
            tracing::debug!("{}: net debt not reported, using total debt minus cash", company);
        }

        CapitalStructure::new(
            self.snapshot.market_cap.value()?,
            balance_sheet.net_debt.net_debt() * scale,
            balance_sheet.shares_issued * scale,
        )
    }
}

#[async_trait]
impl PriceHistorySource for SnapshotSource {
    async fn aligned_prices(
        &self,
        company: &str,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<AlignedPrices, ValuationError> {
        self.check_company(company)?;
        AlignedPrices::from_dated(
            &self.snapshot.prices.subject,
            &self.snapshot.prices.benchmark,
            as_of,
            lookback_days,
        )
    }
}

#[async_trait]
impl RiskFreeRateSource for SnapshotSource {
    /// Average benchmark yield over the lookback window, as a decimal
    async fn risk_free_rate(&self, as_of: NaiveDate, lookback_days: u32) -> Result<f64, ValuationError> {
        let start = as_of - Duration::days(i64::from(lookback_days));
        let yields: Vec<f64> = self
            .snapshot
            .risk_free_yields
            .iter()
            .filter(|p| p.date >= start && p.date <= as_of)
            .map(|p| p.close)
            .collect();

        if yields.is_empty() {
            return Err(ValuationError::InsufficientData(format!(
                "no benchmark yield observations between {} and {}",
                start, as_of
            )));
        }

        let average_percent = yields.iter().sum::<f64>() / yields.len() as f64;
        Ok(average_percent / 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SNAPSHOT: &str = r#"{
        "ticker": "TD.TO",
        "statement_scale": 1000,
        "income_statement": [
            {"period": "10/31/2018", "period_end": "2018-10-31", "total_revenue": 100000,
             "operating_earnings": {"source": "pretax_income", "pretax_income": 15000, "interest_expense": 5000}},
            {"period": "10/31/2019", "period_end": "2019-10-31", "total_revenue": 110000,
             "operating_earnings": {"source": "ebit", "value": 22000}},
            {"period": "ttm", "total_revenue": 115000,
             "operating_earnings": {"source": "ebit", "value": 23000}}
        ],
        "balance_sheet": {
            "net_debt": {"source": "derived", "total_debt": 40000, "cash_and_equivalents": 15000},
            "shares_issued": 1800
        },
        "market_cap": "128.5B",
        "prices": {
            "subject": [
                {"date": "2020-12-01", "close": 70.0},
                {"date": "2020-12-02", "close": 71.0},
                {"date": "2020-12-03", "close": 70.5}
            ],
            "benchmark": [
                {"date": "2020-12-01", "close": 3660.0},
                {"date": "2020-12-02", "close": 3670.0},
                {"date": "2020-12-03", "close": 3667.0}
            ]
        },
        "risk_free_yields": [
            {"date": "2020-06-01", "close": 5.00},
            {"date": "2020-12-01", "close": 0.92},
            {"date": "2020-12-02", "close": 0.94}
        ]
    }"#;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 12, 4).unwrap()
    }

    #[test]
    fn test_parse_abbreviated_amounts() {
        assert_relative_eq!(parse_abbreviated_amount("49.83B").unwrap(), 49.83e9, max_relative = 1e-12);
        assert_relative_eq!(parse_abbreviated_amount("1.2T").unwrap(), 1.2e12, max_relative = 1e-12);
        assert_relative_eq!(parse_abbreviated_amount(" 850.5m ").unwrap(), 850.5e6, max_relative = 1e-12);
        assert_eq!(parse_abbreviated_amount("1,234").unwrap(), 1234.0);
        assert!(parse_abbreviated_amount("").is_err());
        assert!(parse_abbreviated_amount("N/A").is_err());
    }

    #[tokio::test]
    async fn test_historicals_drop_ttm_and_resolve_ebit() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let historicals = source.historical_financials("TD.TO").await.unwrap();

        assert_eq!(historicals.len(), 2);
        let first = &historicals.periods()[0];
        assert_eq!(first.revenue, 100_000_000.0);
        assert_eq!(first.ebit, 20_000_000.0);
        assert_eq!(historicals.latest().unwrap().ebit, 22_000_000.0);
    }

    #[tokio::test]
    async fn test_capital_structure_derives_net_debt() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let capital = source.capital_structure("td.to").await.unwrap();

        assert_relative_eq!(capital.market_cap, 128.5e9, max_relative = 1e-12);
        assert_eq!(capital.net_debt, 25_000_000.0);
        assert_eq!(capital.shares_outstanding, 1_800_000.0);
    }

    #[tokio::test]
    async fn test_risk_free_rate_averages_window() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let rate = source.risk_free_rate(as_of(), 100).await.unwrap();
        assert_relative_eq!(rate, 0.0093, epsilon = 1e-12);

        let empty = source
            .risk_free_rate(NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), 100)
            .await;
        assert!(matches!(empty, Err(ValuationError::InsufficientData(_))));
    }

    #[tokio::test]
    async fn test_aligned_prices_from_snapshot() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        let prices = source.aligned_prices("TD.TO", as_of(), 100).await.unwrap();
        assert_eq!(prices.subject(), &[70.0, 71.0, 70.5]);
        assert_eq!(prices.benchmark(), &[3660.0, 3670.0, 3667.0]);
    }

    #[tokio::test]
    async fn test_wrong_company_rejected() {
        let source = SnapshotSource::from_json(SNAPSHOT).unwrap();
        assert!(matches!(
            source.historical_financials("GM").await,
            Err(ValuationError::Source(_))
        ));
    }

    #[test]
    fn test_malformed_snapshot() {
        assert!(matches!(
            SnapshotSource::from_json("{\"ticker\": \"GM\"}"),
            Err(ValuationError::Source(_))
        ));
    }

    #[tokio::test]
    async fn test_annual_column_without_date_rejected() {
        let text = SNAPSHOT.replace(r#""period_end": "2018-10-31", "#, "");
        let source = SnapshotSource::from_json(&text).unwrap();
        assert!(matches!(
            source.historical_financials("TD.TO").await,
            Err(ValuationError::InvalidData(_))
        ));
    }
}
