use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{AlignedPrices, CapitalStructure, HistoricalFinancials, ValuationError};

/// Produces normalized historical revenue/EBIT (annual periods only, source variants resolved)
#[async_trait]
pub trait StatementSource: Send + Sync {
    async fn historical_financials(&self, company: &str) -> Result<HistoricalFinancials, ValuationError>;
}

/// Produces the current market cap, net debt and share count
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn capital_structure(&self, company: &str) -> Result<CapitalStructure, ValuationError>;
}

/// Produces subject and benchmark closes aligned on trading day
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn aligned_prices(
        &self,
        company: &str,
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<AlignedPrices, ValuationError>;
}

/// Produces the risk-free rate as a decimal (0.0093 for 0.93%)
#[async_trait]
pub trait RiskFreeRateSource: Send + Sync {
    async fn risk_free_rate(&self, as_of: NaiveDate, lookback_days: u32) -> Result<f64, ValuationError>;
}
