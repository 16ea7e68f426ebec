//! Discounted-cash-flow valuation engine.
//!
//! Historical revenue/EBIT -> growth profile -> forecast; independently, price
//! history and capital structure -> WACC; both feed the DCF aggregation that
//! yields an intrinsic value per share. Every stage is a pure function over
//! immutable inputs, so one engine can value many companies concurrently.

pub mod dcf;
pub mod forecast;
pub mod growth;
pub mod wacc;


use valuation_core::{
    AlignedPrices, CapitalStructure, DiscountRate, HistoricalFinancials, ValuationConfig, ValuationError,
    ValuationReport, ValuationResult,
};

pub use dcf::discount_cash_flows;
pub use forecast::project;
pub use growth::{average_ebit_margin, estimate_growth, revenue_cagr};
pub use wacc::{
    beta_from_prices, cost_of_equity, derive_discount_rate, equity_beta, periodic_returns,
    weighted_average_cost_of_capital, WaccInputs,
};

pub struct ValuationEngine {
    config: ValuationConfig,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Result<Self, ValuationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn valuate(
        &self,
        historicals: &HistoricalFinancials,
        capital: &CapitalStructure,
        prices: &AlignedPrices,
        risk_free_rate: f64,
    ) -> Result<ValuationResult, ValuationError> {
        self.valuate_detailed(historicals, capital, prices, risk_free_rate)
            .map(|report| report.result())
    }

    /// Runs the full pipeline and keeps every intermediate value.
    pub fn valuate_detailed(
        &self,
        historicals: &HistoricalFinancials,
        capital: &CapitalStructure,
        prices: &AlignedPrices,
        risk_free_rate: f64,
    ) -> Result<ValuationReport, ValuationError> {
        let config = &self.config;

        let growth = estimate_growth(historicals)?;
        let revenue_latest = historicals
            .latest()
            .map(|p| p.revenue)
            .ok_or_else(|| ValuationError::InsufficientData("no historical periods".to_string()))?;
        let forecast = project(revenue_latest, &growth, config.long_term_growth, config.horizon_years)?;

        let derived = derive_discount_rate(
            prices,
            capital,
            risk_free_rate,
            config.market_risk_premium,
            config.cost_of_debt,
            config.tax_rate,
        );
        let discount_rate = match (config.wacc_override, derived) {
            (None, derived) => derived?,
            (Some(wacc), Ok(derived)) => {
                tracing::warn!(
                    "{}: using WACC override {:.2}% instead of derived {:.2}%",
                    config.company,
                    wacc * 100.0,
                    derived.wacc * 100.0
                );
                DiscountRate {
                    wacc,
                    overridden: true,
                    ..derived
                }
            }
            // The override stands in for a rate that cannot be derived
            (Some(wacc), Err(e)) => {
                tracing::warn!(
                    "{}: derived WACC unavailable ({}), using override {:.2}%",
                    config.company,
                    e,
                    wacc * 100.0
                );
                DiscountRate::manual(
                    wacc,
                    risk_free_rate,
                    config.market_risk_premium,
                    config.cost_of_debt,
                    config.tax_rate,
                )
            }
        };

        let dcf = discount_cash_flows(&forecast, discount_rate.wacc, config.long_term_growth, capital)?;

        tracing::info!(
            "{}: intrinsic value {:.2} per share (WACC {:.2}%, CAGR {:.2}%)",
            config.company,
            dcf.result.intrinsic_value_per_share,
            discount_rate.wacc * 100.0,
            growth.revenue_cagr * 100.0
        );

        Ok(ValuationReport {
            company: config.company.clone(),
            historicals: historicals.clone(),
            growth,
            long_term_growth: config.long_term_growth,
            forecast,
            capital_structure: *capital,
            discount_rate,
            dcf,
        })
    }
}

/// One-shot valuation with an explicit configuration
pub fn valuate(
    historicals: &HistoricalFinancials,
    capital: &CapitalStructure,
    prices: &AlignedPrices,
    risk_free_rate: f64,
    config: &ValuationConfig,
) -> Result<ValuationResult, ValuationError> {
    ValuationEngine::new(config.clone())?.valuate(historicals, capital, prices, risk_free_rate)
}
