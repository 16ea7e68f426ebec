use serde::{Deserialize, Serialize};

use crate::error::ValuationError;

/// Caller-supplied assumptions for one valuation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Ticker or other company identifier, used only for reporting
    pub company: String,
    /// Calendar days of price history used for the equity beta
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_market_risk_premium")]
    pub market_risk_premium: f64,
    /// Perpetual growth rate applied after the forecast horizon
    #[serde(default = "default_long_term_growth")]
    pub long_term_growth: f64,
    /// Pre-tax cost of debt
    #[serde(default = "default_cost_of_debt")]
    pub cost_of_debt: f64,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    /// Ordinary forecast years before the terminal period
    #[serde(default = "default_horizon_years")]
    pub horizon_years: usize,
    /// Replaces the derived WACC when set
    #[serde(default)]
    pub wacc_override: Option<f64>,
}

fn default_lookback_days() -> u32 { 100 }
fn default_market_risk_premium() -> f64 { 0.0525 }
fn default_long_term_growth() -> f64 { 0.01 }
fn default_cost_of_debt() -> f64 { 0.01 }
fn default_tax_rate() -> f64 { 0.30 }
fn default_horizon_years() -> usize { 5 }

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            company: String::new(),
            lookback_days: default_lookback_days(),
            market_risk_premium: default_market_risk_premium(),
            long_term_growth: default_long_term_growth(),
            cost_of_debt: default_cost_of_debt(),
            tax_rate: default_tax_rate(),
            horizon_years: default_horizon_years(),
            wacc_override: None,
        }
    }
}

impl ValuationConfig {
    pub fn for_company(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValuationError> {
        if self.company.trim().is_empty() {
            return Err(ValuationError::InvalidData("company identifier is empty".to_string()));
        }
        if self.lookback_days == 0 {
            return Err(ValuationError::InvalidModelParameter(
                "lookback window must be at least 1 day".to_string(),
            ));
        }
        if self.horizon_years == 0 {
            return Err(ValuationError::InvalidModelParameter(
                "forecast horizon must be at least 1 year".to_string(),
            ));
        }

        let rates = [
            ("market_risk_premium", self.market_risk_premium),
            ("long_term_growth", self.long_term_growth),
            ("cost_of_debt", self.cost_of_debt),
            ("tax_rate", self.tax_rate),
        ];
        if let Some((name, value)) = rates.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValuationError::InvalidModelParameter(format!(
                "{} is not a finite number ({})",
                name, value
            )));
        }
        if !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(ValuationError::InvalidModelParameter(format!(
                "tax_rate must be between 0 and 1, got {}",
                self.tax_rate
            )));
        }
        if self.long_term_growth <= -1.0 {
            return Err(ValuationError::InvalidModelParameter(format!(
                "long_term_growth must be above -100%, got {}",
                self.long_term_growth
            )));
        }

        if let Some(wacc) = self.wacc_override {
            if !wacc.is_finite() || wacc <= self.long_term_growth {
                return Err(ValuationError::InvalidModelParameter(format!(
                    "WACC override {} must exceed long-term growth {}",
                    wacc, self.long_term_growth
                )));
            }
        }

        Ok(())
    }
}
