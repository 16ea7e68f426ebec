//! Discount rate: equity beta from price returns, CAPM cost of equity and the
//! market-value weighted average cost of capital.

use statrs::statistics::Statistics;
use valuation_core::{ensure_finite, AlignedPrices, CapitalStructure, DiscountRate, ValuationError};

/// Inputs of the WACC formula once beta is known
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaccInputs {
    pub risk_free_rate: f64,
    pub equity_beta: f64,
    pub market_risk_premium: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
    pub market_cap: f64,
    pub net_debt: f64,
}

/// Simple returns `(p[t] - p[t-1]) / p[t-1]`
pub fn periodic_returns(prices: &[f64]) -> Result<Vec<f64>, ValuationError> {
    prices
        .windows(2)
        .map(|w| {
            if w[0] == 0.0 {
                Err(ValuationError::Division("price series contains a zero close".to_string()))
            } else {
                Ok((w[1] - w[0]) / w[0])
            }
        })
        .collect()
}

/// `cov(stock, market) / var(market)` using sample statistics.
pub fn equity_beta(stock_returns: &[f64], market_returns: &[f64]) -> Result<f64, ValuationError> {
    if stock_returns.len() != market_returns.len() {
        return Err(ValuationError::InvalidData(format!(
            "return series differ in length: {} vs {}",
            stock_returns.len(),
            market_returns.len()
        )));
    }
    if market_returns.len() < 2 {
        return Err(ValuationError::InsufficientData(format!(
            "beta needs at least 2 returns, got {}",
            market_returns.len()
        )));
    }

    let market_variance = market_returns.variance();
    if market_variance == 0.0 {
        return Err(ValuationError::Division(
            "benchmark returns have zero variance over the lookback window".to_string(),
        ));
    }

    let covariance = stock_returns.covariance(market_returns);
    ensure_finite(covariance / market_variance, "equity beta")
}

/// Beta of the subject against the benchmark over an aligned price window
pub fn beta_from_prices(prices: &AlignedPrices) -> Result<f64, ValuationError> {
    let stock_returns = periodic_returns(prices.subject())?;
    let market_returns = periodic_returns(prices.benchmark())?;
    equity_beta(&stock_returns, &market_returns)
}

/// CAPM: `rf + beta * market_risk_premium`
pub fn cost_of_equity(risk_free_rate: f64, equity_beta: f64, market_risk_premium: f64) -> f64 {
    risk_free_rate + equity_beta * market_risk_premium
}

pub fn weighted_average_cost_of_capital(inputs: &WaccInputs) -> Result<DiscountRate, ValuationError> {
    let financing_value = inputs.market_cap + inputs.net_debt;
    if financing_value == 0.0 {
        return Err(ValuationError::Division(format!(
            "market cap {} plus net debt {} is zero",
            inputs.market_cap, inputs.net_debt
        )));
    }

    let cost_of_equity = cost_of_equity(inputs.risk_free_rate, inputs.equity_beta, inputs.market_risk_premium);
    let equity_weight = inputs.market_cap / financing_value;
    let debt_weight = inputs.net_debt / financing_value;
    let wacc = equity_weight * cost_of_equity + debt_weight * inputs.cost_of_debt * (1.0 - inputs.tax_rate);

    Ok(DiscountRate {
        risk_free_rate: inputs.risk_free_rate,
        equity_beta: inputs.equity_beta,
        market_risk_premium: inputs.market_risk_premium,
        cost_of_equity,
        cost_of_debt: inputs.cost_of_debt,
        tax_rate: inputs.tax_rate,
        equity_weight,
        debt_weight,
        wacc: ensure_finite(wacc, "WACC")?,
        overridden: false,
    })
}

/// Full discount-rate derivation from prices and the capital structure.
pub fn derive_discount_rate(
    prices: &AlignedPrices,
    capital: &CapitalStructure,
    risk_free_rate: f64,
    market_risk_premium: f64,
    cost_of_debt: f64,
    tax_rate: f64,
) -> Result<DiscountRate, ValuationError> {
    ensure_finite(risk_free_rate, "risk-free rate")?;
    let equity_beta = beta_from_prices(prices)?;

    let rate = weighted_average_cost_of_capital(&WaccInputs {
        risk_free_rate,
        equity_beta,
        market_risk_premium,
        cost_of_debt,
        tax_rate,
        market_cap: capital.market_cap,
        net_debt: capital.net_debt,
    })?;

    tracing::debug!(
        "Beta {:.3} over {} closes, cost of equity {:.2}%, WACC {:.2}% (equity weight {:.2})",
        rate.equity_beta,
        prices.len(),
        rate.cost_of_equity * 100.0,
        rate.wacc * 100.0,
        rate.equity_weight
    );

    Ok(rate)
}
