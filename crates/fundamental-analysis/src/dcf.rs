//! Discounts the forecast EBIT and the perpetuity value back to today and
//! converts enterprise value into a per-share figure.
//!
//! Stages run strictly in order: discount years 1..=N, value the terminal
//! year as a growing perpetuity, then finalize (net out debt, divide by shares).

use valuation_core::{
    ensure_finite, CapitalStructure, DcfValuation, DiscountedPeriod, ForecastSeries, ValuationError,
    ValuationResult,
};

pub fn discount_cash_flows(
    forecast: &ForecastSeries,
    wacc: f64,
    long_term_growth: f64,
    capital: &CapitalStructure,
) -> Result<DcfValuation, ValuationError> {
    ensure_finite(wacc, "WACC")?;
    ensure_finite(long_term_growth, "long-term growth")?;

    if wacc <= long_term_growth {
        tracing::warn!(
            "Rejecting valuation: WACC {:.4} does not exceed long-term growth {:.4}",
            wacc,
            long_term_growth
        );
        return Err(ValuationError::InvalidModelParameter(format!(
            "WACC {} must exceed long-term growth {} for the perpetuity to be defined",
            wacc, long_term_growth
        )));
    }
    if wacc <= -1.0 {
        return Err(ValuationError::InvalidModelParameter(format!(
            "WACC {} leaves no positive discount factor",
            wacc
        )));
    }
    if capital.shares_outstanding <= 0.0 {
        return Err(ValuationError::Division(format!(
            "shares outstanding must be positive, got {}",
            capital.shares_outstanding
        )));
    }

    let horizon = i32::try_from(forecast.horizon()).map_err(|_| {
        ValuationError::InvalidModelParameter(format!("forecast horizon {} is too long", forecast.horizon()))
    })?;
    let growth_factor = 1.0 + wacc;

    // Discounting
    let discounted: Vec<DiscountedPeriod> = forecast
        .ordinary()
        .iter()
        .zip(1..=horizon)
        .map(|(period, year)| {
            let discount_factor = growth_factor.powi(year);
            DiscountedPeriod {
                period_index: period.period_index,
                ebit_forecast: period.ebit_forecast,
                discount_factor,
                present_value: period.ebit_forecast / discount_factor,
            }
        })
        .collect();

    // Terminal valuation
    let terminal_value = forecast.terminal().ebit_forecast / (wacc - long_term_growth);
    let pv_terminal_value = terminal_value / growth_factor.powi(horizon);

    // Finalize
    let enterprise_value = discounted.iter().map(|p| p.present_value).sum::<f64>() + pv_terminal_value;
    let equity_value = enterprise_value - capital.net_debt;
    let intrinsic_value_per_share = equity_value / capital.shares_outstanding;

    tracing::debug!(
        "Enterprise value {:.0} (terminal PV {:.0}), equity value {:.0}, {:.2} per share",
        enterprise_value,
        pv_terminal_value,
        equity_value,
        intrinsic_value_per_share
    );

    Ok(DcfValuation {
        discounted,
        terminal_value,
        pv_terminal_value,
        result: ValuationResult {
            enterprise_value: ensure_finite(enterprise_value, "enterprise value")?,
            equity_value,
            intrinsic_value_per_share: ensure_finite(intrinsic_value_per_share, "intrinsic value per share")?,
        },
    })
}
