//! Revenue and EBIT projection over the explicit horizon plus one terminal year.

use valuation_core::{ensure_finite, ForecastPeriod, ForecastSeries, GrowthProfile, ValuationError};

/// Projects `horizon` ordinary years at the historical CAGR, then one terminal year.
///
/// The terminal year compounds the last ordinary year's revenue by one more
/// application of `(1 + long_term_growth)`, so it is the first steady-state year
/// used by the perpetuity formula. EBIT is revenue times the average margin for
/// every period, the terminal one included.
pub fn project(
    revenue_latest: f64,
    growth: &GrowthProfile,
    long_term_growth: f64,
    horizon: usize,
) -> Result<ForecastSeries, ValuationError> {
    ensure_finite(revenue_latest, "latest revenue")?;
    ensure_finite(growth.revenue_cagr, "revenue CAGR")?;
    ensure_finite(growth.avg_ebit_margin, "average EBIT margin")?;
    ensure_finite(long_term_growth, "long-term growth")?;

    if horizon == 0 {
        return Err(ValuationError::InvalidModelParameter(
            "forecast horizon must be at least 1 year".to_string(),
        ));
    }
    let last_year = i32::try_from(horizon).map_err(|_| {
        ValuationError::InvalidModelParameter(format!("forecast horizon {} is too long", horizon))
    })?;

    let growth_factor = 1.0 + growth.revenue_cagr;
    let period = |period_index: usize, revenue_forecast: f64| ForecastPeriod {
        period_index,
        revenue_forecast,
        ebit_forecast: revenue_forecast * growth.avg_ebit_margin,
    };

    let mut periods: Vec<ForecastPeriod> = (1..=last_year)
        .map(|year| period(year as usize, revenue_latest * growth_factor.powi(year)))
        .collect();

    let terminal_revenue = revenue_latest * growth_factor.powi(last_year) * (1.0 + long_term_growth);
    periods.push(period(horizon + 1, terminal_revenue));

    tracing::debug!(
        "Forecast {} years from revenue {:.0}: terminal revenue {:.0}, terminal EBIT {:.0}",
        horizon,
        revenue_latest,
        terminal_revenue,
        terminal_revenue * growth.avg_ebit_margin
    );

    ForecastSeries::new(horizon, periods)
}
