//! Revenue CAGR and average EBIT margin from the historical series.

use statrs::statistics::Statistics;
use valuation_core::{FinancialPeriod, GrowthProfile, HistoricalFinancials, ValuationError};

/// Every period needs positive revenue. Zero anywhere is a division error and
/// takes precedence over a negative figure.
fn check_revenues(periods: &[FinancialPeriod]) -> Result<(), ValuationError> {
    if let Some(period) = periods.iter().find(|p| p.revenue == 0.0) {
        return Err(ValuationError::Division(format!(
            "period {} has zero revenue",
            period.period_label
        )));
    }
    if let Some(period) = periods.iter().find(|p| p.revenue < 0.0) {
        return Err(ValuationError::InvalidData(format!(
            "period {} has negative revenue {}",
            period.period_label, period.revenue
        )));
    }
    Ok(())
}

/// `(latest / earliest)^(1 / (periods - 1)) - 1` over chronologically ordered periods.
pub fn revenue_cagr(periods: &[FinancialPeriod]) -> Result<f64, ValuationError> {
    let (earliest, latest) = match (periods.first(), periods.last()) {
        (Some(earliest), Some(latest)) if periods.len() >= 2 => (earliest, latest),
        _ => {
            return Err(ValuationError::InsufficientData(format!(
                "revenue CAGR needs at least 2 periods, got {}",
                periods.len()
            )))
        }
    };

    check_revenues(periods)?;

    let years = (periods.len() - 1) as f64;
    Ok((latest.revenue / earliest.revenue).powf(1.0 / years) - 1.0)
}

/// Unweighted mean of EBIT / revenue. Period order does not matter.
pub fn average_ebit_margin(periods: &[FinancialPeriod]) -> Result<f64, ValuationError> {
    if periods.is_empty() {
        return Err(ValuationError::InsufficientData(
            "average EBIT margin needs at least 1 period".to_string(),
        ));
    }
    check_revenues(periods)?;

    let margins = periods
        .iter()
        .map(FinancialPeriod::ebit_margin)
        .collect::<Result<Vec<f64>, _>>()?;

    Ok(margins.mean())
}

pub fn estimate_growth(historicals: &HistoricalFinancials) -> Result<GrowthProfile, ValuationError> {
    let periods = historicals.periods();
    let profile = GrowthProfile {
        revenue_cagr: revenue_cagr(periods)?,
        avg_ebit_margin: average_ebit_margin(periods)?,
    };

    tracing::debug!(
        "Growth over {} periods: CAGR {:.2}%, avg EBIT margin {:.2}%",
        periods.len(),
        profile.revenue_cagr * 100.0,
        profile.avg_ebit_margin * 100.0
    );

    Ok(profile)
}
