use chrono::NaiveDate;
use valuation_core::ValuationReport;

const MILLION: f64 = 1e6;

fn millions(values: impl Iterator<Item = f64>) -> String {
    let formatted: Vec<String> = values.map(|v| format!("{:.1}", v / MILLION)).collect();
    format!("[{}]", formatted.join(", "))
}

fn percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Components the engine could not derive are NaN
fn derived(value: f64, format: impl Fn(f64) -> String) -> String {
    if value.is_finite() {
        format(value)
    } else {
        "n/a".to_string()
    }
}

/// Plain-text sanity-check sheet: inputs, every intermediate, and the result.
/// Amounts are shown in millions.
pub fn render(report: &ValuationReport, as_of: NaiveDate) -> String {
    let historicals = report.historicals.periods();
    let forecast = report.forecast.periods();
    let rate = &report.discount_rate;
    let capital = &report.capital_structure;
    let result = report.result();

    let labels: Vec<&str> = historicals.iter().map(|p| p.period_label.as_str()).collect();
    let wacc_note = if rate.overridden { " (manual override)" } else { "" };

    let lines = vec![
        format!("{} - Intrinsic Value Calculation as of {}", report.company, as_of),
        String::new(),
        format!("Periods: {}", labels.join(", ")),
        format!("Past Revenue (M): {}", millions(historicals.iter().map(|p| p.revenue))),
        format!("Past EBIT (M): {}", millions(historicals.iter().map(|p| p.ebit))),
        format!("Revenue CAGR: {}", percent(report.growth.revenue_cagr)),
        format!("Average EBIT Margin: {}", percent(report.growth.avg_ebit_margin)),
        String::new(),
        format!(
            "Forecast Revenue (M), {} years + terminal: {}",
            report.forecast.horizon(),
            millions(forecast.iter().map(|p| p.revenue_forecast))
        ),
        format!("Forecast EBIT (M): {}", millions(forecast.iter().map(|p| p.ebit_forecast))),
        format!("Long-Term Growth: {}", percent(report.long_term_growth)),
        String::new(),
        format!("Risk-Free Rate: {}", percent(rate.risk_free_rate)),
        format!("Equity Beta: {}", derived(rate.equity_beta, |b| format!("{:.2}", b))),
        format!("Cost of Equity: {}", derived(rate.cost_of_equity, percent)),
        format!(
            "After-Tax Cost of Debt: {}",
            percent(rate.cost_of_debt * (1.0 - rate.tax_rate))
        ),
        format!(
            "Equity / Debt Weights: {} / {}",
            derived(rate.equity_weight, |w| format!("{:.3}", w)),
            derived(rate.debt_weight, |w| format!("{:.3}", w))
        ),
        format!("Weighted Average Cost of Capital (WACC): {}{}", percent(rate.wacc), wacc_note),
        String::new(),
        format!(
            "Discounted EBIT (M): {}",
            millions(report.dcf.discounted.iter().map(|p| p.present_value))
        ),
        format!("Terminal Value (M): {:.1}", report.dcf.terminal_value / MILLION),
        format!("PV of Terminal Value (M): {:.1}", report.dcf.pv_terminal_value / MILLION),
        format!("Enterprise Value (M): {:.1}", result.enterprise_value / MILLION),
        format!("Net Debt (M): {:.1}", capital.net_debt / MILLION),
        format!("Equity Value (M): {:.1}", result.equity_value / MILLION),
        format!("Market Cap (M): {:.1}", capital.market_cap / MILLION),
        format!("Shares Outstanding (M): {:.1}", capital.shares_outstanding / MILLION),
        String::new(),
        format!(
            "Intrinsic value of each share of {}: {:.2}",
            report.company, result.intrinsic_value_per_share
        ),
    ];

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundamental_analysis::ValuationEngine;
    use valuation_core::{
        AlignedPrices, CapitalStructure, DiscountRate, FinancialPeriod, HistoricalFinancials, ValuationConfig,
    };

    fn report(wacc_override: Option<f64>) -> ValuationReport {
        let date = |y: i32| NaiveDate::from_ymd_opt(y, 12, 31).unwrap();
        let historicals = HistoricalFinancials::new(vec![
            FinancialPeriod::new("12/31/2018", date(2018), 100e6, 20e6),
            FinancialPeriod::new("12/31/2019", date(2019), 110e6, 22e6),
        ])
        .unwrap();
        let capital = CapitalStructure::new(1_000e6, 200e6, 50e6).unwrap();
        let prices = AlignedPrices::new(vec![10.0, 10.2, 10.1, 10.4], vec![100.0, 101.0, 100.5, 102.0]).unwrap();

        let mut config = ValuationConfig::for_company("ACME");
        config.wacc_override = wacc_override;
        ValuationEngine::new(config)
            .unwrap()
            .valuate_detailed(&historicals, &capital, &prices, 0.01)
            .unwrap()
    }

    #[test]
    fn test_render_contains_key_lines() {
        let report = report(None);
        let text = render(&report, NaiveDate::from_ymd_opt(2020, 12, 11).unwrap());

        assert!(text.starts_with("ACME - Intrinsic Value Calculation as of 2020-12-11"));
        assert!(text.contains("Past Revenue (M): [100.0, 110.0]"));
        assert!(text.contains("Revenue CAGR: 10.00%"));
        assert!(text.contains("Average EBIT Margin: 20.00%"));
        assert!(text.contains("Forecast Revenue (M), 5 years + terminal: [121.0, "));
        assert!(!text.contains("manual override"));

        let per_share = format!("{:.2}", report.result().intrinsic_value_per_share);
        assert!(text.ends_with(&format!("Intrinsic value of each share of ACME: {}", per_share)));
    }

    #[test]
    fn test_render_marks_underivable_components() {
        let mut report = report(Some(0.12));
        report.discount_rate = DiscountRate::manual(0.12, 0.01, 0.0525, 0.01, 0.3);
        let text = render(&report, NaiveDate::from_ymd_opt(2020, 12, 11).unwrap());

        assert!(text.contains("Equity Beta: n/a"));
        assert!(text.contains("Cost of Equity: n/a"));
        assert!(text.contains("Equity / Debt Weights: n/a / n/a"));
        assert!(!text.contains("NaN"));
    }

    #[test]
    fn test_render_flags_override() {
        let text = render(&report(Some(0.12)), NaiveDate::from_ymd_opt(2020, 12, 11).unwrap());
        assert!(text.contains("Weighted Average Cost of Capital (WACC): 12.00% (manual override)"));
    }
}
