use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ensure_finite, ValuationError};

/// One reporting period of the income statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    pub period_label: String,
    pub period_end: NaiveDate,
    pub revenue: f64,
    pub ebit: f64,
}

impl FinancialPeriod {
    pub fn new(period_label: impl Into<String>, period_end: NaiveDate, revenue: f64, ebit: f64) -> Self {
        Self {
            period_label: period_label.into(),
            period_end,
            revenue,
            ebit,
        }
    }

    /// EBIT / revenue for this period
    pub fn ebit_margin(&self) -> Result<f64, ValuationError> {
        if self.revenue == 0.0 {
            return Err(ValuationError::Division(format!(
                "period {} has zero revenue",
                self.period_label
            )));
        }
        Ok(self.ebit / self.revenue)
    }
}

/// Historical revenue/EBIT series, sorted ascending by period end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HistoricalFinancials {
    periods: Vec<FinancialPeriod>,
}

impl HistoricalFinancials {
    /// Builds the series, sorting periods chronologically.
    /// Duplicate period ends and non-finite amounts are rejected.
    pub fn new(mut periods: Vec<FinancialPeriod>) -> Result<Self, ValuationError> {
        for period in &periods {
            ensure_finite(period.revenue, &format!("revenue of {}", period.period_label))?;
            ensure_finite(period.ebit, &format!("EBIT of {}", period.period_label))?;
        }

        periods.sort_by_key(|p| p.period_end);

        if let Some(pair) = periods.windows(2).find(|w| w[0].period_end == w[1].period_end) {
            return Err(ValuationError::InvalidData(format!(
                "periods {} and {} share the same period end {}",
                pair[0].period_label, pair[1].period_label, pair[0].period_end
            )));
        }

        Ok(Self { periods })
    }

    pub fn periods(&self) -> &[FinancialPeriod] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn earliest(&self) -> Option<&FinancialPeriod> {
        self.periods.first()
    }

    pub fn latest(&self) -> Option<&FinancialPeriod> {
        self.periods.last()
    }
}

/// Where the EBIT figure of a statement row came from.
///
/// Some statements do not report EBIT; pretax income with interest expense
/// added back stands in for it. Resolution happens in the data collaborator so
/// the engine only ever sees a plain EBIT number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum OperatingEarnings {
    Ebit {
        value: f64,
    },
    PretaxIncome {
        pretax_income: f64,
        /// Interest cost as a positive amount
        #[serde(default)]
        interest_expense: f64,
    },
}

impl OperatingEarnings {
    pub fn ebit(&self) -> f64 {
        match *self {
            OperatingEarnings::Ebit { value } => value,
            OperatingEarnings::PretaxIncome {
                pretax_income,
                interest_expense,
            } => pretax_income + interest_expense,
        }
    }
}

/// Reported net debt, or total debt minus cash when the balance sheet lacks the line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum NetDebtSource {
    Reported {
        value: f64,
    },
    Derived {
        total_debt: f64,
        cash_and_equivalents: f64,
    },
}

impl NetDebtSource {
    pub fn net_debt(&self) -> f64 {
        match *self {
            NetDebtSource::Reported { value } => value,
            NetDebtSource::Derived {
                total_debt,
                cash_and_equivalents,
            } => total_debt - cash_and_equivalents,
        }
    }
}

/// Market snapshot used for WACC weights and the per-share division
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalStructure {
    pub market_cap: f64,
    /// May be negative for a company holding more cash than debt
    pub net_debt: f64,
    pub shares_outstanding: f64,
}

impl CapitalStructure {
    pub fn new(market_cap: f64, net_debt: f64, shares_outstanding: f64) -> Result<Self, ValuationError> {
        Ok(Self {
            market_cap: ensure_finite(market_cap, "market cap")?,
            net_debt: ensure_finite(net_debt, "net debt")?,
            shares_outstanding: ensure_finite(shares_outstanding, "shares outstanding")?,
        })
    }

    pub fn from_sources(
        market_cap: f64,
        net_debt: NetDebtSource,
        shares_outstanding: f64,
    ) -> Result<Self, ValuationError> {
        Self::new(market_cap, net_debt.net_debt(), shares_outstanding)
    }

    /// Market cap + net debt; the denominator of both WACC weights
    pub fn financing_value(&self) -> f64 {
        self.market_cap + self.net_debt
    }
}

/// Daily closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Subject and benchmark closes over the same trading days, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPrices {
    subject: Vec<f64>,
    benchmark: Vec<f64>,
}

impl AlignedPrices {
    pub fn new(subject: Vec<f64>, benchmark: Vec<f64>) -> Result<Self, ValuationError> {
        if subject.len() != benchmark.len() {
            return Err(ValuationError::InvalidData(format!(
                "price series are not aligned: {} subject closes vs {} benchmark closes",
                subject.len(),
                benchmark.len()
            )));
        }
        for close in subject.iter().chain(benchmark.iter()) {
            ensure_finite(*close, "closing price")?;
        }
        Ok(Self { subject, benchmark })
    }

    /// Inner-joins the two dated series on date, keeping only days inside
    /// `[as_of - lookback_days, as_of]`.
    pub fn from_dated(
        subject: &[PricePoint],
        benchmark: &[PricePoint],
        as_of: NaiveDate,
        lookback_days: u32,
    ) -> Result<Self, ValuationError> {
        let start = as_of - Duration::days(i64::from(lookback_days));
        let in_window = |d: NaiveDate| d >= start && d <= as_of;

        let benchmark_by_date: HashMap<NaiveDate, f64> = benchmark
            .iter()
            .filter(|p| in_window(p.date))
            .map(|p| (p.date, p.close))
            .collect();

        let mut joined: Vec<(NaiveDate, f64, f64)> = subject
            .iter()
            .filter(|p| in_window(p.date))
            .filter_map(|p| benchmark_by_date.get(&p.date).map(|b| (p.date, p.close, *b)))
            .collect();
        joined.sort_by_key(|(date, _, _)| *date);
        joined.dedup_by_key(|(date, _, _)| *date);

        if joined.len() < 3 {
            return Err(ValuationError::InsufficientData(format!(
                "only {} common trading days between {} and {}",
                joined.len(),
                start,
                as_of
            )));
        }

        let (subject, benchmark): (Vec<f64>, Vec<f64>) = joined.into_iter().map(|(_, s, b)| (s, b)).unzip();
        Self::new(subject, benchmark)
    }

    pub fn subject(&self) -> &[f64] {
        &self.subject
    }

    pub fn benchmark(&self) -> &[f64] {
        &self.benchmark
    }

    pub fn len(&self) -> usize {
        self.subject.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subject.is_empty()
    }
}

/// Growth statistics derived once from a historical snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthProfile {
    pub revenue_cagr: f64,
    /// Unweighted mean of per-period EBIT margins
    pub avg_ebit_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    /// 1-based; `horizon + 1` is the terminal period
    pub period_index: usize,
    pub revenue_forecast: f64,
    pub ebit_forecast: f64,
}

/// N ordinary forecast years followed by one terminal (steady-state) year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastSeries {
    horizon: usize,
    periods: Vec<ForecastPeriod>,
}

impl ForecastSeries {
    pub fn new(horizon: usize, periods: Vec<ForecastPeriod>) -> Result<Self, ValuationError> {
        if horizon == 0 {
            return Err(ValuationError::InvalidModelParameter(
                "forecast horizon must be at least 1 year".to_string(),
            ));
        }
        if periods.len() != horizon + 1 {
            return Err(ValuationError::InvalidData(format!(
                "forecast with horizon {} needs {} periods, got {}",
                horizon,
                horizon + 1,
                periods.len()
            )));
        }
        for (i, period) in periods.iter().enumerate() {
            if period.period_index != i + 1 {
                return Err(ValuationError::InvalidData(format!(
                    "forecast period at position {} has index {}",
                    i + 1,
                    period.period_index
                )));
            }
            ensure_finite(period.ebit_forecast, "EBIT forecast")?;
        }
        Ok(Self { horizon, periods })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn periods(&self) -> &[ForecastPeriod] {
        &self.periods
    }

    /// Years 1..=N
    pub fn ordinary(&self) -> &[ForecastPeriod] {
        &self.periods[..self.horizon]
    }

    /// Year N+1, fed into the perpetuity formula
    pub fn terminal(&self) -> &ForecastPeriod {
        &self.periods[self.horizon]
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Discount rate and the components it was built from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountRate {
    pub risk_free_rate: f64,
    pub equity_beta: f64,
    pub market_risk_premium: f64,
    pub cost_of_equity: f64,
    pub cost_of_debt: f64,
    pub tax_rate: f64,
    pub equity_weight: f64,
    pub debt_weight: f64,
    pub wacc: f64,
    /// True when `wacc` came from the configured override rather than the formula
    #[serde(default)]
    pub overridden: bool,
}

impl DiscountRate {
    /// Rate built from an override alone, when beta or the capital weights could
    /// not be derived. The derived components are NaN (serialized as null).
    pub fn manual(wacc: f64, risk_free_rate: f64, market_risk_premium: f64, cost_of_debt: f64, tax_rate: f64) -> Self {
        Self {
            risk_free_rate,
            equity_beta: f64::NAN,
            market_risk_premium,
            cost_of_equity: f64::NAN,
            cost_of_debt,
            tax_rate,
            equity_weight: f64::NAN,
            debt_weight: f64::NAN,
            wacc,
            overridden: true,
        }
    }

    /// Whether beta, cost of equity and the weights were actually computed
    pub fn is_derived(&self) -> bool {
        self.equity_beta.is_finite() && self.equity_weight.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountedPeriod {
    pub period_index: usize,
    pub ebit_forecast: f64,
    pub discount_factor: f64,
    pub present_value: f64,
}

/// Terminal output of a valuation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub intrinsic_value_per_share: f64,
}

/// Output of the DCF aggregation with its intermediate values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DcfValuation {
    pub discounted: Vec<DiscountedPeriod>,
    pub terminal_value: f64,
    pub pv_terminal_value: f64,
    pub result: ValuationResult,
}

/// Everything a valuation run computed, for sanity-checking a result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    pub company: String,
    pub historicals: HistoricalFinancials,
    pub growth: GrowthProfile,
    pub long_term_growth: f64,
    pub forecast: ForecastSeries,
    pub capital_structure: CapitalStructure,
    pub discount_rate: DiscountRate,
    pub dcf: DcfValuation,
}

impl ValuationReport {
    pub fn result(&self) -> ValuationResult {
        self.dcf.result
    }
}
