use thiserror::Error;

/// Failures raised by the valuation pipeline.
///
/// Every stage checks its own preconditions and returns one of these instead of
/// producing a degenerate number. None of them are retriable: the engine does no I/O.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero: {0}")]
    Division(String),

    #[error("Invalid model parameter: {0}")]
    InvalidModelParameter(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Data source error: {0}")]
    Source(String),
}

/// Reject NaN and infinities before they leak into downstream arithmetic.
pub fn ensure_finite(value: f64, what: &str) -> Result<f64, ValuationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValuationError::InvalidData(format!("{} is not a finite number ({})", what, value)))
    }
}
