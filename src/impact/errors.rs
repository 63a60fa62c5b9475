//! Errors for the causal-impact engine (series validation, window and
//! configuration checks, model-fit failures, and forecast invariants).
//!
//! This module defines the engine error type, [`ImpactError`], used across the
//! Rust core and the Python-facing API. It implements `Display`/`Error` and
//! converts to `PyErr` when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** and refer to positions in the validated series.
//! - Values must be **finite**; timestamps must be **strictly increasing**.
//! - The engine never repairs invalid input: every violated precondition is
//!   reported with its offending values and nothing is silently defaulted.
//! - Optimizer/backend errors are normalized to
//!   [`ImpactError::OptimizationFailed`] with a human-readable status;
//!   termination without meeting a convergence criterion is the distinct
//!   [`ImpactError::ModelDivergence`].
use crate::optimization::errors::OptError;
#[cfg(feature = "python-bindings")]
use pyo3::exceptions::PyValueError;
#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

/// Crate-wide result alias for engine operations that may produce
/// [`ImpactError`].
pub type ImpactResult<T> = Result<T, ImpactError>;

/// Unified error type for causal-impact analysis.
///
/// Covers input/series validation, window and configuration checks, model
/// fitting, and counterfactual forecasting. Implements `Display`/`Error` and
/// converts to a Python `ValueError` at PyO3 boundaries.
#[derive(Debug, Clone, PartialEq)]
pub enum ImpactError {
    // ---- Series validation ----
    /// Series is empty.
    EmptySeries,

    /// Timestamp and value columns differ in length.
    LengthMismatch { timestamps: usize, values: usize },

    /// A value is NaN/±inf.
    NonFiniteValue { index: usize, value: f64 },

    /// Timestamps must be strictly increasing (no duplicates).
    NonIncreasingTimestamp { index: usize, previous: i64, current: i64 },

    // ---- Window / configuration validation ----
    /// Period start must not exceed period end.
    InvalidPeriod { start: i64, end: i64 },

    /// Post-period must start strictly after the pre-period ends.
    PeriodsOverlap { pre_end: i64, post_start: i64 },

    /// A window selects no observations from the series.
    EmptyWindow { window: &'static str, start: i64, end: i64 },

    /// Confidence level must lie strictly inside (0, 1).
    InvalidConfidenceLevel { value: f64 },

    /// Significance threshold must lie strictly inside (0, 1).
    InvalidSignificanceThreshold { value: f64 },

    /// Seasonal period must be at least 2.
    InvalidSeasonalPeriod { period: usize },

    /// Minimum pre-period length must be at least 3.
    InvalidMinPreLength { value: usize },

    /// Diffuse prior scale must be finite and > 0.
    InvalidDiffuseScale { value: f64 },

    /// Variance guards must be finite with 0 < min < max.
    InvalidVarianceGuards { min: f64, max: f64, reason: &'static str },

    // ---- Model fitting ----
    /// A window is too short for estimation.
    InsufficientData { window: &'static str, observed: usize, required: usize },

    /// Pre-period has zero variance; no meaningful counterfactual exists.
    DegenerateSeries { value: f64, observations: usize },

    /// The optimizer terminated without meeting a convergence criterion.
    ModelDivergence { status: String, iterations: usize },

    /// Optimizer failed at runtime; includes a human-readable status.
    OptimizationFailed { status: String },

    // ---- Forecasting / estimation ----
    /// Forward propagation produced a non-finite point or variance.
    NonFiniteForecast { step: usize, value: f64 },

    /// A forecast was paired with a window of a different length.
    ForecastMisaligned { expected: usize, actual: usize },
}

impl std::error::Error for ImpactError {}

impl std::fmt::Display for ImpactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Series validation ----
            ImpactError::EmptySeries => {
                write!(f, "Input series is empty.")
            }
            ImpactError::LengthMismatch { timestamps, values } => {
                write!(f, "Timestamp column ({timestamps}) and value column ({values}) differ in length.")
            }
            ImpactError::NonFiniteValue { index, value } => {
                write!(f, "Value at index {index} is non-finite: {value}")
            }
            ImpactError::NonIncreasingTimestamp { index, previous, current } => {
                write!(
                    f,
                    "Timestamps must be strictly increasing; index {index} has {current} after {previous}."
                )
            }
            // ---- Window / configuration validation ----
            ImpactError::InvalidPeriod { start, end } => {
                write!(f, "Period start ({start}) must not exceed period end ({end}).")
            }
            ImpactError::PeriodsOverlap { pre_end, post_start } => {
                write!(
                    f,
                    "Post-period must start strictly after the pre-period ends; got pre end {pre_end}, post start {post_start}."
                )
            }
            ImpactError::EmptyWindow { window, start, end } => {
                write!(f, "The {window} window [{start}, {end}] selects no observations.")
            }
            ImpactError::InvalidConfidenceLevel { value } => {
                write!(f, "Confidence level must lie strictly inside (0, 1); got: {value}")
            }
            ImpactError::InvalidSignificanceThreshold { value } => {
                write!(f, "Significance threshold must lie strictly inside (0, 1); got: {value}")
            }
            ImpactError::InvalidSeasonalPeriod { period } => {
                write!(f, "Seasonal period must be at least 2; got: {period}")
            }
            ImpactError::InvalidMinPreLength { value } => {
                write!(f, "Minimum pre-period length must be at least 3; got: {value}")
            }
            ImpactError::InvalidDiffuseScale { value } => {
                write!(f, "Diffuse prior scale must be finite and > 0; got: {value}")
            }
            ImpactError::InvalidVarianceGuards { min, max, reason } => {
                write!(f, "Variance guards must be finite with 0 < min ({min}) < max ({max}); {reason}")
            }
            // ---- Model fitting ----
            ImpactError::InsufficientData { window, observed, required } => {
                write!(
                    f,
                    "The {window} window has {observed} observations but at least {required} are required."
                )
            }
            ImpactError::DegenerateSeries { value, observations } => {
                write!(
                    f,
                    "Pre-period is constant at {value} over {observations} observations; a zero-variance series has no meaningful counterfactual."
                )
            }
            ImpactError::ModelDivergence { status, iterations } => {
                write!(
                    f,
                    "Model fit did not converge after {iterations} iterations (status: {status})."
                )
            }
            ImpactError::OptimizationFailed { status } => {
                write!(f, "Optimizer failed with status: {status}")
            }
            // ---- Forecasting / estimation ----
            ImpactError::NonFiniteForecast { step, value } => {
                write!(f, "Forecast step {step} produced a non-finite quantity: {value}")
            }
            ImpactError::ForecastMisaligned { expected, actual } => {
                write!(
                    f,
                    "Forecast length ({actual}) does not match the post-period window ({expected})."
                )
            }
        }
    }
}

/// Normalize optimizer-layer failures into the engine error type.
///
/// Convergence-status handling lives in the model layer; everything that
/// reaches this conversion is a runtime optimizer failure.
impl From<OptError> for ImpactError {
    fn from(err: OptError) -> ImpactError {
        ImpactError::OptimizationFailed { status: err.to_string() }
    }
}

/// Convert an [`ImpactError`] into a Python `ValueError` with the error
/// message. Used at the Rust↔Python boundary to surface domain errors cleanly.
#[cfg(feature = "python-bindings")]
impl From<ImpactError> for PyErr {
    fn from(err: ImpactError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
