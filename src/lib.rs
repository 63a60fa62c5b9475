//! causal-impact — structural time-series causal inference with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the causal-impact engine to Python via the `_causal_impact`
//! extension module. When the `python-bindings` feature is enabled, this
//! module defines the Python-facing class used by the `causal_impact`
//! package.
//!
//! Key behaviors
//! -------------
//! - Re-export the core Rust modules (`impact` and `optimization`) as the
//!   public crate surface.
//! - Define the `#[pyclass]` wrapper and the `#[pymodule]` initializer for
//!   the `_causal_impact` Python extension.
//!
//! Invariants & assumptions
//! ------------------------
//! - All heavy numerical work is implemented in the inner Rust modules; this
//!   file performs only FFI glue, input validation, and error mapping.
//! - On successful conversion from Python objects to Rust types, the
//!   invariants documented in the core modules are assumed to hold.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as rich error types
//!   internally and converted to `PyErr` values at the PyO3 boundary.
//! - Series getters copy into Python-owned lists; the analysis itself runs
//!   once, eagerly, at construction time.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend directly on [`impact::run_analysis`]
//!   and friends and can ignore the PyO3 items guarded by the
//!   `python-bindings` feature.
//! - External users interact with either the safe Rust APIs or the Python
//!   wrapper; the PyO3 plumbing is considered internal.

pub mod impact;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use pyo3::prelude::*;

#[cfg(feature = "python-bindings")]
use crate::{
    impact::{
        ImpactAnalysis, TextFormat,
        analysis::run_analysis,
        core::period::AnalysisWindows,
        render_text,
    },
    utils::{extract_options, extract_time_series},
};

/// CausalImpact — Python-facing wrapper for one causal-impact analysis.
///
/// Purpose
/// -------
/// Run the full engine (fit → counterfactual forecast → effect estimate →
/// report) from Python in one constructor call and expose the results as
/// plain Python values.
///
/// Key behaviors
/// -------------
/// - Validate and convert Python inputs (numpy arrays, pandas series, or
///   float sequences) into the crate's validated containers.
/// - Execute [`run_analysis`] eagerly and store the immutable
///   [`ImpactAnalysis`] internally.
/// - Expose the text formats via `summary()` / `report()` and the
///   plottable series via copy-on-access properties.
///
/// Parameters
/// ----------
/// Constructed from Python via
/// `CausalImpact(values, pre_start, pre_end, post_start, post_end, /,
/// timestamps=None, confidence_level=0.95, trend=False,
/// seasonal_period=None, min_pre_period_length=10,
/// significance_threshold=0.05)`:
/// - `values`: 1-D array-like of finite floats.
/// - `pre_start` … `post_end`: inclusive window bounds, in the same units
///   as `timestamps` (or indices when `timestamps` is omitted).
/// - `timestamps`: optional strictly increasing integer timestamps.
/// - Remaining keywords mirror the engine configuration surface.
///
/// Invariants
/// ----------
/// - `inner` is always a completed analysis; construction fails with
///   `ValueError` when any engine precondition is violated.
///
/// Notes
/// -----
/// - This type exists solely for the PyO3 binding surface; Rust callers
///   should use [`run_analysis`] directly.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "causal_impact")]
pub struct CausalImpact {
    /// Completed analysis artifacts.
    inner: ImpactAnalysis,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl CausalImpact {
    #[new]
    #[pyo3(
        signature = (
            values,
            pre_start,
            pre_end,
            post_start,
            post_end,
            timestamps = None,
            confidence_level = None,
            trend = None,
            seasonal_period = None,
            min_pre_period_length = None,
            significance_threshold = None,
        ),
        text_signature = "(values, pre_start, pre_end, post_start, post_end, /, \
                          timestamps=None, confidence_level=0.95, trend=False, \
                          seasonal_period=None, min_pre_period_length=10, \
                          significance_threshold=0.05)"
    )]
    #[allow(clippy::too_many_arguments)]
    pub fn new<'py>(
        py: Python<'py>, values: &Bound<'py, PyAny>, pre_start: i64, pre_end: i64, post_start: i64,
        post_end: i64, timestamps: Option<&Bound<'py, PyAny>>, confidence_level: Option<f64>,
        trend: Option<bool>, seasonal_period: Option<usize>, min_pre_period_length: Option<usize>,
        significance_threshold: Option<f64>,
    ) -> PyResult<Self> {
        let series = extract_time_series(py, values, timestamps)?;
        let windows = AnalysisWindows::from_bounds(pre_start, pre_end, post_start, post_end)?;
        let options = extract_options(
            confidence_level,
            trend,
            seasonal_period,
            min_pre_period_length,
            significance_threshold,
        )?;
        let inner = run_analysis(&series, &windows, &options)?;
        Ok(CausalImpact { inner })
    }

    /// Aligned-figure text summary of the effect estimate.
    pub fn summary(&self) -> String {
        render_text(&self.inner.report, TextFormat::Summary)
    }

    /// Natural-language narrative of the effect estimate.
    pub fn report(&self) -> String {
        render_text(&self.inner.report, TextFormat::Narrative)
    }

    #[getter]
    pub fn average_effect(&self) -> f64 {
        self.inner.report.summary.average_effect
    }

    #[getter]
    pub fn cumulative_effect(&self) -> f64 {
        self.inner.report.summary.cumulative_effect
    }

    #[getter]
    pub fn relative_effect(&self) -> f64 {
        self.inner.report.summary.relative_effect
    }

    #[getter]
    pub fn tail_probability(&self) -> f64 {
        self.inner.report.summary.tail_probability
    }

    #[getter]
    pub fn significant(&self) -> bool {
        self.inner.report.summary.significant
    }

    #[getter]
    pub fn timestamps(&self) -> Vec<i64> {
        self.inner.plot.timestamps.clone()
    }

    #[getter]
    pub fn intervention_time(&self) -> i64 {
        self.inner.plot.intervention_time
    }

    #[getter]
    pub fn observed(&self) -> Vec<f64> {
        self.inner.plot.observed.clone()
    }

    #[getter]
    pub fn counterfactual(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let band = &self.inner.plot.counterfactual;
        (band.point.clone(), band.lower.clone(), band.upper.clone())
    }

    #[getter]
    pub fn pointwise_effect(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let band = &self.inner.plot.pointwise;
        (band.point.clone(), band.lower.clone(), band.upper.clone())
    }

    #[getter]
    pub fn cumulative_effect_path(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let band = &self.inner.plot.cumulative;
        (band.point.clone(), band.lower.clone(), band.upper.clone())
    }
}

/// _causal_impact — PyO3 module initializer for the Python extension.
///
/// Invoked automatically by Python when importing the compiled extension;
/// the pure-Python `causal_impact` package wraps the class defined here.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _causal_impact<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<CausalImpact>()?;
    Ok(())
}
