//! Validated time-series container for causal-impact analysis.
//!
//! Purpose
//! -------
//! Provide the single, validated input container the engine operates on: an
//! ordered sequence of `(timestamp, value)` pairs. This module centralizes
//! input validation so downstream code (model fitting, forecasting, effect
//! estimation) can assume clean data.
//!
//! Key behaviors
//! -------------
//! - [`TimeSeries`] enforces the data invariants at construction time:
//!   non-empty, equal column lengths, finite values, strictly increasing
//!   timestamps.
//! - Window resolution ([`TimeSeries::window_range`]) maps an inclusive
//!   timestamp period onto the index range of covered observations.
//!
//! Invariants & assumptions
//! ------------------------
//! - Values must be **finite** (missing values are disallowed; callers
//!   pre-filter NaNs upstream).
//! - Timestamps must be **strictly increasing** — no duplicates.
//! - Regular or irregular spacing is accepted, but the model layer treats
//!   consecutive observations as one fixed time-step apart.
//!
//! Downstream usage
//! ----------------
//! - Construct [`TimeSeries`] at the boundary where prepared data enters the
//!   engine; every analysis entry point takes it by reference.
//! - Consumers may rely on the invariants above and skip re-validation.
use crate::impact::errors::{ImpactError, ImpactResult};
use crate::impact::core::period::Period;
use ndarray::Array1;
use std::ops::Range;

/// `TimeSeries` — validated univariate series with strictly increasing
/// timestamps.
///
/// Purpose
/// -------
/// Represent one prepared, evenly-typed input series for a causal-impact
/// run: integer timestamps (epoch seconds, day ordinals — any fixed
/// granularity) paired with finite observation values.
///
/// Fields
/// ------
/// - `timestamps`: `Vec<i64>`
///   Strictly increasing observation times at a single fixed granularity.
/// - `values`: `Array1<f64>`
///   Observed values; all finite, same length as `timestamps`.
///
/// Invariants
/// ----------
/// - `timestamps.len() == values.len() > 0`.
/// - `timestamps[i] < timestamps[i + 1]` for every consecutive pair.
/// - Every entry of `values` is finite.
///
/// Notes
/// -----
/// - The container performs no resampling or gap filling; regularization is
///   the responsibility of the upstream series preparer.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    /// Observation times, strictly increasing.
    pub timestamps: Vec<i64>,
    /// Observed values (finite).
    pub values: Array1<f64>,
}

impl TimeSeries {
    /// Construct a validated [`TimeSeries`] from raw columns.
    ///
    /// Parameters
    /// ----------
    /// - `timestamps`: observation times, strictly increasing.
    /// - `values`: observed values, finite, same length as `timestamps`.
    ///
    /// Returns
    /// -------
    /// `ImpactResult<TimeSeries>`
    ///   - `Ok(series)` when all invariants hold.
    ///   - `Err(ImpactError)` naming the first violated precondition.
    ///
    /// Errors
    /// ------
    /// - [`ImpactError::EmptySeries`] when no observations are provided.
    /// - [`ImpactError::LengthMismatch`] when the columns differ in length.
    /// - [`ImpactError::NonFiniteValue`] at the first NaN/±inf value.
    /// - [`ImpactError::NonIncreasingTimestamp`] at the first timestamp that
    ///   is not strictly greater than its predecessor.
    pub fn new(timestamps: Vec<i64>, values: Array1<f64>) -> ImpactResult<Self> {
        if timestamps.is_empty() && values.is_empty() {
            return Err(ImpactError::EmptySeries);
        }
        if timestamps.len() != values.len() {
            return Err(ImpactError::LengthMismatch {
                timestamps: timestamps.len(),
                values: values.len(),
            });
        }
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(ImpactError::NonFiniteValue { index, value });
            }
        }
        for index in 1..timestamps.len() {
            if timestamps[index] <= timestamps[index - 1] {
                return Err(ImpactError::NonIncreasingTimestamp {
                    index,
                    previous: timestamps[index - 1],
                    current: timestamps[index],
                });
            }
        }
        Ok(TimeSeries { timestamps, values })
    }

    /// Build a series over consecutive integer timestamps `0..n`.
    ///
    /// Convenience for index-based callers (and tests) that have no
    /// calendar attached to their observations.
    pub fn from_values(values: Array1<f64>) -> ImpactResult<Self> {
        let timestamps = (0..values.len() as i64).collect();
        TimeSeries::new(timestamps, values)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the series holds no observations. Construction rejects
    /// this state, so the method exists for API completeness.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Resolve an inclusive timestamp period to the index range of covered
    /// observations.
    ///
    /// Returns the half-open index range `[first, last + 1)` of observations
    /// with `period.start <= timestamp <= period.end`. The range is empty
    /// when no observation falls inside the period.
    pub fn window_range(&self, period: &Period) -> Range<usize> {
        let start = self.timestamps.partition_point(|&t| t < period.start);
        let end = self.timestamps.partition_point(|&t| t <= period.end);
        start..end
    }
}
