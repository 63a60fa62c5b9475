//! Counterfactual forecasting: propagate the fitted state through the
//! post-intervention window.
//!
//! Purpose
//! -------
//! Produce the predictive distribution of what the series would have been
//! absent intervention. The fitted state at the end of the pre-period is
//! pushed forward one step at a time with **no data updates** — this is a
//! genuine forecast, not a filtered estimate — so the predictive variance
//! accumulates additively through the state-noise matrix.
//!
//! Key behaviors
//! -------------
//! - One predict-then-emit step per post-period timestamp: `a ← T a`,
//!   `P ← T P Tᵀ + Q`, point `Z a`, variance `Z P Zᵀ + σ²_obs`.
//! - Observations recorded between the two windows (a non-contiguous pre /
//!   post split) advance the state silently so the forecast stays aligned
//!   with the post-period timestamps.
//! - The quadratic-form part of the variance is clamped at ≥ 0 against
//!   accumulated floating rounding; a non-finite point or variance fails
//!   with a typed error instead of propagating NaNs downstream.
//!
//! Invariants & assumptions
//! ------------------------
//! - `lower ≤ point ≤ upper` for every forecasted timestamp.
//! - The predictive variance is non-decreasing for the supported model
//!   structures (no data updates ever remove uncertainty).
use crate::impact::core::{
    kalman::system_matrices,
    period::AnalysisWindows,
    series::TimeSeries,
};
use crate::impact::errors::{ImpactError, ImpactResult};
use crate::impact::models::local_level::FittedModel;
use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, Normal};

/// `CounterfactualForecast` — predictive distribution over the post-period.
///
/// Purpose
/// -------
/// Hold, for every post-period timestamp, the counterfactual point
/// estimate, its interval at the configured confidence level, and the raw
/// predictive variance. The variance is kept alongside the bounds so the
/// effect estimator can sum variances (not bounds) when building
/// cumulative intervals.
///
/// Invariants
/// ----------
/// - All series share the post-period length and ordering.
/// - `lower[i] ≤ point[i] ≤ upper[i]` and `variance[i] ≥ 0` for every `i`.
/// - Owned by the forecaster; consumed read-only by the effect estimator.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterfactualForecast {
    /// Post-period observation times, in series order.
    pub timestamps: Vec<i64>,
    /// Counterfactual point estimates.
    pub point: Array1<f64>,
    /// Lower interval bounds at `confidence_level`.
    pub lower: Array1<f64>,
    /// Upper interval bounds at `confidence_level`.
    pub upper: Array1<f64>,
    /// Predictive variances (observation noise included).
    pub variance: Array1<f64>,
    /// Interval coverage the bounds were computed for.
    pub confidence_level: f64,
    /// Standard-normal quantile matching `confidence_level`.
    pub z_score: f64,
}

/// Two-sided standard-normal quantile for a central interval of the given
/// coverage.
pub fn interval_z_score(confidence_level: f64) -> f64 {
    let standard_normal = Normal::new(0.0, 1.0).expect("standard normal parameters");
    standard_normal.inverse_cdf(0.5 + confidence_level / 2.0)
}

/// Propagate a fitted model through the post-period window.
///
/// Parameters
/// ----------
/// - `model`: fitted pre-period model (state launch point + variances).
/// - `series`: the full analysis series; only post-period timestamps are
///   read, plus the window geometry needed to measure the pre/post gap.
/// - `windows`: validated pre/post pair the model was fitted against.
/// - `confidence_level`: interval coverage in (0, 1), validated upstream.
///
/// Returns
/// -------
/// `ImpactResult<CounterfactualForecast>` covering every observation in the
/// post-period window.
///
/// Errors
/// ------
/// - [`ImpactError::InsufficientData`] when the post-period window selects
///   no observations.
/// - [`ImpactError::NonFiniteForecast`] when a propagated point or variance
///   stops being finite.
pub fn forecast(
    model: &FittedModel, series: &TimeSeries, windows: &AnalysisWindows, confidence_level: f64,
) -> ImpactResult<CounterfactualForecast> {
    let post_range = series.window_range(&windows.post);
    if post_range.is_empty() {
        return Err(ImpactError::InsufficientData {
            window: "post-period",
            observed: 0,
            required: 1,
        });
    }
    let pre_range = series.window_range(&windows.pre);
    let gap = post_range.start - pre_range.end;

    let system = system_matrices(&model.spec, &model.params);
    let z_score = interval_z_score(confidence_level);

    let mut a = model.end_mean.clone();
    let mut p = model.end_cov.clone();

    // Observations excluded by a non-contiguous split still advance time.
    for _ in 0..gap {
        advance(&mut a, &mut p, &system.t, &system.q);
    }

    let horizon = post_range.len();
    let mut point = Array1::<f64>::zeros(horizon);
    let mut lower = Array1::<f64>::zeros(horizon);
    let mut upper = Array1::<f64>::zeros(horizon);
    let mut variance = Array1::<f64>::zeros(horizon);

    for step in 0..horizon {
        advance(&mut a, &mut p, &system.t, &system.q);
        let mean = system.z.dot(&a);
        let spread = system.z.dot(&p.dot(&system.z)).max(0.0) + system.h;
        if !mean.is_finite() {
            return Err(ImpactError::NonFiniteForecast { step, value: mean });
        }
        if !spread.is_finite() {
            return Err(ImpactError::NonFiniteForecast { step, value: spread });
        }
        let half_width = z_score * spread.sqrt();
        point[step] = mean;
        lower[step] = mean - half_width;
        upper[step] = mean + half_width;
        variance[step] = spread;
    }

    Ok(CounterfactualForecast {
        timestamps: series.timestamps[post_range].to_vec(),
        point,
        lower,
        upper,
        variance,
        confidence_level,
        z_score,
    })
}

/// One time update: `a ← T a`, `P ← T P Tᵀ + Q`, re-symmetrized.
fn advance(a: &mut Array1<f64>, p: &mut Array2<f64>, t: &Array2<f64>, q: &Array2<f64>) {
    *a = t.dot(a);
    let propagated = t.dot(p).dot(&t.t()) + q;
    let transposed = propagated.t().to_owned();
    *p = (&propagated + &transposed) * 0.5;
}
