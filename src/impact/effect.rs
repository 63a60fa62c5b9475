//! Effect estimation: observed vs. counterfactual, pointwise and
//! cumulative, with a significance decision.
//!
//! Purpose
//! -------
//! Turn the counterfactual forecast into the quantities a causal-impact
//! report is made of: the pointwise effect series, the cumulative effect
//! series, and the summary scalars (average/cumulative absolute effect,
//! relative effect, tail probability, and the "effect detected" flag).
//!
//! Key behaviors
//! -------------
//! - Pointwise effect at `t` = `observed(t) − counterfactual_point(t)`;
//!   the bounds invert (`effect upper = observed − counterfactual lower`).
//! - Cumulative bounds come from the running **sum of predictive
//!   variances** — never from summing bounds — under an independence
//!   approximation across forecast steps (documented simplification: the
//!   forecast errors of a state-space model are positively correlated, so
//!   these bands are conservative-narrow).
//! - Relative effect guards the near-zero counterfactual denominator by
//!   reporting NaN instead of raising.
//! - Significance: two-sided Gaussian tail probability of the final
//!   cumulative effect; the threshold is configurable.
//!
//! Invariants & assumptions
//! ------------------------
//! - The cumulative effect at the last post-period timestamp equals the
//!   exact sum of the pointwise effects (same accumulation order, no
//!   re-derivation).
//! - `lower ≤ point ≤ upper` holds for every reported series entry.
use crate::impact::core::{options::ImpactOptions, period::AnalysisWindows, series::TimeSeries};
use crate::impact::errors::{ImpactError, ImpactResult};
use crate::impact::forecast::CounterfactualForecast;
use ndarray::{Array1, s};
use statrs::distribution::{ContinuousCDF, Normal};

/// Denominator magnitude below which the relative effect is reported as
/// undefined (NaN) rather than divided out.
const RELATIVE_EFFECT_DENOMINATOR_FLOOR: f64 = 1e-9;

/// One reported effect series: point estimates with interval bounds,
/// aligned to the post-period timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSeries {
    pub timestamps: Vec<i64>,
    pub point: Array1<f64>,
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
}

/// Summary scalars of one analysis run.
///
/// All effect figures are reported with their interval at the forecast's
/// confidence level; relative figures are percentages of the cumulative
/// counterfactual and are NaN when that denominator is ≈ 0.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSummary {
    /// Number of post-period observations the effect is measured over.
    pub post_observations: usize,
    /// Mean observed value over the post-period.
    pub average_observed: f64,
    /// Mean counterfactual point estimate over the post-period.
    pub average_counterfactual: f64,
    /// Mean pointwise effect, with bounds.
    pub average_effect: f64,
    pub average_effect_lower: f64,
    pub average_effect_upper: f64,
    /// Sum of observed values over the post-period.
    pub cumulative_observed: f64,
    /// Sum of counterfactual point estimates over the post-period.
    pub cumulative_counterfactual: f64,
    /// Cumulative effect at the final post-period timestamp, with bounds.
    pub cumulative_effect: f64,
    pub cumulative_effect_lower: f64,
    pub cumulative_effect_upper: f64,
    /// Relative effect in percent (NaN when the counterfactual sum is ≈ 0).
    pub relative_effect: f64,
    pub relative_effect_lower: f64,
    pub relative_effect_upper: f64,
    /// Two-sided tail probability of the final cumulative effect under the
    /// forecast distribution.
    pub tail_probability: f64,
    /// `tail_probability < significance_threshold`.
    pub significant: bool,
    /// Interval coverage the bounds were computed at.
    pub confidence_level: f64,
    /// Threshold the significance decision was made against.
    pub significance_threshold: f64,
}

/// `EffectReport` — complete estimator output for one analysis run.
///
/// Created once per run and never mutated; the report renderer is a pure
/// transform over this value.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectReport {
    pub pointwise: EffectSeries,
    pub cumulative: EffectSeries,
    pub summary: EffectSummary,
}

/// Compare observed and counterfactual series over the post-period.
///
/// Parameters
/// ----------
/// - `series` / `windows`: the analysis input; only the post-period slice
///   is read here.
/// - `forecast`: counterfactual distribution produced for the same
///   windows.
/// - `options`: source of the significance threshold.
///
/// Returns
/// -------
/// `ImpactResult<EffectReport>` with the pointwise series, cumulative
/// series, and summary scalars.
///
/// Errors
/// ------
/// - [`ImpactError::InsufficientData`] when the post-period window selects
///   no observations.
/// - [`ImpactError::ForecastMisaligned`] when the forecast length differs
///   from the post-period window (a sign the forecast was built for a
///   different window).
pub fn estimate(
    series: &TimeSeries, windows: &AnalysisWindows, forecast: &CounterfactualForecast,
    options: &ImpactOptions,
) -> ImpactResult<EffectReport> {
    let post_range = series.window_range(&windows.post);
    let horizon = post_range.len();
    if horizon == 0 {
        return Err(ImpactError::InsufficientData {
            window: "post-period",
            observed: 0,
            required: 1,
        });
    }
    if forecast.point.len() != horizon {
        return Err(ImpactError::ForecastMisaligned {
            expected: horizon,
            actual: forecast.point.len(),
        });
    }

    let observed = series.values.slice(s![post_range.start..post_range.end]);
    let z = forecast.z_score;

    // Pointwise effect; note the bound inversion.
    let point = &observed - &forecast.point;
    let lower = &observed - &forecast.upper;
    let upper = &observed - &forecast.lower;

    // Cumulative effect with variance-summed bounds.
    let mut cumulative_point = Array1::<f64>::zeros(horizon);
    let mut cumulative_lower = Array1::<f64>::zeros(horizon);
    let mut cumulative_upper = Array1::<f64>::zeros(horizon);
    let mut running_effect = 0.0;
    let mut running_variance = 0.0;
    for i in 0..horizon {
        running_effect += point[i];
        running_variance += forecast.variance[i];
        let half_width = z * running_variance.sqrt();
        cumulative_point[i] = running_effect;
        cumulative_lower[i] = running_effect - half_width;
        cumulative_upper[i] = running_effect + half_width;
    }

    let m = horizon as f64;
    let cumulative_observed = observed.sum();
    let cumulative_counterfactual = forecast.point.sum();
    let cumulative_effect = cumulative_point[horizon - 1];
    let cumulative_effect_lower = cumulative_lower[horizon - 1];
    let cumulative_effect_upper = cumulative_upper[horizon - 1];

    let (relative_effect, relative_effect_lower, relative_effect_upper) = relative_figures(
        cumulative_effect,
        cumulative_effect_lower,
        cumulative_effect_upper,
        cumulative_counterfactual,
    );

    let standard_normal = Normal::new(0.0, 1.0).expect("standard normal parameters");
    let cumulative_sd = running_variance.sqrt();
    let tail_probability = if cumulative_sd > 0.0 {
        2.0 * (1.0 - standard_normal.cdf(cumulative_effect.abs() / cumulative_sd))
    } else if cumulative_effect == 0.0 {
        1.0
    } else {
        0.0
    };

    let summary = EffectSummary {
        post_observations: horizon,
        average_observed: cumulative_observed / m,
        average_counterfactual: cumulative_counterfactual / m,
        average_effect: cumulative_effect / m,
        average_effect_lower: cumulative_effect_lower / m,
        average_effect_upper: cumulative_effect_upper / m,
        cumulative_observed,
        cumulative_counterfactual,
        cumulative_effect,
        cumulative_effect_lower,
        cumulative_effect_upper,
        relative_effect,
        relative_effect_lower,
        relative_effect_upper,
        tail_probability,
        significant: tail_probability < options.significance_threshold,
        confidence_level: forecast.confidence_level,
        significance_threshold: options.significance_threshold,
    };

    let timestamps = forecast.timestamps.clone();
    Ok(EffectReport {
        pointwise: EffectSeries { timestamps: timestamps.clone(), point, lower, upper },
        cumulative: EffectSeries {
            timestamps,
            point: cumulative_point,
            lower: cumulative_lower,
            upper: cumulative_upper,
        },
        summary,
    })
}

/// Relative effect figures in percent, with the near-zero denominator
/// guard and bound re-ordering for a negative denominator.
fn relative_figures(effect: f64, lower: f64, upper: f64, denominator: f64) -> (f64, f64, f64) {
    if denominator.abs() < RELATIVE_EFFECT_DENOMINATOR_FLOOR {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let scale = 100.0 / denominator;
    let a = lower * scale;
    let b = upper * scale;
    (effect * scale, a.min(b), a.max(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::core::period::AnalysisWindows;
    use crate::impact::forecast::interval_z_score;
    use ndarray::{s, Array1};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Pointwise bound inversion.
    // - Exactness of the cumulative sum and its variance-summed bounds.
    // - The relative-effect NaN guard.
    // - The significance decision on a clear jump and on a null effect.
    //
    // They intentionally DO NOT cover:
    // - Forecast construction; forecasts here are hand-built so the
    //   estimator arithmetic is isolated.
    // -------------------------------------------------------------------------

    /// Forecast with constant point/variance over `n` steps starting at
    /// timestamp `start`.
    fn flat_forecast(n: usize, start: i64, point: f64, variance: f64) -> CounterfactualForecast {
        let z = interval_z_score(0.95);
        let points = Array1::from_elem(n, point);
        let half = z * variance.sqrt();
        CounterfactualForecast {
            timestamps: (start..start + n as i64).collect(),
            point: points.clone(),
            lower: &points - half,
            upper: &points + half,
            variance: Array1::from_elem(n, variance),
            confidence_level: 0.95,
            z_score: z,
        }
    }

    fn series_with_post_jump() -> (TimeSeries, AnalysisWindows) {
        // 100..=109 pre, 150..=159 post.
        let values = Array1::from_iter(
            (0..10).map(|t| 100.0 + t as f64).chain((0..10).map(|t| 150.0 + t as f64)),
        );
        let series = TimeSeries::from_values(values).expect("valid series");
        let windows = AnalysisWindows::from_bounds(0, 9, 10, 19).expect("valid windows");
        (series, windows)
    }

    #[test]
    // Purpose
    // -------
    // Verify the pointwise effect and its inverted bounds against a
    // hand-built forecast.
    //
    // Given
    // -----
    // - Observed post values 150..159; counterfactual constant at 109 with
    //   variance 4 at the 95% level.
    //
    // Expect
    // ------
    // - `point[0] = 41`; `lower[0] = 41 − z·2`; `upper[0] = 41 + z·2`.
    fn estimate_inverts_pointwise_bounds() {
        let (series, windows) = series_with_post_jump();
        let forecast = flat_forecast(10, 10, 109.0, 4.0);
        let options = ImpactOptions::default();

        let report = estimate(&series, &windows, &forecast, &options).expect("estimate");

        let z = forecast.z_score;
        assert!((report.pointwise.point[0] - 41.0).abs() < 1e-12);
        assert!((report.pointwise.lower[0] - (41.0 - z * 2.0)).abs() < 1e-9);
        assert!((report.pointwise.upper[0] - (41.0 + z * 2.0)).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Confirm the exactness property: the final cumulative value equals
    // the sum of the pointwise effects computed in the same order, and the
    // cumulative band uses summed variances, not summed bounds.
    //
    // Given
    // -----
    // - The jump scenario with constant forecast variance 4 over 10 steps.
    //
    // Expect
    // ------
    // - `cumulative.point[9]` bit-equal to the running sum of pointwise
    //   effects; band half-width `z·√40`, which is strictly narrower than
    //   the `10·z·√4` a bound-sum would give.
    fn estimate_cumulative_is_exact_and_variance_summed() {
        let (series, windows) = series_with_post_jump();
        let forecast = flat_forecast(10, 10, 109.0, 4.0);
        let options = ImpactOptions::default();

        let report = estimate(&series, &windows, &forecast, &options).expect("estimate");

        let mut running = 0.0;
        for i in 0..10 {
            running += report.pointwise.point[i];
        }
        assert_eq!(report.cumulative.point[9].to_bits(), running.to_bits());

        let z = forecast.z_score;
        let half_width = report.cumulative.upper[9] - report.cumulative.point[9];
        assert!((half_width - z * 40.0f64.sqrt()).abs() < 1e-9);
        assert!(half_width < 10.0 * z * 2.0);
    }

    #[test]
    // Purpose
    // -------
    // Verify the jump scenario summary: a relative effect in the expected
    // 40–50% range, a detected effect, and a cumulative effect positive
    // throughout the post-period.
    //
    // Given
    // -----
    // - Observed 150..159 vs. counterfactual 109 with variance 4.
    //
    // Expect
    // ------
    // - `relative_effect` between 40 and 50; `significant == true`;
    //   every cumulative point (and lower bound) > 0.
    fn estimate_detects_jump_scenario() {
        let (series, windows) = series_with_post_jump();
        let forecast = flat_forecast(10, 10, 109.0, 4.0);
        let options = ImpactOptions::default();

        let report = estimate(&series, &windows, &forecast, &options).expect("estimate");

        assert!(report.summary.relative_effect > 40.0);
        assert!(report.summary.relative_effect < 50.0);
        assert!(report.summary.significant);
        assert!(report.summary.tail_probability < 0.05);
        assert!(report.cumulative.point.iter().all(|&v| v > 0.0));
        assert!(report.cumulative.lower.iter().all(|&v| v > 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Ensure a null effect is not flagged significant and the tail
    // probability is large.
    //
    // Given
    // -----
    // - Observed post values equal to the counterfactual (forecast built
    //   at the observed values).
    //
    // Expect
    // ------
    // - `significant == false`; `tail_probability` close to 1.
    fn estimate_reports_null_effect_as_insignificant() {
        let values = Array1::from_iter((0..20).map(|t| 75.0 + ((t * 7) % 3) as f64 * 0.1));
        let series = TimeSeries::from_values(values).expect("valid series");
        let windows = AnalysisWindows::from_bounds(0, 9, 10, 19).expect("valid windows");
        let observed_mean =
            series.values.slice(s![10..20]).sum() / 10.0;
        let forecast = flat_forecast(10, 10, observed_mean, 1.0);
        let options = ImpactOptions::default();

        let report = estimate(&series, &windows, &forecast, &options).expect("estimate");

        assert!(!report.summary.significant);
        assert!(report.summary.tail_probability > 0.5);
    }

    #[test]
    // Purpose
    // -------
    // Verify the division-by-zero guard: a counterfactual summing to ≈ 0
    // yields NaN relative figures rather than an error or ±inf.
    //
    // Given
    // -----
    // - Counterfactual constant at 0.0 while the observed post-period sits
    //   at 5.0.
    //
    // Expect
    // ------
    // - `Ok` report; all three relative figures are NaN; absolute figures
    //   remain finite.
    fn estimate_guards_zero_counterfactual_denominator() {
        let values = Array1::from_iter(
            (0..10).map(|t| (t as f64) * 0.5 - 2.0).chain(std::iter::repeat(5.0).take(5)),
        );
        let series = TimeSeries::from_values(values).expect("valid series");
        let windows = AnalysisWindows::from_bounds(0, 9, 10, 14).expect("valid windows");
        let forecast = flat_forecast(5, 10, 0.0, 1.0);
        let options = ImpactOptions::default();

        let report = estimate(&series, &windows, &forecast, &options).expect("estimate");

        assert!(report.summary.relative_effect.is_nan());
        assert!(report.summary.relative_effect_lower.is_nan());
        assert!(report.summary.relative_effect_upper.is_nan());
        assert!(report.summary.cumulative_effect.is_finite());
    }

    #[test]
    // Purpose
    // -------
    // Ensure a forecast built for a different window length is rejected.
    //
    // Given
    // -----
    // - A 10-observation post window paired with a 3-step forecast.
    //
    // Expect
    // ------
    // - `Err(ForecastMisaligned { expected: 10, actual: 3 })`.
    fn estimate_rejects_misaligned_forecast() {
        let (series, windows) = series_with_post_jump();
        let forecast = flat_forecast(3, 10, 109.0, 4.0);
        let options = ImpactOptions::default();

        let result = estimate(&series, &windows, &forecast, &options);

        assert_eq!(
            result.unwrap_err(),
            ImpactError::ForecastMisaligned { expected: 10, actual: 3 }
        );
    }
}
