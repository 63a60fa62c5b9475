//! Analysis orchestration: the one-shot run entry point and the keyed
//! batch runner.
//!
//! Purpose
//! -------
//! Wire the pipeline stages together — fit on the pre-period, forecast the
//! counterfactual over the post-period, estimate the effect, assemble the
//! plot bundle — behind a single entry point that is a pure function of
//! `(series, windows, options)`.
//!
//! Key behaviors
//! -------------
//! - [`run_analysis`] executes one complete run and returns every artifact
//!   a consumer needs ([`ImpactAnalysis`]).
//! - [`run_batch`] maps independent keyed runs to per-key results,
//!   isolating each run's failure from its siblings: one diverging segment
//!   never aborts the rest of a multi-segment study.
//!
//! Concurrency
//! -----------
//! - A single run is synchronous and single-threaded with no shared
//!   mutable state. Runs share nothing, so callers are free to distribute
//!   batch entries across threads; the engine itself stays sequential and
//!   makes no ordering promises between keys beyond preserving input
//!   order in the returned pairs.
use crate::impact::core::{options::ImpactOptions, period::AnalysisWindows, series::TimeSeries};
use crate::impact::effect::{EffectReport, estimate};
use crate::impact::errors::ImpactResult;
use crate::impact::forecast::{CounterfactualForecast, forecast};
use crate::impact::models::local_level::FittedModel;
use crate::impact::report::{PlotBundle, plot_bundle};

/// `ImpactAnalysis` — complete output of one analysis run.
///
/// Owns the fitted model (diagnostics, in-sample fit), the counterfactual
/// forecast, the effect report, and the plottable bundle. Created fresh
/// per run; nothing is shared or mutated between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactAnalysis {
    pub fitted: FittedModel,
    pub forecast: CounterfactualForecast,
    pub report: EffectReport,
    pub plot: PlotBundle,
}

/// Run one causal-impact analysis.
///
/// ## Steps
/// 1. Fit the structural model on the pre-period window
///    ([`FittedModel::fit`]); post-period data never reaches the fit.
/// 2. Propagate the fitted state through the post-period
///    ([`forecast`]).
/// 3. Compare observed and counterfactual ([`estimate`]).
/// 4. Assemble the plottable series ([`plot_bundle`]).
///
/// ## Errors
/// Propagates the typed failure of whichever stage rejects its input; see
/// [`crate::impact::errors::ImpactError`] for the taxonomy. Nothing is
/// retried and no defaults are substituted.
pub fn run_analysis(
    series: &TimeSeries, windows: &AnalysisWindows, options: &ImpactOptions,
) -> ImpactResult<ImpactAnalysis> {
    let fitted = FittedModel::fit(series, windows, options)?;
    let counterfactual = forecast(&fitted, series, windows, options.confidence_level)?;
    let report = estimate(series, windows, &counterfactual, options)?;
    let plot = plot_bundle(series, windows, &fitted, &counterfactual, &report);
    Ok(ImpactAnalysis { fitted, forecast: counterfactual, report, plot })
}

/// Run independent keyed analyses, capturing each run's outcome
/// separately.
///
/// Every entry is analyzed with the shared `options`; a failure in one run
/// is recorded under its key and the remaining runs proceed. Input order
/// is preserved in the returned pairs.
pub fn run_batch<K, I>(runs: I, options: &ImpactOptions) -> Vec<(K, ImpactResult<ImpactAnalysis>)>
where
    I: IntoIterator<Item = (K, TimeSeries, AnalysisWindows)>,
{
    runs.into_iter()
        .map(|(key, series, windows)| {
            let outcome = run_analysis(&series, &windows, options);
            (key, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impact::errors::ImpactError;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Per-run isolation of the batch runner: a degenerate segment fails
    //   under its key while siblings succeed.
    // - Key and order preservation.
    //
    // They intentionally DO NOT cover:
    // - End-to-end statistical behavior of `run_analysis`; that lives in
    //   the integration tests.
    // -------------------------------------------------------------------------

    fn wobbly_series(n: usize, base: f64) -> TimeSeries {
        let values =
            Array1::from_iter((0..n).map(|t| base + ((t * 37 + 11) % 13) as f64 * 0.3 - 1.8));
        TimeSeries::from_values(values).expect("synthetic series is valid")
    }

    fn flat_series(n: usize, value: f64) -> TimeSeries {
        TimeSeries::from_values(Array1::from_elem(n, value)).expect("valid series")
    }

    fn windows_for(pre_len: usize, n: usize) -> AnalysisWindows {
        AnalysisWindows::from_bounds(0, pre_len as i64 - 1, pre_len as i64, n as i64 - 1)
            .expect("valid windows")
    }

    #[test]
    // Purpose
    // -------
    // Verify that a failing run in the middle of a batch neither aborts
    // its siblings nor leaks into their results.
    //
    // Given
    // -----
    // - Three keyed runs: a healthy series, a constant (degenerate)
    //   series, and another healthy series, all with 20/10 windows.
    //
    // Expect
    // ------
    // - Three results in input order; the middle one is
    //   `Err(DegenerateSeries { .. })`, the outer two are `Ok`.
    fn run_batch_isolates_per_run_failures() {
        let options = ImpactOptions::default();
        let runs = vec![
            ("2021", wobbly_series(30, 100.0), windows_for(20, 30)),
            ("2022", flat_series(30, 50.0), windows_for(20, 30)),
            ("2023", wobbly_series(30, 200.0), windows_for(20, 30)),
        ];

        let results = run_batch(runs, &options);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, "2021");
        assert_eq!(results[1].0, "2022");
        assert_eq!(results[2].0, "2023");
        assert!(results[0].1.is_ok());
        assert!(matches!(
            results[1].1.as_ref().unwrap_err(),
            ImpactError::DegenerateSeries { .. }
        ));
        assert!(results[2].1.is_ok());
    }
}
