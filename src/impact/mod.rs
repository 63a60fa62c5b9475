//! impact — the causal-impact estimation engine.
//!
//! Purpose
//! -------
//! Implement the full causal-inference workflow over a univariate time
//! series: fit a structural time-series model on the pre-intervention
//! window, forecast the counterfactual through the post-intervention
//! window with uncertainty bands, quantify the observed-vs-counterfactual
//! divergence pointwise and cumulatively, and render the result as text
//! and plottable series.
//!
//! Key behaviors
//! -------------
//! - [`core`] holds the validated containers (series, windows, options)
//!   and the shared Kalman engine.
//! - [`models`] fits the local-level model (optional trend / seasonal
//!   components) by maximum likelihood over the pre-period only.
//! - [`forecast`] propagates the fitted state forward with additive
//!   variance accumulation.
//! - [`effect`] produces the pointwise/cumulative effect series and the
//!   significance decision.
//! - [`report`] renders text summaries and the plot bundle.
//! - [`analysis`] is the public entry point: one run, or a keyed batch
//!   with per-run failure isolation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Post-period data never influences the fitted model (the leakage
//!   invariant; tested by perturbation).
//! - Every run is a pure function of `(TimeSeries, AnalysisWindows,
//!   ImpactOptions)`; no state is shared between runs.
//! - All invalid input fails fast with a typed [`errors::ImpactError`];
//!   the engine never substitutes defaults.

pub mod analysis;
pub mod core;
pub mod effect;
pub mod errors;
pub mod forecast;
pub mod models;
pub mod report;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::analysis::{ImpactAnalysis, run_analysis, run_batch};
pub use self::core::options::ImpactOptions;
pub use self::core::period::{AnalysisWindows, Period};
pub use self::core::series::TimeSeries;
pub use self::effect::{EffectReport, EffectSeries, EffectSummary};
pub use self::errors::{ImpactError, ImpactResult};
pub use self::forecast::CounterfactualForecast;
pub use self::models::FittedModel;
pub use self::report::{PlotBundle, TextFormat, render_text};
