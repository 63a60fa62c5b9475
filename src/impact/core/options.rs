//! Impact options — configuration for the causal-impact analysis workflow.
//!
//! Purpose
//! -------
//! Collect the configuration knobs of a causal-impact run in one validated
//! place: model structure (trend, seasonality), interval and significance
//! levels, the minimum viable pre-period, optimizer settings, and the
//! numeric guard rails used inside the likelihood.
//!
//! Key behaviors
//! -------------
//! - [`ImpactOptions`] validates every user-facing knob on construction and
//!   rejects invalid values with typed [`ImpactError`]s — the engine never
//!   substitutes defaults for invalid input.
//! - [`VarianceGuards`] bounds the variance parameters reached through the
//!   unconstrained optimizer space, keeping the likelihood finite on
//!   extreme parameter proposals.
//!
//! Conventions
//! -----------
//! - `confidence_level` and `significance_threshold` are probabilities in
//!   the open interval (0, 1).
//! - `seasonal_period` counts observations per cycle (e.g. 7 for a weekly
//!   pattern over daily data) and must be at least 2 when present.
//! - Optimizer behavior is configured through the embedded
//!   [`MLEOptions`]; its numeric validation lives in the optimization
//!   layer.
use crate::impact::errors::{ImpactError, ImpactResult};
use crate::optimization::mle::MLEOptions;

/// Default confidence level for counterfactual intervals.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Default two-sided significance threshold for the effect decision.
pub const DEFAULT_SIGNIFICANCE_THRESHOLD: f64 = 0.05;

/// Default minimum number of pre-period observations.
pub const DEFAULT_MIN_PRE_PERIOD_LENGTH: usize = 10;

/// Default scale multiplier for the diffuse initial state covariance.
pub const DEFAULT_DIFFUSE_SCALE: f64 = 1e6;

/// `VarianceGuards` — clamp bounds for variance parameters.
///
/// Purpose
/// -------
/// Keep the variances reached through the unconstrained optimizer space
/// (`exp(θ)`) inside a finite, strictly positive range so the Kalman
/// likelihood stays well-defined everywhere the line search may probe.
///
/// Invariants
/// ----------
/// - `0 < min < max`, both finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceGuards {
    pub min: f64,
    pub max: f64,
}

impl VarianceGuards {
    /// Construct validated guards from a `(min, max)` pair.
    ///
    /// # Errors
    /// - [`ImpactError::InvalidVarianceGuards`] for non-finite bounds,
    ///   non-positive `min`, or `min >= max`.
    pub fn new(bounds: (f64, f64)) -> ImpactResult<Self> {
        let (min, max) = bounds;
        if !min.is_finite() || !max.is_finite() {
            return Err(ImpactError::InvalidVarianceGuards {
                min,
                max,
                reason: "bounds must be finite",
            });
        }
        if min <= 0.0 {
            return Err(ImpactError::InvalidVarianceGuards {
                min,
                max,
                reason: "min must be strictly positive",
            });
        }
        if min >= max {
            return Err(ImpactError::InvalidVarianceGuards {
                min,
                max,
                reason: "min must be strictly less than max",
            });
        }
        Ok(VarianceGuards { min, max })
    }

    /// Clamp a proposed variance into the guarded range.
    pub fn clamp(&self, variance: f64) -> f64 {
        variance.clamp(self.min, self.max)
    }
}

impl Default for VarianceGuards {
    fn default() -> Self {
        VarianceGuards { min: 1e-9, max: 1e12 }
    }
}

/// `ImpactOptions` — validated configuration for one analysis run.
///
/// Fields
/// ------
/// - `confidence_level`: `f64`
///   Coverage of the counterfactual interval (default 0.95).
/// - `trend`: `bool`
///   Adds a local linear trend (slope state) to the structural model.
/// - `seasonal_period`: `Option<usize>`
///   Adds a dummy seasonal component of the given period when present.
/// - `min_pre_period_length`: `usize`
///   Minimum viable pre-period sample size (default 10).
/// - `significance_threshold`: `f64`
///   Two-sided tail-probability threshold for the "effect detected"
///   decision (default 0.05).
/// - `mle_opts`: [`MLEOptions`]
///   Optimizer configuration (tolerances, line search, L-BFGS memory).
/// - `variance_guards`: [`VarianceGuards`]
///   Clamp range for the variance parameters.
/// - `diffuse_scale`: `f64`
///   Multiplier applied to the pre-period variance when building the
///   diffuse initial state covariance.
///
/// Invariants
/// ----------
/// - `confidence_level` and `significance_threshold` lie strictly inside
///   (0, 1); `seasonal_period`, when present, is at least 2;
///   `min_pre_period_length >= 3`; `diffuse_scale` is finite and positive.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactOptions {
    pub confidence_level: f64,
    pub trend: bool,
    pub seasonal_period: Option<usize>,
    pub min_pre_period_length: usize,
    pub significance_threshold: f64,
    pub mle_opts: MLEOptions,
    pub variance_guards: VarianceGuards,
    pub diffuse_scale: f64,
}

impl ImpactOptions {
    /// Construct validated options.
    ///
    /// # Errors
    /// - [`ImpactError::InvalidConfidenceLevel`] /
    ///   [`ImpactError::InvalidSignificanceThreshold`] for probabilities
    ///   outside (0, 1).
    /// - [`ImpactError::InvalidSeasonalPeriod`] for a period below 2.
    /// - [`ImpactError::InvalidMinPreLength`] for a minimum below 3 (the
    ///   sample variance and burn-in need at least that much).
    /// - [`ImpactError::InvalidDiffuseScale`] for a non-finite or
    ///   non-positive scale.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        confidence_level: f64, trend: bool, seasonal_period: Option<usize>,
        min_pre_period_length: usize, significance_threshold: f64, mle_opts: MLEOptions,
        variance_guards: VarianceGuards, diffuse_scale: f64,
    ) -> ImpactResult<Self> {
        if !confidence_level.is_finite() || confidence_level <= 0.0 || confidence_level >= 1.0 {
            return Err(ImpactError::InvalidConfidenceLevel { value: confidence_level });
        }
        if !significance_threshold.is_finite()
            || significance_threshold <= 0.0
            || significance_threshold >= 1.0
        {
            return Err(ImpactError::InvalidSignificanceThreshold {
                value: significance_threshold,
            });
        }
        if let Some(period) = seasonal_period {
            if period < 2 {
                return Err(ImpactError::InvalidSeasonalPeriod { period });
            }
        }
        if min_pre_period_length < 3 {
            return Err(ImpactError::InvalidMinPreLength { value: min_pre_period_length });
        }
        if !diffuse_scale.is_finite() || diffuse_scale <= 0.0 {
            return Err(ImpactError::InvalidDiffuseScale { value: diffuse_scale });
        }
        Ok(ImpactOptions {
            confidence_level,
            trend,
            seasonal_period,
            min_pre_period_length,
            significance_threshold,
            mle_opts,
            variance_guards,
            diffuse_scale,
        })
    }
}

impl Default for ImpactOptions {
    fn default() -> Self {
        ImpactOptions {
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            trend: false,
            seasonal_period: None,
            min_pre_period_length: DEFAULT_MIN_PRE_PERIOD_LENGTH,
            significance_threshold: DEFAULT_SIGNIFICANCE_THRESHOLD,
            mle_opts: MLEOptions::default(),
            variance_guards: VarianceGuards::default(),
            diffuse_scale: DEFAULT_DIFFUSE_SCALE,
        }
    }
}
