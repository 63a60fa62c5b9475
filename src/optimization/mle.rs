//! Public surface for log-likelihood maximization.
//!
//! - [`LogLikelihood`]: trait the model layer implements.
//! - [`MLEOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`LineSearcher`]: choice of line search used by L-BFGS.
//! - [`OptimOutcome`]: normalized result returned by [`crate::optimization::maximize`].
//!
//! Convention: we *maximize* a log-likelihood `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided it must be the gradient
//! of the log-likelihood (`∇ℓ(θ)`); the adapter flips the sign as needed.
use crate::optimization::errors::{OptError, OptResult};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;
use ndarray::Array1;
use std::collections::HashMap;
use std::str::FromStr;

/// Parameter vector `θ` for log-likelihood optimization.
pub type Theta = Array1<f64>;

/// Gradient vector `∇ℓ(θ)` or `∇c(θ)`, matching the shape of [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value used by the optimizer: the cost `c(θ) = -ℓ(θ)`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver
/// (e.g. `"cost_count"`, `"gradient_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// User-implemented log-likelihood interface.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
/// If you provide an analytic gradient, return the gradient of the
/// log-likelihood `∇ℓ(θ)` (the adapter flips the sign to match the cost).
///
/// - `type Data`: per-model data carried into `value`/`grad`/`check`.
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: reject obviously invalid
///   `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, robust finite differences are used automatically.
pub trait LogLikelihood {
    type Data: 'static;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Choice of line search used inside the L-BFGS solver.
///
/// Parsed case-insensitively from `"MoreThuente"` or `"HagerZhang"`; unknown
/// names return [`OptError::InvalidLineSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearcher {
    MoreThuente,
    HagerZhang,
}

impl FromStr for LineSearcher {
    type Err = OptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morethuente" => Ok(LineSearcher::MoreThuente),
            "hagerzhang" => Ok(LineSearcher::HagerZhang),
            _ => Err(OptError::InvalidLineSearch {
                name: s.to_string(),
                reason: "Valid options are case insensitive 'MoreThuente' or 'HagerZhang'.",
            }),
        }
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_grad`: terminate when the gradient norm falls below this threshold.
/// - `tol_cost`: terminate when the change in cost falls below this threshold.
/// - `max_iter`: hard cap on the number of iterations.
///
/// Any field can be `None` but **at least one** of the three must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of `tol_grad`, `tol_cost`, or `max_iter` must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all three are `None`.
    /// - [`OptError::InvalidTolGrad`] / [`OptError::InvalidTolCost`] for
    ///   non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_grad(tol_grad)?;
        verify_tol_cost(tol_cost)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — numerical tolerances and iteration limits.
/// - `line_searcher: LineSearcher` — line-search algorithm used by L-BFGS.
/// - `lbfgs_mem: Option<usize>` — history size; `None` uses
///   [`DEFAULT_LBFGS_MEM`].
/// - `verbose: bool` — if `true`, attaches a terminal observer (behind the
///   `obs_slog` feature).
///
/// Default: `tol_grad = 1e-5`, `tol_cost = 1e-9`, `max_iter = 300`,
/// More–Thuente line search, default memory, quiet.
#[derive(Debug, Clone, PartialEq)]
pub struct MLEOptions {
    pub tols: Tolerances,
    pub line_searcher: LineSearcher,
    pub lbfgs_mem: Option<usize>,
    pub verbose: bool,
}

impl MLEOptions {
    /// Create a new set of optimizer options.
    ///
    /// Numeric validation of the tolerances happens in [`Tolerances::new`];
    /// this constructor only rejects a zero L-BFGS memory.
    pub fn new(
        tols: Tolerances, line_searcher: LineSearcher, lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLbfgsMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        Ok(Self { tols, line_searcher, lbfgs_mem, verbose: false })
    }
}

impl Default for MLEOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::new(Some(1e-5), Some(1e-9), Some(300)).unwrap(),
            line_searcher: LineSearcher::MoreThuente,
            lbfgs_mem: None,
            verbose: false,
        }
    }
}

/// Canonical result returned by `maximize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `value`: best **log-likelihood** value `ℓ(θ̂)` (not the cost).
/// - `converged`: `true` only when the solver terminated by meeting a
///   convergence criterion (gradient or cost tolerance, or target cost);
///   exhausting the iteration cap or a solver bail-out leaves this
///   `false`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient, if present.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimOutcome {
    pub theta_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl OptimOutcome {
    /// Build a validated [`OptimOutcome`] from raw solver state.
    ///
    /// Performs:
    /// - `theta_hat` check via [`validate_theta_hat`] (present and all finite).
    /// - `value` check via [`validate_value`] (finite).
    /// - Maps `TerminationStatus` into `(converged, status)`. Only
    ///   tolerance-driven termination counts as convergence; running out
    ///   of iterations does not.
    /// - Computes `grad_norm` if a gradient was provided.
    ///
    /// # Errors
    /// - Propagates any validation errors for `theta_hat` or `value`.
    pub fn new(
        theta_hat_opt: Option<Theta>, value: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_value(value)?;
        let status = match &termination {
            TerminationStatus::NotTerminated => "Not terminated".to_string(),
            TerminationStatus::Terminated(reason) => format!("{reason:?}"),
        };
        let converged = matches!(
            termination,
            TerminationStatus::Terminated(
                TerminationReason::SolverConverged | TerminationReason::TargetCostReached
            )
        );
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            value,
            converged,
            status,
            iterations: iterations as usize,
            fn_evals,
            grad_norm,
        })
    }
}

// ---- Validation helpers ----------------------------------------------------

/// Validate the optional gradient-norm tolerance.
///
/// Accepts `None`; a `Some` value must be finite and strictly positive.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost-change tolerance.
///
/// Accepts `None`; a `Some` value must be finite and strictly positive.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if the length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value of the first
///   non-finite element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

/// Validate that a scalar log-likelihood value is finite.
///
/// Negative values are fine as long as they are finite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

/// Validate an unconstrained parameter vector against dimension and
/// finiteness before optimization starts.
///
/// # Errors
/// - [`OptError::ThetaLengthMismatch`] if the length does not match `dim`.
/// - [`OptError::InvalidThetaInput`] with the first non-finite entry.
pub fn validate_theta(theta: &Theta, dim: usize) -> OptResult<()> {
    if theta.len() != dim {
        return Err(OptError::ThetaLengthMismatch { expected: dim, actual: theta.len() });
    }
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaInput { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Validation rules of `Tolerances::new` and `MLEOptions::new`.
    // - `LineSearcher` parsing.
    // - Gradient / theta validation helpers.
    //
    // They intentionally DO NOT cover:
    // - Solver execution; that lives in the `solver` module and the
    //   integration tests.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure `Tolerances::new` rejects the all-`None` configuration, which
    // would leave the solver without any stopping rule.
    //
    // Given
    // -----
    // - `tol_grad = None`, `tol_cost = None`, `max_iter = None`.
    //
    // Expect
    // ------
    // - `Err(OptError::NoTolerancesProvided)`.
    fn tolerances_new_rejects_all_none() {
        let result = Tolerances::new(None, None, None);
        assert_eq!(result.unwrap_err(), OptError::NoTolerancesProvided);
    }

    #[test]
    // Purpose
    // -------
    // Ensure non-positive or non-finite tolerances are rejected with the
    // matching error variant.
    //
    // Given
    // -----
    // - `tol_grad = Some(-1.0)` in one call, `tol_cost = Some(f64::NAN)` in
    //   another.
    //
    // Expect
    // ------
    // - `InvalidTolGrad` and `InvalidTolCost` respectively.
    fn tolerances_new_rejects_bad_values() {
        let bad_grad = Tolerances::new(Some(-1.0), None, None);
        assert!(matches!(bad_grad.unwrap_err(), OptError::InvalidTolGrad { .. }));

        let bad_cost = Tolerances::new(None, Some(f64::NAN), None);
        assert!(matches!(bad_cost.unwrap_err(), OptError::InvalidTolCost { .. }));
    }

    #[test]
    // Purpose
    // -------
    // Verify that `MLEOptions::new` rejects a zero L-BFGS memory and accepts
    // a positive one.
    //
    // Given
    // -----
    // - Valid tolerances; `lbfgs_mem = Some(0)` then `Some(5)`.
    //
    // Expect
    // ------
    // - `Err(InvalidLbfgsMem)` for zero, `Ok` for five.
    fn mle_options_validates_lbfgs_mem() {
        let tols = Tolerances::new(Some(1e-6), None, Some(100)).unwrap();
        let zero = MLEOptions::new(tols, LineSearcher::MoreThuente, Some(0));
        assert!(matches!(zero.unwrap_err(), OptError::InvalidLbfgsMem { .. }));

        let five = MLEOptions::new(tols, LineSearcher::MoreThuente, Some(5));
        assert!(five.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Check case-insensitive parsing of `LineSearcher` and rejection of
    // unknown names.
    //
    // Given
    // -----
    // - `"morethuente"`, `"HAGERZHANG"`, and `"newton"`.
    //
    // Expect
    // ------
    // - The first two parse to their variants; the last returns
    //   `InvalidLineSearch`.
    fn line_searcher_parses_case_insensitively() {
        assert_eq!(LineSearcher::from_str("morethuente").unwrap(), LineSearcher::MoreThuente);
        assert_eq!(LineSearcher::from_str("HAGERZHANG").unwrap(), LineSearcher::HagerZhang);
        assert!(matches!(
            LineSearcher::from_str("newton").unwrap_err(),
            OptError::InvalidLineSearch { .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // Validate gradient checks: dimension mismatch and non-finite entries
    // are both rejected with indexed errors.
    //
    // Given
    // -----
    // - A length-2 gradient checked against dim 3.
    // - A length-3 gradient containing NaN at index 1 checked against dim 3.
    //
    // Expect
    // ------
    // - `GradientDimMismatch` then `InvalidGradient { index: 1, .. }`.
    fn validate_grad_flags_dim_and_finiteness() {
        let short = array![1.0, 2.0];
        assert_eq!(
            validate_grad(&short, 3).unwrap_err(),
            OptError::GradientDimMismatch { expected: 3, found: 2 }
        );

        let with_nan = array![1.0, f64::NAN, 3.0];
        assert!(matches!(
            validate_grad(&with_nan, 3).unwrap_err(),
            OptError::InvalidGradient { index: 1, .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // Ensure `validate_theta` enforces the model's parameter dimension and
    // finiteness before a fit starts.
    //
    // Given
    // -----
    // - A length-2 theta checked against dim 3, and a theta containing +inf.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch` then `InvalidThetaInput { index: 0, .. }`.
    fn validate_theta_enforces_shape_and_finiteness() {
        let short = array![0.0, 0.0];
        assert_eq!(
            validate_theta(&short, 3).unwrap_err(),
            OptError::ThetaLengthMismatch { expected: 3, actual: 2 }
        );

        let with_inf = array![f64::INFINITY, 0.0, 0.0];
        assert!(matches!(
            validate_theta(&with_inf, 3).unwrap_err(),
            OptError::InvalidThetaInput { index: 0, .. }
        ));
    }
}
