//! optimization — argmin-powered maximum-likelihood layer.
//!
//! Purpose
//! -------
//! Provide the estimation backend for the causal-impact engine: a small,
//! Argmin-backed layer for **maximizing log-likelihoods** `ℓ(θ)`. Model code
//! implements a single trait, [`LogLikelihood`], and calls [`maximize`] to run
//! L-BFGS with a configurable line search and finite-difference gradient
//! fallback.
//!
//! Key behaviors
//! -------------
//! - Convert a user log-likelihood `ℓ(θ)` into an Argmin-compatible cost
//!   `c(θ) = -ℓ(θ)` via [`solver::ArgMinAdapter`].
//! - Expose one entry point, [`maximize`], that validates the initial guess,
//!   builds an L-BFGS solver for the configured [`LineSearcher`], executes
//!   it, and normalizes the result into an [`OptimOutcome`].
//! - Centralize optimizer configuration ([`Tolerances`], [`MLEOptions`]) and
//!   the validation helpers that keep inputs finite and well-shaped.
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer always maximizes `ℓ(θ)` by minimizing `c(θ) = -ℓ(θ)`;
//!   models implement `ℓ(θ)`, never the cost directly.
//! - [`LogLikelihood::value`] reports invalid inputs as recoverable
//!   [`OptError`] values, not panics.
//! - Parameters live in an unconstrained space as [`Theta`]
//!   (`ndarray::Array1<f64>`); any constrained → unconstrained mapping
//!   happens in the model layer.
//!
//! Downstream usage
//! ----------------
//! - The structural model in `impact::models` implements [`LogLikelihood`]
//!   over its log-variance parameter vector and calls [`maximize`] with an
//!   [`MLEOptions`] taken from the analysis configuration.
//! - Errors bubble up as [`OptResult<T>`] / [`OptError`] and are converted
//!   into the domain error type at the model boundary.

pub mod errors;
pub mod mle;
pub mod solver;

pub use self::errors::{OptError, OptResult};
pub use self::mle::{
    Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, LineSearcher, LogLikelihood, MLEOptions,
    OptimOutcome, Theta, Tolerances,
};
pub use self::solver::maximize;
