//! Model layer: the structural time-series model and its maximum-likelihood
//! fit over the pre-intervention window.

pub mod local_level;

pub use self::local_level::{FittedModel, PrePeriodData, StructuralModel};
