//! Analysis windows: inclusive timestamp periods and the validated
//! pre/post-intervention pair.
//!
//! Purpose
//! -------
//! Represent the two time windows a causal-impact run is defined over. A
//! [`Period`] is an inclusive `(start, end)` timestamp pair; an
//! [`AnalysisWindows`] value couples the pre-intervention and
//! post-intervention periods and enforces their ordering.
//!
//! Invariants & assumptions
//! ------------------------
//! - `start <= end` for every period.
//! - The post-period starts strictly after the pre-period ends; the two
//!   windows never overlap.
//! - Whether a window actually covers observations is a property of the
//!   series and is checked at analysis time, not here.
use crate::impact::errors::{ImpactError, ImpactResult};

/// Inclusive timestamp window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: i64,
    pub end: i64,
}

impl Period {
    /// Construct a validated period.
    ///
    /// # Errors
    /// - [`ImpactError::InvalidPeriod`] when `start > end`.
    pub fn new(start: i64, end: i64) -> ImpactResult<Self> {
        if start > end {
            return Err(ImpactError::InvalidPeriod { start, end });
        }
        Ok(Period { start, end })
    }

    /// `true` when `timestamp` falls inside the inclusive window.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

/// `AnalysisWindows` — validated pre/post-intervention period pair.
///
/// Purpose
/// -------
/// Carry the two windows of a causal-impact run as one value whose ordering
/// invariant has been checked once, so downstream stages can slice the
/// series without re-validating.
///
/// Fields
/// ------
/// - `pre`: [`Period`]
///   Window the model is fitted on. Post-period data never reaches the fit.
/// - `post`: [`Period`]
///   Window the counterfactual is forecast over and compared against.
///
/// Invariants
/// ----------
/// - `pre.start <= pre.end < post.start <= post.end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindows {
    pub pre: Period,
    pub post: Period,
}

impl AnalysisWindows {
    /// Construct a validated window pair.
    ///
    /// # Errors
    /// - [`ImpactError::PeriodsOverlap`] when the post-period does not start
    ///   strictly after the pre-period ends.
    pub fn new(pre: Period, post: Period) -> ImpactResult<Self> {
        if post.start <= pre.end {
            return Err(ImpactError::PeriodsOverlap { pre_end: pre.end, post_start: post.start });
        }
        Ok(AnalysisWindows { pre, post })
    }

    /// Build windows from raw bounds, validating each period and the pair.
    pub fn from_bounds(
        pre_start: i64, pre_end: i64, post_start: i64, post_end: i64,
    ) -> ImpactResult<Self> {
        let pre = Period::new(pre_start, pre_end)?;
        let post = Period::new(post_start, post_end)?;
        AnalysisWindows::new(pre, post)
    }
}
