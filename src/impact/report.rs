//! Report rendering: textual summaries and the plottable series bundle.
//!
//! Purpose
//! -------
//! Serialize an [`EffectReport`] into consumer-facing artifacts without any
//! recomputation: two text formats (an aligned figure summary and a
//! natural-language narrative) and a bundle of four aligned series covering
//! the pre- and post-periods so the intervention transition is visible.
//!
//! Conventions
//! -----------
//! - The bundle spans exactly the observations selected by the two windows;
//!   observations outside both windows do not appear.
//! - Over the pre-period the counterfactual band shows the in-sample
//!   one-step-ahead fit (a model-quality diagnostic), the pointwise series
//!   shows the fit residuals, and the cumulative effect is pinned at zero —
//!   effects only accumulate after the intervention.
//! - Rendering never mutates or re-derives statistics; it is a pure
//!   transform of the estimator's output.
use crate::impact::core::{period::AnalysisWindows, series::TimeSeries};
use crate::impact::effect::EffectReport;
use crate::impact::forecast::CounterfactualForecast;
use crate::impact::models::local_level::FittedModel;
use ndarray::s;
use std::fmt::Write as _;

/// Text rendering flavor.
///
/// - `Summary`: aligned average/cumulative figures, interval rows, and the
///   significance verdict.
/// - `Narrative`: a prose paragraph describing the estimated effect and
///   its statistical backing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Summary,
    Narrative,
}

/// One plottable series with interval bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// `PlotBundle` — four aligned series spanning pre- and post-periods.
///
/// Fields
/// ------
/// - `timestamps`: observation times of the bundled range (pre window then
///   post window).
/// - `observed`: the actual series over that range.
/// - `counterfactual`: in-sample fit over the pre-period, forecast over the
///   post-period, with band.
/// - `pointwise`: observed − counterfactual with band and an implicit zero
///   reference line.
/// - `cumulative`: running post-period effect with band, zero over the
///   pre-period.
/// - `intervention_time`: first post-period timestamp, where plots
///   conventionally draw the intervention marker.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotBundle {
    pub timestamps: Vec<i64>,
    pub observed: Vec<f64>,
    pub counterfactual: Band,
    pub pointwise: Band,
    pub cumulative: Band,
    pub intervention_time: i64,
}

/// Assemble the plottable bundle for one analysis run.
///
/// Pure transform over already-computed artifacts: the fitted model's
/// in-sample predictive series covers the pre-period, the counterfactual
/// forecast and effect report cover the post-period.
pub fn plot_bundle(
    series: &TimeSeries, windows: &AnalysisWindows, model: &FittedModel,
    forecast: &CounterfactualForecast, report: &EffectReport,
) -> PlotBundle {
    let pre_range = series.window_range(&windows.pre);
    let post_range = series.window_range(&windows.post);
    let pre_len = pre_range.len();
    let post_len = post_range.len();
    let total = pre_len + post_len;
    let z = forecast.z_score;

    let mut timestamps = Vec::with_capacity(total);
    timestamps.extend_from_slice(&series.timestamps[pre_range.clone()]);
    timestamps.extend_from_slice(&series.timestamps[post_range.clone()]);

    let mut observed = Vec::with_capacity(total);
    observed.extend(series.values.slice(s![pre_range.start..pre_range.end]).iter());
    observed.extend(series.values.slice(s![post_range.start..post_range.end]).iter());

    let mut counterfactual =
        Band { point: Vec::with_capacity(total), lower: Vec::with_capacity(total), upper: Vec::with_capacity(total) };
    let mut pointwise =
        Band { point: Vec::with_capacity(total), lower: Vec::with_capacity(total), upper: Vec::with_capacity(total) };
    let mut cumulative =
        Band { point: Vec::with_capacity(total), lower: Vec::with_capacity(total), upper: Vec::with_capacity(total) };

    for i in 0..pre_len {
        let fit = model.fitted_means[i];
        let half_width = z * model.fitted_variances[i].sqrt();
        let residual = observed[i] - fit;
        counterfactual.point.push(fit);
        counterfactual.lower.push(fit - half_width);
        counterfactual.upper.push(fit + half_width);
        pointwise.point.push(residual);
        pointwise.lower.push(residual - half_width);
        pointwise.upper.push(residual + half_width);
        cumulative.point.push(0.0);
        cumulative.lower.push(0.0);
        cumulative.upper.push(0.0);
    }

    for i in 0..post_len {
        counterfactual.point.push(forecast.point[i]);
        counterfactual.lower.push(forecast.lower[i]);
        counterfactual.upper.push(forecast.upper[i]);
        pointwise.point.push(report.pointwise.point[i]);
        pointwise.lower.push(report.pointwise.lower[i]);
        pointwise.upper.push(report.pointwise.upper[i]);
        cumulative.point.push(report.cumulative.point[i]);
        cumulative.lower.push(report.cumulative.lower[i]);
        cumulative.upper.push(report.cumulative.upper[i]);
    }

    PlotBundle {
        timestamps,
        observed,
        counterfactual,
        pointwise,
        cumulative,
        intervention_time: windows.post.start,
    }
}

/// Render an [`EffectReport`] as text in the requested format.
pub fn render_text(report: &EffectReport, format: TextFormat) -> String {
    match format {
        TextFormat::Summary => render_summary(report),
        TextFormat::Narrative => render_narrative(report),
    }
}

fn render_summary(report: &EffectReport) -> String {
    let s = &report.summary;
    let interval_label = format!("{:.0}% interval", s.confidence_level * 100.0);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Causal impact analysis over {} post-period observations\n",
        s.post_observations
    );
    let _ = writeln!(out, "{:<22}{:>16}{:>20}", "", "Average", "Cumulative");
    let _ = writeln!(
        out,
        "{:<22}{:>16.2}{:>20.2}",
        "Observed", s.average_observed, s.cumulative_observed
    );
    let _ = writeln!(
        out,
        "{:<22}{:>16.2}{:>20.2}",
        "Counterfactual", s.average_counterfactual, s.cumulative_counterfactual
    );
    let _ = writeln!(
        out,
        "{:<22}{:>16.2}{:>20.2}",
        "Absolute effect", s.average_effect, s.cumulative_effect
    );
    let _ = writeln!(
        out,
        "{:<22}{:>16}{:>20}",
        interval_label,
        format!("[{:.2}, {:.2}]", s.average_effect_lower, s.average_effect_upper),
        format!("[{:.2}, {:.2}]", s.cumulative_effect_lower, s.cumulative_effect_upper),
    );
    let _ = writeln!(
        out,
        "{:<22}{:>15.1}%{:>20}",
        "Relative effect",
        s.relative_effect,
        format!("[{:.1}%, {:.1}%]", s.relative_effect_lower, s.relative_effect_upper),
    );
    let _ = writeln!(out, "\nTwo-sided tail probability: p = {:.4}", s.tail_probability);
    let _ = writeln!(
        out,
        "Effect detected at the {:.0}% significance level: {}",
        s.significance_threshold * 100.0,
        if s.significant { "yes" } else { "no" }
    );
    out
}

fn render_narrative(report: &EffectReport) -> String {
    let s = &report.summary;
    let ci = (s.confidence_level * 100.0).round();
    let mut out = String::new();

    let _ = write!(
        out,
        "Over the {} observations following the intervention, the series averaged {:.2} \
         against a counterfactual expectation of {:.2} ({ci:.0}% interval for the average \
         effect: [{:.2}, {:.2}]). ",
        s.post_observations,
        s.average_observed,
        s.average_counterfactual,
        s.average_effect_lower,
        s.average_effect_upper,
    );
    let _ = write!(
        out,
        "Summed over the window, the observed total of {:.2} compares to an expected {:.2}, \
         an absolute effect of {:.2} ({ci:.0}% interval: [{:.2}, {:.2}]). ",
        s.cumulative_observed,
        s.cumulative_counterfactual,
        s.cumulative_effect,
        s.cumulative_effect_lower,
        s.cumulative_effect_upper,
    );
    if s.relative_effect.is_nan() {
        let _ = write!(
            out,
            "A relative effect is undefined here because the counterfactual sums to \
             approximately zero. "
        );
    } else {
        let _ = write!(
            out,
            "In relative terms the series moved {:+.1}% ({ci:.0}% interval: [{:+.1}%, \
             {:+.1}%]). ",
            s.relative_effect, s.relative_effect_lower, s.relative_effect_upper,
        );
    }
    let _ = write!(
        out,
        "The two-sided probability of a cumulative divergence at least this large under the \
         counterfactual is p = {:.4}; the effect is{} statistically significant at the \
         {:.0}% level.",
        s.tail_probability,
        if s.significant { "" } else { " not" },
        s.significance_threshold * 100.0,
    );
    out
}
