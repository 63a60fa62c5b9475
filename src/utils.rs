#[cfg(feature = "python-bindings")]
use ndarray::Array1;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::impact::core::{
    options::{
        DEFAULT_CONFIDENCE_LEVEL, DEFAULT_DIFFUSE_SCALE, DEFAULT_MIN_PRE_PERIOD_LENGTH,
        DEFAULT_SIGNIFICANCE_THRESHOLD, ImpactOptions, VarianceGuards,
    },
    series::TimeSeries,
};

#[cfg(feature = "python-bindings")]
use crate::optimization::mle::MLEOptions;

#[cfg(feature = "python-bindings")]
use numpy::{
    IntoPyArray,    // Vec → PyArray
    PyArrayMethods, // .readonly()
    PyReadonlyArray1,
};

/// Coerce a Python object into a contiguous 1-D float64 array.
///
/// Accepts a numpy array directly, anything with a `to_numpy()` method
/// (pandas series), or a plain sequence of floats copied into a fresh
/// array.
#[cfg(feature = "python-bindings")]
#[inline]
pub fn extract_f64_array<'py>(
    py: Python<'py>, raw_data: &Bound<'py, PyAny>,
) -> PyResult<PyReadonlyArray1<'py, f64>> {
    if let Ok(arr_ro) = raw_data.extract::<PyReadonlyArray1<f64>>() {
        if arr_ro.as_slice().is_ok() {
            return Ok(arr_ro);
        }
    }

    if let Ok(obj) = raw_data.call_method("to_numpy", (false,), None) {
        if let Ok(series_ro) = obj.extract::<PyReadonlyArray1<f64>>() {
            if series_ro.as_slice().is_ok() {
                return Ok(series_ro);
            }
        }
    }

    let vec: Vec<f64> = raw_data.extract().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(
            "expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64",
        )
    })?;
    Ok(vec.into_pyarray(py).readonly())
}

/// Build a validated [`TimeSeries`] from Python values and optional
/// timestamps.
///
/// When `timestamps` is `None` the observations are indexed `0..n`, so
/// window bounds are plain indices.
#[cfg(feature = "python-bindings")]
pub fn extract_time_series<'py>(
    py: Python<'py>, values: &Bound<'py, PyAny>, timestamps: Option<&Bound<'py, PyAny>>,
) -> PyResult<TimeSeries> {
    let values_arr = extract_f64_array(py, values)?;
    let values_slice = values_arr.as_slice().map_err(|_| {
        PyValueError::new_err("values must be a 1-D contiguous float64 array or sequence")
    })?;
    let values_vec = Array1::from(values_slice.to_vec());

    let series = match timestamps {
        Some(raw) => {
            let ts: Vec<i64> = raw.extract().map_err(|_| {
                PyValueError::new_err("timestamps must be a sequence of integers")
            })?;
            TimeSeries::new(ts, values_vec)
        }
        None => TimeSeries::from_values(values_vec),
    };
    series.map_err(Into::into)
}

/// Assemble validated [`ImpactOptions`] from the optional Python keywords,
/// applying the documented defaults for anything omitted.
#[cfg(feature = "python-bindings")]
pub fn extract_options(
    confidence_level: Option<f64>, trend: Option<bool>, seasonal_period: Option<usize>,
    min_pre_period_length: Option<usize>, significance_threshold: Option<f64>,
) -> PyResult<ImpactOptions> {
    let options = ImpactOptions::new(
        confidence_level.unwrap_or(DEFAULT_CONFIDENCE_LEVEL),
        trend.unwrap_or(false),
        seasonal_period,
        min_pre_period_length.unwrap_or(DEFAULT_MIN_PRE_PERIOD_LENGTH),
        significance_threshold.unwrap_or(DEFAULT_SIGNIFICANCE_THRESHOLD),
        MLEOptions::default(),
        VarianceGuards::default(),
        DEFAULT_DIFFUSE_SCALE,
    )?;
    Ok(options)
}
