//! Classical additive seasonal decomposition of the daily sales series

use chrono::NaiveDate;
use ndarray::Array1;

use crate::error::AnalysisError;
use crate::metric::Metric;
use crate::series::DailySeries;

/// Trend, seasonal and residual components aligned 1:1 with the input dates.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub period: usize,
    pub dates: Vec<NaiveDate>,
    pub observed: Array1<f64>,
    pub trend: Array1<f64>,
    pub seasonal: Array1<f64>,
    pub residual: Array1<f64>,
}

impl Decomposition {
    /// Seasonal offset for each phase of the period, starting at the first date.
    pub fn seasonal_indices(&self) -> Array1<f64> {
        self.seasonal.iter().take(self.period).copied().collect()
    }

    /// Display names for [`Self::seasonal_indices`].
    ///
    /// Weekday names only hold for a weekly period over consecutive calendar
    /// dates; a sparse series shifts the phases, so those are numbered instead.
    pub fn phase_labels(&self) -> Vec<String> {
        let consecutive = self
            .dates
            .windows(2)
            .all(|pair| (pair[1] - pair[0]).num_days() == 1);

        if self.period == 7 && consecutive {
            self.dates
                .iter()
                .take(self.period)
                .map(|date| date.format("%A").to_string())
                .collect()
        } else {
            (1..=self.period).map(|phase| format!("phase {}", phase)).collect()
        }
    }

    /// `trend + seasonal + residual`, equal to `observed` up to rounding.
    pub fn reconstruct(&self) -> Array1<f64> {
        &self.trend + &self.seasonal + &self.residual
    }

    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }
}

/// Decompose `series` into additive trend, seasonal and residual parts.
///
/// The trend is a centered moving average over one period (a 2×period
/// average for even periods). Dates at either end without a full window get
/// a linear extrapolation fitted to the `period` nearest trend values, so no
/// date is dropped. Needs at least two full periods.
pub fn decompose(series: &DailySeries, period: usize) -> Result<Decomposition, AnalysisError> {
    if period < 2 {
        return Err(AnalysisError::InvalidConfig(format!(
            "seasonal period must be at least 2, got {}",
            period
        )));
    }

    let observed = series.values();
    let n = observed.len();
    let required = 2 * period;
    if n < required {
        return Err(AnalysisError::InsufficientData {
            stage: "seasonal decomposition",
            required,
            actual: n,
        });
    }

    let trend = extrapolate_trend(&centered_moving_average(&observed, period), period);
    let detrended = &observed - &trend;

    let mut indices: Array1<f64> = (0..period)
        .map(|phase| {
            Metric::mean(detrended.iter().skip(phase).step_by(period).copied())
                .value()
                .unwrap_or(0.0)
        })
        .collect();
    let centre = indices.mean().unwrap_or(0.0);
    indices -= centre;

    let seasonal = Array1::from_shape_fn(n, |i| indices[i % period]);
    let residual = &observed - &trend - &seasonal;

    tracing::debug!(points = n, period, "decomposed daily series");
    Ok(Decomposition {
        period,
        dates: series.dates(),
        observed,
        trend,
        seasonal,
        residual,
    })
}

/// Centered moving average; `None` where the window would leave the series.
fn centered_moving_average(values: &Array1<f64>, period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let p = period as f64;

    let weights: Vec<f64> = if period % 2 == 1 {
        vec![1.0 / p; period]
    } else {
        let mut w = vec![1.0 / p; period + 1];
        w[0] = 0.5 / p;
        w[period] = 0.5 / p;
        w
    };

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return None;
            }
            let window_start = i - half;
            let average = weights
                .iter()
                .enumerate()
                .map(|(k, w)| w * values[window_start + k])
                .sum();
            Some(average)
        })
        .collect()
}

/// Fill the missing ends of a moving-average trend by least-squares lines
/// through the `npoints` closest defined values on each side.
fn extrapolate_trend(partial: &[Option<f64>], npoints: usize) -> Array1<f64> {
    let defined: Vec<(usize, f64)> = partial
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let (Some(&(first, _)), Some(&(last, _))) = (defined.first(), defined.last()) else {
        return Array1::zeros(partial.len());
    };

    let head = fit_line(&defined[..npoints.min(defined.len())]);
    let tail = fit_line(&defined[defined.len().saturating_sub(npoints)..]);

    Array1::from_shape_fn(partial.len(), |i| match partial[i] {
        Some(v) => v,
        None if i < first => head.at(i),
        None if i > last => tail.at(i),
        None => head.at(i),
    })
}

#[derive(Debug, Clone, Copy)]
struct Line {
    slope: f64,
    intercept: f64,
}

impl Line {
    fn at(self, x: usize) -> f64 {
        self.intercept + self.slope * x as f64
    }
}

fn fit_line(points: &[(usize, f64)]) -> Line {
    let n = points.len() as f64;
    if points.is_empty() {
        return Line { slope: 0.0, intercept: 0.0 };
    }

    let mean_x = points.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
    let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|&(x, _)| (x as f64 - mean_x).powi(2)).sum();
    let sxy: f64 = points
        .iter()
        .map(|&(x, y)| (x as f64 - mean_x) * (y - mean_y))
        .sum();

    if sxx == 0.0 {
        return Line { slope: 0.0, intercept: mean_y };
    }
    let slope = sxy / sxx;
    Line {
        slope,
        intercept: mean_y - slope * mean_x,
    }
}
