//! Additive Holt-Winters forecasting of daily sales

use chrono::{Duration, NaiveDate};
use ndarray::Array1;

use crate::error::AnalysisError;
use crate::metric::Metric;
use crate::series::DailySeries;

/// Grid resolution for the coarse parameter search (steps of 0.1).
const GRID_STEPS: usize = 10;

/// Pattern search stops once the step shrinks below this.
const MIN_STEP: f64 = 1e-4;

const MAX_REFINEMENT_ROUNDS: usize = 500;

/// Smoothing coefficients for level (`alpha`), trend (`beta`) and season (`gamma`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingParams {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl SmoothingParams {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Result<Self, AnalysisError> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(Self { alpha, beta, gamma })
    }

    fn neighbours(self, step: f64) -> [SmoothingParams; 6] {
        let clamp = |v: f64| v.clamp(0.0, 1.0);
        [
            Self { alpha: clamp(self.alpha + step), ..self },
            Self { alpha: clamp(self.alpha - step), ..self },
            Self { beta: clamp(self.beta + step), ..self },
            Self { beta: clamp(self.beta - step), ..self },
            Self { gamma: clamp(self.gamma + step), ..self },
            Self { gamma: clamp(self.gamma - step), ..self },
        ]
    }
}

/// Level, trend and one seasonal slot per phase. Slot `t % period` holds
/// the seasonal term last updated at a time congruent to `t`.
#[derive(Debug, Clone, PartialEq)]
struct SmoothingState {
    level: f64,
    trend: f64,
    seasonal: Vec<f64>,
}

impl SmoothingState {
    /// State at t = -1, estimated from the first two seasons.
    ///
    /// The trend is the per-step change between the two seasonal means; the
    /// level is the first season's mean moved back to t = -1 along that trend;
    /// each seasonal slot is the first season's deviation from the trend line.
    fn initial(values: &[f64], period: usize) -> Self {
        let p = period as f64;
        let first_mean = values[..period].iter().sum::<f64>() / p;
        let second_mean = values[period..2 * period].iter().sum::<f64>() / p;

        let trend = (second_mean - first_mean) / p;
        let level = first_mean - (p + 1.0) / 2.0 * trend;
        let seasonal = values[..period]
            .iter()
            .enumerate()
            .map(|(j, &y)| y - (level + (j as f64 + 1.0) * trend))
            .collect();

        Self { level, trend, seasonal }
    }

    /// Consume observation `y` at time `t`; returns its one-step-ahead fit.
    fn step(&mut self, t: usize, y: f64, params: &SmoothingParams) -> f64 {
        let slot = t % self.seasonal.len();
        let previous_seasonal = self.seasonal[slot];
        let fitted = self.level + self.trend + previous_seasonal;

        let level = params.alpha * (y - previous_seasonal)
            + (1.0 - params.alpha) * (self.level + self.trend);
        let trend = params.beta * (level - self.level) + (1.0 - params.beta) * self.trend;
        self.seasonal[slot] =
            params.gamma * (y - level) + (1.0 - params.gamma) * previous_seasonal;
        self.level = level;
        self.trend = trend;

        fitted
    }
}

fn sum_squared_errors(values: &[f64], initial: &SmoothingState, params: &SmoothingParams) -> f64 {
    let mut state = initial.clone();
    values
        .iter()
        .enumerate()
        .map(|(t, &y)| {
            let fitted = state.step(t, y, params);
            (y - fitted).powi(2)
        })
        .sum()
}

/// Minimise in-sample SSE: a coarse grid over [0, 1]^3, then a pattern
/// search around the best grid point with a halving step.
fn optimize_params(values: &[f64], initial: &SmoothingState) -> SmoothingParams {
    let grid: Vec<f64> = (0..=GRID_STEPS)
        .map(|i| i as f64 / GRID_STEPS as f64)
        .collect();

    let mut best = SmoothingParams { alpha: 0.0, beta: 0.0, gamma: 0.0 };
    let mut best_sse = f64::INFINITY;
    for &alpha in &grid {
        for &beta in &grid {
            for &gamma in &grid {
                let candidate = SmoothingParams { alpha, beta, gamma };
                let sse = sum_squared_errors(values, initial, &candidate);
                if sse < best_sse {
                    best = candidate;
                    best_sse = sse;
                }
            }
        }
    }

    let mut step = 0.5 / GRID_STEPS as f64;
    let mut rounds = 0;
    while step > MIN_STEP && rounds < MAX_REFINEMENT_ROUNDS {
        rounds += 1;
        let mut improved = false;
        for candidate in best.neighbours(step) {
            let sse = sum_squared_errors(values, initial, &candidate);
            if sse < best_sse {
                best = candidate;
                best_sse = sse;
                improved = true;
            }
        }
        if !improved {
            step /= 2.0;
        }
    }

    tracing::debug!(
        alpha = best.alpha,
        beta = best.beta,
        gamma = best.gamma,
        sse = best_sse,
        rounds,
        "selected smoothing parameters"
    );
    best
}

/// A fitted additive-trend, additive-seasonal exponential smoothing model.
#[derive(Debug, Clone, PartialEq)]
pub struct HoltWinters {
    params: SmoothingParams,
    period: usize,
    state: SmoothingState,
    fitted: Array1<f64>,
}

impl HoltWinters {
    /// Fit with coefficients chosen to minimise in-sample squared error.
    pub fn fit(values: &Array1<f64>, period: usize) -> Result<Self, AnalysisError> {
        let values = check_length(values, period)?;
        let initial = SmoothingState::initial(&values, period);
        let params = optimize_params(&values, &initial);
        Ok(Self::run(&values, period, params, initial))
    }

    /// Fit with fixed coefficients.
    pub fn fit_with_params(
        values: &Array1<f64>,
        period: usize,
        params: SmoothingParams,
    ) -> Result<Self, AnalysisError> {
        let params = SmoothingParams::new(params.alpha, params.beta, params.gamma)?;
        let values = check_length(values, period)?;
        let initial = SmoothingState::initial(&values, period);
        Ok(Self::run(&values, period, params, initial))
    }

    fn run(values: &[f64], period: usize, params: SmoothingParams, initial: SmoothingState) -> Self {
        let mut state = initial;
        let fitted: Array1<f64> = values
            .iter()
            .enumerate()
            .map(|(t, &y)| state.step(t, y, &params))
            .collect();

        Self {
            params,
            period,
            state,
            fitted,
        }
    }

    /// Point forecasts for the `horizon` steps after the last observation:
    /// `level + h * trend + seasonal` of the matching phase.
    pub fn forecast(&self, horizon: usize) -> Array1<f64> {
        let last = self.fitted.len() - 1;
        (1..=horizon)
            .map(|h| {
                let slot = (last + h) % self.period;
                self.state.level + h as f64 * self.state.trend + self.state.seasonal[slot]
            })
            .collect()
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// One-step-ahead fitted value for every observation, in order.
    pub fn fitted_values(&self) -> &Array1<f64> {
        &self.fitted
    }
}

fn check_length(values: &Array1<f64>, period: usize) -> Result<Vec<f64>, AnalysisError> {
    if period < 2 {
        return Err(AnalysisError::InvalidConfig(format!(
            "seasonal period must be at least 2, got {}",
            period
        )));
    }
    let required = 2 * period;
    if values.len() < required {
        return Err(AnalysisError::InsufficientData {
            stage: "sales forecast",
            required,
            actual: values.len(),
        });
    }
    Ok(values.to_vec())
}

/// In-sample accuracy of the fitted values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastMetrics {
    pub rmse: f64,
    pub mae: f64,
    /// `1 - MAE / mean(observed)`. Not clamped: negative when the MAE exceeds
    /// the mean, undefined when the mean is zero.
    pub confidence: Metric,
}

impl ForecastMetrics {
    pub fn evaluate(observed: &Array1<f64>, fitted: &Array1<f64>) -> Self {
        let n = observed.len().max(1) as f64;
        let errors = observed - fitted;
        let rmse = (errors.mapv(|e| e * e).sum() / n).sqrt();
        let mae = errors.mapv(f64::abs).sum() / n;
        let mean_observed = Metric::mean(observed.iter().copied());

        let confidence = match mean_observed {
            Metric::Defined(mean) => Metric::ratio(mae, mean).map(|r| 1.0 - r),
            Metric::Undefined => Metric::Undefined,
        };

        Self { rmse, mae, confidence }
    }

    pub fn confidence_pct(&self) -> Metric {
        self.confidence.map(|c| c * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecasted_sales: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesForecast {
    /// Contiguous daily points starting the day after the last observation.
    pub points: Vec<ForecastPoint>,
    pub metrics: ForecastMetrics,
    pub params: SmoothingParams,
    pub fitted: Array1<f64>,
}

impl SalesForecast {
    pub fn mean_forecast(&self) -> Metric {
        Metric::mean(self.points.iter().map(|p| p.forecasted_sales))
    }
}

/// Fit the model to `series` and project `horizon` days past its last date.
pub fn forecast_sales(
    series: &DailySeries,
    period: usize,
    horizon: usize,
) -> Result<SalesForecast, AnalysisError> {
    let observed = series.values();
    let model = HoltWinters::fit(&observed, period)?;

    let last_date = series.last_date().ok_or(AnalysisError::InsufficientData {
        stage: "sales forecast",
        required: 2 * period,
        actual: 0,
    })?;

    let points = model
        .forecast(horizon)
        .iter()
        .enumerate()
        .map(|(i, &value)| ForecastPoint {
            date: last_date + Duration::days(i as i64 + 1),
            forecasted_sales: value,
        })
        .collect();

    let metrics = ForecastMetrics::evaluate(&observed, model.fitted_values());
    tracing::debug!(rmse = metrics.rmse, mae = metrics.mae, horizon, "forecast complete");

    Ok(SalesForecast {
        points,
        metrics,
        params: model.params(),
        fitted: model.fitted_values().clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{DailySalesPoint, WEEKLY_PERIOD};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn series_from(values: &[f64]) -> DailySeries {
        DailySeries::from_points(values.iter().enumerate().map(|(i, &v)| DailySalesPoint {
            date: start() + Duration::days(i as i64),
            total_sales: v,
        }))
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_constant_series_forecasts_constant() {
        let forecast = forecast_sales(&series_from(&[100.0; 21]), WEEKLY_PERIOD, 30).unwrap();

        assert_eq!(forecast.points.len(), 30);
        for point in &forecast.points {
            assert_close(point.forecasted_sales, 100.0, 1e-6);
        }
        assert_close(forecast.metrics.rmse, 0.0, 1e-6);
        assert_close(forecast.metrics.mae, 0.0, 1e-6);
        assert_close(forecast.metrics.confidence.value().unwrap(), 1.0, 1e-6);
    }

    #[test]
    fn test_forecast_dates_are_contiguous() {
        let values: Vec<f64> = (0..20).map(|i| 50.0 + (i % 7) as f64 * 3.0).collect();
        let series = series_from(&values);
        let forecast = forecast_sales(&series, WEEKLY_PERIOD, 10).unwrap();

        assert_eq!(forecast.points.len(), 10);
        let last = series.last_date().unwrap();
        assert_eq!(forecast.points[0].date, last + Duration::days(1));
        for pair in forecast.points.windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
    }

    #[test]
    fn test_too_few_points_is_insufficient() {
        let err = forecast_sales(&series_from(&[10.0; 13]), WEEKLY_PERIOD, 30).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientData {
                stage: "sales forecast",
                required: 14,
                actual: 13,
            }
        );
    }

    #[test]
    fn test_linear_trend_is_extended() {
        let values: Vec<f64> = (0..28).map(|i| 10.0 + 2.0 * i as f64).collect();
        let forecast = forecast_sales(&series_from(&values), WEEKLY_PERIOD, 5).unwrap();

        for (h, point) in forecast.points.iter().enumerate() {
            assert_close(point.forecasted_sales, 10.0 + 2.0 * (28 + h) as f64, 1e-6);
        }
        assert_close(forecast.metrics.mae, 0.0, 1e-6);
    }

    #[test]
    fn test_weekly_pattern_repeats_in_forecast() {
        let pattern = [100.0, 120.0, 90.0, 110.0, 130.0, 95.0, 105.0];
        let values: Vec<f64> = pattern.iter().cycle().take(28).copied().collect();
        let forecast = forecast_sales(&series_from(&values), WEEKLY_PERIOD, 14).unwrap();

        for (h, point) in forecast.points.iter().enumerate() {
            assert_close(point.forecasted_sales, pattern[(28 + h) % 7], 1e-6);
        }
    }

    #[test]
    fn test_recurrence_with_fixed_params() {
        let values = Array1::from(vec![
            12.0, 15.0, 11.0, 14.0, 18.0, 20.0, 9.0, 13.0, 16.0, 12.0, 15.0, 19.0, 22.0, 10.0,
        ]);
        let params = SmoothingParams::new(0.5, 0.3, 0.2).unwrap();
        let model = HoltWinters::fit_with_params(&values, WEEKLY_PERIOD, params).unwrap();

        // Replay the recurrence by hand from the documented initial state.
        let first: f64 = values.iter().take(7).sum::<f64>() / 7.0;
        let second: f64 = values.iter().skip(7).sum::<f64>() / 7.0;
        let mut trend = (second - first) / 7.0;
        let mut level = first - 4.0 * trend;
        let mut seasonal: Vec<f64> = (0..7)
            .map(|j| values[j] - (level + (j as f64 + 1.0) * trend))
            .collect();

        for (t, &y) in values.iter().enumerate() {
            let s = seasonal[t % 7];
            assert_close(model.fitted_values()[t], level + trend + s, 1e-9);
            let new_level = 0.5 * (y - s) + 0.5 * (level + trend);
            trend = 0.3 * (new_level - level) + 0.7 * trend;
            seasonal[t % 7] = 0.2 * (y - new_level) + 0.8 * s;
            level = new_level;
        }

        let forecast = model.forecast(3);
        for h in 1..=3 {
            let expected = level + h as f64 * trend + seasonal[(13 + h) % 7];
            assert_close(forecast[h - 1], expected, 1e-9);
        }
    }

    #[test]
    fn test_optimized_fit_beats_fixed_params() {
        let values: Array1<f64> = (0..42)
            .map(|i| {
                let t = i as f64;
                80.0 + 0.8 * t + [5.0, -3.0, 8.0, -6.0, 2.0, 12.0, -18.0][i % 7]
                    + if i % 3 == 0 { 4.0 } else { -2.0 }
            })
            .collect();

        let tuned = HoltWinters::fit(&values, WEEKLY_PERIOD).unwrap();
        let fixed = HoltWinters::fit_with_params(
            &values,
            WEEKLY_PERIOD,
            SmoothingParams::new(0.3, 0.1, 0.2).unwrap(),
        )
        .unwrap();

        let tuned_metrics = ForecastMetrics::evaluate(&values, tuned.fitted_values());
        let fixed_metrics = ForecastMetrics::evaluate(&values, fixed.fitted_values());
        assert!(tuned_metrics.rmse <= fixed_metrics.rmse + 1e-12);
        assert!(tuned_metrics.mae <= tuned_metrics.rmse + 1e-12);
        assert_eq!(tuned.fitted_values().len(), values.len());

        let p = tuned.params();
        for v in [p.alpha, p.beta, p.gamma] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_confidence_is_not_clamped() {
        let observed = Array1::from(vec![1.0, 1.0, 1.0, 1.0]);
        let fitted = Array1::from(vec![5.0, 5.0, 5.0, 5.0]);
        let metrics = ForecastMetrics::evaluate(&observed, &fitted);
        assert_close(metrics.mae, 4.0, 1e-12);
        assert_close(metrics.rmse, 4.0, 1e-12);
        assert_eq!(metrics.confidence, Metric::Defined(-3.0));
        assert_eq!(metrics.confidence_pct(), Metric::Defined(-300.0));
    }

    #[test]
    fn test_zero_mean_confidence_is_undefined() {
        let zeros = Array1::zeros(14);
        let metrics = ForecastMetrics::evaluate(&zeros, &zeros);
        assert_eq!(metrics.confidence, Metric::Undefined);
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(SmoothingParams::new(1.5, 0.1, 0.1).is_err());
        assert!(SmoothingParams::new(0.5, -0.1, 0.1).is_err());
        assert!(SmoothingParams::new(1.0, 0.0, 1.0).is_ok());
    }
}
