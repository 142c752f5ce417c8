//! Sales charts rendered with Plotters
//!
//! Charts carry no text (captions, tick labels, legends) so they render
//! without a font backend. Colours identify the series instead.

use plotters::prelude::*;
use std::path::Path;

use crate::decompose::Decomposition;
use crate::forecast::SalesForecast;
use crate::series::DailySeries;

const HISTORY_COLOR: RGBColor = BLUE;
const FORECAST_COLOR: RGBColor = RED;
const BOUNDARY_COLOR: RGBColor = RGBColor(160, 160, 160);

/// Overlay the observed daily sales (blue) and the forecast (red) on one
/// time axis. A grey vertical line marks the first forecast day.
///
/// # Arguments
/// * `history` - Observed daily series, must not be empty
/// * `forecast` - Forecast to append, if the stage succeeded
/// * `output_path` - Path of the PNG to write
pub fn create_forecast_plot(
    history: &DailySeries,
    forecast: Option<&SalesForecast>,
    output_path: impl AsRef<Path>,
) -> crate::Result<()> {
    if history.is_empty() {
        anyhow::bail!("no daily sales to plot");
    }

    let observed: Vec<(f64, f64)> = history
        .values()
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect();
    let start = history.len() as f64;
    let projected: Vec<(f64, f64)> = forecast
        .map(|f| {
            f.points
                .iter()
                .enumerate()
                .map(|(i, p)| (start + i as f64, p.forecasted_sales))
                .collect()
        })
        .unwrap_or_default();

    let x_end = start + projected.len() as f64;
    let (y_min, y_max) = value_bounds(observed.iter().chain(projected.iter()).map(|&(_, y)| y));

    let path = output_path.as_ref();
    let root = BitMapBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(0f64..x_end.max(1.0), y_min..y_max)?;

    chart.draw_series(LineSeries::new(observed, HISTORY_COLOR.stroke_width(2)))?;
    if !projected.is_empty() {
        chart.draw_series(LineSeries::new(
            vec![(start, y_min), (start, y_max)],
            BOUNDARY_COLOR.stroke_width(1),
        ))?;
        chart.draw_series(LineSeries::new(projected, FORECAST_COLOR.stroke_width(2)))?;
    }

    root.present()?;
    tracing::info!(path = %path.display(), "forecast plot saved");
    Ok(())
}

/// Trend, seasonal and residual components stacked top to bottom.
pub fn create_decomposition_plot(
    decomposition: &Decomposition,
    output_path: impl AsRef<Path>,
) -> crate::Result<()> {
    if decomposition.is_empty() {
        anyhow::bail!("empty decomposition");
    }

    let path = output_path.as_ref();
    let root = BitMapBackend::new(path, (1000, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let panels = root.split_evenly((3, 1));
    let components = [
        (&decomposition.trend, BLUE),
        (&decomposition.seasonal, GREEN),
        (&decomposition.residual, MAGENTA),
    ];
    let x_end = decomposition.len() as f64;

    for (panel, (values, color)) in panels.iter().zip(components.iter()) {
        let (y_min, y_max) = value_bounds(values.iter().copied());
        let mut chart = ChartBuilder::on(panel)
            .margin(15)
            .build_cartesian_2d(0f64..x_end, y_min..y_max)?;

        if y_min <= 0.0 && 0.0 <= y_max {
            chart.draw_series(LineSeries::new(
                vec![(0.0, 0.0), (x_end, 0.0)],
                BOUNDARY_COLOR.stroke_width(1),
            ))?;
        }
        chart.draw_series(LineSeries::new(
            values.iter().enumerate().map(|(i, &v)| (i as f64, v)),
            color.stroke_width(2),
        ))?;
    }

    root.present()?;
    tracing::info!(path = %path.display(), "decomposition plot saved");
    Ok(())
}

/// Padded y-range covering every value; never empty.
fn value_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return (0.0, 1.0);
    }

    let pad = ((max - min) * 0.05).max(1.0);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompose::decompose;
    use crate::forecast::forecast_sales;
    use crate::series::{DailySalesPoint, WEEKLY_PERIOD};
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    fn create_test_series() -> DailySeries {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        DailySeries::from_points((0..28).map(|i| DailySalesPoint {
            date: start + Duration::days(i),
            total_sales: 300.0 + [0.0, 20.0, -15.0, 10.0, 35.0, -25.0, 5.0][(i % 7) as usize],
        }))
    }

    #[test]
    fn test_create_forecast_plot() {
        let series = create_test_series();
        let forecast = forecast_sales(&series, WEEKLY_PERIOD, 14).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("forecast.png");

        create_forecast_plot(&series, Some(&forecast), &output_path).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_plot_history_only() {
        let series = create_test_series();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("history.png");

        create_forecast_plot(&series, None, &output_path).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_empty_history_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("empty.png");
        assert!(create_forecast_plot(&DailySeries::default(), None, &output_path).is_err());
        assert!(!output_path.exists());
    }

    #[test]
    fn test_create_decomposition_plot() {
        let decomposition = decompose(&create_test_series(), WEEKLY_PERIOD).unwrap();
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("components.png");

        create_decomposition_plot(&decomposition, &output_path).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_value_bounds() {
        assert_eq!(value_bounds(std::iter::empty()), (0.0, 1.0));
        assert_eq!(value_bounds(vec![5.0, 5.0].into_iter()), (4.0, 6.0));
        let (lo, hi) = value_bounds(vec![0.0, 100.0].into_iter());
        assert_eq!((lo, hi), (-5.0, 105.0));
    }
}
