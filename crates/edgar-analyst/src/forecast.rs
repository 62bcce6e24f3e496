//! Linear revenue forecast

use crate::metrics::MetricSeries;
use serde::{Deserialize, Serialize};

/// Number of projected years
pub const FORECAST_HORIZON: i32 = 3;

/// Projected revenue for the years following the last observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub method: String,
    pub forecast_years: Vec<i32>,
    pub forecast_revenue: Vec<f64>,
    pub slope: f64,
    pub intercept: f64,
}

impl Forecast {
    /// Revenue projected for the first forecast year
    pub fn next_revenue(&self) -> Option<f64> {
        self.forecast_revenue.first().copied()
    }
}

/// Ordinary least squares fit `y = slope * x + intercept`
fn fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    (slope.is_finite() && intercept.is_finite()).then_some((slope, intercept))
}

/// Fit revenue against fiscal year and project three years ahead
///
/// Falls back to ordinal positions as the regressor when fiscal years
/// repeat; projected years still follow the last observed year. Returns `None`
/// with fewer than two revenue points or a degenerate fit.
pub fn forecast(series: &MetricSeries) -> Option<Forecast> {
    let points = series.revenue_points();
    if points.len() < 2 {
        return None;
    }

    let years_distinct = points.windows(2).all(|w| w[0].0 < w[1].0);
    let xs: Vec<f64> = if years_distinct {
        points.iter().map(|(year, _)| f64::from(*year)).collect()
    } else {
        (0..points.len()).map(|i| i as f64).collect()
    };
    let ys: Vec<f64> = points.iter().map(|(_, revenue)| *revenue).collect();

    let (slope, intercept) = fit(&xs, &ys)?;
    let last_x = *xs.last()?;
    let last_year = points.last()?.0;

    let (forecast_years, forecast_revenue) = (1..=FORECAST_HORIZON)
        .map(|step| {
            let x = last_x + f64::from(step);
            (last_year + step, slope * x + intercept)
        })
        .unzip();

    Some(Forecast {
        method: "linear_regression".to_string(),
        forecast_years,
        forecast_revenue,
        slope,
        intercept,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{FinancialFigures, MetricSnapshot, MetricSource};

    fn series(points: &[(i32, f64)]) -> MetricSeries {
        let snapshots = points
            .iter()
            .map(|&(year, revenue)| {
                MetricSnapshot::from_figures(
                    year,
                    FinancialFigures {
                        revenue: Some(revenue),
                        ..FinancialFigures::default()
                    },
                )
            })
            .collect();
        MetricSeries::new("TEST", MetricSource::Csv, snapshots, None)
    }

    #[test]
    fn test_linear_fit_recovers_slope() {
        let data: Vec<(i32, f64)> = (2018..=2023).map(|x| (x, 2.0 * f64::from(x) + 10.0)).collect();
        let forecast = forecast(&series(&data)).unwrap();

        assert!((forecast.slope - 2.0).abs() < 1e-6);
        assert_eq!(forecast.forecast_years, vec![2024, 2025, 2026]);
        assert!((forecast.forecast_revenue[0] - 4058.0).abs() < 1e-6);
        assert_eq!(forecast.method, "linear_regression");
    }

    #[test]
    fn test_undefined_for_short_series() {
        assert!(forecast(&series(&[])).is_none());
        assert!(forecast(&series(&[(2023, 100.0)])).is_none());
    }

    #[test]
    fn test_two_points_suffice() {
        let forecast = forecast(&series(&[(2022, 100.0), (2023, 110.0)])).unwrap();
        assert!((forecast.slope - 10.0).abs() < 1e-9);
        assert_eq!(forecast.next_revenue().map(f64::round), Some(120.0));
    }

    #[test]
    fn test_repeated_years_use_ordinal_positions() {
        let forecast = forecast(&series(&[(2023, 100.0), (2023, 120.0)])).unwrap();
        assert!((forecast.slope - 20.0).abs() < 1e-9);
        assert_eq!(forecast.forecast_years, vec![2024, 2025, 2026]);
        assert!((forecast.forecast_revenue[0] - 140.0).abs() < 1e-9);
    }
}
