// Statistics domain model - Per-parameter summaries and slope-based trend classification
use super::series::{parameter_info, ParameterSeries};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_TREND_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

/// Read-only summary of one parameter series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistic {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub trend: Trend,
    /// Number of non-missing points the summary was computed from.
    #[serde(default)]
    pub count: usize,
    /// Sum of the non-missing values (accumulated rainfall etc).
    #[serde(default)]
    pub total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("series {parameter} has no non-missing values")]
pub struct EmptySeriesError {
    pub parameter: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsComputer {
    epsilon: f64,
}

impl Default for StatisticsComputer {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_EPSILON)
    }
}

impl StatisticsComputer {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn compute(&self, series: &ParameterSeries) -> Result<Statistic, EmptySeriesError> {
        // missing points are dropped before numbering, so gaps do not stretch the x axis
        let present: Vec<(usize, f64)> = series.present().enumerate().collect();
        let Some(&(_, current)) = present.last() else {
            return Err(EmptySeriesError {
                parameter: series.name().to_string(),
            });
        };

        let (min, max, total) = present.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(min, max, total), &(_, v)| (min.min(v), max.max(v), total + v),
        );
        let mean = total / present.len() as f64;

        Ok(Statistic {
            current,
            min,
            max,
            mean,
            trend: self.classify_trend(&present, mean),
            count: present.len(),
            total,
            unit: parameter_info(series.name()).map(|p| p.unit.to_string()),
        })
    }

    /// Compare the least-squares slope against `epsilon * |mean|`, so the label
    /// does not depend on the unit the parameter is measured in.
    pub fn classify_trend(&self, points: &[(usize, f64)], mean: f64) -> Trend {
        let Some(slope) = least_squares_slope(points) else {
            return Trend::Stable;
        };

        let threshold = self.epsilon * mean.abs();
        if slope > threshold {
            Trend::Increasing
        } else if slope < -threshold {
            Trend::Decreasing
        } else {
            Trend::Stable
        }
    }
}

/// Ordinary least squares slope of value against sample index.
fn least_squares_slope(points: &[(usize, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let x_mean = points.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
    let y_mean = points.iter().map(|&(_, y)| y).sum::<f64>() / n;

    let (covariance, variance) = points.iter().fold((0.0, 0.0), |(cov, var), &(x, y)| {
        let dx = x as f64 - x_mean;
        (cov + dx * (y - y_mean), var + dx * dx)
    });

    if variance == 0.0 {
        return None;
    }
    Some(covariance / variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn compute(values: &[Option<f64>]) -> Result<Statistic, EmptySeriesError> {
        StatisticsComputer::default().compute(&ParameterSeries::hourly("temperature_2m", values))
    }

    #[test]
    fn test_summary_skips_missing_values() {
        let stat = compute(&[Some(10.0), None, Some(30.0), Some(20.0), None]).unwrap();

        assert_eq!(stat.current, 20.0);
        assert_eq!(stat.min, 10.0);
        assert_eq!(stat.max, 30.0);
        assert_eq!(stat.mean, 20.0);
        assert_eq!(stat.count, 3);
        assert_eq!(stat.total, 60.0);
        assert_eq!(stat.unit.as_deref(), Some("°C"));
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let err = compute(&[None, None]).unwrap_err();
        assert_eq!(err.parameter, "temperature_2m");
        assert!(compute(&[]).is_err());
    }

    #[test]
    fn test_single_point_is_stable() {
        let stat = compute(&[Some(10.0)]).unwrap();
        assert_eq!(stat.trend, Trend::Stable);
        assert_eq!(stat.current, 10.0);
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(compute(&[Some(10.0), Some(12.0), Some(14.0)]).unwrap().trend, Trend::Increasing);
        assert_eq!(compute(&[Some(14.0), Some(12.0), Some(10.0)]).unwrap().trend, Trend::Decreasing);
        // slope 0.05 against a threshold of 0.01 * 1000
        assert_eq!(
            compute(&[Some(1000.0), Some(1000.05), Some(1000.1)]).unwrap().trend,
            Trend::Stable
        );
    }

    #[test]
    fn test_trend_numbers_present_points_without_gaps() {
        // 10 then 10.5 as consecutive present points: slope 0.5, threshold ~0.1025
        let gappy = compute(&[Some(10.0), None, None, None, None, Some(10.5)]).unwrap();
        assert_eq!(gappy.trend, Trend::Increasing);

        let dense = compute(&[Some(10.0), Some(10.5)]).unwrap();
        assert_eq!(dense.trend, gappy.trend);
    }

    #[test]
    fn test_zero_mean_uses_any_slope() {
        let stat = compute(&[Some(-1.0), Some(0.0), Some(1.0)]).unwrap();
        assert_eq!(stat.mean, 0.0);
        assert_eq!(stat.trend, Trend::Increasing);
    }

    proptest! {
        #[test]
        fn test_current_is_last_present_value(
            values in prop::collection::vec(prop::option::of(-1000.0f64..1000.0), 2..40)
        ) {
            let last = values.iter().rev().find_map(|v| *v);
            match compute(&values) {
                Ok(stat) => prop_assert_eq!(Some(stat.current), last),
                Err(_) => prop_assert!(last.is_none()),
            }
        }

        #[test]
        fn test_trend_is_scale_invariant(
            values in prop::collection::vec(1.0f64..100.0, 2..30),
            // powers of two scale exactly, so the comparison is not at the mercy of rounding
            exponent in -8i32..8,
        ) {
            let scale = 2f64.powi(exponent);
            let original: Vec<_> = values.iter().map(|v| Some(*v)).collect();
            let scaled: Vec<_> = values.iter().map(|v| Some(v * scale)).collect();

            prop_assert_eq!(compute(&original).unwrap().trend, compute(&scaled).unwrap().trend);
        }
    }
}
