// Series domain model - Samples, per-parameter series and the category-keyed store
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Atmospheric,
    Hydrological,
    Oceanic,
    Environmental,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Atmospheric => "atmospheric",
            Category::Hydrological => "hydrological",
            Category::Oceanic => "oceanic",
            Category::Environmental => "environmental",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known parameter with its display unit and home category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterInfo {
    pub name: &'static str,
    pub category: Category,
    pub unit: &'static str,
}

const fn param(name: &'static str, category: Category, unit: &'static str) -> ParameterInfo {
    ParameterInfo { name, category, unit }
}

static PARAMETERS: &[ParameterInfo] = &[
    param("temperature_2m", Category::Atmospheric, "°C"),
    param("apparent_temperature", Category::Atmospheric, "°C"),
    param("dew_point_2m", Category::Atmospheric, "°C"),
    param("relative_humidity_2m", Category::Atmospheric, "%"),
    param("wind_speed_10m", Category::Atmospheric, "km/h"),
    param("wind_speed_80m", Category::Atmospheric, "km/h"),
    param("wind_gusts_10m", Category::Atmospheric, "km/h"),
    param("wind_direction_10m", Category::Atmospheric, "°"),
    param("wind_direction_80m", Category::Atmospheric, "°"),
    param("cloud_cover", Category::Atmospheric, "%"),
    param("visibility", Category::Atmospheric, "m"),
    param("uv_index", Category::Atmospheric, "index"),
    param("rain", Category::Hydrological, "mm"),
    param("precipitation", Category::Hydrological, "mm"),
    param("snowfall", Category::Hydrological, "cm"),
    param("pressure_msl", Category::Hydrological, "hPa"),
    param("surface_pressure", Category::Hydrological, "hPa"),
    param("wave_height", Category::Oceanic, "m"),
    param("sea_surface_temperature", Category::Oceanic, "°C"),
    param("ocean_current_velocity", Category::Oceanic, "km/h"),
    param("pm2_5", Category::Environmental, "μg/m³"),
    param("pm10", Category::Environmental, "μg/m³"),
    param("ozone", Category::Environmental, "ppb"),
    param("carbon_monoxide", Category::Environmental, "ppm"),
    param("nitrogen_dioxide", Category::Environmental, "ppb"),
    param("sulphur_dioxide", Category::Environmental, "ppb"),
];

/// Fallback chains: the first parameter with data is used.
pub const PRESSURE_PARAMETERS: [&str; 2] = ["pressure_msl", "surface_pressure"];
pub const WIND_PARAMETERS: [&str; 2] = ["wind_speed_10m", "wind_speed_80m"];
pub const RAIN_PARAMETERS: [&str; 2] = ["rain", "precipitation"];

pub fn parameter_info(name: &str) -> Option<&'static ParameterInfo> {
    PARAMETERS.iter().find(|p| p.name == name)
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("timestamp {timestamp} for {parameter} is not after the previous sample ({previous})")]
    NonIncreasingTimestamp {
        parameter: String,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },
    #[error("parameter {parameter} already belongs to {owner}, cannot ingest it under {requested}")]
    CategoryConflict {
        parameter: String,
        owner: Category,
        requested: Category,
    },
}

/// One observation: a timestamp plus whatever parameters were reported at it.
/// `null` in the payload is a missing value, distinct from `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
}

#[cfg(test)]
impl Sample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, parameter: &str, value: Option<f64>) -> Self {
        self.values.insert(parameter.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSeries {
    name: String,
    points: Vec<SeriesPoint>,
}

impl ParameterSeries {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Build a series on an hourly grid, for tests.
    #[cfg(test)]
    pub fn hourly(name: &str, values: &[Option<f64>]) -> Self {
        let start = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid epoch");
        let mut series = Self::new(name);
        for (i, value) in values.iter().enumerate() {
            series
                .push(start + chrono::Duration::hours(i as i64), *value)
                .expect("hourly grid is increasing");
        }
        series
    }

    pub fn push(&mut self, timestamp: DateTime<Utc>, value: Option<f64>) -> Result<(), SeriesError> {
        if let Some(last) = self.points.last() {
            if timestamp <= last.timestamp {
                return Err(SeriesError::NonIncreasingTimestamp {
                    parameter: self.name.clone(),
                    timestamp,
                    previous: last.timestamp,
                });
            }
        }
        // NaN and infinities would poison every aggregate downstream
        let value = value.filter(|v| v.is_finite());
        self.points.push(SeriesPoint { timestamp, value });
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn missing_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    /// Non-missing values in time order.
    pub fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.value)
    }
}

/// Aligned series for every observed parameter, keyed by category.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    categories: BTreeMap<Category, BTreeMap<String, ParameterSeries>>,
    owners: BTreeMap<String, Category>,
    sample_count: usize,
    rejected_points: usize,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grouped(grouped: BTreeMap<Category, Vec<Sample>>) -> Self {
        let mut store = Self::new();
        for (category, samples) in grouped {
            store.ingest(category, samples);
        }
        store
    }

    /// Append a batch of samples to `category`. Points that would break a series
    /// invariant are counted and skipped; ingestion itself never fails.
    pub fn ingest(&mut self, category: Category, samples: impl IntoIterator<Item = Sample>) {
        let mut samples: Vec<Sample> = samples.into_iter().collect();
        samples.sort_by_key(|s| s.timestamp);
        self.sample_count += samples.len();

        let mut reported = BTreeSet::new();
        for sample in samples {
            for (parameter, value) in sample.values {
                if let Err(e) = self.push_point(category, &parameter, sample.timestamp, value) {
                    self.rejected_points += 1;
                    if reported.insert(parameter.clone()) {
                        tracing::warn!("Rejected sample point for {}: {}", parameter, e);
                    }
                }
            }
        }
    }

    fn push_point(
        &mut self,
        category: Category,
        parameter: &str,
        timestamp: DateTime<Utc>,
        value: Option<f64>,
    ) -> Result<(), SeriesError> {
        match self.owners.get(parameter) {
            Some(owner) if *owner != category => {
                return Err(SeriesError::CategoryConflict {
                    parameter: parameter.to_string(),
                    owner: *owner,
                    requested: category,
                });
            }
            Some(_) => {}
            None => {
                if let Some(info) = parameter_info(parameter) {
                    if info.category != category {
                        tracing::debug!(
                            "Parameter {} ingested under {} (registry lists {})",
                            parameter, category, info.category
                        );
                    }
                }
                self.owners.insert(parameter.to_string(), category);
            }
        }

        self.categories
            .entry(category)
            .or_default()
            .entry(parameter.to_string())
            .or_insert_with(|| ParameterSeries::new(parameter))
            .push(timestamp, value)
    }

    pub fn categories(&self) -> impl Iterator<Item = (Category, &BTreeMap<String, ParameterSeries>)> {
        self.categories.iter().map(|(c, s)| (*c, s))
    }

    #[cfg(test)]
    pub fn series(&self, parameter: &str) -> Option<&ParameterSeries> {
        let category = self.owners.get(parameter)?;
        self.categories.get(category)?.get(parameter)
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn parameter_count(&self) -> usize {
        self.owners.len()
    }

    pub fn missing_values(&self) -> usize {
        self.categories
            .values()
            .flat_map(|params| params.values())
            .map(ParameterSeries::missing_count)
            .sum()
    }

    pub fn total_points(&self) -> usize {
        self.categories
            .values()
            .flat_map(|params| params.values())
            .map(ParameterSeries::len)
            .sum()
    }

    pub fn rejected_points(&self) -> usize {
        self.rejected_points
    }
}
