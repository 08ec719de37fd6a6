// Insight domain model - Ordered rule table mapping statistics and risks to text
use super::analysis::DataQuality;
use super::risk::{AirQualityCategory, CycloneLevel, RiskAssessment, RiskCategory, RiskKind};
use super::series::{Category, PRESSURE_PARAMETERS, RAIN_PARAMETERS, WIND_PARAMETERS};
use super::statistics::{Statistic, Trend};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub text: String,
    pub severity: Severity,
}

impl Insight {
    fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }
}

/// The physical finding a rule reports on. At most one insight per finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Finding {
    Cyclone,
    AirQuality,
    Heat,
    TemperatureTrend,
    TemperatureRange,
    Humidity,
    Wind,
    CloudCover,
    Rainfall,
    PressureTrend,
    PressureLevel,
    SeaSurface,
    Waves,
    Pm25,
    DataQuality,
    RejectedPoints,
}

struct Facts<'a> {
    statistics: &'a BTreeMap<Category, BTreeMap<String, Statistic>>,
    risks: &'a [RiskAssessment],
    quality: Option<&'a DataQuality>,
}

impl Facts<'_> {
    fn stat(&self, parameter: &str) -> Option<&Statistic> {
        self.statistics.values().find_map(|params| params.get(parameter))
    }

    fn first_stat(&self, parameters: &[&str]) -> Option<&Statistic> {
        parameters.iter().find_map(|p| self.stat(p))
    }

    fn risk(&self, kind: RiskKind) -> Option<&RiskAssessment> {
        self.risks.iter().find(|r| r.kind == kind)
    }

    fn cyclone_level(&self) -> Option<CycloneLevel> {
        match self.risk(RiskKind::Cyclone)?.category {
            RiskCategory::Cyclone(level) => Some(level),
            _ => None,
        }
    }

    fn air_quality(&self) -> Option<(AirQualityCategory, f64)> {
        let risk = self.risk(RiskKind::AirQuality)?;
        match (risk.category, risk.numeric_index) {
            (RiskCategory::AirQuality(category), Some(index)) => Some((category, index)),
            _ => None,
        }
    }
}

type RuleFn = fn(&Facts<'_>) -> Option<Insight>;

struct Rule {
    finding: Finding,
    apply: RuleFn,
}

fn rule(finding: Finding, apply: RuleFn) -> Rule {
    Rule { finding, apply }
}

pub struct InsightGenerator {
    rules: Vec<Rule>,
}

impl Default for InsightGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightGenerator {
    pub fn new() -> Self {
        use Finding::*;
        use Severity as S;

        let rules = vec![
            rule(Cyclone, |f| {
                let level = f.cyclone_level()?;
                matches!(level, CycloneLevel::VeryHigh | CycloneLevel::High)
                    .then(|| Insight::new(S::Error, level.description()))
            }),
            rule(Cyclone, |f| {
                (f.cyclone_level()? == CycloneLevel::Moderate).then(|| {
                    Insight::new(S::Warning, "Some cyclonic conditions present - monitor weather")
                })
            }),
            rule(AirQuality, |f| {
                let (category, index) = f.air_quality()?;
                let insight = match category {
                    AirQualityCategory::Good => {
                        Insight::new(S::Success, format!("Good air quality (AQI: {:.0})", index))
                    }
                    AirQualityCategory::Moderate => {
                        Insight::new(S::Info, format!("Moderate air quality (AQI: {:.0})", index))
                    }
                    AirQualityCategory::UnhealthyForSensitive | AirQualityCategory::Unhealthy => {
                        Insight::new(
                            S::Warning,
                            format!(
                                "Poor air quality detected (AQI: {:.0}) - sensitive groups should limit outdoor activities",
                                index
                            ),
                        )
                    }
                    AirQualityCategory::VeryUnhealthy | AirQualityCategory::Hazardous => {
                        Insight::new(
                            S::Error,
                            format!("Hazardous air quality (AQI: {:.0}) - avoid outdoor activities", index),
                        )
                    }
                };
                Some(insight)
            }),
            rule(Heat, |f| {
                let t = f.stat("temperature_2m")?;
                (t.mean > 35.0).then(|| {
                    Insight::new(
                        S::Warning,
                        format!("Extreme heat: mean temperature {:.1}°C - limit exposure", t.mean),
                    )
                })
            }),
            rule(Heat, |f| {
                let t = f.stat("temperature_2m")?;
                (t.mean > 25.0).then(|| {
                    Insight::new(S::Info, format!("Warm weather conditions (mean {:.1}°C)", t.mean))
                })
            }),
            rule(Heat, |f| {
                let t = f.stat("temperature_2m")?;
                (t.mean < 0.0).then(|| {
                    Insight::new(S::Warning, format!("Freezing conditions detected (mean {:.1}°C)", t.mean))
                })
            }),
            rule(Heat, |f| {
                let t = f.stat("temperature_2m")?;
                (t.mean < 5.0).then(|| {
                    Insight::new(S::Info, format!("Cold weather conditions (mean {:.1}°C)", t.mean))
                })
            }),
            rule(TemperatureTrend, |f| match f.stat("temperature_2m")?.trend {
                Trend::Increasing => Some(Insight::new(S::Info, "Temperature is trending upward")),
                Trend::Decreasing => Some(Insight::new(S::Info, "Temperature is trending downward")),
                Trend::Stable => None,
            }),
            rule(TemperatureRange, |f| {
                let t = f.stat("temperature_2m")?;
                Some(Insight::new(
                    S::Info,
                    format!("Temperature varied by {:.1}°C over the observed period", t.max - t.min),
                ))
            }),
            rule(Humidity, |f| {
                (f.stat("relative_humidity_2m")?.current > 80.0)
                    .then(|| Insight::new(S::Info, "Very high humidity levels - feels muggy"))
            }),
            rule(Humidity, |f| {
                (f.stat("relative_humidity_2m")?.current < 30.0)
                    .then(|| Insight::new(S::Info, "Low humidity levels - dry conditions"))
            }),
            rule(Wind, |f| {
                let w = f.first_stat(&WIND_PARAMETERS)?;
                (w.max > 50.0).then(|| {
                    Insight::new(S::Warning, format!("Strong winds detected - max speed {:.1} km/h", w.max))
                })
            }),
            rule(Wind, |f| {
                (f.first_stat(&WIND_PARAMETERS)?.mean < 5.0)
                    .then(|| Insight::new(S::Info, "Calm wind conditions"))
            }),
            rule(CloudCover, |f| {
                (f.stat("cloud_cover")?.current > 80.0)
                    .then(|| Insight::new(S::Info, "Heavily overcast skies"))
            }),
            rule(CloudCover, |f| {
                (f.stat("cloud_cover")?.current < 20.0)
                    .then(|| Insight::new(S::Info, "Clear skies with minimal cloud cover"))
            }),
            rule(Rainfall, |f| {
                (f.first_stat(&RAIN_PARAMETERS)?.max > 10.0)
                    .then(|| Insight::new(S::Warning, "Heavy rainfall detected in some hours"))
            }),
            rule(Rainfall, |f| {
                let r = f.first_stat(&RAIN_PARAMETERS)?;
                (r.total > 0.0).then(|| {
                    Insight::new(S::Info, format!("Total rainfall: {:.1} mm recorded", r.total))
                })
            }),
            rule(Rainfall, |f| {
                f.first_stat(&RAIN_PARAMETERS)?;
                Some(Insight::new(S::Success, "No rainfall recorded"))
            }),
            rule(PressureTrend, |f| match f.first_stat(&PRESSURE_PARAMETERS)?.trend {
                Trend::Decreasing => Some(Insight::new(
                    S::Warning,
                    "Atmospheric pressure dropping - weather may be changing",
                )),
                Trend::Increasing => Some(Insight::new(
                    S::Info,
                    "Atmospheric pressure rising - weather stabilizing",
                )),
                Trend::Stable => None,
            }),
            rule(PressureLevel, |f| {
                (f.first_stat(&PRESSURE_PARAMETERS)?.current < 1000.0)
                    .then(|| Insight::new(S::Warning, "Low pressure may indicate stormy weather"))
            }),
            rule(PressureLevel, |f| {
                (f.first_stat(&PRESSURE_PARAMETERS)?.current > 1020.0)
                    .then(|| Insight::new(S::Info, "High pressure indicates stable weather conditions"))
            }),
            rule(SeaSurface, |f| {
                let sst = f.stat("sea_surface_temperature")?;
                (sst.current > 25.0).then(|| {
                    Insight::new(S::Info, format!("Warm sea surface temperatures ({:.1}°C)", sst.current))
                })
            }),
            rule(SeaSurface, |f| {
                (f.stat("sea_surface_temperature")?.current < 15.0)
                    .then(|| Insight::new(S::Info, "Cool sea surface temperatures"))
            }),
            rule(Waves, |f| {
                let w = f.stat("wave_height")?;
                (w.max > 3.0).then(|| {
                    Insight::new(S::Warning, format!("High waves detected - maximum {:.1} m", w.max))
                })
            }),
            rule(Waves, |f| {
                (f.stat("wave_height")?.max < 0.5)
                    .then(|| Insight::new(S::Info, "Calm sea conditions with low waves"))
            }),
            rule(Pm25, |f| {
                let pm = f.stat("pm2_5")?;
                (pm.current > 35.0).then(|| {
                    Insight::new(S::Warning, format!("High PM2.5 levels detected ({:.1} μg/m³)", pm.current))
                })
            }),
            rule(DataQuality, |f| {
                let q = f.quality?;
                let pct = q.missing_percentage()?;
                (pct > 20.0).then(|| {
                    Insight::new(S::Warning, format!("{:.1}% of readings are missing - treat trends with care", pct))
                })
            }),
            rule(DataQuality, |f| {
                (f.quality?.missing_percentage()? == 0.0)
                    .then(|| Insight::new(S::Success, "Excellent data quality: no missing values detected"))
            }),
            rule(RejectedPoints, |f| {
                let q = f.quality?;
                (q.rejected_points > 0).then(|| {
                    Insight::new(
                        S::Warning,
                        format!("{} readings were rejected during ingestion", q.rejected_points),
                    )
                })
            }),
        ];

        Self { rules }
    }

    /// Evaluate the rule table in order. Rules whose inputs are unavailable are
    /// skipped; once a finding has produced an insight its later rules are not tried.
    pub fn generate(
        &self,
        statistics_by_category: &BTreeMap<Category, BTreeMap<String, Statistic>>,
        risk_assessments: &[RiskAssessment],
        data_quality: Option<&DataQuality>,
    ) -> Vec<Insight> {
        let facts = Facts {
            statistics: statistics_by_category,
            risks: risk_assessments,
            quality: data_quality,
        };

        let mut reported = BTreeSet::new();
        let mut insights = Vec::new();
        for rule in &self.rules {
            if reported.contains(&rule.finding) {
                continue;
            }
            if let Some(insight) = (rule.apply)(&facts) {
                reported.insert(rule.finding);
                insights.push(insight);
            }
        }
        insights
    }
}
