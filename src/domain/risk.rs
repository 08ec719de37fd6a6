// Risk domain model - Air-quality index and cyclone risk classification
use super::statistics::{Statistic, Trend};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

pub const DEFAULT_WIND_LOW_KMH: f64 = 30.0;
pub const DEFAULT_WIND_HIGH_KMH: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    AirQuality,
    Cyclone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AirQualityCategory {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AirQualityCategory {
    pub fn from_index(index: f64) -> Self {
        match index {
            i if i <= 50.0 => Self::Good,
            i if i <= 100.0 => Self::Moderate,
            i if i <= 150.0 => Self::UnhealthyForSensitive,
            i if i <= 200.0 => Self::Unhealthy,
            i if i <= 300.0 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::UnhealthyForSensitive => "unhealthy_for_sensitive",
            Self::Unhealthy => "unhealthy",
            Self::VeryUnhealthy => "very_unhealthy",
            Self::Hazardous => "hazardous",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Good => "Air quality is satisfactory",
            Self::Moderate => "Air quality is acceptable for most people",
            Self::UnhealthyForSensitive => "Sensitive groups may experience health effects",
            Self::Unhealthy => "Everyone may experience health effects",
            Self::VeryUnhealthy => "Health alert: everyone may experience serious health effects",
            Self::Hazardous => "Health warnings of emergency conditions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CycloneLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl CycloneLevel {
    fn escalate(self) -> Self {
        match self {
            Self::Low => Self::Moderate,
            Self::Moderate => Self::High,
            Self::High | Self::VeryHigh => Self::VeryHigh,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Normal weather conditions, no cyclone activity detected",
            Self::Moderate => "Some cyclonic conditions present - monitor weather updates",
            Self::High => "Significant cyclonic activity - take precautions",
            Self::VeryHigh => "Severe cyclonic conditions - seek shelter immediately",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskCategory {
    AirQuality(AirQualityCategory),
    Cyclone(CycloneLevel),
    Unknown,
}

impl RiskCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AirQuality(c) => c.label(),
            Self::Cyclone(l) => l.label(),
            Self::Unknown => "unknown",
        }
    }
}

impl Serialize for RiskCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub kind: RiskKind,
    pub numeric_index: Option<f64>,
    #[serde(rename = "category_label")]
    pub category: RiskCategory,
    pub contributing_factors: Vec<String>,
    pub description: String,
}

impl RiskAssessment {
    fn unknown(kind: RiskKind, description: &str) -> Self {
        Self {
            kind,
            numeric_index: None,
            category: RiskCategory::Unknown,
            contributing_factors: Vec::new(),
            description: description.to_string(),
        }
    }

    #[cfg(test)]
    pub fn category_label(&self) -> &'static str {
        self.category.label()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pollutant {
    Pm25,
    Pm10,
    Ozone,
    CarbonMonoxide,
    NitrogenDioxide,
    SulphurDioxide,
}

impl Pollutant {
    pub const ALL: [Pollutant; 6] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::Ozone,
        Pollutant::CarbonMonoxide,
        Pollutant::NitrogenDioxide,
        Pollutant::SulphurDioxide,
    ];

    /// Series name the concentration is read from.
    pub fn parameter(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "pm2_5",
            Pollutant::Pm10 => "pm10",
            Pollutant::Ozone => "ozone",
            Pollutant::CarbonMonoxide => "carbon_monoxide",
            Pollutant::NitrogenDioxide => "nitrogen_dioxide",
            Pollutant::SulphurDioxide => "sulphur_dioxide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub conc_low: f64,
    pub conc_high: f64,
    pub index_low: f64,
    pub index_high: f64,
}

const fn bp(conc_low: f64, conc_high: f64, index_low: f64, index_high: f64) -> Breakpoint {
    Breakpoint {
        conc_low,
        conc_high,
        index_low,
        index_high,
    }
}

/// Per-pollutant piecewise-linear segments, ascending by concentration.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    segments: BTreeMap<Pollutant, Vec<Breakpoint>>,
}

impl Default for BreakpointTable {
    fn default() -> Self {
        Self::epa()
    }
}

impl BreakpointTable {
    pub fn empty() -> Self {
        Self {
            segments: BTreeMap::new(),
        }
    }

    /// US EPA breakpoints with the rounding gaps between segments closed.
    /// Units: PM in μg/m³, ozone (8h) ppb, CO ppm, NO2 and SO2 ppb.
    pub fn epa() -> Self {
        Self::empty()
            .with_pollutant(
                Pollutant::Pm25,
                vec![
                    bp(0.0, 12.0, 0.0, 50.0),
                    bp(12.0, 35.4, 50.0, 100.0),
                    bp(35.4, 55.4, 100.0, 150.0),
                    bp(55.4, 150.4, 150.0, 200.0),
                    bp(150.4, 250.4, 200.0, 300.0),
                    bp(250.4, 350.4, 300.0, 400.0),
                    bp(350.4, 500.4, 400.0, 500.0),
                ],
            )
            .with_pollutant(
                Pollutant::Pm10,
                vec![
                    bp(0.0, 54.0, 0.0, 50.0),
                    bp(54.0, 154.0, 50.0, 100.0),
                    bp(154.0, 254.0, 100.0, 150.0),
                    bp(254.0, 354.0, 150.0, 200.0),
                    bp(354.0, 424.0, 200.0, 300.0),
                    bp(424.0, 504.0, 300.0, 400.0),
                    bp(504.0, 604.0, 400.0, 500.0),
                ],
            )
            .with_pollutant(
                Pollutant::Ozone,
                vec![
                    bp(0.0, 54.0, 0.0, 50.0),
                    bp(54.0, 70.0, 50.0, 100.0),
                    bp(70.0, 85.0, 100.0, 150.0),
                    bp(85.0, 105.0, 150.0, 200.0),
                    bp(105.0, 200.0, 200.0, 300.0),
                ],
            )
            .with_pollutant(
                Pollutant::CarbonMonoxide,
                vec![
                    bp(0.0, 4.4, 0.0, 50.0),
                    bp(4.4, 9.4, 50.0, 100.0),
                    bp(9.4, 12.4, 100.0, 150.0),
                    bp(12.4, 15.4, 150.0, 200.0),
                    bp(15.4, 30.4, 200.0, 300.0),
                    bp(30.4, 40.4, 300.0, 400.0),
                    bp(40.4, 50.4, 400.0, 500.0),
                ],
            )
            .with_pollutant(
                Pollutant::NitrogenDioxide,
                vec![
                    bp(0.0, 53.0, 0.0, 50.0),
                    bp(53.0, 100.0, 50.0, 100.0),
                    bp(100.0, 360.0, 100.0, 150.0),
                    bp(360.0, 649.0, 150.0, 200.0),
                    bp(649.0, 1249.0, 200.0, 300.0),
                    bp(1249.0, 1649.0, 300.0, 400.0),
                    bp(1649.0, 2049.0, 400.0, 500.0),
                ],
            )
            .with_pollutant(
                Pollutant::SulphurDioxide,
                vec![
                    bp(0.0, 35.0, 0.0, 50.0),
                    bp(35.0, 75.0, 50.0, 100.0),
                    bp(75.0, 185.0, 100.0, 150.0),
                    bp(185.0, 304.0, 150.0, 200.0),
                    bp(304.0, 604.0, 200.0, 300.0),
                    bp(604.0, 804.0, 300.0, 400.0),
                    bp(804.0, 1004.0, 400.0, 500.0),
                ],
            )
    }

    pub fn with_pollutant(mut self, pollutant: Pollutant, mut segments: Vec<Breakpoint>) -> Self {
        segments.sort_by(|a, b| a.conc_low.total_cmp(&b.conc_low));
        self.segments.insert(pollutant, segments);
        self
    }

    /// Piecewise-linear sub-index. Concentrations past the last segment clamp
    /// to its high index; below the first segment they clamp to its low index.
    pub fn sub_index(&self, pollutant: Pollutant, concentration: f64) -> Option<f64> {
        if !concentration.is_finite() {
            return None;
        }
        let segments = self.segments.get(&pollutant)?;
        let last = segments.last()?;
        let conc = concentration.max(0.0);

        let Some(seg) = segments.iter().find(|s| conc <= s.conc_high) else {
            return Some(last.index_high);
        };
        let conc = conc.max(seg.conc_low);
        if seg.conc_high == seg.conc_low {
            return Some(seg.index_low);
        }
        Some(
            ((seg.index_high - seg.index_low) / (seg.conc_high - seg.conc_low))
                * (conc - seg.conc_low)
                + seg.index_low,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycloneThresholds {
    pub wind_low_kmh: f64,
    pub wind_high_kmh: f64,
}

impl Default for CycloneThresholds {
    fn default() -> Self {
        Self {
            wind_low_kmh: DEFAULT_WIND_LOW_KMH,
            wind_high_kmh: DEFAULT_WIND_HIGH_KMH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiskClassifier {
    table: BreakpointTable,
    thresholds: CycloneThresholds,
}

impl RiskClassifier {
    pub fn new(table: BreakpointTable, thresholds: CycloneThresholds) -> Self {
        Self { table, thresholds }
    }

    /// Overall AQI is the largest pollutant sub-index; that pollutant is the
    /// contributing factor.
    pub fn classify_air_quality(&self, concentrations: &BTreeMap<Pollutant, f64>) -> RiskAssessment {
        let mut dominant: Option<(Pollutant, f64)> = None;
        for (&pollutant, &conc) in concentrations {
            let Some(index) = self.table.sub_index(pollutant, conc) else {
                continue;
            };
            if dominant.is_none_or(|(_, best)| index > best) {
                dominant = Some((pollutant, index));
            }
        }

        let Some((pollutant, index)) = dominant else {
            return RiskAssessment::unknown(
                RiskKind::AirQuality,
                "Air quality assessment unavailable: no pollutant data",
            );
        };

        let category = AirQualityCategory::from_index(index);
        RiskAssessment {
            kind: RiskKind::AirQuality,
            numeric_index: Some(index),
            category: RiskCategory::AirQuality(category),
            contributing_factors: vec![pollutant.parameter().to_string()],
            description: category.description().to_string(),
        }
    }

    /// Wind alone can raise the level to moderate at most; the higher levels
    /// need a falling pressure trend together with strong wind.
    pub fn classify_cyclone_risk(
        &self,
        pressure_trend: Option<Trend>,
        wind_speed_stats: Option<&Statistic>,
    ) -> RiskAssessment {
        let (Some(trend), Some(wind)) = (pressure_trend, wind_speed_stats) else {
            return RiskAssessment::unknown(
                RiskKind::Cyclone,
                "Cyclone activity assessment unavailable",
            );
        };

        let wind_speed = wind.mean;
        let low = self.thresholds.wind_low_kmh;
        let high = self.thresholds.wind_high_kmh;

        let mut level = if wind_speed > low {
            CycloneLevel::Moderate
        } else {
            CycloneLevel::Low
        };
        if trend == Trend::Decreasing && wind_speed > low {
            level = level.escalate();
            if wind_speed > high {
                level = level.escalate();
            }
        }

        RiskAssessment {
            kind: RiskKind::Cyclone,
            numeric_index: None,
            category: RiskCategory::Cyclone(level),
            contributing_factors: vec![
                format!("pressure trend {}", trend.as_str()),
                format!("mean wind speed {:.1} km/h", wind_speed),
            ],
            description: level.description().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn wind(mean: f64) -> Statistic {
        Statistic {
            current: mean,
            min: mean,
            max: mean,
            mean,
            trend: Trend::Stable,
            count: 1,
            total: mean,
            unit: Some("km/h".to_string()),
        }
    }

    fn cyclone(trend: Trend, mean_wind: f64) -> RiskCategory {
        RiskClassifier::default()
            .classify_cyclone_risk(Some(trend), Some(&wind(mean_wind)))
            .category
    }

    #[test]
    fn test_strong_wind_with_falling_pressure_is_very_high() {
        assert_eq!(cyclone(Trend::Decreasing, 70.0), RiskCategory::Cyclone(CycloneLevel::VeryHigh));
    }

    #[test]
    fn test_cyclone_decision_table() {
        assert_eq!(cyclone(Trend::Decreasing, 45.0), RiskCategory::Cyclone(CycloneLevel::High));
        assert_eq!(cyclone(Trend::Stable, 70.0), RiskCategory::Cyclone(CycloneLevel::Moderate));
        assert_eq!(cyclone(Trend::Increasing, 45.0), RiskCategory::Cyclone(CycloneLevel::Moderate));
        assert_eq!(cyclone(Trend::Decreasing, 20.0), RiskCategory::Cyclone(CycloneLevel::Low));
        assert_eq!(cyclone(Trend::Decreasing, 30.0), RiskCategory::Cyclone(CycloneLevel::Low));
    }

    #[test]
    fn test_cyclone_unknown_without_inputs() {
        let classifier = RiskClassifier::default();
        let missing_wind = classifier.classify_cyclone_risk(Some(Trend::Decreasing), None);
        let missing_pressure = classifier.classify_cyclone_risk(None, Some(&wind(80.0)));

        assert_eq!(missing_wind.category_label(), "unknown");
        assert_eq!(missing_pressure.category_label(), "unknown");
        assert_eq!(missing_wind.numeric_index, None);
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = RiskClassifier::new(
            BreakpointTable::epa(),
            CycloneThresholds {
                wind_low_kmh: 10.0,
                wind_high_kmh: 20.0,
            },
        );
        let risk = classifier.classify_cyclone_risk(Some(Trend::Decreasing), Some(&wind(25.0)));
        assert_eq!(risk.category_label(), "very_high");
        assert_eq!(risk.contributing_factors.len(), 2);
    }

    #[test]
    fn test_pm25_in_custom_segment_is_unhealthy() {
        let table = BreakpointTable::empty()
            .with_pollutant(Pollutant::Pm25, vec![bp(150.0, 200.0, 150.0, 200.0)]);
        let classifier = RiskClassifier::new(table, CycloneThresholds::default());

        let risk = classifier.classify_air_quality(&BTreeMap::from([(Pollutant::Pm25, 160.0)]));
        let index = risk.numeric_index.unwrap();
        assert!((150.0..=200.0).contains(&index));
        assert_eq!(risk.category_label(), "unhealthy");
        assert_eq!(risk.contributing_factors, vec!["pm2_5".to_string()]);
    }

    #[test]
    fn test_dominant_pollutant_drives_index() {
        let classifier = RiskClassifier::default();
        let risk = classifier.classify_air_quality(&BTreeMap::from([
            (Pollutant::Pm25, 8.0),
            (Pollutant::Pm10, 200.0),
            (Pollutant::Ozone, 30.0),
        ]));

        assert_eq!(risk.contributing_factors, vec!["pm10".to_string()]);
        assert_eq!(risk.category, RiskCategory::AirQuality(AirQualityCategory::UnhealthyForSensitive));
        assert_eq!(risk.numeric_index, Some(123.0));
    }

    #[test]
    fn test_category_band_edges() {
        assert_eq!(AirQualityCategory::from_index(0.0), AirQualityCategory::Good);
        assert_eq!(AirQualityCategory::from_index(50.0), AirQualityCategory::Good);
        assert_eq!(AirQualityCategory::from_index(50.1), AirQualityCategory::Moderate);
        assert_eq!(AirQualityCategory::from_index(150.0), AirQualityCategory::UnhealthyForSensitive);
        assert_eq!(AirQualityCategory::from_index(300.0), AirQualityCategory::VeryUnhealthy);
        assert_eq!(AirQualityCategory::from_index(300.5), AirQualityCategory::Hazardous);
    }

    #[test]
    fn test_sub_index_clamps_and_ignores_invalid() {
        let table = BreakpointTable::epa();
        assert_eq!(table.sub_index(Pollutant::Pm25, 900.0), Some(500.0));
        assert_eq!(table.sub_index(Pollutant::Pm25, -3.0), Some(0.0));
        assert_eq!(table.sub_index(Pollutant::Pm25, f64::NAN), None);
        assert_eq!(table.sub_index(Pollutant::Pm10, 154.0), Some(100.0));
    }

    #[test]
    fn test_air_quality_unknown_without_pollutants() {
        let risk = RiskClassifier::default().classify_air_quality(&BTreeMap::new());
        assert_eq!(risk.category_label(), "unknown");
        assert!(risk.contributing_factors.is_empty());
    }

    #[test]
    fn test_serializes_category_label() {
        let risk = RiskClassifier::default()
            .classify_air_quality(&BTreeMap::from([(Pollutant::Pm25, 5.0)]));
        let json = serde_json::to_value(&risk).unwrap();
        assert_eq!(json["category_label"], "good");
        assert_eq!(json["kind"], "air_quality");
    }

    fn pollutant() -> impl Strategy<Value = Pollutant> {
        prop::sample::select(Pollutant::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn test_aqi_is_monotonic(
            concentrations in prop::collection::btree_map(pollutant(), 0.0f64..2500.0, 1..6),
            bumped in pollutant(),
            increase in 0.0f64..500.0,
        ) {
            let classifier = RiskClassifier::default();
            let before = classifier.classify_air_quality(&concentrations).numeric_index.unwrap();

            let mut raised = concentrations.clone();
            *raised.entry(bumped).or_insert(0.0) += increase;
            let after = classifier.classify_air_quality(&raised).numeric_index.unwrap();

            prop_assert!(after >= before, "{} < {}", after, before);
        }

        #[test]
        fn test_calm_wind_never_exceeds_moderate(
            mean_wind in 0.0f64..=DEFAULT_WIND_LOW_KMH,
            trend in prop::sample::select(vec![Trend::Increasing, Trend::Decreasing, Trend::Stable]),
        ) {
            let level = cyclone(trend, mean_wind);
            prop_assert!(matches!(
                level,
                RiskCategory::Cyclone(CycloneLevel::Low) | RiskCategory::Cyclone(CycloneLevel::Moderate)
            ));
        }

        #[test]
        fn test_very_high_needs_both_signals(
            mean_wind in 0.0f64..200.0,
            trend in prop::sample::select(vec![Trend::Increasing, Trend::Decreasing, Trend::Stable]),
        ) {
            if cyclone(trend, mean_wind) == RiskCategory::Cyclone(CycloneLevel::VeryHigh) {
                prop_assert_eq!(trend, Trend::Decreasing);
                prop_assert!(mean_wind > DEFAULT_WIND_HIGH_KMH);
            }
        }
    }
}
