//! Binds territory rankings to boundary features for the price map.

use geojson::FeatureCollection;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::geo::{self, UNNAMED_FEATURE};
use crate::types::{AggregationResult, TerritoryRanking};
use crate::util::normalize_key;

/// Sequential palette, lightest to darkest.
pub const GRADIENT: [&str; 7] = [
    "#e2f3f5", "#b5dfe4", "#85c5cf", "#62929e", "#4a7a86", "#3d646f", "#2d4a53",
];

/// Fill for features without a value.
pub const NO_DATA_COLOR: &str = "#f3f4f6";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MapMetric {
    #[default]
    Mean,
    Median,
    Max,
    Min,
}

impl MapMetric {
    pub fn value(&self, entry: &TerritoryRanking) -> f64 {
        match self {
            MapMetric::Mean => entry.stats.mean,
            MapMetric::Median => entry.stats.median,
            MapMetric::Max => entry.stats.max,
            MapMetric::Min => entry.stats.min,
        }
    }
}

impl FromStr for MapMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "media" => Ok(MapMetric::Mean),
            "mediana" => Ok(MapMetric::Median),
            "max" => Ok(MapMetric::Max),
            "min" => Ok(MapMetric::Min),
            other => Err(format!("unknown map metric '{}'", other)),
        }
    }
}

/// One drawable feature with its resolved value and fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethCell {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "codigo")]
    pub code: Option<String>,
    #[serde(rename = "valor")]
    pub value: f64,
    #[serde(rename = "media")]
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    #[serde(rename = "cor")]
    pub color: &'static str,
}

/// Linear bucketing of `value` into [`GRADIENT`] between `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    /// Bounds from the finite positive metric values; `0..1` when none.
    pub fn from_rankings(rankings: &[TerritoryRanking], metric: MapMetric) -> Self {
        let values: Vec<f64> = rankings
            .iter()
            .map(|r| metric.value(r))
            .filter(|v| v.is_finite() && *v > 0.0)
            .collect();
        if values.is_empty() {
            return ColorScale { min: 0.0, max: 1.0 };
        }
        ColorScale {
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    pub fn color(&self, value: f64) -> &'static str {
        if !value.is_finite() || value == 0.0 {
            return NO_DATA_COLOR;
        }
        let range = self.max - self.min;
        let range = if range == 0.0 { 1.0 } else { range };
        let normalized = ((value - self.min) / range).max(0.0);
        let index = ((normalized * GRADIENT.len() as f64).floor() as usize).min(GRADIENT.len() - 1);
        GRADIENT[index]
    }
}

/// Color every boundary feature drawable at `level` by `metric`.
///
/// A feature matches a ranking entry by code first, then by normalized
/// name. Unmatched features get value 0 and [`NO_DATA_COLOR`].
pub fn build_choropleth(
    result: &AggregationResult,
    boundaries: &FeatureCollection,
    level: &str,
    metric: MapMetric,
) -> Vec<ChoroplethCell> {
    let mut by_code: HashMap<&str, &TerritoryRanking> = HashMap::new();
    let mut by_name: HashMap<String, &TerritoryRanking> = HashMap::new();
    for entry in &result.by_territory {
        if let Some(code) = entry.code.as_deref() {
            by_code.insert(code, entry);
        }
        if !entry.territory.is_empty() {
            by_name.insert(normalize_key(&entry.territory), entry);
        }
    }

    let scale = ColorScale::from_rankings(&result.by_territory, metric);

    geo::features_for_level(boundaries, level)
        .into_iter()
        .map(|feature| {
            let code = geo::feature_code(feature);
            let name = geo::feature_name(feature).unwrap_or_else(|| UNNAMED_FEATURE.to_string());
            let matched = code
                .as_deref()
                .and_then(|c| by_code.get(c))
                .or_else(|| by_name.get(&normalize_key(&name)))
                .copied();
            let value = matched.map(|m| metric.value(m)).unwrap_or(0.0);
            ChoroplethCell {
                color: scale.color(value),
                name,
                code,
                value,
                mean: matched.map(|m| m.stats.mean).unwrap_or(0.0),
                min: matched.map(|m| m.stats.min).unwrap_or(0.0),
                max: matched.map(|m| m.stats.max).unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PriceStats;
    use geojson::Feature;
    use serde_json::json;

    fn ranking(territory: &str, code: Option<&str>, mean: f64) -> TerritoryRanking {
        TerritoryRanking {
            territory: territory.to_string(),
            code: code.map(str::to_string),
            level: "Municipio".to_string(),
            stats: PriceStats { mean, median: mean, min: mean / 2.0, max: mean * 2.0, std_dev: 0.0 },
            count: 1,
        }
    }

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn scale_buckets() {
        let scale = ColorScale { min: 100.0, max: 800.0 };
        assert_eq!(scale.color(100.0), GRADIENT[0]);
        assert_eq!(scale.color(800.0), GRADIENT[6]);
        assert_eq!(scale.color(450.0), GRADIENT[3]);
        assert_eq!(scale.color(0.0), NO_DATA_COLOR);
        assert_eq!(scale.color(50.0), GRADIENT[0]);
    }

    #[test]
    fn scale_bounds_ignore_non_positive_values() {
        let rankings = vec![ranking("a", None, 0.0), ranking("b", None, 10.0), ranking("c", None, 40.0)];
        let scale = ColorScale::from_rankings(&rankings, MapMetric::Mean);
        assert_eq!(scale, ColorScale { min: 10.0, max: 40.0 });
        assert_eq!(
            ColorScale::from_rankings(&[], MapMetric::Max),
            ColorScale { min: 0.0, max: 1.0 }
        );
    }

    #[test]
    fn features_match_by_code_then_name() {
        let result = AggregationResult {
            by_territory: vec![
                ranking("Curitiba", Some("4106902"), 900.0),
                ranking("São Mateus do Sul", None, 300.0),
            ],
            ..Default::default()
        };
        let boundaries = FeatureCollection {
            bbox: None,
            features: vec![
                feature(json!({ "nome": "CURITIBA (capital)", "codigo": "4106902" })),
                feature(json!({ "Municipio": "Sao Mateus do Sul", "nivel": "Municipio" })),
                feature(json!({ "nivel": "Mesorregiao", "nome": "Oeste" })),
                feature(json!({})),
            ],
            foreign_members: None,
        };

        let cells = build_choropleth(&result, &boundaries, "Municipio", MapMetric::Mean);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].value, 900.0);
        assert_eq!(cells[0].color, GRADIENT[6]);
        assert_eq!(cells[1].value, 300.0);
        assert_eq!(cells[1].color, GRADIENT[0]);
        assert_eq!(cells[2].name, UNNAMED_FEATURE);
        assert_eq!(cells[2].color, NO_DATA_COLOR);

        let by_max = build_choropleth(&result, &boundaries, "Municipio", MapMetric::Max);
        assert_eq!(by_max[0].value, 1800.0);
    }

    #[test]
    fn metric_names() {
        assert_eq!("mediana".parse::<MapMetric>(), Ok(MapMetric::Median));
        assert!("moda".parse::<MapMetric>().is_err());
    }
}
