use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::util::{
    deserialize_opt_code, deserialize_opt_price, deserialize_opt_text, deserialize_opt_year,
};

/// One row as it appears in `detailed.json`, before nomenclature
/// normalization. Every field is optional because source files are
/// produced by a lenient extraction step; values of the wrong type read as
/// missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPriceRecord {
    #[serde(rename = "ano", default, deserialize_with = "deserialize_opt_year")]
    pub year: Option<i32>,
    #[serde(rename = "nivel", default, deserialize_with = "deserialize_opt_text")]
    pub level: Option<String>,
    #[serde(rename = "territorio", default, deserialize_with = "deserialize_opt_text")]
    pub territory: Option<String>,
    #[serde(rename = "territorio_codigo", default, deserialize_with = "deserialize_opt_code")]
    pub territory_code: Option<String>,
    #[serde(rename = "categoria", default, deserialize_with = "deserialize_opt_text")]
    pub category: Option<String>,
    #[serde(rename = "subcategoria", default, deserialize_with = "deserialize_opt_text")]
    pub subcategory: Option<String>,
    #[serde(rename = "classe", default, deserialize_with = "deserialize_opt_text")]
    pub class: Option<String>,
    #[serde(rename = "preco", default, deserialize_with = "deserialize_opt_price")]
    pub price: Option<f64>,
    #[serde(rename = "unidade", default, deserialize_with = "deserialize_opt_text")]
    pub unit: Option<String>,
    #[serde(rename = "regiao", default, deserialize_with = "deserialize_opt_text")]
    pub region: Option<String>,
    #[serde(rename = "mesorregiao", default, deserialize_with = "deserialize_opt_text")]
    pub mesoregion: Option<String>,
}

/// A normalized price observation. `category` and `subcategory` are in the
/// land-capability scheme; the values read from the source are kept in the
/// `*_original` fields.
///
/// Missing text facets are represented by the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(rename = "ano")]
    pub year: Option<i32>,
    #[serde(rename = "nivel", default)]
    pub level: String,
    #[serde(rename = "territorio", default)]
    pub territory: String,
    #[serde(rename = "territorio_codigo", default)]
    pub territory_code: Option<String>,
    #[serde(rename = "categoria", default)]
    pub category: String,
    #[serde(rename = "subcategoria", default)]
    pub subcategory: String,
    #[serde(rename = "classe", default)]
    pub class: String,
    #[serde(rename = "preco")]
    pub price: Option<f64>,
    #[serde(rename = "unidade", default)]
    pub unit: String,
    #[serde(rename = "regiao", default)]
    pub region: String,
    #[serde(rename = "mesorregiao", default)]
    pub mesoregion: String,
    #[serde(rename = "categoriaOriginal", default)]
    pub category_original: String,
    #[serde(rename = "subcategoriaOriginal", default)]
    pub subcategory_original: String,
}

impl PriceRecord {
    /// The price when it is usable in a statistic.
    pub fn finite_price(&self) -> Option<f64> {
        self.price.filter(|p| p.is_finite())
    }
}

/// Distinct facet values of a loaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    #[serde(rename = "anoMin")]
    pub year_min: i32,
    #[serde(rename = "anoMax")]
    pub year_max: i32,
    #[serde(rename = "anos")]
    pub years: Vec<i32>,
    #[serde(rename = "niveis")]
    pub levels: Vec<String>,
    #[serde(rename = "categorias")]
    pub categories: Vec<String>,
    #[serde(rename = "subcategorias")]
    pub subcategories: Vec<String>,
    pub classes: Vec<String>,
    #[serde(rename = "regioes")]
    pub regions: Vec<String>,
    #[serde(rename = "mesorregioes")]
    pub mesoregions: Vec<String>,
    /// Territorial level -> sorted territory names.
    #[serde(rename = "territorios")]
    pub territories: BTreeMap<String, Vec<String>>,
}

/// Inclusive year bounds. An absent or zero bound is not applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearRange {
    pub min: Option<i32>,
    pub max: Option<i32>,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        YearRange { min: Some(min), max: Some(max) }
    }

    pub fn lower(&self) -> Option<i32> {
        self.min.filter(|y| *y != 0)
    }

    pub fn upper(&self) -> Option<i32> {
        self.max.filter(|y| *y != 0)
    }
}

/// The user's facet selection. Empty sets and an empty level mean
/// "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub year_range: YearRange,
    pub level: String,
    pub territories: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub subcategories: BTreeSet<String>,
    pub classes: BTreeSet<String>,
    pub regions: BTreeSet<String>,
    pub mesoregions: BTreeSet<String>,
}

/// Descriptive statistics over the finite prices of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    #[serde(rename = "media")]
    pub mean: f64,
    #[serde(rename = "mediana")]
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    #[serde(rename = "desvio")]
    pub std_dev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(flatten)]
    pub stats: PriceStats,
    #[serde(rename = "registros")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(flatten)]
    pub stats: PriceStats,
    #[serde(rename = "registros")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryBreakdown {
    #[serde(rename = "subcategoria")]
    pub subcategory: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(flatten)]
    pub stats: PriceStats,
    #[serde(rename = "registros")]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryRanking {
    #[serde(rename = "territorio")]
    pub territory: String,
    #[serde(rename = "codigo")]
    pub code: Option<String>,
    #[serde(rename = "nivel")]
    pub level: String,
    #[serde(flatten)]
    pub stats: PriceStats,
    #[serde(rename = "registros")]
    pub count: usize,
}

/// Everything the charts, tables and map bind to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    #[serde(rename = "totalRegistros")]
    pub total_records: usize,
    #[serde(rename = "precoMedio")]
    pub price_mean: f64,
    #[serde(rename = "precoMediana")]
    pub price_median: f64,
    #[serde(rename = "precoMin")]
    pub price_min: f64,
    #[serde(rename = "precoMax")]
    pub price_max: f64,
    #[serde(rename = "volatilidade")]
    pub volatility: f64,
    pub cagr: f64,
    #[serde(rename = "timeSeries")]
    pub time_series: Vec<TimeSeriesPoint>,
    #[serde(rename = "byCategoria")]
    pub by_category: Vec<CategoryBreakdown>,
    #[serde(rename = "bySubcategoria")]
    pub by_subcategory: Vec<SubcategoryBreakdown>,
    #[serde(rename = "timeSeriesBySubcategoria")]
    pub time_series_by_subcategory: BTreeMap<String, Vec<TimeSeriesPoint>>,
    #[serde(rename = "byTerritorio")]
    pub by_territory: Vec<TerritoryRanking>,
}
