// Console tables for an AggregationResult. Values are preformatted in
// pt-BR so the previews read like the dashboard.
use tabled::Tabled;

use crate::nomenclature::{get_label, LabelFormat};
use crate::types::{AggregationResult, TerritoryRanking};
use crate::util::{format_currency, format_int, format_percent};

#[derive(Debug, Clone, Tabled)]
pub struct KpiRow {
    #[tabled(rename = "Indicador")]
    pub name: String,
    #[tabled(rename = "Valor")]
    pub value: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct YearRow {
    #[tabled(rename = "Ano")]
    pub year: i32,
    #[tabled(rename = "Media")]
    pub mean: String,
    #[tabled(rename = "Mediana")]
    pub median: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "Registros")]
    pub count: usize,
}

#[derive(Debug, Clone, Tabled)]
pub struct CategoryRow {
    #[tabled(rename = "Categoria")]
    pub category: String,
    #[tabled(rename = "Media")]
    pub mean: String,
    #[tabled(rename = "Registros")]
    pub count: usize,
}

#[derive(Debug, Clone, Tabled)]
pub struct SubcategoryRow {
    #[tabled(rename = "Classe")]
    pub subcategory: String,
    #[tabled(rename = "Descricao")]
    pub label: String,
    #[tabled(rename = "Media")]
    pub mean: String,
    #[tabled(rename = "Registros")]
    pub count: usize,
}

#[derive(Debug, Clone, Tabled)]
pub struct TerritoryRow {
    #[tabled(rename = "#")]
    pub rank: usize,
    #[tabled(rename = "Territorio")]
    pub territory: String,
    #[tabled(rename = "Nivel")]
    pub level: String,
    #[tabled(rename = "Media")]
    pub mean: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Max")]
    pub max: String,
    #[tabled(rename = "Registros")]
    pub count: usize,
}

pub fn kpi_rows(result: &AggregationResult) -> Vec<KpiRow> {
    let row = |name: &str, value: String| KpiRow {
        name: name.to_string(),
        value,
    };
    vec![
        row("Registros", format_int(result.total_records as u64)),
        row("Preco medio", format_currency(result.price_mean)),
        row("Preco mediano", format_currency(result.price_median)),
        row("Preco minimo", format_currency(result.price_min)),
        row("Preco maximo", format_currency(result.price_max)),
        row("Volatilidade", format_currency(result.volatility)),
        row("CAGR", format_percent(result.cagr)),
    ]
}

pub fn year_rows(result: &AggregationResult) -> Vec<YearRow> {
    result
        .time_series
        .iter()
        .map(|p| YearRow {
            year: p.year,
            mean: format_currency(p.stats.mean),
            median: format_currency(p.stats.median),
            min: format_currency(p.stats.min),
            max: format_currency(p.stats.max),
            count: p.count,
        })
        .collect()
}

pub fn category_rows(result: &AggregationResult) -> Vec<CategoryRow> {
    result
        .by_category
        .iter()
        .map(|c| CategoryRow {
            category: c.category.clone(),
            mean: format_currency(c.stats.mean),
            count: c.count,
        })
        .collect()
}

pub fn subcategory_rows(result: &AggregationResult) -> Vec<SubcategoryRow> {
    result
        .by_subcategory
        .iter()
        .map(|s| SubcategoryRow {
            subcategory: s.subcategory.clone(),
            label: get_label(&s.subcategory, LabelFormat::Sipt),
            mean: format_currency(s.stats.mean),
            count: s.count,
        })
        .collect()
}

fn territory_row(idx: usize, t: &TerritoryRanking) -> TerritoryRow {
    TerritoryRow {
        rank: idx + 1,
        territory: t.territory.clone(),
        level: t.level.clone(),
        mean: format_currency(t.stats.mean),
        min: format_currency(t.stats.min),
        max: format_currency(t.stats.max),
        count: t.count,
    }
}

pub fn territory_rows(result: &AggregationResult) -> Vec<TerritoryRow> {
    result
        .by_territory
        .iter()
        .enumerate()
        .map(|(idx, t)| territory_row(idx, t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceStats, SubcategoryBreakdown};

    #[test]
    fn kpis_are_formatted() {
        let result = AggregationResult {
            total_records: 1200,
            price_mean: 35500.4,
            cagr: 0.085,
            ..Default::default()
        };
        let rows = kpi_rows(&result);
        assert_eq!(rows[0].value, "1.200");
        assert_eq!(rows[1].value, "R$ 35.500");
        assert_eq!(rows[6].value, "8,5%");
    }

    #[test]
    fn subcategories_carry_short_labels() {
        let result = AggregationResult {
            by_subcategory: vec![SubcategoryBreakdown {
                subcategory: "B-VII".to_string(),
                category: "Classe de Capacidade de Uso".to_string(),
                stats: PriceStats::default(),
                count: 4,
            }],
            ..Default::default()
        };
        let rows = subcategory_rows(&result);
        assert_eq!(rows[0].label, "Silvicultura - Pastagem Natural");
        assert_eq!(rows[0].mean, "R$ 0");
    }
}
