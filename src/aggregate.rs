//! Statistics over a filtered set of price records.
//!
//! Everything is recomputed from the input on each call. Groups keep the
//! metadata (category, code, level) of their first member without checking
//! that the other members agree.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{
    AggregationResult, CategoryBreakdown, PriceRecord, PriceStats, SubcategoryBreakdown,
    TerritoryRanking, TimeSeriesPoint,
};
use crate::util::{compute_stats, group_by};

pub const NO_CATEGORY: &str = "Sem categoria";
pub const NO_SUBCATEGORY: &str = "Sem subcategoria";
pub const NO_TERRITORY: &str = "Sem territorio";

fn stats_of(rows: &[&PriceRecord]) -> PriceStats {
    let prices: Vec<f64> = rows.iter().filter_map(|r| r.finite_price()).collect();
    compute_stats(&prices)
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

fn by_mean_desc(a: &PriceStats, b: &PriceStats) -> Ordering {
    b.mean.partial_cmp(&a.mean).unwrap_or(Ordering::Equal)
}

/// One point per year present, ascending. Records without a year are left
/// out.
pub fn time_series<'a, I>(records: I) -> Vec<TimeSeriesPoint>
where
    I: IntoIterator<Item = &'a PriceRecord>,
{
    let mut points: Vec<TimeSeriesPoint> = group_by(records, |r| r.year)
        .into_iter()
        .filter_map(|(year, rows)| {
            Some(TimeSeriesPoint {
                year: year?,
                stats: stats_of(&rows),
                count: rows.len(),
            })
        })
        .collect();
    points.sort_by_key(|p| p.year);
    points
}

/// Compound growth between the first and last points of `series`.
///
/// The exponent counts steps between present points, so a gap of several
/// calendar years still counts as one step. Zero with fewer than two points
/// or a non-positive endpoint.
pub fn compound_annual_growth_rate(series: &[TimeSeriesPoint]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }
    let first = series[0].stats.mean;
    let last = series[series.len() - 1].stats.mean;
    let steps = (series.len() - 1) as f64;
    if first <= 0.0 || last <= 0.0 {
        return 0.0;
    }
    (last / first).powf(1.0 / steps) - 1.0
}

pub fn by_category(records: &[PriceRecord]) -> Vec<CategoryBreakdown> {
    let mut out: Vec<CategoryBreakdown> =
        group_by(records, |r| or_placeholder(&r.category, NO_CATEGORY))
            .into_iter()
            .map(|(category, rows)| CategoryBreakdown {
                category,
                stats: stats_of(&rows),
                count: rows.len(),
            })
            .collect();
    out.sort_by(|a, b| by_mean_desc(&a.stats, &b.stats));
    out
}

pub fn by_subcategory(records: &[PriceRecord]) -> Vec<SubcategoryBreakdown> {
    let mut out: Vec<SubcategoryBreakdown> =
        group_by(records, |r| or_placeholder(&r.subcategory, NO_SUBCATEGORY))
            .into_iter()
            .map(|(subcategory, rows)| SubcategoryBreakdown {
                subcategory,
                category: rows[0].category.clone(),
                stats: stats_of(&rows),
                count: rows.len(),
            })
            .collect();
    out.sort_by(|a, b| a.subcategory.cmp(&b.subcategory));
    out
}

/// Per-subcategory time series. Records without a subcategory are skipped.
pub fn time_series_by_subcategory(
    records: &[PriceRecord],
) -> BTreeMap<String, Vec<TimeSeriesPoint>> {
    group_by(records.iter().filter(|r| !r.subcategory.is_empty()), |r| {
        r.subcategory.clone()
    })
    .into_iter()
    .map(|(subcategory, rows)| (subcategory, time_series(rows)))
    .collect()
}

/// Territory ranking, highest mean first. `selected_level` stands in for
/// records that carry no level.
pub fn by_territory(records: &[PriceRecord], selected_level: &str) -> Vec<TerritoryRanking> {
    let mut out: Vec<TerritoryRanking> =
        group_by(records, |r| or_placeholder(&r.territory, NO_TERRITORY))
            .into_iter()
            .map(|(territory, rows)| {
                let first = rows[0];
                TerritoryRanking {
                    territory,
                    code: first.territory_code.clone(),
                    level: or_placeholder(&first.level, selected_level),
                    stats: stats_of(&rows),
                    count: rows.len(),
                }
            })
            .collect();
    out.sort_by(|a, b| by_mean_desc(&a.stats, &b.stats));
    out
}

/// Compute every summary the dashboard shows for `records`.
pub fn aggregate(records: &[PriceRecord], selected_level: &str) -> AggregationResult {
    if records.is_empty() {
        return AggregationResult::default();
    }

    let all: Vec<&PriceRecord> = records.iter().collect();
    let global = stats_of(&all);
    let series = time_series(records);
    let cagr = compound_annual_growth_rate(&series);

    AggregationResult {
        total_records: records.len(),
        price_mean: global.mean,
        price_median: global.median,
        price_min: global.min,
        price_max: global.max,
        volatility: global.std_dev,
        cagr,
        time_series: series,
        by_category: by_category(records),
        by_subcategory: by_subcategory(records),
        time_series_by_subcategory: time_series_by_subcategory(records),
        by_territory: by_territory(records, selected_level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nomenclature::normalize;
    use crate::types::RawPriceRecord;

    fn rec(year: i32, territory: &str, category: &str, sub: &str, price: f64) -> PriceRecord {
        PriceRecord {
            year: Some(year),
            level: "Municipio".to_string(),
            territory: territory.to_string(),
            category: category.to_string(),
            subcategory: sub.to_string(),
            price: Some(price),
            ..Default::default()
        }
    }

    fn point(year: i32, mean: f64) -> TimeSeriesPoint {
        TimeSeriesPoint {
            year,
            stats: PriceStats { mean, median: mean, min: mean, max: mean, std_dev: 0.0 },
            count: 1,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_input_is_all_zero() {
        let r = aggregate(&[], "Municipio");
        assert_eq!(r.total_records, 0);
        assert_eq!(r.price_mean, 0.0);
        assert_eq!(r.cagr, 0.0);
        assert!(r.time_series.is_empty());
        assert!(r.by_category.is_empty());
        assert!(r.by_subcategory.is_empty());
        assert!(r.time_series_by_subcategory.is_empty());
        assert!(r.by_territory.is_empty());
    }

    #[test]
    fn legacy_records_aggregate_after_normalization() {
        let raws = [(2020, 100.0), (2021, 121.0)].map(|(year, price)| RawPriceRecord {
            year: Some(year),
            category: Some("Roxa".to_string()),
            subcategory: Some("Mecanizada".to_string()),
            price: Some(price),
            ..Default::default()
        });
        let records: Vec<PriceRecord> = raws.into_iter().map(normalize).collect();
        assert!(records.iter().all(|r| r.subcategory == "A-I"));

        let r = aggregate(&records, "");
        let years: Vec<(i32, f64)> = r.time_series.iter().map(|p| (p.year, p.stats.mean)).collect();
        assert_eq!(years, vec![(2020, 100.0), (2021, 121.0)]);
        assert!(close(r.cagr, 0.21));
        assert_eq!(r.time_series_by_subcategory["A-I"].len(), 2);
    }

    #[test]
    fn cagr_counts_present_points_not_calendar_years() {
        let series = vec![point(2010, 100.0), point(2015, 110.0), point(2020, 121.0)];
        assert!(close(compound_annual_growth_rate(&series), 0.1));
    }

    #[test]
    fn cagr_degenerate_cases() {
        assert_eq!(compound_annual_growth_rate(&[]), 0.0);
        assert_eq!(compound_annual_growth_rate(&[point(2020, 50.0)]), 0.0);
        assert_eq!(compound_annual_growth_rate(&[point(2020, 0.0), point(2021, 50.0)]), 0.0);
        assert_eq!(compound_annual_growth_rate(&[point(2020, 50.0), point(2021, -1.0)]), 0.0);
    }

    #[test]
    fn breakdowns_are_sorted() {
        let records = vec![
            rec(2021, "Toledo", "Lavoura", "B-VI", 10.0),
            rec(2019, "Cascavel", "Pastagem", "A-I", 30.0),
            rec(2020, "Toledo", "Lavoura", "A-II", 20.0),
            rec(2019, "Palmas", "", "", 5.0),
        ];
        let r = aggregate(&records, "Municipio");

        let years: Vec<i32> = r.time_series.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2019, 2020, 2021]);

        let categories: Vec<&str> = r.by_category.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(categories, vec!["Pastagem", "Lavoura", NO_CATEGORY]);

        let subs: Vec<&str> = r.by_subcategory.iter().map(|s| s.subcategory.as_str()).collect();
        assert_eq!(subs, vec!["A-I", "A-II", "B-VI", NO_SUBCATEGORY]);
        assert_eq!(r.by_subcategory[1].category, "Lavoura");

        let territories: Vec<&str> = r.by_territory.iter().map(|t| t.territory.as_str()).collect();
        assert_eq!(territories, vec!["Cascavel", "Toledo", "Palmas"]);
        assert_eq!(r.by_territory[1].count, 2);
        assert_eq!(r.by_territory[1].stats.mean, 15.0);

        assert!(!r.time_series_by_subcategory.contains_key(NO_SUBCATEGORY));
        assert_eq!(r.time_series_by_subcategory.len(), 3);
    }

    #[test]
    fn global_kpis() {
        let records = vec![
            rec(2020, "A", "C", "A-I", 100.0),
            rec(2020, "B", "C", "A-I", 300.0),
            rec(2021, "A", "C", "A-I", 200.0),
        ];
        let r = aggregate(&records, "");
        assert_eq!(r.total_records, 3);
        assert_eq!(r.price_mean, 200.0);
        assert_eq!(r.price_median, 200.0);
        assert_eq!(r.price_min, 100.0);
        assert_eq!(r.price_max, 300.0);
        assert!(close(r.volatility, (20000.0_f64 / 3.0).sqrt()));
        assert_eq!(r.time_series[0].count, 2);
        assert_eq!(r.time_series[0].stats.mean, 200.0);
        assert_eq!(r.cagr, 0.0);
    }

    #[test]
    fn missing_prices_count_but_do_not_skew() {
        let mut missing = rec(2020, "A", "C", "A-I", 0.0);
        missing.price = None;
        let mut nan = rec(2020, "A", "C", "A-I", 0.0);
        nan.price = Some(f64::NAN);
        let records = vec![rec(2020, "A", "C", "A-I", 50.0), missing, nan];
        let r = aggregate(&records, "");
        assert_eq!(r.total_records, 3);
        assert_eq!(r.price_mean, 50.0);
        assert_eq!(r.by_territory[0].count, 3);
        assert_eq!(r.by_territory[0].stats.max, 50.0);
    }

    #[test]
    fn territory_keeps_first_seen_code_and_level() {
        let mut first = rec(2020, "Guarapuava", "C", "A-I", 10.0);
        first.territory_code = Some("4109401".to_string());
        first.level = String::new();
        let mut second = rec(2021, "Guarapuava", "C", "A-I", 20.0);
        second.territory_code = Some("9999999".to_string());

        let r = aggregate(&[first, second], "Mesorregiao");
        assert_eq!(r.by_territory.len(), 1);
        assert_eq!(r.by_territory[0].code.as_deref(), Some("4109401"));
        assert_eq!(r.by_territory[0].level, "Mesorregiao");
    }

    #[test]
    fn records_without_year_stay_out_of_series() {
        let mut undated = rec(2020, "A", "C", "A-I", 70.0);
        undated.year = None;
        let records = vec![rec(2020, "A", "C", "A-I", 10.0), undated];
        let r = aggregate(&records, "");
        assert_eq!(r.time_series.len(), 1);
        assert_eq!(r.time_series[0].count, 1);
        assert_eq!(r.price_mean, 40.0);
    }
}
