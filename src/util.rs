// Parsing, grouping and statistics helpers shared by the loader and the
// aggregation engine, plus the pt-BR number formatting used by reports.
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::hash::Hash;
use unicode_normalization::UnicodeNormalization;

use crate::types::PriceStats;

/// Parse a price written in Brazilian notation (`R$ 1.234,56`).
///
/// Thousands dots, spaces and the currency symbol are dropped and the
/// decimal comma becomes a point. Anything that still fails to parse is
/// treated as missing.
pub fn parse_price_br(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace('.', "").replace(' ', "").replace("R$", "");
    let s = s.replace(',', ".");
    s.parse::<f64>().ok()
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<i32>().ok()
}

/// Trimmed owned string, `None` when blank.
pub fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Territory codes show up both as JSON strings and as numbers.
pub fn deserialize_opt_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_code))
}

/// String form of a JSON scalar used as an identifier.
pub fn json_code(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => non_empty(Some(s)),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Prices arrive as JSON numbers or as pt-BR strings. Anything else,
/// including unparseable text, is a missing price.
pub fn deserialize_opt_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(serde_json::Value::String(s)) => parse_price_br(Some(&s)),
        _ => None,
    })
}

/// Years as integers, integral floats (`2020.0`) or numeric strings.
pub fn deserialize_opt_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            None => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64)
                .map(|f| f as i32),
        },
        Some(serde_json::Value::String(s)) => parse_i32_safe(Some(&s)),
        _ => None,
    })
}

/// Text facets; a non-string value counts as missing.
pub fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Case- and accent-insensitive comparison key for place names:
/// canonical decomposition, combining diacritics (U+0300..U+036F)
/// removed, lowercased, trimmed.
pub fn normalize_key(value: &str) -> String {
    value
        .nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Group items by key, keeping groups in first-seen order and members in
/// input order.
pub fn group_by<'a, T, K, I, F>(items: I, key_fn: F) -> Vec<(K, Vec<&'a T>)>
where
    T: 'a,
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<&'a T>)> = Vec::new();
    for item in items {
        let key = key_fn(item);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }
    groups
}

pub fn average(v: &[f64]) -> f64 {
    // 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Median of an already ascending-sorted slice.
pub fn median_sorted(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        let mid_value = (v[mid - 1] + v[mid]) / 2.0;
        if mid_value.is_finite() {
            mid_value
        } else {
            v[mid - 1] / 2.0 + v[mid] / 2.0
        }
    }
}

/// Mean, median, min, max and population standard deviation of the finite
/// values in `values`. All zero when nothing finite remains.
pub fn compute_stats(values: &[f64]) -> PriceStats {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return PriceStats::default();
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let (mean, std_dev) = match mean_and_std_dev(&sorted) {
        (mean, std_dev) if mean.is_finite() && std_dev.is_finite() => (mean, std_dev),
        _ => {
            // Sums overflowed: work on values scaled into [-1, 1].
            let scale = min.abs().max(max.abs());
            let scaled: Vec<f64> = sorted.iter().map(|v| v / scale).collect();
            let (mean, std_dev) = mean_and_std_dev(&scaled);
            (mean * scale, std_dev * scale)
        }
    };
    PriceStats {
        mean,
        median: median_sorted(&sorted),
        min,
        max,
        std_dev,
    }
}

fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    let mean = average(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    (mean, variance.sqrt())
}

/// Format with a fixed number of decimals in pt-BR style (`1.234.567,89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // pt-BR groups with '.', so swap the separator of the en grouping.
    let mut res = match int_part.parse::<i64>() {
        Ok(int_val) => int_val.to_formatted_string(&Locale::en).replace(',', "."),
        Err(_) => group_digits(int_part),
    };
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push(',');
            res.push_str(frac);
        }
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

// Digit grouping for integer parts too large for i64.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Like [`format_number`] but drops trailing zero decimals.
pub fn format_max_decimals(n: f64, max_decimals: usize) -> String {
    let s = format_number(n, max_decimals);
    if !s.contains(',') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches(',');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "R$ -".to_string();
    }
    let body = format_number(value.abs(), 0);
    if value < 0.0 && body != "0" {
        format!("-R$ {}", body)
    } else {
        format!("R$ {}", body)
    }
}

pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, " bi")
    } else if abs >= 1e6 {
        (value / 1e6, " mi")
    } else if abs >= 1e3 {
        (value / 1e3, " mil")
    } else {
        (value, "")
    };
    format!("{}{}", format_max_decimals(scaled, 1), suffix)
}

/// `0.21` -> `21%`, `0.1234` -> `12,3%`.
pub fn format_percent(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    format!("{}%", format_max_decimals(value * 100.0, 1))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en).replace(',', ".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_empty_are_zero() {
        assert_eq!(compute_stats(&[]), PriceStats::default());
    }

    #[test]
    fn stats_use_population_deviation() {
        let s = compute_stats(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.median, 4.5);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert_eq!(s.std_dev, 2.0);
    }

    #[test]
    fn stats_skip_non_finite_values() {
        let s = compute_stats(&[f64::NAN, 3.0, f64::INFINITY, 1.0, 2.0]);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
        assert_eq!(s.max, 3.0);
    }

    #[test]
    fn stats_are_ordered() {
        let samples: [&[f64]; 4] = [
            &[10.0],
            &[1.0, 100.0],
            &[5.5, -3.0, 7.25, 0.0, 12.0],
            &[1e6, 2e6, 3.5e6, 1.0],
        ];
        for values in samples {
            let s = compute_stats(values);
            assert!(s.min <= s.median && s.median <= s.max);
            assert!(s.min <= s.mean && s.mean <= s.max);
        }
    }

    #[test]
    fn groups_keep_first_seen_order() {
        let items = ["b", "a", "b", "c", "a"];
        let groups = group_by(items.iter(), |s| s.to_string());
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn normalize_key_strips_accents_and_case() {
        assert_eq!(normalize_key("  São José dos Pinhais "), "sao jose dos pinhais");
        assert_eq!(normalize_key("MARINGÁ"), "maringa");
        assert_eq!(normalize_key("Foz do Iguaçu"), "foz do iguacu");
    }

    #[test]
    fn parses_brazilian_prices() {
        assert_eq!(parse_price_br(Some("R$ 12.345,67")), Some(12345.67));
        assert_eq!(parse_price_br(Some(" 800 ")), Some(800.0));
        assert_eq!(parse_price_br(Some("")), None);
        assert_eq!(parse_price_br(Some("n/d")), None);
        assert_eq!(parse_price_br(None), None);
    }

    #[test]
    fn formats_pt_br() {
        assert_eq!(format_number(1234567.891, 2), "1.234.567,89");
        assert_eq!(format_currency(45210.4), "R$ 45.210");
        assert_eq!(format_currency(f64::NAN), "R$ -");
        assert_eq!(format_percent(0.21), "21%");
        assert_eq!(format_percent(0.1234), "12,3%");
        assert_eq!(format_max_decimals(3.5, 2), "3,5");
        assert_eq!(format_compact(1_340_000.0), "1,3 mi");
        assert_eq!(format_compact(950.0), "950");
        assert_eq!(format_int(9855_i64), "9.855");
    }

    #[test]
    fn huge_values_stay_finite() {
        let s = compute_stats(&[f64::MAX, f64::MAX]);
        assert_eq!(s.mean, f64::MAX);
        assert_eq!(s.median, f64::MAX);
        assert_eq!(s.std_dev, 0.0);
        assert_eq!(format_number(1e20, 0), "100.000.000.000.000.000.000");
        assert_eq!(format_currency(-1e20), "-R$ 100.000.000.000.000.000.000");
    }
}
