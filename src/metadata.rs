//! Facet metadata: the distinct years, levels, categories and territories
//! a dataset offers for selection.

use geojson::FeatureCollection;
use std::collections::{BTreeMap, BTreeSet};

use crate::geo;
use crate::types::{Metadata, PriceRecord};
use crate::util::normalize_key;

/// Territorial level whose territory list is restricted to mapped
/// boundaries.
pub const MUNICIPALITY_LEVEL: &str = "Municipio";

/// Build the dataset metadata.
///
/// `precomputed` (from the aggregated file) wins over scanning `records`.
/// With `boundaries`, the municipality list is cut down to names that have
/// a boundary feature; the records themselves are not touched.
pub fn build_metadata(
    records: &[PriceRecord],
    precomputed: Option<&Metadata>,
    boundaries: Option<&FeatureCollection>,
) -> Metadata {
    let metadata = match precomputed {
        Some(base) => {
            log::debug!("using precomputed metadata ({} years)", base.years.len());
            base.clone()
        }
        None => derive_metadata(records),
    };
    match boundaries {
        Some(fc) => restrict_municipalities(metadata, fc),
        None => metadata,
    }
}

fn insert_text(set: &mut BTreeSet<String>, value: &str) {
    if !value.is_empty() {
        set.insert(value.to_string());
    }
}

/// Single pass over `records` collecting every facet.
pub fn derive_metadata(records: &[PriceRecord]) -> Metadata {
    let mut years = BTreeSet::new();
    let mut levels = BTreeSet::new();
    let mut categories = BTreeSet::new();
    let mut subcategories = BTreeSet::new();
    let mut classes = BTreeSet::new();
    let mut regions = BTreeSet::new();
    let mut mesoregions = BTreeSet::new();
    let mut territories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for r in records {
        if let Some(year) = r.year.filter(|y| *y != 0) {
            years.insert(year);
        }
        insert_text(&mut levels, &r.level);
        insert_text(&mut categories, &r.category);
        insert_text(&mut subcategories, &r.subcategory);
        insert_text(&mut classes, &r.class);
        insert_text(&mut regions, &r.region);
        insert_text(&mut mesoregions, &r.mesoregion);
        if !r.level.is_empty() && !r.territory.is_empty() {
            territories
                .entry(r.level.clone())
                .or_default()
                .insert(r.territory.clone());
        }
    }

    let years: Vec<i32> = years.into_iter().collect();
    Metadata {
        year_min: years.first().copied().unwrap_or(0),
        year_max: years.last().copied().unwrap_or(0),
        years,
        levels: levels.into_iter().collect(),
        categories: categories.into_iter().collect(),
        subcategories: subcategories.into_iter().collect(),
        classes: classes.into_iter().collect(),
        regions: regions.into_iter().collect(),
        mesoregions: mesoregions.into_iter().collect(),
        territories: territories
            .into_iter()
            .map(|(level, names)| (level, names.into_iter().collect()))
            .collect(),
    }
}

fn restrict_municipalities(mut metadata: Metadata, boundaries: &FeatureCollection) -> Metadata {
    if boundaries.features.is_empty() {
        return metadata;
    }
    if let Some(municipalities) = metadata.territories.get_mut(MUNICIPALITY_LEVEL) {
        let mapped = geo::name_keys(boundaries);
        let before = municipalities.len();
        municipalities.retain(|name| mapped.contains(&normalize_key(name)));
        municipalities.sort();
        log::debug!(
            "{} of {} municipalities have a boundary feature",
            municipalities.len(),
            before
        );
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Feature;
    use serde_json::json;

    fn rec(year: i32, level: &str, territory: &str, sub: &str) -> PriceRecord {
        PriceRecord {
            year: Some(year),
            level: level.to_string(),
            territory: territory.to_string(),
            category: "Classe de Capacidade de Uso".to_string(),
            subcategory: sub.to_string(),
            price: Some(10.0),
            ..Default::default()
        }
    }

    fn boundaries(names: &[&str]) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: names
                .iter()
                .map(|n| Feature {
                    bbox: None,
                    geometry: None,
                    id: None,
                    properties: json!({ "nome": n }).as_object().cloned(),
                    foreign_members: None,
                })
                .collect(),
            foreign_members: None,
        }
    }

    fn sample() -> Vec<PriceRecord> {
        vec![
            rec(2021, "Municipio", "Maringá", "B-VI"),
            rec(2017, "Municipio", "Cascavel", "A-I"),
            rec(2019, "Mesorregiao", "Oeste", "A-I"),
            rec(2017, "Municipio", "Atlântida", "A-II"),
        ]
    }

    #[test]
    fn derives_sorted_distinct_facets() {
        let m = build_metadata(&sample(), None, None);
        assert_eq!(m.years, vec![2017, 2019, 2021]);
        assert_eq!((m.year_min, m.year_max), (2017, 2021));
        assert_eq!(m.levels, vec!["Mesorregiao", "Municipio"]);
        assert_eq!(m.subcategories, vec!["A-I", "A-II", "B-VI"]);
        assert_eq!(m.territories["Municipio"], vec!["Atlântida", "Cascavel", "Maringá"]);
        assert_eq!(m.territories["Mesorregiao"], vec!["Oeste"]);
    }

    #[test]
    fn no_records_gives_empty_metadata() {
        assert_eq!(build_metadata(&[], None, None), Metadata::default());
    }

    #[test]
    fn precomputed_metadata_wins() {
        let base = Metadata {
            year_min: 2000,
            year_max: 2001,
            years: vec![2000, 2001],
            ..Default::default()
        };
        assert_eq!(build_metadata(&sample(), Some(&base), None), base);
    }

    #[test]
    fn municipalities_are_cut_to_mapped_names() {
        let geo = boundaries(&["MARINGA", "cascavel ", "Oeste"]);
        let m = build_metadata(&sample(), None, Some(&geo));
        assert_eq!(m.territories["Municipio"], vec!["Cascavel", "Maringá"]);
        assert_eq!(m.territories["Mesorregiao"], vec!["Oeste"]);
    }

    #[test]
    fn empty_boundary_file_skips_intersection() {
        let m = build_metadata(&sample(), None, Some(&boundaries(&[])));
        assert_eq!(m.territories["Municipio"].len(), 3);
    }
}
