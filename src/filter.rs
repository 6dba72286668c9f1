//! Facet filtering over normalized records.

use std::collections::BTreeSet;

use crate::types::{FilterSpec, Metadata, PriceRecord, YearRange};

fn allows(set: &BTreeSet<String>, value: &str) -> bool {
    set.is_empty() || set.contains(value)
}

impl FilterSpec {
    /// Starting selection for a dataset: the full year span, the first
    /// territorial level, nothing else selected. Also used for "reset".
    pub fn initial(metadata: &Metadata) -> Self {
        FilterSpec {
            year_range: YearRange::new(metadata.year_min, metadata.year_max),
            level: metadata.levels.first().cloned().unwrap_or_default(),
            ..Default::default()
        }
    }

    /// Whether anything narrower than [`FilterSpec::initial`] is selected.
    /// The level does not count.
    pub fn has_active_filters(&self, metadata: &Metadata) -> bool {
        !self.territories.is_empty()
            || !self.categories.is_empty()
            || !self.subcategories.is_empty()
            || !self.classes.is_empty()
            || !self.regions.is_empty()
            || !self.mesoregions.is_empty()
            || self.year_range.min.unwrap_or(0) != metadata.year_min
            || self.year_range.max.unwrap_or(0) != metadata.year_max
    }

    pub fn matches(&self, record: &PriceRecord) -> bool {
        if let Some(min) = self.year_range.lower() {
            match record.year {
                Some(year) if year >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.year_range.upper() {
            match record.year {
                Some(year) if year <= max => {}
                _ => return false,
            }
        }
        if !self.level.is_empty() && record.level != self.level {
            return false;
        }
        allows(&self.mesoregions, &record.mesoregion)
            && allows(&self.regions, &record.region)
            && allows(&self.territories, &record.territory)
            && allows(&self.categories, &record.category)
            && allows(&self.subcategories, &record.subcategory)
            && allows(&self.classes, &record.class)
    }
}

/// Records matching `spec`, in input order.
pub fn filter_records(records: &[PriceRecord], spec: &FilterSpec) -> Vec<PriceRecord> {
    let out: Vec<PriceRecord> = records.iter().filter(|r| spec.matches(r)).cloned().collect();
    log::debug!("filter kept {} of {} records", out.len(), records.len());
    out
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Territories selectable for `level`; empty when no level is selected.
pub fn available_territories(metadata: &Metadata, level: &str) -> Vec<String> {
    if level.is_empty() {
        return Vec::new();
    }
    metadata.territories.get(level).cloned().unwrap_or_default()
}

/// Subcategories present among records of the selected categories.
pub fn available_subcategories(
    records: &[PriceRecord],
    categories: &BTreeSet<String>,
) -> Vec<String> {
    distinct_sorted(
        records
            .iter()
            .filter(|r| allows(categories, &r.category))
            .map(|r| r.subcategory.as_str()),
    )
}

/// Classes present among records of the selected categories and
/// subcategories.
pub fn available_classes(
    records: &[PriceRecord],
    categories: &BTreeSet<String>,
    subcategories: &BTreeSet<String>,
) -> Vec<String> {
    distinct_sorted(
        records
            .iter()
            .filter(|r| allows(categories, &r.category) && allows(subcategories, &r.subcategory))
            .map(|r| r.class.as_str()),
    )
}
