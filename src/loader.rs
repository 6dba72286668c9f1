use csv::ReaderBuilder;
use geojson::{FeatureCollection, GeoJson};
use serde::Deserialize;
use std::path::Path;

use crate::config::DataConfig;
use crate::error::DashboardError;
use crate::metadata::build_metadata;
use crate::nomenclature::normalize_all;
use crate::types::{Metadata, PriceRecord, RawPriceRecord};
use crate::util::{non_empty, parse_i32_safe, parse_price_br};

/// Columns a compiled CSV must have.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "ano",
    "nivel",
    "territorio",
    "territorio_codigo",
    "categoria",
    "subcategoria",
    "classe",
    "preco",
    "unidade",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    /// Rows whose year or price was present but could not be parsed.
    pub parse_errors: usize,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    ano: Option<String>,
    nivel: Option<String>,
    territorio: Option<String>,
    territorio_codigo: Option<String>,
    categoria: Option<String>,
    subcategoria: Option<String>,
    classe: Option<String>,
    preco: Option<String>,
    unidade: Option<String>,
    regiao: Option<String>,
    mesorregiao: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AggregatedFile {
    metadata: Option<Metadata>,
}

/// Everything the pipeline needs, loaded once per session.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<PriceRecord>,
    pub metadata: Metadata,
    pub boundaries: Option<FeatureCollection>,
}

fn read_file(path: &Path) -> Result<String, DashboardError> {
    std::fs::read_to_string(path).map_err(|e| DashboardError::io(path, e))
}

/// Parse a `detailed.json` document. Entries that are not records are
/// skipped with a warning.
pub fn parse_records_json(text: &str) -> Result<Vec<PriceRecord>, DashboardError> {
    let values: Option<Vec<serde_json::Value>> = serde_json::from_str(text)?;
    let mut raws = Vec::new();
    for (i, value) in values.unwrap_or_default().into_iter().enumerate() {
        match RawPriceRecord::deserialize(value) {
            Ok(raw) => raws.push(raw),
            Err(e) => log::warn!("skipping record {}: {}", i, e),
        }
    }
    Ok(normalize_all(raws))
}

/// Load and normalize `detailed.json`.
pub fn load_records_json(path: &Path) -> Result<Vec<PriceRecord>, DashboardError> {
    let records = parse_records_json(&read_file(path)?)?;
    log::info!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Load and normalize a compiled CSV of extracted price tables.
pub fn load_records_csv(path: &Path) -> Result<(Vec<PriceRecord>, LoadReport), DashboardError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = rdr.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h.trim() == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DashboardError::MissingColumns {
            path: path.display().to_string(),
            columns: missing,
        });
    }

    let mut report = LoadReport::default();
    let mut raws = Vec::new();
    for result in rdr.deserialize::<CsvRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping row {}: {}", report.total_rows, e);
                report.parse_errors += 1;
                continue;
            }
        };

        let year = parse_i32_safe(row.ano.as_deref());
        let price = parse_price_br(row.preco.as_deref());
        let bad_year = year.is_none() && non_empty(row.ano.as_deref()).is_some();
        let bad_price = price.is_none() && non_empty(row.preco.as_deref()).is_some();
        if bad_year || bad_price {
            report.parse_errors += 1;
        }

        raws.push(RawPriceRecord {
            year,
            level: non_empty(row.nivel.as_deref()),
            territory: non_empty(row.territorio.as_deref()),
            territory_code: non_empty(row.territorio_codigo.as_deref()),
            category: non_empty(row.categoria.as_deref()),
            subcategory: non_empty(row.subcategoria.as_deref()),
            class: non_empty(row.classe.as_deref()),
            price,
            unit: non_empty(row.unidade.as_deref()),
            region: non_empty(row.regiao.as_deref()),
            mesoregion: non_empty(row.mesorregiao.as_deref()),
        });
    }

    log::info!(
        "loaded {} rows from {} ({} with unparseable values)",
        report.total_rows,
        path.display(),
        report.parse_errors
    );
    Ok((normalize_all(raws), report))
}

/// Records from either a `.csv` or a JSON file, chosen by extension.
pub fn load_records(path: &Path) -> Result<Vec<PriceRecord>, DashboardError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        load_records_csv(path).map(|(records, _)| records)
    } else {
        load_records_json(path)
    }
}

pub fn parse_metadata(text: &str) -> Result<Option<Metadata>, DashboardError> {
    let file: AggregatedFile = serde_json::from_str(text)?;
    Ok(file.metadata)
}

/// The `metadata` object of `aggregated.json`, if the file has one.
pub fn load_precomputed_metadata(path: &Path) -> Result<Option<Metadata>, DashboardError> {
    parse_metadata(&read_file(path)?)
}

pub fn parse_boundaries(text: &str) -> Result<FeatureCollection, DashboardError> {
    let geojson: GeoJson = text.parse()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

pub fn load_boundaries(path: &Path) -> Result<FeatureCollection, DashboardError> {
    let fc = parse_boundaries(&read_file(path)?)?;
    log::info!("loaded {} boundary features from {}", fc.features.len(), path.display());
    Ok(fc)
}

/// Run `load` for an optional input, degrading to `None` on failure.
fn load_optional<T>(
    path: Option<&Path>,
    what: &str,
    load: impl FnOnce(&Path) -> Result<T, DashboardError>,
) -> Option<T> {
    let path = path?;
    match load(path) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("continuing without {}: {}", what, e);
            None
        }
    }
}

/// Load the records (fatal on failure) and the optional metadata and
/// boundary files, then build the facet metadata.
pub fn load_dataset(config: &DataConfig) -> Result<Dataset, DashboardError> {
    let records = load_records(&config.detailed)?;
    let precomputed = load_optional(config.aggregated.as_deref(), "aggregated metadata", |p| {
        load_precomputed_metadata(p)
    })
    .flatten();
    let boundaries = load_optional(config.boundaries.as_deref(), "boundaries", load_boundaries);

    let metadata = build_metadata(&records, precomputed.as_ref(), boundaries.as_ref());
    Ok(Dataset {
        records,
        metadata,
        boundaries,
    })
}
