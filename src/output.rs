use chrono::NaiveDate;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::DashboardError;
use crate::types::PriceRecord;

/// Column layout of the filtered-records export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    ano: Option<i32>,
    nivel: &'a str,
    territorio: &'a str,
    codigo: &'a str,
    categoria: &'a str,
    subcategoria: &'a str,
    classe: &'a str,
    preco: Option<f64>,
    unidade: &'a str,
}

impl<'a> From<&'a PriceRecord> for ExportRow<'a> {
    fn from(r: &'a PriceRecord) -> Self {
        ExportRow {
            ano: r.year,
            nivel: &r.level,
            territorio: &r.territory,
            codigo: r.territory_code.as_deref().unwrap_or(""),
            categoria: &r.category,
            subcategoria: &r.subcategory,
            classe: &r.class,
            preco: r.price,
            unidade: &r.unit,
        }
    }
}

/// `precos_terras_<date>.csv`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("precos_terras_{}.csv", date.format("%Y-%m-%d"))
}

/// Write filtered records as CSV. Every non-numeric field is quoted,
/// header, `nivel` and `unidade` included, so year, numeric codes and
/// price are the only bare values. Nothing is written for an empty
/// selection; returns the number of rows written.
pub fn export_records<W: Write>(writer: W, records: &[PriceRecord]) -> Result<usize, DashboardError> {
    if records.is_empty() {
        return Ok(0);
    }
    let mut wtr = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_writer(writer);
    for r in records {
        wtr.serialize(ExportRow::from(r))?;
    }
    wtr.flush().map_err(|e| DashboardError::io("<csv export>", e))?;
    Ok(records.len())
}

pub fn export_records_to_path(path: &Path, records: &[PriceRecord]) -> Result<usize, DashboardError> {
    if records.is_empty() {
        return Ok(0);
    }
    let file = std::fs::File::create(path).map_err(|e| DashboardError::io(path, e))?;
    export_records(file, records)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), DashboardError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s).map_err(|e| DashboardError::io(path, e))?;
    Ok(())
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(sem dados)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if rows.len() > max_rows {
        println!("({} de {} linhas)\n", max_rows, rows.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PriceRecord {
        PriceRecord {
            year: Some(2019),
            level: "Municipio".to_string(),
            territory: "Pato Branco".to_string(),
            territory_code: Some("4118501".to_string()),
            category: "Classe de Capacidade de Uso".to_string(),
            subcategory: "A-I".to_string(),
            price: Some(52000.5),
            unit: "R$/ha".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn export_quotes_text_fields() {
        let mut buf = Vec::new();
        let written = export_records(&mut buf, &[record()]).unwrap();
        assert_eq!(written, 1);
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("\"ano\",\"nivel\",\"territorio\",\"codigo\",\"categoria\",\"subcategoria\",\"classe\",\"preco\",\"unidade\"")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("2019,\"Municipio\",\"Pato Branco\",4118501,"));
        assert!(row.ends_with(",52000.5,\"R$/ha\""));
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let mut buf = Vec::new();
        assert_eq!(export_records(&mut buf, &[]).unwrap(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn file_name_carries_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name(date), "precos_terras_2024-03-09.csv");
    }
}
