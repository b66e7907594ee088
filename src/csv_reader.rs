use crate::error::{Error, Result};
use crate::ir::Record;
use csv::ReaderBuilder;
use serde_json::Value as Json;
use std::io::Read;

/// Read records from CSV with a header row.
///
/// Cells are typed: integers, floats, `true`/`false` (any case), JSON arrays
/// such as `[3, "Tarifa 2.0TD"]` for reference fields, strings otherwise.
/// An empty cell becomes `null`.
pub fn read_records<R: Read>(input: R) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(input);

    let headers: Vec<String> = reader.headers()?.iter().map(|s| s.trim().to_string()).collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.clone(), parse_cell(cell)))
            .collect();
        records.push(record);
    }

    if records.is_empty() {
        return Err(Error::Validation("CSV must contain at least one data row".to_string()));
    }
    Ok(records)
}

pub fn parse_cell(cell: &str) -> Json {
    let cell = cell.trim();
    if cell.is_empty() {
        return Json::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Json::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Json::Bool(false);
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Json::from(n);
    }
    if let Ok(f) = cell.parse::<f64>() {
        if f.is_finite() {
            return Json::from(f);
        }
    }
    if cell.starts_with('[') {
        if let Ok(array @ Json::Array(_)) = serde_json::from_str::<Json>(cell) {
            return array;
        }
    }
    Json::String(cell.to_string())
}
