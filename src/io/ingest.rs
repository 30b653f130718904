//! Spreadsheet ingest and normalization.
//!
//! This module is responsible for turning a price spreadsheet (CSV or Excel
//! workbook) into a clean set of `PriceRecord`s that are safe to encode and fit.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 3)
//! - **Row-level validation** (drop incomplete rows, but report what happened)
//! - **Deterministic behavior** (rows keep their file order)
//! - **Separation of concerns**: no encoding or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::domain::{DatasetStats, PriceRecord, month_start};
use crate::error::AppError;

/// Accepted header spellings per required column (after normalization).
///
/// The Spanish names match the spreadsheets the price series are published in.
const REGION_ALIASES: &[&str] = &["region", "estado", "state"];
const YEAR_ALIASES: &[&str] = &["year", "anio", "año", "ano"];
const MONTH_ALIASES: &[&str] = &["month", "mes"];
const FUEL_ALIASES: &[&str] = &["fuel_type", "tipo_combustible", "fuel"];
const PRICE_ALIASES: &[&str] = &["price", "precio"];

/// A row-level problem encountered during ingest (the row is dropped).
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: cleaned records + stats + row errors.
///
/// Built once per process and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: PathBuf,
    pub records: Vec<PriceRecord>,
    pub stats: DatasetStats,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl Dataset {
    /// Build a dataset from already-clean records (tests, in-memory callers).
    pub fn from_records(records: Vec<PriceRecord>) -> Result<Self, AppError> {
        let stats = compute_stats(&records)
            .ok_or_else(|| AppError::data_unavailable("No price records available."))?;
        let rows_read = records.len();
        Ok(Self {
            source: PathBuf::new(),
            records,
            stats,
            row_errors: Vec::new(),
            rows_read,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A single spreadsheet cell, independent of the file format.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

/// Header row + data rows, as read from disk.
struct RawTable {
    headers: Vec<String>,
    /// `(line, cells)` where `cells` is `Err` if the row could not be parsed at all.
    rows: Vec<(usize, Result<Vec<Cell>, String>)>,
}

/// Positions of the required columns in a row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    region: usize,
    year: usize,
    month: usize,
    fuel_type: usize,
    price: usize,
}

/// Load and normalize a price spreadsheet.
///
/// Fails with `DataUnavailable` if the file is missing or unreadable, lacks a
/// required column, or has no usable rows left after cleaning.
pub fn load(path: &Path) -> Result<Dataset, AppError> {
    let table = match SourceKind::from_path(path)? {
        SourceKind::Csv => read_csv(path)?,
        SourceKind::Workbook => read_workbook(path)?,
    };
    let dataset = clean_table(table, path)?;

    info!(
        path = %path.display(),
        rows_read = dataset.rows_read,
        rows_used = dataset.records.len(),
        rows_dropped = dataset.row_errors.len(),
        "loaded price data"
    );
    Ok(dataset)
}

/// File extensions `load` understands (lowercase).
pub const DATA_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Whether `path` has one of the `DATA_EXTENSIONS`.
pub fn has_data_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| DATA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        == Some(true)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Csv,
    Workbook,
}

impl SourceKind {
    fn from_path(path: &Path) -> Result<Self, AppError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(SourceKind::Csv),
            e if DATA_EXTENSIONS.contains(&e) => Ok(SourceKind::Workbook),
            _ => Err(AppError::data_unavailable(format!(
                "Unsupported data file '{}': expected .csv, .xlsx, .xls or .ods.",
                path.display()
            ))),
        }
    }
}

fn read_csv(path: &Path) -> Result<RawTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::data_unavailable(format!("Failed to open CSV '{}': {e}", path.display()))
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::data_unavailable(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let rows = reader
        .records()
        .enumerate()
        .map(|(idx, result)| {
            // +2: records() starts after the header, and lines are 1-based.
            let line = idx + 2;
            let cells = result
                .map(|record| csv_cells(&record))
                .map_err(|e| format!("CSV parse error: {e}"));
            (line, cells)
        })
        .collect();

    Ok(RawTable { headers, rows })
}

fn csv_cells(record: &StringRecord) -> Vec<Cell> {
    record
        .iter()
        .map(|field| {
            let field = field.trim();
            if field.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(field.to_string())
            }
        })
        .collect()
}

fn read_workbook(path: &Path) -> Result<RawTable, AppError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| {
        AppError::data_unavailable(format!("Failed to open workbook '{}': {e}", path.display()))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            AppError::data_unavailable(format!("Workbook '{}' has no worksheets.", path.display()))
        })?
        .map_err(|e| AppError::data_unavailable(format!("Failed to read first worksheet: {e}")))?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Err(AppError::data_unavailable(format!(
            "Worksheet in '{}' is empty.",
            path.display()
        )));
    };

    let headers = header_row
        .iter()
        .map(|cell| match workbook_cell(cell) {
            Cell::Text(s) => s,
            Cell::Number(v) => format_number(v),
            Cell::Empty => String::new(),
        })
        .collect();

    let rows = rows_iter
        .enumerate()
        .map(|(idx, row)| (idx + 2, Ok(row.iter().map(workbook_cell).collect())))
        .collect();

    Ok(RawTable { headers, rows })
}

fn workbook_cell(cell: &Data) -> Cell {
    match cell {
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let s = s.trim();
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        }
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

fn clean_table(table: RawTable, path: &Path) -> Result<Dataset, AppError> {
    let header_map = build_header_map(&table.headers);
    let columns = resolve_columns(&header_map)?;

    // Spreadsheet exports often end in fully blank rows; they are not data.
    let rows: Vec<_> = table
        .rows
        .into_iter()
        .filter(|(_, cells)| !matches!(cells, Ok(cells) if is_blank_row(cells)))
        .collect();

    let rows_read = rows.len();
    let mut records = Vec::with_capacity(rows_read);
    let mut row_errors = Vec::new();

    for (line, cells) in rows {
        let parsed = cells.and_then(|cells| parse_row(&cells, columns));
        match parsed {
            Ok(record) => records.push(record),
            Err(message) => {
                debug!(line, %message, "dropping row");
                row_errors.push(RowError { line, message });
            }
        }
    }

    if !row_errors.is_empty() {
        warn!(
            dropped = row_errors.len(),
            "some rows were dropped while cleaning '{}'",
            path.display()
        );
    }

    let stats = compute_stats(&records).ok_or_else(|| {
        AppError::data_unavailable(format!(
            "No valid rows remain in '{}' after cleaning ({rows_read} read).",
            path.display()
        ))
    })?;

    Ok(Dataset {
        source: path.to_path_buf(),
        records,
        stats,
        row_errors,
        rows_read,
    })
}

fn is_blank_row(cells: &[Cell]) -> bool {
    cells.iter().all(|c| *c == Cell::Empty)
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins when a header is repeated.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the `region` column goes missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn resolve_columns(header_map: &HashMap<String, usize>) -> Result<ColumnMap, AppError> {
    Ok(ColumnMap {
        region: find_column(header_map, "region", REGION_ALIASES)?,
        year: find_column(header_map, "year", YEAR_ALIASES)?,
        month: find_column(header_map, "month", MONTH_ALIASES)?,
        fuel_type: find_column(header_map, "fuel_type", FUEL_ALIASES)?,
        price: find_column(header_map, "price", PRICE_ALIASES)?,
    })
}

fn find_column(
    header_map: &HashMap<String, usize>,
    name: &str,
    aliases: &[&str],
) -> Result<usize, AppError> {
    aliases
        .iter()
        .find_map(|alias| header_map.get(*alias).copied())
        .ok_or_else(|| {
            AppError::data_unavailable(format!(
                "Missing required column: `{name}` (accepted headers: {}).",
                aliases.join(", ")
            ))
        })
}

fn parse_row(cells: &[Cell], columns: ColumnMap) -> Result<PriceRecord, String> {
    let region = parse_text(cells, columns.region, "region")?;
    let year = parse_integer(cells, columns.year, "year")?;
    let month = parse_integer(cells, columns.month, "month")?;
    let fuel_type = parse_text(cells, columns.fuel_type, "fuel_type")?;
    let price = parse_price(cells, columns.price)?;

    let year = i32::try_from(year).map_err(|_| format!("Year out of range: {year}."))?;
    let month = u32::try_from(month)
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| format!("Month must be 1-12, got {month}."))?;
    if month_start(year, month).is_none() {
        return Err(format!("Invalid calendar month {year}-{month:02}."));
    }

    Ok(PriceRecord {
        region,
        year,
        month,
        fuel_type,
        price,
    })
}

fn get_required<'a>(cells: &'a [Cell], idx: usize, name: &str) -> Result<&'a Cell, String> {
    match cells.get(idx) {
        Some(Cell::Empty) | None => Err(format!("Missing required value: `{name}`")),
        Some(cell) => Ok(cell),
    }
}

fn parse_text(cells: &[Cell], idx: usize, name: &str) -> Result<String, String> {
    match get_required(cells, idx, name)? {
        Cell::Text(s) => Ok(s.clone()),
        Cell::Number(v) => Ok(format_number(*v)),
        Cell::Empty => Err(format!("Missing required value: `{name}`")),
    }
}

fn parse_integer(cells: &[Cell], idx: usize, name: &str) -> Result<i64, String> {
    let value = match get_required(cells, idx, name)? {
        Cell::Number(v) => *v,
        Cell::Text(s) => {
            if let Ok(v) = s.parse::<i64>() {
                return Ok(v);
            }
            s.parse::<f64>()
                .map_err(|_| format!("Invalid `{name}` value '{s}': expected an integer."))?
        }
        Cell::Empty => return Err(format!("Missing required value: `{name}`")),
    };

    // Spreadsheet cells often hold `2023.0`; accept integral floats only.
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(format!("Invalid `{name}` value {value}: expected an integer."))
    }
}

fn parse_price(cells: &[Cell], idx: usize) -> Result<f64, String> {
    let value = match get_required(cells, idx, "price")? {
        Cell::Number(v) => *v,
        Cell::Text(s) => {
            let cleaned = s.trim_start_matches('$').trim();
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("Invalid `price` value '{s}'."))?
        }
        Cell::Empty => return Err("Missing required value: `price`".to_string()),
    };

    if !value.is_finite() {
        return Err("Non-finite `price` value.".to_string());
    }
    if value < 0.0 {
        return Err(format!("Negative `price` value {value}."));
    }
    Ok(value)
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

fn compute_stats(records: &[PriceRecord]) -> Option<DatasetStats> {
    let first = records.iter().filter_map(PriceRecord::date).min()?;
    let last = records.iter().filter_map(PriceRecord::date).max()?;

    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for r in records {
        price_min = price_min.min(r.price);
        price_max = price_max.max(r.price);
        sum += r.price;
    }

    Some(DatasetStats {
        n_records: records.len(),
        first_month: first,
        last_month: last,
        price_min,
        price_max,
        price_mean: sum / records.len() as f64,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::ErrorKind;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_spanish_headers_and_coerces_types() {
        let file = write_csv(
            "\u{feff}estado,año,mes,tipo_combustible,precio,fuente\n\
             CDMX,2023,1,Regular,22.5,x\n\
             Jalisco,2023.0,2,Premium,24.10,y\n",
        );
        let data = load(file.path()).unwrap();
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.records[1].year, 2023);
        assert_eq!(data.records[1].month, 2);
        assert_eq!(data.records[1].fuel_type, "Premium");
        assert!((data.records[1].price - 24.10).abs() < 1e-12);
        assert!(data.row_errors.is_empty());
    }

    #[test]
    fn drops_rows_with_missing_or_invalid_fields() {
        let file = write_csv(
            "region,year,month,fuel_type,price\n\
             CDMX,2023,1,Regular,22.5\n\
             ,2023,1,Regular,22.5\n\
             CDMX,2023,13,Regular,22.5\n\
             CDMX,2023,2,Regular,\n\
             CDMX,2023.5,2,Regular,20\n\
             CDMX,2023,3,Regular,-1\n",
        );
        let data = load(file.path()).unwrap();
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.rows_read, 6);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6, 7]);
        for r in &data.records {
            assert!((1..=12).contains(&r.month));
            assert!(!r.region.is_empty() && !r.fuel_type.is_empty());
        }
    }

    #[test]
    fn missing_column_is_data_unavailable() {
        let file = write_csv("region,year,month,price\nCDMX,2023,1,22.5\n");
        let err = load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.message().contains("fuel_type"));
    }

    #[test]
    fn empty_after_cleaning_is_data_unavailable() {
        let file = write_csv("region,year,month,fuel_type,price\n,,,,\n");
        let err = load(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn blank_rows_are_skipped_not_dropped() {
        let file = write_csv(
            "region,year,month,fuel_type,price\n\
             CDMX,2023,1,Regular,22.5\n\
             ,,,,\n\
             Jalisco,2023,1,Regular,\n\
             ,,,,\n",
        );
        let data = load(file.path()).unwrap();
        assert_eq!(data.records.len(), 1);
        assert_eq!(data.rows_read, 2);
        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4]);
    }

    #[test]
    fn loads_xlsx_workbook() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precios.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, header) in ["estado", "Año", "mes", "tipo_combustible", "precio"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).unwrap();
        }
        // Numeric cells come back from calamine as floats.
        sheet.write_string(1, 0, "CDMX").unwrap();
        sheet.write_number(1, 1, 2023.0).unwrap();
        sheet.write_number(1, 2, 1.0).unwrap();
        sheet.write_string(1, 3, "Regular").unwrap();
        sheet.write_number(1, 4, 22.5).unwrap();

        sheet.write_string(2, 0, "Jalisco").unwrap();
        sheet.write_number(2, 1, 2023.0).unwrap();
        sheet.write_number(2, 2, 2.0).unwrap();
        sheet.write_string(2, 3, "Premium").unwrap();
        sheet.write_string(2, 4, "$24.10").unwrap();

        // Missing price: dropped as a row error.
        sheet.write_string(3, 0, "Oaxaca").unwrap();
        sheet.write_number(3, 1, 2023.0).unwrap();
        sheet.write_number(3, 2, 3.0).unwrap();
        sheet.write_string(3, 3, "Regular").unwrap();

        // Formatted but empty trailing row.
        sheet.write_blank(5, 0, &rust_xlsxwriter::Format::new().set_bold()).unwrap();
        workbook.save(&path).unwrap();

        let data = load(&path).unwrap();
        assert_eq!(data.records.len(), 2);
        assert_eq!(data.records[0].region, "CDMX");
        assert_eq!(data.records[0].year, 2023);
        assert_eq!(data.records[0].month, 1);
        assert_eq!(data.records[1].fuel_type, "Premium");
        assert!((data.records[1].price - 24.10).abs() < 1e-12);

        let lines: Vec<usize> = data.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![4]);
        assert!(data.row_errors[0].message.contains("price"));
    }

    #[test]
    fn missing_file_is_data_unavailable() {
        let err = load(Path::new("does/not/exist.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
    }

    #[test]
    fn stats_cover_date_and_price_range() {
        let file = write_csv(
            "region,year,month,fuel_type,price\n\
             A,2022,12,Regular,20\n\
             A,2023,3,Regular,24\n",
        );
        let data = load(file.path()).unwrap();
        assert_eq!(data.stats.first_month, month_start(2022, 12).unwrap());
        assert_eq!(data.stats.last_month, month_start(2023, 3).unwrap());
        assert!((data.stats.price_mean - 22.0).abs() < 1e-12);
    }
}
