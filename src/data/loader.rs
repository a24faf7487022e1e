use std::fs::File;
use std::io::Read;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Date32Type, Date64Type};
use arrow::util::display::array_value_to_string;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use zip::ZipArchive;

use super::model::{VisitDataset, VisitRecord};
use crate::config::ColumnMapping;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load the visits dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text with a header row
/// * `.zip`          – archive whose first `.csv`/`.txt` entry is delimited text
/// * `.parquet`      – columnar file with the same column names
pub fn load_file(path: &Path, columns: &ColumnMapping) -> Result<VisitDataset> {
    if !path.exists() {
        return Err(Error::unreadable(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        ));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" | "txt" => {
            let bytes = std::fs::read(path).map_err(|e| Error::unreadable(path, e))?;
            read_delimited(&bytes, columns)?
        }
        "zip" => load_zip(path, columns)?,
        "parquet" | "pq" => load_parquet(path, columns)?,
        other => return Err(Error::UnsupportedFormat(other.to_string())),
    };

    let dataset = VisitDataset::from_records(records);
    log::info!(
        "Loaded {} visits from {} ({} with unparseable date)",
        dataset.len(),
        path.display(),
        dataset.undated
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse `DD/MM/YYYY[ trailing text]`. Anything else yields `None`.
pub fn parse_visit_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    NaiveDate::parse_from_str(token, "%d/%m/%Y").ok()
}

/// Age from integer or decimal text (`,` or `.` separator), kept
/// unrounded. Negative, non-finite or non-numeric is `None`.
pub fn parse_age(raw: &str) -> Option<f64> {
    let value = raw.trim().replace(',', ".").parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn optional_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    (!raw.is_empty()).then(|| raw.to_string())
}

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

/// Encoding the dataset bytes were decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Decode as UTF-8 (dropping a BOM), or as Latin-1 when that fails.
pub fn decode_text(bytes: &[u8]) -> (String, TextEncoding) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), TextEncoding::Utf8),
        Err(e) => {
            log::debug!("Dataset is not UTF-8 ({e}); decoding as Latin-1");
            // Latin-1 maps every byte to the code point of the same value.
            (bytes.iter().map(|&b| char::from(b)).collect(), TextEncoding::Latin1)
        }
    }
}

// ---------------------------------------------------------------------------
// Delimited text loader
// ---------------------------------------------------------------------------

/// Column positions of the record fields within a header.
struct ColumnIndex {
    date: usize,
    patient_id: usize,
    age: usize,
    sex: usize,
    code: usize,
    specialty: usize,
    insurer: usize,
    municipality: usize,
}

impl ColumnIndex {
    fn resolve<F>(columns: &ColumnMapping, position: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<usize>,
    {
        let find = |name: &str| position(name).ok_or_else(|| Error::MissingColumn(name.to_string()));
        Ok(ColumnIndex {
            date: find(&columns.date)?,
            patient_id: find(&columns.patient_id)?,
            age: find(&columns.age)?,
            sex: find(&columns.sex)?,
            code: find(&columns.code)?,
            specialty: find(&columns.specialty)?,
            insurer: find(&columns.insurer)?,
            municipality: find(&columns.municipality)?,
        })
    }
}

/// Parse delimited text bytes into records.
pub fn read_delimited(bytes: &[u8], columns: &ColumnMapping) -> Result<Vec<VisitRecord>> {
    let (text, encoding) = decode_text(bytes);
    log::info!("Reading delimited dataset as {encoding:?}");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(columns.delimiter_byte())
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let index = ColumnIndex::resolve(columns, |name| headers.iter().position(|h| h == name))?;

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result?;
        let cell = |i: usize| row.get(i).unwrap_or("");
        records.push(VisitRecord {
            date: parse_visit_date(cell(index.date)),
            patient_id: cell(index.patient_id).trim().to_string(),
            age: parse_age(cell(index.age)),
            sex: optional_text(cell(index.sex)),
            code: cell(index.code).trim().to_string(),
            specialty: cell(index.specialty).trim().to_string(),
            insurer: cell(index.insurer).trim().to_string(),
            municipality: cell(index.municipality).trim().to_string(),
        });
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// ZIP loader
// ---------------------------------------------------------------------------

fn load_zip(path: &Path, columns: &ColumnMapping) -> Result<Vec<VisitRecord>> {
    let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_ascii_lowercase();
        if entry.is_dir() || !(name.ends_with(".csv") || name.ends_with(".txt")) {
            continue;
        }
        log::debug!("Reading archive entry {}", entry.name());
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        return read_delimited(&bytes, columns);
    }

    Err(Error::EmptyArchive(path.to_path_buf()))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file whose columns carry the configured names.
///
/// Dates may be `Date32`/`Date64` or `DD/MM/YYYY` strings; every other
/// column is read through its display form.
fn load_parquet(path: &Path, columns: &ColumnMapping) -> Result<Vec<VisitRecord>> {
    let file = File::open(path).map_err(|e| Error::unreadable(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    // Checked against the file schema so a file with no row groups still
    // reports missing columns.
    let index = ColumnIndex::resolve(columns, |name| builder.schema().index_of(name).ok())?;
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result?;
        let col = |i: usize| batch.column(i);

        for row in 0..batch.num_rows() {
            records.push(VisitRecord {
                date: date_cell(col(index.date), row),
                patient_id: text_cell(col(index.patient_id), row),
                age: parse_age(&text_cell(col(index.age), row)),
                sex: optional_text(&text_cell(col(index.sex), row)),
                code: text_cell(col(index.code), row),
                specialty: text_cell(col(index.specialty), row),
                insurer: text_cell(col(index.insurer), row),
                municipality: text_cell(col(index.municipality), row),
            });
        }
    }
    Ok(records)
}

// -- Parquet / Arrow helpers --

/// Cell as trimmed text; nulls and unrenderable values become empty.
fn text_cell(col: &ArrayRef, row: usize) -> String {
    if col.is_null(row) {
        return String::new();
    }
    let text = match col.data_type() {
        DataType::Utf8 => col.as_string::<i32>().value(row).to_string(),
        DataType::LargeUtf8 => col.as_string::<i64>().value(row).to_string(),
        _ => array_value_to_string(col, row).unwrap_or_default(),
    };
    text.trim().to_string()
}

fn date_cell(col: &ArrayRef, row: usize) -> Option<NaiveDate> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Date32 => col.as_primitive::<Date32Type>().value_as_date(row),
        DataType::Date64 => col.as_primitive::<Date64Type>().value_as_date(row),
        _ => parse_visit_date(&text_cell(col, row)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_takes_first_token() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_visit_date("05/01/2024"), expected);
        assert_eq!(parse_visit_date("05/01/2024 13:45:00"), expected);
        assert_eq!(parse_visit_date("  05/01/2024"), expected);
        assert_eq!(parse_visit_date("2024-01-05"), None);
        assert_eq!(parse_visit_date("31/02/2024"), None);
        assert_eq!(parse_visit_date(""), None);
    }

    #[test]
    fn age_keeps_decimal_text_unrounded() {
        assert_eq!(parse_age("42"), Some(42.0));
        assert_eq!(parse_age(" 42.9 "), Some(42.9));
        assert_eq!(parse_age("7,5"), Some(7.5));
        assert_eq!(parse_age("NaN"), None);
        assert_eq!(parse_age("-3"), None);
        assert_eq!(parse_age("abc"), None);
        assert_eq!(parse_age(""), None);
    }

    #[test]
    fn latin1_fallback_decodes_accents() {
        let (text, encoding) = decode_text(b"S\xe3o Mateus");
        assert_eq!(encoding, TextEncoding::Latin1);
        assert_eq!(text, "São Mateus");

        let (text, encoding) = decode_text("\u{feff}São Mateus".as_bytes());
        assert_eq!(encoding, TextEncoding::Utf8);
        assert_eq!(text, "São Mateus");
    }

    #[test]
    fn missing_column_is_reported() {
        let err = read_delimited(b"DT_ATENDIMENTO;CD_PACIENTE\n01/01/2024;1\n", &ColumnMapping::default())
            .unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "IDADE"));
    }
}
