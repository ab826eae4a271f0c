use crate::domain::model::{InputBatch, InputRecord, SERIAL_COLUMN};
use crate::utils::error::{Result, VerifyError};
use calamine::{Data, Reader, Xls, Xlsx};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Xlsx,
    Xls,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            _ => Err(VerifyError::UnsupportedFormat { extension }),
        }
    }
}

const DATE_FORMAT: &str = "%d-%m-%Y";

/// Parses uploads into ordered records. Every cell is kept as text.
pub struct RowSource;

impl RowSource {
    pub fn parse(data: &[u8], format: InputFormat, required: &[String]) -> Result<InputBatch> {
        let (columns, rows) = match format {
            InputFormat::Csv => read_csv(data)?,
            InputFormat::Xlsx => read_workbook::<Xlsx<_>>(data)?,
            InputFormat::Xls => read_workbook::<Xls<_>>(data)?,
        };

        let missing: Vec<String> = required
            .iter()
            .filter(|col| !columns.contains(col))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(VerifyError::MissingColumns { columns: missing });
        }

        let records = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
            .enumerate()
            .map(|(index, row)| {
                let fields: HashMap<String, String> = columns
                    .iter()
                    .cloned()
                    .zip(row.into_iter().chain(std::iter::repeat(String::new())))
                    .collect();
                let serial = fields
                    .get(SERIAL_COLUMN)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default();
                InputRecord {
                    index,
                    serial,
                    fields,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(
            "Parsed {} rows with columns [{}]",
            records.len(),
            columns.join(", ")
        );

        Ok(InputBatch { columns, records })
    }
}

type Rows = (Vec<String>, Vec<Vec<String>>);

fn read_csv(data: &[u8]) -> Result<Rows> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(data);

    let columns = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok((columns, rows))
}

fn read_workbook<R>(data: &[u8]) -> Result<Rows>
where
    R: Reader<Cursor<Vec<u8>>>,
    VerifyError: From<R::Error>,
{
    let mut workbook = R::new(Cursor::new(data.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| VerifyError::SpreadsheetError("Workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| render_cell(cell).trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let rows = rows
        .map(|row| row.iter().map(render_cell).collect())
        .collect();

    Ok((columns, rows))
}

/// Spreadsheet tools store identifiers like serial numbers as floats.
fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(value) => render_datetime(value),
            None => dt.as_f64().to_string(),
        },
        Data::DateTimeIso(raw) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
            .map(render_datetime)
            .unwrap_or_else(|| raw.clone()),
        other => other.to_string(),
    }
}

/// Dates go out as `dd-mm-yyyy`, the form the verification APIs accept.
fn render_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format(DATE_FORMAT).to_string()
    } else {
        value.format(&format!("{} %H:%M:%S", DATE_FORMAT)).to_string()
    }
}
