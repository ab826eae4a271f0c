use crate::domain::model::OutputTable;
use crate::utils::error::{Result, VerifyError};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
}

impl OutputFormat {
    pub const ALL: [&'static str; 3] = ["csv", "tsv", "json"];

    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            _ => Err(VerifyError::InvalidConfigValueError {
                field: "load.output_formats".to_string(),
                value: name.to_string(),
                reason: format!("Supported formats: {}", Self::ALL.join(", ")),
            }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Json => "json",
        }
    }

    pub fn render(&self, table: &OutputTable) -> Result<Vec<u8>> {
        match self {
            Self::Csv => render_delimited(table, b','),
            Self::Tsv => render_delimited(table, b'\t'),
            Self::Json => Ok(serde_json::to_vec_pretty(&JsonTable(table))?),
        }
    }
}

fn render_delimited(table: &OutputTable, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| VerifyError::ProcessingError {
            message: format!("Failed to flush output: {}", e),
        })
}

/// Array of row objects with keys in column order.
struct JsonTable<'a>(&'a OutputTable);

struct JsonRow<'a> {
    columns: &'a [String],
    cells: &'a [String],
}

impl Serialize for JsonTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.rows.len()))?;
        for row in &self.0.rows {
            seq.serialize_element(&JsonRow {
                columns: &self.0.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for JsonRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}
