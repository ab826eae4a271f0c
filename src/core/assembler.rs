//! Builds the output table: one primary row per input row, left-joined with
//! any expanded sub-rows on `sno` plus the endpoint's join columns.

use crate::core::endpoint::{EndpointDescriptor, FlattenMode};
use crate::core::flatten::{data_root, expand, flatten, flatten_recursive, verdict, PATH_SEPARATOR};
use crate::domain::model::{
    ExpandedRow, FlattenedRow, InputBatch, OutputTable, RowOutcome, MESSAGE_COLUMN, SERIAL_COLUMN,
    SUB_SERIAL_COLUMN, VALID_COLUMN,
};
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub table: OutputTable,
    pub expanded: Vec<ExpandedRow>,
}

struct PrimaryRow {
    serial: String,
    join_values: Vec<String>,
    valid: bool,
    message: String,
    derived: FlattenedRow,
}

pub fn assemble(
    batch: &InputBatch,
    outcomes: &[RowOutcome],
    descriptor: &EndpointDescriptor,
) -> Assembled {
    let join_columns = descriptor.join_columns();
    let list_field = descriptor.expand.as_ref().map(|e| e.list_field.as_str());

    let mut primaries = Vec::with_capacity(outcomes.len());
    let mut expanded = Vec::new();
    let mut expanded_keys: HashSet<(String, Vec<String>)> = HashSet::new();

    for outcome in outcomes {
        let record = batch.records.iter().find(|r| r.index == outcome.index);
        let join_values: Vec<String> = join_columns
            .iter()
            .map(|col| record.map(|r| r.value(col).trim().to_string()).unwrap_or_default())
            .collect();

        let (valid, message) = verdict(&outcome.result, descriptor);
        let root = data_root(&outcome.result.payload, descriptor);
        let derived = if outcome.result.success {
            match descriptor.flatten {
                FlattenMode::Direct => flatten(root, &descriptor.expected_keys),
                FlattenMode::Recursive => flatten_recursive(root, PATH_SEPARATOR),
            }
        } else {
            FlattenedRow::new()
        };

        if let Some(list_field) = list_field {
            let key = (outcome.serial.clone(), join_values.clone());
            if outcome.result.success && !outcome.serial.is_empty() && expanded_keys.insert(key) {
                expanded.extend(expand(root, list_field, &outcome.serial, &join_values));
            }
        }

        primaries.push(PrimaryRow {
            serial: outcome.serial.clone(),
            join_values,
            valid,
            message,
            derived,
        });
    }

    let layout = Layout::build(batch, descriptor, &primaries, &expanded, list_field);

    let mut rows = Vec::new();
    for (outcome, primary) in outcomes.iter().zip(&primaries) {
        let record = batch.records.iter().find(|r| r.index == outcome.index);
        let base: Vec<String> = layout
            .primary
            .iter()
            .map(|column| match column.as_str() {
                SERIAL_COLUMN => primary.serial.clone(),
                VALID_COLUMN => primary.valid.to_string(),
                MESSAGE_COLUMN => primary.message.clone(),
                name if layout.inputs.contains(name) => {
                    record.map(|r| r.value(name).to_string()).unwrap_or_default()
                }
                name => primary.derived.get(name).unwrap_or("").to_string(),
            })
            .collect();

        let matches: Vec<&ExpandedRow> = expanded
            .iter()
            .filter(|e| e.serial == primary.serial && e.join_values == primary.join_values)
            .collect();

        if matches.is_empty() || list_field.is_none() {
            let mut row = base;
            let padding = layout.expansion.len() + layout.sub_serial_width();
            row.extend(std::iter::repeat(String::new()).take(padding));
            rows.push(row);
            continue;
        }

        for sub in matches {
            let mut row = base.clone();
            row.push(sub.sub_serial.to_string());
            for (source, _) in &layout.expansion {
                row.push(sub.fields.get(source).unwrap_or("").to_string());
            }
            rows.push(row);
        }
    }

    let mut columns = layout.primary.clone();
    if list_field.is_some() {
        columns.push(SUB_SERIAL_COLUMN.to_string());
        columns.extend(layout.expansion.iter().map(|(_, name)| name.clone()));
    }

    Assembled {
        table: OutputTable { columns, rows },
        expanded,
    }
}

struct Layout {
    primary: Vec<String>,
    inputs: HashSet<String>,
    /// (field path inside the expanded row, output column name)
    expansion: Vec<(String, String)>,
    expands: bool,
}

impl Layout {
    fn build(
        batch: &InputBatch,
        descriptor: &EndpointDescriptor,
        primaries: &[PrimaryRow],
        expanded: &[ExpandedRow],
        list_field: Option<&str>,
    ) -> Self {
        let mut primary: Vec<String> = Vec::new();

        push(&mut primary, SERIAL_COLUMN);
        for column in descriptor.input_columns() {
            push(&mut primary, column);
        }
        push(&mut primary, VALID_COLUMN);
        push(&mut primary, MESSAGE_COLUMN);
        for column in &batch.columns {
            push(&mut primary, column);
        }

        let inputs: HashSet<String> = primary
            .iter()
            .filter(|c| !matches!(c.as_str(), SERIAL_COLUMN | VALID_COLUMN | MESSAGE_COLUMN))
            .cloned()
            .collect();

        match descriptor.flatten {
            FlattenMode::Direct => {
                for field in &descriptor.expected_keys {
                    if Some(field.column()) != list_field {
                        push(&mut primary, field.column());
                    }
                }
            }
            FlattenMode::Recursive => {
                for row in primaries {
                    for key in row.derived.keys() {
                        push(&mut primary, key);
                    }
                }
            }
        }

        let mut expansion: Vec<(String, String)> = Vec::new();
        for row in expanded {
            for key in row.fields.keys() {
                if expansion.iter().any(|(source, _)| source == key) {
                    continue;
                }
                let taken = primary.iter().any(|c| c == key) || key == SUB_SERIAL_COLUMN;
                let name = match (taken, list_field) {
                    (true, Some(list)) => format!("{}{}{}", list, PATH_SEPARATOR, key),
                    _ => key.to_string(),
                };
                expansion.push((key.to_string(), name));
            }
        }

        Self {
            primary,
            inputs,
            expansion,
            expands: list_field.is_some(),
        }
    }

    fn sub_serial_width(&self) -> usize {
        usize::from(self.expands)
    }
}

fn push(columns: &mut Vec<String>, name: &str) {
    if !columns.iter().any(|c| c == name) {
        columns.push(name.to_string());
    }
}
