use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::EgaError;

/// One line of a mapping file, keyed by column name in column order.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Auto,
    Tab,
    Comma,
}

#[derive(Debug, Clone)]
pub struct MappingOptions {
    pub delimiter: Delimiter,
    /// Reject lines whose field count differs from the header instead of
    /// skipping them.
    pub strict: bool,
    /// Column names for headerless mapping files, keyed by mapping id.
    pub columns: BTreeMap<String, Vec<String>>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Auto,
            strict: true,
            columns: BTreeMap::new(),
        }
    }
}

pub fn parse_mapping<R: Read>(
    mapping_id: &str,
    mut input: R,
    options: &MappingOptions,
) -> Result<Vec<Row>, EgaError> {
    let mut content = Vec::new();
    input
        .read_to_end(&mut content)
        .map_err(|err| EgaError::EntryRead(err.to_string()))?;

    let delimiter = resolve_delimiter(options.delimiter, &content);
    let explicit_columns = options.columns.get(mapping_id);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .quoting(delimiter != b'\t')
        .flexible(true)
        .has_headers(explicit_columns.is_none())
        .from_reader(content.as_slice());

    let (columns, header_line): (Vec<String>, u64) = match explicit_columns {
        Some(columns) => (columns.clone(), 0),
        None => {
            let headers = reader
                .headers()
                .map_err(|err| csv_error(mapping_id, err))?;
            let line = headers.position().map(|pos| pos.line()).unwrap_or(1);
            (
                headers.iter().map(|header| header.trim().to_string()).collect(),
                line,
            )
        }
    };
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let columns = unique_columns(mapping_id, columns, header_line, options.strict)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| csv_error(mapping_id, err))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() != columns.len() {
            let message = format!(
                "expected {} fields, found {}",
                columns.len(),
                record.len()
            );
            if options.strict {
                return Err(EgaError::MalformedMapping {
                    mapping_id: mapping_id.to_string(),
                    line,
                    message,
                });
            }
            warn!(mapping_id, line, "{message}; skipping line");
            continue;
        }

        rows.push(
            columns
                .iter()
                .zip(record.iter())
                .map(|(column, value)| (column.clone(), Value::String(value.to_string())))
                .collect::<Row>(),
        );
    }

    Ok(rows)
}

/// Repeated column names would collapse into one key of a row. Strict mode
/// rejects them; lenient mode suffixes repeats as `NAME_2`, `NAME_3`.
fn unique_columns(
    mapping_id: &str,
    columns: Vec<String>,
    line: u64,
    strict: bool,
) -> Result<Vec<String>, EgaError> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    let mut unique = Vec::with_capacity(columns.len());
    for column in columns {
        let count = seen.entry(column.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            unique.push(column);
            continue;
        }
        if strict {
            return Err(EgaError::MalformedMapping {
                mapping_id: mapping_id.to_string(),
                line,
                message: format!("duplicate column name {column:?}"),
            });
        }
        let mut suffix = *count;
        let mut renamed = format!("{column}_{suffix}");
        while seen.contains_key(&renamed) {
            suffix += 1;
            renamed = format!("{column}_{suffix}");
        }
        warn!(mapping_id, column = %column, renamed = %renamed, "duplicate column name");
        seen.insert(renamed.clone(), 1);
        unique.push(renamed);
    }
    Ok(unique)
}

fn resolve_delimiter(delimiter: Delimiter, content: &[u8]) -> u8 {
    match delimiter {
        Delimiter::Tab => b'\t',
        Delimiter::Comma => b',',
        Delimiter::Auto => {
            let first_line = content
                .split(|byte| *byte == b'\n')
                .find(|line| !line.iter().all(u8::is_ascii_whitespace))
                .unwrap_or_default();
            if first_line.contains(&b'\t') {
                b'\t'
            } else {
                b','
            }
        }
    }
}

fn csv_error(mapping_id: &str, err: csv::Error) -> EgaError {
    EgaError::MalformedMapping {
        mapping_id: mapping_id.to_string(),
        line: err.position().map(|pos| pos.line()).unwrap_or(0),
        message: err.to_string(),
    }
}
