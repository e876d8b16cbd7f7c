//! Writing transformed records.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cast::Record;
use crate::error::{CasterError, Result};

/// Output formats for transformed records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON, same shape as the input.
    #[default]
    Json,
    /// One record per line.
    JsonLines,
    /// Header row plus one row per record.
    Csv,
}

impl OutputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(OutputFormat::Json),
            "jsonl" | "ndjson" => Some(OutputFormat::JsonLines),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = CasterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::JsonLines),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(CasterError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonLines => write!(f, "jsonl"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Write a record or list of records.
///
/// JSON Lines writes each list element on its own line. CSV flattens nested
/// lists and skips anything that is not a record.
pub fn write_records<W: Write>(value: &Value, format: OutputFormat, mut writer: W) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, value)?;
            writeln!(writer).map_err(serde_json::Error::io)?;
        }
        OutputFormat::JsonLines => {
            let lines: Vec<&Value> = match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            };
            for line in lines {
                serde_json::to_writer(&mut writer, line)?;
                writeln!(writer).map_err(serde_json::Error::io)?;
            }
        }
        OutputFormat::Csv => write_csv(value, writer)?,
    }
    Ok(())
}

fn write_csv<W: Write>(value: &Value, writer: W) -> Result<()> {
    let mut rows = Vec::new();
    collect_records(value, &mut rows);

    let header: IndexSet<&str> = rows
        .iter()
        .flat_map(|row| row.keys().map(String::as_str))
        .collect();

    if header.is_empty() {
        return Ok(());
    }
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&header)?;

    for row in &rows {
        let cells: Vec<String> = header
            .iter()
            .map(|key| match row.get(*key) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        csv_writer.write_record(&cells)?;
    }

    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn collect_records<'a>(value: &'a Value, rows: &mut Vec<&'a Record>) {
    match value {
        Value::Object(row) => rows.push(row),
        Value::Array(items) => {
            for item in items {
                collect_records(item, rows);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_records(value, format, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_json_lines() {
        let out = render(&json!([{"a": 1}, {"a": 2}]), OutputFormat::JsonLines);
        assert_eq!(out, "{\"a\":1}\n{\"a\":2}\n");

        let out = render(&json!({"a": 1}), OutputFormat::JsonLines);
        assert_eq!(out, "{\"a\":1}\n");
    }

    #[test]
    fn test_json_round_trips() {
        let value = json!([{"a": 1, "b": [true]}]);
        let out = render(&value, OutputFormat::Json);
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap(), value);
    }

    #[test]
    fn test_csv_header_union_and_cells() {
        let value = json!([
            {"id": 1, "name": "Ada"},
            {"id": 2, "tags": ["x", "y"], "note": null},
            5
        ]);
        let out = render(&value, OutputFormat::Csv);

        assert_eq!(
            out,
            "id,name,tags,note\n1,Ada,,\n2,,\"[\"\"x\"\",\"\"y\"\"]\",\n"
        );
    }

    #[test]
    fn test_csv_empty() {
        assert_eq!(render(&json!([]), OutputFormat::Csv), "");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out.ndjson")),
            Some(OutputFormat::JsonLines)
        );
        assert_eq!(OutputFormat::from_path(Path::new("out.tsv")), None);
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
    }
}
