//! Record file parser for JSON, JSON Lines and CSV/TSV.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::cast::Record;
use crate::error::{CasterError, Result};
use super::source::{InputFormat, SourceMetadata};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Input format (None = detect from extension).
    pub format: Option<InputFormat>,
    /// Delimiter for CSV/TSV (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether delimited files have a header row.
    pub has_header: bool,
    /// Maximum records to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            format: None,
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
        }
    }
}

/// Reads record files.
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a new parser with default configuration.
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }

    /// Create a parser with custom configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse a file into a record or list of records, plus metadata.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<(Value, SourceMetadata)> {
        let path = path.as_ref();

        let mut file = File::open(path).map_err(|e| CasterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(|e| CasterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let size_bytes = contents.len() as u64;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let format = match self.config.format.or_else(|| InputFormat::from_path(path)) {
            Some(format) => format,
            None => {
                return Err(CasterError::UnsupportedFormat(path.display().to_string()));
            }
        };

        let (records, format_name) = match format {
            InputFormat::Json => (self.parse_json(&contents)?, "json".to_string()),
            InputFormat::JsonLines => (self.parse_json_lines(&contents)?, "jsonl".to_string()),
            InputFormat::Delimited => {
                let delimiter = match self.config.delimiter {
                    Some(d) => d,
                    None => detect_delimiter(&contents)?,
                };
                debug!(delimiter = %(delimiter as char).escape_default(), "using delimiter");
                (
                    self.parse_delimited(&contents, delimiter)?,
                    delimiter_format(delimiter).to_string(),
                )
            }
        };

        let record_count = match &records {
            Value::Array(items) => items.len(),
            _ => 1,
        };
        info!(
            file = %path.display(),
            format = %format_name,
            records = record_count,
            "read input"
        );

        let source_metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format_name,
            record_count,
        );

        Ok((records, source_metadata))
    }

    /// Parse bytes in the given format. Delimited input auto-detects its
    /// delimiter unless one is configured.
    pub fn parse_bytes(&self, bytes: &[u8], format: InputFormat) -> Result<Value> {
        match format {
            InputFormat::Json => self.parse_json(bytes),
            InputFormat::JsonLines => self.parse_json_lines(bytes),
            InputFormat::Delimited => {
                let delimiter = match self.config.delimiter {
                    Some(d) => d,
                    None => detect_delimiter(bytes)?,
                };
                self.parse_delimited(bytes, delimiter)
            }
        }
    }

    /// A single JSON record or list.
    fn parse_json(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(CasterError::EmptyData("No JSON content".to_string()));
        }

        match serde_json::from_slice::<Value>(bytes)? {
            Value::Array(mut items) => {
                if let Some(max) = self.config.max_rows {
                    items.truncate(max);
                }
                Ok(Value::Array(items))
            }
            record @ Value::Object(_) => Ok(record),
            other => Err(CasterError::NotARecord(format!("JSON {}", json_kind(&other)))),
        }
    }

    /// One JSON value per non-blank line.
    fn parse_json_lines(&self, bytes: &[u8]) -> Result<Value> {
        let reader = BufReader::new(bytes);
        let mut items = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            if let Some(max) = self.config.max_rows {
                if items.len() >= max {
                    break;
                }
            }

            let line = line.map_err(|e| CasterError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let value = serde_json::from_str(&line).map_err(|e| CasterError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })?;
            items.push(value);
        }

        if items.is_empty() {
            return Err(CasterError::EmptyData("No JSON lines found".to_string()));
        }

        Ok(Value::Array(items))
    }

    /// CSV/TSV rows as records of strings keyed by header.
    fn parse_delimited(&self, bytes: &[u8], delimiter: u8) -> Result<Value> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut headers: Vec<String> = if self.config.has_header {
            reader.headers()?.iter().map(|s| s.to_string()).collect()
        } else {
            Vec::new()
        };

        if self.config.has_header && headers.is_empty() {
            return Err(CasterError::EmptyData("No columns found".to_string()));
        }

        let mut rows = Vec::new();

        for (row_idx, result) in reader.records().enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;

            // Without a header, the first row fixes the column count
            if headers.is_empty() {
                headers = (0..record.len())
                    .map(|i| format!("column_{}", i + 1))
                    .collect();
            }

            let mut values = record.iter();
            let row: Record = headers
                .iter()
                .map(|header| {
                    let value = values.next().unwrap_or_default();
                    (header.clone(), Value::String(value.to_string()))
                })
                .collect();

            rows.push(Value::Object(row));
        }

        if rows.is_empty() {
            return Err(CasterError::EmptyData("No data rows found".to_string()));
        }

        Ok(Value::Array(rows))
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

fn delimiter_format(delimiter: u8) -> &'static str {
    match delimiter {
        b'\t' => "tsv",
        b',' => "csv",
        b';' => "csv-semicolon",
        b'|' => "psv",
        _ => "delimited",
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(CasterError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Higher count with lower variance wins; tab gets a small bonus
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}
