//! Input formats and source metadata.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CasterError;

/// Supported record file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// A JSON record or list of records.
    Json,
    /// One JSON value per line.
    JsonLines,
    /// CSV/TSV with a header row.
    Delimited,
}

impl InputFormat {
    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::JsonLines),
            "csv" | "tsv" | "psv" | "txt" => Some(InputFormat::Delimited),
            _ => None,
        }
    }
}

impl FromStr for InputFormat {
    type Err = CasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(InputFormat::Json),
            "jsonl" | "ndjson" | "json-lines" => Ok(InputFormat::JsonLines),
            "csv" | "tsv" | "delimited" => Ok(InputFormat::Delimited),
            _ => Err(CasterError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::Json => write!(f, "json"),
            InputFormat::JsonLines => write!(f, "jsonl"),
            InputFormat::Delimited => write!(f, "delimited"),
        }
    }
}

/// Metadata about a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// SHA-256 hash of the file contents.
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Detected format (json, jsonl, csv, tsv, ...).
    pub format: String,
    /// Number of top-level records.
    pub record_count: usize,
    /// When the file was read.
    pub read_at: DateTime<Utc>,
}

impl SourceMetadata {
    /// Create metadata for a file that has been read.
    pub fn new(
        path: PathBuf,
        hash: String,
        size_bytes: u64,
        format: String,
        record_count: usize,
    ) -> Self {
        let file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            file,
            path,
            hash,
            size_bytes,
            format,
            record_count,
            read_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(InputFormat::from_path(Path::new("a.json")), Some(InputFormat::Json));
        assert_eq!(InputFormat::from_path(Path::new("a.NDJSON")), Some(InputFormat::JsonLines));
        assert_eq!(InputFormat::from_path(Path::new("a.tsv")), Some(InputFormat::Delimited));
        assert_eq!(InputFormat::from_path(Path::new("a.parquet")), None);
        assert_eq!(InputFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSONL".parse::<InputFormat>().unwrap(), InputFormat::JsonLines);
        assert!(matches!(
            "xml".parse::<InputFormat>(),
            Err(CasterError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_source_metadata_file_name() {
        let meta = SourceMetadata::new(
            PathBuf::from("/data/users.csv"),
            "sha256:abc".to_string(),
            10,
            "csv".to_string(),
            2,
        );
        assert_eq!(meta.file, "users.csv");
        assert_eq!(meta.record_count, 2);
    }
}
