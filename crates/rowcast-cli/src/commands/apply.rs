//! Apply command - cast a record file with a rules file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use rowcast::{
    chunk_each, paginate, write_records, Caster, CasterError, InputFormat, OutputFormat, Parser,
    ParserConfig, RuleSpec, TypeRegistry,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Options for `rowcast apply`.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub input: PathBuf,
    pub rules: PathBuf,
    pub output: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub input_format: Option<InputFormat>,
    pub all_fields: bool,
    pub paginate: bool,
    pub chunk_size: usize,
    pub delimiter: Option<char>,
    pub no_header: bool,
}

pub fn run(opts: ApplyOptions) -> Result<(), Box<dyn std::error::Error>> {
    if !opts.input.exists() {
        return Err(format!("Input file not found: {}", opts.input.display()).into());
    }

    let delimiter = match opts.delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => return Err(format!("Delimiter must be a single ASCII character, got '{}'", c).into()),
        None => None,
    };

    let spec = RuleSpec::from_file(&opts.rules)?;
    let caster = spec.build(Arc::new(TypeRegistry::with_builtins()))?;

    let parser = Parser::with_config(ParserConfig {
        format: opts.input_format,
        delimiter,
        has_header: !opts.no_header,
        ..Default::default()
    });
    let (data, source) = parser.parse_file(&opts.input)?;

    let cast = cast_in_chunks(&caster, data, opts.chunk_size, opts.all_fields)?;
    let count = match &cast {
        Value::Array(items) => items.len(),
        _ => 1,
    };

    let format = opts
        .format
        .or_else(|| opts.output.as_deref().and_then(OutputFormat::from_path))
        .unwrap_or_default();

    let cast = if opts.paginate {
        if format == OutputFormat::Json {
            serde_json::to_value(paginate(count, cast))?
        } else {
            warn!(format = %format, "--paginate only applies to JSON output, ignoring");
            cast
        }
    } else {
        cast
    };

    match &opts.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CasterError::Io {
                path: path.clone(),
                source: e,
            })?;
            let mut writer = BufWriter::new(file);
            write_records(&cast, format, &mut writer)?;
            writer.flush()?;

            info!(file = %path.display(), format = %format, records = count, "wrote output");
            println!(
                "{} {} records from {} to {}",
                "Cast".green().bold(),
                count.to_string().white().bold(),
                source.file.cyan(),
                path.display().to_string().cyan()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_records(&cast, format, &mut writer)?;
            writer.flush()?;
            info!(format = %format, records = count, "wrote output to stdout");
        }
    }

    Ok(())
}

/// Cast a record, or a list of records chunk by chunk.
fn cast_in_chunks(
    caster: &Caster,
    data: Value,
    chunk_size: usize,
    all_fields: bool,
) -> Result<Value, CasterError> {
    let items = match data {
        Value::Array(items) => items,
        other => return caster.transform(&other, all_fields),
    };

    let mut cast = Vec::with_capacity(items.len());
    let mut failure = None;

    chunk_each(&items, chunk_size, |chunk, page| {
        if failure.is_some() {
            return;
        }
        debug!(page, records = chunk.len(), "casting chunk");
        match caster.transform(&Value::Array(chunk.to_vec()), all_fields) {
            Ok(Value::Array(records)) => cast.extend(records),
            Ok(other) => cast.push(other),
            Err(e) => failure = Some(e),
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(Value::Array(cast)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn options(dir: &TempDir, input: &str, rules: &str, output: &str) -> ApplyOptions {
        ApplyOptions {
            input: dir.path().join(input),
            rules: dir.path().join(rules),
            output: Some(dir.path().join(output)),
            format: None,
            input_format: None,
            all_fields: false,
            paginate: false,
            chunk_size: 2,
            delimiter: None,
            no_header: false,
        }
    }

    #[test]
    fn test_apply_csv_to_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.csv"), "id,active,secret\n1,1,x\n2,0,y\n3,,z\n").unwrap();
        fs::write(
            dir.path().join("rules.json"),
            r#"{"deny": ["secret"], "integer": ["id"], "boolean": ["active"]}"#,
        )
        .unwrap();

        run(options(&dir, "in.csv", "rules.json", "out.json")).unwrap();

        let out: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out.json")).unwrap()).unwrap();
        assert_eq!(
            out,
            json!([
                {"id": 1, "active": true},
                {"id": 2, "active": false},
                {"id": 3, "active": false},
            ])
        );
    }

    #[test]
    fn test_apply_paginated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.jsonl"), "{\"a\": 1}\n{\"a\": 2}\n").unwrap();
        fs::write(dir.path().join("rules.json"), "{}").unwrap();

        let mut opts = options(&dir, "in.jsonl", "rules.json", "out.json");
        opts.paginate = true;
        run(opts).unwrap();

        let out: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("out.json")).unwrap()).unwrap();
        assert_eq!(out, json!({"total": 2, "list": [{"a": "1"}, {"a": "2"}]}));
    }

    #[test]
    fn test_apply_undefined_rule_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("in.json"), r#"{"a": 1}"#).unwrap();
        fs::write(dir.path().join("rules.json"), r#"{"money": ["a"]}"#).unwrap();

        let err = run(options(&dir, "in.json", "rules.json", "out.json")).unwrap_err();
        assert_eq!(err.to_string(), "Call undefined method [money]!");
        assert!(!dir.path().join("out.json").exists());
    }

    #[test]
    fn test_cast_in_chunks_keeps_order() {
        let caster = Caster::new().allow(["n"]);
        let data = json!([{"n": 1}, {"n": 2}, {"n": 3}]);
        let out = cast_in_chunks(&caster, data, 2, false).unwrap();
        assert_eq!(out, json!([{"n": "1"}, {"n": "2"}, {"n": "3"}]));
    }
}
