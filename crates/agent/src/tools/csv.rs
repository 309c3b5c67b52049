//! CSV reader tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use smartagent_config::expand_tilde;
use smartagent_provider::{ParameterSchema, PropertySchema, ToolDescriptor};
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::{parse_args, Tool, ToolError, ToolResult};

/// Reads a CSV file with a header row into one object per row
#[derive(Debug, Default)]
pub struct CsvTool;

impl CsvTool {
    pub const NAME: &'static str = "CSV Tool";

    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
struct CsvArgs {
    file_path: String,
}

type Rows = Vec<Map<String, Value>>;

fn read_csv(path: &Path) -> Result<(Rows, Vec<String>), csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // Short rows get nulls for the missing columns; extra fields are dropped
        let row = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = record
                    .get(i)
                    .map(|field| Value::String(field.to_string()))
                    .unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect();
        rows.push(row);
    }

    Ok((rows, columns))
}

fn is_not_found(err: &csv::Error) -> bool {
    matches!(err.kind(), csv::ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound)
}

#[async_trait]
impl Tool for CsvTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Retrieves CSV data and metadata from a file.",
            ParameterSchema::object().property(
                "file_path",
                PropertySchema::string("Full or relative path to the CSV file"),
                true,
            ),
        )
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let args: CsvArgs = parse_args(Self::NAME, args)?;
        debug!("Reading CSV file: {}", args.file_path);

        let path = expand_tilde(&args.file_path);
        let outcome = tokio::task::spawn_blocking(move || read_csv(&path))
            .await
            .map_err(|e| ToolError::Execution {
                tool: Self::NAME.to_string(),
                message: e.to_string(),
            })?;

        match outcome {
            Ok((rows, columns)) => {
                info!(
                    "Successfully read CSV file: {} with {} rows",
                    args.file_path,
                    rows.len()
                );
                let mut meta = Map::new();
                meta.insert("columns".to_string(), json!(columns));
                meta.insert("row_count".to_string(), json!(rows.len()));
                meta.insert("file_path".to_string(), json!(args.file_path));

                let data = Value::Array(rows.into_iter().map(Value::Object).collect());
                Ok(ToolResult::new(data, meta))
            }
            Err(e) if is_not_found(&e) => {
                warn!("CSV file not found: {}", args.file_path);
                Ok(ToolResult::error(format!(
                    "File '{}' not found.",
                    args.file_path
                )))
            }
            Err(e) => {
                error!("Error reading CSV file {}: {}", args.file_path, e);
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}
