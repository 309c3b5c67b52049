//! Markdown reader tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use smartagent_config::expand_tilde;
use smartagent_provider::{ParameterSchema, PropertySchema, ToolDescriptor};
use tracing::{debug, error, info, warn};

use super::{parse_args, Tool, ToolError, ToolResult};

/// Returns a markdown file's text with simple structural statistics
#[derive(Debug, Default)]
pub struct MarkdownTool;

impl MarkdownTool {
    pub const NAME: &'static str = "Markdown Tool";

    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
struct MarkdownArgs {
    file_path: String,
}

fn analyze(file_path: &str, content: &str) -> Map<String, Value> {
    let lines: Vec<&str> = content.lines().collect();
    let summary = lines.first().copied().unwrap_or("No content");
    let headers: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|line| line.starts_with('#'))
        .collect();

    let mut meta = Map::new();
    meta.insert("file_path".to_string(), json!(file_path));
    meta.insert("length".to_string(), json!(content.chars().count()));
    meta.insert("summary".to_string(), json!(summary));
    meta.insert("lines_count".to_string(), json!(lines.len()));
    meta.insert("headers".to_string(), json!(headers));
    meta.insert(
        "word_count".to_string(),
        json!(content.split_whitespace().count()),
    );
    meta
}

#[async_trait]
impl Tool for MarkdownTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            "Reads and analyzes markdown files, extracting content and metadata.",
            ParameterSchema::object().property(
                "file_path",
                PropertySchema::string("Path to the markdown file to read"),
                true,
            ),
        )
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let args: MarkdownArgs = parse_args(Self::NAME, args)?;
        debug!("Reading Markdown file: {}", args.file_path);

        let path = expand_tilde(&args.file_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                info!(
                    "Successfully read Markdown file: {} ({} characters)",
                    args.file_path,
                    content.chars().count()
                );
                let meta = analyze(&args.file_path, &content);
                Ok(ToolResult::new(content, meta))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Markdown file not found: {}", args.file_path);
                Ok(ToolResult::error(format!(
                    "File '{}' not found.",
                    args.file_path
                )))
            }
            Err(e) => {
                error!("Error reading Markdown file {}: {}", args.file_path, e);
                Ok(ToolResult::error(e.to_string()))
            }
        }
    }
}
