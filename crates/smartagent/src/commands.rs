//! SmartAgent command implementations

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use smartagent_agent::{AgentSettings, SmartAgent, ToolRegistry};
use smartagent_config::{self as config, Config, ENV_PREFIX};
use smartagent_provider::{OllamaProvider, OllamaStatus, PropertySchema, ToolDescriptor};

use crate::server;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Arguments of `smartagent query`
#[derive(Debug)]
pub struct QueryArgs {
    /// Query text; `None` or `-` reads stdin
    pub input: Option<String>,
    pub format: OutputFormat,
    pub timeout: Option<f64>,
}

async fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    let path = config::resolve_config_path(explicit);
    let config = Config::load_with_env(&path)
        .await
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    Ok((config, path))
}

fn build_provider(config: &Config) -> Result<OllamaProvider> {
    let provider = OllamaProvider::with_timeout(
        Some(config.base_url().to_string()),
        Some(config.model_name()),
        Duration::from_secs(config.model.request_timeout_secs),
    )?;
    Ok(provider)
}

fn build_agent(config: &Config) -> Result<SmartAgent<OllamaProvider>> {
    let provider = build_provider(config)?;
    Ok(SmartAgent::new(
        provider,
        &ToolRegistry::builtin(),
        AgentSettings::from_config(config),
    ))
}

async fn read_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        eprintln!("insert your query and press Ctrl+D to submit");
    }
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("failed to read query from stdin")?;
    Ok(buffer)
}

enum QueryFailure {
    Timeout,
    Failed(anyhow::Error),
}

async fn answer_query(config_path: Option<&Path>, args: &QueryArgs) -> Result<String, QueryFailure> {
    let (config, _) = load_config(config_path).await.map_err(QueryFailure::Failed)?;

    let query = match args.input.as_deref() {
        Some(text) if text != "-" && !text.is_empty() => text.to_string(),
        _ => read_stdin().await.map_err(QueryFailure::Failed)?,
    };

    let secs = args.timeout.unwrap_or(config.query.timeout_secs);
    let limit = Duration::try_from_secs_f64(secs)
        .with_context(|| format!("invalid query timeout {}", secs))
        .map_err(QueryFailure::Failed)?;
    debug!("Running query with {}s timeout", secs);

    let run = async {
        let agent = build_agent(&config)?;
        Ok::<_, anyhow::Error>(agent.run(&query).await?)
    };

    match tokio::time::timeout(limit, run).await {
        Ok(Ok(answer)) => Ok(answer),
        Ok(Err(e)) => Err(QueryFailure::Failed(e)),
        Err(_) => {
            warn!("Query timed out after {}s", secs);
            Err(QueryFailure::Timeout)
        }
    }
}

/// Run one query and print the outcome. Returns false after reporting a
/// failure.
pub async fn query_command(config_path: Option<&Path>, args: QueryArgs) -> bool {
    match answer_query(config_path, &args).await {
        Ok(answer) => {
            info!("Query completed");
            match args.format {
                OutputFormat::Json => {
                    println!("{}", json!({"status": "success", "response": answer}))
                }
                OutputFormat::Text => println!("{}", answer),
            }
            true
        }
        Err(QueryFailure::Timeout) => {
            match args.format {
                OutputFormat::Json => println!("{}", json!({"status": "error", "error": "timeout"})),
                OutputFormat::Text => eprintln!("timeout"),
            }
            false
        }
        Err(QueryFailure::Failed(e)) => {
            match args.format {
                OutputFormat::Json => {
                    eprintln!("{}", json!({"status": "error", "error": format!("{:#}", e)}))
                }
                OutputFormat::Text => eprintln!("Error: {:#}", e),
            }
            false
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoReport {
    version: &'static str,
    platform: String,
    config_path: String,
    env: BTreeMap<String, String>,
    tools: Vec<String>,
    ollama: OllamaStatus,
}

fn smart_agent_env() -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(ENV_PREFIX))
        .collect()
}

fn render_info_text(report: &InfoReport) -> String {
    let env = if report.env.is_empty() {
        "(none)".to_string()
    } else {
        report
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let ollama = &report.ollama;
    let models = if ollama.available_models.is_empty() {
        "(none)".to_string()
    } else {
        ollama.available_models.join(", ")
    };
    let status = serde_json::to_value(ollama.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    [
        format!("version: {}", report.version),
        format!("platform: {}", report.platform),
        format!("config: {}", report.config_path),
        format!("env: {}", env),
        format!("tools: {}", report.tools.join(", ")),
        format!("ollama: {}", status),
        format!("  service_running: {}", ollama.service_running),
        format!("  required_model: {}", ollama.required_model),
        format!("  required_model_available: {}", ollama.required_model_available),
        format!("  available_models: {}", models),
    ]
    .join("\n")
}

/// Print diagnostics
pub async fn info_command(config_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let (config, path) = load_config(config_path).await?;
    let provider = build_provider(&config)?;

    let report = InfoReport {
        version: env!("CARGO_PKG_VERSION"),
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        config_path: path.display().to_string(),
        env: smart_agent_env(),
        tools: ToolRegistry::builtin().load().names(),
        ollama: provider.status(&config.model_name()).await,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Text => println!("{}", render_info_text(&report)),
    }
    Ok(())
}

/// Check the Ollama service and model. Returns false after reporting a
/// failure.
pub async fn health_command(config_path: Option<&Path>) -> bool {
    let checked = async {
        let (config, _) = load_config(config_path).await?;
        let provider = build_provider(&config)?;
        let model = config.model_name();
        provider.validate_setup(&model).await?;
        let available = provider.list_models().await.unwrap_or_default();
        Ok::<_, anyhow::Error>((model, available))
    };

    match checked.await {
        Ok((model, available)) => {
            println!("Ollama health check passed");
            println!("Service is running");
            println!("Required model '{}' is available", model);

            let others: Vec<&str> = available
                .iter()
                .map(String::as_str)
                .filter(|m| *m != model)
                .collect();
            if !others.is_empty() {
                println!("ℹ Other available models: {}", others.join(", "));
            }
            true
        }
        Err(e) => {
            eprintln!("Ollama health check failed:");
            eprintln!("{:#}", e);
            false
        }
    }
}

fn format_constraint_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn constraints(schema: &PropertySchema) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(values) = &schema.enum_values {
        let options: Vec<String> = values.iter().map(format_constraint_value).collect();
        parts.push(format!("Options: {}", options.join(", ")));
    }
    if let Some(min) = schema.minimum {
        parts.push(format!("Min: {}", min));
    }
    if let Some(max) = schema.maximum {
        parts.push(format!("Max: {}", max));
    }
    if let Some(default) = &schema.default {
        parts.push(format!("Default: {}", format_constraint_value(default)));
    }
    parts
}

fn render_tool_detail(descriptor: &ToolDescriptor) -> String {
    let function = &descriptor.function;
    let mut lines = vec![
        format!("📋 {}", function.name),
        format!("   {}", function.description),
    ];

    let parameters = &function.parameters;
    if parameters.properties.is_empty() {
        lines.push("   No parameters required".to_string());
        return lines.join("\n");
    }

    lines.push("   Parameters:".to_string());
    for (name, schema) in &parameters.properties {
        let marker = if parameters.is_required(name) { "●" } else { "○" };
        lines.push(format!("     {} {} ({})", marker, name, schema.kind));
        lines.push(format!(
            "       {}",
            schema.description.as_deref().unwrap_or("No description")
        ));

        let constraints = constraints(schema);
        if !constraints.is_empty() {
            lines.push(format!("       {}", constraints.join(" | ")));
        }
    }
    lines.join("\n")
}

fn render_tool_list(descriptors: &[ToolDescriptor]) -> String {
    let width = descriptors
        .iter()
        .map(|d| d.function.name.chars().count())
        .max()
        .unwrap_or(0);
    descriptors
        .iter()
        .map(|d| {
            format!(
                "{:<width$}  {}",
                d.function.name,
                d.function.description,
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// List available tools
pub fn tools_list_command(verbose: bool) {
    let descriptors = ToolRegistry::builtin().load().descriptors();
    if descriptors.is_empty() {
        println!("No tools found.");
        return;
    }

    if verbose {
        let details: Vec<String> = descriptors.iter().map(render_tool_detail).collect();
        println!("{}", details.join("\n\n"));
    } else {
        println!("{}", render_tool_list(&descriptors));
    }
}

/// Describe one tool. Returns false when no tool has that name.
pub fn tools_describe_command(name: &str) -> bool {
    let tools = ToolRegistry::builtin().load();
    match tools.get(name) {
        Some(tool) => {
            println!("{}", render_tool_detail(&tool.describe()));
            true
        }
        None => {
            eprintln!("Tool '{}' not found", name);
            false
        }
    }
}

/// Start the HTTP server
pub async fn run_command(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let (mut config, _) = load_config(config_path).await?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let agent = Arc::new(build_agent(&config)?);
    if let Err(e) = agent.check_ready().await {
        warn!("Model is not ready yet, /answer will fail until it is:\n{}", e);
    }

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("SmartAgent API listening on http://{}", addr);

    axum::serve(listener, server::build_app(agent))
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Write a default config file
pub async fn init_command(config_path: Option<&Path>) -> Result<()> {
    let path = config::resolve_config_path(config_path);
    let existed = path.exists();
    config::init(&path).await?;

    if existed {
        println!("✓ Config already exists at {}", path.display());
    } else {
        println!("✓ Created config at {}", path.display());
    }
    println!();
    println!("Next steps:");
    println!("  - Start Ollama and pull the model: ollama pull {}", Config::default().model.name);
    println!("  - Check the setup:                smartagent info health");
    println!("  - Ask something:                  smartagent query \"what is in notes.md?\"");
    Ok(())
}
