//! SmartAgent - local LLM assistant with file-reading tools

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

mod commands;
mod logging;
mod server;

use commands::{
    health_command, info_command, init_command, query_command, run_command, tools_describe_command,
    tools_list_command, OutputFormat, QueryArgs,
};
use logging::{LogFormat, LogLevel};

/// SmartAgent - ask questions, let the model read your files
#[derive(Parser)]
#[command(name = "smartagent")]
#[command(about = "Route natural-language queries to a local LLM with file-reading tools")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Color)]
    log_format: LogFormat,

    /// Config file (default: ~/.smartagent/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query and print the answer
    Query {
        /// Query text; '-' or nothing reads stdin
        #[arg(value_name = "TEXT")]
        query: Option<String>,

        /// Inline text; use '-' for stdin
        #[arg(long, conflicts_with = "query")]
        text: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Seconds before the query is abandoned (default from config)
        #[arg(long, value_parser = parse_timeout)]
        timeout: Option<f64>,

        /// Debug logging for this query
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show diagnostics and configuration
    Info {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        #[command(subcommand)]
        command: Option<InfoCommands>,
    },
    /// List or describe available tools
    Tools {
        #[command(subcommand)]
        command: ToolsCommands,
    },
    /// Start the HTTP server
    Run {
        /// Bind host (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default from config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Initialize the config file
    Init,
}

#[derive(Subcommand)]
enum InfoCommands {
    /// Check the Ollama service and model availability
    Health,
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List all available tools
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },
    /// Describe a specific tool in detail
    Describe {
        /// Tool name, e.g. "CSV Tool"
        name: String,
    },
}

fn parse_timeout(value: &str) -> Result<f64, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !(secs.is_finite() && secs > 0.0) {
        return Err("timeout must be greater than 0".to_string());
    }
    std::time::Duration::try_from_secs_f64(secs)
        .map_err(|_| "timeout is too large".to_string())?;
    Ok(secs)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.command {
        Commands::Query { verbose: true, .. } => cli.log_level.max(LogLevel::Debug),
        _ => cli.log_level,
    };
    logging::init(level, cli.log_format);

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Query {
            query,
            text,
            format,
            timeout,
            verbose: _,
        } => {
            let args = QueryArgs {
                input: text.or(query),
                format,
                timeout,
            };
            if !query_command(config_path, args).await {
                std::process::exit(1);
            }
        }
        Commands::Info {
            command: Some(InfoCommands::Health),
            ..
        } => {
            if !health_command(config_path).await {
                std::process::exit(1);
            }
        }
        Commands::Info {
            format,
            command: None,
        } => {
            if let Err(e) = info_command(config_path, format).await {
                error!("Info failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Tools { command } => {
            let ok = match command {
                ToolsCommands::List { verbose } => {
                    tools_list_command(verbose);
                    true
                }
                ToolsCommands::Describe { name } => tools_describe_command(&name),
            };
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Run { host, port } => {
            if let Err(e) = run_command(config_path, host, port).await {
                error!("Server failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Init => {
            if let Err(e) = init_command(config_path).await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
