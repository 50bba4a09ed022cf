//! CLI argument parsing with clap.

use std::collections::HashMap;

use clap::{Parser, Subcommand};

use crate::handlers::{Function, FunctionEvent};

/// Image banner compositor - stacks fetched images around a text banner.
#[derive(Parser, Debug)]
#[command(name = "bannergen", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the functions over HTTP.
    Serve {
        /// Listen address (overrides config and environment).
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Run a single function invocation and print its response.
    Invoke {
        /// Function to run.
        #[arg(value_enum)]
        function: Function,

        /// Query parameter as `key=value`. Repeatable; wins over the event file.
        #[arg(short, long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// JSON event file with `queryStringParameters`.
        #[arg(short, long)]
        event: Option<String>,

        /// Write the decoded image here instead of printing the response.
        #[arg(short, long, conflicts_with = "save")]
        output: Option<String>,

        /// Write the decoded image to an auto-generated file name.
        #[arg(short, long)]
        save: bool,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("Expected key=value, got '{raw}'"))
}

/// Merge the event file's query parameters with `--param` pairs.
///
/// # Errors
///
/// Returns an error if the event file cannot be read or parsed.
pub fn resolve_query(
    event: Option<&str>,
    params: &[(String, String)],
) -> Result<HashMap<String, String>, String> {
    let mut query = match event {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read event {path}: {e}"))?;
            let event: FunctionEvent = serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse event {path}: {e}"))?;
            event.query_string_parameters.unwrap_or_default()
        }
        None => HashMap::new(),
    };
    query.extend(params.iter().cloned());
    Ok(query)
}
