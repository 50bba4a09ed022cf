//! Bannergen - composes fetched images around a rendered text banner.

mod adapters;
mod banner;
mod cassette;
mod cli;
mod compose;
mod config;
mod context;
mod encode;
mod error;
mod fetch;
mod handlers;
mod media;
mod normalize;
mod output;
mod params;
mod pipeline;
mod ports;
mod server;

use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::{RecordingSession, ServiceContext};
use crate::error::BannerError;
use crate::handlers::Function;
use crate::output::{extension_for, resolve_output_path, save_response};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "bannergen=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<i32, BannerError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(BannerError::Config)?;
    tracing::debug!(path = %config_path.display(), "configuration loaded");

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind_address());
            let (ctx, session) = build_context(&config)?;
            server::serve(Arc::new(ctx), &bind).await?;
            finish_recording(session);
            Ok(0)
        }
        Command::Invoke { function, params, event, output, save } => {
            let query = cli::resolve_query(event.as_deref(), &params).map_err(BannerError::Validation)?;
            let (ctx, session) = build_context(&config)?;
            let response = handlers::handle(function, &query, &ctx).await;
            drop(ctx);
            finish_recording(session);

            let failed = response.status_code >= 400;
            if !failed && (output.is_some() || save) {
                let text_key = match function {
                    Function::Generate => "title",
                    Function::Merge => "text",
                };
                let text = query.get(text_key).map_or("", String::as_str);
                let path = resolve_output_path(output.as_deref(), text, extension_for(&response));
                save_response(&response, &path)?;
                eprintln!("Saved: {}", path.display());
            } else {
                let json = serde_json::to_string_pretty(&response)
                    .map_err(|e| BannerError::Internal(format!("failed to serialize response: {e}")))?;
                println!("{json}");
            }
            Ok(i32::from(failed))
        }
    }
}

/// Pick live, recording or replaying mode from the environment.
fn build_context(config: &Config) -> Result<(ServiceContext, Option<RecordingSession>), BannerError> {
    let replay_path = std::env::var("BANNERGEN_REPLAY").ok();
    let is_recording = std::env::var("BANNERGEN_REC").is_ok_and(|v| v == "true" || v == "1");

    if let Some(ref cassette_path) = replay_path {
        tracing::info!(cassette = %cassette_path, "replaying fetches");
        Ok((ServiceContext::replaying(Path::new(cassette_path), config)?, None))
    } else if is_recording {
        tracing::info!("recording fetches");
        let (ctx, session) = ServiceContext::recording(config)?;
        Ok((ctx, Some(session)))
    } else {
        Ok((ServiceContext::live(config)?, None))
    }
}

fn finish_recording(session: Option<RecordingSession>) {
    if let Some(session) = session {
        match session.finish() {
            Ok(path) => eprintln!("Cassette saved: {}", path.display()),
            Err(e) => eprintln!("Warning: failed to save cassette: {e}"),
        }
    }
}
