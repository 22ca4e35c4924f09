mod cli;
mod output;

use std::process;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use setgate::{
    BrowserProfile, RequestOptions, RetryPolicy, SessionConfig, SessionError, SessionRegistry,
};

use crate::cli::{Args, Commands, OutputFormat};
use crate::output::OutputManager;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let json_output = output_format(&args.command).is_some_and(|f| f != OutputFormat::Pretty);

    if let Err(e) = run(args).await {
        if json_output {
            let error_json = serde_json::json!({
                "status": "error",
                "message": format!("{e:#}"),
            });
            println!("{error_json}");
        } else {
            eprintln!("{} {e:#}", "Error:".red().bold());
        }
        process::exit(exit_code_for(&e));
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    init_logging(args.verbose, args.quiet);

    let config = build_config(&args)?;
    let registry = SessionRegistry::with_builtin_sites(config)?;
    let manager = OutputManager::new(true);

    match args.command {
        Commands::Fetch {
            site,
            url,
            landing_page,
            headers,
            no_block_retry,
            output,
            output_file,
        } => {
            let mut options = RequestOptions::new().with_headers(parse_headers(&headers)?);
            if let Some(page) = landing_page {
                options = options.with_landing_page(page);
            }
            if no_block_retry {
                options = options.without_block_retry();
            }

            let spinner = spinner_for(output, &format!("Fetching {url} ..."));
            let result = registry.request(&site, &url, &options).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let response = result?;

            if let Some(path) = &output_file {
                std::fs::write(path, &response.body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            println!(
                "{}",
                manager.render_response(&response, output, output_file.as_deref())
            );
        }

        Commands::Warm {
            site,
            force,
            output,
        } => {
            let spinner = spinner_for(output, &format!("Warming session for {site} ..."));
            let result = registry.warm(&site, force).await;
            if let Some(pb) = spinner {
                pb.finish_and_clear();
            }
            let record = result?;
            println!("{}", manager.render_record(&record, output));
        }

        Commands::Sessions { output } => {
            let store = registry.store();
            let records = store.entries().await;
            let stats = store.stats().await;
            println!("{}", manager.render_sessions(&records, &stats, output));
        }

        Commands::Clear { site } => match site {
            Some(site) => {
                if registry.invalidate(&site).await? {
                    println!("{} Cleared session for {site}", "✓".green().bold());
                } else {
                    println!("No cached session for {site}");
                }
            }
            None => {
                let removed = registry.store().clear().await;
                println!(
                    "{} Removed {removed} cached session(s)",
                    "✓".green().bold()
                );
            }
        },
    }

    Ok(())
}

fn output_format(command: &Commands) -> Option<OutputFormat> {
    match command {
        Commands::Fetch { output, .. }
        | Commands::Warm { output, .. }
        | Commands::Sessions { output, .. } => Some(*output),
        Commands::Clear { .. } => None,
    }
}

/// Usage and configuration mistakes exit 2, operational failures exit 1.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    let config_error = e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<SessionError>(),
            Some(SessionError::Configuration { .. } | SessionError::UnknownSite { .. })
        )
    });
    if config_error { 2 } else { 1 }
}

fn build_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let profile = BrowserProfile::from_str(&args.profile)?;
    let mut config = SessionConfig::default()
        .with_profile(profile)
        .with_session_ttl(Duration::from_secs(args.ttl))
        .with_request_timeout(Duration::from_secs(args.timeout))
        .with_retry(RetryPolicy {
            max_retries: args.retries,
            ..RetryPolicy::default()
        })
        .with_decoy_cookies(!args.no_decoys);
    if let Some(dir) = &args.cache_dir {
        config = config.with_store_dir(dir.clone());
    }
    if !args.block_status.is_empty() {
        config = config.with_block_statuses(args.block_status.clone());
    }
    Ok(config)
}

fn parse_headers(raw: &[String]) -> anyhow::Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for entry in raw {
        let (name, value) = entry.split_once(':').ok_or_else(|| {
            SessionError::configuration(format!("invalid header `{entry}` (expected NAME:VALUE)"))
        })?;
        let name = HeaderName::from_str(name.trim()).map_err(|e| {
            SessionError::configuration(format!("invalid header name in `{entry}`: {e}"))
        })?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| {
            SessionError::configuration(format!("invalid header value in `{entry}`: {e}"))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn spinner_for(format: OutputFormat, message: &str) -> Option<ProgressBar> {
    if format != OutputFormat::Pretty {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(ProgressStyle::with_template("{spinner:.blue} {msg}").unwrap());
    pb.set_message(message.to_string());
    Some(pb)
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .init();
}
