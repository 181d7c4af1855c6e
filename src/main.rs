//! CLI entry point for the pixiv downloader.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pixiv_core::{CrawlContext, CrawlOptions, RunConfig, RunController};
use tracing::{debug, error, info};

mod cli;

use cli::{Args, Invocation};

/// Process outcome, mapped onto the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    /// Every page was processed (individual item failures are logged only).
    Success,
    /// Startup failed before any network activity.
    Failure,
    /// The run was aborted by a 403 on an authenticated retry.
    Forbidden,
}

impl From<ProcessExit> for ExitCode {
    fn from(outcome: ProcessExit) -> Self {
        match outcome {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Forbidden => ExitCode::from(3),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let invocation = match Invocation::from_tokens(&args.tokens) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("error: {e}");
            return ProcessExit::Failure.into();
        }
    };

    // Priority: RUST_LOG env var > debug token > default (info)
    let default_level = if invocation.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    match run(&args, &invocation).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            error!("{e:#}");
            ProcessExit::Failure.into()
        }
    }
}

async fn run(args: &Args, invocation: &Invocation) -> Result<ProcessExit> {
    let config = RunConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    let options = CrawlOptions::from_config(&config);
    let ctx = CrawlContext::from_config(&config, &args.output_dir, options)
        .context("failed to set up crawl")?;

    info!(
        keyword = %invocation.keyword,
        pages = invocation.pages,
        output_dir = %args.output_dir.display(),
        "pixiv downloader starting"
    );

    let controller = RunController::new(ctx);
    match controller.run(&invocation.keyword, invocation.pages).await {
        Ok(report) => {
            info!(
                completed = report.items_completed(),
                failed = report.items_failed(),
                failed_pages = report.failed_pages.len(),
                "done"
            );
            Ok(ProcessExit::Success)
        }
        Err(e) if e.is_authorization_failure() => {
            error!(error = %e, "stopped: session refused by the image host");
            Ok(ProcessExit::Forbidden)
        }
        Err(e) => Err(e).context("crawl failed"),
    }
}
