//! # Cliant
//!
//! A state-of-the-art HTTP client for embarrassingly parallel tasks.
//!
//! This module contains the main entry point for the `cliant` application. It
//! parses command-line arguments, configures the HTTP client, and starts the
//! download process.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cliant::cli::Cli;
use cliant::config::RunConfig;
use cliant::handler::{Handler, build_file_refs};
use cliant::http_client;
use cliant::url_list;

fn setup_tracing(cli: &Cli) {
    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::WARN.into())
        .from_env_lossy();

    if std::env::var("RUST_LOG").is_err() {
        if cli.debug {
            filter = filter.add_directive(Level::DEBUG.into());
        } else if cli.quiet {
            filter = filter.add_directive(Level::ERROR.into());
        } else {
            filter = filter.add_directive(
                match cli.verbose {
                    0 => Level::WARN,
                    1 => Level::INFO,
                    2 => Level::DEBUG,
                    _ => Level::TRACE,
                }
                .into(),
            );
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    human_panic::setup_panic!();
    let cli = Cli::parse();
    setup_tracing(&cli);

    let client = http_client::build(&cli)?;

    let mut urls = cli.urls.clone();
    if let Some(input_file) = &cli.input_file {
        urls.extend(url_list::read_list(input_file, &client)?);
    }

    let files = build_file_refs(&urls, &cli.output_dir, cli.output_document.as_deref())?;

    let config = if cli.is_stream() {
        let sink = cli.output_document.as_deref().filter(|v| *v != "-");
        RunConfig::for_stream(sink.map(std::path::PathBuf::from))
    } else {
        RunConfig::for_files()
    };

    let handler = Handler::new(client, config);
    let result = handler.run(files);

    if result.num_tasks_failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
