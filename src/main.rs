//! stylepad - live stylesheet preview with an async compile-on-edit pipeline.

mod actor;
mod cli;
mod compiler;
mod config;
mod core;
mod logger;
mod session;
mod surface;
mod utils;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{PreviewConfig, init_config};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    init_config(PreviewConfig::load(&cli)?);
    let rt = runtime()?;

    match &cli.command {
        Commands::Watch { file, .. } => rt.block_on(cli::watch::watch_file(file)),
        Commands::Compile { file, output, .. } => {
            rt.block_on(cli::compile::compile_file(file, output.as_deref()))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
