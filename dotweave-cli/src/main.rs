mod app;

use std::{process::ExitCode, time::Instant};

use anyhow::Context;
use clap::Parser;
use dotweave::prelude::*;

use crate::app::{Cli, DEFAULT_IMMUTABLE_TYPES};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // dotweave info+ on stderr; --verbose enables debug; RUST_LOG overrides
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("dotweave", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false)
        .init();

    let started = Instant::now();
    match run(&cli) {
        Ok(report) => {
            log::info!("{report}");
            println!("done, {} millis", started.elapsed().as_millis());
            ExitCode::SUCCESS
        }
        Err(error) => {
            println!("{error:?}");
            ExitCode::FAILURE
        }
    }
}

fn config(cli: &Cli) -> RewriteConfig {
    let mut config = RewriteConfig::default().with_nested_types(cli.nested);
    for name in DEFAULT_IMMUTABLE_TYPES
        .iter()
        .copied()
        .chain(cli.immutable.iter().map(String::as_str))
    {
        config = config.with_immutable_type(name);
    }
    match cli.foreign_prefix() {
        Some(prefix) => config.with_foreign_prefix(prefix),
        None => config,
    }
}

fn run(cli: &Cli) -> anyhow::Result<RewriteReport> {
    let path = cli.module_path();

    let mut resolver = ModuleResolver::new()?;
    if let Some(dir) = path.parent() {
        resolver.add_search_dir(dir);
    }
    for dir in &cli.search_dir {
        resolver.add_search_dir(dir);
    }

    ChangeTrackingRewriter::with_resolver(config(cli), resolver)
        .weave_file(&path)
        .with_context(|| format!("failed to weave {}", path.display()))
}
