// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, bail};
use config::Config;
use gridcal_app::{AppCommand, AppState, CalendarSelection};
use gridcal_gcal::Client;
use gridcal_store::{EventCache, SelectionFile};
use runtime::GcalRuntime;
use std::env;
use std::path::PathBuf;
use time::UtcOffset;

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `gridcal --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let data_dir = config.data_dir()?;
    if options.print_data_dir {
        println!("{}", data_dir.display());
        return Ok(());
    }

    // Read before any thread exists; later lookups may fail on some platforms.
    let offset = gridcal_tui::local_offset();

    if let Err(error) = gridcal_store::ensure_data_dir(&data_dir) {
        eprintln!("warning: {error:#}; cache and calendar selection will not persist");
    }
    let log_file = config.log_file()?;
    if let Err(error) = logging::init(config.log_level(), &log_file) {
        eprintln!("warning: logging disabled: {error:#}");
    }
    tracing::info!(
        config = %options.config_path.display(),
        data_dir = %data_dir.display(),
        "starting gridcal"
    );

    let cache = EventCache::in_dir(&data_dir, config.cache_ttl());
    let selection_file = SelectionFile::in_dir(&data_dir);

    let (client, credential_error) = match connect(&config, offset) {
        Ok(client) => (Some(client), None),
        Err(error) => {
            let message = format!("{error:#}");
            tracing::warn!(%message, "google calendar unavailable");
            (None, Some(message))
        }
    };

    if options.check_only {
        return check(&cache, &selection_file, credential_error);
    }

    let mut state = AppState::new(gridcal_tui::today_in(offset), selection_file.load());
    if let Some(message) = credential_error {
        state.dispatch(AppCommand::SetCredentialError(message));
    }

    let mut runtime = GcalRuntime::new(cache, selection_file, client);
    gridcal_tui::run_app(&mut state, &mut runtime, offset)
}

fn connect(config: &Config, offset: UtcOffset) -> Result<Client> {
    let token = gridcal_gcal::load_access_token(&config.token_path()?)?;
    let client = Client::new(config.google_base_url(), &token, config.google_timeout()?)
        .context("build google calendar client")?;
    Ok(client
        .with_max_results(config.max_results())
        .with_offset(offset))
}

fn check(
    cache: &EventCache,
    selection_file: &SelectionFile,
    credential_error: Option<String>,
) -> Result<()> {
    let selection = selection_file
        .try_load()
        .with_context(|| format!("read calendar selection {}", selection_file.path().display()))?
        .unwrap_or_default();
    println!("calendars: {}", describe_selection(&selection));

    match cache
        .read_record()
        .with_context(|| format!("read event cache {}", cache.path().display()))?
    {
        Some(record) => println!(
            "cache: {} events for {} (saved {})",
            record.events.len(),
            record.year,
            record.saved_at
        ),
        None => println!("cache: empty"),
    }

    if let Some(message) = credential_error {
        bail!("{message}");
    }
    println!("credentials: ok");
    Ok(())
}

fn describe_selection(selection: &CalendarSelection) -> String {
    selection
        .ids()
        .iter()
        .map(|id| id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_data_dir: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_data_dir: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_data_dir = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("gridcal: a year-at-a-glance Google Calendar viewer");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved data directory");
    println!("  --print-example-config   Print a config template");
    println!("  --check                  Validate config, cache, selection, and credentials");
    println!("  --help                   Show this help");
}
