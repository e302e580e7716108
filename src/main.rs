// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

mod cli;

use std::{path::PathBuf, str::FromStr};

use async_std::{fs, path};
use auf_connect::{
    model::{paging::PageRequest, resource::ResourceType, EntityKind},
    service::{Lookup, Service},
    settings,
    store::{ListFilter, SqliteStore},
};
use clap::{crate_name, ArgMatches};
use cli_utils::{BoxError, BoxResult};
use fs4::async_std::AsyncFileExt;
use serde::Serialize;

use cli_utils::logging;
use tracing::instrument;
use tracing_subscriber::filter::LevelFilter;

const LOCK_FILE_NAME: &str = "auf-connect.lock";

#[allow(clippy::print_stdout)]
fn print_version_and_exit(quiet: bool) {
    if !quiet {
        print!("{} ", clap::crate_name!());
    }
    println!("{}", auf_connect::VERSION);
    std::process::exit(0);
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> BoxResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_kind(args: &ArgMatches) -> BoxResult<EntityKind> {
    let raw = args
        .get_one::<String>(cli::A_L_KIND)
        .ok_or("No kind of entities given")?;
    EntityKind::from_str(raw)
        .map_err(|err| BoxError::from(format!("Unknown kind of entities '{raw}': {err}")))
}

fn parse_filter(filter: &str) -> BoxResult<(String, String)> {
    filter
        .split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .ok_or_else(|| BoxError::from(format!("Not a KEY=VALUE filter: '{filter}'")))
}

fn parse_filters(args: &ArgMatches) -> BoxResult<Vec<(String, String)>> {
    args.get_many::<String>(cli::A_L_FILTER)
        .into_iter()
        .flatten()
        .map(|filter| parse_filter(filter.as_str()))
        .collect()
}

fn list_filter(args: &ArgMatches) -> BoxResult<ListFilter> {
    let regions = args
        .get_many::<String>(cli::A_L_REGION)
        .into_iter()
        .flatten()
        .cloned()
        .collect();
    let resource_type = args
        .get_one::<String>(cli::A_L_RESOURCE_TYPE)
        .map(|raw| {
            ResourceType::from_str(raw)
                .map_err(|err| format!("Unknown resource type '{raw}': {err}"))
        })
        .transpose()?;
    Ok(ListFilter {
        regions,
        resource_type,
        event_type: args.get_one::<String>(cli::A_L_EVENT_TYPE).cloned(),
    })
}

/// Scrapes while holding an exclusive lock,
/// so two scrapes never write into the same store at once.
async fn scrape(service: &Service, args: &ArgMatches) -> BoxResult<()> {
    let source_ids: Vec<String> = args
        .get_many::<String>(cli::A_L_SOURCE)
        .into_iter()
        .flatten()
        .cloned()
        .collect();

    let lock_file_path = path::PathBuf::from(std::env::temp_dir().join(LOCK_FILE_NAME));
    tracing::debug!("Preparing to lock file '{}' ...", lock_file_path.display());
    let lock_file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_file_path)
        .await?;
    if !lock_file.try_lock_exclusive()? {
        return Err(format!(
            "Failed to lock file '{}'; is another scrape running?",
            lock_file_path.display()
        )
        .into());
    }
    tracing::debug!("Obtained lock on file '{}'.", lock_file_path.display());

    let scraped = service.scrape(&source_ids).await;

    tracing::trace!("Releasing lock on file '{}' ...", lock_file_path.display());
    lock_file.unlock()?;
    tracing::debug!("Released lock on file '{}'.", lock_file_path.display());

    let reports = scraped?;
    print_json(&reports)?;
    let incomplete: Vec<&str> = reports
        .iter()
        .filter(|report| !report.is_complete())
        .map(|report| report.source.as_str())
        .collect();
    if incomplete.is_empty() {
        Ok(())
    } else {
        Err(format!("Sources not scraped completely: {}", incomplete.join(", ")).into())
    }
}

async fn run_command(service: &Service, command: &str, args: &ArgMatches) -> BoxResult<()> {
    match command {
        cli::SC_SCRAPE => scrape(service, args).await?,
        cli::SC_LIST => {
            let page = PageRequest {
                page_number: args.get_one::<u32>(cli::A_L_PAGE_NUMBER).copied().unwrap_or(1),
                page_size: args
                    .get_one::<u32>(cli::A_L_PAGE_SIZE)
                    .copied()
                    .unwrap_or_default(),
            };
            let listed = service
                .list(parse_kind(args)?, page, &list_filter(args)?)
                .await?;
            print_json(&listed)?;
        }
        cli::SC_SHOW => {
            let lookup = match args.get_one::<String>(cli::A_L_ID) {
                Some(id) => Lookup::Id(id.clone()),
                None => Lookup::Key {
                    name: args.get_one::<String>(cli::A_L_KEY).cloned().unwrap_or_default(),
                    date: args.get_one::<String>(cli::A_L_DATE).cloned(),
                },
            };
            print_json(&service.show(parse_kind(args)?, &lookup).await?)?;
        }
        cli::SC_FETCH_DETAIL => {
            let link = args.get_one::<String>(cli::A_L_URL).map_or("", String::as_str);
            print_json(&service.fetch_detail(parse_kind(args)?, link).await?)?;
        }
        cli::SC_COUNT => {
            let kind = if args.contains_id(cli::A_L_KIND) {
                Some(parse_kind(args)?)
            } else {
                None
            };
            print_json(&service.count(kind).await?)?;
        }
        cli::SC_DELETE => {
            let id = args.get_one::<String>(cli::A_L_ID).map_or("", String::as_str);
            service.delete(parse_kind(args)?, id).await?;
        }
        cli::SC_BROWSE => {
            let source_id = args.get_one::<String>(cli::A_L_SOURCE).map_or("", String::as_str);
            let page_number = args.get_one::<u32>(cli::A_L_PAGE_NUMBER).copied().unwrap_or(1);
            let browsed = service
                .browse(source_id, page_number, &parse_filters(args)?)
                .await?;
            print_json(&browsed)?;
        }
        other => return Err(format!("Unknown command '{other}'").into()),
    }
    Ok(())
}

#[tokio::main]
#[instrument]
async fn main() -> BoxResult<()> {
    let log_reload_handle = logging::setup(crate_name!())?;
    let args = cli::args_matcher().get_matches();

    let quiet = args.get_flag(cli::A_L_QUIET);
    let version = args.get_flag(cli::A_L_VERSION);
    if version {
        print_version_and_exit(quiet);
    }

    let verbose = args.get_flag(cli::A_L_VERBOSE);

    let log_level = if verbose {
        LevelFilter::TRACE
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    };
    logging::set_log_level_tracing(&log_reload_handle, log_level)?;

    let Some((command, sub_args)) = args.subcommand() else {
        return Err("No command given; see --help".into());
    };

    let config_file = args.get_one::<String>(cli::A_L_CONFIG).map(PathBuf::from);
    let run_settings = settings::load(config_file.as_deref())?;
    tracing::debug!("Opening the store at '{}' ...", run_settings.database.url);
    let store = SqliteStore::connect(&run_settings.database.url).await?;
    let service = Service::new(run_settings, Box::new(store));

    run_command(&service, command, sub_args).await
}
