// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use clap::{command, value_parser, Arg, ArgAction, Command, ValueHint};
use const_format::formatcp;

pub const A_L_VERSION: &str = "version";
pub const A_S_VERSION: char = 'V';
pub const A_L_QUIET: &str = "quiet";
pub const A_S_QUIET: char = 'q';
pub const A_L_VERBOSE: &str = "verbose";
pub const A_S_VERBOSE: char = 'v';
pub const A_L_CONFIG: &str = "config";
pub const A_S_CONFIG: char = 'c';

pub const A_L_KIND: &str = "kind";
pub const A_L_SOURCE: &str = "source";
pub const A_L_PAGE_NUMBER: &str = "page-number";
pub const A_S_PAGE_NUMBER: char = 'p';
pub const A_L_PAGE_SIZE: &str = "page-size";
pub const A_S_PAGE_SIZE: char = 's';
pub const A_L_REGION: &str = "region";
pub const A_S_REGION: char = 'r';
pub const A_L_RESOURCE_TYPE: &str = "resource-type";
pub const A_L_EVENT_TYPE: &str = "event-type";
pub const A_L_ID: &str = "id";
pub const A_L_KEY: &str = "key";
pub const A_L_DATE: &str = "date";
pub const A_L_URL: &str = "url";
pub const A_L_FILTER: &str = "filter";
pub const A_S_FILTER: char = 'f';

pub const SC_SCRAPE: &str = "scrape";
pub const SC_LIST: &str = "list";
pub const SC_SHOW: &str = "show";
pub const SC_FETCH_DETAIL: &str = "fetch-detail";
pub const SC_COUNT: &str = "count";
pub const SC_DELETE: &str = "delete";
pub const SC_BROWSE: &str = "browse";

const KINDS: &str = "project, member, partner, event or resource";

fn arg_version() -> Arg {
    Arg::new(A_L_VERSION)
        .help(formatcp!("Print version information and exit. May be combined with -{A_S_QUIET},--{A_L_QUIET}, to really only output the version string."))
        .short(A_S_VERSION)
        .long(A_L_VERSION)
        .action(ArgAction::SetTrue)
}

fn arg_quiet() -> Arg {
    Arg::new(A_L_QUIET)
        .help("Minimize or suppress output to stderr")
        .long_help("Minimize or suppress output to stderr; only warnings and errors are logged.")
        .action(ArgAction::SetTrue)
        .short(A_S_QUIET)
        .long(A_L_QUIET)
        .conflicts_with(A_L_VERBOSE)
}

fn arg_verbose() -> Arg {
    Arg::new(A_L_VERBOSE)
        .help("More verbose log output")
        .long_help("More verbose log output; useful for debugging template mismatches.")
        .action(ArgAction::SetTrue)
        .short(A_S_VERBOSE)
        .long(A_L_VERBOSE)
}

fn arg_config() -> Arg {
    Arg::new(A_L_CONFIG)
        .help("The configuration file to use")
        .long_help(
            "The configuration file to use; \
            defaults to 'config.yml' in the working directory, if it exists.",
        )
        .num_args(1)
        .value_hint(ValueHint::FilePath)
        .value_name("FILE")
        .short(A_S_CONFIG)
        .long(A_L_CONFIG)
        .global(true)
}

fn arg_kind() -> Arg {
    Arg::new(A_L_KIND)
        .help(formatcp!("The kind of entities: {KINDS}"))
        .num_args(1)
        .value_name("KIND")
        .required(true)
}

fn arg_page_number() -> Arg {
    Arg::new(A_L_PAGE_NUMBER)
        .help("The 1-based number of the page to show")
        .num_args(1)
        .value_parser(value_parser!(u32))
        .value_name("NUMBER")
        .default_value("1")
        .short(A_S_PAGE_NUMBER)
        .long(A_L_PAGE_NUMBER)
}

fn subcommand_scrape() -> Command {
    Command::new(SC_SCRAPE)
        .about("Scrapes sources and stores everything new")
        .long_about(
            "Scrapes the given sources (all configured ones if none are given), \
            storing everything not stored yet, \
            and prints a report per source. \
            Exits with an error if any of the sources could not be scraped completely.",
        )
        .arg(
            Arg::new(A_L_SOURCE)
                .help("IDs of the sources to scrape, as configured")
                .num_args(0..)
                .value_name("SOURCE"),
        )
}

fn subcommand_list() -> Command {
    Command::new(SC_LIST)
        .about("Lists one page of the stored entities of a kind")
        .arg(arg_kind())
        .arg(arg_page_number())
        .arg(
            Arg::new(A_L_PAGE_SIZE)
                .help("The number of entities per page (1 to 100)")
                .num_args(1)
                .value_parser(value_parser!(u32))
                .value_name("SIZE")
                .default_value("10")
                .short(A_S_PAGE_SIZE)
                .long(A_L_PAGE_SIZE),
        )
        .arg(
            Arg::new(A_L_REGION)
                .help("Only list projects or members of this region; may be repeated")
                .action(ArgAction::Append)
                .num_args(1)
                .value_name("REGION")
                .short(A_S_REGION)
                .long(A_L_REGION),
        )
        .arg(
            Arg::new(A_L_RESOURCE_TYPE)
                .help("Only list the resources of this type")
                .num_args(1)
                .value_name("TYPE")
                .long(A_L_RESOURCE_TYPE),
        )
        .arg(
            Arg::new(A_L_EVENT_TYPE)
                .help("Only list the events of this type")
                .num_args(1)
                .value_name("TYPE")
                .long(A_L_EVENT_TYPE),
        )
}

fn subcommand_show() -> Command {
    Command::new(SC_SHOW)
        .about("Shows a single stored entity")
        .arg(arg_kind())
        .arg(
            Arg::new(A_L_ID)
                .help("The ID of the entity")
                .num_args(1)
                .value_name("UUID")
                .long(A_L_ID)
                .required_unless_present(A_L_KEY)
                .conflicts_with(A_L_KEY),
        )
        .arg(
            Arg::new(A_L_KEY)
                .help("The name or title of the entity; the link for resources")
                .num_args(1)
                .value_name("NAME")
                .long(A_L_KEY),
        )
        .arg(
            Arg::new(A_L_DATE)
                .help("The date of the event, as shown on the site")
                .num_args(1)
                .value_name("DATE")
                .long(A_L_DATE)
                .requires(A_L_KEY),
        )
}

fn subcommand_fetch_detail() -> Command {
    Command::new(SC_FETCH_DETAIL)
        .about("Fetches and parses a single detail page, without storing it")
        .arg(arg_kind())
        .arg(
            Arg::new(A_L_URL)
                .help("The URL of the detail page")
                .num_args(1)
                .value_hint(ValueHint::Url)
                .value_name("URL")
                .required(true),
        )
}

fn subcommand_count() -> Command {
    Command::new(SC_COUNT)
        .about("Counts the stored entities, per kind")
        .arg(
            Arg::new(A_L_KIND)
                .help(formatcp!("Only count entities of this kind: {KINDS}"))
                .num_args(1)
                .value_name("KIND"),
        )
}

fn subcommand_delete() -> Command {
    Command::new(SC_DELETE)
        .about("Deletes a stored entity, together with its sections")
        .arg(arg_kind())
        .arg(
            Arg::new(A_L_ID)
                .help("The ID of the entity")
                .num_args(1)
                .value_name("UUID")
                .required(true),
        )
}

fn subcommand_browse() -> Command {
    Command::new(SC_BROWSE)
        .about("Fetches one page of a source's listing live, without storing it")
        .arg(
            Arg::new(A_L_SOURCE)
                .help("The ID of the source, as configured")
                .num_args(1)
                .value_name("SOURCE")
                .required(true),
        )
        .arg(arg_page_number())
        .arg(
            Arg::new(A_L_FILTER)
                .help("A query filter to add to the listing URL, e.g. 'region[0]=Caraïbe'; may be repeated")
                .action(ArgAction::Append)
                .num_args(1)
                .value_name("KEY=VALUE")
                .short(A_S_FILTER)
                .long(A_L_FILTER),
        )
}

fn args_global() -> [Arg; 4] {
    [arg_version(), arg_quiet(), arg_verbose(), arg_config()]
}

pub fn args_matcher() -> Command {
    command!()
        .about("Scrapes the web-sites of the AUF, the OIF and RESUFF into a local store, and serves what it stored")
        .disable_version_flag(true)
        .args(args_global())
        .subcommands([
            subcommand_scrape(),
            subcommand_list(),
            subcommand_show(),
            subcommand_fetch_detail(),
            subcommand_count(),
            subcommand_delete(),
            subcommand_browse(),
        ])
}
