// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::{
    fetch::{self, HttpFetcher, PageFetcher},
    scrapers::{self, Scraper},
    tools,
};
use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
    sync::Arc,
};
use thiserror::Error;
use typed_builder::TypedBuilder;

pub const DEFAULT_CONFIG_FILE: &str = "config.yml";
pub const ENV_PREFIX: &str = "AUF_CONNECT";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load the basic/low-level configuration data: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to set up the HTTP client: {0}")]
    Http(#[from] fetch::SetupError),
    #[error("Failed to create a scraper from the basic/low-level configuration data: {0}")]
    ScraperCreation(#[from] scrapers::CreationError),
}

fn default_user_agent() -> String {
    tools::USER_AGENT.to_owned()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Database {
    /// `SQLx` connection URL of the `SQLite` database
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: "sqlite://auf-connect.sqlite?mode=rwc".to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSettings {
    /// Number of retries for a single fetch
    pub retries: u32,
    /// Total timeout per request in milliseconds (ms)
    pub timeout: u64,
    /// Maximum number of requests in flight at any time
    pub max_concurrent_requests: usize,
    /// Maximum number of requests started per second;
    /// 0 means no limit.
    pub requests_per_second: u32,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            retries: 3,
            timeout: 10000,
            max_concurrent_requests: 4,
            requests_per_second: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScrapeSettings {
    /// Pagination stops after this many listing pages,
    /// even if they keep yielding items.
    pub max_pages: u32,
    /// Maximum number of detail pages of one listing page
    /// fetched at the same time
    pub detail_concurrency: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            max_pages: 200,
            detail_concurrency: 4,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IntermediateSettings {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub scrape: ScrapeSettings,
    #[serde(default)]
    pub sources: HashMap<String, HashMap<String, Value>>,
}

/// The part of the settings that is available to the scraper factories.
pub struct PartialSettings {
    pub user_agent: String,
    pub scrape: ScrapeSettings,
    pub fetcher: Arc<dyn PageFetcher>,
}

#[derive(TypedBuilder)]
pub struct Settings {
    pub user_agent: String,
    pub database: Database,
    pub http: HttpSettings,
    pub scrape: ScrapeSettings,
    pub fetcher: Arc<dyn PageFetcher>,
    /// The configured sources, by ID
    #[builder(default)]
    pub sources: BTreeMap<String, Box<dyn Scraper>>,
}

impl IntermediateSettings {
    #[must_use]
    pub fn partial(&self, fetcher: Arc<dyn PageFetcher>) -> PartialSettings {
        PartialSettings {
            user_agent: self.user_agent.clone(),
            scrape: self.scrape,
            fetcher,
        }
    }

    /// Creates the HTTP client and all the configured scrapers.
    pub fn finalize(self) -> Result<Settings, SettingsError> {
        let fetcher = Arc::new(HttpFetcher::new(&self.user_agent, &self.http)?);
        self.finalize_with(fetcher)
    }

    /// Like [`Self::finalize`], but with a given page fetcher.
    pub fn finalize_with(self, fetcher: Arc<dyn PageFetcher>) -> Result<Settings, SettingsError> {
        let scraper_factories = scrapers::assemble_factories();
        let config_partial = Arc::new(self.partial(Arc::clone(&fetcher)));
        let mut sources = BTreeMap::new();
        for (source_id, mut properties) in self.sources {
            let scraper_type = properties
                .get("scraper_type")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    scrapers::CreationError::MissingProperty(source_id.clone(), "scraper_type")
                })?
                .to_owned();
            tracing::debug!("Source '{source_id}' has type: '{scraper_type}' - parsing ...");
            let factory = scraper_factories
                .get(scraper_type.as_str())
                .ok_or_else(|| scrapers::CreationError::UnknownScraperType(scraper_type.clone()))?;
            let config = properties
                .remove("config")
                .ok_or_else(|| scrapers::CreationError::MissingProperty(source_id.clone(), "config"))?;
            let scraper = factory.create(Arc::clone(&config_partial), config)?;
            sources.insert(source_id, scraper);
        }

        Ok(Settings::builder()
            .user_agent(self.user_agent)
            .database(self.database)
            .http(self.http)
            .scrape(self.scrape)
            .fetcher(fetcher)
            .sources(sources)
            .build())
    }
}

fn loader(config_file: Option<&Path>) -> Result<Config, ConfigError> {
    let file_source = match config_file {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    Config::builder()
        .add_source(file_source)
        // Eg. `AUF_CONNECT__HTTP__TIMEOUT=5000 auf-connect scrape`
        // would set the `http.timeout` key
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        )
        .build()
}

/// Loads the intermediate settings,
/// which do not yet contain any network or scraper instances.
///
/// # Errors
///
/// - the config loader fails to build
/// - settings failed to load and deserialize into intermediate settings
pub fn load_intermediate(config_file: Option<&Path>) -> Result<IntermediateSettings, SettingsError> {
    let intermediate_settings = loader(config_file)?.try_deserialize::<IntermediateSettings>()?;
    tracing::debug!(
        "Loaded settings with {} configured sources",
        intermediate_settings.sources.len()
    );
    Ok(intermediate_settings)
}

/// # Errors
///
/// - the config loader fails to build
/// - settings failed to load and deserialize into intermediate settings
/// - the intermediate settings fail to finalize into the final settings
pub fn load(config_file: Option<&Path>) -> Result<Settings, SettingsError> {
    load_intermediate(config_file)?.finalize()
}
