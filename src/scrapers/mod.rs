// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    fetch::FetchError,
    model::{DetailRecord, EntityKind, NaturalKey, PreviewRecord},
    settings::PartialSettings,
    store,
};

pub mod ingest;
pub mod listing;
pub mod pagination;
pub mod resuff;

pub use ingest::{IngestReport, ScrapeReport};
pub use pagination::{PageEvent, PaginationEnd};

/// Thrown when creating a new [`Scraper`] failed.
#[derive(Error, Debug)]
pub enum CreationError {
    #[error("Unknown scraper type: '{0}'")]
    UnknownScraperType(String),
    #[error("Source '{0}' requires property '{1}'")]
    MissingProperty(String, &'static str),
    #[error("Invalid config for scraper type '{0}': {1}")]
    InvalidConfig(&'static str, String),
    #[error("Invalid config for scraper type '{0}': {1}")]
    UnparsableConfig(&'static str, #[source] serde_json::Error),
}

/// Thrown when a [`Scraper`] failed to scrape a listing page,
/// or a single detail page.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fetching failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Storage failed: {0}")]
    Store(#[from] store::Error),
    #[error("Page '{0}' does not match the expected template")]
    TemplateMismatch(String),
    #[error("Scraper type '{0}' does not support live browsing")]
    NotBrowsable(&'static str),
}

impl Error {
    /// Whether running the same operation again later might succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch(err) => err.is_transient(),
            Self::Store(_) => true,
            Self::TemplateMismatch(_) | Self::NotBrowsable(_) => false,
        }
    }
}

/// Contains descriptive data about the type of a scraper.
pub struct TypeInfo {
    /// Machine-readable name/id of this type of scraper.
    /// It should be in "kebab-case".
    pub name: &'static str,

    /// Human-readable description of this type of scraper.
    pub description: &'static str,

    /// The kinds of entities this type of scraper can produce.
    pub kinds: &'static [EntityKind],
}

/// An entry found on a listing page,
/// on its way to become a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// Needs its detail page fetched and parsed.
    Preview(PreviewRecord),
    /// Complete as found on the listing.
    Complete(DetailRecord),
}

impl Candidate {
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        match self {
            Self::Preview(preview) => preview.natural_key(),
            Self::Complete(record) => record.natural_key(),
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Preview(preview) => &preview.title,
            Self::Complete(record) => record.title(),
        }
    }
}

/// Creates instances of scrapers of a specific type.
pub trait Factory {
    /// Info about the type of scrapers produced by this factory.
    fn info(&self) -> &'static TypeInfo;

    /// Creates a new instance of this type of scraper,
    /// following the supplied configuration.
    ///
    /// # Errors
    ///
    /// - Invalid config for scraper type
    fn create(
        &self,
        config_all: Arc<PartialSettings>,
        config_scraper: Value,
    ) -> Result<Box<dyn Scraper>, CreationError>;
}

/// A scraper of a specific source,
/// turning its listing pages into candidates for ingestion.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Info about this type of scraper.
    fn info(&self) -> &'static TypeInfo;

    /// The kind of entities found at this source.
    fn kind(&self) -> EntityKind;

    /// Relative links found at this source are resolved against this.
    fn base_url(&self) -> &Url;

    /// Scrapes the listing page by page.
    ///
    /// The stream ends after a [`PageEvent::End`],
    /// or after the first error,
    /// which is always a page-level fetch failure.
    fn scrape(&self) -> BoxStream<'static, Result<PageEvent<Candidate>, Error>>;

    /// Fetches and extracts a single listing page live,
    /// narrowed down by the given query filters.
    async fn browse(
        &self,
        _page_number: u32,
        _filters: &[(String, String)],
    ) -> Result<Vec<PreviewRecord>, Error> {
        Err(Error::NotBrowsable(self.info().name))
    }
}

impl std::fmt::Display for dyn Scraper + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-scraper ({})", self.info().name, self.kind())
    }
}

/// Deserializes the config of a scraper of the given type.
fn parse_config<T: serde::de::DeserializeOwned>(
    info: &'static TypeInfo,
    config_scraper: Value,
) -> Result<T, CreationError> {
    serde_json::from_value(config_scraper)
        .map_err(|err| CreationError::UnparsableConfig(info.name, err))
}

#[must_use]
pub fn assemble_factories() -> HashMap<String, Box<dyn Factory>> {
    let scrapers: Vec<Box<dyn Factory>> = vec![
        Box::new(listing::ScraperFactory),
        Box::new(resuff::MembersScraperFactory),
        Box::new(resuff::DocumentsScraperFactory),
    ];
    scrapers
        .into_iter()
        .map(|f| (f.info().name.to_string(), f))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::PartialSettings;
    use crate::{fetch::PageFetcher, settings::ScrapeSettings};
    use std::sync::Arc;

    pub fn partial_settings(fetcher: Arc<dyn PageFetcher>, max_pages: u32) -> Arc<PartialSettings> {
        Arc::new(PartialSettings {
            user_agent: "test".to_owned(),
            scrape: ScrapeSettings {
                max_pages,
                detail_concurrency: 2,
            },
            fetcher,
        })
    }
}
