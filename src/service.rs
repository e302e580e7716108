// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! The operations offered to API callers,
//! on top of the store, the scrapers and the page fetcher.
//!
//! Caller supplied input is validated here;
//! bad input fails fast with [`Error::MalformedInput`].

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Display,
    sync::Arc,
};

use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    detail,
    fetch::{self, PageFetcher},
    model::{
        event::split_date_and_type,
        paging::{PageRequest, Paged},
        DetailRecord, EntityKind, NaturalKey, PreviewRecord, Record,
    },
    scrapers::{self, ingest, ScrapeReport, Scraper},
    settings::{ScrapeSettings, Settings},
    store::{self, ListFilter, Store},
};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Scrape(#[from] scrapers::Error),
    #[error(transparent)]
    Store(#[from] store::Error),
}

impl Error {
    /// Whether the caller is to blame,
    /// as opposed to the store or the source sites.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        match self {
            Self::MalformedInput(_) | Self::NotFound(_) => true,
            Self::Scrape(_) | Self::Store(_) => false,
        }
    }
}

impl From<fetch::FetchError> for Error {
    fn from(err: fetch::FetchError) -> Self {
        Self::Scrape(err.into())
    }
}

/// How a caller identifies a stored record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The UUID of the record, in its textual form
    Id(String),
    /// The natural key of the record;
    /// events additionally need their date.
    Key { name: String, date: Option<String> },
}

impl Display for Lookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "ID '{id}'"),
            Self::Key { name, date: None } => write!(f, "key '{name}'"),
            Self::Key {
                name,
                date: Some(date),
            } => write!(f, "key '{name}' on '{date}'"),
        }
    }
}

fn parse_id(id: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(id.trim())
        .map_err(|err| Error::MalformedInput(format!("Not a valid ID: '{id}': {err}")))
}

/// Builds the natural key of a record of the given kind
/// from what a caller supplied.
fn natural_key(kind: EntityKind, raw_name: &str, date: Option<&str>) -> Result<NaturalKey, Error> {
    let name = raw_name.trim();
    if name.is_empty() {
        return Err(Error::MalformedInput(format!(
            "The key of a {kind} must not be empty"
        )));
    }
    Ok(match kind {
        EntityKind::Project | EntityKind::Member | EntityKind::Partner => {
            NaturalKey::Name(name.to_owned())
        }
        EntityKind::Event => NaturalKey::TitleAndDate {
            title: name.to_owned(),
            date: split_date_and_type(date.ok_or_else(|| {
                Error::MalformedInput("Events are identified by title and date".to_owned())
            })?)
            .0,
        },
        EntityKind::Resource => {
            if fetch::parse_url(name).is_ok() {
                NaturalKey::Link(name.to_owned())
            } else {
                NaturalKey::Name(name.to_owned())
            }
        }
    })
}

pub struct Service {
    store: Box<dyn Store>,
    fetcher: Arc<dyn PageFetcher>,
    sources: BTreeMap<String, Box<dyn Scraper>>,
    scrape: ScrapeSettings,
}

impl Service {
    #[must_use]
    pub fn new(settings: Settings, store: Box<dyn Store>) -> Self {
        Self {
            store,
            fetcher: settings.fetcher,
            sources: settings.sources,
            scrape: settings.scrape,
        }
    }

    /// IDs of all the configured sources.
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    fn source(&self, source_id: &str) -> Result<&dyn Scraper, Error> {
        self.sources
            .get(source_id)
            .map(Box::as_ref)
            .ok_or_else(|| Error::MalformedInput(format!("Unknown source: '{source_id}'")))
    }

    /// One page of the stored records of a kind.
    pub async fn list(
        &self,
        kind: EntityKind,
        page: PageRequest,
        filter: &ListFilter,
    ) -> Result<Paged<Record>, Error> {
        Ok(self.store.list(kind, page, filter).await?)
    }

    /// A single stored record, by ID or by natural key.
    pub async fn show(&self, kind: EntityKind, lookup: &Lookup) -> Result<Record, Error> {
        let found = match lookup {
            Lookup::Id(id) => self.store.get(kind, parse_id(id)?).await?,
            Lookup::Key { name, date } => {
                let key = natural_key(kind, name, date.as_deref())?;
                self.store.find(kind, &key).await?
            }
        };
        found.ok_or_else(|| Error::NotFound(format!("No {kind} with {lookup}")))
    }

    /// Fetches and parses the detail page at `url` live,
    /// without storing anything.
    ///
    /// A page that does not match the template of the kind
    /// is reported as not found.
    #[instrument(skip(self))]
    pub async fn fetch_detail(&self, kind: EntityKind, link: &str) -> Result<DetailRecord, Error> {
        if link.trim().is_empty() {
            return Err(Error::MalformedInput(format!("The link of a {kind} is required")));
        }
        if !detail::has_detail_page(kind) {
            return Err(Error::MalformedInput(format!(
                "There are no detail pages for {kind} entries"
            )));
        }
        let url = fetch::parse_url(link.trim())
            .map_err(|err| Error::MalformedInput(err.to_string()))?;
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(err) if err.is_not_found() => {
                return Err(Error::NotFound(format!("No {kind} at '{url}'")));
            }
            Err(err) => return Err(err.into()),
        };
        let mut record = detail::parse_detail_from_html(&html, kind).ok_or_else(|| {
            Error::NotFound(scrapers::Error::TemplateMismatch(url.to_string()).to_string())
        })?;
        record.absolutize_links(&url);
        Ok(record)
    }

    /// Fetches one page of a source's listing live,
    /// narrowed down by the given query filters.
    ///
    /// The total count is only exact if everything fits on the first page;
    /// otherwise it is an estimate, as the sites do not tell.
    #[instrument(skip(self))]
    pub async fn browse(
        &self,
        source_id: &str,
        requested_page: u32,
        filters: &[(String, String)],
    ) -> Result<Paged<PreviewRecord>, Error> {
        let scraper = self.source(source_id)?;
        let page_number = requested_page.max(1);
        let data = scraper.browse(page_number, filters).await?;
        let found = u32::try_from(data.len()).unwrap_or(u32::MAX);
        let page_size = PageRequest::default().page_size;
        let total_count = if page_number == 1 && found < page_size {
            u64::from(found)
        } else {
            u64::from(page_number) * u64::from(page_size)
        };
        Ok(Paged {
            data,
            page_number,
            page_size: found,
            total_count,
        })
    }

    /// Scrapes the given sources (all of them if none are given),
    /// one after the other.
    ///
    /// Unknown source IDs are rejected before anything is scraped.
    pub async fn scrape(&self, source_ids: &[String]) -> Result<Vec<ScrapeReport>, Error> {
        let selected: BTreeSet<&str> = if source_ids.is_empty() {
            self.source_ids().collect()
        } else {
            source_ids.iter().map(String::as_str).collect()
        };
        let mut scrapers = Vec::with_capacity(selected.len());
        for source_id in selected {
            scrapers.push((source_id, self.source(source_id)?));
        }

        let mut reports = Vec::with_capacity(scrapers.len());
        for (source_id, scraper) in scrapers {
            tracing::info!("Scraping source '{source_id}' with the {scraper} ...");
            reports.push(
                ingest::run(
                    source_id,
                    scraper,
                    self.store.as_ref(),
                    Arc::clone(&self.fetcher),
                    self.scrape.detail_concurrency,
                )
                .await,
            );
        }
        Ok(reports)
    }

    /// Number of stored records, per kind.
    pub async fn count(&self, kind: Option<EntityKind>) -> Result<BTreeMap<EntityKind, u64>, Error> {
        let kinds: Vec<EntityKind> = kind.map_or_else(|| EntityKind::iter().collect(), |kind_val| vec![kind_val]);
        let mut counts = BTreeMap::new();
        for kind_val in kinds {
            counts.insert(kind_val, self.store.count_all(kind_val).await?);
        }
        Ok(counts)
    }

    /// Deletes a stored record, including its sections.
    pub async fn delete(&self, kind: EntityKind, raw_id: &str) -> Result<(), Error> {
        let id = parse_id(raw_id)?;
        if self.store.delete(kind, id).await? {
            tracing::info!("Deleted {kind} {id}");
            Ok(())
        } else {
            Err(Error::NotFound(format!("No {kind} with ID {id}")))
        }
    }
}
