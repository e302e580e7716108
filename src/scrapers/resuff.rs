// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Scrapers for the single-page listings of the RESUFF network.

use super::{
    pagination::{self, PagePlan},
    parse_config, Candidate, CreationError, Error, Factory as IScraperFactory, PageEvent,
    Scraper as IScraper, TypeInfo,
};
use crate::{
    extract::resuff,
    fetch::PageFetcher,
    model::{DetailRecord, EntityKind},
    settings::PartialSettings,
};
use futures::stream::{BoxStream, StreamExt};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use url::Url;

pub const DEFAULT_MEMBERS_URL: &str = "https://www.resuff.org/membres.php";
pub const DEFAULT_DOCUMENTS_URL: &str = "https://www.resuff.org/ressources.php";

pub static MEMBERS_SCRAPER_TYPE: LazyLock<TypeInfo> = LazyLock::new(|| TypeInfo {
    name: "resuff-members",
    description: "Scrapes the members of the RESUFF network,
all listed region by region on a single page.",
    kinds: &[EntityKind::Member],
});

pub static DOCUMENTS_SCRAPER_TYPE: LazyLock<TypeInfo> = LazyLock::new(|| TypeInfo {
    name: "resuff-resources",
    description: "Scrapes the documents published by the RESUFF network,
all listed on a single page.",
    kinds: &[EntityKind::Resource],
});

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub url: Option<Url>,
    /// Relative links are resolved against this;
    /// defaults to the listing URL.
    pub base_url: Option<Url>,
}

/// Which of the RESUFF pages a scraper reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    Members,
    Documents,
}

impl Listing {
    fn info(self) -> &'static TypeInfo {
        match self {
            Self::Members => &MEMBERS_SCRAPER_TYPE,
            Self::Documents => &DOCUMENTS_SCRAPER_TYPE,
        }
    }

    const fn kind(self) -> EntityKind {
        match self {
            Self::Members => EntityKind::Member,
            Self::Documents => EntityKind::Resource,
        }
    }

    const fn default_url(self) -> &'static str {
        match self {
            Self::Members => DEFAULT_MEMBERS_URL,
            Self::Documents => DEFAULT_DOCUMENTS_URL,
        }
    }

    fn extract(self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        match self {
            Self::Members => resuff::extract_members(&document)
                .into_iter()
                .map(|member| Candidate::Complete(DetailRecord::Member(member)))
                .collect(),
            Self::Documents => resuff::extract_documents(&document)
                .into_iter()
                .map(|entry| Candidate::Complete(DetailRecord::Resource(entry)))
                .collect(),
        }
    }
}

pub struct MembersScraperFactory;

pub struct DocumentsScraperFactory;

fn create(
    listing: Listing,
    config_all: &PartialSettings,
    config_scraper: Value,
) -> Result<Box<dyn IScraper>, CreationError> {
    let config: Config = parse_config(listing.info(), config_scraper)?;
    let url = match config.url {
        Some(url) => url,
        None => Url::parse(listing.default_url()).map_err(|err| {
            CreationError::InvalidConfig(listing.info().name, err.to_string())
        })?,
    };
    Ok(Box::new(Scraper {
        fetcher: Arc::clone(&config_all.fetcher),
        listing,
        base_url: config.base_url.unwrap_or_else(|| url.clone()),
        url,
    }))
}

impl IScraperFactory for MembersScraperFactory {
    fn info(&self) -> &'static TypeInfo {
        &MEMBERS_SCRAPER_TYPE
    }

    fn create(
        &self,
        config_all: Arc<PartialSettings>,
        config_scraper: Value,
    ) -> Result<Box<dyn IScraper>, CreationError> {
        create(Listing::Members, &config_all, config_scraper)
    }
}

impl IScraperFactory for DocumentsScraperFactory {
    fn info(&self) -> &'static TypeInfo {
        &DOCUMENTS_SCRAPER_TYPE
    }

    fn create(
        &self,
        config_all: Arc<PartialSettings>,
        config_scraper: Value,
    ) -> Result<Box<dyn IScraper>, CreationError> {
        create(Listing::Documents, &config_all, config_scraper)
    }
}

pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    listing: Listing,
    url: Url,
    base_url: Url,
}

impl IScraper for Scraper {
    fn info(&self) -> &'static TypeInfo {
        self.listing.info()
    }

    fn kind(&self) -> EntityKind {
        self.listing.kind()
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn scrape(&self) -> BoxStream<'static, Result<PageEvent<Candidate>, Error>> {
        let listing = self.listing;
        tracing::info!("Scraping the RESUFF {} at '{}' ...", listing.kind(), self.url);
        pagination::paginate(
            Arc::clone(&self.fetcher),
            PagePlan::single(self.url.clone()),
            move |html| listing.extract(html),
        )
        .map(|event| event.map_err(Error::from))
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::testing::FakeFetcher,
        model::resource::ResourceType,
        scrapers::{pagination::collect_all, testing::partial_settings, PaginationEnd},
    };
    use serde_json::json;

    const DOCUMENTS_PAGE: &str = r#"
<div class="ligneDoc"><div class="txtDoc">
  <span class="violet">Actes du colloque</span> <span class="moyen">Femmes et sciences</span>
  <a href="docs/actes-2023.pdf">Télécharger</a>
</div></div>
<div class="ligneDoc"><div class="txtDoc">
  <span class="violet">Publication</span> <span class="moyen">Rapport annuel</span>
  <a href="docs/rapport.pdf">Télécharger</a>
</div></div>"#;

    #[tokio::test]
    async fn documents_are_complete_records() {
        let fetcher = FakeFetcher::new().with_page(DEFAULT_DOCUMENTS_URL, DOCUMENTS_PAGE);
        let scraper = DocumentsScraperFactory
            .create(partial_settings(Arc::new(fetcher), 10), json!({}))
            .unwrap();
        assert_eq!(scraper.kind(), EntityKind::Resource);
        let (collected, err) = collect_all(scraper.scrape()).await;
        assert!(err.is_none());
        assert_eq!(collected.end, Some(PaginationEnd::SinglePage));
        let types: Vec<ResourceType> = collected
            .items
            .iter()
            .filter_map(|candidate| match candidate {
                Candidate::Complete(DetailRecord::Resource(entry)) => Some(entry.resource_type),
                _ => None,
            })
            .collect();
        assert_eq!(types, vec![ResourceType::Formation, ResourceType::Resources]);
    }

    #[tokio::test]
    async fn members_page_without_blocks_yields_nothing() {
        let url = "https://www.resuff.org/membres.php?lang=fr";
        let fetcher = FakeFetcher::new().with_page(url, "<html><body><p>Maintenance</p></body></html>");
        let scraper = MembersScraperFactory
            .create(partial_settings(Arc::new(fetcher), 10), json!({ "url": url }))
            .unwrap();
        let (collected, err) = collect_all(scraper.scrape()).await;
        assert!(err.is_none());
        assert!(collected.items.is_empty());
        assert_eq!(collected.end, Some(PaginationEnd::Empty { page_number: 1 }));
        assert_eq!(scraper.base_url().as_str(), url);
    }

    #[tokio::test]
    async fn does_not_browse() {
        let scraper = MembersScraperFactory
            .create(partial_settings(Arc::new(FakeFetcher::new()), 10), json!({}))
            .unwrap();
        assert!(matches!(
            scraper.browse(1, &[]).await,
            Err(Error::NotBrowsable("resuff-members"))
        ));
    }
}
