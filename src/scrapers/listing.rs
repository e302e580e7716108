// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{
    pagination::{self, PagePlan},
    parse_config, Candidate, CreationError, Error, Factory as IScraperFactory, PageEvent,
    Scraper as IScraper, TypeInfo,
};
use crate::{
    detail,
    extract::extract_previews_from_html,
    fetch::PageFetcher,
    model::{resource::ResourceType, EntityKind, PreviewRecord},
    settings::PartialSettings,
    tools,
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use tracing::instrument;
use url::Url;

pub static SCRAPER_TYPE: LazyLock<TypeInfo> = LazyLock::new(|| TypeInfo {
    name: "listing",
    description: "Scrapes the card listings of the AUF and OIF web-sites,
page by page, following each card to its detail page where there is one.",
    kinds: &[
        EntityKind::Project,
        EntityKind::Member,
        EntityKind::Partner,
        EntityKind::Event,
        EntityKind::Resource,
    ],
});

/// Where the full record of a listing entry comes from.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DetailSource {
    /// The dedicated page the entry links to
    Page,
    /// The listing entry itself
    Preview,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub kind: EntityKind,
    /// URL of the first page of the listing
    pub first_page: Url,
    /// URL of all the following pages of the listing,
    /// see [`PagePlan::page_template`]
    pub page_template: Option<String>,
    /// Relative links are resolved against this;
    /// defaults to the first page.
    pub base_url: Option<Url>,
    #[serde(default)]
    pub not_found_ends_listing: bool,
    /// The type of all the entries of a resources listing
    pub resource_type: Option<ResourceType>,
    /// Defaults to [`DetailSource::Page`] for kinds that have detail pages.
    pub detail: Option<DetailSource>,
}

pub struct ScraperFactory;

impl IScraperFactory for ScraperFactory {
    fn info(&self) -> &'static TypeInfo {
        &SCRAPER_TYPE
    }

    fn create(
        &self,
        config_all: Arc<PartialSettings>,
        config_scraper: Value,
    ) -> Result<Box<dyn IScraper>, CreationError> {
        let config: Config = parse_config(&SCRAPER_TYPE, config_scraper)?;
        Ok(Box::new(Scraper::new(&config_all, config)?))
    }
}

pub struct Scraper {
    fetcher: Arc<dyn PageFetcher>,
    kind: EntityKind,
    base_url: Url,
    plan: PagePlan,
    resource_type: Option<ResourceType>,
    detail_source: DetailSource,
}

impl Scraper {
    /// # Errors
    ///
    /// If the config asks for detail pages of a kind that has none.
    pub fn new(config_all: &PartialSettings, config: Config) -> Result<Self, CreationError> {
        let detail_source = match config.detail {
            Some(DetailSource::Page) if !detail::has_detail_page(config.kind) => {
                return Err(CreationError::InvalidConfig(
                    SCRAPER_TYPE.name,
                    format!("{} entries have no detail pages", config.kind),
                ));
            }
            Some(detail_source) => detail_source,
            None if detail::has_detail_page(config.kind) => DetailSource::Page,
            None => DetailSource::Preview,
        };
        if config.resource_type.is_some() && config.kind != EntityKind::Resource {
            tracing::warn!(
                "Ignoring the resource type configured for a {} listing",
                config.kind
            );
        }
        Ok(Self {
            fetcher: Arc::clone(&config_all.fetcher),
            kind: config.kind,
            base_url: config.base_url.unwrap_or_else(|| config.first_page.clone()),
            plan: PagePlan {
                first_page: config.first_page,
                page_template: config.page_template,
                max_pages: config_all.scrape.max_pages,
                not_found_ends_listing: config.not_found_ends_listing,
            },
            resource_type: config.resource_type,
            detail_source,
        })
    }

    /// The URL of a listing page, with the given filters added to its query.
    fn filtered_page_url(
        &self,
        page_number: u32,
        filters: &[(String, String)],
    ) -> Result<Option<Url>, Error> {
        let Some(mut url) = self.plan.page_url(page_number)? else {
            return Ok(None);
        };
        if !filters.is_empty() {
            let mut query = url.query().unwrap_or_default().to_owned();
            for (key, value) in filters {
                if !query.is_empty() {
                    query.push('&');
                }
                query.push_str(&tools::url_encode(key));
                query.push('=');
                query.push_str(&tools::url_encode(value));
            }
            url.set_query(Some(&query));
        }
        Ok(Some(url))
    }
}

#[async_trait]
impl IScraper for Scraper {
    fn info(&self) -> &'static TypeInfo {
        &SCRAPER_TYPE
    }

    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn scrape(&self) -> BoxStream<'static, Result<PageEvent<Candidate>, Error>> {
        let kind = self.kind;
        let resource_type = self.resource_type;
        let detail_source = self.detail_source;
        tracing::info!("Scraping the {kind} listing at '{}' ...", self.plan.first_page);
        pagination::paginate(
            Arc::clone(&self.fetcher),
            self.plan.clone(),
            move |html| extract_previews_from_html(html, kind),
        )
        .map(move |event| {
            event
                .map(|page| {
                    page.filter_map_items(|preview| match detail_source {
                        DetailSource::Page => Some(Candidate::Preview(preview)),
                        DetailSource::Preview => {
                            detail::from_preview(&preview, resource_type).map(Candidate::Complete)
                        }
                    })
                })
                .map_err(Error::from)
        })
        .boxed()
    }

    #[instrument(skip(self), fields(kind = %self.kind))]
    async fn browse(
        &self,
        page_number: u32,
        filters: &[(String, String)],
    ) -> Result<Vec<PreviewRecord>, Error> {
        let Some(url) = self.filtered_page_url(page_number, filters)? else {
            return Ok(Vec::new());
        };
        let html = self.fetcher.fetch(&url).await?;
        Ok(extract_previews_from_html(&html, self.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::testing::FakeFetcher,
        model::DetailRecord,
        scrapers::{pagination::collect_all, testing::partial_settings},
    };
    use serde_json::json;

    const PARTNERS_PAGE: &str = r#"
<div class="entry-content clearfix">
  <div class="wp-caption"><a href="/partenaires/unesco/"><img src="/logos/unesco.png" alt="UNESCO"></a><p class="wp-caption-text">UNESCO</p></div>
  <div class="wp-caption"><a href="https://www.oif.org"><img src="/logos/oif.png"></a><p class="wp-caption-text">OIF</p></div>
</div>"#;

    fn create(fetcher: FakeFetcher, config: Value) -> Result<Box<dyn IScraper>, CreationError> {
        ScraperFactory.create(partial_settings(Arc::new(fetcher), 10), config)
    }

    #[tokio::test]
    async fn partners_are_complete_from_their_listing() {
        let fetcher = FakeFetcher::new()
            .with_page("https://www.auf.org/partenaires/nos-partenaires/", PARTNERS_PAGE);
        let scraper = create(
            fetcher,
            json!({
                "kind": "partner",
                "first_page": "https://www.auf.org/partenaires/nos-partenaires/",
            }),
        )
        .unwrap();
        let (collected, err) = collect_all(scraper.scrape()).await;
        assert!(err.is_none());
        assert_eq!(collected.items.len(), 2);
        assert!(collected
            .items
            .iter()
            .all(|candidate| matches!(candidate, Candidate::Complete(DetailRecord::Partner(_)))));
        assert_eq!(scraper.base_url().as_str(), "https://www.auf.org/partenaires/nos-partenaires/");
    }

    #[tokio::test]
    async fn projects_need_their_detail_page() {
        let fetcher = FakeFetcher::new().with_page(
            "https://www.auf.org/nos-actions/",
            r#"<section class="section"><div class="teaser main-teaser has-thumb"><h3 class="title">P</h3></div></section>"#,
        );
        let scraper = create(
            fetcher,
            json!({ "kind": "project", "first_page": "https://www.auf.org/nos-actions/" }),
        )
        .unwrap();
        let (collected, _) = collect_all(scraper.scrape()).await;
        assert!(matches!(collected.items[0], Candidate::Preview(_)));
    }

    #[test]
    fn detail_pages_of_partners_can_not_be_requested() {
        let result = create(
            FakeFetcher::new(),
            json!({
                "kind": "partner",
                "first_page": "https://www.auf.org/partenaires/nos-partenaires/",
                "detail": "page",
            }),
        );
        assert!(matches!(result, Err(CreationError::InvalidConfig(..))));
    }

    #[test]
    fn invalid_config_is_reported() {
        let result = create(FakeFetcher::new(), json!({ "kind": "project" }));
        assert!(matches!(result, Err(CreationError::UnparsableConfig(..))));
    }

    #[tokio::test]
    async fn browses_a_filtered_page_live() {
        let filtered = "https://www.auf.org/nos-actions/page/2/?region%5B0%5D=Afrique%20centrale&statut%5B0%5D=en-cours";
        let fetcher = Arc::new(FakeFetcher::new().with_page(
            filtered,
            r#"<section class="section"><div class="teaser main-teaser has-thumb"><h3 class="title">P</h3></div></section>"#,
        ));
        let scraper = ScraperFactory
            .create(
                partial_settings(Arc::clone(&fetcher) as Arc<dyn PageFetcher>, 10),
                json!({
                    "kind": "project",
                    "first_page": "https://www.auf.org/nos-actions/",
                    "page_template": "https://www.auf.org/nos-actions/page/{page}/",
                }),
            )
            .unwrap();
        let filters = vec![
            ("region[0]".to_string(), "Afrique centrale".to_string()),
            ("statut[0]".to_string(), "en-cours".to_string()),
        ];
        let previews = scraper.browse(2, &filters).await.unwrap();
        assert_eq!(previews.len(), 1);
        assert_eq!(fetcher.requested(), vec![filtered.to_string()]);
    }
}
