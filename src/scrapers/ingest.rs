// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Turns the candidates found on listing pages into stored records.
//!
//! Candidates are checked against the store and against everything seen
//! earlier in the same run, strictly one after the other,
//! before any detail page is fetched.
//! Candidates complete as found are stored right away;
//! detail pages of one listing page are then fetched concurrently,
//! and what they yield is stored in a second batch.
//! Each batch is its own transaction,
//! so a scrape cancelled in the middle of a page keeps what was stored before.

use std::{collections::HashSet, sync::Arc};

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::instrument;
use url::Url;

use super::{Candidate, Error, PageEvent, PaginationEnd, Scraper};
use crate::{
    detail,
    fetch::{self, FetchError, PageFetcher},
    model::{DetailRecord, EntityKind, NaturalKey, PreviewRecord},
    store::Store,
    tools,
};

/// The outcome of ingesting the candidates of one listing page.
#[derive(Serialize, Debug, Default)]
pub struct IngestReport {
    pub inserted: Vec<DetailRecord>,
    /// Candidates left out because they are stored already,
    /// were seen before in this run,
    /// or their detail page does not match the expected template
    pub skipped: usize,
    /// Candidates that could not be ingested:
    /// no identity, no link or a detail page that does not exist
    pub failures: usize,
    /// Candidates whose detail page could not be fetched for now,
    /// for example because of a timeout or a server error
    pub transient_failures: usize,
}

/// The outcome of scraping a whole source.
#[derive(Serialize, Debug, Clone)]
pub struct ScrapeReport {
    pub source: String,
    pub kind: EntityKind,
    /// Number of listing pages that yielded items
    pub pages: u32,
    /// How the listing ended; `None` if the scrape was aborted
    pub end: Option<PaginationEnd>,
    pub inserted_count: usize,
    pub skipped: usize,
    pub failures: usize,
    /// Detail pages that could not be fetched for now;
    /// the scrape is not complete while there are any.
    pub transient_failures: usize,
    pub inserted: Vec<DetailRecord>,
    /// Why the scrape was aborted,
    /// after storing what was found up to that point
    pub error: Option<String>,
    /// Whether running the scrape again later might get further
    pub retryable: bool,
}

impl ScrapeReport {
    #[must_use]
    pub const fn new(source: String, kind: EntityKind) -> Self {
        Self {
            source,
            kind,
            pages: 0,
            end: None,
            inserted_count: 0,
            skipped: 0,
            failures: 0,
            transient_failures: 0,
            inserted: Vec::new(),
            error: None,
            retryable: false,
        }
    }

    fn absorb(&mut self, batch: IngestReport) {
        self.inserted_count += batch.inserted.len();
        self.skipped += batch.skipped;
        self.failures += batch.failures;
        self.transient_failures += batch.transient_failures;
        if batch.transient_failures > 0 {
            self.retryable = true;
        }
        self.inserted.extend(batch.inserted);
    }

    fn abort(&mut self, err: &Error) {
        tracing::warn!("Aborting the scrape of source '{}': {err}", self.source);
        self.error = Some(err.to_string());
        self.retryable = self.retryable || err.is_transient();
    }

    /// Whether the source was scraped without being aborted,
    /// and without any detail page being unavailable.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.error.is_none() && self.transient_failures == 0
    }
}

enum DetailOutcome {
    Parsed(DetailRecord),
    Mismatch,
    Failed,
    Unavailable(FetchError),
}

/// Fetches and parses the detail page a preview links to.
/// Failures are logged and absorbed.
async fn fetch_detail(
    fetcher: Arc<dyn PageFetcher>,
    base_url: Url,
    preview: PreviewRecord,
) -> (PreviewRecord, DetailOutcome) {
    if preview.link.trim().is_empty() {
        tracing::debug!(
            "The {} '{}' has no link to a detail page",
            preview.kind,
            preview.title
        );
        return (preview, DetailOutcome::Failed);
    }
    let url = match fetch::parse_url(&tools::absolutize(&base_url, &preview.link)) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!("Skipping the {} '{}': {err}", preview.kind, preview.title);
            return (preview, DetailOutcome::Failed);
        }
    };
    let html = match fetcher.fetch(&url).await {
        Ok(html) => html,
        Err(err) if err.is_transient() => return (preview, DetailOutcome::Unavailable(err)),
        Err(err) => {
            tracing::warn!(
                "Failed to fetch the detail page of the {} '{}': {err}",
                preview.kind,
                preview.title
            );
            return (preview, DetailOutcome::Failed);
        }
    };
    let outcome = match detail::parse_detail_from_html(&html, preview.kind) {
        Some(record) => DetailOutcome::Parsed(record),
        None => {
            tracing::debug!("Detail page '{url}' does not match the {} template", preview.kind);
            DetailOutcome::Mismatch
        }
    };
    (preview, outcome)
}

/// Ingests the candidates of one source, page by page,
/// remembering every natural key it came across.
pub struct Coordinator<'a> {
    fetcher: Arc<dyn PageFetcher>,
    store: &'a dyn Store,
    kind: EntityKind,
    base_url: Url,
    detail_concurrency: usize,
    seen: HashSet<String>,
}

impl<'a> Coordinator<'a> {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        store: &'a dyn Store,
        kind: EntityKind,
        base_url: Url,
        detail_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            kind,
            base_url,
            detail_concurrency: detail_concurrency.max(1),
            seen: HashSet::new(),
        }
    }

    /// Claims a natural key for this run.
    /// Returns `false` if it is seen before or stored already.
    async fn claim(&mut self, key: &NaturalKey) -> Result<bool, Error> {
        let storage_key = key.storage_key();
        if self.seen.contains(&storage_key) {
            tracing::trace!("Skipping the {} with {key}: seen before in this run", self.kind);
            return Ok(false);
        }
        let stored = self.store.exists(self.kind, key).await?;
        self.seen.insert(storage_key);
        if stored {
            tracing::trace!("Skipping the {} with {key}: stored already", self.kind);
        }
        Ok(!stored)
    }

    /// Ingests the candidates of one listing page.
    ///
    /// # Errors
    ///
    /// Only if the store fails;
    /// failures concerning single candidates are counted instead.
    #[instrument(skip_all, fields(kind = %self.kind, candidates = candidates.len()))]
    pub async fn ingest(&mut self, candidates: Vec<Candidate>) -> Result<IngestReport, Error> {
        let mut report = IngestReport::default();
        let mut complete = Vec::new();
        let mut previews = Vec::new();

        for candidate in candidates {
            let prepared = match candidate {
                Candidate::Complete(mut record) => {
                    record.absolutize_links(&self.base_url);
                    Candidate::Complete(record)
                }
                preview @ Candidate::Preview(_) => preview,
            };
            let key = prepared.natural_key();
            if key.is_empty() {
                tracing::debug!("Skipping a {} without identity", self.kind);
                report.failures += 1;
                continue;
            }
            if !self.claim(&key).await? {
                report.skipped += 1;
                continue;
            }
            match prepared {
                Candidate::Complete(record) => complete.push(record),
                Candidate::Preview(preview) => previews.push(preview),
            }
        }
        self.commit(&mut report, &complete).await?;

        if !previews.is_empty() {
            tracing::info!("Fetching {} detail pages ...", previews.len());
        }
        let fetcher = Arc::clone(&self.fetcher);
        let base_url = self.base_url.clone();
        let details: Vec<(PreviewRecord, DetailOutcome)> = stream::iter(previews)
            .map(|preview| fetch_detail(Arc::clone(&fetcher), base_url.clone(), preview))
            .buffered(self.detail_concurrency)
            .collect()
            .await;

        let mut staged = Vec::with_capacity(details.len());
        for (preview, outcome) in details {
            match outcome {
                DetailOutcome::Parsed(mut record) => {
                    record.enrich_from_preview(&preview);
                    record.absolutize_links(&self.base_url);
                    let key = record.natural_key();
                    // The detail page may name the entity differently than its preview.
                    if key != preview.natural_key() && (key.is_empty() || !self.claim(&key).await?)
                    {
                        report.skipped += 1;
                        continue;
                    }
                    staged.push(record);
                }
                DetailOutcome::Mismatch => report.skipped += 1,
                DetailOutcome::Failed => report.failures += 1,
                DetailOutcome::Unavailable(err) => {
                    tracing::warn!(
                        "The detail page of the {} '{}' is unavailable for now: {err}",
                        preview.kind,
                        preview.title
                    );
                    report.transient_failures += 1;
                }
            }
        }
        self.commit(&mut report, &staged).await?;

        tracing::info!(
            "Stored {} new records; skipped {}, failed {}, unavailable {}",
            report.inserted.len(),
            report.skipped,
            report.failures,
            report.transient_failures
        );
        Ok(report)
    }

    /// Stores a batch in its own transaction.
    /// Records whose key turns out to be taken count as skipped.
    async fn commit(&self, report: &mut IngestReport, records: &[DetailRecord]) -> Result<(), Error> {
        if records.is_empty() {
            return Ok(());
        }
        let inserted = self.store.insert_batch(records).await?;
        report.skipped += records.len() - inserted.len();
        report.inserted.extend(inserted);
        Ok(())
    }
}

/// Scrapes one source to its end, storing everything new.
///
/// Never fails as a whole:
/// an aborted scrape is reported through [`ScrapeReport::error`],
/// together with what was stored before.
#[instrument(skip(scraper, store, fetcher))]
pub async fn run(
    source_id: &str,
    scraper: &dyn Scraper,
    store: &dyn Store,
    fetcher: Arc<dyn PageFetcher>,
    detail_concurrency: usize,
) -> ScrapeReport {
    let mut report = ScrapeReport::new(source_id.to_owned(), scraper.kind());
    let mut coordinator = Coordinator::new(
        fetcher,
        store,
        scraper.kind(),
        scraper.base_url().clone(),
        detail_concurrency,
    );
    let mut pages = scraper.scrape();
    while let Some(event) = pages.next().await {
        match event {
            Ok(PageEvent::Page {
                page_number, items, ..
            }) => {
                report.pages += 1;
                tracing::debug!("Ingesting the {} items of page {page_number} ...", items.len());
                match coordinator.ingest(items).await {
                    Ok(batch) => report.absorb(batch),
                    Err(err) => {
                        report.abort(&err);
                        break;
                    }
                }
            }
            Ok(PageEvent::End(end)) => {
                report.end = Some(end);
                break;
            }
            Err(err) => {
                report.abort(&err);
                break;
            }
        }
    }
    tracing::info!(
        "Source '{source_id}': {} pages, {} new, {} skipped, {} failed",
        report.pages,
        report.inserted_count,
        report.skipped,
        report.failures
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::testing::{FakeFetcher, FakeResponse},
        model::{partner::Partner, project::Project},
        scrapers::{listing, testing::partial_settings, Factory},
        store::SqliteStore,
    };
    use serde_json::json;
    use uuid::Uuid;

    const FIRST: &str = "https://www.auf.org/nos-actions/";
    const SECOND: &str = "https://www.auf.org/nos-actions/page/2/";

    fn listing_page(cards: &[(&str, &str)]) -> String {
        let cards: String = cards
            .iter()
            .map(|(title, link)| {
                format!(
                    r#"<div class="teaser main-teaser has-thumb"><h3 class="title">{title}</h3><a href="{link}">Lire</a></div>"#
                )
            })
            .collect();
        format!(r#"<section class="section">{cards}</section>"#)
    }

    fn detail_page(title: &str) -> String {
        format!(r#"<h1 class="entry-title">{title}</h1><div class="entry-content"><p>OBJECTIFS</p><ul><li>Former</li></ul></div>"#)
    }

    fn projects_scraper(fetcher: Arc<FakeFetcher>) -> Box<dyn Scraper> {
        listing::ScraperFactory
            .create(
                partial_settings(fetcher, 10),
                json!({
                    "kind": "project",
                    "first_page": FIRST,
                    "page_template": "https://www.auf.org/nos-actions/page/{page}/",
                    "not_found_ends_listing": true,
                }),
            )
            .unwrap()
    }

    fn preview(title: &str, link: &str) -> Candidate {
        let mut preview = PreviewRecord::new(EntityKind::Project, title.to_string());
        preview.link = link.to_string();
        Candidate::Preview(preview)
    }

    fn titles(records: &[DetailRecord]) -> Vec<&str> {
        records.iter().map(DetailRecord::title).collect()
    }

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(FIRST, listing_page(&[("Projet A", "/nos-actions/a/"), ("Projet B", "nos-actions/b/")]))
                .with_page("https://www.auf.org/nos-actions/a/", detail_page("Projet A"))
                .with_page("https://www.auf.org/nos-actions/b/", detail_page("Projet B")),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let scraper = projects_scraper(Arc::clone(&fetcher));

        let first = run("auf-projects", scraper.as_ref(), &store, fetcher.clone(), 2).await;
        assert!(first.is_complete());
        assert_eq!(first.pages, 1);
        assert_eq!(first.end, Some(PaginationEnd::NotFound { page_number: 2 }));
        assert_eq!(titles(&first.inserted), vec!["Projet A", "Projet B"]);

        let second = run("auf-projects", scraper.as_ref(), &store, fetcher.clone(), 2).await;
        assert_eq!(second.inserted_count, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.count_all(EntityKind::Project).await.unwrap(), 2);
        // Known entities do not get their detail pages fetched again.
        assert_eq!(fetcher.request_count("https://www.auf.org/nos-actions/a/"), 1);
    }

    #[tokio::test]
    async fn second_run_of_events_fetches_no_detail_page() {
        const EVENTS: &str = "https://www.francophonie.org/actualites-medias?type=page_evenement";
        const DETAIL: &str = "https://www.francophonie.org/journee-20-mars";
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(
                    EVENTS,
                    r#"<div id="lightgallery"><div class="portfolio-item"><a href="/journee-20-mars">
<h1 class="Libre-bold">Journée internationale de la Francophonie</h1>
<span class="small">le 20 mars 2025</span></a></div></div>"#,
                )
                .with_page(
                    DETAIL,
                    r#"<h2 class="Font-Montserrat font-weight-bold"><span class="field--name-title">Journée internationale de la Francophonie</span></h2>
<span class="date text-green font-weight-bold">le 20 mars 2025 | Célébration</span>"#,
                ),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let scraper = listing::ScraperFactory
            .create(
                partial_settings(Arc::clone(&fetcher) as Arc<dyn PageFetcher>, 10),
                json!({ "kind": "event", "first_page": EVENTS }),
            )
            .unwrap();

        let first = run("oif-events", scraper.as_ref(), &store, fetcher.clone(), 2).await;
        assert_eq!(first.inserted_count, 1);

        let second = run("oif-events", scraper.as_ref(), &store, fetcher.clone(), 2).await;
        assert!(second.is_complete());
        assert_eq!(second.inserted_count, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(fetcher.request_count(DETAIL), 1);
    }

    #[tokio::test]
    async fn one_bad_detail_page_does_not_abort_the_batch() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page("https://www.auf.org/a/", "<html><body><p>Maintenance</p></body></html>")
                .with_response("https://www.auf.org/b/", FakeResponse::Unavailable)
                .with_page("https://www.auf.org/c/", detail_page("C")),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let base = Url::parse(FIRST).unwrap();
        let mut coordinator =
            Coordinator::new(fetcher, &store, EntityKind::Project, base, 3);
        let report = coordinator
            .ingest(vec![
                preview("A", "/a/"),
                preview("B", "/b/"),
                preview("C", "/c/"),
                preview("D", ""),
            ])
            .await
            .unwrap();
        assert_eq!(titles(&report.inserted), vec!["C"]);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failures, 1);
        assert_eq!(report.transient_failures, 1);
    }

    #[tokio::test]
    async fn unavailable_detail_page_leaves_the_scrape_incomplete() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(FIRST, listing_page(&[("Projet A", "/nos-actions/a/")]))
                .with_response("https://www.auf.org/nos-actions/a/", FakeResponse::Unavailable),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let scraper = projects_scraper(Arc::clone(&fetcher));

        let report = run("auf-projects", scraper.as_ref(), &store, fetcher, 2).await;
        assert_eq!(report.error, None);
        assert_eq!(report.end, Some(PaginationEnd::NotFound { page_number: 2 }));
        assert_eq!(report.inserted_count, 0);
        assert_eq!(report.failures, 0);
        assert_eq!(report.transient_failures, 1);
        assert!(report.retryable);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn missing_detail_page_is_no_reason_to_retry() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(FIRST, listing_page(&[("Projet A", "/nos-actions/a/")]))
                .with_response("https://www.auf.org/nos-actions/a/", FakeResponse::NotFound),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let scraper = projects_scraper(Arc::clone(&fetcher));

        let report = run("auf-projects", scraper.as_ref(), &store, fetcher, 2).await;
        assert_eq!(report.failures, 1);
        assert_eq!(report.transient_failures, 0);
        assert!(!report.retryable);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn complete_candidates_are_stored_before_detail_pages_are_fetched() {
        let store = SqliteStore::in_memory().await.unwrap();
        let fetcher = Arc::new(
            FakeFetcher::new().with_page("https://www.auf.org/a/", detail_page("A")),
        );
        let mut coordinator = Coordinator::new(
            fetcher,
            &store,
            EntityKind::Project,
            Url::parse(FIRST).unwrap(),
            1,
        );
        let complete = Candidate::Complete(DetailRecord::Project(Project::new("B".to_string())));
        let report = coordinator
            .ingest(vec![preview("A", "/a/"), complete])
            .await
            .unwrap();
        assert_eq!(titles(&report.inserted), vec!["B", "A"]);
    }

    #[tokio::test]
    async fn duplicates_within_a_run_are_inserted_once() {
        let fetcher = Arc::new(
            FakeFetcher::new().with_page("https://www.auf.org/a/", detail_page("A")),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let base = Url::parse(FIRST).unwrap();
        let mut coordinator =
            Coordinator::new(Arc::clone(&fetcher) as Arc<dyn PageFetcher>, &store, EntityKind::Project, base, 2);

        let report = coordinator
            .ingest(vec![preview("A", "/a/"), preview("A", "/a/")])
            .await
            .unwrap();
        assert_eq!(report.inserted.len(), 1);
        assert_eq!(report.skipped, 1);

        let next_page = coordinator.ingest(vec![preview("A", "/a/")]).await.unwrap();
        assert!(next_page.inserted.is_empty());
        assert_eq!(fetcher.request_count("https://www.auf.org/a/"), 1);
    }

    #[tokio::test]
    async fn complete_candidates_are_absolutized_and_keyed() {
        let store = SqliteStore::in_memory().await.unwrap();
        let base = Url::parse("https://www.auf.org/partenaires/nos-partenaires/").unwrap();
        let mut coordinator = Coordinator::new(
            Arc::new(FakeFetcher::new()),
            &store,
            EntityKind::Partner,
            base,
            2,
        );
        let partner = |name: &str| {
            Candidate::Complete(DetailRecord::Partner(Partner {
                id: Uuid::new_v4(),
                name: name.to_string(),
                logo_url: Some("/logos/x.png".to_string()),
                partner_url: "partenaires/x/".to_string(),
            }))
        };
        let report = coordinator
            .ingest(vec![partner("UNESCO"), partner(""), partner("UNESCO")])
            .await
            .unwrap();
        assert_eq!(report.failures, 1);
        assert_eq!(report.skipped, 1);
        let [DetailRecord::Partner(stored)] = report.inserted.as_slice() else {
            panic!("expected exactly one partner");
        };
        assert_eq!(stored.partner_url, "https://www.auf.org/partenaires/x/");
        assert_eq!(stored.logo_url.as_deref(), Some("https://www.auf.org/logos/x.png"));
    }

    #[tokio::test]
    async fn detail_fills_in_what_the_preview_knows() {
        let fetcher = Arc::new(
            FakeFetcher::new().with_page("https://www.auf.org/a/", detail_page("A")),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let mut coordinator = Coordinator::new(
            fetcher,
            &store,
            EntityKind::Project,
            Url::parse(FIRST).unwrap(),
            1,
        );
        let mut with_region = PreviewRecord::new(EntityKind::Project, "A".to_string());
        with_region.link = "/a/".to_string();
        with_region.region = "Afrique centrale et Grands Lacs".to_string();
        let report = coordinator
            .ingest(vec![Candidate::Preview(with_region)])
            .await
            .unwrap();
        let [DetailRecord::Project(Project {
            country_of_intervention,
            ..
        })] = report.inserted.as_slice()
        else {
            panic!("expected exactly one project");
        };
        assert_eq!(country_of_intervention, "Afrique centrale et Grands Lacs");
    }

    #[tokio::test]
    async fn listing_failure_aborts_with_partial_results() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page(FIRST, listing_page(&[("Projet A", "/nos-actions/a/")]))
                .with_page("https://www.auf.org/nos-actions/a/", detail_page("Projet A"))
                .with_response(SECOND, FakeResponse::Unavailable),
        );
        let store = SqliteStore::in_memory().await.unwrap();
        let scraper = projects_scraper(Arc::clone(&fetcher));

        let report = run("auf-projects", scraper.as_ref(), &store, fetcher, 2).await;
        assert!(!report.is_complete());
        assert!(report.retryable);
        assert_eq!(report.end, None);
        assert_eq!(report.inserted_count, 1);
        assert_eq!(store.count_all(EntityKind::Project).await.unwrap(), 1);
    }
}
