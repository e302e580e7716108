// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Walks the sequential pages of a listing.
//!
//! Pages are requested one after the other,
//! until a page yields no items.
//! A failing fetch is never taken for the end of the listing;
//! it ends the stream with an error instead,
//! after all the pages fetched so far.

use std::sync::Arc;

use async_stream::stream;
use futures::stream::{BoxStream, StreamExt};
use serde::Serialize;
use url::Url;

use crate::fetch::{self, FetchError, PageFetcher};

pub const PAGE_PLACEHOLDER: &str = "{page}";
pub const PAGE_INDEX_PLACEHOLDER: &str = "{page_index}";

/// Why the walk over a listing stopped (without error).
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PaginationEnd {
    /// The page with this number yielded no items.
    Empty { page_number: u32 },
    /// The page with this number does not exist.
    NotFound { page_number: u32 },
    /// The maximum number of pages was reached.
    Capped { max_pages: u32 },
    /// The page with this number repeated the items of its predecessor.
    Repeated { page_number: u32 },
    /// The listing consists of a single page only.
    SinglePage,
}

impl PaginationEnd {
    /// Whether this end is an anomaly,
    /// meaning the listing was not (necessarily) exhausted.
    #[must_use]
    pub const fn is_anomaly(self) -> bool {
        matches!(self, Self::Capped { .. } | Self::Repeated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent<T> {
    Page {
        page_number: u32,
        url: Url,
        items: Vec<T>,
    },
    End(PaginationEnd),
}

impl<T> PageEvent<T> {
    /// Converts the items of a page, dropping those mapped to `None`.
    pub fn filter_map_items<U>(self, mapper: impl FnMut(T) -> Option<U>) -> PageEvent<U> {
        match self {
            Self::Page {
                page_number,
                url,
                items,
            } => PageEvent::Page {
                page_number,
                url,
                items: items.into_iter().filter_map(mapper).collect(),
            },
            Self::End(end) => PageEvent::End(end),
        }
    }
}

/// How to get from one page of a listing to the next.
#[derive(Debug, Clone)]
pub struct PagePlan {
    pub first_page: Url,
    /// URL of the pages after the first one,
    /// with [`PAGE_PLACEHOLDER`] standing for the 1-based page number
    /// and [`PAGE_INDEX_PLACEHOLDER`] for the 0-based one.
    /// Without it, the listing has a single page.
    pub page_template: Option<String>,
    pub max_pages: u32,
    /// Whether "not found" for a page after the first one
    /// marks the end of the listing.
    pub not_found_ends_listing: bool,
}

impl PagePlan {
    #[must_use]
    pub const fn single(url: Url) -> Self {
        Self {
            first_page: url,
            page_template: None,
            max_pages: 1,
            not_found_ends_listing: false,
        }
    }

    /// The URL of the page with the given (1-based) number,
    /// or `None` if the listing does not have that many pages.
    pub fn page_url(&self, page_number: u32) -> Result<Option<Url>, FetchError> {
        if page_number <= 1 {
            return Ok(Some(self.first_page.clone()));
        }
        let Some(template) = &self.page_template else {
            return Ok(None);
        };
        let url = template
            .replace(PAGE_PLACEHOLDER, &page_number.to_string())
            .replace(PAGE_INDEX_PLACEHOLDER, &(page_number - 1).to_string());
        fetch::parse_url(&url).map(Some)
    }
}

/// Fetches the pages of a listing one after the other,
/// extracting the items of each one with `extract`.
///
/// Yields one [`PageEvent::Page`] per page with items,
/// and finally either a [`PageEvent::End`] or an error.
pub fn paginate<T, F>(
    fetcher: Arc<dyn PageFetcher>,
    plan: PagePlan,
    extract: F,
) -> BoxStream<'static, Result<PageEvent<T>, FetchError>>
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(&str) -> Vec<T> + Send + 'static,
{
    stream! {
        let max_pages = plan.max_pages.max(1);
        let mut previous: Option<Vec<T>> = None;
        let mut page_number: u32 = 1;
        loop {
            let url = match plan.page_url(page_number) {
                Ok(Some(url)) => url,
                Ok(None) => {
                    yield Ok(PageEvent::End(PaginationEnd::SinglePage));
                    break;
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            };
            if page_number > max_pages {
                tracing::warn!(
                    "Stopping at the maximum of {max_pages} pages; the listing at '{}' might have more",
                    plan.first_page
                );
                yield Ok(PageEvent::End(PaginationEnd::Capped { max_pages }));
                break;
            }

            tracing::info!("Fetching listing page {page_number} ('{url}') ...");
            let body = match fetcher.fetch(&url).await {
                Ok(body) => body,
                Err(err) if page_number > 1 && plan.not_found_ends_listing && err.is_not_found() => {
                    tracing::info!("Listing ended: page {page_number} does not exist");
                    yield Ok(PageEvent::End(PaginationEnd::NotFound { page_number }));
                    break;
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            };

            let items = extract(&body);
            if items.is_empty() {
                tracing::info!("Listing ended: page {page_number} has no items");
                yield Ok(PageEvent::End(PaginationEnd::Empty { page_number }));
                break;
            }
            if previous.as_ref() == Some(&items) {
                tracing::warn!(
                    "Page {page_number} ('{url}') repeats the items of its predecessor; stopping"
                );
                yield Ok(PageEvent::End(PaginationEnd::Repeated { page_number }));
                break;
            }
            tracing::debug!("Page {page_number} has {} items", items.len());
            previous = Some(items.clone());
            yield Ok(PageEvent::Page { page_number, url, items });
            page_number += 1;
        }
    }
    .boxed()
}

/// All the items of a listing, accumulated over its pages.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    /// Number of pages that yielded items
    pub pages: u32,
    pub end: Option<PaginationEnd>,
}

/// Drains a pagination stream.
/// On error, returns what was accumulated up to it, together with the error.
pub async fn collect_all<T, E>(
    mut pages: BoxStream<'_, Result<PageEvent<T>, E>>,
) -> (Collected<T>, Option<E>) {
    let mut collected = Collected {
        items: Vec::new(),
        pages: 0,
        end: None,
    };
    while let Some(event) = pages.next().await {
        match event {
            Ok(PageEvent::Page { mut items, .. }) => {
                collected.pages += 1;
                collected.items.append(&mut items);
            }
            Ok(PageEvent::End(end)) => {
                collected.end = Some(end);
                break;
            }
            Err(err) => return (collected, Some(err)),
        }
    }
    (collected, None)
}
