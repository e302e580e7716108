// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parsing of the dedicated page of a single entity
//! into its full [`DetailRecord`].
//!
//! A page that lacks the mandatory title heading of its kind
//! does not match the expected template;
//! that is reported as `None`, never as an error.
//! Every other field degrades to empty content when it can not be found.

mod event;
pub mod markers;
mod member;
mod project;

use crate::{
    extract::{css, first_text},
    model::{
        partner::Partner,
        resource::{ResourceEntry, ResourceSection, ResourceType},
        DetailRecord, EntityKind, PreviewRecord,
    },
};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use uuid::Uuid;

static S_REGION_TAG: LazyLock<Selector> =
    LazyLock::new(|| css("div.block.block-tags a.lnk-region"));

/// Elements matching `selector` whose class attribute is exactly `class`,
/// excluding look-alikes with additional classes.
fn all_with_exact_class<'a>(
    scope: ElementRef<'a>,
    selector: &'a Selector,
    class: &'a str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    scope
        .select(selector)
        .filter(move |element| element.value().attr("class").map(str::trim) == Some(class))
}

fn with_exact_class<'a>(
    scope: ElementRef<'a>,
    selector: &'a Selector,
    class: &'a str,
) -> Option<ElementRef<'a>> {
    all_with_exact_class(scope, selector, class).next()
}

/// The region from the tags side-bar of the AUF pages.
fn region_tag(root: ElementRef<'_>) -> String {
    first_text(root, &S_REGION_TAG)
        .map(|region| region.replace('+', "").trim().to_owned())
        .unwrap_or_default()
}

/// Whether entities of this kind have a dedicated page to parse,
/// as opposed to being fully described by their listing entry.
#[must_use]
pub const fn has_detail_page(kind: EntityKind) -> bool {
    match kind {
        EntityKind::Project | EntityKind::Member | EntityKind::Event => true,
        EntityKind::Partner | EntityKind::Resource => false,
    }
}

/// Parses the detail page of an entity of the given kind.
///
/// Returns `None` if the page does not match the template of that kind,
/// which is a non-fatal extraction miss.
#[must_use]
pub fn parse_detail(document: &Html, kind: EntityKind) -> Option<DetailRecord> {
    let record = match kind {
        EntityKind::Project => project::parse(document).map(DetailRecord::Project),
        EntityKind::Member => member::parse(document).map(DetailRecord::Member),
        EntityKind::Event => event::parse(document).map(DetailRecord::Event),
        EntityKind::Partner | EntityKind::Resource => {
            tracing::debug!("There is no detail page template for {kind}");
            return None;
        }
    };
    if record.is_none() {
        tracing::debug!("Page does not match the {kind} detail template (no title)");
    }
    record
}

/// Parses (leniently) and extracts in one go.
#[must_use]
pub fn parse_detail_from_html(html: &str, kind: EntityKind) -> Option<DetailRecord> {
    parse_detail(&Html::parse_document(html), kind)
}

/// Builds the detail record of an entity that has no page of its own
/// from its listing entry.
///
/// `resource_type` is the type of the listing the preview came from;
/// it only matters for resources.
#[must_use]
pub fn from_preview(
    preview: &PreviewRecord,
    resource_type: Option<ResourceType>,
) -> Option<DetailRecord> {
    match preview.kind {
        EntityKind::Partner => Some(DetailRecord::Partner(Partner {
            id: Uuid::new_v4(),
            name: preview.title.clone(),
            logo_url: preview.image_url.clone(),
            partner_url: preview.link.clone(),
        })),
        EntityKind::Resource => Some(DetailRecord::Resource(ResourceEntry {
            resource_type: resource_type.unwrap_or(ResourceType::Resources),
            section: ResourceSection {
                id: Uuid::new_v4(),
                title: preview.title.clone(),
                description: preview.description.clone(),
                image_url: preview.image_url.clone(),
                url: preview.link.clone(),
            },
        })),
        EntityKind::Project | EntityKind::Member | EntityKind::Event => None,
    }
}
