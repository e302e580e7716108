// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{
    event::{split_date_and_type, Event},
    key::NaturalKey,
    kind::EntityKind,
    member::Member,
    partner::Partner,
    preview::{resource_key, PreviewRecord},
    project::Project,
    resource::{Resource, ResourceEntry},
};
use crate::tools;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Full-fidelity record of one entity,
/// as produced by a scrape and handed to the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum DetailRecord {
    Project(Project),
    Member(Member),
    Partner(Partner),
    Event(Event),
    Resource(ResourceEntry),
}

/// A record as read back from the store.
///
/// Differs from [`DetailRecord`] only for resources,
/// which are read as whole containers with all their sections.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Record {
    Project(Project),
    Member(Member),
    Partner(Partner),
    Event(Event),
    Resource(Resource),
}

fn fill_if_empty(target: &mut String, source: &str) {
    if target.is_empty() && !source.is_empty() {
        source.clone_into(target);
    }
}

fn absolutize_opt(base: &Url, link: &mut Option<String>) {
    if let Some(link_val) = link {
        *link_val = tools::absolutize(base, link_val);
    }
}

fn absolutize_in_place(base: &Url, link: &mut String) {
    *link = tools::absolutize(base, link);
}

/// Only resolves links relative to the site root;
/// anything else is taken to point to another site.
fn absolutize_site_root_relative(base: &Url, link: &mut String) {
    if link.starts_with('/') {
        absolutize_in_place(base, link);
    }
}

impl DetailRecord {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Member(_) => EntityKind::Member,
            Self::Partner(_) => EntityKind::Partner,
            Self::Event(_) => EntityKind::Event,
            Self::Resource(_) => EntityKind::Resource,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        match self {
            Self::Project(project) => project.id,
            Self::Member(member) => member.id,
            Self::Partner(partner) => partner.id,
            Self::Event(event) => event.id,
            Self::Resource(entry) => entry.section.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Project(project) => &project.title,
            Self::Member(member) => &member.name,
            Self::Partner(partner) => &partner.name,
            Self::Event(event) => &event.title,
            Self::Resource(entry) => &entry.section.title,
        }
    }

    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        match self {
            Self::Project(project) => NaturalKey::Name(project.title.clone()),
            Self::Member(member) => NaturalKey::Name(member.name.clone()),
            Self::Partner(partner) => NaturalKey::Name(partner.name.clone()),
            Self::Event(event) => NaturalKey::TitleAndDate {
                title: event.title.clone(),
                date: event.date.clone(),
            },
            Self::Resource(entry) => resource_key(&entry.section.url, &entry.section.title),
        }
    }

    /// The geographic region used for filtering listings.
    #[must_use]
    pub fn region(&self) -> &str {
        match self {
            Self::Project(project) => &project.country_of_intervention,
            Self::Member(member) => &member.region,
            Self::Partner(_) | Self::Event(_) | Self::Resource(_) => "",
        }
    }

    /// Fills fields the detail page did not provide
    /// with what the listing card showed.
    pub fn enrich_from_preview(&mut self, preview: &PreviewRecord) {
        match self {
            Self::Project(project) => {
                fill_if_empty(&mut project.country_of_intervention, &preview.region);
                if project.image_url.is_none() {
                    project.image_url.clone_from(&preview.image_url);
                }
            }
            Self::Member(member) => {
                fill_if_empty(&mut member.address, &preview.address);
                fill_if_empty(&mut member.region, &preview.region);
            }
            Self::Event(event) => {
                fill_if_empty(&mut event.city, &preview.city);
                fill_if_empty(&mut event.date, &split_date_and_type(&preview.date).0);
            }
            Self::Partner(_) | Self::Resource(_) => {}
        }
    }

    /// Turns all site-relative links within this record into absolute ones.
    pub fn absolutize_links(&mut self, base: &Url) {
        match self {
            Self::Project(project) => absolutize_opt(base, &mut project.image_url),
            Self::Member(member) => absolutize_site_root_relative(base, &mut member.website),
            Self::Partner(partner) => {
                absolutize_opt(base, &mut partner.logo_url);
                absolutize_in_place(base, &mut partner.partner_url);
            }
            Self::Event(event) => {
                absolutize_opt(base, &mut event.image_url);
                absolutize_opt(base, &mut event.video_url);
                for section in &mut event.sections {
                    absolutize_in_place(base, &mut section.link_url);
                }
            }
            Self::Resource(entry) => {
                absolutize_opt(base, &mut entry.section.image_url);
                absolutize_in_place(base, &mut entry.section.url);
            }
        }
    }
}

impl Record {
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Project(_) => EntityKind::Project,
            Self::Member(_) => EntityKind::Member,
            Self::Partner(_) => EntityKind::Partner,
            Self::Event(_) => EntityKind::Event,
            Self::Resource(_) => EntityKind::Resource,
        }
    }
}
