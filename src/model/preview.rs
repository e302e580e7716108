// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{event::split_date_and_type, kind::EntityKind, key::NaturalKey};
use serde::{Deserialize, Serialize};

/// The secondary fields a listing "card" may carry,
/// besides its mandatory title/name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PreviewField {
    Link,
    Region,
    Address,
    Date,
    City,
    Description,
    ImageUrl,
}

/// Lightweight summary of an entity, as found on a listing page.
///
/// It only lives for the duration of one scrape;
/// it is either superseded by the full detail record
/// or discarded.
/// The `link` and `image_url` are left as found in the markup,
/// which means they may well be relative.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PreviewRecord {
    pub kind: EntityKind,
    /// Title or name, never empty
    pub title: String,
    pub link: String,
    pub region: String,
    pub address: String,
    pub date: String,
    pub city: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl PreviewRecord {
    #[must_use]
    pub const fn new(kind: EntityKind, title: String) -> Self {
        Self {
            kind,
            title,
            link: String::new(),
            region: String::new(),
            address: String::new(),
            date: String::new(),
            city: String::new(),
            description: String::new(),
            image_url: None,
        }
    }

    pub fn set(&mut self, field: PreviewField, value: String) {
        match field {
            PreviewField::Link => self.link = value,
            PreviewField::Region => self.region = value,
            PreviewField::Address => self.address = value,
            PreviewField::Date => self.date = value,
            PreviewField::City => self.city = value,
            PreviewField::Description => self.description = value,
            PreviewField::ImageUrl => self.image_url = Some(value).filter(|url| !url.is_empty()),
        }
    }

    /// The identity this preview will have once stored,
    /// as far as it can be told from the listing alone.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        match self.kind {
            EntityKind::Project | EntityKind::Member | EntityKind::Partner => {
                NaturalKey::Name(self.title.clone())
            }
            EntityKind::Event => NaturalKey::TitleAndDate {
                title: self.title.clone(),
                date: split_date_and_type(&self.date).0,
            },
            EntityKind::Resource => resource_key(&self.link, &self.title),
        }
    }
}

/// Resources are keyed by their link;
/// entries without one fall back to their title.
pub(crate) fn resource_key(link: &str, title: &str) -> NaturalKey {
    if link.is_empty() {
        NaturalKey::Name(title.to_owned())
    } else {
        NaturalKey::Link(link.to_owned())
    }
}
