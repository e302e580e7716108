// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Separates the parts of a composite key in its storage form.
/// It can not occur in scraped text, because we normalize whitespace.
const KEY_PART_SEPARATOR: char = '\u{1f}';

/// A domain-meaningful identifier used for de-duplication,
/// in the absence of a stable identifier issued by the source sites.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NaturalKey {
    /// Projects, members and partners are identified by their name/title.
    Name(String),
    /// Events are identified by title and date,
    /// because recurring events share a title.
    TitleAndDate { title: String, date: String },
    /// Resources are identified by the document/page they point to.
    Link(String),
}

impl NaturalKey {
    /// The single-string form of this key, as used in the unique index of the store.
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::TitleAndDate { title, date } => format!("{title}{KEY_PART_SEPARATOR}{date}"),
            Self::Link(link) => link.clone(),
        }
    }

    /// Empty keys can not identify anything,
    /// so candidates carrying one are not ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Name(value) | Self::Link(value) => value.is_empty(),
            Self::TitleAndDate { title, .. } => title.is_empty(),
        }
    }
}

impl Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "name '{name}'"),
            Self::TitleAndDate { title, date } => write!(f, "title '{title}' on '{date}'"),
            Self::Link(link) => write!(f, "link '{link}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_keys_differ_by_date() {
        let first = NaturalKey::TitleAndDate {
            title: "Forum".to_string(),
            date: "12 mars 2024".to_string(),
        };
        let second = NaturalKey::TitleAndDate {
            title: "Forum".to_string(),
            date: "3 juin 2025".to_string(),
        };
        assert_ne!(first.storage_key(), second.storage_key());
    }

    #[test]
    fn empty_title_means_empty_key() {
        let key = NaturalKey::TitleAndDate {
            title: String::new(),
            date: "hier".to_string(),
        };
        assert!(key.is_empty());
        assert!(!NaturalKey::Name("AUF".to_string()).is_empty());
    }
}
