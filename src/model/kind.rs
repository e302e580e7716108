// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum::{EnumIter, EnumString};

/// The kinds of content this crate aggregates.
///
/// Every scraping template, detail parser and storage table
/// is selected by one of these tags.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum EntityKind {
    #[strum(serialize = "project", serialize = "projects")]
    Project,
    #[strum(serialize = "member", serialize = "members")]
    Member,
    #[strum(serialize = "partner", serialize = "partners")]
    Partner,
    #[strum(serialize = "event", serialize = "events")]
    Event,
    #[strum(serialize = "resource", serialize = "resources")]
    Resource,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Member => "member",
            Self::Partner => "partner",
            Self::Event => "event",
            Self::Resource => "resource",
        }
    }

    /// Whether records of this kind own child sections,
    /// which are deleted together with their parent.
    #[must_use]
    pub const fn has_sections(self) -> bool {
        match self {
            Self::Event | Self::Resource => true,
            Self::Project | Self::Member | Self::Partner => false,
        }
    }
}

impl AsRef<str> for EntityKind {
    fn as_ref(&self) -> &'static str {
        self.as_str()
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_singular_and_plural() {
        assert_eq!(EntityKind::from_str("events").unwrap(), EntityKind::Event);
        assert_eq!(EntityKind::from_str("Member").unwrap(), EntityKind::Member);
        assert!(EntityKind::from_str("service").is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for kind in EntityKind::iter() {
            assert_eq!(EntityKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }
}
