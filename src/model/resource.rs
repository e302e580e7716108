// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum::{EnumIter, EnumString};
use uuid::Uuid;

/// The categories of the "ressources et services" offered by the AUF.
/// Each one has its own listing page.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ResourceType {
    Formation,
    Resources,
    Expertise,
    Innovation,
    Prospective,
    Allocation,
}

impl ResourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Formation => "formation",
            Self::Resources => "resources",
            Self::Expertise => "expertise",
            Self::Innovation => "innovation",
            Self::Prospective => "prospective",
            Self::Allocation => "allocation",
        }
    }

    /// Classifies a RESUFF document by its type label,
    /// falling back to keywords in its title.
    #[must_use]
    pub fn classify(type_label: &str, title: &str) -> Self {
        let lower_type = type_label.to_lowercase();
        let lower_title = title.to_lowercase();

        if lower_type.contains("colloque") || lower_type.contains("atelier") {
            Self::Formation
        } else if lower_type.contains("bio") {
            Self::Expertise
        } else if lower_type.contains("publication") {
            Self::Resources
        } else if lower_title.contains("synthèse") {
            Self::Formation
        } else if lower_title.contains("programme") {
            Self::Innovation
        } else {
            Self::Resources
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Container of all the resource sections of one type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: Uuid,
    pub resource_type: ResourceType,
    pub sections: Vec<ResourceSection>,
}

/// A single resource entry (document, program, service, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceSection {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub url: String,
}

/// A resource section together with the type of the container it belongs to;
/// this is what a resource scrape produces.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub resource_type: ResourceType,
    pub section: ResourceSection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Colloque", "Actes", ResourceType::Formation)]
    #[case("Atelier", "Bilan", ResourceType::Formation)]
    #[case("Biographie", "Portrait", ResourceType::Expertise)]
    #[case("Publication", "Programme 2024", ResourceType::Resources)]
    #[case("Document", "Synthèse des travaux", ResourceType::Formation)]
    #[case("Document", "Programme de mentorat", ResourceType::Innovation)]
    #[case("Document", "Rapport annuel", ResourceType::Resources)]
    fn classifies_resuff_documents(
        #[case] type_label: &str,
        #[case] title: &str,
        #[case] expected: ResourceType,
    ) {
        assert_eq!(ResourceType::classify(type_label, title), expected);
    }
}
