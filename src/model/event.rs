// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event of the Francophonie,
/// as published on francophonie.org.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub date: String,
    pub city: String,
    pub event_type: String,
    pub theme: String,
    pub hashtags: String,
    /// Owned exclusively by this event;
    /// they are stored and deleted together with it.
    pub sections: Vec<EventSection>,
}

/// Splits a date line like "le 12 mars 2025 | Conférence"
/// into the bare date and the event type.
///
/// Listing cards and detail pages write dates this same way,
/// and the bare date is part of the identity of an event.
#[must_use]
pub fn split_date_and_type(text: &str) -> (String, String) {
    let mut parts = text.split('|');
    let raw_date = parts.next().unwrap_or_default().trim();
    let date = raw_date.strip_prefix("le ").unwrap_or(raw_date).trim().to_owned();
    let event_type = parts.next().unwrap_or_default().trim().to_owned();
    (date, event_type)
}

/// One slide of the carousel on an event page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventSection {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub link_url: String,
    pub link_text: String,
}

impl Event {
    #[must_use]
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            description: String::new(),
            image_url: None,
            video_url: None,
            date: String::new(),
            city: String::new(),
            event_type: String::new(),
            theme: String::new(),
            hashtags: String::new(),
            sections: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("le 20 mars 2025 | Célébration", "20 mars 2025", "Célébration")]
    #[case("le 20 mars 2025", "20 mars 2025", "")]
    #[case("du 4 au 5 octobre 2024", "du 4 au 5 octobre 2024", "")]
    #[case("Salle des fêtes | Atelier", "Salle des fêtes", "Atelier")]
    fn splits_date_and_type(#[case] text: &str, #[case] date: &str, #[case] event_type: &str) {
        assert_eq!(
            split_date_and_type(text),
            (date.to_string(), event_type.to_string())
        );
    }
}
