// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member institution (university, school, research center)
/// or, for the RESUFF network, a member person.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub background: String,
    pub contact_name: String,
    pub contact_title: String,
    pub statutory_type: String,
    pub university_type: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub region: String,
    pub founded_year: String,
}

impl Member {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: String::new(),
            background: String::new(),
            contact_name: String::new(),
            contact_title: String::new(),
            statutory_type: String::new(),
            university_type: String::new(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            region: String::new(),
            founded_year: String::new(),
        }
    }
}
