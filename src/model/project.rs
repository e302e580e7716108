// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An action/project run or supported by the AUF.
///
/// Every text field defaults to the empty string
/// when it could not be extracted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub objectives: String,
    pub target_audience: String,
    pub overall_budget: String,
    pub country_of_intervention: String,
    pub role_of_auf_in_action: Vec<String>,
    pub period: String,
    pub projects_for_2024_2025: String,
    pub projects_for_2023_2024: String,
    pub projects_for_2021_2022: String,
    pub device: String,
    pub operational_partners: Vec<String>,
}

impl Project {
    #[must_use]
    pub fn new(title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            image_url: None,
            objectives: String::new(),
            target_audience: String::new(),
            overall_budget: String::new(),
            country_of_intervention: String::new(),
            role_of_auf_in_action: Vec::new(),
            period: String::new(),
            projects_for_2024_2025: String::new(),
            projects_for_2023_2024: String::new(),
            projects_for_2021_2022: String::new(),
            device: String::new(),
            operational_partners: Vec::new(),
        }
    }
}
