// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{markers, region_tag, with_exact_class};
use crate::{
    extract::{css, first_attr, first_text},
    model::project::Project,
};
use scraper::{Html, Selector};
use std::sync::LazyLock;

static S_TITLE: LazyLock<Selector> = LazyLock::new(|| css("h1.entry-title"));
static S_IMAGE: LazyLock<Selector> = LazyLock::new(|| css("figure.image img"));
static S_CONTENT: LazyLock<Selector> = LazyLock::new(|| css("div.entry-content"));

pub fn parse(document: &Html) -> Option<Project> {
    let root = document.root_element();
    let title = first_text(root, &S_TITLE)?;

    let mut project = Project::new(title);
    project.image_url = first_attr(root, &S_IMAGE, "src");
    project.country_of_intervention = region_tag(root);

    if let Some(content) = with_exact_class(root, &S_CONTENT, "entry-content") {
        project.objectives = markers::objectives(content);
        project.target_audience = markers::target_audience(content);
        project.overall_budget = markers::budget(content);
        project.period = markers::period(content);
        project.operational_partners = markers::operational_partners(content);
        project.role_of_auf_in_action = markers::auf_role(content);
    } else {
        tracing::debug!("Project page '{}' has no content block", project.title);
    }
    Some(project)
}
