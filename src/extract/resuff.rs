// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Extraction from the pages of the RESUFF network
//! (Réseau des femmes universitaires francophones),
//! which do not follow the card layout of the other sources.
//! Their entries carry all the data there is,
//! so they are turned into full records right away.

use super::{css, element_text, first_attr, first_text};
use crate::{
    model::{
        member::Member,
        resource::{ResourceEntry, ResourceSection, ResourceType},
    },
    tools,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use uuid::Uuid;

/// Maximum length of the short member fields (contact title, address).
pub const MAX_SHORT_TEXT_LEN: usize = 200;

pub const ROLE_BACKGROUND_PREFIX: &str = "RESUFF Role: ";
pub const LEADERSHIP_STATUTORY_TYPE: &str = "RESUFF Leadership";
pub const ACADEMIC_UNIVERSITY_TYPE: &str = "Academic Institution";

static S_REGION_BLOCK: LazyLock<Selector> = LazyLock::new(|| css("div.groupeCarte"));
static S_REGION_TITLE: LazyLock<Selector> = LazyLock::new(|| css("h3"));
static S_MEMBERS_TEXT: LazyLock<Selector> = LazyLock::new(|| css("div.txtDouble"));
static S_MEMBER_NAME: LazyLock<Selector> = LazyLock::new(|| css("strong.violet"));
static S_DOC_ROW: LazyLock<Selector> = LazyLock::new(|| css("div.ligneDoc"));
static S_DOC_TEXT: LazyLock<Selector> = LazyLock::new(|| css("div.txtDoc"));
static S_DOC_TYPE: LazyLock<Selector> = LazyLock::new(|| css("span.violet"));
static S_DOC_TITLE: LazyLock<Selector> = LazyLock::new(|| css("span.moyen"));
static S_LINK: LazyLock<Selector> = LazyLock::new(|| css("a[href]"));

static R_ENTRY_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:&nbsp;|\u{a0})\s*<br\s*/?>").expect("Invalid built-in regex")
});
static R_LINE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<br\s*/?>|\r|\n").expect("Invalid built-in regex"));
static R_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(Présidente du Comité scientifique du RESUFF|Membre du Comité scientifique du RESUFF|Vice-Présidente du RESUFF|Présidente du RESUFF|Secrétaire du RESUFF|Trésorière du RESUFF)",
    )
    .expect("Invalid built-in regex")
});
static R_INSTITUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Université[^,]*|École[^,]*|Institut[^,]*|Centre[^,]*)")
        .expect("Invalid built-in regex")
});

fn fragment_text(html: &str) -> String {
    element_text(Html::parse_fragment(html).root_element())
}

/// Parses a single member entry, as found between the separators
/// of a region block.
/// Returns `None` if the entry has no name.
fn parse_member_entry(entry_html: &str, region: &str) -> Option<Member> {
    let fragment = Html::parse_fragment(entry_html);
    let name = first_text(fragment.root_element(), &S_MEMBER_NAME)?;

    let lines: Vec<String> = R_LINE_SEPARATOR
        .split(entry_html)
        .map(fragment_text)
        .filter(|line| !line.is_empty())
        .collect();
    let full_text = lines.join(" ");

    let role = R_ROLE
        .captures(&full_text)
        .and_then(|caps| caps.get(1))
        .map(|role| role.as_str().to_owned());
    let role_line_marker = role
        .as_deref()
        .map(|role| role.replace("du RESUFF", "").trim().to_owned());

    let description_lines: Vec<&String> = lines
        .iter()
        .skip(1)
        .filter(|line| {
            role_line_marker
                .as_deref()
                .is_none_or(|marker| !line.contains(marker))
        })
        .collect();
    let description = description_lines
        .iter()
        .map(|line| line.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let contact_title = description_lines
        .first()
        .map(|line| tools::truncate(line, MAX_SHORT_TEXT_LEN))
        .unwrap_or_default();
    let institution = R_INSTITUTION
        .captures(&description)
        .and_then(|caps| caps.get(1))
        .map(|inst| inst.as_str().trim().to_owned())
        .unwrap_or_default();

    let mut member = Member::new(name.clone());
    member.contact_name = name;
    member.description = tools::truncate_long_text(&description);
    member.contact_title = contact_title;
    member.region = region.to_owned();
    if let Some(role) = role {
        member.background = format!("{ROLE_BACKGROUND_PREFIX}{role}");
        LEADERSHIP_STATUTORY_TYPE.clone_into(&mut member.statutory_type);
    }
    if !institution.is_empty() {
        ACADEMIC_UNIVERSITY_TYPE.clone_into(&mut member.university_type);
        member.address = tools::truncate(&institution, MAX_SHORT_TEXT_LEN);
    }
    Some(member)
}

/// Extracts the members of all region blocks of the RESUFF members page.
#[must_use]
pub fn extract_members(document: &Html) -> Vec<Member> {
    let mut members = Vec::new();
    for block in document.select(&S_REGION_BLOCK) {
        let region = first_text(block, &S_REGION_TITLE).unwrap_or_default();
        let Some(text) = block.select(&S_MEMBERS_TEXT).next() else {
            tracing::debug!("RESUFF region block '{region}' has no member text");
            continue;
        };
        let inner = text.inner_html();
        let before = members.len();
        members.extend(
            R_ENTRY_SEPARATOR
                .split(&inner)
                .filter(|entry| !entry.trim().is_empty())
                .filter_map(|entry| parse_member_entry(entry.trim(), &region)),
        );
        tracing::trace!(
            "RESUFF region '{region}' yielded {} members",
            members.len() - before
        );
    }
    members
}

/// Extracts the document rows of the RESUFF resources page.
///
/// A row needs both a type label and a title;
/// the type label decides the resource type (see [`ResourceType::classify`]).
/// Links are left as found.
#[must_use]
pub fn extract_documents(document: &Html) -> Vec<ResourceEntry> {
    document
        .select(&S_DOC_ROW)
        .filter_map(|row| {
            let text = row.select(&S_DOC_TEXT).next()?;
            let type_label = first_text(text, &S_DOC_TYPE)?;
            let Some(title) = first_text(text, &S_DOC_TITLE) else {
                tracing::trace!("Skipping a RESUFF '{type_label}' document without title");
                return None;
            };
            let url = first_attr(row, &S_LINK, "href").unwrap_or_default();
            Some(ResourceEntry {
                resource_type: ResourceType::classify(&type_label, &title),
                section: ResourceSection {
                    id: Uuid::new_v4(),
                    title,
                    description: type_label,
                    image_url: None,
                    url,
                },
            })
        })
        .collect()
}
