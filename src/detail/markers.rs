// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Marker-paragraph strategies for the fields of a project page.
//!
//! The project pages are free-form WordPress content,
//! structured only by paragraphs holding an upper-case heading word
//! (the "marker"), each followed by the list or paragraph it introduces.
//! Every field has its own strategy, with its own fallback.

use crate::{
    extract::{css, element_text},
    tools,
};
use scraper::{node::Node, ElementRef, Selector};
use std::sync::LazyLock;

static S_PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| css("p"));
static S_LIST_ITEM: LazyLock<Selector> = LazyLock::new(|| css("li"));

pub const OBJECTIVES_MARKER: &str = "OBJECTIFS";
pub const TARGET_MARKER: &str = "CIBLE";
pub const IMPACT_MARKER: &str = "IMPACT";
pub const PARTNERS_MARKER: &str = "PARTENAIRES";
pub const BUDGET_MARKER: &str = "BUDGET";
pub const GLOBAL_BUDGET_MARKER: &str = "BUDGET GLOBAL";
pub const ROLE_MARKER: &str = "RÔLE DE L";
pub const PERIOD_LABEL: &str = "Durée";

pub const DEFAULT_TARGET_AUDIENCE: &str = "Établissements d'enseignement supérieur et étudiants";
pub const DEFAULT_AUF_ROLE: &str = "Coordination et mise en œuvre";

/// Number of paragraphs taken as objectives
/// when there is no objectives marker.
const FALLBACK_OBJECTIVES_PARAGRAPHS: usize = 2;
/// Characters taken before the currency sign when guessing the budget.
const BUDGET_WINDOW_LEAD: usize = 20;
/// Total characters of the budget guess.
const BUDGET_WINDOW_LEN: usize = 40;

fn is_list(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "ul" | "ol")
}

/// The first paragraph whose text contains all the given needles.
fn marker_paragraph<'a>(content: ElementRef<'a>, needles: &[&str]) -> Option<ElementRef<'a>> {
    content.select(&S_PARAGRAPH).find(|paragraph| {
        let text = element_text(*paragraph);
        needles.iter().all(|needle| text.contains(needle))
    })
}

fn next_element_sibling(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// The text of a list item, without the text of any list nested in it.
fn item_text(item: ElementRef<'_>) -> String {
    let item_id = item.id();
    let mut text = String::new();
    for node in item.descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let nested = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != item_id)
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_list(&ancestor));
        if !nested {
            text.push_str(fragment);
        }
    }
    tools::normalize_text(&text)
}

/// The non-empty items of a list,
/// with the items of lists nested one level deep following their parent item.
fn list_items(list: ElementRef<'_>) -> Vec<String> {
    list.select(&S_LIST_ITEM)
        .map(item_text)
        .filter(|item| !item.is_empty())
        .collect()
}

/// The outcome of walking the siblings following a marker paragraph.
#[derive(Debug, PartialEq, Eq)]
pub enum Walk {
    /// There is no paragraph with the marker.
    NoMarker,
    /// The marker was found, but another marker paragraph
    /// (or the end of the siblings) came before any list.
    Interrupted,
    /// The items of the first list after the marker.
    Found(Vec<String>),
}

/// Finds the paragraph containing `marker`,
/// then walks its following siblings up to the first list,
/// giving up at any paragraph containing one of `stop_markers`.
pub fn list_after_marker(content: ElementRef<'_>, marker: &str, stop_markers: &[&str]) -> Walk {
    let Some(start) = marker_paragraph(content, &[marker]) else {
        return Walk::NoMarker;
    };
    for sibling in start.next_siblings().filter_map(ElementRef::wrap) {
        if is_list(&sibling) {
            return Walk::Found(list_items(sibling));
        }
        if sibling.value().name() == "p" {
            let text = element_text(sibling);
            if stop_markers.iter().any(|stop| text.contains(stop)) {
                tracing::trace!("Marker '{marker}' is followed by another marker before any list");
                return Walk::Interrupted;
            }
        }
    }
    Walk::Interrupted
}

/// The objectives list, joined with "; ".
/// Without a marker, the first two paragraphs
/// not about partners or budget make the objectives.
#[must_use]
pub fn objectives(content: ElementRef<'_>) -> String {
    let text = match list_after_marker(
        content,
        OBJECTIVES_MARKER,
        &[IMPACT_MARKER, TARGET_MARKER],
    ) {
        Walk::Found(items) => items.join("; "),
        Walk::Interrupted => String::new(),
        Walk::NoMarker => content
            .select(&S_PARAGRAPH)
            .map(element_text)
            .filter(|text| {
                !text.is_empty() && !text.contains(PARTNERS_MARKER) && !text.contains(BUDGET_MARKER)
            })
            .take(FALLBACK_OBJECTIVES_PARAGRAPHS)
            .collect::<Vec<_>>()
            .join(" "),
    };
    tools::truncate_long_text(&text)
}

/// The target audience list, joined with "; ".
/// Pages without a target marker address the default audience.
#[must_use]
pub fn target_audience(content: ElementRef<'_>) -> String {
    match list_after_marker(
        content,
        TARGET_MARKER,
        &[PARTNERS_MARKER, BUDGET_MARKER, ROLE_MARKER],
    ) {
        Walk::Found(items) => tools::truncate_long_text(&items.join("; ")),
        Walk::Interrupted => String::new(),
        Walk::NoMarker => DEFAULT_TARGET_AUDIENCE.to_owned(),
    }
}

/// The element right after the global budget marker,
/// or else a window of text around the first euro sign.
#[must_use]
pub fn budget(content: ElementRef<'_>) -> String {
    if let Some(text) = marker_paragraph(content, &[GLOBAL_BUDGET_MARKER])
        .and_then(next_element_sibling)
        .map(element_text)
        .filter(|text| !text.is_empty())
    {
        return text;
    }

    let all_text: Vec<char> = element_text(content).chars().collect();
    match all_text.iter().position(|chr| *chr == '€') {
        Some(euro_idx) if euro_idx > 0 => {
            let start = euro_idx.saturating_sub(BUDGET_WINDOW_LEAD);
            let end = (start + BUDGET_WINDOW_LEN).min(all_text.len());
            all_text[start..end]
                .iter()
                .collect::<String>()
                .trim()
                .to_owned()
        }
        Some(_) | None => String::new(),
    }
}

/// The duration, from the list item labeled with it.
#[must_use]
pub fn period(content: ElementRef<'_>) -> String {
    content
        .select(&S_LIST_ITEM)
        .map(item_text)
        .find(|text| text.contains(PERIOD_LABEL))
        .map(|text| {
            text.replace(PERIOD_LABEL, "")
                .trim()
                .trim_start_matches(':')
                .trim()
                .to_owned()
        })
        .unwrap_or_default()
}

/// The operational partners, without duplicates, in order of appearance.
#[must_use]
pub fn operational_partners(content: ElementRef<'_>) -> Vec<String> {
    match list_after_marker(
        content,
        PARTNERS_MARKER,
        &[ROLE_MARKER, GLOBAL_BUDGET_MARKER],
    ) {
        Walk::Found(items) => {
            let mut partners: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                if !partners.contains(&item) {
                    partners.push(item);
                }
            }
            partners
        }
        Walk::Interrupted | Walk::NoMarker => Vec::new(),
    }
}

/// The paragraph (or list) following the "role of the AUF" marker.
#[must_use]
pub fn auf_role(content: ElementRef<'_>) -> Vec<String> {
    marker_paragraph(content, &[ROLE_MARKER, "AUF"])
        .and_then(next_element_sibling)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .map_or_else(|| vec![DEFAULT_AUF_ROLE.to_owned()], |role| vec![role])
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn with_content<T>(body: &str, test: impl FnOnce(ElementRef<'_>) -> T) -> T {
        let document = Html::parse_fragment(&format!("<div class=\"entry-content\">{body}</div>"));
        let content = document
            .select(&css("div.entry-content"))
            .next()
            .unwrap();
        test(content)
    }

    const FULL_PAGE: &str = r"
<p>Le projet vise la transformation numérique.</p>
<p><strong>OBJECTIFS</strong></p>
<p>Le projet poursuit les objectifs suivants :</p>
<ul><li>Former 500 enseignants</li><li> </li><li>Créer des ressources ouvertes</li></ul>
<p><strong>CIBLE</strong></p>
<ul><li>Universités membres</li><li>Étudiants</li></ul>
<p><strong>PARTENAIRES OPÉRATIONNELS</strong></p>
<ul>
  <li>Ministères
    <ul><li>Ministère de l'Éducation</li><li>Ministère du Numérique</li></ul>
  </li>
  <li>Ministère de l'Éducation</li>
</ul>
<p><strong>RÔLE DE L’AUF</strong></p>
<p>Maîtrise d’ouvrage déléguée</p>
<p><strong>BUDGET GLOBAL</strong></p>
<p>1 200 000 €</p>
<ul><li>Durée : 36 mois</li></ul>
";

    #[test]
    fn reads_the_list_after_each_marker() {
        with_content(FULL_PAGE, |content| {
            assert_eq!(
                objectives(content),
                "Former 500 enseignants; Créer des ressources ouvertes"
            );
            assert_eq!(target_audience(content), "Universités membres; Étudiants");
            assert_eq!(
                operational_partners(content),
                vec![
                    "Ministères".to_string(),
                    "Ministère de l'Éducation".to_string(),
                    "Ministère du Numérique".to_string(),
                ]
            );
            assert_eq!(auf_role(content), vec!["Maîtrise d’ouvrage déléguée".to_string()]);
            assert_eq!(budget(content), "1 200 000 €");
            assert_eq!(period(content), "36 mois");
        });
    }

    #[test]
    fn another_marker_before_the_list_leaves_the_field_empty() {
        let body = "<p>OBJECTIFS</p><p>IMPACT attendu</p><ul><li>Impact</li></ul>";
        with_content(body, |content| {
            assert_eq!(
                list_after_marker(content, OBJECTIVES_MARKER, &[IMPACT_MARKER]),
                Walk::Interrupted
            );
            assert_eq!(objectives(content), "");
        });
    }

    #[test]
    fn falls_back_to_defaults_without_markers() {
        let body = "<p>PARTENAIRES : divers</p><p>Premier.</p><p></p><p>Second.</p><p>Troisième.</p>\
                    <p>Financement de 50 000 € sur trois ans</p>";
        with_content(body, |content| {
            assert_eq!(objectives(content), "Premier. Second.");
            assert_eq!(target_audience(content), DEFAULT_TARGET_AUDIENCE);
            assert_eq!(auf_role(content), vec![DEFAULT_AUF_ROLE.to_string()]);
            assert!(operational_partners(content).is_empty());
            assert_eq!(period(content), "");
            let guess = budget(content);
            assert!(guess.contains("50 000 €"), "budget guess was '{guess}'");
            assert!(guess.chars().count() <= BUDGET_WINDOW_LEN);
        });
    }

    #[test]
    fn long_objectives_are_truncated() {
        let long_item = "objectif ".repeat(100);
        let body = format!("<p>OBJECTIFS</p><ul><li>{long_item}</li></ul>");
        with_content(&body, |content| {
            let text = objectives(content);
            assert!(text.ends_with(tools::TRUNCATION_MARKER));
            assert_eq!(
                text.chars().count(),
                tools::MAX_TEXT_LEN + tools::TRUNCATION_MARKER.len()
            );
        });
    }
}
