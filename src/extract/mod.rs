// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Extraction of preview records from listing pages.
//!
//! Every entity kind has a [`CardTemplate`],
//! describing how to find the repeated "card" fragments of its listing page
//! and how to read each field out of a single card.
//! One generic routine ([`extract_previews`]) applies these templates.
//! A card without its mandatory title is skipped;
//! a missing optional field just stays empty.

pub mod resuff;
mod templates;

use crate::{
    model::{EntityKind, PreviewField, PreviewRecord},
    tools,
};
use scraper::{ElementRef, Html, Selector};
use std::{collections::HashMap, sync::LazyLock};

pub use templates::TEMPLATES;

/// How to read one field out of a card.
#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// The text of the first element matching the selector.
    Text(&'static str),
    /// An attribute of the first element matching the selector.
    Attr(&'static str, &'static str),
    /// The texts of all elements matching the selector, joined with a space.
    JoinedText(&'static str),
    /// The text of the first element matching the selector,
    /// whose own text contains any of the given needles.
    TextContaining(&'static str, &'static [&'static str]),
    /// The text of the last `child` (tag name) directly under any `parent`
    /// that contains an element matching `marker`.
    LastChildOfMarked {
        parent: &'static str,
        marker: &'static str,
        child: &'static str,
    },
}

/// Post-processing applied to an extracted field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    None,
    /// Removes the '+' the region links carry as a decoration.
    StripPlus,
    /// Bounds long free text, see [`tools::truncate_long_text`].
    Truncate,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: PreviewField,
    pub rule: FieldRule,
    pub cleanup: Cleanup,
}

/// Describes the card layout of one listing page template.
#[derive(Debug)]
pub struct CardTemplate {
    pub kind: EntityKind,
    /// Selects the repeated card fragments within the page.
    pub fragment: &'static str,
    /// The mandatory title/name of a card.
    pub title: FieldRule,
    pub fields: &'static [FieldSpec],
}

enum CompiledRule {
    Text(Selector),
    Attr(Selector, &'static str),
    JoinedText(Selector),
    TextContaining(Selector, &'static [&'static str]),
    LastChildOfMarked {
        parent: Selector,
        marker: Selector,
        child: &'static str,
    },
}

struct CompiledTemplate {
    fragment: Selector,
    title: CompiledRule,
    fields: Vec<(PreviewField, CompiledRule, Cleanup)>,
}

/// Parses a CSS selector that is part of this crates source code.
/// A failure is a programming error, covered by the unit tests.
pub(crate) fn css(selector: &str) -> Selector {
    Selector::parse(selector)
        .unwrap_or_else(|err| panic!("Invalid built-in CSS selector '{selector}': {err}"))
}

impl FieldRule {
    fn compile(self) -> CompiledRule {
        match self {
            Self::Text(sel) => CompiledRule::Text(css(sel)),
            Self::Attr(sel, attr) => CompiledRule::Attr(css(sel), attr),
            Self::JoinedText(sel) => CompiledRule::JoinedText(css(sel)),
            Self::TextContaining(sel, needles) => CompiledRule::TextContaining(css(sel), needles),
            Self::LastChildOfMarked {
                parent,
                marker,
                child,
            } => CompiledRule::LastChildOfMarked {
                parent: css(parent),
                marker: css(marker),
                child,
            },
        }
    }
}

impl CardTemplate {
    fn compile(&self) -> CompiledTemplate {
        CompiledTemplate {
            fragment: css(self.fragment),
            title: self.title.compile(),
            fields: self
                .fields
                .iter()
                .map(|field_spec| (field_spec.field, field_spec.rule.compile(), field_spec.cleanup))
                .collect(),
        }
    }
}

static COMPILED: LazyLock<HashMap<EntityKind, CompiledTemplate>> = LazyLock::new(|| {
    TEMPLATES
        .iter()
        .map(|template| (template.kind, template.compile()))
        .collect()
});

/// The whole text of an element, white-space normalized.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    tools::normalize_text(&element.text().collect::<String>())
}

/// Only the text nodes directly under `element`, white-space normalized.
#[must_use]
pub fn own_text(element: ElementRef<'_>) -> String {
    let own: String = element
        .children()
        .filter_map(|child| child.value().as_text().map(|text| text.to_string()))
        .collect();
    tools::normalize_text(&own)
}

/// The text of the first match of `selector` within `scope`,
/// if there is one and it is not empty.
#[must_use]
pub fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

/// An attribute of the first match of `selector` within `scope`.
#[must_use]
pub fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl CompiledRule {
    fn apply(&self, card: ElementRef<'_>) -> Option<String> {
        match self {
            Self::Text(sel) => first_text(card, sel),
            Self::Attr(sel, attr) => first_attr(card, sel, attr),
            Self::JoinedText(sel) => {
                let joined = card
                    .select(sel)
                    .map(element_text)
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                Some(joined).filter(|text| !text.is_empty())
            }
            Self::TextContaining(sel, needles) => card
                .select(sel)
                .find(|element| {
                    let own = element
                        .children()
                        .filter_map(|child| child.value().as_text().map(|text| text.to_string()))
                        .collect::<String>();
                    needles.iter().any(|needle| own.contains(needle))
                })
                .map(element_text)
                .filter(|text| !text.is_empty()),
            Self::LastChildOfMarked {
                parent,
                marker,
                child,
            } => card
                .select(parent)
                .filter(|candidate| candidate.select(marker).next().is_some())
                .flat_map(|candidate| {
                    candidate
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|element| element.value().name() == *child)
                })
                .last()
                .map(element_text)
                .filter(|text| !text.is_empty()),
        }
    }
}

fn clean(value: String, cleanup: Cleanup) -> String {
    match cleanup {
        Cleanup::None => value,
        Cleanup::StripPlus => value.replace('+', "").trim().to_owned(),
        Cleanup::Truncate => tools::truncate_long_text(&value),
    }
}

impl CompiledTemplate {
    fn extract(&self, kind: EntityKind, card: ElementRef<'_>) -> Option<PreviewRecord> {
        let Some(title) = self.title.apply(card) else {
            tracing::trace!("Skipping a {kind} card without title");
            return None;
        };
        let mut preview = PreviewRecord::new(kind, title);
        for (field, rule, cleanup) in &self.fields {
            match rule.apply(card) {
                Some(value) => preview.set(*field, clean(value, *cleanup)),
                None => tracing::trace!("{kind} card '{}' lacks {field}", preview.title),
            }
        }
        Some(preview)
    }
}

/// Extracts all the preview records of the given kind
/// from a parsed listing page.
///
/// Never fails: cards that do not match the template are skipped,
/// and a page that does not match at all yields an empty list.
#[must_use]
pub fn extract_previews(document: &Html, kind: EntityKind) -> Vec<PreviewRecord> {
    let Some(template) = COMPILED.get(&kind) else {
        tracing::debug!("No card template for {kind}");
        return Vec::new();
    };
    let mut cards = 0_usize;
    let previews: Vec<_> = document
        .select(&template.fragment)
        .inspect(|_| cards += 1)
        .filter_map(|card| template.extract(kind, card))
        .collect();
    if previews.len() < cards {
        tracing::debug!(
            "Extracted {} of {cards} {kind} cards; the rest did not match the template",
            previews.len()
        );
    }
    previews
}

/// Parses (leniently) and extracts in one go.
#[must_use]
pub fn extract_previews_from_html(html: &str, kind: EntityKind) -> Vec<PreviewRecord> {
    extract_previews(&Html::parse_document(html), kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    const PROJECTS_PAGE: &str = r##"
<html><body>
<section class="section">
  <div class="teaser main-teaser has-thumb clearfix">
    <a href="/nos-actions/campus-numerique/"><img src="/img/campus.jpg"></a>
    <h3 class="title">Campus numérique</h3>
    <div class="regions"><a class="lnk-region" href="#">+ Afrique de l'Ouest</a></div>
    <div class="text">Former les formateurs.</div>
  </div>
  <div class="teaser main-teaser has-thumb clearfix">
    <a href="nos-actions/sans-image/">lien</a>
    <h3 class="title">  Projet
       sans image </h3>
  </div>
  <div class="teaser main-teaser has-thumb clearfix">
    <a href="/nos-actions/orphelin/">lien</a>
    <div class="text">Carte cassée, sans titre</div>
  </div>
  <div class="teaser main-teaser has-thumb clearfix">
    <h3 class="title">Projet sans lien</h3>
  </div>
</section>
</body></html>
"##;

    #[test]
    fn all_builtin_templates_compile() {
        for kind in EntityKind::iter() {
            assert!(COMPILED.contains_key(&kind), "missing template for {kind}");
        }
    }

    #[test]
    fn extracts_every_well_formed_card_and_skips_untitled_ones() {
        let previews = extract_previews_from_html(PROJECTS_PAGE, EntityKind::Project);
        assert_eq!(previews.len(), 3);
        assert!(previews.iter().all(|preview| !preview.title.is_empty()));

        let first = &previews[0];
        assert_eq!(first.title, "Campus numérique");
        assert_eq!(first.link, "/nos-actions/campus-numerique/");
        assert_eq!(first.region, "Afrique de l'Ouest");
        assert_eq!(first.description, "Former les formateurs.");
        assert_eq!(first.image_url.as_deref(), Some("/img/campus.jpg"));

        let second = &previews[1];
        assert_eq!(second.title, "Projet sans image");
        assert_eq!(second.link, "nos-actions/sans-image/");
        assert_eq!(second.region, "");
        assert_eq!(second.image_url, None);

        assert_eq!(previews[2].link, "");
    }

    #[test]
    fn page_of_another_template_yields_nothing() {
        assert!(extract_previews_from_html(PROJECTS_PAGE, EntityKind::Member).is_empty());
        assert!(extract_previews_from_html("<p>Maintenance", EntityKind::Project).is_empty());
    }

    #[test]
    fn extracts_members() {
        let html = r#"
<section class="section section-members">
  <div class="teaser member-teaser clearfix">
    <h3 class="title">Université de Yaoundé I</h3>
    <span class="address">BP 337, Yaoundé, Cameroun</span>
    <div class="regions"><a class="lnk-region">+ Afrique centrale et des Grands Lacs</a></div>
    <a class="lnk-more" href="/membres/universite-de-yaounde-i/">En savoir plus</a>
  </div>
</section>"#;
        let previews = extract_previews_from_html(html, EntityKind::Member);
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].address, "BP 337, Yaoundé, Cameroun");
        assert_eq!(previews[0].region, "Afrique centrale et des Grands Lacs");
        assert_eq!(previews[0].link, "/membres/universite-de-yaounde-i/");
    }

    #[test]
    fn extracts_partners_from_captions() {
        let html = r#"
<div class="entry-content clearfix">
  <div id="attachment_1" class="wp-caption aligncenter">
    <a href="https://www.unesco.org"><img src="/logos/unesco.png" alt="Organisation des Nations unies"></a>
    <p class="wp-caption-text">UNESCO</p>
  </div>
  <div class="wp-caption"><img src="/logos/anonyme.png"></div>
</div>"#;
        let previews = extract_previews_from_html(html, EntityKind::Partner);
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].title, "UNESCO");
        assert_eq!(previews[0].link, "https://www.unesco.org");
        assert_eq!(previews[0].description, "Organisation des Nations unies");
    }

    #[test]
    fn extracts_events_with_date_and_city() {
        let html = r#"
<div id="lightgallery">
  <div class="col-md-4 portfolio-item">
    <a href="/sommet-2024">
      <h1 class="Libre-bold text-white pt-2">XIXe Sommet de la Francophonie</h1>
      <span class="small">du 4 au 5 octobre 2024</span>
      <p><img src="/themes/francophonie/images/map-marker.png"><span>France</span> <span>Villers-Cotterêts</span></p>
    </a>
  </div>
  <div class="portfolio-item"><span>le 1er mars</span></div>
</div>"#;
        let previews = extract_previews_from_html(html, EntityKind::Event);
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].date, "du 4 au 5 octobre 2024");
        assert_eq!(previews[0].city, "Villers-Cotterêts");
        assert_eq!(previews[0].link, "/sommet-2024");
    }

    #[test]
    fn resource_description_is_joined_and_bounded() {
        let long = "mot ".repeat(200);
        let html = format!(
            r#"<section class="section section-default"><div class="entry-content clearfix">
<h2>Bourses de mobilité</h2><p>Premier paragraphe.</p><p></p><p>{long}</p>
<a href="/ressources-et-services/bourses/mobilite/">Lire</a></div></section>"#
        );
        let previews = extract_previews_from_html(&html, EntityKind::Resource);
        assert_eq!(previews.len(), 1);
        let description = &previews[0].description;
        assert!(description.starts_with("Premier paragraphe. mot mot"));
        assert!(description.ends_with(tools::TRUNCATION_MARKER));
        assert_eq!(
            description.chars().count(),
            tools::MAX_TEXT_LEN + tools::TRUNCATION_MARKER.len()
        );
    }
}
