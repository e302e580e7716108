// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::all_with_exact_class;
use crate::{
    extract::{css, first_attr, first_text},
    model::event::{split_date_and_type, Event, EventSection},
    tools,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use uuid::Uuid;

static S_TITLE: LazyLock<Selector> =
    LazyLock::new(|| css("h2.Font-Montserrat.font-weight-bold span.field--name-title"));
static S_DATE_AND_TYPE: LazyLock<Selector> =
    LazyLock::new(|| css("span.date.text-green.font-weight-bold"));
static S_BANNER: LazyLock<Selector> = LazyLock::new(|| css("div.bg-cover.nwsbig"));
static S_HERO_VIDEO: LazyLock<Selector> = LazyLock::new(|| {
    css("section[class*='noneinner'] a[data-fancybox][href*='youtube.com']")
});
static S_CAROUSEL_VIDEO: LazyLock<Selector> = LazyLock::new(|| {
    css("section[class*='abo_franc'] a[data-fancybox][href*='youtube.com']")
});
static S_ITEM: LazyLock<Selector> = LazyLock::new(|| css("div.item"));
static S_PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| css("p"));
static S_HASHTAG: LazyLock<Selector> = LazyLock::new(|| {
    css("div.field--name-field-hashtag-de-l-evenement div.field__item")
});
static S_SECTION_TITLE: LazyLock<Selector> = LazyLock::new(|| css("h6.Libre-bold"));
static S_SECTION_TEXT: LazyLock<Selector> = LazyLock::new(|| css("p.py-4"));
static S_SECTION_LINK: LazyLock<Selector> =
    LazyLock::new(|| css("a.btn.btn-outline-orange.rounded-50"));

static R_BACKGROUND_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"background-image:\s*url\(['"]?([^'")]+)['"]?\)"#).expect("Invalid built-in regex")
});

pub fn parse(document: &Html) -> Option<Event> {
    let root = document.root_element();
    let title = first_text(root, &S_TITLE)?;
    let mut event = Event::new(title);

    if let Some(text) = first_text(root, &S_DATE_AND_TYPE) {
        (event.date, event.event_type) = split_date_and_type(&text);
    }

    event.image_url = first_attr(root, &S_BANNER, "style").and_then(|style| {
        R_BACKGROUND_IMAGE
            .captures(&style)
            .and_then(|caps| caps.get(1))
            .map(|url| url.as_str().trim().to_owned())
    });
    event.video_url = first_attr(root, &S_HERO_VIDEO, "href")
        .or_else(|| first_attr(root, &S_CAROUSEL_VIDEO, "href"));

    let items: Vec<_> = all_with_exact_class(root, &S_ITEM, "item").collect();
    let theme = items
        .first()
        .and_then(|item| first_text(*item, &S_PARAGRAPH))
        .map(|text| tools::truncate_long_text(&text))
        .unwrap_or_default();
    event.description.clone_from(&theme);
    event.theme = theme;
    event.hashtags = first_text(root, &S_HASHTAG).unwrap_or_default();

    event.sections = items
        .into_iter()
        .filter_map(|item| {
            let Some(title) = first_text(item, &S_SECTION_TITLE) else {
                tracing::trace!("Skipping an event section without title");
                return None;
            };
            Some(EventSection {
                id: Uuid::new_v4(),
                title,
                description: first_text(item, &S_SECTION_TEXT)
                    .map(|text| tools::truncate_long_text(&text))
                    .unwrap_or_default(),
                link_url: first_attr(item, &S_SECTION_LINK, "href").unwrap_or_default(),
                link_text: first_text(item, &S_SECTION_LINK).unwrap_or_default(),
            })
        })
        .collect();
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT_PAGE: &str = r#"
<html><body>
<section class="banner noneinner">
  <h2 class="Font-Montserrat font-weight-bold">
    <span class="field field--name-title field--type-string field--label-hidden">Journée internationale de la Francophonie</span>
  </h2>
  <span class="date text-green font-weight-bold">le 20 mars 2025 | Célébration</span>
  <div class="bg-cover rounded nwsbig gradient position-relative" style="background-image: url('/sites/default/files/20mars.jpg');"></div>
  <a data-fancybox href="https://www.youtube.com/watch?v=abc">Vidéo</a>
</section>
<section class="abo_franc">
  <div class="owl-carousel">
    <div class="item">
      <h6 class="Libre-bold">Programme</h6>
      <p class="py-4">Découvrez le programme des célébrations.</p>
      <a class="btn btn-outline-orange rounded-50" href="/programme-20-mars">En savoir plus <i class="fa fa-long-arrow-right pl-2"></i></a>
    </div>
    <div class="item"><p>Sans titre</p></div>
  </div>
</section>
<div class="field field--name-field-hashtag-de-l-evenement field--type-string field--label-visually_hidden">
  <div class="field__item">#20mars</div>
</div>
</body></html>"#;

    #[test]
    fn parses_an_event_page() {
        let event = parse(&Html::parse_document(EVENT_PAGE)).unwrap();
        assert_eq!(event.title, "Journée internationale de la Francophonie");
        assert_eq!(event.date, "20 mars 2025");
        assert_eq!(event.event_type, "Célébration");
        assert_eq!(event.image_url.as_deref(), Some("/sites/default/files/20mars.jpg"));
        assert_eq!(event.video_url.as_deref(), Some("https://www.youtube.com/watch?v=abc"));
        assert_eq!(event.theme, "Découvrez le programme des célébrations.");
        assert_eq!(event.description, event.theme);
        assert_eq!(event.hashtags, "#20mars");
        assert_eq!(event.sections.len(), 1);
        let section = &event.sections[0];
        assert_eq!(section.title, "Programme");
        assert_eq!(section.link_url, "/programme-20-mars");
        assert_eq!(section.link_text, "En savoir plus");
    }

    #[test]
    fn page_of_another_layout_does_not_match() {
        let html = r#"<h1 class="entry-title">Pas un événement</h1>"#;
        assert!(parse(&Html::parse_document(html)).is_none());
    }
}
