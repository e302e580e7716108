// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{region_tag, with_exact_class};
use crate::{
    extract::{css, element_text, first_attr, first_text},
    model::member::Member,
    tools,
};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static S_TITLE: LazyLock<Selector> = LazyLock::new(|| css("h1.entry-title"));
static S_CONTENT: LazyLock<Selector> = LazyLock::new(|| css("div.entry-content"));
static S_HISTORY: LazyLock<Selector> = LazyLock::new(|| css("div.entry-content.entry-history"));
static S_PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| css("p"));
static S_CONTACTS: LazyLock<Selector> = LazyLock::new(|| css("div.block.block-contacts"));
static S_CONTACT_NAME_BLOCK: LazyLock<Selector> = LazyLock::new(|| css("div.name"));
static S_STRONG: LazyLock<Selector> = LazyLock::new(|| css("strong"));
static S_OCCUPATION: LazyLock<Selector> = LazyLock::new(|| css("div.occupation"));
static S_STATUS: LazyLock<Selector> = LazyLock::new(|| css("div.status"));
static S_ADDRESS: LazyLock<Selector> = LazyLock::new(|| css("address.address"));
static S_PHONE: LazyLock<Selector> = LazyLock::new(|| css("div.tel"));
static S_WEBSITE: LazyLock<Selector> = LazyLock::new(|| css("div.website a"));

static R_STATUTORY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Type statutaire\s*:\s*([^\r\n]+?)\s*(?:Type universitaire|$)")
        .expect("Invalid built-in regex")
});
static R_UNIVERSITY_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Type universitaire\s*:\s*([^\r\n]+?)\s*(?:Type statutaire|$)")
        .expect("Invalid built-in regex")
});
static R_FOUNDED_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fond[ée]e? en (\d{4})").expect("Invalid built-in regex")
});

const PHONE_LABEL: &str = "Téléphone :";
const REGION_PREFIX: &str = "AUF - ";

fn capture(regex: &Regex, text: &str) -> String {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().trim().to_owned())
        .unwrap_or_default()
}

pub fn parse(document: &Html) -> Option<Member> {
    let root = document.root_element();
    let name = first_text(root, &S_TITLE)?;
    let mut member = Member::new(name);

    if let Some(content) = with_exact_class(root, &S_CONTENT, "entry-content") {
        member.description =
            tools::truncate_long_text(&first_text(content, &S_PARAGRAPH).unwrap_or_default());
    }
    if let Some(history) = root.select(&S_HISTORY).next() {
        member.background =
            tools::truncate_long_text(&first_text(history, &S_PARAGRAPH).unwrap_or_default());
        member.founded_year = capture(&R_FOUNDED_YEAR, &member.background);
    }

    if let Some(contacts) = root.select(&S_CONTACTS).next() {
        member.contact_name = contacts
            .select(&S_CONTACT_NAME_BLOCK)
            .nth(1)
            .and_then(|block| first_text(block, &S_STRONG))
            .unwrap_or_default();
        member.contact_title = first_text(contacts, &S_OCCUPATION).unwrap_or_default();
        if let Some(status) = contacts.select(&S_STATUS).next() {
            let status_text = element_text(status);
            member.statutory_type = capture(&R_STATUTORY_TYPE, &status_text);
            member.university_type = capture(&R_UNIVERSITY_TYPE, &status_text);
        }
        member.address = first_text(contacts, &S_ADDRESS).unwrap_or_default();
        member.phone = first_text(contacts, &S_PHONE)
            .map(|phone| phone.replace(PHONE_LABEL, "").trim().to_owned())
            .unwrap_or_default();
        member.website = first_attr(contacts, &S_WEBSITE, "href").unwrap_or_default();
    } else {
        tracing::debug!("Member page '{}' has no contacts block", member.name);
    }

    member.region = region_tag(root).replace(REGION_PREFIX, "").trim().to_owned();
    Some(member)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER_PAGE: &str = r#"
<html><body>
<h1 class="entry-title">Université Cheikh Anta Diop</h1>
<div class="entry-content"><p>Première université du Sénégal.</p><p>Autre.</p></div>
<div class="entry-content entry-history"><p>Fondée en 1957, l'université accueille 80 000 étudiants.</p></div>
<div class="block block-contacts">
  <div class="name">Responsable</div>
  <div class="name"><strong>Pr Ahmadou Aly Mbaye</strong></div>
  <div class="occupation">Recteur</div>
  <div class="status">
    Type statutaire : Établissement public
    Type universitaire : Université
  </div>
  <address class="address">BP 5005, Dakar-Fann</address>
  <div class="tel">Téléphone : +221 33 825 05 30</div>
  <div class="website"><a href="https://www.ucad.sn">ucad.sn</a></div>
</div>
<div class="block block-tags"><a class="lnk-region">+ AUF - Afrique de l'Ouest</a></div>
</body></html>"#;

    #[test]
    fn parses_a_member_page() {
        let member = parse(&Html::parse_document(MEMBER_PAGE)).unwrap();
        assert_eq!(member.name, "Université Cheikh Anta Diop");
        assert_eq!(member.description, "Première université du Sénégal.");
        assert_eq!(member.founded_year, "1957");
        assert_eq!(member.contact_name, "Pr Ahmadou Aly Mbaye");
        assert_eq!(member.contact_title, "Recteur");
        assert_eq!(member.statutory_type, "Établissement public");
        assert_eq!(member.university_type, "Université");
        assert_eq!(member.address, "BP 5005, Dakar-Fann");
        assert_eq!(member.phone, "+221 33 825 05 30");
        assert_eq!(member.website, "https://www.ucad.sn");
        assert_eq!(member.region, "Afrique de l'Ouest");
    }

    #[test]
    fn description_is_not_taken_from_the_history_block() {
        let html = r#"<h1 class="entry-title">Institut X</h1>
<div class="entry-content entry-history"><p>Fondé en 1990.</p></div>"#;
        let member = parse(&Html::parse_document(html)).unwrap();
        assert_eq!(member.description, "");
        assert_eq!(member.background, "Fondé en 1990.");
        assert_eq!(member.founded_year, "1990");
        assert_eq!(member.contact_name, "");
    }
}
