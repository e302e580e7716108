// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{CardTemplate, Cleanup, FieldRule, FieldSpec};
use crate::model::{EntityKind, PreviewField};

const LINK: FieldSpec = FieldSpec {
    field: PreviewField::Link,
    rule: FieldRule::Attr("a[href]", "href"),
    cleanup: Cleanup::None,
};

const IMAGE: FieldSpec = FieldSpec {
    field: PreviewField::ImageUrl,
    rule: FieldRule::Attr("img", "src"),
    cleanup: Cleanup::None,
};

const REGION: FieldSpec = FieldSpec {
    field: PreviewField::Region,
    rule: FieldRule::Text("div.regions a.lnk-region"),
    cleanup: Cleanup::StripPlus,
};

/// The card layouts of the listing pages of all entity kinds.
pub static TEMPLATES: &[CardTemplate] = &[
    CardTemplate {
        kind: EntityKind::Project,
        fragment: "section.section div.teaser.main-teaser.has-thumb",
        title: FieldRule::Text("h3.title"),
        fields: &[
            LINK,
            REGION,
            FieldSpec {
                field: PreviewField::Description,
                rule: FieldRule::Text("div.text"),
                cleanup: Cleanup::Truncate,
            },
            IMAGE,
        ],
    },
    CardTemplate {
        kind: EntityKind::Member,
        fragment: "section.section.section-members div.teaser.member-teaser",
        title: FieldRule::Text("h3.title"),
        fields: &[
            FieldSpec {
                field: PreviewField::Link,
                rule: FieldRule::Attr("a.lnk-more", "href"),
                cleanup: Cleanup::None,
            },
            FieldSpec {
                field: PreviewField::Address,
                rule: FieldRule::Text("span.address"),
                cleanup: Cleanup::None,
            },
            REGION,
        ],
    },
    CardTemplate {
        kind: EntityKind::Partner,
        fragment: "div.entry-content div.wp-caption",
        title: FieldRule::Text("p.wp-caption-text"),
        fields: &[
            LINK,
            IMAGE,
            FieldSpec {
                field: PreviewField::Description,
                rule: FieldRule::Attr("img", "alt"),
                cleanup: Cleanup::None,
            },
        ],
    },
    CardTemplate {
        kind: EntityKind::Event,
        fragment: "div#lightgallery div.portfolio-item",
        title: FieldRule::Text("h1.Libre-bold"),
        fields: &[
            FieldSpec {
                field: PreviewField::Date,
                rule: FieldRule::TextContaining("span", &["du ", "le "]),
                cleanup: Cleanup::None,
            },
            FieldSpec {
                field: PreviewField::City,
                rule: FieldRule::LastChildOfMarked {
                    parent: "p",
                    marker: "img[src$='map-marker.png']",
                    child: "span",
                },
                cleanup: Cleanup::None,
            },
            LINK,
            IMAGE,
        ],
    },
    CardTemplate {
        kind: EntityKind::Resource,
        fragment: "section.section.section-default div.entry-content.clearfix",
        title: FieldRule::Text("h2"),
        fields: &[
            FieldSpec {
                field: PreviewField::Description,
                rule: FieldRule::JoinedText("p"),
                cleanup: Cleanup::Truncate,
            },
            LINK,
            IMAGE,
        ],
    },
];
