// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod event;
pub mod key;
pub mod kind;
pub mod member;
pub mod paging;
pub mod partner;
pub mod preview;
pub mod project;
pub mod record;
pub mod resource;

pub use key::NaturalKey;
pub use kind::EntityKind;
pub use preview::{PreviewField, PreviewRecord};
pub use record::{DetailRecord, Record};
