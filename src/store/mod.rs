// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistence of the scraped records.
//!
//! The ingestion pipeline only ever needs
//! [`Store::exists`], [`Store::insert_batch`] and [`Store::count_all`];
//! the remaining operations serve the read side.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{
    paging::{PageRequest, Paged},
    resource::ResourceType,
    DetailRecord, EntityKind, NaturalKey, Record,
};

pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database access failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Failed to (de-)serialize a stored record: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Corrupt row in the store: {0}")]
    CorruptRow(String),
}

/// Narrows down a listing of stored records.
/// Criteria that do not apply to the listed kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Projects and members in any of these regions
    pub regions: Vec<String>,
    /// The resource container of this type
    pub resource_type: Option<ResourceType>,
    /// Events of this type
    pub event_type: Option<String>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Whether a record of this kind with this natural key is stored already.
    async fn exists(&self, kind: EntityKind, key: &NaturalKey) -> Result<bool, Error>;

    /// Stores all the given records in one transaction.
    ///
    /// Records whose natural key is taken already
    /// (stored before, or earlier in the same batch) are left out.
    ///
    /// Returns the records that were actually stored.
    async fn insert_batch(&self, records: &[DetailRecord]) -> Result<Vec<DetailRecord>, Error>;

    /// Number of stored records of this kind;
    /// for resources, the number of resource sections.
    async fn count_all(&self, kind: EntityKind) -> Result<u64, Error>;

    /// One page of the stored records of a kind, in insertion order.
    /// Resources are listed as their containers.
    async fn list(
        &self,
        kind: EntityKind,
        page: PageRequest,
        filter: &ListFilter,
    ) -> Result<Paged<Record>, Error>;

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Record>, Error>;

    /// Looks up a record by its natural key.
    /// For resources, this yields the container,
    /// holding only the section with that key.
    async fn find(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<Record>, Error>;

    /// Deletes a record together with all its sections.
    ///
    /// Returns whether there was anything to delete.
    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, Error>;
}
