// SPDX-FileCopyrightText: 2025 AUF Connect contributors
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! [`Store`] on top of an `SQLite` database.
//!
//! All kinds share the `records` table,
//! with the entity itself serialized as JSON into the `data` column.
//! Sections live in tables of their own,
//! referencing their parent with `ON DELETE CASCADE`.
//! Resource sections are grouped into one container per resource type,
//! which is what the `records` table holds for resources.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool,
};
use tracing::instrument;
use uuid::Uuid;

use super::{Error, ListFilter, Store};
use crate::model::{
    event::{Event, EventSection},
    paging::{PageRequest, Paged},
    resource::{Resource, ResourceEntry, ResourceSection, ResourceType},
    DetailRecord, EntityKind, NaturalKey, Record,
};

pub const MEMORY_URL: &str = "sqlite::memory:";
const MAX_CONNECTIONS: u32 = 4;

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS records (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        natural_key TEXT NOT NULL,
        region TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL DEFAULT '',
        data TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (kind, natural_key)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS event_sections (
        id TEXT PRIMARY KEY,
        event_id TEXT NOT NULL REFERENCES records (id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        data TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS resource_sections (
        id TEXT PRIMARY KEY,
        resource_id TEXT NOT NULL REFERENCES records (id) ON DELETE CASCADE,
        natural_key TEXT NOT NULL UNIQUE,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_records_kind_region ON records (kind, region)",
    "CREATE INDEX IF NOT EXISTS idx_records_kind_category ON records (kind, category)",
    "CREATE INDEX IF NOT EXISTS idx_event_sections_event_id ON event_sections (event_id)",
    "CREATE INDEX IF NOT EXISTS idx_resource_sections_resource_id ON resource_sections (resource_id)",
];

const INSERT_RECORD: &str = r"
    INSERT INTO records (id, kind, natural_key, region, category, data, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT (kind, natural_key) DO NOTHING
";

const RECORD_COLUMNS: &str = "id, category, data";

pub struct SqliteStore {
    pool: SqlitePool,
}

/// The column used to filter by type.
fn category(record: &DetailRecord) -> &str {
    match record {
        DetailRecord::Event(event) => &event.event_type,
        DetailRecord::Resource(entry) => entry.resource_type.as_str(),
        DetailRecord::Project(_) | DetailRecord::Member(_) | DetailRecord::Partner(_) => "",
    }
}

/// The JSON stored in the `data` column;
/// sections are stored separately.
fn entity_json(record: &DetailRecord) -> Result<String, Error> {
    Ok(match record {
        DetailRecord::Project(project) => serde_json::to_string(project)?,
        DetailRecord::Member(member) => serde_json::to_string(member)?,
        DetailRecord::Partner(partner) => serde_json::to_string(partner)?,
        DetailRecord::Event(event) => {
            let mut bare = event.clone();
            bare.sections.clear();
            serde_json::to_string(&bare)?
        }
        DetailRecord::Resource(entry) => serde_json::to_string(&entry.section)?,
    })
}

fn position(index: usize) -> i64 {
    i64::try_from(index).unwrap_or(i64::MAX)
}

fn container(row: &SqliteRow, sections: Vec<ResourceSection>) -> Result<Resource, Error> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;
    Ok(Resource {
        id: Uuid::parse_str(&id)
            .map_err(|err| Error::CorruptRow(format!("Invalid resource ID '{id}': {err}")))?,
        resource_type: ResourceType::from_str(&category).map_err(|err| {
            Error::CorruptRow(format!("Invalid type '{category}' of resource {id}: {err}"))
        })?,
        sections,
    })
}

/// Returns the ID of the container of all resources of this type,
/// creating it if necessary.
async fn ensure_container(
    conn: &mut SqliteConnection,
    resource_type: ResourceType,
    created_at: &str,
) -> Result<String, Error> {
    let existing: Option<String> =
        sqlx::query_scalar("SELECT id FROM records WHERE kind = ? AND natural_key = ?")
            .bind(EntityKind::Resource.as_str())
            .bind(resource_type.as_str())
            .fetch_optional(&mut *conn)
            .await?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let container = Resource {
        id: Uuid::new_v4(),
        resource_type,
        sections: Vec::new(),
    };
    let id = container.id.to_string();
    sqlx::query(INSERT_RECORD)
        .bind(&id)
        .bind(EntityKind::Resource.as_str())
        .bind(resource_type.as_str())
        .bind("")
        .bind(resource_type.as_str())
        .bind(serde_json::to_string(&container)?)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    tracing::debug!("Created the container of the {resource_type} resources");
    Ok(id)
}

async fn insert_resource_section(
    conn: &mut SqliteConnection,
    entry: &ResourceEntry,
    key: &str,
    created_at: &str,
) -> Result<bool, Error> {
    let container_id = ensure_container(conn, entry.resource_type, created_at).await?;
    let result = sqlx::query(
        r"
        INSERT INTO resource_sections (id, resource_id, natural_key, data, created_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT (natural_key) DO NOTHING
        ",
    )
    .bind(entry.section.id.to_string())
    .bind(container_id)
    .bind(key)
    .bind(serde_json::to_string(&entry.section)?)
    .bind(created_at)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Inserts a single record, unless its natural key is taken.
async fn insert_one(
    conn: &mut SqliteConnection,
    record: &DetailRecord,
    created_at: &str,
) -> Result<bool, Error> {
    let key = record.natural_key().storage_key();
    if let DetailRecord::Resource(entry) = record {
        return insert_resource_section(conn, entry, &key, created_at).await;
    }

    let id = record.id().to_string();
    let result = sqlx::query(INSERT_RECORD)
        .bind(&id)
        .bind(record.kind().as_str())
        .bind(&key)
        .bind(record.region())
        .bind(category(record))
        .bind(entity_json(record)?)
        .bind(created_at)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(false);
    }

    if let DetailRecord::Event(event) = record {
        for (index, section) in event.sections.iter().enumerate() {
            sqlx::query(
                "INSERT INTO event_sections (id, event_id, position, data) VALUES (?, ?, ?, ?)",
            )
            .bind(section.id.to_string())
            .bind(&id)
            .bind(position(index))
            .bind(serde_json::to_string(section)?)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(true)
}

/// `SELECT <columns> FROM records`, narrowed down to a kind and a filter.
fn filtered_query(
    columns: &str,
    kind: EntityKind,
    filter: &ListFilter,
) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(format!("SELECT {columns} FROM records WHERE kind = "));
    builder.push_bind(kind.as_str());
    match kind {
        EntityKind::Project | EntityKind::Member => {
            if !filter.regions.is_empty() {
                builder.push(" AND region IN (");
                let mut regions = builder.separated(", ");
                for region in &filter.regions {
                    regions.push_bind(region.clone());
                }
                regions.push_unseparated(")");
            }
        }
        EntityKind::Event => {
            if let Some(event_type) = &filter.event_type {
                builder.push(" AND category = ").push_bind(event_type.clone());
            }
        }
        EntityKind::Resource => {
            if let Some(resource_type) = filter.resource_type {
                builder
                    .push(" AND category = ")
                    .push_bind(resource_type.as_str());
            }
        }
        EntityKind::Partner => {}
    }
    builder
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and ensures its schema.
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Every connection to an in-memory database sees a database of its own.
        let max_connections = if url == MEMORY_URL { 1 } else { MAX_CONNECTIONS };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// A fresh, empty database that lives only as long as the store.
    pub async fn in_memory() -> Result<Self, Error> {
        Self::connect(MEMORY_URL).await
    }

    async fn migrate(&self) -> Result<(), Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::debug!("Database schema is in place");
        Ok(())
    }

    async fn event_sections(&self, event_id: &str) -> Result<Vec<EventSection>, Error> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT data FROM event_sections WHERE event_id = ? ORDER BY position",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(Error::from))
            .collect()
    }

    async fn resource_sections(&self, resource_id: &str) -> Result<Vec<ResourceSection>, Error> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT data FROM resource_sections WHERE resource_id = ? ORDER BY rowid",
        )
        .bind(resource_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|data| serde_json::from_str(data).map_err(Error::from))
            .collect()
    }

    async fn decode(&self, kind: EntityKind, row: &SqliteRow) -> Result<Record, Error> {
        let id: String = row.try_get("id")?;
        let data: String = row.try_get("data")?;
        Ok(match kind {
            EntityKind::Project => Record::Project(serde_json::from_str(&data)?),
            EntityKind::Member => Record::Member(serde_json::from_str(&data)?),
            EntityKind::Partner => Record::Partner(serde_json::from_str(&data)?),
            EntityKind::Event => {
                let mut event: Event = serde_json::from_str(&data)?;
                event.sections = self.event_sections(&id).await?;
                Record::Event(event)
            }
            EntityKind::Resource => {
                let sections = self.resource_sections(&id).await?;
                Record::Resource(container(row, sections)?)
            }
        })
    }

    async fn find_resource_section(&self, key: &str) -> Result<Option<Record>, Error> {
        let section_row = sqlx::query(
            "SELECT resource_id, data FROM resource_sections WHERE natural_key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        let Some(section_row) = section_row else {
            return Ok(None);
        };
        let resource_id: String = section_row.try_get("resource_id")?;
        let data: String = section_row.try_get("data")?;
        let section: ResourceSection = serde_json::from_str(&data)?;

        let container_row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE id = ?"
        ))
        .bind(&resource_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            Error::CorruptRow(format!(
                "Resource section '{key}' refers to missing container {resource_id}"
            ))
        })?;
        Ok(Some(Record::Resource(container(
            &container_row,
            vec![section],
        )?)))
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn exists(&self, kind: EntityKind, key: &NaturalKey) -> Result<bool, Error> {
        let found: Option<i64> = match kind {
            EntityKind::Resource => {
                sqlx::query_scalar("SELECT 1 FROM resource_sections WHERE natural_key = ?")
                    .bind(key.storage_key())
                    .fetch_optional(&self.pool)
                    .await?
            }
            EntityKind::Project | EntityKind::Member | EntityKind::Partner | EntityKind::Event => {
                sqlx::query_scalar("SELECT 1 FROM records WHERE kind = ? AND natural_key = ?")
                    .bind(kind.as_str())
                    .bind(key.storage_key())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(found.is_some())
    }

    #[instrument(skip_all, fields(records = records.len()))]
    async fn insert_batch(&self, records: &[DetailRecord]) -> Result<Vec<DetailRecord>, Error> {
        let created_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(records.len());
        for record in records {
            if insert_one(&mut tx, record, &created_at).await? {
                inserted.push(record.clone());
            } else {
                tracing::debug!(
                    "Not storing the {} with {}; it is stored already",
                    record.kind(),
                    record.natural_key()
                );
            }
        }
        tx.commit().await?;
        tracing::debug!("Stored {} records", inserted.len());
        Ok(inserted)
    }

    async fn count_all(&self, kind: EntityKind) -> Result<u64, Error> {
        let count: i64 = match kind {
            EntityKind::Resource => {
                sqlx::query_scalar("SELECT COUNT(*) FROM resource_sections")
                    .fetch_one(&self.pool)
                    .await?
            }
            EntityKind::Project | EntityKind::Member | EntityKind::Partner | EntityKind::Event => {
                sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE kind = ?")
                    .bind(kind.as_str())
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn list(
        &self,
        kind: EntityKind,
        requested: PageRequest,
        filter: &ListFilter,
    ) -> Result<Paged<Record>, Error> {
        let page = requested.normalized();

        let total_count: i64 = filtered_query("COUNT(*)", kind, filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = filtered_query(RECORD_COLUMNS, kind, filter);
        query
            .push(" ORDER BY rowid LIMIT ")
            .push_bind(i64::from(page.page_size))
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));
        let rows = query.build().fetch_all(&self.pool).await?;

        let mut data = Vec::with_capacity(rows.len());
        for row in &rows {
            data.push(self.decode(kind, row).await?);
        }
        Ok(Paged {
            data,
            page_number: page.page_number,
            page_size: page.page_size,
            total_count: u64::try_from(total_count).unwrap_or_default(),
        })
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Option<Record>, Error> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE kind = ? AND id = ?"
        ))
        .bind(kind.as_str())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.decode(kind, &row).await?)),
            None => Ok(None),
        }
    }

    async fn find(&self, kind: EntityKind, key: &NaturalKey) -> Result<Option<Record>, Error> {
        if kind == EntityKind::Resource {
            return self.find_resource_section(&key.storage_key()).await;
        }
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM records WHERE kind = ? AND natural_key = ?"
        ))
        .bind(kind.as_str())
        .bind(key.storage_key())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.decode(kind, &row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, kind: EntityKind, id: Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM records WHERE kind = ? AND id = ?")
            .bind(kind.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
