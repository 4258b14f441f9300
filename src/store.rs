//! SQL access layer for contacts and their embedding rows.
//!
//! All statements bind their inputs; nothing from a caller is ever
//! spliced into SQL text. Multi-valued columns are JSON arrays in TEXT
//! columns, timestamps are microseconds since the Unix epoch.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::models::{Contact, ContactPatch};

pub struct ContactStore {
    pool: SqlitePool,
}

const CONTACT_COLUMNS: &str =
    "id, name, title, company, notes, location, email, phone, links, tags, birthdate, created_at, updated_at";

impl ContactStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ============ Contacts ============

    pub async fn insert(&self, contact: &Contact) -> Result<()> {
        bind_contact(
            sqlx::query(&format!(
                "INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            )),
            contact,
        )?
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a batch of contacts in one transaction. Either every row
    /// lands or none do.
    pub async fn insert_batch(&self, contacts: &[Contact]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for contact in contacts {
            bind_contact(
                sqlx::query(&format!(
                    "INSERT INTO contacts ({CONTACT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
                )),
                contact,
            )?
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<Contact>> {
        let row = sqlx::query(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| contact_from_row(&r)).transpose()
    }

    /// Apply a partial update in a single statement. Absent fields keep
    /// their stored values via COALESCE; `updated_at` always advances,
    /// even when two writes land on the same microsecond.
    pub async fn update(
        &self,
        id: &str,
        patch: &ContactPatch,
        now_micros: i64,
    ) -> Result<Option<Contact>> {
        let emails = patch
            .emails
            .as_ref()
            .map(|v| serde_json::to_string(&v.0))
            .transpose()?;
        let phones = patch
            .phones
            .as_ref()
            .map(|v| serde_json::to_string(&v.0))
            .transpose()?;
        let links = patch
            .links
            .as_ref()
            .map(|v| serde_json::to_string(&v.0))
            .transpose()?;
        let tags = patch
            .tags
            .as_ref()
            .map(|v| serde_json::to_string(&v.0))
            .transpose()?;
        let birthdate = patch.birthdate.map(|d| d.format("%Y-%m-%d").to_string());

        let row = sqlx::query(&format!(
            r#"
            UPDATE contacts SET
                name = COALESCE(?, name),
                title = COALESCE(?, title),
                company = COALESCE(?, company),
                notes = COALESCE(?, notes),
                location = COALESCE(?, location),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                links = COALESCE(?, links),
                tags = COALESCE(?, tags),
                birthdate = COALESCE(?, birthdate),
                updated_at = MAX(?, updated_at + 1)
            WHERE id = ?
            RETURNING {CONTACT_COLUMNS}
            "#
        ))
        .bind(patch.name.as_deref())
        .bind(patch.title.as_deref())
        .bind(patch.company.as_deref())
        .bind(patch.notes.as_deref())
        .bind(patch.location.as_deref())
        .bind(emails)
        .bind(phones)
        .bind(links)
        .bind(tags)
        .bind(birthdate)
        .bind(now_micros)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| contact_from_row(&r)).transpose()
    }

    /// Remove a contact. Returns whether a row was actually deleted;
    /// embedding rows go with it via the foreign-key cascade.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of contacts, most recently updated first.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Vec<Contact>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY updated_at DESC, id ASC LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contact_from_row).collect()
    }

    /// Every contact, most recently updated first. Used by the lexical
    /// path, which filters decoded rows in Rust.
    pub async fn fetch_all_ordered(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY updated_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contact_from_row).collect()
    }

    pub async fn count_contacts(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // ============ Embeddings ============

    pub async fn insert_embedding(
        &self,
        contact_id: &str,
        content: &str,
        vector: &[f32],
        now_micros: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contact_embeddings (id, contact_id, content, embedding, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(contact_id)
        .bind(content)
        .bind(vec_to_blob(vector))
        .bind(now_micros)
        .bind(now_micros)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_embeddings_for(&self, contact_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM contact_embeddings WHERE contact_id = ?")
            .bind(contact_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_all_embeddings(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM contact_embeddings")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Every stored vector joined to its owning contact, for the
    /// in-process similarity scan.
    pub async fn embeddings_with_contacts(&self) -> Result<Vec<(Vec<f32>, Contact)>> {
        let rows = sqlx::query(
            r#"
            SELECT e.embedding,
                   c.id, c.name, c.title, c.company, c.notes, c.location,
                   c.email, c.phone, c.links, c.tags, c.birthdate,
                   c.created_at, c.updated_at
            FROM contact_embeddings e
            JOIN contacts c ON c.id = e.contact_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let contact = contact_from_row(row)?;
                Ok((blob_to_vec(&blob), contact))
            })
            .collect()
    }

    /// Contacts with no embedding row, oldest first. Used by the backfill
    /// command.
    pub async fn contacts_missing_embeddings(&self) -> Result<Vec<Contact>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {CONTACT_COLUMNS} FROM contacts c
            WHERE NOT EXISTS (
                SELECT 1 FROM contact_embeddings e WHERE e.contact_id = c.id
            )
            ORDER BY c.updated_at ASC
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(contact_from_row).collect()
    }

    pub async fn count_embeddings(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_embeddings")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn embedding_count_for(&self, contact_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_embeddings WHERE contact_id = ?")
                .bind(contact_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

// ============ Row mapping ============

fn bind_contact<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    contact: &'q Contact,
) -> Result<sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>> {
    Ok(query
        .bind(&contact.id)
        .bind(&contact.name)
        .bind(&contact.title)
        .bind(&contact.company)
        .bind(&contact.notes)
        .bind(&contact.location)
        .bind(serde_json::to_string(&contact.emails)?)
        .bind(serde_json::to_string(&contact.phones)?)
        .bind(serde_json::to_string(&contact.links)?)
        .bind(serde_json::to_string(&contact.tags)?)
        .bind(contact.birthdate.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(contact.created_at.timestamp_micros())
        .bind(contact.updated_at.timestamp_micros()))
}

fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    let created_at: i64 = row.get("created_at");
    let updated_at: i64 = row.get("updated_at");
    let birthdate: Option<String> = row.get("birthdate");

    Ok(Contact {
        id: row.get("id"),
        name: row.get("name"),
        title: row.get("title"),
        company: row.get("company"),
        notes: row.get("notes"),
        location: row.get("location"),
        emails: decode_string_array(row.get("email")),
        phones: decode_string_array(row.get("phone")),
        links: decode_string_array(row.get("links")),
        tags: decode_string_array(row.get("tags")),
        birthdate: birthdate.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        created_at: from_micros(created_at),
        updated_at: from_micros(updated_at),
    })
}

fn decode_string_array(raw: String) -> Vec<String> {
    serde_json::from_str(&raw).unwrap_or_default()
}

fn from_micros(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
