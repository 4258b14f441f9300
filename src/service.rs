//! Contact service: CRUD, bulk operations, and the embedding lifecycle.
//!
//! The service owns validation, identity and timestamp assignment, and
//! the hooks that keep embedding rows in step with contact mutations.
//! Provider failures inside those hooks are logged and swallowed — a
//! contact write never fails because the embedding provider did.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::models::{
    BulkDeleteReport, BulkError, BulkWriteReport, Contact, ContactDraft, ContactPatch,
    ContactPatchEntry, ListParams,
};
use crate::search;
use crate::store::ContactStore;

pub struct ContactService {
    store: ContactStore,
    config: Config,
}

impl ContactService {
    pub fn new(store: ContactStore, config: Config) -> Self {
        Self { store, config }
    }

    /// Connect to the configured database and build a service around it.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        Ok(Self::new(ContactStore::new(pool), config.clone()))
    }

    pub fn store(&self) -> &ContactStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ============ CRUD ============

    /// Persist a new contact and attempt to embed it.
    ///
    /// The embedding row is created only after the contact row is durable,
    /// and its failure leaves the contact in place (it falls back to
    /// lexical-only search until the next update).
    pub async fn create(&self, draft: ContactDraft) -> Result<Contact> {
        if draft.name.trim().is_empty() {
            bail!("name must not be empty");
        }

        let now = now_at_storage_precision();
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            name: draft.name,
            title: draft.title,
            company: draft.company,
            notes: draft.notes,
            location: draft.location,
            emails: draft.emails.into_vec(),
            phones: draft.phones.into_vec(),
            links: draft.links.into_vec(),
            tags: draft.tags.into_vec(),
            birthdate: draft.birthdate,
            created_at: now,
            updated_at: now,
        };

        self.store.insert(&contact).await?;

        if self.config.embedding.is_enabled() {
            self.refresh_embedding(&contact, false).await;
        }

        Ok(contact)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Contact>> {
        self.store.get(id).await
    }

    /// Apply a partial update. Returns `None` when no row matched.
    ///
    /// On success the embedding is rebuilt from the updated record:
    /// existing rows are deleted first, then one fresh row is inserted.
    pub async fn update(&self, id: &str, patch: ContactPatch) -> Result<Option<Contact>> {
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                bail!("name must not be empty");
            }
        }

        let now_micros = Utc::now().timestamp_micros();
        let updated = self.store.update(id, &patch, now_micros).await?;

        if let Some(contact) = &updated {
            if self.config.embedding.is_enabled() {
                self.refresh_embedding(contact, true).await;
            }
        }

        Ok(updated)
    }

    /// Remove a contact. Idempotent: the first call on an existing id
    /// returns true, later calls return false. Embedding rows are removed
    /// by the foreign-key cascade.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.store.delete(id).await
    }

    pub async fn list(&self, params: ListParams) -> Result<Vec<Contact>> {
        search::list_contacts(&self.store, &self.config, params).await
    }

    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Contact>> {
        search::search_contacts(&self.store, &self.config, query).await
    }

    // ============ Bulk operations ============

    /// Insert a batch of contacts in one transaction.
    ///
    /// A failure anywhere rolls the whole batch back and is reported as a
    /// single error entry. Embedding generation runs afterwards, one task
    /// per contact, all-settled: any one failure is logged without
    /// touching the batch result or the other contacts' embeddings.
    pub async fn bulk_create(&self, drafts: Vec<ContactDraft>) -> Result<BulkWriteReport> {
        for (index, draft) in drafts.iter().enumerate() {
            if draft.name.trim().is_empty() {
                return Ok(BulkWriteReport {
                    processed_count: 0,
                    contacts: Vec::new(),
                    errors: vec![BulkError {
                        index,
                        message: "name must not be empty".to_string(),
                    }],
                });
            }
        }

        let now = now_at_storage_precision();
        let contacts: Vec<Contact> = drafts
            .into_iter()
            .map(|draft| Contact {
                id: Uuid::new_v4().to_string(),
                name: draft.name,
                title: draft.title,
                company: draft.company,
                notes: draft.notes,
                location: draft.location,
                emails: draft.emails.into_vec(),
                phones: draft.phones.into_vec(),
                links: draft.links.into_vec(),
                tags: draft.tags.into_vec(),
                birthdate: draft.birthdate,
                created_at: now,
                updated_at: now,
            })
            .collect();

        if let Err(e) = self.store.insert_batch(&contacts).await {
            return Ok(BulkWriteReport {
                processed_count: 0,
                contacts: Vec::new(),
                errors: vec![BulkError {
                    index: 0,
                    message: format!("batch insert failed: {}", e),
                }],
            });
        }

        if self.config.embedding.is_enabled() {
            self.embed_batch(&contacts).await;
        }

        Ok(BulkWriteReport {
            processed_count: contacts.len(),
            contacts,
            errors: Vec::new(),
        })
    }

    /// Update entries one at a time, in order, so every error can be
    /// attributed to a stable position in the input.
    pub async fn bulk_update(&self, entries: Vec<ContactPatchEntry>) -> Result<BulkWriteReport> {
        let mut contacts = Vec::new();
        let mut errors = Vec::new();

        for (index, entry) in entries.into_iter().enumerate() {
            match self.update(&entry.id, entry.patch).await {
                Ok(Some(contact)) => contacts.push(contact),
                Ok(None) => errors.push(BulkError {
                    index,
                    message: format!("contact not found: {}", entry.id),
                }),
                Err(e) => errors.push(BulkError {
                    index,
                    message: e.to_string(),
                }),
            }
        }

        Ok(BulkWriteReport {
            processed_count: contacts.len(),
            contacts,
            errors,
        })
    }

    /// Delete ids one at a time, in order; misses are recorded and
    /// processing continues.
    pub async fn bulk_delete(&self, ids: Vec<String>) -> Result<BulkDeleteReport> {
        let mut deleted_ids = Vec::new();
        let mut errors = Vec::new();

        for (index, id) in ids.into_iter().enumerate() {
            match self.delete(&id).await {
                Ok(true) => deleted_ids.push(id),
                Ok(false) => errors.push(BulkError {
                    index,
                    message: format!("contact not found or deletion failed: {}", id),
                }),
                Err(e) => errors.push(BulkError {
                    index,
                    message: e.to_string(),
                }),
            }
        }

        Ok(BulkDeleteReport {
            processed_count: deleted_ids.len(),
            deleted_ids,
            errors,
        })
    }

    // ============ Embedding lifecycle ============

    /// Build or rebuild the embedding row for one contact.
    ///
    /// With `replace` set, existing rows for the contact are deleted
    /// before the insert (the update path). Every failure is contained
    /// here: logged, never returned.
    async fn refresh_embedding(&self, contact: &Contact, replace: bool) {
        if replace {
            if let Err(e) = self.store.delete_embeddings_for(&contact.id).await {
                tracing::warn!(contact_id = %contact.id, error = %e, "failed to clear old embedding rows");
                return;
            }
        }

        let content = embedding_text(contact);
        let Some(vector) = embedding::try_embed(&self.config.embedding, &content).await else {
            tracing::warn!(contact_id = %contact.id, "contact stored without embedding");
            return;
        };

        let now_micros = Utc::now().timestamp_micros();
        if let Err(e) = self
            .store
            .insert_embedding(&contact.id, &content, &vector, now_micros)
            .await
        {
            tracing::warn!(contact_id = %contact.id, error = %e, "failed to store embedding");
        }
    }

    /// Embed a batch of freshly inserted contacts concurrently.
    ///
    /// Tasks are joined all-settled; one task's failure never cancels or
    /// fails another.
    async fn embed_batch(&self, contacts: &[Contact]) {
        let mut tasks = JoinSet::new();

        for contact in contacts {
            let pool = self.store.pool().clone();
            let embedding_config = self.config.embedding.clone();
            let contact = contact.clone();

            tasks.spawn(async move {
                let store = ContactStore::new(pool);
                let content = embedding_text(&contact);
                let Some(vector) = embedding::try_embed(&embedding_config, &content).await else {
                    tracing::warn!(contact_id = %contact.id, "contact stored without embedding");
                    return;
                };
                let now_micros = Utc::now().timestamp_micros();
                if let Err(e) = store
                    .insert_embedding(&contact.id, &content, &vector, now_micros)
                    .await
                {
                    tracing::warn!(contact_id = %contact.id, error = %e, "failed to store embedding");
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "embedding task panicked");
            }
        }
    }
}

/// The current time truncated to microseconds, the column precision.
/// Keeps a freshly created record identical to what a re-read returns.
fn now_at_storage_precision() -> DateTime<Utc> {
    DateTime::from_timestamp_micros(Utc::now().timestamp_micros()).unwrap_or_default()
}

/// Synthesize the text that gets embedded for a contact.
///
/// Field order is fixed: name, title, company, location, notes, then
/// every element of email, phone, links, tags. Empty values contribute
/// nothing — no placeholders, no doubled separators.
pub fn embedding_text(contact: &Contact) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for field in [
        &contact.name,
        &contact.title,
        &contact.company,
        &contact.location,
        &contact.notes,
    ] {
        if !field.is_empty() {
            parts.push(field);
        }
    }

    for list in [
        &contact.emails,
        &contact.phones,
        &contact.links,
        &contact.tags,
    ] {
        for value in list {
            if !value.is_empty() {
                parts.push(value);
            }
        }
    }

    parts.join(" ")
}
