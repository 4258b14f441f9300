//! Embedding backfill commands.
//!
//! `rdx embed pending` embeds contacts that have no embedding row (a
//! provider outage during create/update leaves the contact behind
//! without one); `rdx embed rebuild` clears every embedding row and
//! regenerates from scratch — useful when switching models or dims.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::service::embedding_text;
use crate::store::ContactStore;

/// Embed contacts that are missing an embedding row.
pub async fn run_embed_pending(config: &Config, dry_run: bool) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    println!(
        "embedding with {} ({} dims)",
        provider.model_name(),
        provider.dims()
    );

    let pool = db::connect(config).await?;
    let store = ContactStore::new(pool);

    let pending = store.contacts_missing_embeddings().await?;

    if dry_run {
        println!("embed pending (dry-run)");
        println!("  contacts needing embeddings: {}", pending.len());
        return Ok(());
    }

    if pending.is_empty() {
        println!("embed pending");
        println!("  all contacts up to date");
        return Ok(());
    }

    let (embedded, failed) = embed_contacts(config, &store, &pending).await?;

    println!("embed pending");
    println!("  total pending: {}", pending.len());
    println!("  embedded: {}", embedded);
    println!("  failed: {}", failed);

    store.pool().close().await;
    Ok(())
}

/// Delete all embedding rows and regenerate for every contact.
pub async fn run_embed_rebuild(config: &Config) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    let provider = embedding::create_provider(&config.embedding)?;
    println!(
        "embedding with {} ({} dims)",
        provider.model_name(),
        provider.dims()
    );

    let pool = db::connect(config).await?;
    let store = ContactStore::new(pool);

    let cleared = store.delete_all_embeddings().await?;
    println!("embed rebuild — cleared {} existing embeddings", cleared);

    let contacts = store.fetch_all_ordered().await?;

    if contacts.is_empty() {
        println!("  no contacts to embed");
        store.pool().close().await;
        return Ok(());
    }

    let (embedded, failed) = embed_contacts(config, &store, &contacts).await?;

    println!("embed rebuild");
    println!("  total contacts: {}", contacts.len());
    println!("  embedded: {}", embedded);
    println!("  failed: {}", failed);

    store.pool().close().await;
    Ok(())
}

/// Embed contacts in provider-sized batches. A failed batch is logged
/// and skipped; the remaining batches still run.
async fn embed_contacts(
    config: &Config,
    store: &ContactStore,
    contacts: &[crate::models::Contact],
) -> Result<(u64, u64)> {
    let mut embedded = 0u64;
    let mut failed = 0u64;

    for batch in contacts.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(embedding_text).collect();

        match embedding::embed_texts(&config.embedding, &texts).await {
            Ok(vectors) => {
                for (contact, vector) in batch.iter().zip(vectors.iter()) {
                    let now_micros = Utc::now().timestamp_micros();
                    store.delete_embeddings_for(&contact.id).await?;
                    if let Err(e) = store
                        .insert_embedding(&contact.id, &embedding_text(contact), vector, now_micros)
                        .await
                    {
                        tracing::warn!(contact_id = %contact.id, error = %e, "failed to store embedding");
                        failed += 1;
                    } else {
                        embedded += 1;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "embedding batch failed");
                failed += batch.len() as u64;
            }
        }
    }

    Ok((embedded, failed))
}
