//! Database statistics overview.
//!
//! A quick summary of what's stored: contact counts, embedding coverage,
//! and database size. Used by `rdx stats` to give confidence that writes
//! and embeddings are working as expected.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::ContactStore;

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = ContactStore::new(pool);

    let total_contacts = store.count_contacts().await?;
    let total_embeddings = store.count_embeddings().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Rolodex — Database Stats");
    println!("========================");
    println!();
    println!("  Database:   {}", config.db.path.display());
    println!("  Size:       {}", format_bytes(db_size));
    println!();
    println!("  Contacts:   {}", total_contacts);
    println!(
        "  Embedded:   {} / {} ({}%)",
        total_embeddings,
        total_contacts,
        if total_contacts > 0 {
            (total_embeddings * 100) / total_contacts
        } else {
            0
        }
    );
    println!(
        "  Provider:   {}",
        if config.embedding.is_enabled() {
            config.embedding.provider.as_str()
        } else {
            "disabled (lexical search only)"
        }
    );
    println!();

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
