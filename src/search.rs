//! Lexical, semantic, and hybrid contact search.
//!
//! The lexical path is a case-insensitive literal substring match over
//! decoded rows; the semantic path embeds the query and scans stored
//! vectors with cosine similarity. Hybrid search runs both concurrently
//! and merges by contact id, semantic results first. A semantic failure
//! of any kind degrades to the lexical result — callers never see it.

use anyhow::{bail, Result};
use std::collections::HashSet;

use crate::config::Config;
use crate::embedding;
use crate::models::{Contact, ListParams};
use crate::store::ContactStore;

/// Lexical path: list contacts, optionally filtered by a substring query.
///
/// With no query (or an empty one) every contact is returned, most
/// recently updated first. A non-empty query matches case-insensitively
/// and literally against name, company, notes, title, location, and
/// every element of email/phone/links/tags. Pagination defaults come
/// from config (limit 50, offset 0); negative values are rejected, never
/// clamped.
pub async fn list_contacts(
    store: &ContactStore,
    config: &Config,
    params: ListParams,
) -> Result<Vec<Contact>> {
    let limit = params.limit.unwrap_or(config.search.default_limit);
    let offset = params.offset.unwrap_or(0);

    if limit < 0 {
        bail!("limit must be a non-negative integer, got {}", limit);
    }
    if offset < 0 {
        bail!("offset must be a non-negative integer, got {}", offset);
    }

    let query = params.query.as_deref().unwrap_or("");
    if query.is_empty() {
        return store.list_page(limit, offset).await;
    }

    // Filtering happens on decoded rows, so the query string is inert
    // data — SQL and regex metacharacters cannot change its meaning.
    let needle = query.to_lowercase();
    let contacts = store.fetch_all_ordered().await?;

    Ok(contacts
        .into_iter()
        .filter(|c| matches_query(c, &needle))
        .skip(offset as usize)
        .take(limit as usize)
        .collect())
}

fn matches_query(contact: &Contact, needle: &str) -> bool {
    let scalar_hit = [
        &contact.name,
        &contact.company,
        &contact.notes,
        &contact.title,
        &contact.location,
    ]
    .into_iter()
    .any(|field| field.to_lowercase().contains(needle));

    if scalar_hit {
        return true;
    }

    [
        &contact.emails,
        &contact.phones,
        &contact.links,
        &contact.tags,
    ]
    .into_iter()
    .any(|list| list.iter().any(|value| value.to_lowercase().contains(needle)))
}

/// Semantic path: embed the query and rank stored contacts by cosine
/// similarity.
///
/// When the provider yields no usable vector — failure, empty result,
/// wrong dimension — this returns an empty list, which upstream treats
/// as "nothing semantic to add", not as an error. Matches must score
/// strictly above the configured threshold and at most `semantic_top_k`
/// contacts are returned, best first.
pub async fn semantic_search(
    store: &ContactStore,
    config: &Config,
    query: &str,
) -> Result<Vec<Contact>> {
    let Some(query_vec) = embedding::try_embed(&config.embedding, query).await else {
        return Ok(Vec::new());
    };

    let rows = store.embeddings_with_contacts().await?;

    let mut scored: Vec<(f64, Contact)> = rows
        .into_iter()
        .filter_map(|(vector, contact)| {
            let similarity = embedding::cosine_similarity(&query_vec, &vector) as f64;
            (similarity > config.search.similarity_threshold).then_some((similarity, contact))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.search.semantic_top_k);

    Ok(scored.into_iter().map(|(_, contact)| contact).collect())
}

/// Hybrid search over contacts.
///
/// `None` means "no query at all": the unfiltered listing is returned
/// and the semantic path is not consulted. Any actual query string —
/// including the empty string — runs both paths concurrently when
/// embeddings are enabled.
pub async fn search_contacts(
    store: &ContactStore,
    config: &Config,
    query: Option<&str>,
) -> Result<Vec<Contact>> {
    let Some(query) = query else {
        return list_contacts(store, config, ListParams::default()).await;
    };

    let lexical_params = ListParams {
        query: Some(query.to_string()),
        ..ListParams::default()
    };

    if !config.embedding.is_enabled() {
        return list_contacts(store, config, lexical_params).await;
    }

    let (lexical, semantic) = tokio::join!(
        list_contacts(store, config, lexical_params),
        semantic_search(store, config, query),
    );

    let lexical = lexical?;
    let semantic = match semantic {
        Ok(contacts) => contacts,
        Err(e) => {
            tracing::warn!(error = %e, "semantic search failed, returning lexical results only");
            Vec::new()
        }
    };

    Ok(merge_ranked(semantic, lexical))
}

/// Merge the two result channels into one deduplicated ranking.
///
/// Semantic results are inserted first in their own order, then lexical
/// results whose id is not already present. Each contact id appears
/// exactly once; when both channels return the same id, the copy that
/// entered first (the semantic one) is kept.
fn merge_ranked(semantic: Vec<Contact>, lexical: Vec<Contact>) -> Vec<Contact> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(semantic.len() + lexical.len());

    for contact in semantic.into_iter().chain(lexical) {
        if seen.insert(contact.id.clone()) {
            merged.push(contact);
        }
    }

    merged
}
