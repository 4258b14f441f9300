//! Service-level tests: CRUD semantics, bulk reporting, search behavior,
//! and graceful degradation when the embedding provider is unreachable.

use tempfile::TempDir;

use rolodex::config::{Config, DbConfig, EmbeddingConfig, SearchConfig, ServerConfig};
use rolodex::migrate;
use rolodex::models::{ContactDraft, ContactPatch, ContactPatchEntry, ListParams, StringList};
use rolodex::service::ContactService;

fn test_config(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: tmp.path().join("data").join("rolodex.sqlite"),
        },
        embedding: EmbeddingConfig::default(),
        search: SearchConfig::default(),
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
    }
}

/// An embedding config pointing at a closed port: every provider call
/// fails fast with a connection error.
fn unreachable_embedding() -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "ollama".to_string(),
        model: Some("nomic-embed-text".to_string()),
        dims: 8,
        url: Some("http://127.0.0.1:1".to_string()),
        batch_size: 8,
        max_retries: 0,
        timeout_secs: 1,
    }
}

async fn setup() -> (TempDir, ContactService) {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp);
    migrate::run_migrations(&config).await.unwrap();
    let service = ContactService::connect(&config).await.unwrap();
    (tmp, service)
}

async fn setup_with_embedding(embedding: EmbeddingConfig) -> (TempDir, ContactService) {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&tmp);
    config.embedding = embedding;
    migrate::run_migrations(&config).await.unwrap();
    let service = ContactService::connect(&config).await.unwrap();
    (tmp, service)
}

fn draft(name: &str) -> ContactDraft {
    ContactDraft {
        name: name.to_string(),
        ..ContactDraft::default()
    }
}

// ============ Create / get ============

#[tokio::test]
async fn test_create_with_only_name_defaults_everything_else() {
    let (_tmp, service) = setup().await;

    let contact = service.create(draft("Ada Lovelace")).await.unwrap();
    assert_eq!(contact.name, "Ada Lovelace");
    assert_eq!(contact.title, "");
    assert_eq!(contact.company, "");
    assert_eq!(contact.notes, "");
    assert_eq!(contact.location, "");
    assert!(contact.emails.is_empty());
    assert!(contact.phones.is_empty());
    assert!(contact.links.is_empty());
    assert!(contact.tags.is_empty());
    assert!(contact.birthdate.is_none());
    assert_eq!(contact.created_at, contact.updated_at);

    // The persisted row round-trips identically.
    let fetched = service.get(&contact.id).await.unwrap().unwrap();
    assert_eq!(fetched, contact);
}

#[tokio::test]
async fn test_create_rejects_empty_name() {
    let (_tmp, service) = setup().await;

    let err = service.create(draft("   ")).await.unwrap_err();
    assert!(err.to_string().contains("name"));
}

#[tokio::test]
async fn test_create_roundtrips_birthdate_and_lists() {
    let (_tmp, service) = setup().await;

    let contact = service
        .create(ContactDraft {
            name: "Grace Hopper".to_string(),
            emails: StringList(vec!["grace@example.com".to_string()]),
            tags: StringList(vec!["navy".to_string(), "compilers".to_string()]),
            birthdate: Some(chrono::NaiveDate::from_ymd_opt(1906, 12, 9).unwrap()),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let fetched = service.get(&contact.id).await.unwrap().unwrap();
    assert_eq!(fetched.emails, vec!["grace@example.com"]);
    assert_eq!(fetched.tags, vec!["navy", "compilers"]);
    assert_eq!(
        fetched.birthdate,
        Some(chrono::NaiveDate::from_ymd_opt(1906, 12, 9).unwrap())
    );
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let (_tmp, service) = setup().await;
    assert!(service.get("no-such-id").await.unwrap().is_none());
}

// ============ Update ============

#[tokio::test]
async fn test_update_missing_returns_none() {
    let (_tmp, service) = setup().await;
    let result = service
        .update("no-such-id", ContactPatch::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_empty_update_only_advances_updated_at() {
    let (_tmp, service) = setup().await;

    let created = service.create(draft("Ada Lovelace")).await.unwrap();
    let updated = service
        .update(&created.id, ContactPatch::default())
        .await
        .unwrap()
        .unwrap();

    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.tags, created.tags);
}

#[tokio::test]
async fn test_updated_at_strictly_increases_across_rapid_updates() {
    let (_tmp, service) = setup().await;

    let created = service.create(draft("Ada")).await.unwrap();
    let first = service
        .update(&created.id, ContactPatch::default())
        .await
        .unwrap()
        .unwrap();
    let second = service
        .update(&created.id, ContactPatch::default())
        .await
        .unwrap()
        .unwrap();

    assert!(first.updated_at > created.updated_at);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_update_touches_only_provided_fields() {
    let (_tmp, service) = setup().await;

    let created = service
        .create(ContactDraft {
            name: "Ada".to_string(),
            company: "Analytical Engines Ltd".to_string(),
            tags: StringList(vec!["mathematics".to_string()]),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let updated = service
        .update(
            &created.id,
            ContactPatch {
                title: Some("Countess".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.title, "Countess");
    assert_eq!(updated.company, "Analytical Engines Ltd");
    assert_eq!(updated.tags, vec!["mathematics"]);
}

#[tokio::test]
async fn test_update_with_empty_values_overwrites_to_empty() {
    let (_tmp, service) = setup().await;

    let created = service
        .create(ContactDraft {
            name: "Ada".to_string(),
            company: "Analytical Engines Ltd".to_string(),
            tags: StringList(vec!["mathematics".to_string()]),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let updated = service
        .update(
            &created.id,
            ContactPatch {
                company: Some(String::new()),
                tags: Some(StringList(Vec::new())),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.company, "");
    assert!(updated.tags.is_empty());
    assert_eq!(updated.name, "Ada");
}

// ============ Delete ============

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_tmp, service) = setup().await;

    let contact = service.create(draft("Ada")).await.unwrap();
    assert!(service.delete(&contact.id).await.unwrap());
    assert!(!service.delete(&contact.id).await.unwrap());
    assert!(service.get(&contact.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_cascades_embedding_rows() {
    let (_tmp, service) = setup().await;

    let contact = service.create(draft("Ada")).await.unwrap();

    // Plant an embedding row directly, as if a provider had been enabled.
    service
        .store()
        .insert_embedding(&contact.id, "Ada", &[0.5f32; 8], 1)
        .await
        .unwrap();
    assert_eq!(
        service.store().embedding_count_for(&contact.id).await.unwrap(),
        1
    );

    assert!(service.delete(&contact.id).await.unwrap());
    assert_eq!(
        service.store().embedding_count_for(&contact.id).await.unwrap(),
        0
    );
    assert_eq!(service.store().count_embeddings().await.unwrap(), 0);
}

// ============ Listing ============

#[tokio::test]
async fn test_list_orders_most_recently_updated_first() {
    let (_tmp, service) = setup().await;

    let alpha = service.create(draft("Alpha")).await.unwrap();
    let beta = service.create(draft("Beta")).await.unwrap();

    let contacts = service.list(ListParams::default()).await.unwrap();
    let ids: Vec<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![beta.id.as_str(), alpha.id.as_str()]);

    // Touching alpha moves it to the front.
    service
        .update(&alpha.id, ContactPatch::default())
        .await
        .unwrap()
        .unwrap();

    let contacts = service.list(ListParams::default()).await.unwrap();
    let ids: Vec<&str> = contacts.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec![alpha.id.as_str(), beta.id.as_str()]);
}

#[tokio::test]
async fn test_list_pagination() {
    let (_tmp, service) = setup().await;

    for name in ["One", "Two", "Three"] {
        service.create(draft(name)).await.unwrap();
    }

    let page = service
        .list(ListParams {
            limit: Some(2),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    let rest = service
        .list(ListParams {
            offset: Some(2),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);

    let empty = service
        .list(ListParams {
            limit: Some(0),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_list_rejects_negative_pagination() {
    let (_tmp, service) = setup().await;

    let err = service
        .list(ListParams {
            limit: Some(-1),
            ..ListParams::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("limit"));

    let err = service
        .list(ListParams {
            offset: Some(-5),
            ..ListParams::default()
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("offset"));
}

#[tokio::test]
async fn test_list_query_matches_any_field_case_insensitively() {
    let (_tmp, service) = setup().await;

    service
        .create(ContactDraft {
            name: "John Doe".to_string(),
            tags: StringList(vec!["developer".to_string()]),
            ..ContactDraft::default()
        })
        .await
        .unwrap();
    service
        .create(ContactDraft {
            name: "Jane Roe".to_string(),
            company: "Initech".to_string(),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let by_name = service
        .list(ListParams {
            query: Some("JOHN".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "John Doe");

    let by_tag = service
        .list(ListParams {
            query: Some("developer".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(by_tag.len(), 1);

    let by_company = service
        .list(ListParams {
            query: Some("initech".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(by_company.len(), 1);
    assert_eq!(by_company[0].name, "Jane Roe");
}

#[tokio::test]
async fn test_list_query_is_literal_not_a_pattern() {
    let (_tmp, service) = setup().await;

    service
        .create(ContactDraft {
            name: "Percent Person".to_string(),
            notes: "closed 100% of deals".to_string(),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    // Wildcards do not act as wildcards.
    let wildcard = service
        .list(ListParams {
            query: Some("P%t".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert!(wildcard.is_empty());

    // The literal character is still findable.
    let literal = service
        .list(ListParams {
            query: Some("100%".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(literal.len(), 1);

    // And a hostile query is just a string that matches nothing.
    let hostile = service
        .list(ListParams {
            query: Some("'; DROP TABLE contacts; --".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert!(hostile.is_empty());
    assert_eq!(service.store().count_contacts().await.unwrap(), 1);
}

// ============ Search ============

#[tokio::test]
async fn test_search_lexical_scenario() {
    let (_tmp, service) = setup().await;

    service
        .create(ContactDraft {
            name: "John Doe".to_string(),
            tags: StringList(vec!["developer".to_string()]),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let hits = service.search(Some("john")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "John Doe");

    let misses = service.search(Some("nonexistent-term")).await.unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn test_search_without_query_returns_all_contacts() {
    let (_tmp, service) = setup().await;

    service.create(draft("Alpha")).await.unwrap();
    service.create(draft("Beta")).await.unwrap();

    let all = service.search(None).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_search_has_no_duplicate_ids() {
    let (_tmp, service) = setup().await;

    service
        .create(ContactDraft {
            name: "John Doe".to_string(),
            company: "Johnson & Johnson".to_string(),
            ..ContactDraft::default()
        })
        .await
        .unwrap();

    let hits = service.search(Some("john")).await.unwrap();
    let mut ids: Vec<&str> = hits.iter().map(|c| c.id.as_str()).collect();
    let before = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), before);
}

// ============ Graceful degradation ============

#[tokio::test]
async fn test_unreachable_provider_create_update_search_still_work() {
    let (_tmp, service) = setup_with_embedding(unreachable_embedding()).await;

    // Create and update succeed even though every embed call fails.
    let contact = service
        .create(ContactDraft {
            name: "John Doe".to_string(),
            tags: StringList(vec!["developer".to_string()]),
            ..ContactDraft::default()
        })
        .await
        .unwrap();
    let updated = service
        .update(
            &contact.id,
            ContactPatch {
                title: Some("Engineer".to_string()),
                ..ContactPatch::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Engineer");

    // No embedding rows were written.
    assert_eq!(service.store().count_embeddings().await.unwrap(), 0);

    // Hybrid search degrades to exactly the lexical result.
    let searched = service.search(Some("john")).await.unwrap();
    let listed = service
        .list(ListParams {
            query: Some("john".to_string()),
            ..ListParams::default()
        })
        .await
        .unwrap();
    assert_eq!(searched, listed);
    assert_eq!(searched.len(), 1);
}

#[tokio::test]
async fn test_unreachable_provider_bulk_create_reports_no_errors() {
    let (_tmp, service) = setup_with_embedding(unreachable_embedding()).await;

    let report = service
        .bulk_create(vec![draft("One"), draft("Two"), draft("Three")])
        .await
        .unwrap();

    // Embedding failures are per-contact and contained; the batch result
    // never reflects them.
    assert_eq!(report.processed_count, 3);
    assert_eq!(report.contacts.len(), 3);
    assert!(report.errors.is_empty());
    assert_eq!(service.store().count_contacts().await.unwrap(), 3);
    assert_eq!(service.store().count_embeddings().await.unwrap(), 0);
}

// ============ Bulk operations ============

#[tokio::test]
async fn test_bulk_create_inserts_everything() {
    let (_tmp, service) = setup().await;

    let report = service
        .bulk_create(vec![draft("One"), draft("Two")])
        .await
        .unwrap();

    assert_eq!(report.processed_count, 2);
    assert_eq!(report.contacts.len(), 2);
    assert!(report.errors.is_empty());

    for contact in &report.contacts {
        assert!(service.get(&contact.id).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_bulk_create_fails_as_a_whole() {
    let (_tmp, service) = setup().await;

    let report = service
        .bulk_create(vec![draft("Valid"), draft("")])
        .await
        .unwrap();

    assert_eq!(report.processed_count, 0);
    assert!(report.contacts.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].index, 1);

    // Nothing from the batch was persisted.
    assert_eq!(service.store().count_contacts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_bulk_update_reports_positional_errors_and_continues() {
    let (_tmp, service) = setup().await;

    let existing = service.create(draft("Ada")).await.unwrap();

    let entries = vec![
        ContactPatchEntry {
            id: existing.id.clone(),
            patch: ContactPatch {
                title: Some("Countess".to_string()),
                ..ContactPatch::default()
            },
        },
        ContactPatchEntry {
            id: "missing-a".to_string(),
            patch: ContactPatch::default(),
        },
        ContactPatchEntry {
            id: "missing-b".to_string(),
            patch: ContactPatch::default(),
        },
    ];

    let report = service.bulk_update(entries).await.unwrap();

    // N = 3, k = 2 misses: processed == N - k, one error per miss with
    // the entry's original index.
    assert_eq!(report.processed_count, 1);
    assert_eq!(report.contacts.len(), 1);
    assert_eq!(report.contacts[0].title, "Countess");
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.errors[0].index, 1);
    assert_eq!(report.errors[1].index, 2);
    assert!(report.errors[0].message.contains("not found"));
}

#[tokio::test]
async fn test_bulk_delete_reports_positional_errors_and_continues() {
    let (_tmp, service) = setup().await;

    let one = service.create(draft("One")).await.unwrap();
    let two = service.create(draft("Two")).await.unwrap();

    let report = service
        .bulk_delete(vec![one.id.clone(), "missing".to_string(), two.id.clone()])
        .await
        .unwrap();

    assert_eq!(report.processed_count, 2);
    assert_eq!(report.deleted_ids, vec![one.id, two.id]);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].index, 1);
    assert!(report.errors[0].message.contains("not found"));
}
