//! # Rolodex CLI (`rdx`)
//!
//! The `rdx` binary is the primary interface for Rolodex. It provides
//! commands for database initialization, contact management, search,
//! embedding maintenance, and starting the tool server.
//!
//! ## Usage
//!
//! ```bash
//! rdx --config ./config/rolodex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rdx init` | Create the SQLite database and run schema migrations |
//! | `rdx add --name "..."` | Create a contact |
//! | `rdx get <id>` | Print a contact by UUID |
//! | `rdx list` | List contacts, most recently updated first |
//! | `rdx search "<query>"` | Hybrid search over contacts |
//! | `rdx stats` | Contact and embedding counts |
//! | `rdx embed pending` | Backfill missing embeddings |
//! | `rdx embed rebuild` | Delete and regenerate all embeddings |
//! | `rdx serve mcp` | Start the HTTP tool server + MCP endpoint |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rolodex::models::{ContactDraft, ListParams, StringList};
use rolodex::service::ContactService;
use rolodex::{config, embed_cmd, migrate, server, stats};

/// Rolodex CLI — contact management with hybrid lexical + semantic search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/rolodex.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "rdx",
    about = "Rolodex — contact management with hybrid lexical + semantic search",
    version,
    long_about = "Rolodex stores contacts in SQLite, keeps an embedding vector per contact \
    via an external provider, and serves CRUD, listing, and hybrid search as MCP tools. \
    When the embedding provider is unavailable, search silently degrades to substring matching."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/rolodex.toml`. Database, embedding, search,
    /// and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/rolodex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (contacts, contact_embeddings). Idempotent — running it multiple
    /// times is safe.
    Init,

    /// Create a contact.
    ///
    /// Only `--name` is required. Multi-valued fields are repeatable:
    /// `rdx add --name "Ada" --email a@x.io --email b@x.io --tag math`.
    Add {
        /// Full name (required, non-empty).
        #[arg(long)]
        name: String,

        /// Job title.
        #[arg(long, default_value = "")]
        title: String,

        /// Company or organization.
        #[arg(long, default_value = "")]
        company: String,

        /// Free-form notes.
        #[arg(long, default_value = "")]
        notes: String,

        /// Free-form location.
        #[arg(long, default_value = "")]
        location: String,

        /// Email address (repeatable).
        #[arg(long = "email")]
        emails: Vec<String>,

        /// Phone number (repeatable).
        #[arg(long = "phone")]
        phones: Vec<String>,

        /// Profile or website URL (repeatable).
        #[arg(long = "link")]
        links: Vec<String>,

        /// Label for grouping (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Birthdate as YYYY-MM-DD.
        #[arg(long)]
        birthdate: Option<String>,
    },

    /// Print a contact by its UUID.
    Get {
        /// Contact UUID.
        id: String,
    },

    /// List contacts, most recently updated first.
    List {
        /// Case-insensitive substring matched against every field.
        #[arg(long)]
        query: Option<String>,

        /// Maximum number of contacts to return (default 50).
        #[arg(long)]
        limit: Option<i64>,

        /// Number of contacts to skip (default 0).
        #[arg(long)]
        offset: Option<i64>,
    },

    /// Search contacts.
    ///
    /// Runs substring and semantic search concurrently and merges the
    /// results (semantic first, no duplicates). Falls back to substring
    /// matching alone when embeddings are disabled or the provider is
    /// unreachable.
    Search {
        /// The search query string.
        query: String,
    },

    /// Show contact and embedding counts.
    Stats,

    /// Manage embedding vectors.
    ///
    /// Requires an embedding provider (OpenAI or Ollama) to be configured.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Start the tool server.
    ///
    /// Exposes the contact tools over plain JSON HTTP and the MCP
    /// Streamable HTTP protocol for Cursor, Claude, and other clients.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Embedding management subcommands.
#[derive(Subcommand)]
enum EmbedAction {
    /// Embed contacts that have no embedding row.
    ///
    /// A provider outage during create/update leaves the contact stored
    /// without a vector; this backfills them.
    Pending {
        /// Show counts without performing any embedding.
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete and regenerate all embeddings.
    ///
    /// Useful when switching embedding models or dimensions.
    Rebuild,
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the HTTP tool server with the MCP endpoint.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rolodex=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            name,
            title,
            company,
            notes,
            location,
            emails,
            phones,
            links,
            tags,
            birthdate,
        } => {
            let birthdate = birthdate
                .map(|s| {
                    chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                        .map_err(|_| anyhow::anyhow!("birthdate must be YYYY-MM-DD, got '{}'", s))
                })
                .transpose()?;

            let service = ContactService::connect(&cfg).await?;
            let contact = service
                .create(ContactDraft {
                    name,
                    title,
                    company,
                    notes,
                    location,
                    emails: StringList(emails),
                    phones: StringList(phones),
                    links: StringList(links),
                    tags: StringList(tags),
                    birthdate,
                })
                .await?;

            println!("Created contact {}", contact.id);
            println!("{}", serde_json::to_string_pretty(&contact)?);
        }
        Commands::Get { id } => {
            let service = ContactService::connect(&cfg).await?;
            match service.get(&id).await? {
                Some(contact) => println!("{}", serde_json::to_string_pretty(&contact)?),
                None => {
                    eprintln!("Error: contact not found: {}", id);
                    std::process::exit(1);
                }
            }
        }
        Commands::List {
            query,
            limit,
            offset,
        } => {
            let service = ContactService::connect(&cfg).await?;
            let contacts = service
                .list(ListParams {
                    query,
                    limit,
                    offset,
                })
                .await?;
            print_contacts(&contacts);
        }
        Commands::Search { query } => {
            let service = ContactService::connect(&cfg).await?;
            let contacts = service.search(Some(&query)).await?;
            print_contacts(&contacts);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending { dry_run } => {
                embed_cmd::run_embed_pending(&cfg, dry_run).await?;
            }
            EmbedAction::Rebuild => {
                embed_cmd::run_embed_rebuild(&cfg).await?;
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}

fn print_contacts(contacts: &[rolodex::models::Contact]) {
    if contacts.is_empty() {
        println!("No results.");
        return;
    }

    for (i, contact) in contacts.iter().enumerate() {
        let company = if contact.company.is_empty() {
            String::new()
        } else {
            format!(" — {}", contact.company)
        };
        println!("{}. {}{}", i + 1, contact.name, company);
        if !contact.emails.is_empty() {
            println!("    email: {}", contact.emails.join(", "));
        }
        if !contact.tags.is_empty() {
            println!("    tags: {}", contact.tags.join(", "));
        }
        println!("    updated: {}", contact.updated_at.format("%Y-%m-%d %H:%M"));
        println!("    id: {}", contact.id);
        println!();
    }
}
