//! # Rolodex
//!
//! A contact management service with hybrid lexical + semantic search,
//! exposed as MCP tools.
//!
//! Contacts live in SQLite; each contact may carry one embedding vector
//! produced by an external provider (OpenAI or Ollama). Search merges a
//! case-insensitive substring scan with a cosine-similarity scan over
//! those vectors, and degrades to substring-only whenever the provider
//! is unavailable.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ Tool surface │──▶│   Contact    │──▶│    SQLite      │
//! │ HTTP + MCP   │   │   Service    │   │ contacts + vec │
//! └──────────────┘   └──────┬───────┘   └───────────────┘
//!                           │
//!                    ┌──────▼───────┐   ┌───────────────┐
//!                    │ Hybrid search│──▶│  Embedding     │
//!                    │ lex ∥ sem    │   │  provider API  │
//!                    └──────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rdx init                          # create database
//! rdx add --name "Ada Lovelace" --tag mathematics
//! rdx search "ada"                  # hybrid search
//! rdx serve mcp                     # start tool server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`store`] | SQL access for contacts and embedding rows |
//! | [`service`] | CRUD, bulk operations, embedding lifecycle |
//! | [`search`] | Lexical, semantic, and hybrid search |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`tools`] | Tool trait, registry, and the built-in tools |
//! | [`server`] | HTTP tool server |
//! | [`mcp`] | MCP JSON-RPC bridge |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`embed_cmd`] | Embedding backfill commands |
//! | [`stats`] | Database statistics |

pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod mcp;
pub mod migrate;
pub mod models;
pub mod search;
pub mod server;
pub mod service;
pub mod stats;
pub mod store;
pub mod tools;
