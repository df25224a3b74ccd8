//! # Estuary
//!
//! Incrementally monitors social-media content surfaced through RSS
//! aggregation mirrors and syncs newly observed items into Notion, without
//! re-delivering items already pushed.
//!
//! ## Architecture
//!
//! ```text
//! Resolver → Fetcher (mirror fallback) → diff against cache → Push → cache insert
//! ```
//!
//! - [`resolver`]: expands platform + user into an ordered list of mirror URLs
//! - [`fetcher`]: tries mirrors in order, first parseable feed wins
//! - [`cache`]: persistent fingerprint cache with age-based eviction
//! - [`sync`]: per-user orchestration; cache insert only after confirmed push
//! - [`push`]: Notion adapter, pages partitioned by publish date
//!
//! The process is invoked by an external scheduler (cron or similar); each
//! invocation is one sync pass, and re-invocation provides retry at job
//! granularity.

/// Application context and error handling.
pub mod app;

/// Persistent fingerprint cache, the single source of truth for
/// "already delivered".
pub mod cache;

/// Command-line interface: `sync [USER]` and `list`.
pub mod cli;

/// TOML configuration: platforms, mirror templates, users, push target.
pub mod config;

/// Core domain models ([`ContentItem`](domain::ContentItem),
/// [`Platform`](domain::Platform), [`SyncReport`](domain::SyncReport)).
pub mod domain;

/// Mirror fetching with ordered fallback and per-endpoint diagnostics.
pub mod fetcher;

/// RSS/Atom payload normalization into [`ContentItem`](domain::ContentItem)s.
pub mod normalizer;

/// Push adapters; [`NotionPusher`](push::NotionPusher) is the default.
pub mod push;

/// Candidate mirror URL resolution from configured templates.
pub mod resolver;

/// The sync orchestrator driving resolve → fetch → diff → push per job.
pub mod sync;
