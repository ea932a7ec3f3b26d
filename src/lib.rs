//! curio — a multi-tier capability index for AI customization elements.
//!
//! Elements (profiles, skills, templates, agents, memories, ensembles)
//! live in three tiers: a local portfolio on disk, a token-gated remote
//! collection, and a shared community collection. The index merges the
//! tiers into one searchable snapshot, discovers bounded relationships
//! between elements, and persists the result as JSON with TTL-based
//! freshness.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`elements`] — Element types, tiers, records, and keys
//! - [`error`] — The library's error type
//! - [`index`] — Tier refresh, merge, relationships, snapshots, and the query facade
//! - [`sources`] — ElementStore adapters: local portfolio, HTTP catalogs

pub mod config;
pub mod elements;
pub mod error;
pub mod index;
pub mod sources;
