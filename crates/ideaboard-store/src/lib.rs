//! # ideaboard-store
//!
//! SQLite-backed storage for topics, ideas, tags and feedback.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed operations for every part of the
//! data model: entity create/update, case-insensitive tag sync, the
//! archive/restore/purge lifecycle with its cascades, and the read views
//! served to clients. Every multi-row write runs in a single transaction.

pub mod database;
pub mod feedback;
pub mod ideas;
pub mod lifecycle;
pub mod migrations;
pub mod models;
pub mod projections;
pub mod tags;
pub mod topics;

mod error;
mod row;

pub use database::Database;
pub use error::{Entity, Result, StoreError};
pub use models::*;
pub use projections::TopicScope;
pub use tags::{SyncOutcome, TagTarget};
