//! Domain model structs persisted in the SQLite database, and the assembled
//! views handed to callers.
//!
//! Views serialize with camelCase keys because the HTTP layer returns them
//! as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A topic row. Names are unique by exact comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An idea row. Always owned by exactly one topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tag shared by any number of topics and ideas.
///
/// `name` keeps the casing of whoever created the tag first; lookups go
/// through the lowercased key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Feedback attached to an idea (at most one per idea).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub id: Uuid,
    pub idea_id: Uuid,
    /// Always within 1..=5; the schema CHECK enforces it.
    pub rating: u8,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A topic with its tag names and an idea count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    /// Sorted case-insensitively. Only membership is meaningful.
    pub tags: Vec<String>,
    /// Active ideas for dashboard views, all ideas for archive views.
    pub idea_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A topic together with its active ideas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicDetail {
    #[serde(flatten)]
    pub topic: TopicView,
    pub ideas: Vec<IdeaView>,
}

/// Rating and notes as shown alongside an idea.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackView {
    pub rating: u8,
    pub notes: Option<String>,
}

/// An idea with its topic name, tag names and feedback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdeaView {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub topic_name: String,
    pub name: String,
    pub description: Option<String>,
    pub is_archived: bool,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a permanent delete removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub ideas_removed: usize,
    pub tags_removed: usize,
}
