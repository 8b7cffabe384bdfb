//! Assembled read views.
//!
//! Visibility is derived at read time, never stored: an idea is hidden when
//! it is archived *or* its topic is archived. Tag lists come from separate
//! join queries rather than string concatenation so tag names may contain
//! any character.

use rusqlite::{params, Connection, OptionalExtension, Params};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::{FeedbackView, IdeaView, TopicDetail, TopicView};
use crate::row::{bool_at, ts_at, uuid_at};
use crate::tags::{tag_names_for, TagTarget};

/// Which context a topic is viewed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicScope {
    /// Normal listings: archived topics are hidden and only active ideas are
    /// counted.
    Dashboard,
    /// The archive: topics are shown whatever their state and every idea
    /// counts.
    Archive,
}

impl Database {
    /// Assemble a single topic view.
    pub fn project_topic(&self, id: Uuid, scope: TopicScope) -> Result<TopicView> {
        project_topic(self.conn(), id, scope)
    }

    /// Assemble a single idea view, hidden if the idea or its topic is
    /// archived.
    pub fn project_idea(&self, id: Uuid) -> Result<IdeaView> {
        project_idea(self.conn(), id)
    }

    /// Active topics, newest first.
    pub fn list_topics(&self) -> Result<Vec<TopicView>> {
        query_topics(
            self.conn(),
            "WHERE t.is_archived = 0 ORDER BY t.created_at DESC",
            [],
            TopicScope::Dashboard,
        )
    }

    /// An active topic with its active ideas, newest first.
    pub fn topic_detail(&self, id: Uuid) -> Result<TopicDetail> {
        let topic = project_topic(self.conn(), id, TopicScope::Dashboard)?;
        let ideas = query_ideas(
            self.conn(),
            "WHERE i.topic_id = ?1 AND i.is_archived = 0 ORDER BY i.created_at DESC",
            params![id.to_string()],
        )?;
        Ok(TopicDetail { topic, ideas })
    }

    /// Archived topics, most recently archived first, counting all ideas.
    pub fn list_archived_topics(&self) -> Result<Vec<TopicView>> {
        query_topics(
            self.conn(),
            "WHERE t.is_archived = 1 ORDER BY t.updated_at DESC",
            [],
            TopicScope::Archive,
        )
    }

    /// Archived ideas with their topic names, most recently archived first.
    pub fn list_archived_ideas(&self) -> Result<Vec<IdeaView>> {
        query_ideas(
            self.conn(),
            "WHERE i.is_archived = 1 ORDER BY i.updated_at DESC",
            [],
        )
    }
}

// ---------------------------------------------------------------------------
// Connection-level queries (usable inside a transaction)
// ---------------------------------------------------------------------------

const TOPIC_SELECT: &str = "
    SELECT t.id, t.name, t.description, t.is_archived, t.created_at, t.updated_at,
           (SELECT COUNT(*) FROM ideas i WHERE i.topic_id = t.id {idea_filter})
    FROM topics t";

const IDEA_SELECT: &str = "
    SELECT i.id, i.topic_id, t.name, i.name, i.description, i.is_archived,
           i.created_at, i.updated_at, t.is_archived, f.rating, f.notes
    FROM ideas i
    JOIN topics t ON t.id = i.topic_id
    LEFT JOIN feedback f ON f.idea_id = i.id";

pub(crate) fn project_topic(conn: &Connection, id: Uuid, scope: TopicScope) -> Result<TopicView> {
    let topic = query_topics(conn, "WHERE t.id = ?1", params![id.to_string()], scope)?
        .pop()
        .ok_or(StoreError::NotFound(Entity::Topic))?;

    if scope == TopicScope::Dashboard && topic.is_archived {
        return Err(StoreError::NotFound(Entity::Topic));
    }
    Ok(topic)
}

pub(crate) fn project_idea(conn: &Connection, id: Uuid) -> Result<IdeaView> {
    let sql = format!("{IDEA_SELECT} WHERE i.id = ?1");
    let found = conn
        .query_row(&sql, params![id.to_string()], row_to_idea_view)
        .optional()?;

    match found {
        Some((mut idea, topic_archived)) if !idea.is_archived && !topic_archived => {
            idea.tags = tag_names_for(conn, TagTarget::Idea(idea.id))?;
            Ok(idea)
        }
        _ => Err(StoreError::NotFound(Entity::Idea)),
    }
}

fn query_topics<P: Params>(
    conn: &Connection,
    filter: &str,
    filter_params: P,
    scope: TopicScope,
) -> Result<Vec<TopicView>> {
    let idea_filter = match scope {
        TopicScope::Dashboard => "AND i.is_archived = 0",
        TopicScope::Archive => "",
    };
    let sql = format!(
        "{} {filter}",
        TOPIC_SELECT.replace("{idea_filter}", idea_filter)
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(filter_params, row_to_topic_view)?;

    let mut topics = Vec::new();
    for row in rows {
        let mut topic = row?;
        topic.tags = tag_names_for(conn, TagTarget::Topic(topic.id))?;
        topics.push(topic);
    }
    Ok(topics)
}

fn query_ideas<P: Params>(conn: &Connection, filter: &str, filter_params: P) -> Result<Vec<IdeaView>> {
    let mut stmt = conn.prepare(&format!("{IDEA_SELECT} {filter}"))?;
    let rows = stmt.query_map(filter_params, row_to_idea_view)?;

    let mut ideas = Vec::new();
    for row in rows {
        let (mut idea, _) = row?;
        idea.tags = tag_names_for(conn, TagTarget::Idea(idea.id))?;
        ideas.push(idea);
    }
    Ok(ideas)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_topic_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<TopicView> {
    let idea_count: i64 = row.get(6)?;
    Ok(TopicView {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_archived: bool_at(row, 3)?,
        tags: Vec::new(),
        idea_count: idea_count.max(0) as u64,
        created_at: ts_at(row, 4)?,
        updated_at: ts_at(row, 5)?,
    })
}

/// The view (tags not yet filled) plus whether the owning topic is archived.
fn row_to_idea_view(row: &rusqlite::Row<'_>) -> rusqlite::Result<(IdeaView, bool)> {
    let rating: Option<u8> = row.get(9)?;
    let notes: Option<String> = row.get(10)?;

    let idea = IdeaView {
        id: uuid_at(row, 0)?,
        topic_id: uuid_at(row, 1)?,
        topic_name: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        is_archived: bool_at(row, 5)?,
        tags: Vec::new(),
        feedback: rating.map(|rating| FeedbackView { rating, notes }),
        created_at: ts_at(row, 6)?,
        updated_at: ts_at(row, 7)?,
    };
    Ok((idea, bool_at(row, 8)?))
}
