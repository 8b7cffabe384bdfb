//! Create and update operations for [`Idea`] records.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use ideaboard_shared::IdeaCommand;

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::{Idea, IdeaView};
use crate::projections::project_idea;
use crate::row::{bool_at, format_ts, now, ts_at, uuid_at};
use crate::tags::{create_associations, resolve_or_create_tags, sync_associations, TagTarget};

impl Database {
    /// Insert a new active idea under an active topic and link its tags.
    pub fn create_idea(&mut self, cmd: &IdeaCommand) -> Result<IdeaView> {
        let id = Uuid::new_v4();
        let ts = format_ts(&now());

        let view = self.write(|tx| {
            if !topic_is_active(tx, cmd.topic_id())? {
                return Err(StoreError::NotFound(Entity::Topic));
            }

            tx.execute(
                "INSERT INTO ideas (id, topic_id, name, description, is_archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                params![
                    id.to_string(),
                    cmd.topic_id().to_string(),
                    cmd.name(),
                    cmd.description(),
                    ts,
                ],
            )?;

            let tag_ids = resolve_or_create_tags(tx, cmd.tags())?;
            create_associations(tx, TagTarget::Idea(id), &tag_ids)?;

            project_idea(tx, id)
        })?;

        tracing::info!(idea_id = %id, topic_id = %view.topic_id, "idea created");
        Ok(view)
    }

    /// Fetch an idea row by id, whatever its state.
    pub fn get_idea(&self, id: Uuid) -> Result<Idea> {
        self.conn()
            .query_row(
                "SELECT id, topic_id, name, description, is_archived, created_at, updated_at
                 FROM ideas
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_idea,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Idea))
    }

    /// All idea rows owned by a topic, oldest first.
    pub fn list_ideas_for_topic(&self, topic_id: Uuid) -> Result<Vec<Idea>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, topic_id, name, description, is_archived, created_at, updated_at
             FROM ideas
             WHERE topic_id = ?1
             ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![topic_id.to_string()], row_to_idea)?;

        let mut ideas = Vec::new();
        for row in rows {
            ideas.push(row?);
        }
        Ok(ideas)
    }

    /// Edit an active idea, possibly moving it to another active topic.
    /// The tag set is always replaced by the command's.
    pub fn update_idea(&mut self, id: Uuid, cmd: &IdeaCommand) -> Result<IdeaView> {
        let ts = format_ts(&now());

        self.write(|tx| {
            let archived: Option<bool> = tx
                .query_row(
                    "SELECT is_archived FROM ideas WHERE id = ?1",
                    params![id.to_string()],
                    |row| bool_at(row, 0),
                )
                .optional()?;
            if archived != Some(false) {
                return Err(StoreError::NotFound(Entity::Idea));
            }

            if !topic_is_active(tx, cmd.topic_id())? {
                return Err(StoreError::InvalidTarget(cmd.topic_id()));
            }

            tx.execute(
                "UPDATE ideas
                 SET name = ?1, description = ?2, topic_id = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    cmd.name(),
                    cmd.description(),
                    cmd.topic_id().to_string(),
                    ts,
                    id.to_string(),
                ],
            )?;

            let tag_ids = resolve_or_create_tags(tx, cmd.tags())?;
            sync_associations(tx, TagTarget::Idea(id), &tag_ids)?;

            project_idea(tx, id)
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn topic_is_active(conn: &Connection, topic_id: Uuid) -> Result<bool> {
    let archived: Option<bool> = conn
        .query_row(
            "SELECT is_archived FROM topics WHERE id = ?1",
            params![topic_id.to_string()],
            |row| bool_at(row, 0),
        )
        .optional()?;
    Ok(archived == Some(false))
}

fn row_to_idea(row: &rusqlite::Row<'_>) -> rusqlite::Result<Idea> {
    Ok(Idea {
        id: uuid_at(row, 0)?,
        topic_id: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        is_archived: bool_at(row, 4)?,
        created_at: ts_at(row, 5)?,
        updated_at: ts_at(row, 6)?,
    })
}
