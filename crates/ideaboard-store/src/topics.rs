//! Create and update operations for [`Topic`] records.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use ideaboard_shared::TopicCommand;

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::{Topic, TopicView};
use crate::projections::{project_topic, TopicScope};
use crate::row::{bool_at, format_ts, now, ts_at, uuid_at};
use crate::tags::{create_associations, resolve_or_create_tags, sync_associations, TagTarget};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new active topic and link its tags.
    ///
    /// A name already used by another topic (archived or not) fails with
    /// [`StoreError::Constraint`].
    pub fn create_topic(&mut self, cmd: &TopicCommand) -> Result<TopicView> {
        let id = Uuid::new_v4();
        let ts = format_ts(&now());

        let view = self.write(|tx| {
            tx.execute(
                "INSERT INTO topics (id, name, description, is_archived, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![id.to_string(), cmd.name(), cmd.description(), ts],
            )?;

            if let Some(names) = cmd.tags() {
                let tag_ids = resolve_or_create_tags(tx, names)?;
                create_associations(tx, TagTarget::Topic(id), &tag_ids)?;
            }

            project_topic(tx, id, TopicScope::Dashboard)
        })?;

        tracing::info!(topic_id = %id, name = %view.name, "topic created");
        Ok(view)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a topic row by id, whatever its state.
    pub fn get_topic(&self, id: Uuid) -> Result<Topic> {
        self.conn()
            .query_row(
                "SELECT id, name, description, is_archived, created_at, updated_at
                 FROM topics
                 WHERE id = ?1",
                params![id.to_string()],
                row_to_topic,
            )
            .optional()?
            .ok_or(StoreError::NotFound(Entity::Topic))
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Rename / re-describe an active topic. Tags are replaced only when the
    /// command carries a tag list.
    pub fn update_topic(&mut self, id: Uuid, cmd: &TopicCommand) -> Result<TopicView> {
        let ts = format_ts(&now());

        self.write(|tx| {
            let archived: Option<bool> = tx
                .query_row(
                    "SELECT is_archived FROM topics WHERE id = ?1",
                    params![id.to_string()],
                    |row| bool_at(row, 0),
                )
                .optional()?;
            if archived != Some(false) {
                return Err(StoreError::NotFound(Entity::Topic));
            }

            tx.execute(
                "UPDATE topics SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
                params![cmd.name(), cmd.description(), ts, id.to_string()],
            )?;

            if let Some(names) = cmd.tags() {
                let tag_ids = resolve_or_create_tags(tx, names)?;
                let outcome = sync_associations(tx, TagTarget::Topic(id), &tag_ids)?;
                tracing::debug!(
                    topic_id = %id,
                    added = outcome.added,
                    removed = outcome.removed,
                    "topic tags synced"
                );
            }

            project_topic(tx, id, TopicScope::Dashboard)
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Topic`].
fn row_to_topic(row: &rusqlite::Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        id: uuid_at(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        is_archived: bool_at(row, 3)?,
        created_at: ts_at(row, 4)?,
        updated_at: ts_at(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(name: &str, tags: &[&str]) -> TopicCommand {
        let tags = tags.iter().map(|s| s.to_string()).collect();
        TopicCommand::new(name, Some("about it".into()), Some(tags)).unwrap()
    }

    #[test]
    fn create_returns_view() {
        let mut db = Database::open_in_memory().unwrap();
        let view = db.create_topic(&topic("Books", &["reading", "Fiction"])).unwrap();

        assert_eq!(view.name, "Books");
        assert_eq!(view.description.as_deref(), Some("about it"));
        assert!(!view.is_archived);
        assert_eq!(view.idea_count, 0);
        assert_eq!(view.tags, vec!["Fiction", "reading"]);
        assert_eq!(view.created_at, view.updated_at);

        let row = db.get_topic(view.id).unwrap();
        assert_eq!(row.created_at, view.created_at);
    }

    #[test]
    fn duplicate_name_is_constraint_violation() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_topic(&topic("Books", &[])).unwrap();

        let err = db.create_topic(&topic("Books", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn duplicate_name_of_archived_topic_still_collides() {
        let mut db = Database::open_in_memory().unwrap();
        let first = db.create_topic(&topic("Books", &[])).unwrap();
        db.archive_topic(first.id).unwrap();

        let err = db.create_topic(&topic("Books", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn names_differing_in_case_do_not_collide() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_topic(&topic("Books", &[])).unwrap();
        assert!(db.create_topic(&topic("books", &[])).is_ok());
    }

    #[test]
    fn failed_create_leaves_no_tags_behind() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_topic(&topic("Books", &[])).unwrap();
        db.create_topic(&topic("Books", &["fresh"])).unwrap_err();

        assert!(db.find_tag("fresh").unwrap().is_none());
    }

    #[test]
    fn update_replaces_tags_only_when_given() {
        let mut db = Database::open_in_memory().unwrap();
        let view = db.create_topic(&topic("Books", &["a", "b"])).unwrap();

        let keep = TopicCommand::new("Novels", None, None).unwrap();
        let updated = db.update_topic(view.id, &keep).unwrap();
        assert_eq!(updated.name, "Novels");
        assert_eq!(updated.description, None);
        assert_eq!(updated.tags, vec!["a", "b"]);

        let updated = db.update_topic(view.id, &topic("Novels", &["c"])).unwrap();
        assert_eq!(updated.tags, vec!["c"]);
    }

    #[test]
    fn update_archived_or_missing_topic_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let view = db.create_topic(&topic("Books", &[])).unwrap();
        db.archive_topic(view.id).unwrap();

        let err = db.update_topic(view.id, &topic("X", &[])).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::Topic)));

        let err = db.update_topic(Uuid::new_v4(), &topic("X", &[])).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(Entity::Topic)));
    }

    #[test]
    fn rename_onto_existing_name_fails() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_topic(&topic("Books", &[])).unwrap();
        let other = db.create_topic(&topic("Films", &[])).unwrap();

        let err = db.update_topic(other.id, &topic("Books", &[])).unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }
}
