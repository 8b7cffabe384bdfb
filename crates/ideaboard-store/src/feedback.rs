//! Feedback attached to ideas: at most one rating (1-5) plus notes per idea.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use ideaboard_shared::FeedbackCommand;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Feedback;
use crate::projections::project_idea;
use crate::row::{format_ts, now, ts_at, uuid_at};

impl Database {
    /// Create or replace the feedback for a visible idea.
    pub fn set_feedback(&mut self, idea_id: Uuid, cmd: &FeedbackCommand) -> Result<Feedback> {
        let ts = format_ts(&now());

        let feedback = self.write(|tx| {
            project_idea(tx, idea_id)?;
            tx.execute(
                "INSERT INTO feedback (id, idea_id, rating, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(idea_id) DO UPDATE SET
                     rating = excluded.rating,
                     notes = excluded.notes,
                     updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    idea_id.to_string(),
                    cmd.rating(),
                    cmd.notes(),
                    ts,
                ],
            )?;
            feedback_for(tx, idea_id)?
                .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })?;

        tracing::debug!(idea_id = %idea_id, rating = feedback.rating, "feedback saved");
        Ok(feedback)
    }

    pub fn get_feedback(&self, idea_id: Uuid) -> Result<Option<Feedback>> {
        feedback_for(self.conn(), idea_id)
    }

    /// Remove a visible idea's feedback. Returns whether there was any.
    pub fn clear_feedback(&mut self, idea_id: Uuid) -> Result<bool> {
        let removed = self.write(|tx| {
            project_idea(tx, idea_id)?;
            Ok(tx.execute(
                "DELETE FROM feedback WHERE idea_id = ?1",
                params![idea_id.to_string()],
            )?)
        })?;
        Ok(removed > 0)
    }
}

fn feedback_for(conn: &Connection, idea_id: Uuid) -> Result<Option<Feedback>> {
    conn.query_row(
        "SELECT id, idea_id, rating, notes, created_at, updated_at
         FROM feedback WHERE idea_id = ?1",
        params![idea_id.to_string()],
        |row| {
            Ok(Feedback {
                id: uuid_at(row, 0)?,
                idea_id: uuid_at(row, 1)?,
                rating: row.get(2)?,
                notes: row.get(3)?,
                created_at: ts_at(row, 4)?,
                updated_at: ts_at(row, 5)?,
            })
        },
    )
    .optional()
    .map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use ideaboard_shared::{IdeaCommand, TopicCommand};

    fn db_with_idea() -> (Database, Uuid) {
        let mut db = Database::open_in_memory().unwrap();
        let topic = db
            .create_topic(&TopicCommand::new("T", None, None).unwrap())
            .unwrap();
        let idea = db
            .create_idea(&IdeaCommand::new(topic.id, "I", None, vec![]).unwrap())
            .unwrap();
        (db, idea.id)
    }

    #[test]
    fn set_then_replace() {
        let (mut db, idea) = db_with_idea();

        let first = db
            .set_feedback(idea, &FeedbackCommand::new(1, Some("meh".into())).unwrap())
            .unwrap();
        assert_eq!(first.rating, 1);

        let second = db
            .set_feedback(idea, &FeedbackCommand::new(5, None).unwrap())
            .unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.rating, 5);
        assert_eq!(second.notes, None);
        assert_eq!(second.created_at, first.created_at);

        let view = db.project_idea(idea).unwrap().feedback.unwrap();
        assert_eq!(view.rating, 5);
    }

    #[test]
    fn rating_outside_range_is_rejected_by_schema() {
        let (db, idea) = db_with_idea();
        for rating in [0, 6] {
            let err = db
                .conn()
                .execute(
                    "INSERT INTO feedback (id, idea_id, rating, created_at, updated_at)
                     VALUES (?1, ?2, ?3, 'x', 'x')",
                    params![Uuid::new_v4().to_string(), idea.to_string(), rating],
                )
                .map_err(StoreError::from)
                .unwrap_err();
            assert!(matches!(err, StoreError::Constraint(_)), "rating {rating}");
        }
    }

    #[test]
    fn hidden_idea_takes_no_feedback() {
        let (mut db, idea) = db_with_idea();
        db.archive_idea(idea).unwrap();

        let cmd = FeedbackCommand::new(3, None).unwrap();
        assert!(matches!(
            db.set_feedback(idea, &cmd),
            Err(StoreError::NotFound(Entity::Idea))
        ));
        assert!(matches!(
            db.set_feedback(Uuid::new_v4(), &cmd),
            Err(StoreError::NotFound(Entity::Idea))
        ));
    }

    #[test]
    fn clear_reports_whether_anything_was_removed() {
        let (mut db, idea) = db_with_idea();
        assert!(!db.clear_feedback(idea).unwrap());

        db.set_feedback(idea, &FeedbackCommand::new(2, None).unwrap())
            .unwrap();
        assert!(db.clear_feedback(idea).unwrap());
        assert!(db.get_feedback(idea).unwrap().is_none());
        assert!(db.project_idea(idea).unwrap().feedback.is_none());
    }
}
