//! Archive, restore and permanent delete.
//!
//! Each entity moves `active -> archived -> purged`, with `archived ->
//! active` allowed through restore. Topic transitions always carry the
//! topic's ideas along; an idea can only be restored on its own while its
//! topic is active. Every transition reads the current state first, returns
//! the precondition error without writing anything, and otherwise applies
//! all of its row changes in one transaction.

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Entity, Result, StoreError};
use crate::models::{IdeaView, PurgeReport, TopicView};
use crate::projections::{project_idea, project_topic, TopicScope};
use crate::row::{bool_at, format_ts, now, uuid_at};
use crate::tags::purge_orphaned_tags;

impl Database {
    // ------------------------------------------------------------------
    // Archive
    // ------------------------------------------------------------------

    /// Archive an active topic together with every idea it owns. All touched
    /// rows get the same `updated_at`.
    pub fn archive_topic(&mut self, id: Uuid) -> Result<()> {
        let ts = format_ts(&now());

        let ideas = self.write(|tx| {
            match topic_archived(tx, id)? {
                Some(false) => {}
                _ => return Err(StoreError::NotFound(Entity::Topic)),
            }
            set_topic_archived(tx, id, true, &ts)
        })?;

        tracing::info!(topic_id = %id, ideas, "topic archived");
        Ok(())
    }

    /// Archive a single active idea. The owning topic is untouched.
    pub fn archive_idea(&mut self, id: Uuid) -> Result<()> {
        let ts = format_ts(&now());

        self.write(|tx| {
            match idea_state(tx, id)? {
                None => Err(StoreError::NotFound(Entity::Idea)),
                Some(state) if state.archived => Err(StoreError::InvalidState {
                    entity: Entity::Idea,
                    reason: "already archived",
                }),
                Some(_) => set_idea_archived(tx, id, true, &ts),
            }
        })?;

        tracing::info!(idea_id = %id, "idea archived");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Restore
    // ------------------------------------------------------------------

    /// Restore an archived topic and every idea it owns, including ideas
    /// that had been archived individually before the topic was.
    pub fn restore_topic(&mut self, id: Uuid) -> Result<TopicView> {
        let ts = format_ts(&now());

        let view = self.write(|tx| {
            match topic_archived(tx, id)? {
                None => return Err(StoreError::NotFound(Entity::Topic)),
                Some(false) => {
                    return Err(StoreError::InvalidState {
                        entity: Entity::Topic,
                        reason: "not archived",
                    })
                }
                Some(true) => {}
            }
            set_topic_archived(tx, id, false, &ts)?;
            project_topic(tx, id, TopicScope::Dashboard)
        })?;

        tracing::info!(topic_id = %id, ideas = view.idea_count, "topic restored");
        Ok(view)
    }

    /// Restore an archived idea whose topic is active.
    ///
    /// Fails with [`StoreError::ParentArchived`] while the topic is archived;
    /// restoring the topic restores the idea as well.
    pub fn restore_idea(&mut self, id: Uuid) -> Result<IdeaView> {
        let ts = format_ts(&now());

        let view = self.write(|tx| {
            let state = idea_state(tx, id)?.ok_or(StoreError::NotFound(Entity::Idea))?;
            if !state.archived {
                return Err(StoreError::InvalidState {
                    entity: Entity::Idea,
                    reason: "not archived",
                });
            }
            if state.topic_archived {
                return Err(StoreError::ParentArchived {
                    topic_id: state.topic_id,
                    topic_name: state.topic_name,
                });
            }
            set_idea_archived(tx, id, false, &ts)?;
            project_idea(tx, id)
        })?;

        tracing::info!(idea_id = %id, "idea restored");
        Ok(view)
    }

    // ------------------------------------------------------------------
    // Permanent delete
    // ------------------------------------------------------------------

    /// Permanently delete an archived topic. Its ideas, their tag links and
    /// feedback, and the topic's own tag links go with it through the schema
    /// cascades; tags left unreferenced are then swept.
    pub fn purge_topic(&mut self, id: Uuid) -> Result<PurgeReport> {
        let report = self.write(|tx| {
            if topic_archived(tx, id)? != Some(true) {
                return Err(StoreError::NotFound(Entity::Topic));
            }

            let ideas_removed: i64 = tx.query_row(
                "SELECT COUNT(*) FROM ideas WHERE topic_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM topics WHERE id = ?1", params![id.to_string()])?;

            Ok(PurgeReport {
                ideas_removed: ideas_removed.max(0) as usize,
                tags_removed: purge_orphaned_tags(tx)?,
            })
        })?;

        tracing::info!(
            topic_id = %id,
            ideas_removed = report.ideas_removed,
            tags_removed = report.tags_removed,
            "topic permanently deleted"
        );
        Ok(report)
    }

    /// Permanently delete an archived idea, its tag links and feedback, then
    /// sweep unreferenced tags.
    pub fn purge_idea(&mut self, id: Uuid) -> Result<PurgeReport> {
        let report = self.write(|tx| {
            match idea_state(tx, id)? {
                Some(state) if state.archived => {}
                _ => return Err(StoreError::NotFound(Entity::Idea)),
            }

            tx.execute("DELETE FROM ideas WHERE id = ?1", params![id.to_string()])?;

            Ok(PurgeReport {
                ideas_removed: 1,
                tags_removed: purge_orphaned_tags(tx)?,
            })
        })?;

        tracing::info!(
            idea_id = %id,
            tags_removed = report.tags_removed,
            "idea permanently deleted"
        );
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct IdeaState {
    archived: bool,
    topic_id: Uuid,
    topic_name: String,
    topic_archived: bool,
}

/// `None` if the topic doesn't exist, otherwise its archived flag.
fn topic_archived(conn: &Connection, id: Uuid) -> Result<Option<bool>> {
    conn.query_row(
        "SELECT is_archived FROM topics WHERE id = ?1",
        params![id.to_string()],
        |row| bool_at(row, 0),
    )
    .optional()
    .map_err(StoreError::from)
}

fn idea_state(conn: &Connection, id: Uuid) -> Result<Option<IdeaState>> {
    conn.query_row(
        "SELECT i.is_archived, t.id, t.name, t.is_archived
         FROM ideas i
         JOIN topics t ON t.id = i.topic_id
         WHERE i.id = ?1",
        params![id.to_string()],
        |row| {
            Ok(IdeaState {
                archived: bool_at(row, 0)?,
                topic_id: uuid_at(row, 1)?,
                topic_name: row.get(2)?,
                topic_archived: bool_at(row, 3)?,
            })
        },
    )
    .optional()
    .map_err(StoreError::from)
}

/// Flip a topic and all of its ideas. Returns how many ideas were touched.
fn set_topic_archived(conn: &Connection, id: Uuid, archived: bool, ts: &str) -> Result<usize> {
    conn.execute(
        "UPDATE topics SET is_archived = ?1, updated_at = ?2 WHERE id = ?3",
        params![archived as i64, ts, id.to_string()],
    )?;
    let ideas = conn.execute(
        "UPDATE ideas SET is_archived = ?1, updated_at = ?2 WHERE topic_id = ?3",
        params![archived as i64, ts, id.to_string()],
    )?;
    Ok(ideas)
}

fn set_idea_archived(conn: &Connection, id: Uuid, archived: bool, ts: &str) -> Result<()> {
    conn.execute(
        "UPDATE ideas SET is_archived = ?1, updated_at = ?2 WHERE id = ?3",
        params![archived as i64, ts, id.to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaboard_shared::{FeedbackCommand, IdeaCommand, TopicCommand};

    fn topic(db: &mut Database, name: &str, tags: &[&str]) -> Uuid {
        let tags = tags.iter().map(|s| s.to_string()).collect();
        db.create_topic(&TopicCommand::new(name, None, Some(tags)).unwrap())
            .unwrap()
            .id
    }

    fn idea(db: &mut Database, topic_id: Uuid, name: &str, tags: &[&str]) -> Uuid {
        let tags = tags.iter().map(|s| s.to_string()).collect();
        db.create_idea(&IdeaCommand::new(topic_id, name, None, tags).unwrap())
            .unwrap()
            .id
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn archive_topic_cascades_with_one_timestamp() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i1 = idea(&mut db, t, "one", &[]);
        let i2 = idea(&mut db, t, "two", &[]);

        db.archive_topic(t).unwrap();

        let topic_row = db.get_topic(t).unwrap();
        assert!(topic_row.is_archived);
        for id in [i1, i2] {
            let row = db.get_idea(id).unwrap();
            assert!(row.is_archived);
            assert_eq!(row.updated_at, topic_row.updated_at);
        }
    }

    #[test]
    fn archive_topic_twice_or_missing_is_not_found() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        db.archive_topic(t).unwrap();

        assert!(matches!(
            db.archive_topic(t),
            Err(StoreError::NotFound(Entity::Topic))
        ));
        assert!(matches!(
            db.archive_topic(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Topic))
        ));
    }

    #[test]
    fn archive_idea_leaves_topic_and_data_alone() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &["kept"]);
        db.set_feedback(i, &FeedbackCommand::new(4, None).unwrap())
            .unwrap();

        db.archive_idea(i).unwrap();

        assert!(db.get_idea(i).unwrap().is_archived);
        assert!(!db.get_topic(t).unwrap().is_archived);
        assert_eq!(count(&db, "idea_tags"), 1);
        assert_eq!(count(&db, "feedback"), 1);
    }

    #[test]
    fn archive_idea_errors() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &[]);
        db.archive_idea(i).unwrap();

        assert!(matches!(
            db.archive_idea(i),
            Err(StoreError::InvalidState {
                entity: Entity::Idea,
                ..
            })
        ));
        assert!(matches!(
            db.archive_idea(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Idea))
        ));
    }

    #[test]
    fn restore_topic_restores_every_idea() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let earlier = idea(&mut db, t, "archived first", &[]);
        let other = idea(&mut db, t, "archived with topic", &[]);
        db.archive_idea(earlier).unwrap();
        db.archive_topic(t).unwrap();

        let view = db.restore_topic(t).unwrap();

        assert!(!view.is_archived);
        assert_eq!(view.idea_count, 2);
        assert!(!db.get_idea(earlier).unwrap().is_archived);
        assert!(!db.get_idea(other).unwrap().is_archived);
    }

    #[test]
    fn restore_topic_errors() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);

        assert!(matches!(
            db.restore_topic(t),
            Err(StoreError::InvalidState {
                entity: Entity::Topic,
                reason: "not archived"
            })
        ));
        assert!(matches!(
            db.restore_topic(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Topic))
        ));
    }

    #[test]
    fn restore_idea_blocked_by_archived_topic() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "Parent", &[]);
        let i = idea(&mut db, t, "child", &[]);
        db.archive_idea(i).unwrap();
        db.archive_topic(t).unwrap();

        match db.restore_idea(i) {
            Err(StoreError::ParentArchived {
                topic_id,
                topic_name,
            }) => {
                assert_eq!(topic_id, t);
                assert_eq!(topic_name, "Parent");
            }
            other => panic!("expected ParentArchived, got {other:?}"),
        }
        // Nothing was written.
        assert!(db.get_idea(i).unwrap().is_archived);

        db.restore_topic(t).unwrap();
        assert!(!db.get_idea(i).unwrap().is_archived);
        assert!(db.project_idea(i).is_ok());
    }

    #[test]
    fn restore_idea_success_and_errors() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &["x"]);

        assert!(matches!(
            db.restore_idea(i),
            Err(StoreError::InvalidState { .. })
        ));
        assert!(matches!(
            db.restore_idea(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Idea))
        ));

        db.archive_idea(i).unwrap();
        let view = db.restore_idea(i).unwrap();
        assert!(!view.is_archived);
        assert_eq!(view.tags, vec!["x"]);
        assert_eq!(view.topic_name, "T");
    }

    #[test]
    fn purge_topic_cascades_everything() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &["topic-tag"]);
        let i1 = idea(&mut db, t, "one", &["idea-tag"]);
        idea(&mut db, t, "two", &[]);
        db.set_feedback(i1, &FeedbackCommand::new(5, Some("great".into())).unwrap())
            .unwrap();
        db.archive_topic(t).unwrap();

        let report = db.purge_topic(t).unwrap();

        assert_eq!(report.ideas_removed, 2);
        assert_eq!(report.tags_removed, 2);
        for table in ["topics", "ideas", "tags", "topic_tags", "idea_tags", "feedback"] {
            assert_eq!(count(&db, table), 0, "{table} should be empty");
        }
    }

    #[test]
    fn purge_topic_sweeps_only_orphaned_tags() {
        let mut db = Database::open_in_memory().unwrap();
        let gone = topic(&mut db, "Gone", &["x", "y"]);
        let stays = topic(&mut db, "Stays", &["y"]);
        db.archive_topic(gone).unwrap();

        db.purge_topic(gone).unwrap();

        assert!(db.find_tag("x").unwrap().is_none());
        assert!(db.find_tag("y").unwrap().is_some());
        assert_eq!(db.project_topic(stays, TopicScope::Dashboard).unwrap().tags, vec!["y"]);
    }

    #[test]
    fn purge_keeps_tags_referenced_by_ideas_elsewhere() {
        let mut db = Database::open_in_memory().unwrap();
        let gone = topic(&mut db, "Gone", &["shared"]);
        let stays = topic(&mut db, "Stays", &[]);
        idea(&mut db, stays, "uses it", &["Shared"]);
        db.archive_topic(gone).unwrap();

        assert_eq!(db.purge_topic(gone).unwrap().tags_removed, 0);
        assert_eq!(db.list_tags().unwrap(), vec!["shared"]);
    }

    #[test]
    fn purge_topic_requires_archived_topic() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);

        assert!(matches!(
            db.purge_topic(t),
            Err(StoreError::NotFound(Entity::Topic))
        ));
        assert!(matches!(
            db.purge_topic(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Topic))
        ));
        assert!(db.get_topic(t).is_ok());
    }

    #[test]
    fn purge_idea_removes_dependents_and_orphans() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &["kept"]);
        let i = idea(&mut db, t, "one", &["kept", "only-here"]);
        db.set_feedback(i, &FeedbackCommand::new(1, None).unwrap())
            .unwrap();
        db.archive_idea(i).unwrap();

        let report = db.purge_idea(i).unwrap();

        assert_eq!(report.tags_removed, 1);
        assert!(matches!(db.get_idea(i), Err(StoreError::NotFound(Entity::Idea))));
        assert_eq!(count(&db, "feedback"), 0);
        assert_eq!(count(&db, "idea_tags"), 0);
        assert_eq!(db.list_tags().unwrap(), vec!["kept"]);
        assert!(!db.get_topic(t).unwrap().is_archived);
    }

    #[test]
    fn purge_idea_requires_archived_idea() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &[]);

        assert!(matches!(
            db.purge_idea(i),
            Err(StoreError::NotFound(Entity::Idea))
        ));
        assert!(matches!(
            db.purge_idea(Uuid::new_v4()),
            Err(StoreError::NotFound(Entity::Idea))
        ));
    }

    #[test]
    fn archived_topic_hides_its_ideas() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &[]);
        assert!(db.project_idea(i).is_ok());

        db.archive_topic(t).unwrap();

        assert!(db.get_idea(i).unwrap().is_archived);
        assert!(matches!(
            db.project_idea(i),
            Err(StoreError::NotFound(Entity::Idea))
        ));
    }

    #[test]
    fn idea_is_hidden_by_topic_flag_alone() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        let i = idea(&mut db, t, "one", &[]);

        // Only the topic row flipped, as if observed mid-cascade.
        db.conn()
            .execute(
                "UPDATE topics SET is_archived = 1 WHERE id = ?1",
                params![t.to_string()],
            )
            .unwrap();

        assert!(!db.get_idea(i).unwrap().is_archived);
        assert!(matches!(
            db.project_idea(i),
            Err(StoreError::NotFound(Entity::Idea))
        ));
    }

    #[test]
    fn all_ideas_of_archived_topic_listed_in_archive() {
        let mut db = Database::open_in_memory().unwrap();
        let t = topic(&mut db, "T", &[]);
        idea(&mut db, t, "one", &[]);
        idea(&mut db, t, "two", &[]);
        db.archive_topic(t).unwrap();

        let archived = db.list_archived_ideas().unwrap();
        assert_eq!(archived.len(), 2);
        assert!(archived.iter().all(|i| i.topic_name == "T"));
        assert_eq!(db.list_ideas_for_topic(t).unwrap().len(), 2);
    }
}
