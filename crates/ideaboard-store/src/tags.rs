//! Tag resolution and association sync.
//!
//! Tags are global and deduplicated case-insensitively: "JavaScript" and
//! "javascript" are the same tag, and whichever casing was inserted first is
//! the one shown. Uniqueness lives in the schema (`UNIQUE(name_key)`), and
//! resolution uses an atomic insert-if-absent followed by a lookup, so two
//! writers racing on a brand-new name still converge on one row.

use std::collections::HashSet;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Tag;
use crate::row::uuid_at;

/// The entity whose tag associations are being read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTarget {
    Topic(Uuid),
    Idea(Uuid),
}

impl TagTarget {
    fn id(&self) -> Uuid {
        match self {
            TagTarget::Topic(id) | TagTarget::Idea(id) => *id,
        }
    }

    /// Join table and owner column.
    fn join(&self) -> (&'static str, &'static str) {
        match self {
            TagTarget::Topic(_) => ("topic_tags", "topic_id"),
            TagTarget::Idea(_) => ("idea_tags", "idea_id"),
        }
    }
}

/// Rows touched by [`sync_associations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    pub added: usize,
    pub removed: usize,
}

impl Database {
    /// Resolve tag names to ids, creating any that don't exist yet.
    pub fn resolve_or_create_tags(&mut self, names: &[String]) -> Result<Vec<Uuid>> {
        self.write(|tx| resolve_or_create_tags(tx, names))
    }

    /// Make `target`'s tags exactly `names` (after resolution).
    ///
    /// The target must exist; the join tables' foreign keys reject anything
    /// else as a constraint violation.
    pub fn sync_tags(&mut self, target: TagTarget, names: &[String]) -> Result<Vec<Uuid>> {
        self.write(|tx| {
            let ids = resolve_or_create_tags(tx, names)?;
            sync_associations(tx, target, &ids)?;
            Ok(ids)
        })
    }

    /// Ids of the tags currently associated with `target`.
    pub fn tag_ids_for(&self, target: TagTarget) -> Result<HashSet<Uuid>> {
        associated_tag_ids(self.conn(), target)
    }

    /// Every tag name, sorted case-insensitively.
    pub fn list_tags(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT name FROM tags ORDER BY name_key ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<String>, _>>()
            .map_err(StoreError::from)
    }

    /// Look up a tag by name, ignoring case.
    pub fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        let key = name_key(name.trim());
        self.conn()
            .query_row(
                "SELECT id, name FROM tags WHERE name_key = ?1",
                params![key],
                |row| {
                    Ok(Tag {
                        id: uuid_at(row, 0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::from)
    }
}

// ---------------------------------------------------------------------------
// Transaction-level operations
// ---------------------------------------------------------------------------

/// Trim each name, drop blanks, and resolve to tag ids in input order with
/// duplicates (by resolved id) removed.
pub(crate) fn resolve_or_create_tags(conn: &Connection, names: &[String]) -> Result<Vec<Uuid>> {
    let mut ids = Vec::with_capacity(names.len());
    let mut seen = HashSet::new();

    for raw in names {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        let id = resolve_one(conn, name)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

fn resolve_one(conn: &Connection, name: &str) -> Result<Uuid> {
    let key = name_key(name);

    if let Some(id) = lookup(conn, &key)? {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    let inserted = conn.execute(
        "INSERT INTO tags (id, name, name_key) VALUES (?1, ?2, ?3)
         ON CONFLICT(name_key) DO NOTHING",
        params![id.to_string(), name, key],
    )?;
    if inserted == 1 {
        tracing::debug!(tag_id = %id, name, "created tag");
        return Ok(id);
    }

    // Someone else created it between our lookup and insert.
    lookup(conn, &key)?.ok_or_else(|| {
        StoreError::Constraint(format!("tag {name:?} vanished during creation"))
    })
}

fn lookup(conn: &Connection, key: &str) -> Result<Option<Uuid>> {
    conn.query_row(
        "SELECT id FROM tags WHERE name_key = ?1",
        params![key],
        |row| uuid_at(row, 0),
    )
    .optional()
    .map_err(StoreError::from)
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

pub(crate) fn associated_tag_ids(conn: &Connection, target: TagTarget) -> Result<HashSet<Uuid>> {
    let (table, owner) = target.join();
    let mut stmt = conn.prepare(&format!("SELECT tag_id FROM {table} WHERE {owner} = ?1"))?;
    let rows = stmt.query_map(params![target.id().to_string()], |row| uuid_at(row, 0))?;
    rows.collect::<std::result::Result<HashSet<_>, _>>()
        .map_err(StoreError::from)
}

/// Link every id to `target`. Already-linked ids are left alone. Used at
/// creation time, when there is nothing to remove.
pub(crate) fn create_associations(
    conn: &Connection,
    target: TagTarget,
    tag_ids: &[Uuid],
) -> Result<usize> {
    let (table, owner) = target.join();
    let mut link = conn.prepare(&format!(
        "INSERT OR IGNORE INTO {table} ({owner}, tag_id) VALUES (?1, ?2)"
    ))?;

    let owner_id = target.id().to_string();
    let mut added = 0;
    for tag_id in tag_ids {
        added += link.execute(params![owner_id, tag_id.to_string()])?;
    }
    Ok(added)
}

/// Reconcile `target`'s associations so they equal `desired` as a set.
pub(crate) fn sync_associations(
    conn: &Connection,
    target: TagTarget,
    desired: &[Uuid],
) -> Result<SyncOutcome> {
    let current = associated_tag_ids(conn, target)?;
    let desired_set: HashSet<Uuid> = desired.iter().copied().collect();

    let missing: Vec<Uuid> = desired
        .iter()
        .filter(|id| !current.contains(id))
        .copied()
        .collect();
    let added = create_associations(conn, target, &missing)?;

    let (table, owner) = target.join();
    let mut unlink = conn.prepare(&format!(
        "DELETE FROM {table} WHERE {owner} = ?1 AND tag_id = ?2"
    ))?;
    let owner_id = target.id().to_string();
    let mut removed = 0;
    for stale in current.difference(&desired_set) {
        removed += unlink.execute(params![owner_id, stale.to_string()])?;
    }

    Ok(SyncOutcome { added, removed })
}

/// Tag names linked to `target`, sorted case-insensitively.
pub(crate) fn tag_names_for(conn: &Connection, target: TagTarget) -> Result<Vec<String>> {
    let (table, owner) = target.join();
    let mut stmt = conn.prepare(&format!(
        "SELECT t.name FROM {table} j
         JOIN tags t ON t.id = j.tag_id
         WHERE j.{owner} = ?1
         ORDER BY t.name_key ASC"
    ))?;
    let rows = stmt.query_map(params![target.id().to_string()], |row| row.get(0))?;
    rows.collect::<std::result::Result<Vec<String>, _>>()
        .map_err(StoreError::from)
}

/// Delete every tag no topic or idea references any more. Returns how many
/// were removed.
pub(crate) fn purge_orphaned_tags(conn: &Connection) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM tags
         WHERE id NOT IN (SELECT tag_id FROM topic_tags)
           AND id NOT IN (SELECT tag_id FROM idea_tags)",
        [],
    )?;
    if removed > 0 {
        tracing::debug!(removed, "swept orphaned tags");
    }
    Ok(removed)
}
