//! v001 -- Initial schema creation.
//!
//! Creates `topics`, `ideas`, `tags`, the two tag join tables, and
//! `feedback`. Every owning foreign key cascades on delete.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Topics
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS topics (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    name        TEXT NOT NULL UNIQUE,         -- exact match, case-sensitive
    description TEXT,
    is_archived INTEGER NOT NULL DEFAULT 0,   -- boolean 0/1
    created_at  TEXT NOT NULL,                -- RFC-3339, millisecond precision
    updated_at  TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Ideas
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS ideas (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    topic_id    TEXT NOT NULL,                -- FK -> topics(id)
    name        TEXT NOT NULL,
    description TEXT,
    is_archived INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_ideas_topic_id ON ideas(topic_id);

-- ----------------------------------------------------------------
-- Tags
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tags (
    id       TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    name     TEXT NOT NULL,                   -- first-inserted casing
    name_key TEXT NOT NULL UNIQUE             -- lowercased lookup key
);

CREATE TABLE IF NOT EXISTS topic_tags (
    topic_id TEXT NOT NULL,
    tag_id   TEXT NOT NULL,

    PRIMARY KEY (topic_id, tag_id),
    FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id)   REFERENCES tags(id)   ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_topic_tags_tag_id ON topic_tags(tag_id);

CREATE TABLE IF NOT EXISTS idea_tags (
    idea_id TEXT NOT NULL,
    tag_id  TEXT NOT NULL,

    PRIMARY KEY (idea_id, tag_id),
    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id)  REFERENCES tags(id)  ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_idea_tags_tag_id ON idea_tags(tag_id);

-- ----------------------------------------------------------------
-- Feedback (zero or one per idea)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS feedback (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    idea_id    TEXT NOT NULL UNIQUE,          -- FK -> ideas(id)
    rating     INTEGER NOT NULL CHECK (rating >= 1 AND rating <= 5),
    notes      TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (idea_id) REFERENCES ideas(id) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
