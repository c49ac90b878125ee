//! Database schema definitions
//!
//! Parent metadata and content items live in their own tables, each keyed
//! back to `analyses` by foreign key.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per creator analysis
CREATE TABLE IF NOT EXISTS analyses (
    analysis_id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    display_name TEXT NOT NULL,
    status TEXT NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);
CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);

-- Channel or profile metadata, at most one per analysis
CREATE TABLE IF NOT EXISTS parents (
    analysis_id TEXT PRIMARY KEY REFERENCES analyses(analysis_id) ON DELETE CASCADE,
    platform TEXT NOT NULL,
    subject_id TEXT NOT NULL,
    username TEXT,
    display_name TEXT NOT NULL,
    description TEXT,
    profile_url TEXT,
    avatar_url TEXT,
    audience_size INTEGER,
    following_count INTEGER,
    media_count INTEGER,
    total_views INTEGER,
    is_verified INTEGER,
    is_private INTEGER,
    uploads_playlist_id TEXT,
    fetched_at TEXT NOT NULL
);

-- Videos, reels and posts
CREATE TABLE IF NOT EXISTS content_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    analysis_id TEXT NOT NULL REFERENCES analyses(analysis_id) ON DELETE CASCADE,
    item_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    url TEXT NOT NULL,
    thumbnail_url TEXT,
    caption TEXT NOT NULL,
    view_count INTEGER NOT NULL DEFAULT 0,
    like_count INTEGER NOT NULL DEFAULT 0,
    comment_count INTEGER NOT NULL DEFAULT 0,
    date_posted TEXT,
    duration_seconds INTEGER,
    hashtags TEXT NOT NULL DEFAULT '[]',
    mentions TEXT NOT NULL DEFAULT '[]',
    UNIQUE(analysis_id, item_id)
);

CREATE INDEX IF NOT EXISTS idx_content_items_analysis ON content_items(analysis_id);

-- Bulk oEmbed lookup runs
CREATE TABLE IF NOT EXISTS batch_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL,
    total_urls INTEGER NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    succeeded INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

-- Per-URL outcome of a lookup run
CREATE TABLE IF NOT EXISTS batch_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    batch_id INTEGER NOT NULL REFERENCES batch_runs(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    item_json TEXT,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_batch_results_batch ON batch_results(batch_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
