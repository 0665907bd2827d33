// MIT License
// Copyright (c) 2024 Graham King

use std::path;

use log::info;

use crate::error::{Error, Result};

// Shape of the first release. Later columns arrive through MIGRATIONS so that
// stores created by older versions catch up.
pub const CREATE_VIDEOS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS videos (
    video_id TEXT PRIMARY KEY,
    title TEXT,
    channel_id TEXT,
    channel_name TEXT,
    publish_date TEXT
)
"#;

// The foreign key is declarative only. Bundled sqlite enforces foreign keys by
// default, so ensure_schema switches that off for each connection.
pub const CREATE_TRANSCRIPTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS transcripts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    video_id TEXT,
    start_time REAL,
    text TEXT,
    FOREIGN KEY (video_id) REFERENCES videos (video_id)
)
"#;

pub const CREATE_TRANSCRIPTS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_transcripts_video ON transcripts (video_id)";

/// An additive column on the `videos` table.
#[derive(Debug)]
pub struct Migration {
    pub column: &'static str,
    pub definition: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        column: "likes",
        definition: "INTEGER DEFAULT 0",
    },
    Migration {
        column: "views",
        definition: "INTEGER DEFAULT 0",
    },
    Migration {
        column: "duration",
        definition: "INTEGER DEFAULT 0",
    },
    Migration {
        column: "comment_count",
        definition: "INTEGER DEFAULT 0",
    },
    Migration {
        column: "channel_name",
        definition: "TEXT DEFAULT ''",
    },
];

#[derive(Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub decl_type: String,
    pub default: Option<String>,
}

/// Open the store at `db_path` and bring its schema up to date.
pub fn open(db_path: &path::Path) -> Result<rusqlite::Connection> {
    let db_conn = rusqlite::Connection::open(db_path)?;
    ensure_schema(&db_conn)?;
    Ok(db_conn)
}

pub fn ensure_schema(db_conn: &rusqlite::Connection) -> Result<()> {
    db_conn.execute_batch("PRAGMA foreign_keys = OFF")?;
    create_tables(db_conn)?;
    migrate(db_conn)?;
    Ok(())
}

pub fn create_tables(db_conn: &rusqlite::Connection) -> Result<()> {
    db_conn.execute(CREATE_VIDEOS_TABLE, ())?;
    db_conn.execute(CREATE_TRANSCRIPTS_TABLE, ())?;
    db_conn.execute(CREATE_TRANSCRIPTS_INDEX, ())?;
    Ok(())
}

/// Apply every migration whose column is missing. Safe to run any number of
/// times. Returns the columns that were added.
pub fn migrate(db_conn: &rusqlite::Connection) -> Result<Vec<&'static str>> {
    let mut applied = Vec::new();
    for m in MIGRATIONS {
        if has_column(db_conn, "videos", m.column)? {
            continue;
        }
        add_column(db_conn, m)?;
        info!("Added column videos.{}", m.column);
        applied.push(m.column);
    }
    Ok(applied)
}

/// ALTER TABLE ADD COLUMN is not idempotent in sqlite, so adding a column
/// that is already there is an error. Use `migrate` unless you want that.
pub fn add_column(db_conn: &rusqlite::Connection, m: &Migration) -> Result<()> {
    if has_column(db_conn, "videos", m.column)? {
        return Err(Error::Schema(format!(
            "column videos.{} already exists",
            m.column
        )));
    }
    // Only ever called with entries from MIGRATIONS, never with user text
    let sql = format!("ALTER TABLE videos ADD COLUMN {} {}", m.column, m.definition);
    db_conn.execute(&sql, ())?;
    Ok(())
}

pub fn has_column(db_conn: &rusqlite::Connection, table: &str, column: &str) -> Result<bool> {
    let count: i64 = db_conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
        (table, column),
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn columns(db_conn: &rusqlite::Connection, table: &str) -> Result<Vec<Column>> {
    let mut stmt = db_conn
        .prepare("SELECT name, type, dflt_value FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt.query_map([table], |row| {
        Ok(Column {
            name: row.get(0)?,
            decl_type: row.get(1)?,
            default: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}
