// MIT License
// Copyright (c) 2024 Graham King

use std::fmt;
use std::fs::File;
use std::io;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::video;

const CSV_HEADER: [&str; 5] = [
    "video_id",
    "title",
    "publish_date",
    "comment_count",
    "transcript_text",
];

/// The only orderings an export can ask for. Each maps to a fixed ORDER BY
/// fragment; user text never reaches the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    PublishDateAsc,
    PublishDateDesc,
    LikesDesc,
    ViewsDesc,
    DurationAsc,
    DurationDesc,
    CommentCountAsc,
    CommentCountDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        SortKey::PublishDateDesc,
        SortKey::PublishDateAsc,
        SortKey::LikesDesc,
        SortKey::ViewsDesc,
        SortKey::DurationDesc,
        SortKey::DurationAsc,
        SortKey::CommentCountDesc,
        SortKey::CommentCountAsc,
    ];

    pub fn sql(&self) -> &'static str {
        use SortKey::*;
        match self {
            PublishDateAsc => "publish_date ASC",
            PublishDateDesc => "publish_date DESC",
            LikesDesc => "likes DESC",
            ViewsDesc => "views DESC",
            DurationAsc => "duration ASC",
            DurationDesc => "duration DESC",
            CommentCountAsc => "comment_count ASC",
            CommentCountDesc => "comment_count DESC",
        }
    }

    pub fn label(&self) -> &'static str {
        use SortKey::*;
        match self {
            PublishDateAsc => "oldest",
            PublishDateDesc => "newest",
            LikesDesc => "most-liked",
            ViewsDesc => "most-viewed",
            DurationAsc => "shortest",
            DurationDesc => "longest",
            CommentCountAsc => "least-commented",
            CommentCountDesc => "most-commented",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql())
    }
}

/// Accepts "views DESC" style (any case, any spacing) or a label like "newest"
impl FromStr for SortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ")
            .to_lowercase();
        let found = SortKey::ALL.into_iter().find(|k| {
            k.sql().to_lowercase() == wanted || k.label() == wanted
        });
        match (found, wanted.as_str()) {
            (Some(k), _) => Ok(k),
            // What the old desktop form called it
            (None, "most-watched") => Ok(SortKey::ViewsDesc),
            (None, _) => Err(Error::InvalidSortKey(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Json,
    Csv,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

#[derive(Debug)]
pub struct ExportRequest {
    pub channel_id: String,
    pub sort: SortKey,
    pub limit: NonZeroUsize,
    pub format: Format,
}

/// One exported video. Field order here is the output field order.
#[derive(Debug, PartialEq, serde::Serialize)]
pub struct ExportRecord {
    pub video_id: String,
    pub title: String,
    pub publish_date: String,
    pub comment_count: i64,
    pub transcript_text: String,
}

/// Videos of one channel with their transcripts, ordered and truncated.
/// Ties keep the order the videos were stored in.
pub fn query(
    db_conn: &rusqlite::Connection,
    channel_id: &str,
    sort: SortKey,
    limit: NonZeroUsize,
) -> Result<Vec<ExportRecord>> {
    let sql = format!(
        r#"SELECT video_id, title, publish_date, comment_count
           FROM videos
           WHERE channel_id = ?1
           ORDER BY {}, rowid
           LIMIT ?2"#,
        sort.sql()
    );
    let mut stmt = db_conn.prepare(&sql)?;
    let rows = stmt.query_map((channel_id, limit.get()), |row| {
        let title: Option<String> = row.get(1)?;
        let publish_date: Option<String> = row.get(2)?;
        let comment_count: Option<i64> = row.get(3)?;
        Ok(ExportRecord {
            video_id: row.get(0)?,
            title: title.unwrap_or_default(),
            publish_date: publish_date.unwrap_or_default(),
            comment_count: comment_count.unwrap_or(0),
            transcript_text: String::new(),
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        let mut record = r?;
        record.transcript_text = aggregate(db_conn, &record.video_id)?;
        out.push(record);
    }
    Ok(out)
}

// Caption lines of one video in time order, joined with single spaces.
// Empty string when there are none.
fn aggregate(db_conn: &rusqlite::Connection, video_id: &str) -> Result<String> {
    let mut stmt = db_conn.prepare_cached(
        "SELECT text FROM transcripts WHERE video_id = ?1 ORDER BY start_time, id",
    )?;
    let mut lines: Vec<String> = Vec::new();
    let mut rows = stmt.query([video_id])?;
    while let Some(row) = rows.next()? {
        let text: Option<String> = row.get(0)?;
        lines.extend(text);
    }
    Ok(video::join_lines(lines.iter().map(String::as_str)))
}

/// Stored transcript of one video, None if we don't have the video
pub fn transcript_text(db_conn: &rusqlite::Connection, video_id: &str) -> Result<Option<String>> {
    let mut stmt = db_conn.prepare("SELECT 1 FROM videos WHERE video_id = ?1")?;
    if !stmt.exists([video_id])? {
        return Ok(None);
    }
    Ok(Some(aggregate(db_conn, video_id)?))
}

pub fn write_json(w: &mut dyn Write, records: &[ExportRecord]) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, records)?;
    writeln!(w)?;
    Ok(())
}

// The header goes out even with no rows, so an empty export is still a
// well formed file.
pub fn write_csv(w: &mut dyn Write, records: &[ExportRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(w);
    writer.write_record(CSV_HEADER)?;
    for r in records {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn filename(channel_id: &str, format: Format) -> String {
    let safe: String = channel_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("transcripts_{safe}.{}", format.extension())
}

/// Run the export and write it into `dir`. Returns the file written and how
/// many videos went in it.
pub fn export_file(
    db_conn: &rusqlite::Connection,
    req: &ExportRequest,
    dir: &path::Path,
) -> Result<(path::PathBuf, usize)> {
    let records = query(db_conn, &req.channel_id, req.sort, req.limit)?;
    let out_path = dir.join(filename(&req.channel_id, req.format));
    let mut writer = io::BufWriter::new(File::create(&out_path)?);
    match req.format {
        Format::Json => write_json(&mut writer, &records)?,
        Format::Csv => write_csv(&mut writer, &records)?,
    }
    writer.flush()?;
    Ok((out_path, records.len()))
}

#[derive(Debug, PartialEq)]
pub struct ChannelSummary {
    pub channel_id: String,
    pub channel_name: String,
    pub videos: usize,
}

pub fn channels(db_conn: &rusqlite::Connection) -> Result<Vec<ChannelSummary>> {
    let mut stmt = db_conn.prepare(
        r#"SELECT channel_id, MAX(COALESCE(channel_name, '')), COUNT(*)
           FROM videos
           GROUP BY channel_id
           ORDER BY channel_id"#,
    )?;
    let rows = stmt.query_map((), |row| {
        let channel_id: Option<String> = row.get(0)?;
        Ok(ChannelSummary {
            channel_id: channel_id.unwrap_or_default(),
            channel_name: row.get(1)?,
            videos: row.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for c in rows {
        out.push(c?);
    }
    Ok(out)
}

pub fn titles(db_conn: &rusqlite::Connection) -> Result<Vec<(String, String)>> {
    let mut stmt = db_conn.prepare("SELECT video_id, title FROM videos ORDER BY rowid")?;
    let rows = stmt.query_map((), |row| {
        let title: Option<String> = row.get(1)?;
        Ok((row.get::<_, String>(0)?, title.unwrap_or_default()))
    })?;
    let mut out = Vec::new();
    for t in rows {
        out.push(t?);
    }
    Ok(out)
}
