// MIT License
// Copyright (c) 2024 Graham King

use log::{error, info, warn};

use crate::captions::CaptionSource;
use crate::error::{Error, Result};
use crate::video::{self, CaptionLine, Video};

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Stored { lines: usize, text: String },
    /// Captions disabled, missing, or empty. Not a failure.
    Unavailable,
}

#[derive(Debug, Default, PartialEq)]
pub struct Report {
    pub stored: usize,
    pub unavailable: usize,
    pub failed: usize,
}

/// Insert the video unless a row with its id exists. An existing row is
/// never touched. Returns true if we created it.
pub fn insert_video(db_conn: &rusqlite::Connection, v: &Video) -> Result<bool> {
    let n = db_conn.execute(
        r#"INSERT OR IGNORE INTO videos
            (video_id, title, channel_id, channel_name, publish_date,
             likes, views, duration, comment_count)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        rusqlite::params![
            v.id,
            v.title,
            v.channel_id,
            v.channel_name,
            v.publish_date,
            v.likes,
            v.views,
            v.duration,
            v.comment_count,
        ],
    )?;
    Ok(n == 1)
}

pub fn is_stored(db_conn: &rusqlite::Connection, video_id: &str) -> Result<bool> {
    let mut stmt = db_conn.prepare_cached("SELECT 1 FROM videos WHERE video_id = ?1")?;
    Ok(stmt.exists([video_id])?)
}

/// Append every line as a new row, in one transaction.
/// No de-duplication: ingesting a video twice doubles its lines.
pub fn append_captions(
    db_conn: &mut rusqlite::Connection,
    video_id: &str,
    lines: &[CaptionLine],
) -> Result<usize> {
    let tx = db_conn.transaction()?;
    insert_lines(&tx, video_id, lines)?;
    tx.commit()?;
    Ok(lines.len())
}

/// Video row and caption lines committed together
pub fn store(
    db_conn: &mut rusqlite::Connection,
    v: &Video,
    lines: &[CaptionLine],
) -> Result<bool> {
    let tx = db_conn.transaction()?;
    let is_new = insert_video(&tx, v)?;
    insert_lines(&tx, &v.id, lines)?;
    tx.commit()?;
    Ok(is_new)
}

fn insert_lines(
    db_conn: &rusqlite::Connection,
    video_id: &str,
    lines: &[CaptionLine],
) -> Result<()> {
    let mut stmt = db_conn
        .prepare("INSERT INTO transcripts (video_id, start_time, text) VALUES (?1, ?2, ?3)")?;
    for line in lines {
        stmt.execute((video_id, line.start, &line.text))?;
    }
    Ok(())
}

/// Record the video, then fetch its captions and append them.
///
/// The video row is committed before captions are fetched, so a failed fetch
/// leaves the video in the store without a transcript.
pub fn ingest(
    db_conn: &mut rusqlite::Connection,
    v: &Video,
    source: &dyn CaptionSource,
) -> Result<Outcome> {
    if !insert_video(db_conn, v)? {
        warn!("{} is already stored, its captions will be duplicated", v.id);
    }

    let lines = match source.fetch(&v.id) {
        Ok(lines) => lines,
        Err(Error::TranscriptUnavailable(_)) => {
            info!("No transcript for '{}' ({})", v.title, v.id);
            return Ok(Outcome::Unavailable);
        }
        Err(err) => return Err(err),
    };
    if lines.is_empty() {
        info!("Empty transcript for '{}' ({})", v.title, v.id);
        return Ok(Outcome::Unavailable);
    }

    append_captions(db_conn, &v.id, &lines)?;
    info!("Stored {} lines for '{}' ({})", lines.len(), v.title, v.id);

    // Same order the store reads them back in: by start, ties by arrival
    let mut ordered: Vec<&CaptionLine> = lines.iter().collect();
    ordered.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(Outcome::Stored {
        lines: lines.len(),
        text: video::join_lines(ordered.iter().map(|l| l.text.as_str())),
    })
}

/// Ingest videos one after the other. A remote failure skips that video and
/// carries on. Any other failure stops the batch, wrapped with the video id.
pub fn ingest_batch(
    db_conn: &mut rusqlite::Connection,
    videos: &[Video],
    source: &dyn CaptionSource,
    mut on_progress: impl FnMut(usize, &Video),
) -> Result<Report> {
    let mut report = Report::default();
    for (idx, v) in videos.iter().enumerate() {
        on_progress(idx, v);
        match ingest(db_conn, v, source) {
            Ok(Outcome::Stored { .. }) => report.stored += 1,
            Ok(Outcome::Unavailable) => report.unavailable += 1,
            Err(err @ Error::RemoteService { .. }) => {
                error!("Skipping '{}' ({}): {err}", v.title, v.id);
                report.failed += 1;
            }
            Err(err) => {
                return Err(Error::Store {
                    video_id: v.id.clone(),
                    source: Box::new(err),
                })
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::db;

    // Canned captions per video id. Missing ids are unavailable, ids mapped
    // to None are remote failures.
    struct Fake(HashMap<&'static str, Option<Vec<CaptionLine>>>);

    impl CaptionSource for Fake {
        fn fetch(&self, video_id: &str) -> Result<Vec<CaptionLine>> {
            match self.0.get(video_id) {
                Some(Some(lines)) => Ok(lines.clone()),
                Some(None) => Err(Error::remote(video_id, "HTTP error 500")),
                None => Err(Error::TranscriptUnavailable(video_id.to_string())),
            }
        }
    }

    fn setup() -> rusqlite::Connection {
        let db_conn = rusqlite::Connection::open_in_memory().unwrap();
        db::ensure_schema(&db_conn).unwrap();
        db_conn
    }

    fn video(id: &str, title: &str) -> Video {
        Video {
            id: id.to_string(),
            title: title.to_string(),
            channel_id: "UC1".to_string(),
            channel_name: "Channel One".to_string(),
            publish_date: "2024-01-01T00:00:00Z".to_string(),
            ..Default::default()
        }
    }

    fn count(db_conn: &rusqlite::Connection, sql: &str) -> i64 {
        db_conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn reingest_keeps_original_metadata_and_duplicates_lines() {
        let mut db_conn = setup();
        let first = [CaptionLine::new(0.0, "a"), CaptionLine::new(1.5, "b")];
        let second = [CaptionLine::new(0.0, "c")];

        assert!(store(&mut db_conn, &video("aaaaaaaaaaa", "original"), &first).unwrap());
        assert!(!store(&mut db_conn, &video("aaaaaaaaaaa", "renamed"), &second).unwrap());

        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM videos"), 1);
        let title: String = db_conn
            .query_row("SELECT title FROM videos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title, "original");
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM transcripts"), 3);
    }

    #[test]
    fn channel_name_is_stored() {
        let db_conn = setup();
        assert!(!is_stored(&db_conn, "aaaaaaaaaaa").unwrap());
        insert_video(&db_conn, &video("aaaaaaaaaaa", "t")).unwrap();
        assert!(is_stored(&db_conn, "aaaaaaaaaaa").unwrap());
        let name: String = db_conn
            .query_row("SELECT channel_name FROM videos", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Channel One");
    }

    #[test]
    fn ingest_stores_and_returns_text() {
        let mut db_conn = setup();
        let src = Fake(HashMap::from([(
            "aaaaaaaaaaa",
            Some(vec![CaptionLine::new(0.0, "a"), CaptionLine::new(1.5, "b")]),
        )]));
        let out = ingest(&mut db_conn, &video("aaaaaaaaaaa", "t"), &src).unwrap();
        assert_eq!(
            out,
            Outcome::Stored {
                lines: 2,
                text: "a b".to_string()
            }
        );
    }

    #[test]
    fn unavailable_and_empty_keep_the_video() {
        let mut db_conn = setup();
        let src = Fake(HashMap::from([("bbbbbbbbbbb", Some(vec![]))]));
        let out = ingest(&mut db_conn, &video("aaaaaaaaaaa", "t"), &src).unwrap();
        assert_eq!(out, Outcome::Unavailable);
        let out = ingest(&mut db_conn, &video("bbbbbbbbbbb", "t"), &src).unwrap();
        assert_eq!(out, Outcome::Unavailable);
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM videos"), 2);
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM transcripts"), 0);
    }

    #[test]
    fn remote_failure_leaves_video_without_captions() {
        let mut db_conn = setup();
        let src = Fake(HashMap::from([("aaaaaaaaaaa", None)]));
        let err = ingest(&mut db_conn, &video("aaaaaaaaaaa", "t"), &src).unwrap_err();
        assert!(matches!(err, Error::RemoteService { ref item, .. } if item == "aaaaaaaaaaa"));
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM videos"), 1);
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM transcripts"), 0);
    }

    #[test]
    fn batch_continues_past_failures() {
        let mut db_conn = setup();
        let src = Fake(HashMap::from([
            ("aaaaaaaaaaa", Some(vec![CaptionLine::new(0.0, "x")])),
            ("bbbbbbbbbbb", None),
            ("ddddddddddd", Some(vec![CaptionLine::new(0.0, "y")])),
        ]));
        let videos = [
            video("aaaaaaaaaaa", "a"),
            video("bbbbbbbbbbb", "b"),
            video("ccccccccccc", "c"),
            video("ddddddddddd", "d"),
        ];
        let mut seen = Vec::new();
        let report = ingest_batch(&mut db_conn, &videos, &src, |idx, v| {
            seen.push((idx, v.id.clone()))
        })
        .unwrap();
        assert_eq!(
            report,
            Report {
                stored: 2,
                unavailable: 1,
                failed: 1
            }
        );
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[3], (3, "ddddddddddd".to_string()));
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM videos"), 4);
        assert_eq!(count(&db_conn, "SELECT COUNT(*) FROM transcripts"), 2);
    }

    #[test]
    fn text_is_in_time_order() {
        let mut db_conn = setup();
        let src = Fake(HashMap::from([(
            "aaaaaaaaaaa",
            Some(vec![
                CaptionLine::new(3.0, "c"),
                CaptionLine::new(1.0, "a"),
                CaptionLine::new(2.0, "b"),
                CaptionLine::new(2.0, "b2"),
            ]),
        )]));
        let out = ingest(&mut db_conn, &video("aaaaaaaaaaa", "t"), &src).unwrap();
        let stored = crate::export::transcript_text(&db_conn, "aaaaaaaaaaa").unwrap();
        assert_eq!(stored.as_deref(), Some("a b b2 c"));
        assert_eq!(
            out,
            Outcome::Stored {
                lines: 4,
                text: "a b b2 c".to_string()
            }
        );
    }

    #[test]
    fn batch_store_failure_names_the_video() {
        let mut db_conn = setup();
        db_conn.execute_batch("DROP TABLE transcripts").unwrap();
        let src = Fake(HashMap::from([(
            "aaaaaaaaaaa",
            Some(vec![CaptionLine::new(0.0, "x")]),
        )]));
        let err = ingest_batch(&mut db_conn, &[video("aaaaaaaaaaa", "a")], &src, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, Error::Store { ref video_id, .. } if video_id == "aaaaaaaaaaa"));
        let msg = err.to_string();
        assert!(msg.contains("aaaaaaaaaaa"), "{msg}");
        assert!(msg.contains("no such table"), "{msg}");
    }
}
