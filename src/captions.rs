// MIT License
// Copyright (c) 2024 Graham King

use log::debug;

use crate::error::{Error, Result};
use crate::video::CaptionLine;

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";

/// Somewhere caption lines for a video can be fetched from
pub trait CaptionSource {
    /// Fails with TranscriptUnavailable when captions are disabled or missing
    /// for this video, RemoteService for anything else.
    fn fetch(&self, video_id: &str) -> Result<Vec<CaptionLine>>;
}

/// YouTube's own timed-text endpoint, in json3 format
pub struct TimedText {
    client: reqwest::blocking::Client,
    languages: Vec<String>,
}

impl TimedText {
    pub fn new(languages: Vec<String>) -> Self {
        TimedText {
            client: reqwest::blocking::Client::new(),
            languages,
        }
    }

    fn fetch_language(&self, video_id: &str, lang: &str) -> Result<Option<Vec<CaptionLine>>> {
        let res = self
            .client
            .get(TIMEDTEXT_URL)
            .query(&[("v", video_id), ("lang", lang), ("fmt", "json3")])
            .send()
            .map_err(|e| Error::remote(video_id, e))?;
        if res.status() == http::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if res.status() != http::StatusCode::OK {
            return Err(Error::remote(
                video_id,
                format!("captions HTTP error {}", res.status()),
            ));
        }
        let body = res.text().map_err(|e| Error::remote(video_id, e))?;
        if body.trim().is_empty() {
            // This is how timedtext says "no track in that language"
            return Ok(None);
        }
        let lines = parse_json3(&body).map_err(|e| Error::remote(video_id, e))?;
        Ok(Some(lines))
    }
}

impl CaptionSource for TimedText {
    fn fetch(&self, video_id: &str) -> Result<Vec<CaptionLine>> {
        for lang in &self.languages {
            match self.fetch_language(video_id, lang)? {
                Some(lines) => return Ok(lines),
                None => debug!("No '{lang}' captions for {video_id}"),
            }
        }
        Err(Error::TranscriptUnavailable(video_id.to_string()))
    }
}

#[derive(Debug, serde::Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, serde::Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    // Window and styling events have no segments
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, serde::Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

pub fn parse_json3(body: &str) -> serde_json::Result<Vec<CaptionLine>> {
    let doc: Json3 = serde_json::from_str(body)?;
    let mut out = Vec::new();
    for ev in doc.events {
        let Some(segs) = ev.segs else {
            continue;
        };
        let text: String = segs.iter().map(|s| s.utf8.as_str()).collect();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        out.push(CaptionLine {
            start: ev.start_ms as f64 / 1000.0,
            text: text.replace('\n', " "),
        });
    }
    Ok(out)

    /* Example body
    {
      "wireMagic": "pb3",
      "events": [
        { "tStartMs": 0, "dDurationMs": 2000, "id": 1, "wpWinPosId": 1, "wsWinStyleId": 1 },
        { "tStartMs": 1360, "dDurationMs": 3040, "wWinId": 1,
          "segs": [ { "utf8": "we're no strangers" }, { "utf8": " to love", "tOffsetMs": 800 } ] },
        { "tStartMs": 4400, "wWinId": 1, "aAppend": 1, "segs": [ { "utf8": "\n" } ] }
      ]
    }
    */
}
