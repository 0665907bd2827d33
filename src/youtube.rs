// MIT License
// Copyright (c) 2024 Graham King

use log::debug;

use crate::error::{Error, Result};
use crate::ident::Identifier;
use crate::video::{self, Video};

const API_URL: &str = "https://www.googleapis.com/youtube/v3";

// The API won't return more than this per page or per videos.list call
const PAGE_SIZE: usize = 50;

/// Read-only access to the YouTube Data API v3 with an API key
pub struct YouTube {
    client: reqwest::blocking::Client,
    api_key: String,
}

#[derive(Debug)]
pub struct Channel {
    pub id: String,
    pub title: String,
    /// Playlist holding every upload of the channel
    pub uploads: String,
}

#[derive(Debug, serde::Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(rename = "contentDetails", default)]
    content_details: ContentDetails,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    published_at: String,
}

// Counts come back as strings, and are missing when the owner hides them
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ContentDetails {
    #[serde(default)]
    duration: String,
}

#[derive(Debug, serde::Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(rename = "contentDetails", default)]
    content_details: ChannelContentDetails,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ChannelContentDetails {
    #[serde(rename = "relatedPlaylists", default)]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Default, serde::Deserialize)]
struct RelatedPlaylists {
    #[serde(default)]
    uploads: String,
}

#[derive(Debug, serde::Deserialize)]
struct SearchItem {
    snippet: SearchSnippet,
}

#[derive(Debug, serde::Deserialize)]
struct SearchSnippet {
    #[serde(rename = "channelId")]
    channel_id: String,
}

#[derive(Debug, serde::Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, serde::Deserialize)]
struct PlaylistSnippet {
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, serde::Deserialize)]
struct ResourceId {
    #[serde(rename = "videoId")]
    video_id: String,
}

impl From<VideoItem> for Video {
    fn from(item: VideoItem) -> Self {
        let count =
            |s: Option<String>| -> i64 { s.and_then(|v| v.parse().ok()).unwrap_or(0) };
        Video {
            id: item.id,
            title: item.snippet.title,
            channel_id: item.snippet.channel_id,
            channel_name: item.snippet.channel_title,
            publish_date: video::normalize_date(&item.snippet.published_at),
            likes: count(item.statistics.like_count),
            views: count(item.statistics.view_count),
            duration: video::parse_duration(&item.content_details.duration),
            comment_count: count(item.statistics.comment_count),
        }
    }
}

impl YouTube {
    pub fn new(api_key: String) -> Self {
        YouTube {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }

    // `item` is what we're asking about, it goes into error messages
    fn list<T: serde::de::DeserializeOwned>(
        &self,
        item: &str,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<ListResponse<T>> {
        let res = self
            .client
            .get(format!("{API_URL}/{resource}"))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(|e| Error::remote(item, e))?;
        if res.status() != http::StatusCode::OK {
            return Err(Error::remote(
                item,
                format!("{resource} HTTP error {} {:?}", res.status(), res.text()),
            ));
        }
        res.json().map_err(|e| Error::remote(item, e))
    }

    /// Full metadata for up to any number of videos, fetched 50 at a time.
    /// Private and deleted videos are silently absent from the result.
    pub fn videos(&self, ids: &[String]) -> Result<Vec<Video>> {
        let mut out = Vec::with_capacity(ids.len());
        for batch in ids.chunks(PAGE_SIZE) {
            let joined = batch.join(",");
            let res: ListResponse<VideoItem> = self.list(
                &joined,
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails"),
                    ("id", joined.as_str()),
                ],
            )?;
            out.extend(res.items.into_iter().map(Video::from));
        }
        Ok(out)
    }

    pub fn video(&self, id: &str) -> Result<Option<Video>> {
        Ok(self.videos(&[id.to_string()])?.pop())
    }

    /// Turn whatever the user gave us into a channel id
    pub fn resolve_channel(&self, ident: &Identifier) -> Result<Option<String>> {
        match ident {
            Identifier::ChannelId(id) => Ok(Some(id.clone())),
            Identifier::Username(name) => {
                let res: ListResponse<ChannelItem> = self.list(
                    name,
                    "channels",
                    &[("part", "id"), ("forUsername", name.as_str())],
                )?;
                Ok(res.items.into_iter().next().map(|c| c.id))
            }
            Identifier::Handle(handle) => {
                // The best the API offers for handles is a search
                let q = handle.trim_start_matches('@');
                let res: ListResponse<SearchItem> = self.list(
                    handle,
                    "search",
                    &[
                        ("part", "snippet"),
                        ("q", q),
                        ("type", "channel"),
                        ("maxResults", "1"),
                    ],
                )?;
                Ok(res.items.into_iter().next().map(|s| s.snippet.channel_id))
            }
            Identifier::Video(_) => Ok(None),
        }
    }

    pub fn channel(&self, id: &str) -> Result<Option<Channel>> {
        let res: ListResponse<ChannelItem> = self.list(
            id,
            "channels",
            &[("part", "snippet,contentDetails"), ("id", id)],
        )?;
        Ok(res.items.into_iter().next().map(|c| Channel {
            id: c.id,
            title: c.snippet.title,
            uploads: c.content_details.related_playlists.uploads,
        }))
    }

    /// Video ids in an uploads playlist, newest first, one page at a time.
    /// Stops after `max` ids if given.
    pub fn uploads(&self, playlist_id: &str, max: Option<usize>) -> Result<Vec<String>> {
        let page_size = PAGE_SIZE.to_string();
        let mut out = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("part", "snippet"),
                ("playlistId", playlist_id),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }
            let res: ListResponse<PlaylistItem> =
                self.list(playlist_id, "playlistItems", &params)?;
            out.extend(res.items.into_iter().map(|i| i.snippet.resource_id.video_id));
            debug!("{playlist_id}: {} ids so far", out.len());

            if let Some(max) = max {
                if out.len() >= max {
                    out.truncate(max);
                    break;
                }
            }
            match res.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(out)
    }
}
