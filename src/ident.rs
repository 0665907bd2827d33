// MIT License
// Copyright (c) 2024 Graham King

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static VIDEO_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"v=([A-Za-z0-9_-]{11})").unwrap());
static VIDEO_SHORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([A-Za-z0-9_-]{11})").unwrap());
static CHANNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/channel/([^/\s?&#]+)").unwrap());
static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/user/([^/\s?&#]+)").unwrap());
static HANDLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@([^/\s?&#]+)").unwrap());

/// What a YouTube URL points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Video(String),
    ChannelId(String),
    Username(String),
    Handle(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Video(id) => write!(f, "video {id}"),
            Identifier::ChannelId(id) => write!(f, "channel {id}"),
            Identifier::Username(name) => write!(f, "user {name}"),
            Identifier::Handle(handle) => write!(f, "@{handle}"),
        }
    }
}

/// Work out what `url` refers to. Video shapes are tried first:
///  - https://www.youtube.com/watch?v=VIDEO_ID
///  - https://youtu.be/VIDEO_ID
///
/// then channel shapes:
///  - https://www.youtube.com/channel/UCXXXXXX
///  - https://www.youtube.com/user/USERNAME
///  - https://www.youtube.com/@HANDLE
///
/// None means we couldn't make sense of it, which is the caller's to report.
pub fn parse(url: &str) -> Option<Identifier> {
    if let Some(id) = capture(&VIDEO_QUERY, url).or_else(|| capture(&VIDEO_SHORT, url)) {
        return Some(Identifier::Video(id));
    }
    if let Some(id) = capture(&CHANNEL_ID, url) {
        return Some(Identifier::ChannelId(id));
    }
    if let Some(name) = capture(&USERNAME, url) {
        return Some(Identifier::Username(name));
    }
    capture(&HANDLE, url).map(Identifier::Handle)
}

fn capture(re: &Regex, s: &str) -> Option<String> {
    re.captures(s).map(|c| c[1].to_string())
}
