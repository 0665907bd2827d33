// MIT License
// Copyright (c) 2024 Graham King

use thiserror::Error;

/// Everything the store, the remote sources and the exporter can fail with.
/// Every variant names the item it is about so batch runs can be audited
/// from the log afterwards.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not parse a video or channel identifier from '{0}'")]
    Parse(String),

    #[error("remote service error for {item}: {message}")]
    RemoteService { item: String, message: String },

    #[error("transcript unavailable for video {0}")]
    TranscriptUnavailable(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("invalid sort key '{0}'")]
    InvalidSortKey(String),

    #[error("storing video {video_id}: {source}")]
    Store {
        video_id: String,
        source: Box<Error>,
    },

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn remote(item: &str, message: impl ToString) -> Self {
        Error::RemoteService {
            item: item.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
