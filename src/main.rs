// MIT License
// Copyright (c) 2024 Graham King

use std::env;
use std::fs;
use std::num::NonZeroUsize;
use std::path;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::{error, info, warn, LevelFilter};

mod captions;
mod config;
mod db;
mod error;
mod export;
mod ident;
mod ingest;
mod term;
mod video;
mod youtube;

use config::Config;
use error::Error;
use ident::Identifier;

const DB_NAME: &str = "transcripts.db";
const CFG_DIR: &str = ".config/yt-transcripts";

#[derive(Parser)]
#[command(about = "Pull YouTube transcripts into sqlite and export them per channel")]
struct Cli {
    /// Sets a custom database path
    #[arg(long, value_name = "PATH")]
    db_path: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and store one video and its transcript, print the transcript
    Video {
        /// https://www.youtube.com/watch?v=... or https://youtu.be/...
        url: String,
    },

    /// Fetch and store the uploads of a channel with their transcripts.
    /// Videos already in the database are skipped.
    Channel {
        /// /channel/UC..., /user/NAME or /@HANDLE URL
        url: String,
        /// Only the newest N uploads
        #[clap(long)]
        limit: Option<usize>,
    },

    /// Write one channel's transcripts to transcripts_<channel>.<format>
    Export {
        /// Channel id as stored, a leading @ is ignored
        channel: String,
        /// "publish_date DESC", "views DESC", ... or newest, oldest, most-liked,
        /// most-viewed, longest, shortest, most-commented, least-commented
        #[clap(long, default_value = "publish_date DESC")]
        sort: String,
        /// Maximum number of videos
        #[clap(long, default_value = "250")]
        limit: NonZeroUsize,
        #[clap(long, value_enum, default_value_t = export::Format::Json)]
        format: export::Format,
        /// Where to write the file. Default is export_dir from config, or here.
        #[clap(long, value_name = "DIR")]
        out_dir: Option<path::PathBuf>,
    },

    /// Print the stored transcript of a video
    Show {
        /// Video URL
        url: String,
    },

    /// List channels in the database
    Channels,

    /// List stored videos
    Titles,

    /// Add any missing columns to an older database
    Migrate,

    /// Print the columns of the videos and transcripts tables
    Schema,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let Ok(user_home) = env::var("HOME") else {
        eprintln!("$HOME not set");
        process::exit(1);
    };
    let cfg_dir = path::PathBuf::from(format!("{user_home}/{CFG_DIR}"));
    let db_path = match cli.db_path {
        Some(db) => path::PathBuf::from(db),
        None => {
            fs::create_dir_all(&cfg_dir)?;
            cfg_dir.join(DB_NAME)
        }
    };
    let cfg = Config::load(&cfg_dir)?;

    let open = || db::open(&db_path).with_context(|| format!("opening {}", db_path.display()));

    match cli.command {
        Commands::Video { url } => do_video(&mut open()?, &cfg, &url),
        Commands::Channel { url, limit } => do_channel(&mut open()?, &cfg, &url, limit),
        Commands::Export {
            channel,
            sort,
            limit,
            format,
            out_dir,
        } => {
            let dir = out_dir
                .or(cfg.export_dir)
                .unwrap_or_else(|| path::PathBuf::from("."));
            do_export(&open()?, &channel, &sort, limit, format, &dir)
        }
        Commands::Show { url } => do_show(&open()?, &url),
        Commands::Channels => do_channels(&open()?),
        Commands::Titles => do_titles(&open()?),
        // Not through open() so we can report what changed
        Commands::Migrate => do_migrate(&db_path),
        Commands::Schema => do_schema(&open()?),
    }
}

fn parse_video_url(url: &str) -> Result<String, Error> {
    match ident::parse(url) {
        Some(Identifier::Video(id)) => Ok(id),
        _ => Err(Error::Parse(url.to_string())),
    }
}

fn do_video(
    db_conn: &mut rusqlite::Connection,
    cfg: &Config,
    url: &str,
) -> anyhow::Result<()> {
    let video_id = parse_video_url(url)?;

    if ingest::is_stored(db_conn, &video_id)? {
        info!("{video_id} is already stored, not fetching again");
        return do_show(db_conn, url);
    }

    let yt = youtube::YouTube::new(cfg.api_key()?.to_string());
    let Some(v) = yt.video(&video_id)? else {
        return Err(anyhow::anyhow!(
            "No video found with ID {video_id} (it may be private, deleted, or invalid)"
        ));
    };
    info!("Found video: {} (ID: {video_id})", v.title);

    let source = captions::TimedText::new(cfg.caption_languages.clone());
    let outcome =
        ingest::ingest(db_conn, &v, &source).with_context(|| format!("video {video_id}"))?;
    match outcome {
        ingest::Outcome::Stored { text, .. } => println!("{text}"),
        ingest::Outcome::Unavailable => println!("Transcript unavailable for {video_id}"),
    }
    Ok(())
}

fn do_channel(
    db_conn: &mut rusqlite::Connection,
    cfg: &Config,
    url: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let ident = match ident::parse(url) {
        Some(Identifier::Video(_)) | None => return Err(Error::Parse(url.to_string()).into()),
        Some(ident) => ident,
    };
    let yt = youtube::YouTube::new(cfg.api_key()?.to_string());

    let Some(channel_id) = yt.resolve_channel(&ident)? else {
        return Err(anyhow::anyhow!("No channel found for {ident}"));
    };
    let Some(channel) = yt.channel(&channel_id)? else {
        return Err(anyhow::anyhow!("No channel found for ID {channel_id}"));
    };

    let ids = yt.uploads(&channel.uploads, limit)?;
    println!("Found {} videos in {} ({})", ids.len(), channel.title, channel.id);

    let mut fresh = Vec::with_capacity(ids.len());
    for id in ids {
        if ingest::is_stored(db_conn, &id)? {
            info!("Skipping {id}, already stored");
        } else {
            fresh.push(id);
        }
    }
    if fresh.is_empty() {
        println!("Nothing new to fetch");
        return Ok(());
    }

    let mut videos = yt.videos(&fresh)?;
    if videos.len() < fresh.len() {
        warn!(
            "{} videos were not returned by the API (private or deleted)",
            fresh.len() - videos.len()
        );
    }
    for v in videos.iter_mut() {
        if v.channel_name.is_empty() {
            v.channel_name = channel.title.clone();
        }
    }

    let source = captions::TimedText::new(cfg.caption_languages.clone());
    let total = videos.len();
    let width = term::get_terminal_width();
    let report = ingest::ingest_batch(db_conn, &videos, &source, |idx, v| {
        if let Err(err) = term::show_progress(&v.title, idx, total, width) {
            error!("progress: {err}");
        }
    })?;
    println!();
    println!(
        "Stored {} transcripts, {} unavailable, {} failed",
        report.stored, report.unavailable, report.failed
    );
    Ok(())
}

fn do_export(
    db_conn: &rusqlite::Connection,
    channel: &str,
    sort: &str,
    limit: NonZeroUsize,
    format: export::Format,
    dir: &path::Path,
) -> anyhow::Result<()> {
    let channel_id = channel.trim_start_matches('@');
    if channel_id.is_empty() {
        return Err(anyhow::anyhow!("Please select a channel"));
    }
    let sort: export::SortKey = sort.parse()?;
    let req = export::ExportRequest {
        channel_id: channel_id.to_string(),
        sort,
        limit,
        format,
    };
    let (out_path, count) = export::export_file(db_conn, &req, dir)
        .with_context(|| format!("exporting channel {channel_id}"))?;
    if count == 0 {
        warn!("No transcripts found for channel {channel_id}");
    }
    println!(
        "Successfully extracted {count} transcripts to {}",
        out_path.display()
    );
    Ok(())
}

fn do_show(db_conn: &rusqlite::Connection, url: &str) -> anyhow::Result<()> {
    let video_id = parse_video_url(url)?;
    match export::transcript_text(db_conn, &video_id)? {
        Some(text) if !text.is_empty() => println!("{text}"),
        Some(_) => println!("Transcript unavailable for {video_id}"),
        None => println!("{video_id} is not in the database"),
    }
    Ok(())
}

fn do_channels(db_conn: &rusqlite::Connection) -> anyhow::Result<()> {
    for c in export::channels(db_conn)? {
        println!("@{}\t{}\t{} videos", c.channel_id, c.channel_name, c.videos);
    }
    Ok(())
}

fn do_titles(db_conn: &rusqlite::Connection) -> anyhow::Result<()> {
    for (id, title) in export::titles(db_conn)? {
        println!("{id}\t{title}");
    }
    Ok(())
}

fn do_migrate(db_path: &path::Path) -> anyhow::Result<()> {
    let db_conn = rusqlite::Connection::open(db_path)?;
    db::create_tables(&db_conn)?;
    let applied = db::migrate(&db_conn)?;
    if applied.is_empty() {
        println!("Schema is up to date");
    } else {
        println!("Added columns: {}", applied.join(", "));
    }
    Ok(())
}

fn do_schema(db_conn: &rusqlite::Connection) -> anyhow::Result<()> {
    for table in ["videos", "transcripts"] {
        println!("Columns in '{table}' table:");
        for c in db::columns(db_conn, table)? {
            let default = c.default.map(|d| format!(" DEFAULT {d}")).unwrap_or_default();
            println!("  {} {}{default}", c.name, c.decl_type);
        }
    }
    Ok(())
}
