// MIT License
// Copyright (c) 2024 Graham King

use std::env;
use std::fs;
use std::path;

use anyhow::Context;

pub const CONFIG_NAME: &str = "config.yaml";

/// Optional settings from config.yaml in the config directory
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub youtube_api_key: Option<String>,
    pub caption_languages: Vec<String>,
    pub export_dir: Option<path::PathBuf>,
}

impl Config {
    /// A missing file is the same as an empty one
    pub fn load(cfg_dir: &path::Path) -> anyhow::Result<Config> {
        let cfg_path = cfg_dir.join(CONFIG_NAME);
        let mut cfg = match fs::read_to_string(&cfg_path) {
            Ok(s) => Config::parse(&s).with_context(|| cfg_path.display().to_string())?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Config::parse("")?,
            Err(err) => return Err(err).with_context(|| cfg_path.display().to_string()),
        };
        if let Ok(key) = env::var("YOUTUBE_API_KEY") {
            cfg.youtube_api_key = Some(key);
        }
        Ok(cfg)
    }

    pub fn parse(s: &str) -> anyhow::Result<Config> {
        let cfg: Config = if s.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(s)?
        };
        Ok(cfg.with_defaults())
    }

    fn with_defaults(mut self) -> Config {
        if self.caption_languages.is_empty() {
            self.caption_languages = vec!["en".to_string()];
        }
        self
    }

    pub fn api_key(&self) -> anyhow::Result<&str> {
        let Some(key) = self.youtube_api_key.as_deref() else {
            return Err(anyhow::anyhow!(
                "Set variable YOUTUBE_API_KEY, or youtube_api_key in {CONFIG_NAME}"
            ));
        };
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_file() {
        let cfg = Config::parse(
            r#"
youtube_api_key: abc123
caption_languages: [en-GB, en]
export_dir: /tmp/out
"#,
        )
        .unwrap();
        assert_eq!(cfg.api_key().unwrap(), "abc123");
        assert_eq!(cfg.caption_languages, vec!["en-GB", "en"]);
        assert_eq!(cfg.export_dir, Some(path::PathBuf::from("/tmp/out")));
    }

    #[test]
    fn empty_file_has_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(cfg.caption_languages, vec!["en"]);
        assert!(cfg.youtube_api_key.is_none());
        assert!(cfg.api_key().is_err());
    }

    #[test]
    fn missing_file_has_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.caption_languages, vec!["en"]);
        assert!(cfg.export_dir.is_none());
    }

    #[test]
    fn file_is_read_from_config_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_NAME), "caption_languages: [de]\n").unwrap();
        let cfg = Config::load(dir.path()).unwrap();
        assert_eq!(cfg.caption_languages, vec!["de"]);
    }

    #[test]
    fn bad_yaml() {
        assert!(Config::parse("caption_languages: {").is_err());
    }
}
