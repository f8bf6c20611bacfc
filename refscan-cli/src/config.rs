use anyhow::{Context, Result};
use refscan_parser::extractor::DEFAULT_UA;
use refscan_parser::playlist::MASTER_PLAYLIST_FILE;
use refscan_parser::sites::{diziyiizle, setfilmizle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "refscan";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default output format
    pub output_format: String,

    /// Per-request timeout in seconds
    pub request_timeout: u64,

    /// Number of retries per request
    pub retries: u32,

    /// Worker pool size for batch and crawl runs
    pub max_concurrent: usize,

    /// User agent string for requests
    pub user_agent: Option<String>,

    /// Enable colored output
    pub colored_output: bool,

    /// Proxy URL (supports http, https, socks5)
    pub proxy: Option<String>,

    /// Proxy username (if proxy requires authentication)
    pub proxy_username: Option<String>,

    /// Proxy password (if proxy requires authentication)
    pub proxy_password: Option<String>,

    /// Catalog site crawled by `crawl`
    pub site_base_url: String,

    /// Playlist written by `crawl`
    pub output_file: PathBuf,

    /// Referer players must send for playlist streams
    pub m3u_referer: String,

    /// User agent players must send for playlist streams
    pub m3u_user_agent: String,

    /// Series site crawled by `series`
    pub series_site_url: String,

    /// Directory for the per-series playlists
    pub series_output_dir: PathBuf,

    /// Master playlist written by `series`
    pub master_playlist_file: PathBuf,

    /// Time budget per episode page, including its embeds, in seconds
    pub episode_timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_format: "pretty".to_string(),
            request_timeout: 25,
            retries: 0,
            max_concurrent: 10,
            user_agent: Some(DEFAULT_UA.to_string()),
            colored_output: true,
            proxy: None,
            proxy_username: None,
            proxy_password: None,
            site_base_url: setfilmizle::DEFAULT_SITE_URL.to_string(),
            output_file: PathBuf::from("setfilmizlefilm.m3u"),
            m3u_referer: "https://vctplay.site/".to_string(),
            m3u_user_agent: "Gecko) Chrome/140.0.7339.207 Mobile Safari/537.36".to_string(),
            series_site_url: diziyiizle::DEFAULT_SITE_URL.to_string(),
            series_output_dir: PathBuf::from("playlists"),
            master_playlist_file: PathBuf::from(MASTER_PLAYLIST_FILE),
            episode_timeout: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit file or the platform config directory
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                if path.exists() {
                    let content = std::fs::read_to_string(path)
                        .context("Failed to read configuration file")?;
                    toml::from_str(&content).context("Failed to parse configuration file")
                } else {
                    Ok(Self::default())
                }
            }
            None => confy::load(APP_NAME, None).context("Failed to load configuration"),
        }
    }

    pub fn default_config_path() -> Option<PathBuf> {
        confy::get_configuration_file_path(APP_NAME, None).ok()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, toml_string).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Reset configuration to defaults and save
    pub fn reset(config_path: Option<&Path>) -> Result<()> {
        let path = config_path
            .map(|p| p.to_path_buf())
            .or_else(Self::default_config_path)
            .context("No configuration path available")?;

        Self::default().save(&path)
    }

    pub fn show(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration for display")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("refscan.toml");

        let config = AppConfig {
            max_concurrent: 4,
            proxy: Some("socks5://127.0.0.1:1080".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_missing_file_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert_eq!(AppConfig::load(Some(&missing)).unwrap(), AppConfig::default());

        let partial = dir.path().join("partial.toml");
        std::fs::write(&partial, "request_timeout = 60\n").unwrap();
        let config = AppConfig::load(Some(&partial)).unwrap();
        assert_eq!(config.request_timeout, 60);
        assert_eq!(config.output_file, PathBuf::from("setfilmizlefilm.m3u"));
        assert_eq!(config.series_site_url, "https://diziyiizle.com");
        assert_eq!(
            config.master_playlist_file,
            PathBuf::from("master_all_series_playlist.m3u")
        );
    }

    #[test]
    fn test_reset_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refscan.toml");
        std::fs::write(&path, "retries = 9\n").unwrap();

        AppConfig::reset(Some(&path)).unwrap();
        assert_eq!(AppConfig::load(Some(&path)).unwrap().retries, 0);
    }
}
