use crate::media::FailurePolicy;
use crate::platform::PaginationMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PlatformConfig {
    pub base_url: String,
    pub user_agent: String,
    pub app_id: String,
    pub timeout_secs: u64,
    /// Items requested per feed page.
    pub page_size: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://i.instagram.com/api/v1/".to_string(),
            user_agent: "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; \
                         OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)"
                .to_string(),
            app_id: "567067343352427".to_string(),
            timeout_secs: 60,
            page_size: 33,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Pagination {
    #[default]
    FirstPage,
    AllPages,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MediaConfig {
    pub pagination: Pagination,
    /// Upper bound on pages fetched in all-pages mode.
    pub max_pages: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            pagination: Pagination::FirstPage,
            max_pages: 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BatchConfig {
    pub on_failure: FailurePolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub platform: PlatformConfig,
    pub media: MediaConfig,
    pub batch: BatchConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn get_logging_format(&self) -> LogFormat {
        self.logging.format
    }

    /// `force_all_pages` comes from the `--all-pages` flag and wins over the file.
    pub fn pagination_mode(&self, force_all_pages: bool) -> PaginationMode {
        match (force_all_pages, self.media.pagination) {
            (false, Pagination::FirstPage) => PaginationMode::FirstPage,
            _ => PaginationMode::AllPages {
                max_pages: self.media.max_pages.max(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.get_logging_format(), LogFormat::Pretty);
        assert_eq!(config.batch.on_failure, FailurePolicy::Abort);
        assert_eq!(config.pagination_mode(false), PaginationMode::FirstPage);
        assert!(config.platform.base_url.starts_with("https://"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
format = "json"

[media]
pagination = "all-pages"
max_pages = 5

[batch]
on_failure = "continue"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.get_logging_format(), LogFormat::Json);
        assert_eq!(
            config.pagination_mode(false),
            PaginationMode::AllPages { max_pages: 5 }
        );
        assert_eq!(config.batch.on_failure, FailurePolicy::Continue);
        assert_eq!(config.platform.timeout_secs, 60);
    }

    #[test]
    fn test_all_pages_flag_overrides_file() {
        let config = Config::default();
        assert_eq!(
            config.pagination_mode(true),
            PaginationMode::AllPages { max_pages: 100 }
        );
    }

    #[test]
    fn test_from_file_errors() {
        assert!(Config::from_file("/nonexistent/instagrool.toml").is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[batch]\non_failure = \"retry\"").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
