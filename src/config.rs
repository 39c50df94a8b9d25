use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::report::ReportMode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_path")]
    pub path: String,
    #[serde(default = "default_latest_path")]
    pub latest_path: String,
    #[serde(default = "default_report_mode")]
    pub mode: ReportMode,
    #[serde(default)]
    pub extract_latest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub settle_delay_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub sources: Option<Vec<String>>,
    pub report_mode: Option<ReportMode>,
    pub snapshot_dir: Option<String>,
    pub report_path: Option<String>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/pagewatch/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(sources) = overrides.sources {
            self.sources.urls = sources;
        }
        if let Some(mode) = overrides.report_mode {
            self.report.mode = mode;
        }
        if let Some(snapshot_dir) = overrides.snapshot_dir {
            self.storage.snapshot_dir = snapshot_dir;
        }
        if let Some(report_path) = overrides.report_path {
            self.report.path = report_path;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_snapshot_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.snapshot_dir)
    }

    pub fn resolved_report_path(&self) -> PathBuf {
        expand_tilde(&self.report.path)
    }

    pub fn resolved_latest_path(&self) -> PathBuf {
        expand_tilde(&self.report.latest_path)
    }

    pub fn default_template() -> String {
        let template = r#"[sources]
urls = [
    "https://example.com/careers",
]

[storage]
snapshot_dir = "~/.local/share/pagewatch/snapshots"

[report]
path = "~/.local/share/pagewatch/changes.md"
latest_path = "~/.local/share/pagewatch/changes_latest.md"
# "replace" keeps only the latest run; "prepend" grows a newest-first history
mode = "replace"
extract_latest = false

[fetch]
timeout_secs = 12
connect_timeout_secs = 6
# fixed delay before each fetch, in seconds
settle_delay_secs = 0
user_agent = "pagewatch/0.1"
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
            latest_path: default_latest_path(),
            mode: default_report_mode(),
            extract_latest: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            settle_delay_secs: 0,
            user_agent: default_user_agent(),
        }
    }
}

fn default_snapshot_dir() -> String {
    "~/.local/share/pagewatch/snapshots".to_string()
}

fn default_report_path() -> String {
    "~/.local/share/pagewatch/changes.md".to_string()
}

fn default_latest_path() -> String {
    "~/.local/share/pagewatch/changes_latest.md".to_string()
}

fn default_report_mode() -> ReportMode {
    ReportMode::Replace
}

fn default_timeout_secs() -> u64 {
    12
}

fn default_connect_timeout_secs() -> u64 {
    6
}

fn default_user_agent() -> String {
    "pagewatch/0.1".to_string()
}

#[cfg(test)]
mod tests {
    use super::Config;
    use crate::report::ReportMode;

    #[test]
    fn template_parses_back_into_config() {
        let config: Config = toml::from_str(&Config::default_template()).expect("parse template");
        assert_eq!(config.sources.urls, ["https://example.com/careers"]);
        assert_eq!(config.report.mode, ReportMode::Replace);
        assert!(!config.report.extract_latest);
        assert_eq!(config.fetch.timeout_secs, 12);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[sources]\nurls = [\"https://a.example\"]\n")
            .expect("parse partial config");
        assert_eq!(config.storage.snapshot_dir, "~/.local/share/pagewatch/snapshots");
        assert_eq!(config.fetch.connect_timeout_secs, 6);
    }
}
