use crate::errors::Result;
use crate::types::{BrowserKind, Viewport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub wait: WaitConfig,
    pub artifacts: ArtifactConfig,
}

impl Config {
    /// Loads a JSON config file; omitted fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: BrowserKind,
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub incognito: bool,
    pub language: Option<String>,
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chrome,
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            incognito: true,
            language: None,
            args: vec![],
        }
    }
}

/// Deadline and polling cadence for a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

impl WaitConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub screenshots_dir: PathBuf,
    /// Wipe screenshots left over from earlier runs.
    pub clean_on_start: bool,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            screenshots_dir: PathBuf::from("failure_screenshots"),
            clean_on_start: true,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "browser": { "headless": false, "viewport": { "width": 1280, "height": 720 } },
                 "wait": { "timeout_ms": 5000 } }"#,
        )
        .unwrap();

        assert!(!config.browser.headless);
        assert_eq!(config.browser.viewport, Viewport { width: 1280, height: 720 });
        assert!(config.browser.incognito);
        assert_eq!(config.wait.timeout, Duration::from_secs(5));
        assert_eq!(config.wait.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(
            config.artifacts.screenshots_dir,
            PathBuf::from("failure_screenshots")
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "wait": { "poll_interval_ms": 250 } }"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.wait.poll_interval, Duration::from_millis(250));
        assert_eq!(config.wait.timeout, DEFAULT_TIMEOUT);

        assert!(Config::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_wait_config_defaults() {
        let wait = WaitConfig::default();
        assert_eq!(wait.timeout, Duration::from_secs(60));
        assert_eq!(wait.poll_interval, Duration::from_millis(100));
    }
}
