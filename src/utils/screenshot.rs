use crate::core::{ArtifactConfig, UiDriver};
use crate::errors::{Result, WaitError};
use chrono::{DateTime, Local};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Screenshots captured when a scenario fails.
pub struct FailureSnapshots {
    dir: PathBuf,
    unsafe_chars: Regex,
}

impl FailureSnapshots {
    /// Creates the screenshot directory. When configured to, screenshots
    /// left by earlier runs are removed; nothing else in the directory is.
    pub fn prepare(config: &ArtifactConfig) -> Result<Self> {
        let dir = config.screenshots_dir.clone();
        fs::create_dir_all(&dir)?;

        if config.clean_on_start {
            let snapshot_name =
                Regex::new(r"^.+-\d{8}T\d{6}\.png$").map_err(WaitError::Pattern)?;
            let mut removed = 0usize;
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let is_snapshot = entry
                    .file_name()
                    .to_str()
                    .map_or(false, |name| snapshot_name.is_match(name));
                if is_snapshot && entry.file_type()?.is_file() {
                    fs::remove_file(entry.path())?;
                    removed += 1;
                }
            }
            info!(dir = %dir.display(), removed, "removed old failure screenshots");
        }

        Ok(Self {
            dir,
            unsafe_chars: Regex::new(r"[^\w\-. ]").map_err(WaitError::Pattern)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>-<YYYYmmddTHHMMSS>.png` with unsafe characters in the
    /// file name replaced by `_`.
    pub fn path_for(&self, name: &str, at: DateTime<Local>) -> PathBuf {
        let file_name = format!("{}-{}.png", name, at.format("%Y%m%dT%H%M%S"));
        self.dir
            .join(self.unsafe_chars.replace_all(&file_name, "_").into_owned())
    }

    pub fn save(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name, Local::now());
        fs::write(&path, png)?;
        warn!(path = %path.display(), "saved failure screenshot");
        Ok(path)
    }

    /// Screenshots whatever `driver` currently shows.
    pub fn capture<D: UiDriver>(&self, name: &str, driver: &D) -> Result<PathBuf> {
        let png = driver.screenshot()?;
        self.save(name, &png)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedDriver;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn config(dir: &Path, clean_on_start: bool) -> ArtifactConfig {
        ArtifactConfig {
            screenshots_dir: dir.to_path_buf(),
            clean_on_start,
        }
    }

    #[test]
    fn test_paths_are_timestamped_and_sanitized() {
        let root = TempDir::new().unwrap();
        let snapshots = FailureSnapshots::prepare(&config(&root.path().join("shots"), true)).unwrap();
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let path = snapshots.path_for("test_login[chrome]: step/2", at);
        assert_eq!(path.parent(), Some(snapshots.dir()));
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("test_login_chrome__ step_2-20240309T140507.png")
        );
    }

    #[test]
    fn test_prepare_wipes_previous_screenshots() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("shots");
        fs::create_dir_all(&dir).unwrap();
        let old = dir.join("login-20240309T140507.png");
        fs::write(&old, b"old").unwrap();

        FailureSnapshots::prepare(&config(&dir, false)).unwrap();
        assert!(old.exists());

        FailureSnapshots::prepare(&config(&dir, true)).unwrap();
        assert!(!old.exists());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_prepare_keeps_unrelated_files() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("important_notes.txt"), b"keep me").unwrap();
        fs::write(root.path().join("logo.png"), b"keep me too").unwrap();
        fs::create_dir(root.path().join("reports")).unwrap();
        fs::write(root.path().join("movies-20240309T140507.png"), b"old").unwrap();

        FailureSnapshots::prepare(&config(root.path(), true)).unwrap();

        assert!(root.path().join("important_notes.txt").exists());
        assert!(root.path().join("logo.png").exists());
        assert!(root.path().join("reports").is_dir());
        assert!(!root.path().join("movies-20240309T140507.png").exists());
    }

    #[test]
    fn test_capture_writes_driver_screenshot() {
        let root = TempDir::new().unwrap();
        let snapshots = FailureSnapshots::prepare(&config(root.path(), false)).unwrap();
        let driver = ScriptedDriver::new();

        let path = snapshots.capture("movies_tab", &driver).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
