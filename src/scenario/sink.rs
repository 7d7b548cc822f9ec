use crate::errors::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Destination for scraped titles.
pub trait TitleSink {
    fn write_titles(&mut self, titles: &[String]) -> Result<()>;
}

/// Writes one title per line, replacing the file's previous contents.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TitleSink for FileSink {
    fn write_titles(&mut self, titles: &[String]) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for title in titles {
            writeln!(writer, "{}", title)?;
        }
        writer.flush()?;
        info!(path = %self.path.display(), count = titles.len(), "wrote titles");
        Ok(())
    }
}

impl TitleSink for Vec<String> {
    fn write_titles(&mut self, titles: &[String]) -> Result<()> {
        self.extend_from_slice(titles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_sink_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titles.txt");
        std::fs::write(&path, "Old Title\nAnother Old Title\n").unwrap();

        let mut sink = FileSink::new(&path);
        sink.write_titles(&["Arrival".to_string(), "Paddington 2".to_string()])
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Arrival\nPaddington 2\n"
        );
    }

    #[test]
    fn test_file_sink_reports_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::new(dir.path().join("missing").join("titles.txt"));
        assert!(sink.write_titles(&["Arrival".to_string()]).is_err());
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<String> = Vec::new();
        sink.write_titles(&["Arrival".to_string()]).unwrap();
        assert_eq!(sink, vec!["Arrival"]);
    }
}
