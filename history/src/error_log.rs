use std::fs::OpenOptions;
use std::fs::create_dir_all;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;

use crate::error::Result;
use crate::error::StorageError;

pub const ERROR_LOG: &str = "error.log";

/// Plain-text log of failed runs: a timestamp header, the raw execution
/// log lines, then a blank separator line.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, at: DateTime<Utc>, header: &str, lines: &[String]) -> Result<()> {
        let mut block = format!("{} {header}\n", at.to_rfc3339());
        for line in lines {
            block.push_str(line);
            block.push('\n');
        }
        block.push('\n');
        if let Some(dir) = self.path.parent() {
            create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;
        f.write_all(block.as_bytes())
            .map_err(|e| StorageError::io(&self.path, e))
    }
}
