//! Local side effect of exporting a plan: saving the rendered markdown.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::ExportedPlan;

/// Destination for exported plans
pub trait ExportSink: Send + Sync {
    /// Saves the export, returning where it ended up
    fn save(&self, export: &ExportedPlan) -> io::Result<PathBuf>;
}

/// Writes exports as files into a directory
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn save(&self, export: &ExportedPlan) -> io::Result<PathBuf> {
        let path = self.dir.join(safe_file_name(&export.filename));
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, &export.content)?;
        info!(path = %path.display(), bytes = export.content.len(), "exported feature plan");
        Ok(path)
    }
}

/// Keeps only the final path component of a service-supplied file name
fn safe_file_name(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty() && *part != "." && *part != "..")
        .unwrap_or("");

    if name.is_empty() {
        "feature_plan.md".to_string()
    } else {
        name.to_string()
    }
}
