//! Output artifacts: the placeholder SVG a render writes into, and the
//! deferred deletion queue that cleans them up.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Minimal valid SVG, so a preview polling the artifact never sees a missing
/// or unparsable file before the compiler's first write.
pub const PLACEHOLDER_SVG: &str = r#"<?xml version="1.0" encoding="UTF-8"?><svg xmlns="http://www.w3.org/2000/svg" width="1" height="1"/>"#;

/// Create a uniquely named placeholder artifact in the temp directory.
///
/// The file outlives this call; deleting it is the janitor's job.
pub fn create_placeholder() -> io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("d2_temp_svg")
        .suffix(".svg")
        .tempfile()?;
    file.write_all(PLACEHOLDER_SVG.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Re-create the placeholder if the artifact is gone.
pub fn ensure_placeholder(path: &Path) -> io::Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, PLACEHOLDER_SVG)
}

/// Deferred deletion of output artifacts.
///
/// `schedule` may be called whenever an artifact stops being needed;
/// deletions only happen in `flush`, which the owner calls while it holds
/// exclusive access. Artifacts still owned by a live session are skipped:
/// a restarted session keeps rendering to the same path.
#[derive(Debug, Default)]
pub struct ArtifactJanitor {
    pending: BTreeSet<PathBuf>,
}

impl ArtifactJanitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `path` for deletion. Returns false if it was already queued.
    pub fn schedule(&mut self, path: PathBuf) -> bool {
        self.pending.insert(path)
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Delete every queued artifact not in `live`. Returns how many were removed.
    ///
    /// Deletion is best-effort: failures are logged and dropped from the queue.
    pub fn flush(&mut self, live: &HashSet<&Path>) -> usize {
        let mut removed = 0;
        for path in std::mem::take(&mut self.pending) {
            if live.contains(path.as_path()) {
                tracing::debug!(path = %path.display(), "Artifact still in use, skipping deletion");
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Deleted render artifact");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Failed to delete render artifact: {e}");
                }
            }
        }
        removed
    }
}
