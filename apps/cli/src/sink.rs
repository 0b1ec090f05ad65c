//! Writes documents as `<dir>/<publication>-<language>.json`.

use std::path::{Path, PathBuf};

use scripturekit_core::DocumentSink;
use scripturekit_shared::{Document, Language, Result, ScripturekitError};

/// Output directory sink.
pub(crate) struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn path_for(&self, language: &Language, publication: &str) -> PathBuf {
        self.dir.join(format!("{publication}-{language}.json"))
    }
}

impl DocumentSink for JsonFileSink {
    fn exists(&self, language: &Language, publication: &str) -> Result<bool> {
        Ok(self.path_for(language, publication).is_file())
    }

    fn write(&self, language: &Language, publication: &str, document: &Document) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ScripturekitError::io(&self.dir, e))?;

        let target = self.path_for(language, publication);
        let temp = self.dir.join(format!(".{publication}-{language}.json.tmp"));
        let bytes = document.to_json_pretty()?;

        // Write to temp file first, then rename into place
        std::fs::write(&temp, bytes).map_err(|e| ScripturekitError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| ScripturekitError::io(&target, e))?;

        tracing::debug!(path = %target.display(), "document written");
        Ok(())
    }
}
