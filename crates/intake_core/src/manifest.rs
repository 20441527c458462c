/// An input file the project has already accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileManifestEntry {
    pub filename: String,
    pub template_label: String,
    pub format: Option<String>,
}

/// Client-side table of accepted input files, keyed by filename.
///
/// Only the session's update logic can mutate it, which keeps filenames
/// unique.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileManifest {
    entries: Vec<FileManifestEntry>,
}

impl FileManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FileManifestEntry] {
        &self.entries
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.entries.iter().any(|entry| entry.filename == filename)
    }

    pub fn get(&self, filename: &str) -> Option<&FileManifestEntry> {
        self.entries.iter().find(|entry| entry.filename == filename)
    }

    /// Returns `false` when the filename was already present.
    pub(crate) fn insert_if_absent(&mut self, entry: FileManifestEntry) -> bool {
        if self.contains(&entry.filename) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub(crate) fn remove(&mut self, filename: &str) -> Option<FileManifestEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.filename == filename)?;
        Some(self.entries.remove(index))
    }
}
