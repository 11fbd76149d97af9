use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("corpus directory not found: {0}")]
    NotFound(PathBuf),
    #[error("unknown preprint id: {0}")]
    UnknownId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A directory of extracted preprint texts, one `<id>.txt` file per document.
///
/// Only the id listing is read when opening; document text is read on demand,
/// so a corpus can be shared between requests without holding every preprint
/// in memory.
#[derive(Debug, Clone)]
pub struct PreprintCorpus {
    root: PathBuf,
    ids: Vec<String>,
}

impl PreprintCorpus {
    /// Scan `root` for `.txt` files. Ids are the file stems, sorted.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CorpusError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CorpusError::NotFound(root));
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&root)? {
            let path = entry?.path();
            let is_txt = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("txt"))
                .unwrap_or(false);
            if !is_txt {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                ids.push(stem.to_string_lossy().to_string());
            }
        }
        ids.sort();

        tracing::debug!(root = %root.display(), documents = ids.len(), "opened preprint corpus");
        Ok(Self { root, ids })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.binary_search_by(|probe| probe.as_str().cmp(id)).is_ok()
    }

    /// Read the text of one preprint.
    pub fn text(&self, id: &str) -> Result<String, CorpusError> {
        if !self.contains(id) {
            return Err(CorpusError::UnknownId(id.to_string()));
        }
        Ok(std::fs::read_to_string(self.root.join(format!("{id}.txt")))?)
    }
}
