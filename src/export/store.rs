use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ExportError, ExportFormat, PARTIAL_PREFIX, parse_token};

/// A retrieved export, read fully into memory.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub token: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

/// Flat directory holding export artifacts.
///
/// 書き込みは一時ファイル経由で行い、`persist` でアトミックに置き換えるため、
/// 読み手が書きかけのファイルを見ることはない。
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens (and creates if needed) the storage root.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or resolved.
    pub fn open(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        Ok(Self {
            root: fs::canonicalize(root)?,
        })
    }

    /// Canonical storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Atomically writes `bytes` under `token`.
    ///
    /// # Errors
    /// Rejects invalid tokens and propagates I/O failures.
    pub fn save(&self, token: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        parse_token(token)?;
        let target = self.root.join(token);

        let mut staged = tempfile::Builder::new()
            .prefix(PARTIAL_PREFIX)
            .tempfile_in(&self.root)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(&target).map_err(|err| err.error)?;

        debug!(token, bytes = bytes.len(), "artifact stored");
        Ok(target)
    }

    /// Reads an artifact in one call.
    ///
    /// # Errors
    /// - [`ExportError::PathTraversalRejected`] when the token or its resolved
    ///   path escapes the storage root
    /// - [`ExportError::ArtifactNotFound`] for unknown or already swept tokens
    pub fn fetch(&self, token: &str) -> Result<Artifact, ExportError> {
        let format = parse_token(token)?;
        let resolved = match fs::canonicalize(self.root.join(token)) {
            Ok(path) => path,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ExportError::ArtifactNotFound);
            }
            Err(err) => return Err(err.into()),
        };
        // シンボリックリンク経由でルート外を指していないか
        if !resolved.starts_with(&self.root) {
            return Err(ExportError::PathTraversalRejected);
        }

        let bytes = match fs::read(&resolved) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ExportError::ArtifactNotFound);
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Artifact {
            token: token.to_string(),
            format,
            bytes,
        })
    }

    /// Deletes one artifact; a missing file is not an error.
    ///
    /// # Errors
    /// Rejects invalid tokens and propagates other I/O failures.
    pub fn remove(&self, token: &str) -> Result<(), ExportError> {
        parse_token(token)?;
        match fs::remove_file(self.root.join(token)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
