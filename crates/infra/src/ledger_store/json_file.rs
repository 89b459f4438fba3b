use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::document::LedgerDocument;

use super::r#trait::{LedgerStore, StoreError};

/// Ledger persisted as one JSON file (4-space indented).
///
/// Saves go to a sibling `<name>.tmp` that is fsynced and then renamed over
/// the target, so the file on disk is always a complete document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> Result<PathBuf, StoreError> {
        let mut name = self
            .path
            .file_name()
            .ok_or_else(|| {
                StoreError::io(
                    &self.path,
                    std::io::Error::new(ErrorKind::InvalidInput, "ledger path has no file name"),
                )
            })?
            .to_os_string();
        name.push(".tmp");
        Ok(self.path.with_file_name(name))
    }

    fn encode(document: &LedgerDocument) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        document.serialize(&mut serializer)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<LedgerDocument>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };

        let document = serde_json::from_slice(&bytes)?;
        Ok(Some(document))
    }

    fn save(&self, document: &LedgerDocument) -> Result<(), StoreError> {
        let bytes = Self::encode(document)?;
        let tmp = self.tmp_path()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        {
            let mut file = File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
            file.write_all(&bytes).map_err(|e| StoreError::io(&tmp, e))?;
            file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "ledger document saved");
        Ok(())
    }
}
