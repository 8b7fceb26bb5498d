// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload directory storage. Assets are written to a temporary file in the
// same directory and atomically renamed over the target name. Writing and
// renaming are separate steps so that a request can stage all of its assets
// before any of them becomes visible.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use imgfx_core::error::StorageError;
use imgfx_core::{AssetId, StoredAsset};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

/// Flat directory of stored assets keyed by `AssetId`.
///
/// A second store under an existing id replaces the earlier file.
#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    /// Open (and create, if missing) the upload directory.
    #[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|source| StorageError::CreateDir {
            path: root.clone(),
            source,
        })?;
        info!("Asset store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, id: &AssetId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Write `bytes` to a temporary file beside `id` without publishing it.
    ///
    /// Nothing under `id` changes until [`StagedAsset::commit`]; dropping the
    /// staged asset discards the temporary file.
    #[instrument(skip(self, bytes), fields(id = %id, len = bytes.len()))]
    pub fn stage(&self, id: &AssetId, bytes: &[u8]) -> Result<StagedAsset, StorageError> {
        let path = self.path_of(id);
        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        Ok(StagedAsset {
            id: id.clone(),
            path,
            len: bytes.len() as u64,
            sha256: sha256_hex(bytes),
            tmp,
        })
    }

    /// Persist `bytes` under `id`, replacing any earlier asset.
    pub fn store(&self, id: &AssetId, bytes: &[u8]) -> Result<StoredAsset, StorageError> {
        self.stage(id, bytes)?.commit()
    }

    /// Read a stored asset back, checking it against its recorded digest.
    pub fn read(&self, asset: &StoredAsset) -> Result<Vec<u8>, StorageError> {
        let bytes = std::fs::read(&asset.path).map_err(|source| StorageError::Read {
            path: asset.path.clone(),
            source,
        })?;
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(&asset.sha256) {
            return Err(StorageError::IntegrityMismatch {
                expected: asset.sha256.clone(),
                actual,
            });
        }
        Ok(bytes)
    }

    /// Delete an asset. Missing files are not an error.
    pub fn remove(&self, id: &AssetId) {
        let path = self.path_of(id);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(id = %id, "Asset removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(id = %id, error = %e, "Failed to remove asset"),
        }
    }
}

/// Fully written asset waiting to be renamed into place.
#[derive(Debug)]
pub struct StagedAsset {
    id: AssetId,
    path: PathBuf,
    len: u64,
    sha256: String,
    tmp: NamedTempFile,
}

impl StagedAsset {
    pub fn id(&self) -> &AssetId {
        &self.id
    }

    /// Atomically rename the staged file over its target name.
    pub fn commit(self) -> Result<StoredAsset, StorageError> {
        let path = self.path;
        // On failure the PersistError hands back the temp file, which is
        // removed when dropped here.
        self.tmp
            .persist(&path)
            .map_err(|e| StorageError::Write {
                path: path.clone(),
                source: e.error,
            })?;

        let asset = StoredAsset {
            id: self.id,
            path,
            len: self.len,
            sha256: self.sha256,
            stored_at: Utc::now(),
        };
        debug!(id = %asset.id, sha256 = %asset.sha256, "Asset stored");
        Ok(asset)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
