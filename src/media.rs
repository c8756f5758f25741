//! # Media Store
//!
//! Disk-backed image storage for perk and blog media. Uploads are validated
//! against a MIME allow-list and the configured size limit, then written
//! content-addressed (digest-named) under a per-kind subdirectory of the
//! upload root. Callers receive site-relative paths suitable for storing on
//! the owning record. Deletion is best-effort by contract: a failed removal
//! is logged and swallowed so the surrounding record write always proceeds.

use std::path::PathBuf;

use anyhow::Context;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use crate::config::MediaConfig;

/// Accepted upload content types and the extension each is stored under.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Public URL prefix stored media paths are served under.
const PUBLIC_PREFIX: &str = "/uploads";

/// Digest prefix length used for file names.
const NAME_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unsupported content type '{0}', expected image/jpeg, image/png, image/webp or image/gif")]
    UnsupportedType(String),
    #[error("file of {size} bytes exceeds the {limit} byte upload limit")]
    TooLarge { size: u64, limit: u64 },
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Validates and persists uploaded images.
pub struct MediaStore {
    upload_dir: PathBuf,
    max_bytes: u64,
}

impl MediaStore {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            upload_dir: PathBuf::from(&config.upload_dir),
            max_bytes: config.max_upload_bytes,
        }
    }

    /// Validate and persist one uploaded file under `kind`, returning the
    /// site-relative path to store on the owning record. Identical bytes
    /// land on the same name, so re-uploads are no-ops.
    pub fn store(
        &self,
        kind: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| MediaError::UnsupportedType(content_type.to_string()))?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(MediaError::TooLarge {
                size: bytes.len() as u64,
                limit: self.max_bytes,
            });
        }

        let digest = hex::encode(Sha256::digest(bytes));
        let name = format!("{}.{}", &digest[..NAME_LEN], extension);
        let dir = self.upload_dir.join(kind);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create media directory {}", dir.display()))?;
        let path = dir.join(&name);
        if !path.exists() {
            std::fs::write(&path, bytes)
                .with_context(|| format!("Failed to write media file {}", path.display()))?;
        }
        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, kind, name))
    }

    /// Remove a previously stored file. Never fails: unknown, foreign or
    /// undeletable paths are logged and ignored.
    pub fn remove_best_effort(&self, site_path: &str) {
        let prefix = format!("{}/", PUBLIC_PREFIX);
        let Some(relative) = site_path.strip_prefix(&prefix) else {
            warn!(path = site_path, "Refusing to remove media outside the upload prefix");
            return;
        };
        if relative.split('/').any(|part| part == ".." || part.is_empty()) {
            warn!(path = site_path, "Refusing to remove media with a traversing path");
            return;
        }
        let target = self.upload_dir.join(relative);
        match std::fs::remove_file(&target) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(error = ?err, path = %target.display(), "Failed to remove media file");
            }
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == content_type)
        .map(|(_, ext)| *ext)
}
