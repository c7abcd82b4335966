//! Local file storage for uploaded recipe images

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

const RECIPE_IMAGE_DIR: &str = "uploads/recipe";

/// Relative path for a newly uploaded recipe image
///
/// The stored name is a random UUID followed by the original file's
/// extension, dot included.
pub fn recipe_image_file_path(filename: &str) -> String {
    recipe_image_file_path_with_id(filename, Uuid::new_v4())
}

fn recipe_image_file_path_with_id(filename: &str, id: Uuid) -> String {
    format!("{}/{}{}", RECIPE_IMAGE_DIR, id, extension(filename))
}

/// Extension of `filename` including the dot, or empty
///
/// Anything other than ASCII letters and digits is dropped so the stored
/// path stays inside the upload directory.
fn extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// Directory under which uploaded files are written
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Media root from `MEDIA_ROOT`, defaulting to `media`
    pub fn from_env() -> Self {
        Self::new(std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a stored relative path
    pub fn path_for(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Write `bytes` at `relative`, creating parent directories
    pub async fn save(&self, relative: &str, bytes: &[u8]) -> std::io::Result<()> {
        let path = self.path_for(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        info!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(())
    }

    /// Remove a stored file; a missing file is not an error
    pub async fn remove(&self, relative: &str) {
        let path = self.path_for(relative);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
}
