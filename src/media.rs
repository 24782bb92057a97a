use std::{io::Cursor, path::PathBuf};

use image::ImageReader;
use log::{debug, warn};

use crate::{
    constants::{IMAGE_FORMATS, MEDIA_URL, RECIPE_IMAGE_DIR},
    error::{Error, HttpError, Result},
};

pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Uploaded files under the media root, addressed by their relative path.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{MEDIA_URL}{path}")
    }

    /// Checks the bytes decode as a supported image and stores them under a
    /// fresh name. Returns the relative path.
    pub async fn save_recipe_image(&self, data: &[u8]) -> Result<String> {
        let extension = detect_image(data)?;
        let relative = format!("{RECIPE_IMAGE_DIR}/{}.{extension}", uuid::Uuid::new_v4());
        let absolute = self.root.join(&relative);

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create media directory", e))?;
        }
        tokio::fs::write(&absolute, data)
            .await
            .map_err(|e| io_error("write upload", e))?;

        debug!("Stored upload at {}", absolute.display());
        Ok(relative)
    }

    pub async fn remove(&self, path: &str) {
        let absolute = self.root.join(path);
        if let Err(e) = tokio::fs::remove_file(&absolute).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {e}", absolute.display());
            }
        }
    }
}

/// Returns the file extension for a supported image.
pub fn detect_image(data: &[u8]) -> Result<&'static str> {
    let invalid = || Error::field("image", INVALID_IMAGE);

    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|_| invalid())?;
    let format = reader.format().ok_or_else(invalid)?;
    let extension = IMAGE_FORMATS
        .iter()
        .find(|(supported, _)| *supported == format)
        .map(|(_, extension)| *extension)
        .ok_or_else(invalid)?;

    reader.into_dimensions().map_err(|_| invalid())?;

    Ok(extension)
}

fn io_error(action: &str, e: std::io::Error) -> Error {
    log::error!("Failed to {action}: {e}");
    HttpError::Internal.default()
}
