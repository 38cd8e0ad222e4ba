//! Atomic PNG export of the composite canvas.
//!
//! The canvas is written to a temporary file in the destination directory
//! and renamed over the well-known path, so a concurrent reader only ever
//! opens a complete image.

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use tempfile::NamedTempFile;

use crate::error::{MosaicError, Result};

/// Publishes the canvas to a fixed path after every successful placement.
pub struct PngExporter {
    path: PathBuf,
}

impl PngExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `canvas` as PNG, atomically replacing the previous export.
    pub fn export(&self, canvas: &GrayImage) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        // Temp file must live in the destination directory so the final
        // rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(dir)?;
        canvas.write_to(tmp.as_file_mut(), ImageFormat::Png)?;
        tmp.persist(&self.path)
            .map_err(|e| MosaicError::Export(e.to_string()))?;
        Ok(())
    }
}
