//! Local file image source.
//!
//! Cycles through a list of local image files, one per capture. Paths of the
//! form `stub://<cable type>` produce a synthetic capture instead of reading
//! from disk. URL schemes other than `stub://` are rejected.

use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::{CaptureError, ImageSource};
use crate::cable::CableType;
use crate::synthetic;

const STUB_SCHEME: &str = "stub://";
const STUB_SIZE: (u32, u32) = (320, 240);

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub images_captured: u64,
    pub paths: usize,
}

pub struct FileImageSource {
    paths: Vec<String>,
    next: usize,
    captured: u64,
}

impl FileImageSource {
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(anyhow!("file source needs at least one path"));
        }
        if let Some(bad) = paths.iter().find(|p| !is_local_file_path(p)) {
            return Err(anyhow!(
                "file source only supports local paths (no URL schemes): {}",
                bad
            ));
        }
        Ok(Self {
            paths,
            next: 0,
            captured: 0,
        })
    }

    pub fn stats(&self) -> FileStats {
        FileStats {
            images_captured: self.captured,
            paths: self.paths.len(),
        }
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, CaptureError> {
        if let Some(kind) = path.strip_prefix(STUB_SCHEME) {
            let cable_type: CableType = kind
                .parse()
                .map_err(|e: anyhow::Error| CaptureError::CaptureFailed(e.to_string()))?;
            return synthetic::cable_image(cable_type, STUB_SIZE.0, STUB_SIZE.1, self.captured)
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()));
        }
        std::fs::read(PathBuf::from(path)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CaptureError::DeviceUnavailable,
            _ => CaptureError::CaptureFailed(format!("{}: {}", path, e)),
        })
    }
}

impl ImageSource for FileImageSource {
    fn name(&self) -> &str {
        "file"
    }

    fn capture_image(&mut self) -> Result<Vec<u8>, CaptureError> {
        let path = self.paths[self.next].clone();
        self.next = (self.next + 1) % self.paths.len();
        let bytes = self.read(&path)?;
        self.captured += 1;
        Ok(bytes)
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}
