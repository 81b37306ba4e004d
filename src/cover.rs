use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// File names checked in order; the first one present is the cover.
pub const COVER_CANDIDATES: [&str; 4] = ["cover.png", "coverpage.png", "cover.jpg", "cover.jpeg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub file_name: String,
    pub media_type: &'static str,
    /// Absolute location, used for `file://` references.
    pub path: PathBuf,
    pub data: Vec<u8>,
}

impl CoverImage {
    pub fn extension(&self) -> &str {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("png")
    }
}

/// Looks for a cover image in `book_dir`. A missing cover is not an error.
pub async fn resolve(book_dir: &Path) -> Result<Option<CoverImage>> {
    for name in COVER_CANDIDATES {
        let candidate = book_dir.join(name);
        let exists = fs::try_exists(&candidate)
            .await
            .map_err(|e| anyhow!("Failed to check cover image {}: {}", candidate.display(), e))?;
        if !exists {
            continue;
        }

        let data = fs::read(&candidate)
            .await
            .map_err(|e| anyhow!("Failed to read cover image {}: {}", candidate.display(), e))?;
        let path = match fs::canonicalize(&candidate).await {
            Ok(absolute) => absolute,
            Err(_) => candidate,
        };

        info!("Cover image added from {}", path.display().to_string().green());
        return Ok(Some(CoverImage {
            file_name: name.to_string(),
            media_type: media_type_for(name),
            path,
            data,
        }));
    }

    info!("No cover image found in {}", book_dir.display());
    Ok(None)
}

fn media_type_for(name: &str) -> &'static str {
    if name.ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}
