use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use slug::slugify;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Optional metadata override read from the book directory.
pub const MANIFEST_FILE: &str = "book.json";

/// Book metadata used by the emitters.
///
/// Fields missing from `book.json` keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookManifest {
    pub title: String,
    pub author: String,
    pub language: String,
    pub identifier: String,
    pub publisher: String,
}

impl Default for BookManifest {
    fn default() -> Self {
        Self {
            title: "Mastering ETL Pipelines for Data Science Workflows".to_string(),
            author: "Pankaj Nagar".to_string(),
            language: "en".to_string(),
            identifier: "urn:isbn:9780000000001".to_string(),
            publisher: "Independent Publishing".to_string(),
        }
    }
}

impl BookManifest {
    /// Loads `book.json` from `book_dir`, falling back to the defaults when absent.
    pub async fn load(book_dir: &Path) -> Result<Self> {
        let path = book_dir.join(MANIFEST_FILE);
        let exists = fs::try_exists(&path)
            .await
            .map_err(|e| anyhow!("Failed to check {}: {}", path.display(), e))?;
        if !exists {
            debug!("No {} in {}, using default metadata", MANIFEST_FILE, book_dir.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        let manifest: Self = serde_json::from_str(&raw)
            .map_err(|e| anyhow!("Invalid book metadata in {}: {}", path.display(), e))?;

        info!("Loaded book metadata from {}", path.display());
        Ok(manifest)
    }

    /// Base name shared by every output file when none is given.
    pub fn base_name(&self) -> String {
        let base = slugify(&self.title).replace('-', "_");
        if base.is_empty() {
            "book".to_string()
        } else {
            base
        }
    }
}
