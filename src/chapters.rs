use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::markdown;

/// One markdown source file of the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// 1-based position in the book.
    pub index: usize,
    pub path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub markdown: String,
}

impl Chapter {
    /// Heading used by every emitter, e.g. `Chapter 2: Data Sources`.
    pub fn heading(&self) -> String {
        format!("Chapter {}: {}", self.index, self.title)
    }

    /// Anchor / file stem, zero-padded so it sorts like the chapter order.
    pub fn slug(&self) -> String {
        format!("chapter_{:02}", self.index)
    }

    pub fn to_html(&self) -> String {
        markdown::to_html(&self.markdown)
    }

    /// Body as well-formed XHTML, for EPUB content documents.
    pub fn to_xhtml(&self) -> String {
        markdown::to_xhtml(&self.to_html())
    }
}

/// Lists every `*.md` file directly inside `book_dir`, ordered by file name.
pub async fn discover(book_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(book_dir)
        .await
        .map_err(|e| anyhow!("Failed to read book directory {}: {}", book_dir.display(), e))?;
    let mut md_files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "md") && entry.file_type().await?.is_file() {
            md_files.push(path);
        }
    }

    // File name order is chapter order
    md_files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Discovered {} markdown files in {}", md_files.len(), book_dir.display());
    Ok(md_files)
}

/// Reads all chapters of `book_dir` in order.
pub async fn load(book_dir: &Path) -> Result<Vec<Chapter>> {
    let paths = discover(book_dir).await?;
    let mut chapters = Vec::with_capacity(paths.len());

    for (i, path) in paths.into_iter().enumerate() {
        let markdown = fs::read_to_string(&path)
            .await
            .map_err(|e| anyhow!("Failed to read chapter {}: {}", path.display(), e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        chapters.push(Chapter {
            index: i + 1,
            title: title_from_stem(&stem),
            file_name,
            path,
            markdown,
        });
    }

    info!("Found {} chapters:", chapters.len());
    for chapter in &chapters {
        info!("   - {}", chapter.file_name.blue());
    }

    Ok(chapters)
}

/// `02_data_sources` becomes `02 Data Sources`.
///
/// Words start after any non-alphabetic character, so `etl's` becomes `Etl'S`
/// and `2nd` becomes `2Nd`.
pub fn title_from_stem(stem: &str) -> String {
    let mut title = String::with_capacity(stem.len());
    let mut at_word_start = true;

    for ch in stem.replace('_', " ").chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                title.extend(ch.to_uppercase());
            } else {
                title.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            title.push(ch);
            at_word_start = true;
        }
    }

    title
}
