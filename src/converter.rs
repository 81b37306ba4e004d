use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::book::Book;
use crate::format::{plan_outputs, FormatChoice, OutputFormat, OutputTarget};
use crate::manifest::BookManifest;
use crate::{browser, chapters, cover, emitters};

pub struct Converter {
    book_dir: PathBuf,
    out_dir: PathBuf,
    open_html: bool,
}

impl Converter {
    pub fn new(book_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, open_html: bool) -> Self {
        Self {
            book_dir: book_dir.into(),
            out_dir: out_dir.into(),
            open_html,
        }
    }

    pub fn book_dir(&self) -> &Path {
        &self.book_dir
    }

    /// Checks the book directory and loads metadata, chapters and cover.
    pub async fn load_book(&self) -> Result<Book> {
        let exists = fs::try_exists(&self.book_dir)
            .await
            .map_err(|e| anyhow!("Failed to access book directory '{}': {}", self.book_dir.display(), e))?;
        if !exists {
            return Err(anyhow!(
                "Book directory '{}' not found! Please ensure you have a '{}' folder with your markdown files.",
                self.book_dir.display(),
                self.book_dir.display()
            ));
        }
        if !fs::metadata(&self.book_dir).await?.is_dir() {
            return Err(anyhow!("'{}' is not a directory", self.book_dir.display()));
        }

        let manifest = BookManifest::load(&self.book_dir).await?;
        let chapters = chapters::load(&self.book_dir).await?;
        if chapters.is_empty() {
            return Err(anyhow!(
                "No markdown files found in '{}'!",
                self.book_dir.display()
            ));
        }
        let cover = cover::resolve(&self.book_dir).await?;

        Ok(Book::new(manifest, chapters, cover))
    }

    /// Produces every file `choice` asks for and returns their paths.
    pub async fn run(&self, book: &Book, choice: FormatChoice, output: Option<&str>) -> Result<Vec<PathBuf>> {
        let targets = plan_outputs(choice, output, &book.manifest.base_name(), &self.out_dir);

        fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| anyhow!("Failed to create output directory {}: {}", self.out_dir.display(), e))?;

        let mut written = Vec::with_capacity(targets.len());
        for target in &targets {
            self.emit(book, target).await?;
            written.push(target.path.clone());
        }

        if choice == FormatChoice::All {
            info!("All formats created with base name: {}", output.unwrap_or(&book.manifest.base_name()).green());
        }

        Ok(written)
    }

    async fn emit(&self, book: &Book, target: &OutputTarget) -> Result<()> {
        let bytes = emitters::render(target.format, book)
            .map_err(|e| anyhow!("Failed to build {} {}: {}", target.format, target.path.display(), e))?;

        if let Some(parent) = target.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| anyhow!("Failed to create directory {}: {}", parent.display(), e))?;
        }
        // Truncates any previous output
        fs::write(&target.path, bytes)
            .await
            .map_err(|e| anyhow!("Failed to write {}: {}", target.path.display(), e))?;

        info!("{} created: {}", target.format, target.path.display().to_string().blue());

        if target.format == OutputFormat::Html && self.open_html {
            match browser::open(&target.path) {
                Ok(()) => info!("Opened in browser"),
                Err(e) => warn!("HTML file created - open manually in browser ({})", e),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_book(dir: &Path) {
        let book = dir.join("book");
        std::fs::create_dir_all(&book).unwrap();
        std::fs::write(book.join("02_second.md"), "Second chapter.\n").unwrap();
        std::fs::write(book.join("01_first.md"), "First chapter.\n").unwrap();
    }

    #[tokio::test]
    async fn missing_book_directory_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(dir.path().join("book"), dir.path().join("output"), false);

        let err = converter.load_book().await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn inaccessible_book_directory_is_not_reported_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "not a directory").unwrap();
        // A path through a regular file fails with ENOTDIR rather than NotFound
        let converter = Converter::new(file.join("book"), dir.path().join("output"), false);

        let err = converter.load_book().await.unwrap_err().to_string();
        assert!(err.contains("Failed to access book directory"), "{err}");
        assert!(!err.contains("not found!"), "{err}");
    }

    #[tokio::test]
    async fn empty_book_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("book")).unwrap();
        let converter = Converter::new(dir.path().join("book"), dir.path().join("output"), false);

        let err = converter.load_book().await.unwrap_err();
        assert!(err.to_string().contains("No markdown files"));
    }

    #[tokio::test]
    async fn all_formats_written_once_each() {
        let dir = tempfile::tempdir().unwrap();
        write_book(dir.path());
        let out = dir.path().join("output");
        let converter = Converter::new(dir.path().join("book"), &out, false);

        let book = converter.load_book().await.unwrap();
        assert!(book.cover.is_none());
        let written = converter.run(&book, FormatChoice::All, Some("release")).await.unwrap();

        assert_eq!(written.len(), 4);
        let mut names: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["release.epub", "release.html", "release.pdf", "release_combined.md"]
        );
    }

    #[tokio::test]
    async fn rerun_overwrites_output() {
        let dir = tempfile::tempdir().unwrap();
        write_book(dir.path());
        let converter = Converter::new(dir.path().join("book"), dir.path().join("output"), false);
        let book = converter.load_book().await.unwrap();

        let first = converter.run(&book, FormatChoice::Md, None).await.unwrap();
        let before = std::fs::read_to_string(&first[0]).unwrap();
        let second = converter.run(&book, FormatChoice::Md, None).await.unwrap();
        let after = std::fs::read_to_string(&second[0]).unwrap();

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert_eq!(after.matches("## Chapter 1: 01 First").count(), 1);
    }
}
