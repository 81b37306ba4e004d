//! # md2ebook
//!
//! A CLI utility to turn a folder of markdown chapters into an ebook.
//!
//! ## Features
//!
//! - Chapters ordered by file name, titled from their file names
//! - EPUB 3 with optional cover image
//! - Single-page HTML, opened in the browser when done
//! - PDF with cover page and table of contents
//! - Combined markdown document
//!
//! ## Usage
//!
//! ```bash
//! md2ebook --format all --output my_book
//! ```

mod book;
mod browser;
mod chapters;
mod converter;
mod cover;
mod emitters;
mod format;
mod manifest;
mod markdown;
pub mod menu;

pub use book::Book;
pub use chapters::{title_from_stem, Chapter};
pub use converter::Converter;
pub use cover::CoverImage;
pub use format::{plan_outputs, FormatChoice, OutputFormat, OutputTarget};
pub use manifest::BookManifest;
