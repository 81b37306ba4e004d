//! One emitter per output format. Each turns a [`Book`] into the bytes of a
//! single file; writing them out is left to the caller.

pub mod epub;
pub mod html;
pub mod markdown;
pub mod pdf;

use anyhow::Result;

use crate::book::Book;
use crate::format::OutputFormat;

pub fn render(format: OutputFormat, book: &Book) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Epub => epub::render(book),
        OutputFormat::Html => html::render(book),
        OutputFormat::Pdf => pdf::render(book),
        OutputFormat::Markdown => markdown::render(book),
    }
}
