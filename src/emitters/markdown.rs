use anyhow::Result;

use crate::book::Book;

/// Concatenates every chapter into one markdown document.
pub fn render(book: &Book) -> Result<Vec<u8>> {
    let manifest = &book.manifest;
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", manifest.title));
    out.push_str(&format!("*By {}*\n\n", manifest.author));
    out.push_str("---\n\n");

    for chapter in &book.chapters {
        out.push_str(&format!("## {}\n\n", chapter.heading()));
        out.push_str(&chapter.markdown);
        out.push_str("\n\n---\n\n");
    }

    Ok(out.into_bytes())
}
