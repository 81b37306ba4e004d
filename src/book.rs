use crate::chapters::Chapter;
use crate::cover::CoverImage;
use crate::manifest::BookManifest;

/// Everything the emitters need, loaded once per run.
#[derive(Debug, Clone)]
pub struct Book {
    pub manifest: BookManifest,
    pub chapters: Vec<Chapter>,
    pub cover: Option<CoverImage>,
}

impl Book {
    pub fn new(manifest: BookManifest, chapters: Vec<Chapter>, cover: Option<CoverImage>) -> Self {
        Self {
            manifest,
            chapters,
            cover,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use std::path::PathBuf;

    /// 2x2 RGB PNG.
    pub const TINY_PNG: [u8; 75] = [
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x02, 0x08, 0x02, 0x00, 0x00, 0x00, 0xfd,
        0xd4, 0x9a, 0x73, 0x00, 0x00, 0x00, 0x12, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0xf8,
        0xcf, 0xc0, 0xc0, 0x00, 0xc2, 0x0c, 0xff, 0x81, 0x00, 0x00, 0x1f, 0xee, 0x05, 0xfb, 0x0b,
        0xd9, 0x68, 0x8b, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ];

    pub fn chapter(index: usize, stem: &str, markdown: &str) -> Chapter {
        Chapter {
            index,
            path: PathBuf::from(format!("book/{stem}.md")),
            file_name: format!("{stem}.md"),
            title: crate::chapters::title_from_stem(stem),
            markdown: markdown.to_string(),
        }
    }

    pub fn cover() -> CoverImage {
        CoverImage {
            file_name: "cover.png".to_string(),
            media_type: "image/png",
            path: PathBuf::from("/tmp/book/cover.png"),
            data: TINY_PNG.to_vec(),
        }
    }

    pub fn sample_book(with_cover: bool) -> Book {
        Book::new(
            BookManifest::default(),
            vec![
                chapter(1, "01_introduction", "Welcome to **ETL**.\n\n- extract\n- load\n"),
                chapter(
                    2,
                    "02_data_sources",
                    "## Sources\n\nUse `psycopg` & friends.\n\n```python\nprint(\"hi\")\n```\n",
                ),
            ],
            with_cover.then(cover),
        )
    }
}
