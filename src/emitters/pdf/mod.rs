//! PDF emitter: cover page, table of contents, then one section per chapter.

mod fonts;
mod layout;
mod render;

use anyhow::{anyhow, Result};
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use crate::book::Book;
use crate::cover::CoverImage;
use fonts::FontFace;
use layout::{text_operations, Layout, Page, Span, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};

const TOC_ENTRIES_PER_PAGE: usize = 28;
const TOC_TITLE_SIZE: f32 = 18.0;
const TOC_ENTRY_SIZE: f32 = 12.0;
const FOOTER_SIZE: f32 = 9.0;

/// Decoded cover, ready to be placed on the first page.
struct CoverXObject {
    stream: Stream,
    width: f32,
    height: f32,
}

fn prepare_cover(cover: &CoverImage) -> Option<CoverXObject> {
    let stream = match lopdf::xobject::image_from(cover.data.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Skipping cover {} in PDF: {}", cover.file_name, e);
            return None;
        }
    };
    let dimension = |key: &[u8]| stream.dict.get(key).and_then(Object::as_i64).ok();
    let size = (dimension(b"Width"), dimension(b"Height"));
    match size {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some(CoverXObject {
            width: w as f32,
            height: h as f32,
            stream,
        }),
        _ => {
            warn!("Skipping cover {} in PDF: unknown image size", cover.file_name);
            None
        }
    }
}

/// Number of pages reserved for the table of contents.
fn toc_page_count(entries: usize) -> usize {
    entries.div_ceil(TOC_ENTRIES_PER_PAGE).max(1)
}

fn write_toc(layout: &mut Layout, entries: &[(String, usize)]) {
    layout.new_page();
    layout.single_line("Table of Contents", FontFace::Bold, TOC_TITLE_SIZE);
    layout.space(8.0);

    for (i, chunk) in entries.chunks(TOC_ENTRIES_PER_PAGE).enumerate() {
        if i > 0 {
            layout.new_page();
        }
        for (title, page) in chunk {
            let title = title.replace('\u{2022}', "");
            layout.single_line_with_suffix(
                &title,
                &format!(" .......... {page}"),
                FontFace::Regular,
                TOC_ENTRY_SIZE,
            );
        }
    }
}

fn footer(page_number: usize) -> Vec<lopdf::content::Operation> {
    let label = page_number.to_string();
    let width = fonts::text_width(&label, FontFace::Regular, FOOTER_SIZE);
    text_operations(
        (PAGE_WIDTH - width) / 2.0,
        MARGIN / 2.0,
        &[Span::new(label, FontFace::Regular)],
        FOOTER_SIZE,
    )
}

/// Lays the book out and serializes it as a PDF document.
pub fn render(book: &Book) -> Result<Vec<u8>> {
    let cover = book.cover.as_ref().and_then(prepare_cover);
    let cover_pages = usize::from(cover.is_some());
    let toc_pages = toc_page_count(book.chapters.len());
    let first_chapter_page = cover_pages + toc_pages;

    let mut body = Layout::new();
    let mut toc_entries = Vec::with_capacity(book.chapters.len());
    for chapter in &book.chapters {
        let start = body.new_page();
        // Page numbers are 1-based and count the cover and contents pages
        toc_entries.push((chapter.title.clone(), first_chapter_page + start + 1));
        render::chapter(&mut body, chapter);
    }
    debug!("Laid out {} chapters on {} pages", book.chapters.len(), body.page_count());

    let mut front = Layout::new();
    if cover.is_some() {
        front.new_page();
    }
    write_toc(&mut front, &toc_entries);

    let mut pages = front.into_pages();
    for (i, mut page) in body.into_pages().into_iter().enumerate() {
        page.operations.extend(footer(first_chapter_page + i + 1));
        pages.push(page);
    }

    assemble(book, pages, cover)
}

fn font_resources(doc: &mut Document) -> Dictionary {
    let mut fonts = Dictionary::new();
    for face in FontFace::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), font_id);
    }
    fonts
}

fn assemble(book: &Book, pages: Vec<Page>, cover: Option<CoverXObject>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let fonts = font_resources(&mut doc);
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let mut page_ids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page.operations,
        };
        let encoded = content
            .encode()
            .map_err(|e| anyhow!("Failed to encode page content: {}", e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().copied().map(Object::Reference).collect();
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH as i64),
                Object::Integer(PAGE_HEIGHT as i64),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(fonts::encode(&book.manifest.title)),
        "Author" => Object::string_literal(fonts::encode(&book.manifest.author)),
        "Producer" => Object::string_literal("md2ebook"),
    });
    doc.trailer.set("Info", info_id);

    if let (Some(cover), Some(&cover_page)) = (cover, page_ids.first()) {
        // Fit inside the page, preserving the aspect ratio, centered
        let scale = (PAGE_WIDTH / cover.width).min(PAGE_HEIGHT / cover.height);
        let (w, h) = (cover.width * scale, cover.height * scale);
        let position = ((PAGE_WIDTH - w) / 2.0, (PAGE_HEIGHT - h) / 2.0);
        if let Err(e) = doc.insert_image(cover_page, cover.stream, position, (w, h)) {
            warn!("Failed to place cover image: {}", e);
        }
    }

    doc.compress();

    let mut data = Vec::new();
    doc.save_to(&mut data)
        .map_err(|e| anyhow!("Failed to serialize PDF: {}", e))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::fixtures::{chapter, sample_book};
    use crate::manifest::BookManifest;

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn contents_then_chapters() {
        let bytes = render(&sample_book(false)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        // One contents page plus one page per short chapter
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn cover_adds_a_page() {
        let bytes = render(&sample_book(true)).unwrap();
        assert_eq!(page_count(&bytes), 4);
    }

    #[test]
    fn unreadable_cover_is_skipped() {
        let mut book = sample_book(true);
        if let Some(cover) = book.cover.as_mut() {
            cover.data = b"not an image".to_vec();
        }
        let bytes = render(&book).unwrap();
        assert_eq!(page_count(&bytes), 3);
    }

    #[test]
    fn contents_pages_grow_with_chapter_count() {
        assert_eq!(toc_page_count(0), 1);
        assert_eq!(toc_page_count(28), 1);
        assert_eq!(toc_page_count(29), 2);

        let chapters = (1..=30)
            .map(|i| chapter(i, &format!("{i:02}_part"), "Short."))
            .collect();
        let book = Book::new(BookManifest::default(), chapters, None);
        let bytes = render(&book).unwrap();
        assert_eq!(page_count(&bytes), 2 + 30);
    }

    fn shown_text(page: &Page) -> Vec<String> {
        page.operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn toc_lists_absolute_page_numbers() {
        let mut layout = Layout::new();
        write_toc(&mut layout, &[("Intro".to_string(), 3), ("Next".to_string(), 5)]);
        assert_eq!(layout.page_count(), 1);
        let shown = shown_text(&layout.into_pages()[0]);
        assert_eq!(
            shown,
            ["Table of Contents", "Intro .......... 3", "Next .......... 5"]
        );
    }

    #[test]
    fn long_toc_titles_keep_their_page_number() {
        let title = "A Very Long Chapter Title About Building Reliable Incremental ETL Pipelines With Python and SQL";
        let mut layout = Layout::new();
        write_toc(&mut layout, &[(title.to_string(), 42)]);

        let shown = shown_text(&layout.into_pages()[0]);
        let entry = &shown[1];
        assert!(entry.starts_with("A Very Long Chapter Title"));
        assert!(entry.ends_with("... .......... 42"), "{entry}");
        assert!(fonts::text_width(entry, FontFace::Regular, TOC_ENTRY_SIZE) <= PAGE_WIDTH - 2.0 * MARGIN);
    }
}
