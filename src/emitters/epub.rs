use anyhow::{anyhow, Result};
use chrono::Utc;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::book::Book;
use crate::chapters::Chapter;
use crate::markdown::escape_xml;

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLESHEET: &str = "body { font-family: serif; line-height: 1.5; }
h1 { font-size: 1.6em; }
pre { white-space: pre-wrap; font-size: 0.85em; background: #f5f5f5; padding: 0.5em; }
code { font-family: monospace; }
img.cover { display: block; max-width: 100%; max-height: 100%; margin: 0 auto; }
";

/// Packages the book as an EPUB 3 container with an EPUB 2 NCX for older readers.
pub fn render(book: &Book) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    // mimetype must be the first entry and uncompressed
    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML.as_bytes())?;

    zip.start_file("OEBPS/content.opf", deflated)?;
    zip.write_all(package_document(book).as_bytes())?;

    zip.start_file("OEBPS/nav.xhtml", deflated)?;
    zip.write_all(nav_document(book).as_bytes())?;

    zip.start_file("OEBPS/toc.ncx", deflated)?;
    zip.write_all(ncx_document(book).as_bytes())?;

    zip.start_file("OEBPS/style.css", deflated)?;
    zip.write_all(STYLESHEET.as_bytes())?;

    if let Some(cover) = &book.cover {
        zip.start_file(format!("OEBPS/{}", cover_href(book)), stored)?;
        zip.write_all(&cover.data)?;

        zip.start_file("OEBPS/cover.xhtml", deflated)?;
        zip.write_all(cover_page(book).as_bytes())?;
    }

    for chapter in &book.chapters {
        debug!("Adding {} to EPUB", chapter.file_name);
        zip.start_file(format!("OEBPS/{}", chapter_href(chapter)), deflated)?;
        zip.write_all(chapter_document(book, chapter).as_bytes())?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| anyhow!("Failed to finalize EPUB archive: {}", e))?;
    Ok(cursor.into_inner())
}

fn chapter_href(chapter: &Chapter) -> String {
    format!("{}.xhtml", chapter.slug())
}

fn cover_href(book: &Book) -> String {
    let ext = book.cover.as_ref().map(|c| c.extension()).unwrap_or("png");
    format!("images/cover.{ext}")
}

fn package_document(book: &Book) -> String {
    let manifest = &book.manifest;
    let mut opf = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="BookId">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
"#,
    );

    opf.push_str(&format!(
        "    <dc:identifier id=\"BookId\">{}</dc:identifier>\n",
        escape_xml(&manifest.identifier)
    ));
    opf.push_str(&format!("    <dc:title>{}</dc:title>\n", escape_xml(&manifest.title)));
    opf.push_str(&format!(
        "    <dc:language>{}</dc:language>\n",
        escape_xml(&manifest.language)
    ));
    opf.push_str(&format!(
        "    <dc:creator id=\"creator\">{}</dc:creator>\n",
        escape_xml(&manifest.author)
    ));
    opf.push_str(&format!(
        "    <dc:publisher>{}</dc:publisher>\n",
        escape_xml(&manifest.publisher)
    ));
    opf.push_str(&format!(
        "    <meta property=\"dcterms:modified\">{}</meta>\n",
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    ));
    if book.cover.is_some() {
        opf.push_str("    <meta name=\"cover\" content=\"cover-image\"/>\n");
    }
    opf.push_str("  </metadata>\n  <manifest>\n");

    opf.push_str(
        "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
    );
    opf.push_str("    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n");
    opf.push_str("    <item id=\"style\" href=\"style.css\" media-type=\"text/css\"/>\n");
    if let Some(cover) = &book.cover {
        opf.push_str(&format!(
            "    <item id=\"cover-image\" href=\"{}\" media-type=\"{}\" properties=\"cover-image\"/>\n",
            cover_href(book),
            cover.media_type
        ));
        opf.push_str(
            "    <item id=\"cover\" href=\"cover.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
    }
    for chapter in &book.chapters {
        opf.push_str(&format!(
            "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            chapter.slug(),
            chapter_href(chapter)
        ));
    }

    opf.push_str("  </manifest>\n  <spine toc=\"ncx\">\n");
    if book.cover.is_some() {
        opf.push_str("    <itemref idref=\"cover\" linear=\"no\"/>\n");
    }
    opf.push_str("    <itemref idref=\"nav\"/>\n");
    for chapter in &book.chapters {
        opf.push_str(&format!("    <itemref idref=\"{}\"/>\n", chapter.slug()));
    }
    opf.push_str("  </spine>\n");

    if book.cover.is_some() {
        opf.push_str(
            "  <guide>\n    <reference type=\"cover\" title=\"Cover\" href=\"cover.xhtml\"/>\n  </guide>\n",
        );
    }
    opf.push_str("</package>\n");
    opf
}

fn xhtml_page(book: &Book, title: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="{lang}" xml:lang="{lang}">
<head>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
{body}
</body>
</html>
"#,
        lang = escape_xml(&book.manifest.language),
        title = escape_xml(title),
    )
}

fn nav_document(book: &Book) -> String {
    let mut body = String::from("<nav epub:type=\"toc\" id=\"toc\">\n  <h1>Table of Contents</h1>\n  <ol>\n");
    for chapter in &book.chapters {
        body.push_str(&format!(
            "    <li><a href=\"{}\">{}</a></li>\n",
            chapter_href(chapter),
            escape_xml(&chapter.heading())
        ));
    }
    body.push_str("  </ol>\n</nav>");
    xhtml_page(book, &book.manifest.title, &body)
}

fn ncx_document(book: &Book) -> String {
    let mut ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head>
    <meta name="dtb:uid" content="{}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle>
    <text>{}</text>
  </docTitle>
  <navMap>
"#,
        escape_xml(&book.manifest.identifier),
        escape_xml(&book.manifest.title)
    );

    for chapter in &book.chapters {
        ncx.push_str(&format!(
            "    <navPoint id=\"navpoint-{idx}\" playOrder=\"{idx}\">\n      <navLabel>\n        <text>{}</text>\n      </navLabel>\n      <content src=\"{}\"/>\n    </navPoint>\n",
            escape_xml(&chapter.heading()),
            chapter_href(chapter),
            idx = chapter.index,
        ));
    }

    ncx.push_str("  </navMap>\n</ncx>\n");
    ncx
}

fn cover_page(book: &Book) -> String {
    let body = format!(
        "<div><img class=\"cover\" src=\"{}\" alt=\"{}\"/></div>",
        cover_href(book),
        escape_xml(&book.manifest.title)
    );
    xhtml_page(book, "Cover", &body)
}

fn chapter_document(book: &Book, chapter: &Chapter) -> String {
    let heading = escape_xml(&chapter.heading());
    let body = format!("<h1>{heading}</h1><hr/>\n{}", chapter.to_xhtml());
    xhtml_page(book, &chapter.heading(), &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::fixtures::{chapter, sample_book};
    use crate::manifest::BookManifest;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;
    use zip::ZipArchive;

    fn entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn container_layout_without_cover() {
        let bytes = render(&sample_book(false)).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        {
            let first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
        }
        assert_eq!(entry(&mut archive, "mimetype"), "application/epub+zip");

        let opf = entry(&mut archive, "OEBPS/content.opf");
        assert!(opf.contains("<dc:identifier id=\"BookId\">urn:isbn:9780000000001</dc:identifier>"));
        assert!(opf.contains("<dc:publisher>Independent Publishing</dc:publisher>"));
        assert!(opf.contains("<dc:language>en</dc:language>"));
        assert!(opf.contains("dcterms:modified"));
        assert!(!opf.contains("cover-image"));

        let nav = opf.find("<itemref idref=\"nav\"/>").unwrap();
        let ch1 = opf.find("<itemref idref=\"chapter_01\"/>").unwrap();
        let ch2 = opf.find("<itemref idref=\"chapter_02\"/>").unwrap();
        assert!(nav < ch1 && ch1 < ch2);

        assert!(archive.by_name("OEBPS/cover.xhtml").is_err());
    }

    #[test]
    fn chapters_carry_numbered_headings() {
        let bytes = render(&sample_book(false)).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let chapter = entry(&mut archive, "OEBPS/chapter_02.xhtml");
        assert!(chapter.contains("<h1>Chapter 2: 02 Data Sources</h1><hr/>"));
        assert!(chapter.contains("<h2>Sources</h2>"));

        let nav = entry(&mut archive, "OEBPS/nav.xhtml");
        assert!(nav.contains("<a href=\"chapter_01.xhtml\">Chapter 1: 01 Introduction</a>"));

        let ncx = entry(&mut archive, "OEBPS/toc.ncx");
        assert!(ncx.contains("playOrder=\"2\""));
    }

    #[test]
    fn cover_is_embedded_first() {
        let bytes = render(&sample_book(true)).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let opf = entry(&mut archive, "OEBPS/content.opf");
        assert!(opf.contains("properties=\"cover-image\""));
        assert!(opf.contains("<meta name=\"cover\" content=\"cover-image\"/>"));
        let cover = opf.find("<itemref idref=\"cover\"").unwrap();
        let nav = opf.find("<itemref idref=\"nav\"/>").unwrap();
        assert!(cover < nav);

        let mut image = Vec::new();
        archive
            .by_name("OEBPS/images/cover.png")
            .unwrap()
            .read_to_end(&mut image)
            .unwrap();
        assert_eq!(image, crate::book::fixtures::TINY_PNG);
    }

    /// Parses `xml` and fails on mismatched or unclosed elements.
    fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        let mut depth = 0usize;
        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => depth -= 1,
                Ok(Event::Eof) => break,
                Err(e) => panic!("malformed XML at {}: {e}\n{xml}", reader.buffer_position()),
                _ => {}
            }
        }
        assert_eq!(depth, 0, "unclosed elements in\n{xml}");
    }

    #[test]
    fn raw_html_in_chapters_becomes_xhtml() {
        let chapters = vec![chapter(
            1,
            "01_markup",
            "Line one<br>\nLine two\n\n<img src=\"a.png\">\n\n<div>unclosed <em>tag\n",
        )];
        let book = Book::new(BookManifest::default(), chapters, None);
        let bytes = render(&book).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        let page = entry(&mut archive, "OEBPS/chapter_01.xhtml");
        assert!(!page.contains("<br>"));
        assert!(page.contains("<img src=\"a.png\"/>"));
        assert_well_formed(&page);
    }
}
