use anyhow::Result;
use url::Url;

use crate::book::Book;
use crate::cover::CoverImage;
use crate::markdown::escape_xml;

const STYLE: &str = r#"        body { font-family: Arial, sans-serif; line-height: 1.6; margin: 40px; }
        h1 { color: #2c3e50; border-bottom: 2px solid #3498db; }
        h2 { color: #34495e; }
        h3 { color: #7f8c8d; }
        code { background-color: #f8f9fa; padding: 2px 4px; border-radius: 3px; }
        pre { background-color: #f8f9fa; padding: 15px; border-radius: 5px; overflow-x: auto; }
        .cover { display: block; max-width: 100%; max-height: 90vh; margin: 0 auto 30px; }
        nav.contents ol { padding-left: 20px; }
"#;

/// Renders the whole book as one standalone HTML page.
pub fn render(book: &Book) -> Result<Vec<u8>> {
    let manifest = &book.manifest;
    let title = escape_xml(&manifest.title);
    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{STYLE}    </style>
</head>
<body>
"#,
        lang = escape_xml(&manifest.language),
    );

    if let Some(cover) = &book.cover {
        html.push_str(&format!(
            "    <img class=\"cover\" src=\"{}\" alt=\"Cover\">\n",
            escape_xml(&cover_src(cover))
        ));
    }

    html.push_str(&format!("    <h1>{title}</h1>\n"));
    html.push_str(&format!("    <p><em>By {}</em></p>\n", escape_xml(&manifest.author)));
    html.push_str("    <hr>\n");

    html.push_str("    <nav class=\"contents\">\n        <ol>\n");
    for chapter in &book.chapters {
        html.push_str(&format!(
            "            <li><a href=\"#{}\">{}</a></li>\n",
            chapter.slug(),
            escape_xml(&chapter.title)
        ));
    }
    html.push_str("        </ol>\n    </nav>\n    <hr>\n");

    for chapter in &book.chapters {
        html.push_str(&format!(
            "\n    <h2 id=\"{}\">{}</h2>\n{}\n    <hr>\n",
            chapter.slug(),
            escape_xml(&chapter.heading()),
            chapter.to_html()
        ));
    }

    html.push_str("\n</body>\n</html>\n");
    Ok(html.into_bytes())
}

fn cover_src(cover: &CoverImage) -> String {
    Url::from_file_path(&cover.path)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| cover.path.display().to_string())
}
