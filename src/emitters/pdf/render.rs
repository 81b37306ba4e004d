//! Lays out a chapter's rendered HTML onto PDF pages.

use scraper::{ElementRef, Html, Node};

use super::fonts::FontFace;
use super::layout::{Layout, Span};
use crate::chapters::Chapter;

const BODY_SIZE: f32 = 11.0;
const CODE_SIZE: f32 = 9.0;
const CHAPTER_TITLE_SIZE: f32 = 20.0;
const NEST_INDENT: f32 = 18.0;

enum ListKind {
    Bullet,
    Ordered(u64),
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "pre"
            | "blockquote"
            | "table"
            | "hr"
            | "div"
            | "section"
            | "figure"
            | "style"
            | "script"
    )
}

fn heading_size(level: usize) -> f32 {
    match level {
        1 => 18.0,
        2 => 16.0,
        3 => 14.0,
        4 => 12.5,
        _ => BODY_SIZE,
    }
}

/// Collects inline runs under `el`, switching faces for emphasis and code.
fn inline(el: ElementRef<'_>, face: FontFace, out: &mut Vec<Span>) {
    let face = match el.value().name() {
        "strong" | "b" => face.bold(),
        "em" | "i" => face.italic(),
        "code" | "kbd" | "samp" => FontFace::Mono,
        "br" => {
            out.push(Span::new("\n", face));
            return;
        }
        "img" => {
            let alt = el.value().attr("alt").filter(|a| !a.is_empty()).unwrap_or("image");
            out.push(Span::new(format!("[image: {alt}]"), face.italic()));
            return;
        }
        "style" | "script" => return,
        _ => face,
    };

    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            inline(child_el, face, out);
        } else if let Node::Text(text) = child.value() {
            out.push(Span::new(text_run(text), face));
        }
    }
}

/// Newlines in source HTML are soft breaks.
fn text_run(text: &str) -> String {
    text.replace('\n', " ")
}

struct Renderer<'a> {
    layout: &'a mut Layout,
    lists: Vec<ListKind>,
    /// List marker waiting for the first line of its item.
    marker: Option<String>,
}

impl Renderer<'_> {
    fn paragraph(&mut self, mut spans: Vec<Span>, size: f32) {
        if let Some(marker) = self.marker.take() {
            spans.insert(0, Span::new(marker, FontFace::Regular));
        } else if spans.iter().all(|s| s.text.trim().is_empty()) {
            return;
        }
        self.layout.paragraph(&spans, size);
    }

    fn flush(&mut self, pending: &mut Vec<Span>) {
        if !pending.is_empty() {
            let spans = std::mem::take(pending);
            if spans.iter().any(|s| !s.text.trim().is_empty()) {
                self.paragraph(spans, BODY_SIZE);
            }
        }
    }

    /// Renders the children of `parent`, grouping loose inline content into paragraphs.
    fn blocks(&mut self, parent: ElementRef<'_>) {
        let mut pending = Vec::new();
        for child in parent.children() {
            if let Some(el) = ElementRef::wrap(child) {
                if is_block(el.value().name()) {
                    self.flush(&mut pending);
                    self.block(el);
                } else {
                    inline(el, FontFace::Regular, &mut pending);
                }
            } else if let Node::Text(text) = child.value() {
                pending.push(Span::new(text_run(text), FontFace::Regular));
            }
        }
        self.flush(&mut pending);
    }

    fn block(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(6);
                let size = heading_size(level);
                let mut spans = Vec::new();
                inline(el, FontFace::Bold, &mut spans);
                self.layout.space(size * 0.6);
                self.paragraph(spans, size);
                self.layout.space(size * 0.3);
            }
            "p" => {
                let mut spans = Vec::new();
                inline(el, FontFace::Regular, &mut spans);
                self.paragraph(spans, BODY_SIZE);
                self.layout.space(4.0);
            }
            "ul" => self.list(el, ListKind::Bullet),
            "ol" => {
                let start = el.value().attr("start").and_then(|s| s.parse().ok()).unwrap_or(1);
                self.list(el, ListKind::Ordered(start));
            }
            "li" => self.list_item(el, "\u{2022} ".to_string()),
            "pre" => {
                let code: String = el.text().collect();
                self.layout.preformatted(&code, CODE_SIZE);
            }
            "blockquote" => {
                self.layout.indent(NEST_INDENT);
                self.blocks(el);
                self.layout.indent(-NEST_INDENT);
            }
            "table" => self.table(el),
            "hr" => self.layout.space(6.0),
            "style" | "script" => {}
            _ => self.blocks(el),
        }
    }

    fn list(&mut self, el: ElementRef<'_>, kind: ListKind) {
        self.lists.push(kind);
        self.layout.space(2.0);
        for item in el.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                continue;
            }
            let marker = match self.lists.last_mut() {
                Some(ListKind::Ordered(n)) => {
                    let marker = format!("{n}. ");
                    *n += 1;
                    marker
                }
                _ => "\u{2022} ".to_string(),
            };
            self.list_item(item, marker);
        }
        self.lists.pop();
        self.layout.space(4.0);
    }

    fn list_item(&mut self, item: ElementRef<'_>, marker: String) {
        self.layout.indent(NEST_INDENT);
        self.marker = Some(marker);
        self.blocks(item);
        if let Some(marker) = self.marker.take() {
            // Empty item
            self.layout.paragraph(&[Span::new(marker, FontFace::Regular)], BODY_SIZE);
        }
        self.layout.indent(-NEST_INDENT);
    }

    /// Tables become one pipe-separated line per row; header cells are bold.
    fn table(&mut self, el: ElementRef<'_>) {
        self.layout.space(4.0);
        let rows = el
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr");
        for row in rows {
            let mut spans = Vec::new();
            let cells = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"));
            for (i, cell) in cells.enumerate() {
                if i > 0 {
                    spans.push(Span::new(" | ", FontFace::Regular));
                }
                let face = if cell.value().name() == "th" {
                    FontFace::Bold
                } else {
                    FontFace::Regular
                };
                inline(cell, face, &mut spans);
            }
            self.paragraph(spans, BODY_SIZE - 1.0);
        }
        self.layout.space(6.0);
    }
}

/// Lays out `chapter` starting at the current position of `layout`.
pub fn chapter(layout: &mut Layout, chapter: &Chapter) {
    layout.paragraph(
        &[Span::new(chapter.heading(), FontFace::Bold)],
        CHAPTER_TITLE_SIZE,
    );
    layout.space(10.0);

    let fragment = Html::parse_fragment(&chapter.to_html());
    let mut renderer = Renderer {
        layout,
        lists: Vec::new(),
        marker: None,
    };
    renderer.blocks(fragment.root_element());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::fixtures::chapter as make_chapter;

    fn shown_text(layout: Layout) -> String {
        let mut out = String::new();
        for page in layout.into_pages() {
            for op in page.operations {
                if op.operator == "Tj" {
                    if let Some(lopdf::Object::String(bytes, _)) = op.operands.first() {
                        out.push_str(&String::from_utf8_lossy(bytes));
                        out.push('|');
                    }
                }
            }
        }
        out
    }

    fn render(markdown: &str) -> String {
        let mut layout = Layout::new();
        layout.new_page();
        chapter(&mut layout, &make_chapter(1, "01_intro", markdown));
        shown_text(layout)
    }

    #[test]
    fn heading_then_paragraph() {
        let text = render("Plain text here.\n");
        assert!(text.starts_with("Chapter 1: 01 Intro|"));
        assert!(text.contains("Plain text here.|"));
    }

    #[test]
    fn ordered_and_bullet_markers() {
        let text = render("1. first\n2. second\n\n- apple\n");
        assert!(text.contains("1. first|"));
        assert!(text.contains("2. second|"));
        // Bullet is WinAnsi 0x95, shown lossily
        assert!(text.contains("apple|"));
    }

    #[test]
    fn emphasis_switches_faces() {
        let text = render("a **bold** and `code` word\n");
        assert!(text.contains("a |bold|"));
        assert!(text.contains("code|"));
    }

    #[test]
    fn code_blocks_keep_lines() {
        let text = render("```\nfn main() {\n    run();\n}\n```\n");
        assert!(text.contains("fn main() {|"));
        assert!(text.contains("    run();|"));
        assert!(text.contains("}|"));
    }

    #[test]
    fn tables_and_images() {
        let text = render("| a | b |\n|---|---|\n| 1 | 2 |\n\n![diagram](d.png)\n");
        assert!(text.contains("a| | |b|"));
        assert!(text.contains("1 | 2|"));
        assert!(text.contains("[image: diagram]|"));
    }
}
