use lopdf::content::Operation;
use lopdf::Object;

use super::fonts::{encode, text_width, FontFace};

/// A4 in points.
pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;
/// 20 mm.
pub const MARGIN: f32 = 56.7;

const CODE_PADDING: f32 = 6.0;
const CODE_BACKGROUND: f32 = 0.96;

/// A run of text in a single face.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub face: FontFace,
}

impl Span {
    pub fn new(text: impl Into<String>, face: FontFace) -> Self {
        Self {
            text: text.into(),
            face,
        }
    }
}

/// One output line: consecutive segments set on the same baseline.
pub type Line = Vec<Span>;

#[derive(Debug, Default)]
pub struct Page {
    pub operations: Vec<Operation>,
}

/// Top-down flow layout over fixed-size pages.
pub struct Layout {
    pages: Vec<Page>,
    cursor_y: f32,
    indent: f32,
}

fn real(value: f32) -> Object {
    value.into()
}

/// Text operations drawing `line` with its first glyph at (`x`, `baseline`).
pub fn text_operations(x: f32, baseline: f32, line: &[Span], size: f32) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Td", vec![real(x), real(baseline)]),
    ];
    for span in line {
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(span.face.resource_name().as_bytes().to_vec()), real(size)],
        ));
        ops.push(Operation::new("Tj", vec![Object::string_literal(encode(&span.text))]));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

fn push_segment(line: &mut Line, text: &str, face: FontFace) {
    match line.last_mut() {
        Some(last) if last.face == face => last.text.push_str(text),
        _ => line.push(Span::new(text, face)),
    }
}

/// Splits `word` into pieces no wider than `max_width`, at least one char each.
fn split_long_word(word: &str, face: FontFace, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() > 1 && text_width(&current, face, size) > max_width {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// `text` followed by `suffix`, with `text` cut back and marked `...` until it fits.
fn fit(text: &str, suffix: &str, face: FontFace, size: f32, max_width: f32) -> String {
    let full = format!("{text}{suffix}");
    if text_width(&full, face, size) <= max_width {
        return full;
    }
    let mut fitted = text.to_string();
    while !fitted.is_empty() && text_width(&format!("{fitted}...{suffix}"), face, size) > max_width {
        fitted.pop();
    }
    format!("{}...{suffix}", fitted.trim_end())
}

/// Greedy word wrap of `spans` into lines at most `max_width` wide.
///
/// Whitespace collapses to a single space; a span consisting of `"\n"`
/// forces a line break.
pub fn wrap(spans: &[Span], size: f32, max_width: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line: Line = Vec::new();
    let mut width = 0.0;
    // Face of the whitespace seen since the last word, if any
    let mut pending_space: Option<FontFace> = None;

    for span in spans {
        if span.text == "\n" {
            lines.push(std::mem::take(&mut line));
            width = 0.0;
            pending_space = None;
            continue;
        }

        let mut chars = span.text.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if ch.is_whitespace() {
                pending_space = Some(span.face);
                chars.next();
                continue;
            }

            let mut end = span.text.len();
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() {
                    end = i;
                    break;
                }
                chars.next();
            }
            let word = &span.text[start..end];

            for piece in split_long_word(word, span.face, size, max_width) {
                let word_width = text_width(&piece, span.face, size);
                let space = pending_space.filter(|_| !line.is_empty());
                let space_width = space.map_or(0.0, |face| text_width(" ", face, size));

                if !line.is_empty() && width + space_width + word_width > max_width {
                    lines.push(std::mem::take(&mut line));
                    width = 0.0;
                } else if let Some(face) = space {
                    push_segment(&mut line, " ", face);
                    width += space_width;
                }

                push_segment(&mut line, &piece, span.face);
                width += word_width;
                pending_space = None;
            }
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

impl Layout {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            cursor_y: PAGE_HEIGHT - MARGIN,
            indent: 0.0,
        }
    }

    /// Starts a fresh page and returns its index within this layout.
    pub fn new_page(&mut self) -> usize {
        self.pages.push(Page::default());
        self.cursor_y = PAGE_HEIGHT - MARGIN;
        self.pages.len() - 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    fn left(&self) -> f32 {
        MARGIN + self.indent
    }

    fn available_width(&self) -> f32 {
        PAGE_WIDTH - 2.0 * MARGIN - self.indent
    }

    fn current_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.new_page();
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn ensure_room(&mut self, height: f32) {
        if self.pages.is_empty() || self.cursor_y - height < MARGIN {
            self.new_page();
        }
    }

    pub fn indent(&mut self, delta: f32) {
        self.indent = (self.indent + delta).max(0.0);
    }

    /// Vertical gap. Gaps at the top of a page are swallowed.
    pub fn space(&mut self, amount: f32) {
        if self.cursor_y >= PAGE_HEIGHT - MARGIN {
            return;
        }
        self.cursor_y -= amount;
        if self.cursor_y < MARGIN {
            self.new_page();
        }
    }

    fn emit_line(&mut self, line: &[Span], size: f32, leading: f32) {
        self.ensure_room(leading);
        let baseline = self.cursor_y - size;
        let x = self.left();
        let ops = text_operations(x, baseline, line, size);
        self.current_page().operations.extend(ops);
        self.cursor_y -= leading;
    }

    /// Wrapped flowing text.
    pub fn paragraph(&mut self, spans: &[Span], size: f32) {
        let leading = size * 1.4;
        for line in wrap(spans, size, self.available_width()) {
            self.emit_line(&line, size, leading);
        }
    }

    /// A single unwrapped line, shortened with `...` when too wide.
    pub fn single_line(&mut self, text: &str, face: FontFace, size: f32) {
        self.single_line_with_suffix(text, "", face, size);
    }

    /// Like [`Layout::single_line`], but only `text` is shortened; `suffix` is always shown.
    pub fn single_line_with_suffix(&mut self, text: &str, suffix: &str, face: FontFace, size: f32) {
        let fitted = fit(text, suffix, face, size, self.available_width());
        self.emit_line(&[Span::new(fitted, face)], size, size * 1.6);
    }

    /// Monospaced block on a grey background. Long lines are hard-wrapped.
    pub fn preformatted(&mut self, text: &str, size: f32) {
        let leading = size * 1.35;
        let char_width = text_width("M", FontFace::Mono, size);
        let inner_width = self.available_width() - 2.0 * CODE_PADDING;
        let max_chars = ((inner_width / char_width).floor() as usize).max(1);

        self.space(4.0);
        for raw in text.trim_end_matches('\n').split('\n') {
            let expanded = raw.replace('\t', "    ");
            let chars: Vec<char> = expanded.chars().collect();
            let chunks: Vec<String> = if chars.is_empty() {
                vec![String::new()]
            } else {
                chars.chunks(max_chars).map(|c| c.iter().collect()).collect()
            };

            for chunk in chunks {
                self.ensure_room(leading);
                let x = self.left();
                let width = self.available_width();
                let bottom = self.cursor_y - leading;
                let baseline = self.cursor_y - size;

                let mut ops = vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "rg",
                        vec![real(CODE_BACKGROUND), real(CODE_BACKGROUND), real(CODE_BACKGROUND)],
                    ),
                    Operation::new("re", vec![real(x), real(bottom), real(width), real(leading)]),
                    Operation::new("f", vec![]),
                    Operation::new("Q", vec![]),
                ];
                // Leading spaces are significant in code
                ops.extend(text_operations(
                    x + CODE_PADDING,
                    baseline,
                    &[Span::new(chunk, FontFace::Mono)],
                    size,
                ));
                self.current_page().operations.extend(ops);
                self.cursor_y -= leading;
            }
        }
        self.space(6.0);
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}
