use pulldown_cmark::{html, Options, Parser};
use scraper::{ElementRef, Html, Node};

/// HTML elements that never have content and must be self-closed in XHTML.
const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Renders a markdown chapter to an HTML fragment.
pub fn to_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(source, options()));
    out
}

/// Re-serializes an HTML fragment as well-formed XHTML.
///
/// Raw HTML in markdown passes through the renderer untouched, so void
/// elements like `<br>` and unclosed tags are normalized here.
pub fn to_xhtml(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let mut out = String::with_capacity(fragment.len() + fragment.len() / 8);
    write_children(&mut out, parsed.root_element());
    out
}

fn write_children(out: &mut String, parent: ElementRef) {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(_) => {
                if let Some(el) = ElementRef::wrap(child) {
                    write_element(out, el);
                }
            }
            _ => {}
        }
    }
}

fn write_element(out: &mut String, el: ElementRef) {
    let name = el.value().name();
    out.push('<');
    out.push_str(name);
    for (attr, value) in el.value().attrs() {
        out.push_str(&format!(" {}=\"{}\"", attr, escape_xml(value)));
    }

    if VOID_ELEMENTS.contains(&name) {
        out.push_str("/>");
        return;
    }
    out.push('>');
    write_children(out, el);
    out.push_str(&format!("</{}>", name));
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Escapes text for use inside XML/HTML content and attribute values.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
