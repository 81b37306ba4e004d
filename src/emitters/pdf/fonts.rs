//! Standard 14 fonts, WinAnsi encoding and width metrics.

/// The faces available to the layout. All are built-in PDF fonts, so
/// nothing has to be embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
}

impl FontFace {
    pub const ALL: [FontFace; 5] = [
        FontFace::Regular,
        FontFace::Bold,
        FontFace::Italic,
        FontFace::BoldItalic,
        FontFace::Mono,
    ];

    /// Name under which the font is registered in the page resources.
    pub fn resource_name(&self) -> &'static str {
        match self {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
            FontFace::Italic => "F3",
            FontFace::BoldItalic => "F4",
            FontFace::Mono => "F5",
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
            FontFace::Italic => "Helvetica-Oblique",
            FontFace::BoldItalic => "Helvetica-BoldOblique",
            FontFace::Mono => "Courier",
        }
    }

    pub fn bold(self) -> Self {
        match self {
            FontFace::Regular => FontFace::Bold,
            FontFace::Italic => FontFace::BoldItalic,
            other => other,
        }
    }

    pub fn italic(self) -> Self {
        match self {
            FontFace::Regular => FontFace::Italic,
            FontFace::Bold => FontFace::BoldItalic,
            other => other,
        }
    }
}

/// Helvetica advance widths for 0x20..=0x7E, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const COURIER_WIDTH: u16 = 600;

/// Width of one encoded byte in 1/1000 em.
fn glyph_width(byte: u8, face: FontFace) -> u16 {
    if face == FontFace::Mono {
        return COURIER_WIDTH;
    }

    let base = match byte {
        0x20..=0x7e => HELVETICA_WIDTHS[(byte - 0x20) as usize],
        0x95 => 350,
        _ => 556,
    };

    // Bold metrics are not tabulated; overestimate so lines never overflow
    match face {
        FontFace::Bold | FontFace::BoldItalic => base + base / 12,
        _ => base,
    }
}

/// Width in points of `text` set in `face` at `size`.
pub fn text_width(text: &str, face: FontFace, size: f32) -> f32 {
    let units: u32 = encode(text)
        .into_iter()
        .map(|b| u32::from(glyph_width(b, face)))
        .sum();
    units as f32 * size / 1000.0
}

/// Replaces typographic characters the way the book text expects and strips
/// decorative emoji and the stray `Â` left behind by mis-decoded UTF-8.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2013}' => out.push('-'),
            '\u{2014}' => out.push_str("--"),
            '\u{2705}' | '\u{274c}' | '\u{26a0}' | '\u{fe0f}' | '\u{1f4d6}' | '\u{1f310}'
            | '\u{1f4c4}' | '\u{1f44b}' | '\u{c2}' => {}
            other => out.push(other),
        }
    }
    out
}

fn win_ansi(ch: char) -> Option<u8> {
    let byte = match ch {
        ' '..='~' => ch as u8,
        '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2022}' => 0x95,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// Sanitizes and encodes `text` as WinAnsi bytes.
///
/// Tabs become a space, other control characters are dropped and anything
/// without a WinAnsi code point becomes `?`.
pub fn encode(text: &str) -> Vec<u8> {
    sanitize(text)
        .chars()
        .filter_map(|ch| match ch {
            '\t' => Some(b' '),
            c if c.is_control() => None,
            c => Some(win_ansi(c).unwrap_or(b'?')),
        })
        .collect()
}
