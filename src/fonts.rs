use std::collections::HashMap;
use std::path::PathBuf;

use futures::future::BoxFuture;
use ttf_parser::Face;

use crate::error::Error;
use crate::style::TextStyle;
use crate::text::TextMeasure;

pub const FONT_CJK: &str = "cjk";
pub const FONT_JAPANESE: &str = "japanese";
pub const FONT_KOREAN: &str = "korean";
pub const FONT_FALLBACK: &str = "fallback";

fn is_kana(c: char) -> bool {
    matches!(c as u32, 0x3040..=0x30FF | 0x31F0..=0x31FF | 0xFF66..=0xFF9F)
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF)
}

fn is_han(c: char) -> bool {
    matches!(
        c as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2FA1F | 0x3000..=0x303F
    )
}

/// Which non-built-in font `text` needs, if any. Text the built-in fonts can
/// encode (Latin-1 plus the WinAnsi punctuation block) needs none. Kana wins
/// over Han so mixed Japanese text resolves to the Japanese font.
pub fn detect_required_font(text: &str) -> Option<&'static str> {
    let (mut kana, mut hangul, mut han, mut other) = (false, false, false, false);
    for c in text.chars() {
        if c.is_control() || char_to_winansi(c) != 0 {
            continue;
        }
        if is_kana(c) {
            kana = true;
        } else if is_hangul(c) {
            hangul = true;
        } else if is_han(c) {
            han = true;
        } else {
            other = true;
        }
    }
    if kana {
        Some(FONT_JAPANESE)
    } else if hangul {
        Some(FONT_KOREAN)
    } else if han {
        Some(FONT_CJK)
    } else if other {
        Some(FONT_FALLBACK)
    } else {
        None
    }
}

/// Supplies font binaries for the ids returned by [`detect_required_font`].
pub trait FontLoader {
    fn load_font<'a>(&'a self, font_id: &'a str, bold: bool) -> BoxFuture<'a, Result<Vec<u8>, Error>>;
}

/// Loader with nothing provisioned: every request fails.
pub struct NoFonts;

impl FontLoader for NoFonts {
    fn load_font<'a>(&'a self, font_id: &'a str, _bold: bool) -> BoxFuture<'a, Result<Vec<u8>, Error>> {
        Box::pin(async move { Err(Error::font(font_id, "no font directory configured")) })
    }
}

/// Looks for `<id>-bold.ttf`, `<id>.ttf` or `<id>.otf` in one directory.
pub struct DirFontLoader {
    dir: PathBuf,
}

impl DirFontLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, font_id: &str, bold: bool) -> Vec<PathBuf> {
        let mut out = Vec::new();
        if bold {
            out.push(self.dir.join(format!("{font_id}-bold.ttf")));
        }
        out.push(self.dir.join(format!("{font_id}.ttf")));
        out.push(self.dir.join(format!("{font_id}.otf")));
        out
    }
}

impl FontLoader for DirFontLoader {
    fn load_font<'a>(&'a self, font_id: &'a str, bold: bool) -> BoxFuture<'a, Result<Vec<u8>, Error>> {
        Box::pin(async move {
            for path in self.candidates(font_id, bold) {
                if let Ok(data) = std::fs::read(&path) {
                    log::debug!("font {font_id} bold={bold} → {}", path.display());
                    return Ok(data);
                }
            }
            Err(Error::font(
                font_id,
                format!("no font file for '{font_id}' in {}", self.dir.display()),
            ))
        })
    }
}

/// Map a single Unicode char to its WinAnsi byte, or 0 if unmappable.
pub(crate) fn char_to_winansi(c: char) -> u8 {
    match c as u32 {
        0x0020..=0x007E => c as u8,
        0x00A0..=0x00FF => c as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => 0,
    }
}

/// Convert a UTF-8 string to WinAnsi bytes; unmappable chars become `?`.
pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match char_to_winansi(c) {
            0 => b'?',
            b => b,
        })
        .collect()
}

/// Encode text as big-endian 2-byte glyph ids for Identity-H fonts.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.extend_from_slice(&gid.to_be_bytes());
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinFamily {
    Helvetica,
    Times,
    Courier,
}

impl BuiltinFamily {
    pub fn for_family(family: &str) -> Self {
        let f = family.to_ascii_lowercase();
        if f.contains("courier") || f.contains("mono") || f == "consolas" {
            BuiltinFamily::Courier
        } else if f.contains("times") || f.contains("georgia") || f == "serif" || f.contains("garamond") {
            BuiltinFamily::Times
        } else {
            BuiltinFamily::Helvetica
        }
    }

    /// PostScript name of the base-14 face.
    pub fn base_font(self, bold: bool, italic: bool) -> &'static str {
        match (self, bold, italic) {
            (BuiltinFamily::Helvetica, false, false) => "Helvetica",
            (BuiltinFamily::Helvetica, true, false) => "Helvetica-Bold",
            (BuiltinFamily::Helvetica, false, true) => "Helvetica-Oblique",
            (BuiltinFamily::Helvetica, true, true) => "Helvetica-BoldOblique",
            (BuiltinFamily::Times, false, false) => "Times-Roman",
            (BuiltinFamily::Times, true, false) => "Times-Bold",
            (BuiltinFamily::Times, false, true) => "Times-Italic",
            (BuiltinFamily::Times, true, true) => "Times-BoldItalic",
            (BuiltinFamily::Courier, false, false) => "Courier",
            (BuiltinFamily::Courier, true, false) => "Courier-Bold",
            (BuiltinFamily::Courier, false, true) => "Courier-Oblique",
            (BuiltinFamily::Courier, true, true) => "Courier-BoldOblique",
        }
    }
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi bytes 32..=255.
fn helvetica_width(b: u8) -> f32 {
    match b {
        32 => 278.0,                          // space
        33..=47 => 333.0,                     // punctuation
        48..=57 => 556.0,                     // digits
        58..=64 => 333.0,                     // more punctuation
        73 | 74 => 278.0,                     // I J (narrow uppercase)
        77 => 833.0,                          // M (wide)
        65..=90 => 667.0,                     // uppercase A-Z (average)
        91..=96 => 333.0,                     // brackets etc.
        102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
        109 | 119 => 833.0,                   // m w (wide)
        97..=122 => 556.0,                    // lowercase a-z (average)
        _ => 556.0,
    }
}

/// Width of one char in 1000-units for a base-14 family.
pub(crate) fn builtin_char_width(family: BuiltinFamily, bold: bool, c: char) -> f32 {
    if family == BuiltinFamily::Courier {
        return 600.0;
    }
    let base = match char_to_winansi(c) {
        0 if c.is_control() => 0.0,
        0 => 1000.0,
        b => helvetica_width(b),
    };
    let family_factor = if family == BuiltinFamily::Times { 0.9 } else { 1.0 };
    let weight_factor = if bold { 1.05 } else { 1.0 };
    base * family_factor * weight_factor
}

/// Measurement with the built-in approximate metrics only.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinMetrics;

impl TextMeasure for BuiltinMetrics {
    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        let family = BuiltinFamily::for_family(&style.font_family);
        text.chars()
            .map(|c| builtin_char_width(family, style.bold, c))
            .sum::<f32>()
            * style.font_size
            / 1000.0
    }
}

/// Metrics and cmap of a parsed TrueType/OpenType font.
pub struct TrueTypeFont {
    pub data: Vec<u8>,
    pub ps_name: String,
    pub char_to_gid: HashMap<char, u16>,
    /// Advance per glyph id, in 1000-units.
    pub advances_1000: Vec<f32>,
    pub ascent_1000: f32,
    pub descent_1000: f32,
    pub cap_height_1000: f32,
    pub bbox_1000: [f32; 4],
}

impl TrueTypeFont {
    pub fn parse(font_id: &str, data: Vec<u8>) -> Result<Self, Error> {
        let face = Face::parse(&data, 0).map_err(|e| Error::font(font_id, e.to_string()))?;
        let units = face.units_per_em() as f32;
        let scale = |v: f32| v / units * 1000.0;

        let mut char_to_gid = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(ch) = char::from_u32(cp)
                        && let Some(gid) = subtable.glyph_index(cp)
                    {
                        char_to_gid.entry(ch).or_insert(gid.0);
                    }
                });
            }
        }

        let advances_1000: Vec<f32> = (0..face.number_of_glyphs())
            .map(|gid| {
                face.glyph_hor_advance(ttf_parser::GlyphId(gid))
                    .map(|adv| scale(adv as f32))
                    .unwrap_or(0.0)
            })
            .collect();

        let bb = face.global_bounding_box();
        let ps_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && n.is_unicode())
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| format!("BoxtreeFont-{font_id}"))
            .replace(' ', "");

        Ok(Self {
            ps_name,
            char_to_gid,
            advances_1000,
            ascent_1000: scale(face.ascender() as f32),
            descent_1000: scale(face.descender() as f32),
            cap_height_1000: face.capital_height().map(|h| scale(h as f32)).unwrap_or(700.0),
            bbox_1000: [
                scale(bb.x_min as f32),
                scale(bb.y_min as f32),
                scale(bb.x_max as f32),
                scale(bb.y_max as f32),
            ],
            data,
        })
    }

    pub fn char_width_1000(&self, ch: char) -> f32 {
        self.char_to_gid
            .get(&ch)
            .and_then(|&gid| self.advances_1000.get(gid as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|c| self.char_width_1000(c)).sum::<f32>() * font_size / 1000.0
    }
}
