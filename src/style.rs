//! Color parsing, border stroke mapping and style-equality keys.

use crate::model::{BorderStyle, ComputedStyle, TextDecoration};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn alpha(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Components in 0..=1, as PDF operators want them.
    pub fn unit_rgb(&self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

fn named_color(name: &str) -> Option<Rgba> {
    let c = match name {
        "black" => Rgba::rgb(0, 0, 0),
        "white" => Rgba::rgb(255, 255, 255),
        "red" => Rgba::rgb(255, 0, 0),
        "green" => Rgba::rgb(0, 128, 0),
        "lime" => Rgba::rgb(0, 255, 0),
        "blue" => Rgba::rgb(0, 0, 255),
        "navy" => Rgba::rgb(0, 0, 128),
        "gray" | "grey" => Rgba::rgb(128, 128, 128),
        "silver" => Rgba::rgb(192, 192, 192),
        "lightgray" | "lightgrey" => Rgba::rgb(211, 211, 211),
        "darkgray" | "darkgrey" => Rgba::rgb(169, 169, 169),
        "yellow" => Rgba::rgb(255, 255, 0),
        "orange" => Rgba::rgb(255, 165, 0),
        "purple" => Rgba::rgb(128, 0, 128),
        "maroon" => Rgba::rgb(128, 0, 0),
        "teal" => Rgba::rgb(0, 128, 128),
        "olive" => Rgba::rgb(128, 128, 0),
        "aqua" | "cyan" => Rgba::rgb(0, 255, 255),
        "fuchsia" | "magenta" => Rgba::rgb(255, 0, 255),
        "transparent" => Rgba::TRANSPARENT,
        _ => return None,
    };
    Some(c)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            a: nibble(3)?,
            ..Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)
        }),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba {
            a: byte(6)?,
            ..Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)
        }),
        _ => None,
    }
}

fn parse_channel(s: &str) -> Option<u8> {
    let v = if let Some(pct) = s.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? * 2.55
    } else {
        s.parse::<f32>().ok()?
    };
    Some(v.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(s: &str) -> Option<u8> {
    let v = if let Some(pct) = s.strip_suffix('%') {
        pct.trim().parse::<f32>().ok()? / 100.0
    } else {
        s.parse::<f32>().ok()?
    };
    Some((v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Parse a CSS color value. Unknown or malformed input yields `None`, which
/// callers treat as "nothing to draw" for backgrounds and black for text.
pub fn parse_color(input: &str) -> Option<Rgba> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    let args = s
        .strip_prefix("rgba(")
        .or_else(|| s.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    if let Some(args) = args {
        // Both `rgb(1, 2, 3, 0.5)` and `rgb(1 2 3 / 50%)` are accepted.
        let (channels, slash_alpha) = match args.split_once('/') {
            Some((c, a)) => (c, Some(a.trim())),
            None => (args, None),
        };
        let parts: Vec<&str> = channels
            .split(|c: char| c == ',' || c.is_whitespace())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (r, g, b) = match parts.as_slice() {
            [r, g, b] | [r, g, b, _] => (parse_channel(r)?, parse_channel(g)?, parse_channel(b)?),
            _ => return None,
        };
        let a = match (parts.get(3).copied(), slash_alpha) {
            (Some(a), _) | (None, Some(a)) => parse_alpha(a)?,
            (None, None) => 255,
        };
        return Some(Rgba { r, g, b, a });
    }
    named_color(&s)
}

/// Background colors draw only when present and not fully transparent.
pub fn background_fill(style: &ComputedStyle) -> Option<Rgba> {
    parse_color(&style.background_color).filter(|c| !c.is_transparent())
}

/// Text color, defaulting to black when the value cannot be read.
pub fn text_color(style: &ComputedStyle) -> Rgba {
    parse_color(&style.color).unwrap_or(Rgba::BLACK)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokePattern {
    Solid,
    Dashed { dash: f32, gap: f32 },
    Dotted { dot: f32 },
    /// Two parallel strokes; the renderer falls back to `Solid` when too thin.
    Double,
}

impl StrokePattern {
    /// Dash array for the sink, empty for continuous strokes.
    pub fn dash_array(&self) -> Vec<f32> {
        match *self {
            StrokePattern::Dashed { dash, gap } => vec![dash, gap],
            StrokePattern::Dotted { dot } => vec![dot, dot],
            StrokePattern::Solid | StrokePattern::Double => Vec::new(),
        }
    }
}

/// Map a CSS border style and its width (in points) to a stroke pattern.
/// `None` means the side draws nothing.
pub fn stroke_pattern(style: BorderStyle, width: f32) -> Option<StrokePattern> {
    if width <= 0.0 {
        return None;
    }
    match style {
        BorderStyle::None | BorderStyle::Hidden => None,
        BorderStyle::Dashed => Some(StrokePattern::Dashed {
            dash: (width * 3.0).max(1.0),
            gap: (width * 3.0).max(1.0),
        }),
        BorderStyle::Dotted => Some(StrokePattern::Dotted { dot: width }),
        BorderStyle::Double => Some(StrokePattern::Double),
        BorderStyle::Solid
        | BorderStyle::Groove
        | BorderStyle::Ridge
        | BorderStyle::Inset
        | BorderStyle::Outset => Some(StrokePattern::Solid),
    }
}

/// Resolved text style in output units.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    /// Points.
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgba,
    pub decoration: TextDecoration,
    /// Non-built-in font needed to draw this text, when any.
    pub font_id: Option<String>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Helvetica".to_string(),
            font_size: 12.0,
            bold: false,
            italic: false,
            color: Rgba::BLACK,
            decoration: TextDecoration::default(),
            font_id: None,
        }
    }
}

impl TextStyle {
    /// Resolve a computed style into output units.
    pub fn from_computed(style: &ComputedStyle, pt_per_px: f32, text_scale: f32) -> Self {
        Self {
            font_family: primary_family(&style.font_family).to_string(),
            font_size: style.font_size * pt_per_px * text_scale,
            bold: style.is_bold(),
            italic: style.is_italic(),
            color: text_color(style),
            decoration: style.text_decoration,
            font_id: None,
        }
    }

    pub fn key(&self) -> StyleKey {
        StyleKey {
            family: self.font_family.to_ascii_lowercase(),
            centi_pt: (self.font_size * 100.0).round() as i32,
            bold: self.bold,
            italic: self.italic,
            color: self.color,
            decoration: self.decoration,
        }
    }
}

/// Hashable equality key for "same visual text style".
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StyleKey {
    family: String,
    centi_pt: i32,
    bold: bool,
    italic: bool,
    color: Rgba,
    decoration: TextDecoration,
}

/// First family of a CSS font-family list, unquoted.
pub fn primary_family(list: &str) -> &str {
    list.split(',')
        .next()
        .unwrap_or(list)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
}
