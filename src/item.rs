//! Drawing primitives extracted from boxes. Positions are in points: `x`
//! already includes the left page margin, `y` is the offset in the section's
//! continuous flow; the paginator resolves it to a page.

use crate::model::{Sides, TextAlign};
use crate::style::{Rgba, StrokePattern};
use crate::text::InlineRun;
use crate::tree::BoxId;

/// Fixed paint order. Lower paints first.
pub mod z {
    pub const BACKGROUND: u8 = 0;
    pub const IMAGE_BEHIND: u8 = 1;
    pub const IMAGE: u8 = 5;
    pub const BORDER: u8 = 10;
    pub const DEBUG_OUTLINE: u8 = 12;
    pub const TEXT: u8 = 20;
}

/// Fragments that must share one vertical position: container plus the top
/// edge quantised in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    pub container: BoxId,
    pub y_px: i32,
}

/// Fragments chained horizontally into one flowed line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub container: BoxId,
    pub line: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InlineGroup {
    pub key: GroupKey,
    pub order: u32,
}

/// Horizontal alignment a text item is drawn with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl From<TextAlign> for Align {
    fn from(a: TextAlign) -> Self {
        match a {
            TextAlign::Center => Align::Center,
            TextAlign::Right | TextAlign::End => Align::Right,
            TextAlign::Start | TextAlign::Left | TextAlign::Justify => Align::Left,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextItem {
    /// One run for a plain fragment, several for a flowed paragraph.
    pub runs: Vec<InlineRun>,
    pub align: Align,
    pub wrap: bool,
    pub max_width: f32,
    pub line_height: f32,
    pub bucket: BucketKey,
    pub group: Option<InlineGroup>,
    pub content_left: f32,
    pub content_right: f32,
    pub float_left: bool,
}

impl TextItem {
    pub fn text(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            match run {
                InlineRun::Text(r) => out.push_str(&r.text),
                InlineRun::Break => out.push('\n'),
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub width: f32,
    pub color: Rgba,
    pub pattern: StrokePattern,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BorderItem {
    /// `None` for sides that draw nothing.
    pub sides: Sides<Option<Edge>>,
}

impl BorderItem {
    /// All four sides present and identical.
    pub fn uniform(&self) -> Option<&Edge> {
        let s = &self.sides;
        let top = s.top.as_ref()?;
        [&s.right, &s.bottom, &s.left]
            .iter()
            .all(|side| side.as_ref() == Some(top))
            .then_some(top)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageItem {
    /// Index into the resolved asset table.
    pub slot: usize,
    pub src: String,
    /// Background image, painted under content images.
    pub behind: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemKind {
    Text(TextItem),
    Background(Rgba),
    Border(BorderItem),
    Image(ImageItem),
    DebugOutline { label: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: ItemKind,
}

impl RenderItem {
    pub fn z(&self) -> u8 {
        match &self.kind {
            ItemKind::Background(_) => z::BACKGROUND,
            ItemKind::Image(img) if img.behind => z::IMAGE_BEHIND,
            ItemKind::Image(_) => z::IMAGE,
            ItemKind::Border(_) => z::BORDER,
            ItemKind::DebugOutline { .. } => z::DEBUG_OUTLINE,
            ItemKind::Text(_) => z::TEXT,
        }
    }

    pub fn as_text(&self) -> Option<&TextItem> {
        match &self.kind {
            ItemKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_border(&self) -> Option<&BorderItem> {
        match &self.kind {
            ItemKind::Border(b) => Some(b),
            _ => None,
        }
    }
}
