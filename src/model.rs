//! Input model: the laid-out, styled box tree handed to us by a layout engine.
//! Geometry is in device pixels, relative to the document origin.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct PxRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PxRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Sides<T> {
    pub top: T,
    pub right: T,
    pub bottom: T,
    pub left: T,
}

impl<T: Clone> Sides<T> {
    pub fn all(v: T) -> Self {
        Self {
            top: v.clone(),
            right: v.clone(),
            bottom: v.clone(),
            left: v,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    ListItem,
    Table,
    TableRow,
    TableCell,
    Flex,
    Grid,
    Contents,
    None,
}

impl Display {
    /// Boxes whose content box establishes the horizontal frame for their text.
    pub fn is_alignment_container(self) -> bool {
        matches!(
            self,
            Display::Block | Display::ListItem | Display::TableCell | Display::Flex | Display::Grid
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    Collapse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorderStyle {
    #[default]
    None,
    Hidden,
    Solid,
    Dashed,
    Dotted,
    Double,
    Groove,
    Ridge,
    Inset,
    Outset,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BorderSide {
    pub width: f32,
    pub style: BorderStyle,
    pub color: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSlant {
    #[default]
    Normal,
    Italic,
    Oblique,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Start,
    Left,
    Center,
    Right,
    End,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhiteSpace {
    #[default]
    Normal,
    Nowrap,
    Pre,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    pub fn collapses_spaces(self) -> bool {
        matches!(self, WhiteSpace::Normal | WhiteSpace::Nowrap | WhiteSpace::PreLine)
    }

    pub fn preserves_newlines(self) -> bool {
        matches!(self, WhiteSpace::Pre | WhiteSpace::PreWrap | WhiteSpace::PreLine)
    }

    pub fn wraps(self) -> bool {
        !matches!(self, WhiteSpace::Nowrap | WhiteSpace::Pre)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct TextDecoration {
    pub underline: bool,
    pub line_through: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// Resolved (computed) style of one box. Lengths are device pixels, colors are
/// raw CSS color strings parsed lazily by [`crate::style::parse_color`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComputedStyle {
    pub display: Display,
    pub visibility: Visibility,
    pub opacity: f32,
    pub border: Sides<BorderSide>,
    pub background_color: String,
    pub background_image: Option<String>,
    pub background_size: Option<String>,
    pub background_repeat: Option<String>,
    pub background_position: Option<String>,
    pub padding: Sides<f32>,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub font_style: FontSlant,
    pub color: String,
    pub text_align: TextAlign,
    pub white_space: WhiteSpace,
    /// `None` means `normal`.
    pub line_height: Option<f32>,
    pub text_decoration: TextDecoration,
    pub text_transform: TextTransform,
    pub float: Float,
    pub position: Position,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            visibility: Visibility::Visible,
            opacity: 1.0,
            border: Sides::default(),
            background_color: "transparent".to_string(),
            background_image: None,
            background_size: None,
            background_repeat: None,
            background_position: None,
            padding: Sides::default(),
            font_family: "Helvetica".to_string(),
            font_size: 16.0,
            font_weight: 400,
            font_style: FontSlant::Normal,
            color: "#000000".to_string(),
            text_align: TextAlign::Start,
            white_space: WhiteSpace::Normal,
            line_height: None,
            text_decoration: TextDecoration::default(),
            text_transform: TextTransform::None,
            float: Float::None,
            position: Position::Static,
        }
    }
}

impl ComputedStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight >= 600
    }

    pub fn is_italic(&self) -> bool {
        self.font_style != FontSlant::Normal
    }

    /// Horizontal padding plus border on the left side, in pixels.
    pub fn inset_left(&self) -> f32 {
        self.padding.left + visible_width(&self.border.left)
    }

    pub fn inset_right(&self) -> f32 {
        self.padding.right + visible_width(&self.border.right)
    }

    pub fn has_padding_or_border(&self) -> bool {
        let p = &self.padding;
        let b = &self.border;
        p.top > 0.0
            || p.right > 0.0
            || p.bottom > 0.0
            || p.left > 0.0
            || [&b.top, &b.right, &b.bottom, &b.left]
                .iter()
                .any(|s| visible_width(s) > 0.0)
    }
}

fn visible_width(side: &BorderSide) -> f32 {
    match side.style {
        BorderStyle::None | BorderStyle::Hidden => 0.0,
        _ => side.width.max(0.0),
    }
}

/// What kind of content a box carries besides its decoration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum BoxContent {
    #[default]
    None,
    /// A text fragment: one line box worth of text from a text node.
    Text { text: String },
    /// Replaced content (img, svg, canvas) referencing an asset.
    Image { src: String },
    /// A forced line break (`<br>`).
    LineBreak,
}

/// One box as exposed by a [`crate::tree::LayoutProvider`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledBox {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub rect: PxRect,
    pub style: ComputedStyle,
    pub content: BoxContent,
}

impl StyledBox {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BoxContent::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Non-zero size, not hidden, not fully transparent.
    pub fn is_visible(&self) -> bool {
        !self.rect.is_empty()
            && self.style.display != Display::None
            && self.style.visibility == Visibility::Visible
            && self.style.opacity > 0.0
    }

    /// Describes the box for log and error messages: `tag#id.class`.
    pub fn describe(&self) -> String {
        let mut out = self.tag.clone();
        if let Some(id) = &self.id {
            out.push('#');
            out.push_str(id);
        }
        for class in &self.classes {
            out.push('.');
            out.push_str(class);
        }
        out
    }
}
