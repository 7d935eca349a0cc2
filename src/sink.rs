//! The drawing surface the renderer talks to. Coordinates are points with the
//! origin at the top-left corner of the current page, y growing downwards.

use crate::error::Error;
use crate::style::{Rgba, TextStyle};
use crate::text::TextMeasure;

/// Decoded pixels ready for embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub data: ImageData,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImageData {
    /// Baseline JPEG, embedded as-is.
    Jpeg(Vec<u8>),
    /// 8-bit RGBA, row-major.
    Rgba(Vec<u8>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Rgba,
    /// Empty for a continuous line.
    pub dash: Vec<f32>,
}

impl Stroke {
    pub fn solid(width: f32, color: Rgba) -> Self {
        Self {
            width,
            color,
            dash: Vec::new(),
        }
    }
}

/// Which point of the text `x` refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAnchor {
    #[default]
    Start,
    Middle,
    End,
}

pub trait VectorSink: TextMeasure {
    fn add_page(&mut self);

    /// Make page `index` (0-based) current.
    fn set_page(&mut self, index: usize);

    fn page_count(&self) -> usize;

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba);

    fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: &Stroke);

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, stroke: &Stroke);

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle, anchor: TextAnchor);

    fn draw_image(&mut self, image: &RasterImage, x: f32, y: f32, width: f32, height: f32);

    /// Make a loaded font binary available under `font_id`.
    fn register_font(&mut self, font_id: &str, bold: bool, data: Vec<u8>) -> Result<(), Error>;

    fn has_font(&self, font_id: &str) -> bool;
}

/// Make sure page `page` (1-based) exists and is current.
pub fn ensure_page<S: VectorSink + ?Sized>(sink: &mut S, page: usize) {
    while sink.page_count() < page {
        sink.add_page();
    }
    sink.set_page(page.saturating_sub(1));
}

/// One recorded drawing call.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    StrokeLine {
        from: (f32, f32),
        to: (f32, f32),
        stroke: Stroke,
    },
    StrokeRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke: Stroke,
    },
    Text {
        text: String,
        x: f32,
        baseline: f32,
        style: TextStyle,
        anchor: TextAnchor,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

/// Keeps every call as a per-page display list. Measures with the built-in
/// metrics; registered fonts are only remembered.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pages: Vec<Vec<Op>>,
    current: usize,
    fonts: Vec<(String, bool)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pages(&self) -> &[Vec<Op>] {
        &self.pages
    }

    /// Text drawn on page `index`, in call order.
    pub fn texts(&self, index: usize) -> Vec<&str> {
        self.pages
            .get(index)
            .into_iter()
            .flatten()
            .filter_map(|op| match op {
                Op::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn fonts(&self) -> &[(String, bool)] {
        &self.fonts
    }

    fn push(&mut self, op: Op) {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let idx = self.current.min(self.pages.len() - 1);
        self.pages[idx].push(op);
    }
}

impl TextMeasure for RecordingSink {
    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        crate::fonts::BuiltinMetrics.measure(text, style)
    }
}

impl VectorSink for RecordingSink {
    fn add_page(&mut self) {
        self.pages.push(Vec::new());
    }

    fn set_page(&mut self, index: usize) {
        self.current = index;
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        self.push(Op::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: &Stroke) {
        self.push(Op::StrokeLine {
            from: (x1, y1),
            to: (x2, y2),
            stroke: stroke.clone(),
        });
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, stroke: &Stroke) {
        self.push(Op::StrokeRect {
            x,
            y,
            width,
            height,
            stroke: stroke.clone(),
        });
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle, anchor: TextAnchor) {
        self.push(Op::Text {
            text: text.to_string(),
            x,
            baseline,
            style: style.clone(),
            anchor,
        });
    }

    fn draw_image(&mut self, _image: &RasterImage, x: f32, y: f32, width: f32, height: f32) {
        self.push(Op::Image { x, y, width, height });
    }

    fn register_font(&mut self, font_id: &str, bold: bool, _data: Vec<u8>) -> Result<(), Error> {
        self.fonts.push((font_id.to_string(), bold));
        Ok(())
    }

    fn has_font(&self, font_id: &str) -> bool {
        self.fonts.iter().any(|(id, _)| id == font_id)
    }
}
