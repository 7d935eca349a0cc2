//! Conversion settings, deserialisable from JSON.

use serde::{Deserialize, Deserializer, de};

use crate::error::Error;
use crate::units::mm_to_pt;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width: f32, height: f32 },
}

impl PageSize {
    /// Portrait width and height in points.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        match *self {
            PageSize::A3 => (mm_to_pt(297.0), mm_to_pt(420.0)),
            PageSize::A4 => (mm_to_pt(210.0), mm_to_pt(297.0)),
            PageSize::A5 => (mm_to_pt(148.0), mm_to_pt(210.0)),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (width, height),
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            _ => Err(format!("unknown page size: {s}")),
        }
    }
}

impl<'de> Deserialize<'de> for PageSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum PageSizeDef {
            Str(String),
            Map { width: f32, height: f32 },
        }

        match PageSizeDef::deserialize(deserializer)? {
            PageSizeDef::Str(s) => Self::parse(&s).map_err(de::Error::custom),
            PageSizeDef::Map { width, height } => Ok(PageSize::Custom { width, height }),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    pub fn all(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::all(40.0)
    }
}

/// How device pixels map to points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMode {
    /// The target box's width fills the page content width.
    #[default]
    FitWidth,
    /// 96px = 72pt.
    Natural,
}

/// Pixel tolerances of the text clustering passes. Tuned against one layout
/// engine; recalibrate for others.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Vertical quantum used to form alignment buckets.
    pub bucket_quantum_px: f32,
    /// Buckets of one container closer than this merge.
    pub bucket_merge_px: f32,
    /// Items of one bucket spread less than this snap to one position.
    pub snap_px: f32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            bucket_quantum_px: 2.0,
            bucket_merge_px: 4.0,
            snap_px: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub page_size: PageSize,
    pub orientation: Orientation,
    pub margins: Margins,
    pub exclude_selectors: Vec<String>,
    pub page_break_selectors: Vec<String>,
    pub debug_overlay: bool,
    pub text_scale: f32,
    pub yield_every_items: usize,
    pub yield_every_ms: u64,
    pub strict_assets: bool,
    pub ready_timeout_ms: u64,
    pub scale: ScaleMode,
    pub tolerances: Tolerances,
    pub flow_mixed_paragraphs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            exclude_selectors: Vec::new(),
            page_break_selectors: Vec::new(),
            debug_overlay: false,
            text_scale: 1.0,
            yield_every_items: 200,
            yield_every_ms: 16,
            strict_assets: false,
            ready_timeout_ms: 5000,
            scale: ScaleMode::FitWidth,
            tolerances: Tolerances::default(),
            flow_mixed_paragraphs: false,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Page width and height in points, orientation applied.
    pub fn page_dimensions(&self) -> (f32, f32) {
        let (w, h) = self.page_size.dimensions_pt();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn content_width(&self) -> f32 {
        self.page_dimensions().0 - self.margins.left - self.margins.right
    }

    pub fn content_height(&self) -> f32 {
        self.page_dimensions().1 - self.margins.top - self.margins.bottom
    }

    pub fn validate(&self) -> Result<(), Error> {
        let m = &self.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(Error::message("margins must be finite and non-negative"));
        }
        if !(self.content_width() > 0.0) {
            return Err(Error::message(format!(
                "no horizontal room on the page: content width {:.1}pt",
                self.content_width()
            )));
        }
        if !(self.content_height() > 0.0) {
            return Err(Error::message(format!(
                "no vertical room on the page: content height {:.1}pt",
                self.content_height()
            )));
        }
        if !(self.text_scale > 0.0) {
            return Err(Error::message("text_scale must be positive"));
        }
        let t = &self.tolerances;
        if !(t.bucket_quantum_px > 0.0) || t.bucket_merge_px < 0.0 || t.snap_px < 0.0 {
            return Err(Error::message("tolerances must be non-negative, quantum positive"));
        }
        Ok(())
    }
}
