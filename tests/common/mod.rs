#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use boxtree_pdf::config::{Margins, PageSize};
use boxtree_pdf::model::{BorderSide, BorderStyle, BoxContent, ComputedStyle, Display, PxRect, Sides};
use boxtree_pdf::sink::{ImageData, RasterImage};
use boxtree_pdf::tree::BoxNode;
use boxtree_pdf::{AssetRasterizer, AssetRequest, Config, Error, ErrorCode, Observer, Progress};
use futures::future::BoxFuture;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 300x220pt pages with 10pt margins: 280pt of content width, 200pt of
/// content height. A 280px wide root maps one pixel to one point.
pub fn small_pages() -> Config {
    Config {
        page_size: PageSize::Custom {
            width: 300.0,
            height: 220.0,
        },
        margins: Margins::all(10.0),
        ready_timeout_ms: 50,
        ..Config::default()
    }
}

pub fn style(display: Display) -> ComputedStyle {
    ComputedStyle {
        display,
        ..ComputedStyle::default()
    }
}

pub fn bordered(display: Display, width: f32) -> ComputedStyle {
    ComputedStyle {
        display,
        border: Sides::all(BorderSide {
            width,
            style: BorderStyle::Solid,
            color: "black".into(),
        }),
        ..ComputedStyle::default()
    }
}

pub fn block(x: f32, y: f32, w: f32, h: f32) -> BoxNode {
    BoxNode::element("div", PxRect::new(x, y, w, h), style(Display::Block))
}

pub fn text(x: f32, y: f32, w: f32, content: &str) -> BoxNode {
    BoxNode::text(PxRect::new(x, y, w, 19.0), style(Display::Inline), content)
}

pub fn image(x: f32, y: f32, w: f32, h: f32, src: &str) -> BoxNode {
    BoxNode::element("img", PxRect::new(x, y, w, h), style(Display::InlineBlock))
        .with_content(BoxContent::Image { src: src.into() })
}

/// Serves a 1x1 opaque pixel for every source except those named `missing*`.
pub struct PixelRasterizer;

impl AssetRasterizer for PixelRasterizer {
    fn rasterize(&self, request: AssetRequest) -> BoxFuture<'_, Result<RasterImage, Error>> {
        Box::pin(async move {
            if request.src.starts_with("missing") {
                return Err(Error::asset(request.src, "404 Not Found"));
            }
            Ok(RasterImage {
                width: 1,
                height: 1,
                data: ImageData::Rgba(vec![0, 128, 255, 255]),
            })
        })
    }
}

/// Observer that keeps every event; clones share the same log.
#[derive(Clone, Default)]
pub struct Recorder {
    pub progress: Rc<RefCell<Vec<Progress>>>,
    pub errors: Rc<RefCell<Vec<ErrorCode>>>,
}

impl Observer for Recorder {
    fn on_progress(&self, event: &Progress) {
        self.progress.borrow_mut().push(event.clone());
    }

    fn on_error(&self, error: &Error) {
        self.errors.borrow_mut().push(error.code());
    }
}

pub fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}
