//! Replays extracted items onto a sink, page by page.

pub mod border;
pub mod inline_group;

use crate::extract::assets::AssetTable;
use crate::fonts::detect_required_font;
use crate::item::{Align, ItemKind, RenderItem, TextItem};
use crate::paginate::Paginator;
use crate::schedule::Cadence;
use crate::sink::{Stroke, TextAnchor, VectorSink, ensure_page};
use crate::style::{Rgba, StyleKey, TextStyle};
use crate::text::{InlineRun, Line, TextMeasure, layout_runs, printable};

use border::draw_border;
use inline_group::resolve_groups;

const DEBUG_COLOR: Rgba = Rgba::rgb(255, 0, 128);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub drawn: usize,
    /// Images whose asset never resolved.
    pub skipped_images: usize,
}

/// Point each run at a loaded font when its text needs one the built-in
/// fonts cannot show.
fn with_fonts<S: VectorSink + ?Sized>(runs: &[InlineRun], sink: &S) -> Vec<InlineRun> {
    runs.iter()
        .map(|run| match run {
            InlineRun::Text(r) => {
                let mut r = r.clone();
                r.style.font_id = detect_required_font(&r.text)
                    .filter(|id| sink.has_font(id))
                    .map(str::to_string);
                InlineRun::Text(r)
            }
            InlineRun::Break => InlineRun::Break,
        })
        .collect()
}

fn single_line_width<M: TextMeasure + ?Sized>(runs: &[InlineRun], measure: &M) -> f32 {
    runs.iter()
        .map(|r| match r {
            InlineRun::Text(r) => measure.measure(&printable(&r.text), &r.style),
            InlineRun::Break => 0.0,
        })
        .sum()
}

/// Consecutive fragments of one line sharing a style, drawn as one string.
struct Segment<'a> {
    text: String,
    x: f32,
    style: &'a TextStyle,
}

fn segments<'a>(line: &Line<'a>) -> Vec<Segment<'a>> {
    let mut out: Vec<(Segment<'a>, StyleKey)> = Vec::new();
    for frag in &line.fragments {
        let key = frag.style.key();
        match out.last_mut() {
            Some((seg, k)) if *k == key && seg.style.font_id == frag.style.font_id => {
                seg.text.push_str(&printable(frag.text))
            }
            _ => out.push((
                Segment {
                    text: printable(frag.text).into_owned(),
                    x: frag.x,
                    style: frag.style,
                },
                key,
            )),
        }
    }
    out.into_iter().map(|(s, _)| s).collect()
}

fn decorate<S: VectorSink + ?Sized>(sink: &mut S, seg: &Segment<'_>, x: f32, baseline: f32, width: f32) {
    let style = seg.style;
    let size = style.font_size;
    let stroke = Stroke::solid((0.05 * size).max(0.5), style.color);
    if style.decoration.underline {
        let y = baseline + 0.12 * size;
        sink.stroke_line(x, y, x + width, y, &stroke);
    }
    if style.decoration.line_through {
        let y = baseline - 0.3 * size;
        sink.stroke_line(x, y, x + width, y, &stroke);
    }
}

fn draw_text<S: VectorSink + ?Sized>(
    sink: &mut S,
    item: &RenderItem,
    text: &TextItem,
    group_x: Option<f32>,
    pages: &Paginator,
) {
    let runs = with_fonts(&text.runs, sink);
    let max_width = if text.wrap && group_x.is_none() {
        text.max_width.max(1.0)
    } else {
        f32::INFINITY
    };
    let lines = layout_runs(&runs, max_width, &|t: &str, s: &TextStyle| sink.measure(&printable(t), s));
    let content_width = text.content_right - text.content_left;

    let mut offset = item.y;
    for line in &lines {
        offset += line.blank_lines_before as f32 * text.line_height;
        let at = pages.locate(offset);
        ensure_page(sink, at.page);

        let size = line
            .fragments
            .iter()
            .map(|f| f.style.font_size)
            .fold(0.0, f32::max);
        let baseline = at.y + (text.line_height - size) / 2.0 + 0.8 * size;

        let line_x = match (group_x, text.align) {
            (Some(x), _) => x,
            (None, Align::Left) => item.x,
            (None, Align::Center) => text.content_left + (content_width - line.width) / 2.0,
            (None, Align::Right) => text.content_right - line.width,
        };

        let segs = segments(line);
        if group_x.is_none() && segs.len() == 1 && text.align != Align::Left {
            let seg = &segs[0];
            let (x, anchor) = match text.align {
                Align::Center => (text.content_left + content_width / 2.0, TextAnchor::Middle),
                _ => (text.content_right, TextAnchor::End),
            };
            sink.draw_text(&seg.text, x, baseline, seg.style, anchor);
            let w = sink.measure(&seg.text, seg.style);
            decorate(sink, seg, line_x + seg.x, baseline, w);
        } else {
            for seg in &segs {
                let x = line_x + seg.x;
                sink.draw_text(&seg.text, x, baseline, seg.style, TextAnchor::Start);
                let w = sink.measure(&seg.text, seg.style);
                decorate(sink, seg, x, baseline, w);
            }
        }
        offset += text.line_height;
    }
}

/// Draw `items` (one section) onto the sink. Items are painted in z order,
/// ties keeping extraction order.
pub async fn render<S: VectorSink + ?Sized>(
    items: &[RenderItem],
    assets: &AssetTable,
    pages: &Paginator,
    sink: &mut S,
    cadence: &mut Cadence,
) -> RenderStats {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by_key(|&i| items[i].z());

    let group_x = {
        let measure: &S = sink;
        resolve_groups(items, |t| single_line_width(&with_fonts(&t.runs, measure), measure))
    };

    let mut stats = RenderStats::default();
    for i in order {
        let item = &items[i];
        match &item.kind {
            ItemKind::Background(color) => {
                for s in pages.span(item.y, item.height) {
                    ensure_page(sink, s.page);
                    sink.fill_rect(item.x, s.top, item.width, s.bottom - s.top, *color);
                }
            }
            ItemKind::Border(b) => {
                let slices = pages.span(item.y, item.height);
                let last = slices.len().saturating_sub(1);
                for (n, s) in slices.iter().enumerate() {
                    ensure_page(sink, s.page);
                    draw_border(sink, item.x, s.top, item.width, s.bottom - s.top, b, n == 0, n == last);
                }
            }
            ItemKind::Image(img) => {
                let Some(raster) = assets.get(img.slot) else {
                    log::debug!("image {} has no data, skipped", img.src);
                    stats.skipped_images += 1;
                    continue;
                };
                let at = pages.locate(item.y);
                ensure_page(sink, at.page);
                sink.draw_image(raster, item.x, at.y, item.width, item.height);
            }
            ItemKind::DebugOutline { label } => {
                let at = pages.locate(item.y);
                ensure_page(sink, at.page);
                sink.stroke_rect(item.x, at.y, item.width, item.height, &Stroke::solid(0.5, DEBUG_COLOR));
                let style = TextStyle {
                    font_size: 5.0,
                    color: DEBUG_COLOR,
                    ..TextStyle::default()
                };
                sink.draw_text(label, item.x + 1.0, at.y + 5.0, &style, TextAnchor::Start);
            }
            ItemKind::Text(t) => draw_text(sink, item, t, group_x.get(&i).copied(), pages),
        }
        stats.drawn += 1;
        cadence.tick().await;
    }
    stats
}
