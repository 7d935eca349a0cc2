//! Box extraction: one depth-first pass over a section's box tree producing
//! render items, forced breaks and the asset/font work to join before
//! rendering.

pub mod assets;
pub mod buckets;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::config::Config;
use crate::fonts::detect_required_font;
use crate::item::{
    Align, BorderItem, BucketKey, Edge, GroupKey, ImageItem, InlineGroup, ItemKind, RenderItem, TextItem,
};
use crate::model::{BorderSide, BoxContent, Display, Float, PxRect, Sides, StyledBox};
use crate::paginate::normalize_breaks;
use crate::schedule::Cadence;
use crate::style::{StyleKey, TextStyle, background_fill, parse_color, stroke_pattern, text_color};
use crate::text::{InlinePiece, InlineRun, Run, apply_transform, build_runs, collect_inline_pieces};
use crate::tree::{BoxArena, BoxId, LayoutProvider, matches_any};
use crate::units::UnitConverter;

use assets::{AssetRasterizer, AssetRequest, PendingAsset};

/// Where a section's pixels land on the page.
#[derive(Clone, Copy, Debug)]
pub struct SectionGeometry {
    pub units: UnitConverter,
    /// Top-left corner of the section root, in device pixels.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Left page margin, in points.
    pub margin_left: f32,
}

impl SectionGeometry {
    fn x(&self, px: f32) -> f32 {
        self.margin_left + self.units.to_pt(px - self.origin_x)
    }

    fn y(&self, px: f32) -> f32 {
        self.units.to_pt(px - self.origin_y)
    }

    fn len(&self, px: f32) -> f32 {
        self.units.to_pt(px)
    }
}

pub struct Extraction<'r> {
    pub items: Vec<RenderItem>,
    /// Sorted, unique flow offsets in points.
    pub breaks: Vec<f32>,
    pub assets: Vec<PendingAsset<'r>>,
    /// Non-built-in fonts the text needs, with weight.
    pub fonts: BTreeSet<(String, bool)>,
    pub boxes: usize,
}

/// What the container's inline content looks like, computed once per container.
#[derive(Clone, Copy, Debug, Default)]
struct ContainerProfile {
    mixed_styles: bool,
    has_floats: bool,
    has_wrappers: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct MergeKey {
    container: BoxId,
    style: StyleKey,
    bucket_y: i32,
    align: Align,
}

struct Ancestor<N> {
    node: N,
    id: BoxId,
    b: StyledBox,
}

/// Wrappers that shift or reflow the text inside them.
fn is_layout_impacting(b: &StyledBox) -> bool {
    b.style.has_padding_or_border()
        || matches!(
            b.style.display,
            Display::InlineBlock | Display::Table | Display::TableRow
        )
}

fn is_collapsible(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Collapse ASCII whitespace runs to one space and trim the ends.
/// Non-breaking spaces are content and stay.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if is_collapsible(ch) {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// `url("a.png")` → `a.png`; `none` and empty values yield nothing.
fn background_url(value: &str) -> Option<&str> {
    let v = value.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("none") {
        return None;
    }
    let inner = v
        .strip_prefix("url(")
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(v)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');
    (!inner.is_empty()).then_some(inner)
}

fn content_rect(b: &StyledBox) -> PxRect {
    let s = &b.style;
    let side = |side: &BorderSide| if stroke_pattern(side.style, side.width).is_some() { side.width } else { 0.0 };
    let left = s.padding.left + side(&s.border.left);
    let right = s.padding.right + side(&s.border.right);
    let top = s.padding.top + side(&s.border.top);
    let bottom = s.padding.bottom + side(&s.border.bottom);
    PxRect::new(
        b.rect.x + left,
        b.rect.y + top,
        (b.rect.width - left - right).max(0.0),
        (b.rect.height - top - bottom).max(0.0),
    )
}

struct Extractor<'p, 'r, P: LayoutProvider> {
    provider: &'p P,
    config: &'p Config,
    geo: SectionGeometry,
    rasterizer: &'r dyn AssetRasterizer,
    arena: BoxArena<P::Node>,
    items: Vec<RenderItem>,
    breaks: Vec<f32>,
    assets: Vec<PendingAsset<'r>>,
    next_slot: usize,
    fonts: BTreeSet<(String, bool)>,
    profiles: HashMap<BoxId, ContainerProfile>,
    merge_index: HashMap<MergeKey, usize>,
    flowed: HashSet<BoxId>,
    /// Containers whose inline leaves have been scanned for boundary spaces.
    spacing_scanned: HashSet<BoxId>,
    /// Text leaves that keep one trailing space before a sibling on the same line.
    spaced: HashSet<P::Node>,
    cadence: Cadence,
}

enum Step<N> {
    Enter(N),
    Leave,
}

impl<'p, 'r, P: LayoutProvider> Extractor<'p, 'r, P> {
    async fn run(mut self, root: &P::Node) -> Extraction<'r> {
        let mut stack = vec![Step::Enter(root.clone())];
        let mut path: Vec<Ancestor<P::Node>> = Vec::new();

        while let Some(step) = stack.pop() {
            let node = match step {
                Step::Leave => {
                    path.pop();
                    continue;
                }
                Step::Enter(node) => node,
            };
            self.cadence.tick().await;

            let Some(b) = self.provider.get_box(&node) else {
                continue;
            };
            if b.style.display == Display::None || b.style.opacity <= 0.0 {
                continue;
            }
            if matches_any(self.provider, &node, &self.config.exclude_selectors) {
                log::debug!("excluded {}", b.describe());
                continue;
            }
            if matches_any(self.provider, &node, &self.config.page_break_selectors) {
                let at = self.geo.y(b.rect.y);
                // A break at the section top would only leave an empty page.
                if at > 0.0 {
                    self.breaks.push(at);
                }
            }

            let id = self.arena.id(&node);
            if b.is_visible() {
                self.emit_box(&node, id, &b, &path);
            }

            let children = self.provider.children(&node);
            if !children.is_empty() {
                stack.push(Step::Leave);
                stack.extend(children.into_iter().rev().map(Step::Enter));
                path.push(Ancestor { node, id, b });
            }
        }

        let tol = self.config.tolerances;
        buckets::merge_buckets(&mut self.items, tol.bucket_merge_px);
        buckets::assign_groups(&mut self.items);
        buckets::snap_buckets(&mut self.items, self.geo.len(tol.snap_px));

        log::debug!(
            "extracted {} items from {} boxes ({} yields)",
            self.items.len(),
            self.arena.len(),
            self.cadence.yields()
        );
        Extraction {
            items: self.items,
            breaks: normalize_breaks(self.breaks),
            assets: self.assets,
            fonts: self.fonts,
            boxes: self.arena.len(),
        }
    }

    fn push(&mut self, rect: PxRect, kind: ItemKind) -> usize {
        self.items.push(RenderItem {
            x: self.geo.x(rect.x),
            y: self.geo.y(rect.y),
            width: self.geo.len(rect.width),
            height: self.geo.len(rect.height),
            kind,
        });
        self.items.len() - 1
    }

    fn emit_box(&mut self, node: &P::Node, id: BoxId, b: &StyledBox, path: &[Ancestor<P::Node>]) {
        if let Some(color) = background_fill(&b.style) {
            self.push(b.rect, ItemKind::Background(color));
        }
        if let Some(src) = b.style.background_image.as_deref().and_then(background_url) {
            let src = src.to_string();
            self.request_image(b, b.rect, src, true);
        }
        if let BoxContent::Image { src } = &b.content {
            self.request_image(b, content_rect(b), src.clone(), false);
        }
        if let Some(border) = self.border(b) {
            self.push(b.rect, ItemKind::Border(border));
        }
        if self.config.debug_overlay {
            self.push(b.rect, ItemKind::DebugOutline { label: b.describe() });
        }
        if let BoxContent::Text { text } = &b.content {
            self.emit_text(node, id, b, text, path);
        }
    }

    fn request_image(&mut self, b: &StyledBox, rect: PxRect, src: String, behind: bool) {
        if rect.is_empty() {
            return;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        let (size, repeat, position) = if behind {
            (
                b.style.background_size.clone(),
                b.style.background_repeat.clone(),
                b.style.background_position.clone(),
            )
        } else {
            (None, None, None)
        };
        let request = AssetRequest {
            src: src.clone(),
            width_px: rect.width,
            height_px: rect.height,
            scale: 1.0 / self.geo.units.pt_per_px(),
            size,
            repeat,
            position,
        };
        self.assets.push(PendingAsset {
            slot,
            src: src.clone(),
            task: self.rasterizer.rasterize(request),
        });
        self.push(rect, ItemKind::Image(ImageItem { slot, src, behind }));
    }

    fn border(&self, b: &StyledBox) -> Option<BorderItem> {
        let fallback = text_color(&b.style);
        let edge = |side: &BorderSide| {
            let width = self.geo.len(side.width);
            let pattern = stroke_pattern(side.style, width)?;
            let color = parse_color(&side.color).unwrap_or(fallback);
            if color.is_transparent() {
                return None;
            }
            Some(Edge { width, color, pattern })
        };
        let border = &b.style.border;
        let sides = Sides {
            top: edge(&border.top),
            right: edge(&border.right),
            bottom: edge(&border.bottom),
            left: edge(&border.left),
        };
        [&sides.top, &sides.right, &sides.bottom, &sides.left]
            .iter()
            .any(|s| s.is_some())
            .then_some(BorderItem { sides })
    }

    fn profile(&mut self, id: BoxId, container: &P::Node) -> ContainerProfile {
        if let Some(p) = self.profiles.get(&id) {
            return *p;
        }
        let mut profile = ContainerProfile::default();
        let mut first_style: Option<StyleKey> = None;
        let pt_per_px = self.geo.units.pt_per_px();
        let mut stack = self.provider.children(container);
        while let Some(node) = stack.pop() {
            let Some(b) = self.provider.get_box(&node) else {
                continue;
            };
            if b.style.display == Display::None {
                continue;
            }
            if b.style.float != Float::None {
                profile.has_floats = true;
            }
            if b.style.display.is_alignment_container() {
                continue;
            }
            match &b.content {
                BoxContent::Text { text } if !text.trim().is_empty() => {
                    let key = TextStyle::from_computed(&b.style, pt_per_px, 1.0).key();
                    match &first_style {
                        None => first_style = Some(key),
                        Some(first) if *first != key => profile.mixed_styles = true,
                        Some(_) => {}
                    }
                }
                BoxContent::Text { .. } | BoxContent::LineBreak => {}
                BoxContent::Image { .. } | BoxContent::None => {
                    if is_layout_impacting(&b) {
                        profile.has_wrappers = true;
                    }
                    stack.extend(self.provider.children(&node));
                }
            }
        }
        self.profiles.insert(id, profile);
        profile
    }

    /// Walk the container's inline leaves in document order and mark every
    /// fragment whose boundary whitespace separates it from the next
    /// non-empty fragment on the same line. The space always goes to the
    /// earlier fragment so chained group members keep their gap.
    fn scan_spacing(&mut self, id: BoxId, container: &P::Node) {
        if !self.spacing_scanned.insert(id) {
            return;
        }
        let same_line = self.config.tolerances.bucket_merge_px;
        let mut last: Option<(P::Node, f32)> = None;
        let mut space_pending = false;
        let mut stack: Vec<P::Node> = self.provider.children(container).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            let Some(b) = self.provider.get_box(&node) else {
                continue;
            };
            if b.style.display == Display::None
                || matches_any(self.provider, &node, &self.config.exclude_selectors)
            {
                continue;
            }
            if b.style.display.is_alignment_container() {
                last = None;
                space_pending = false;
                continue;
            }
            match &b.content {
                BoxContent::Text { text } if b.style.white_space.collapses_spaces() => {
                    if text.trim_matches(is_collapsible).is_empty() {
                        space_pending |= !text.is_empty();
                        continue;
                    }
                    if let Some((prev, prev_y)) = last.take()
                        && (space_pending || text.starts_with(is_collapsible))
                        && (b.rect.y - prev_y).abs() <= same_line
                    {
                        self.spaced.insert(prev);
                    }
                    space_pending = text.ends_with(is_collapsible);
                    last = Some((node, b.rect.y));
                }
                BoxContent::Text { .. } | BoxContent::LineBreak | BoxContent::Image { .. } => {
                    last = None;
                    space_pending = false;
                }
                BoxContent::None => {
                    stack.extend(self.provider.children(&node).into_iter().rev());
                }
            }
        }
    }

    fn emit_text(
        &mut self,
        node: &P::Node,
        id: BoxId,
        b: &StyledBox,
        raw: &str,
        path: &[Ancestor<P::Node>],
    ) {
        let white_space = b.style.white_space;
        let transformed = apply_transform(raw, b.style.text_transform);
        let mut text = if white_space.collapses_spaces() {
            collapse_whitespace(&transformed)
        } else {
            transformed
        };
        if text.trim().is_empty() {
            return;
        }

        let container_at = path
            .iter()
            .rposition(|a| a.b.style.display.is_alignment_container());
        let (container_id, container_node, container_box, between) = match container_at {
            Some(i) => (path[i].id, &path[i].node, &path[i].b, &path[i + 1..]),
            None => (id, node, b, &path[path.len()..]),
        };
        if container_at.is_some() && white_space.collapses_spaces() {
            self.scan_spacing(container_id, container_node);
            if self.spaced.contains(node) {
                text.push(' ');
            }
        }

        let mut left_px = container_box.rect.x + container_box.style.inset_left();
        let mut right_px = container_box.rect.right() - container_box.style.inset_right();
        for a in between {
            left_px += a.b.style.inset_left();
            right_px -= a.b.style.inset_right();
        }
        let intervening = between.iter().any(|a| is_layout_impacting(&a.b));
        let float_left = b.style.float == Float::Left
            || between.iter().any(|a| a.b.style.float == Float::Left);
        let profile = if container_at.is_some() {
            self.profile(container_id, container_node)
        } else {
            ContainerProfile::default()
        };

        let tol = self.config.tolerances;
        let q = tol.bucket_quantum_px;
        let bucket_y = (((b.rect.y - self.geo.origin_y) / q).round() * q) as i32;
        let bucket = BucketKey {
            container: container_id,
            y_px: bucket_y,
        };

        if self.config.flow_mixed_paragraphs
            && container_at.is_some()
            && profile.mixed_styles
            && !profile.has_floats
            && !profile.has_wrappers
            && !intervening
        {
            if self.flowed.insert(container_id) {
                self.emit_flow(container_node, container_box, b, bucket, (left_px, right_px));
            }
            return;
        }

        let units = self.geo.units;
        let scale = self.config.text_scale;
        let style = TextStyle::from_computed(&b.style, units.pt_per_px(), scale);
        self.note_fonts(&text, style.bold);
        let align = Align::from(b.style.text_align);
        let content_left = self.geo.x(left_px);
        let content_right = self.geo.x(right_px);

        let mergeable = !profile.mixed_styles && !profile.has_floats && !intervening;
        let key = MergeKey {
            container: container_id,
            style: style.key(),
            bucket_y,
            align,
        };
        if mergeable && let Some(&idx) = self.merge_index.get(&key) {
            self.merge_into(idx, b.rect, &text, style.font_size);
            return;
        }

        // Final keys and order are assigned once buckets are merged.
        let group = (!mergeable && align != Align::Left).then_some(InlineGroup {
            key: GroupKey {
                container: container_id,
                line: bucket_y,
            },
            order: 0,
        });

        let x = self.geo.x(b.rect.x);
        let max_width = match align {
            Align::Left => (content_right - x).max(self.geo.len(b.rect.width)),
            Align::Center | Align::Right => content_right - content_left,
        };
        let line_height = b
            .style
            .line_height
            .map(|lh| units.to_pt(lh) * scale)
            .unwrap_or(style.font_size * 1.2);
        let idx = self.push(
            b.rect,
            ItemKind::Text(TextItem {
                runs: vec![InlineRun::Text(Run { text, style })],
                align,
                wrap: white_space.wraps(),
                max_width,
                line_height,
                bucket,
                group,
                content_left,
                content_right,
                float_left,
            }),
        );
        if mergeable {
            self.merge_index.insert(key, idx);
        }
    }

    /// Append a same-line fragment to an earlier item, widening it.
    fn merge_into(&mut self, idx: usize, rect: PxRect, text: &str, font_size: f32) {
        let x = self.geo.x(rect.x);
        let y = self.geo.y(rect.y);
        let width = self.geo.len(rect.width);
        let height = self.geo.len(rect.height);
        let item = &mut self.items[idx];
        let right = (item.x + item.width).max(x + width);
        let gap = x - (item.x + item.width);
        if let ItemKind::Text(t) = &mut item.kind
            && let Some(InlineRun::Text(run)) = t.runs.last_mut()
        {
            if gap > font_size * 0.15 && !run.text.ends_with(' ') && !text.starts_with(' ') {
                run.text.push(' ');
            }
            run.text.push_str(text);
            t.max_width = t.max_width.max(right - item.x.min(x));
        }
        item.x = item.x.min(x);
        item.width = right - item.x;
        item.y = item.y.min(y);
        item.height = item.height.max(height);
    }

    /// One multi-run item for a whole mixed-style container.
    fn emit_flow(
        &mut self,
        container: &P::Node,
        container_box: &StyledBox,
        first: &StyledBox,
        bucket: BucketKey,
        (left_px, right_px): (f32, f32),
    ) {
        let units = self.geo.units;
        let scale = self.config.text_scale;
        let pieces: Vec<InlinePiece> = collect_inline_pieces(self.provider, container, &units, scale);
        let runs = build_runs(&pieces);
        let mut max_size: f32 = 0.0;
        for run in &runs {
            if let InlineRun::Text(r) = run {
                self.note_fonts(&r.text, r.style.bold);
                max_size = max_size.max(r.style.font_size);
            }
        }
        if max_size == 0.0 {
            return;
        }
        let style = &container_box.style;
        let content = content_rect(container_box);
        let top = first.rect.y.max(content.y);
        let rect = PxRect::new(left_px, top, right_px - left_px, (content.bottom() - top).max(0.0));
        let line_height = style
            .line_height
            .map(|lh| units.to_pt(lh) * scale)
            .unwrap_or(max_size * 1.2);
        let content_left = self.geo.x(left_px);
        let content_right = self.geo.x(right_px);
        self.push(
            rect,
            ItemKind::Text(TextItem {
                runs,
                align: Align::from(style.text_align),
                wrap: style.white_space.wraps(),
                max_width: content_right - content_left,
                line_height,
                bucket,
                group: None,
                content_left,
                content_right,
                float_left: false,
            }),
        );
    }

    fn note_fonts(&mut self, text: &str, bold: bool) {
        if let Some(id) = detect_required_font(text) {
            self.fonts.insert((id.to_string(), bold));
        }
    }
}

/// Extract one section rooted at `root`. Asset slots are numbered from
/// `first_slot` so several sections can share one asset table.
pub async fn extract<'r, P: LayoutProvider>(
    provider: &P,
    root: &P::Node,
    config: &Config,
    geo: SectionGeometry,
    rasterizer: &'r dyn AssetRasterizer,
    first_slot: usize,
) -> Extraction<'r> {
    let extractor = Extractor {
        provider,
        config,
        geo,
        rasterizer,
        arena: BoxArena::new(),
        items: Vec::new(),
        breaks: Vec::new(),
        assets: Vec::new(),
        next_slot: first_slot,
        fonts: BTreeSet::new(),
        profiles: HashMap::new(),
        merge_index: HashMap::new(),
        flowed: HashSet::new(),
        spacing_scanned: HashSet::new(),
        spaced: HashSet::new(),
        cadence: Cadence::new(config.yield_every_items, config.yield_every_ms),
    };
    extractor.run(root).await
}
