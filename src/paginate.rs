//! Maps flow offsets to pages. Pages are never materialised here: membership
//! is a pure function of the offset, the forced breaks and the page height.

/// Where a flow offset lands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Absolute page number, 1-based.
    pub page: usize,
    /// Distance from the top edge of the page, in points.
    pub y: f32,
}

/// The part of a vertical span that falls on one page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slice {
    pub page: usize,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Clone, Debug)]
pub struct Paginator {
    breaks: Vec<f32>,
    content_height: f32,
    margin_top: f32,
    start_page: usize,
}

/// Sort and deduplicate forced-break offsets collected in encounter order.
pub fn normalize_breaks(mut breaks: Vec<f32>) -> Vec<f32> {
    breaks.retain(|b| b.is_finite());
    breaks.sort_by(f32::total_cmp);
    breaks.dedup();
    breaks
}

impl Paginator {
    /// `breaks` must be sorted and unique (see [`normalize_breaks`]).
    /// `start_page` is the absolute number of the section's first page.
    pub fn new(breaks: Vec<f32>, content_height: f32, margin_top: f32, start_page: usize) -> Self {
        debug_assert!(breaks.windows(2).all(|w| w[0] < w[1]));
        Self {
            breaks,
            content_height,
            margin_top,
            start_page: start_page.max(1),
        }
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn margin_top(&self) -> f32 {
        self.margin_top
    }

    pub fn locate(&self, offset: f32) -> Placement {
        let forced = self.breaks.partition_point(|&b| b <= offset);
        let base = if forced > 0 { self.breaks[forced - 1] } else { 0.0 };
        let relative = (offset - base).max(0.0);
        let local_page = forced + (relative / self.content_height).floor() as usize + 1;
        Placement {
            page: self.start_page + local_page - 1,
            y: self.margin_top + relative.rem_euclid(self.content_height),
        }
    }

    /// Like [`locate`](Self::locate), but for the end of a span: an offset
    /// exactly on a page boundary or forced break stays on the earlier page.
    fn locate_end(&self, offset: f32) -> Placement {
        let forced = self.breaks.partition_point(|&b| b < offset);
        let base = if forced > 0 { self.breaks[forced - 1] } else { 0.0 };
        let relative = (offset - base).max(0.0);
        let mut pages = (relative / self.content_height).floor() as usize;
        let mut y = relative.rem_euclid(self.content_height);
        if pages > 0 && y < 1e-3 {
            pages -= 1;
            y = self.content_height;
        }
        Placement {
            page: self.start_page + forced + pages,
            y: self.margin_top + y,
        }
    }

    /// Split `[top, top + height)` into per-page slices.
    pub fn span(&self, top: f32, height: f32) -> Vec<Slice> {
        let start = self.locate(top);
        let end = if height > 0.0 {
            self.locate_end(top + height)
        } else {
            start
        };
        if end.page <= start.page {
            return vec![Slice {
                page: start.page,
                top: start.y,
                bottom: end.y.max(start.y),
            }];
        }
        let page_bottom = self.margin_top + self.content_height;
        (start.page..=end.page)
            .map(|page| Slice {
                page,
                top: if page == start.page { start.y } else { self.margin_top },
                bottom: if page == end.page { end.y } else { page_bottom },
            })
            .collect()
    }
}
