//! `VectorSink` that writes a PDF with pdf-writer.

mod images;

use std::collections::{BTreeSet, HashMap};
use std::time::{Duration, Instant};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, Str};

use crate::error::Error;
use crate::fonts::{BuiltinFamily, BuiltinMetrics, TrueTypeFont, encode_as_gids, to_winansi_bytes};
use crate::sink::{RasterImage, Stroke, TextAnchor, VectorSink};
use crate::style::{Rgba, TextStyle};
use crate::text::TextMeasure;

/// Sequential object ids.
pub(crate) struct Refs(i32);

impl Refs {
    pub(crate) fn next(&mut self) -> Ref {
        let r = Ref::new(self.0);
        self.0 += 1;
        r
    }
}

struct EmbeddedFont {
    font: TrueTypeFont,
    pdf_name: String,
    font_ref: Ref,
    used: BTreeSet<char>,
}

pub struct PdfSink {
    pdf: Pdf,
    refs: Refs,
    catalog_id: Ref,
    pages_id: Ref,
    page_width: f32,
    page_height: f32,
    pages: Vec<Content>,
    current: usize,
    /// Base-14 fonts by PostScript name: resource name and object.
    builtin: HashMap<&'static str, (String, Ref)>,
    embedded: HashMap<(String, bool), EmbeddedFont>,
    /// Resource names in first-use order, shared by every page.
    font_resources: Vec<(String, Ref)>,
    image_resources: Vec<(String, Ref)>,
    t0: Instant,
    image_time: Duration,
}

impl PdfSink {
    /// A sink whose pages all measure `page_width` x `page_height` points.
    pub fn new(page_width: f32, page_height: f32) -> Self {
        let mut refs = Refs(1);
        let catalog_id = refs.next();
        let pages_id = refs.next();
        Self {
            pdf: Pdf::new(),
            refs,
            catalog_id,
            pages_id,
            page_width,
            page_height,
            pages: Vec::new(),
            current: 0,
            builtin: HashMap::new(),
            embedded: HashMap::new(),
            font_resources: Vec::new(),
            image_resources: Vec::new(),
            t0: Instant::now(),
            image_time: Duration::ZERO,
        }
    }

    fn content(&mut self) -> &mut Content {
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }
        let idx = self.current.min(self.pages.len() - 1);
        &mut self.pages[idx]
    }

    fn flip(&self, y: f32) -> f32 {
        self.page_height - y
    }

    fn builtin_font(&mut self, base: &'static str) -> String {
        if let Some((name, _)) = self.builtin.get(base) {
            return name.clone();
        }
        let font_ref = self.refs.next();
        self.pdf
            .type1_font(font_ref)
            .base_font(Name(base.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        let name = format!("F{}", self.font_resources.len() + 1);
        self.font_resources.push((name.clone(), font_ref));
        self.builtin.insert(base, (name.clone(), font_ref));
        name
    }

    fn embedded_key(&self, font_id: &str, bold: bool) -> Option<(String, bool)> {
        [bold, !bold]
            .into_iter()
            .map(|b| (font_id.to_string(), b))
            .find(|k| self.embedded.contains_key(k))
    }

    /// Resource name and encoded bytes for `text` in `style`.
    fn encode(&mut self, text: &str, style: &TextStyle) -> (String, Vec<u8>) {
        if let Some(id) = &style.font_id
            && let Some(key) = self.embedded_key(id, style.bold)
            && let Some(font) = self.embedded.get_mut(&key)
        {
            font.used.extend(text.chars());
            return (font.pdf_name.clone(), encode_as_gids(text, &font.font.char_to_gid));
        }
        let base = BuiltinFamily::for_family(&style.font_family).base_font(style.bold, style.italic);
        (self.builtin_font(base), to_winansi_bytes(text))
    }

    /// Assemble the document and return its bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let t_draw = self.t0.elapsed();
        if self.pages.is_empty() {
            self.pages.push(Content::new());
        }

        let mut fonts: Vec<EmbeddedFont> = self.embedded.into_values().collect();
        fonts.sort_by(|a, b| a.pdf_name.cmp(&b.pdf_name));
        for font in &fonts {
            embed_truetype(&mut self.pdf, &mut self.refs, font);
        }
        let t_fonts = self.t0.elapsed();

        let n = self.pages.len();
        let page_ids: Vec<Ref> = (0..n).map(|_| self.refs.next()).collect();
        let content_ids: Vec<Ref> = (0..n).map(|_| self.refs.next()).collect();

        for (i, c) in self.pages.into_iter().enumerate() {
            let raw = c.finish();
            let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
            self.pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
        }

        self.pdf.catalog(self.catalog_id).pages(self.pages_id);
        self.pdf
            .pages(self.pages_id)
            .kids(page_ids.iter().copied())
            .count(n as i32);

        for i in 0..n {
            let mut page = self.pdf.page(page_ids[i]);
            page.media_box(Rect::new(0.0, 0.0, self.page_width, self.page_height))
                .parent(self.pages_id)
                .contents(content_ids[i]);
            let mut resources = page.resources();
            {
                let mut fonts = resources.fonts();
                for (name, font_ref) in &self.font_resources {
                    fonts.pair(Name(name.as_bytes()), *font_ref);
                }
            }
            if !self.image_resources.is_empty() {
                let mut xobjects = resources.x_objects();
                for (name, xobj_ref) in &self.image_resources {
                    xobjects.pair(Name(name.as_bytes()), *xobj_ref);
                }
            }
        }
        let t_assembly = self.t0.elapsed();

        log::info!(
            "Render phases: draw={:.1}ms (images={:.1}ms), font_embed={:.1}ms, assembly={:.1}ms, pages={n}",
            t_draw.as_secs_f64() * 1000.0,
            self.image_time.as_secs_f64() * 1000.0,
            (t_fonts - t_draw).as_secs_f64() * 1000.0,
            (t_assembly - t_fonts).as_secs_f64() * 1000.0,
        );

        self.pdf.finish()
    }
}

/// Embed a whole TrueType/OpenType font as a CIDFont (Type0 composite) with
/// Identity-H encoding. Widths and the ToUnicode map cover the used chars.
fn embed_truetype(pdf: &mut Pdf, refs: &mut Refs, entry: &EmbeddedFont) {
    let font = &entry.font;
    let descriptor_ref = refs.next();
    let data_ref = refs.next();
    let cid_font_ref = refs.next();
    let tounicode_ref = refs.next();

    let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&font.data, 6);
    pdf.stream(data_ref, &compressed)
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), font.data.len() as i32);

    let [x0, y0, x1, y1] = font.bbox_1000;
    pdf.font_descriptor(descriptor_ref)
        .name(Name(font.ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(x0, y0, x1, y1))
        .italic_angle(0.0)
        .ascent(font.ascent_1000)
        .descent(font.descent_1000)
        .cap_height(font.cap_height_1000)
        .stem_v(80.0)
        .font_file2(data_ref);

    let system_info = || pdf_writer::types::SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    };

    let mut used: Vec<(u16, char)> = entry
        .used
        .iter()
        .filter_map(|&ch| font.char_to_gid.get(&ch).map(|&gid| (gid, ch)))
        .collect();
    used.sort_unstable();
    used.dedup_by_key(|(gid, _)| *gid);

    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(font.ps_name.as_bytes()));
        cid.system_info(system_info());
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));
        if !used.is_empty() {
            let mut w = cid.widths();
            for &(gid, _) in &used {
                let width = font.advances_1000.get(gid as usize).copied().unwrap_or(0.0);
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{}-UTF16", font.ps_name);
    let mut cmap = pdf_writer::types::UnicodeCmap::new(Name(cmap_name.as_bytes()), system_info());
    for &(gid, ch) in &used {
        cmap.pair(gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(entry.font_ref)
        .base_font(Name(font.ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);
}

impl TextMeasure for PdfSink {
    fn measure(&self, text: &str, style: &TextStyle) -> f32 {
        if let Some(id) = &style.font_id
            && let Some(key) = self.embedded_key(id, style.bold)
            && let Some(font) = self.embedded.get(&key)
        {
            return font.font.measure(text, style.font_size);
        }
        BuiltinMetrics.measure(text, style)
    }
}

fn set_stroke(content: &mut Content, stroke: &Stroke) {
    let [r, g, b] = stroke.color.unit_rgb();
    content.set_line_width(stroke.width);
    content.set_stroke_rgb(r, g, b);
    if !stroke.dash.is_empty() {
        content.set_dash_pattern(stroke.dash.iter().copied(), 0.0);
    }
}

impl VectorSink for PdfSink {
    fn add_page(&mut self) {
        self.pages.push(Content::new());
    }

    fn set_page(&mut self, index: usize) {
        self.current = index;
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgba) {
        if color.is_transparent() {
            return;
        }
        let [r, g, b] = color.unit_rgb();
        let y = self.flip(y + height);
        let content = self.content();
        content.save_state();
        content.set_fill_rgb(r, g, b);
        content.rect(x, y, width, height);
        content.fill_nonzero();
        content.restore_state();
    }

    fn stroke_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, stroke: &Stroke) {
        let (y1, y2) = (self.flip(y1), self.flip(y2));
        let content = self.content();
        content.save_state();
        set_stroke(content, stroke);
        content.move_to(x1, y1);
        content.line_to(x2, y2);
        content.stroke();
        content.restore_state();
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, stroke: &Stroke) {
        let y = self.flip(y + height);
        let content = self.content();
        content.save_state();
        set_stroke(content, stroke);
        content.rect(x, y, width, height);
        content.stroke();
        content.restore_state();
    }

    fn draw_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle, anchor: TextAnchor) {
        if text.is_empty() {
            return;
        }
        let x = match anchor {
            TextAnchor::Start => x,
            TextAnchor::Middle => x - self.measure(text, style) / 2.0,
            TextAnchor::End => x - self.measure(text, style),
        };
        let (font_name, bytes) = self.encode(text, style);
        let [r, g, b] = style.color.unit_rgb();
        let y = self.flip(baseline);
        let content = self.content();
        content.begin_text();
        content.set_fill_rgb(r, g, b);
        content.set_font(Name(font_name.as_bytes()), style.font_size);
        content.next_line(x, y);
        content.show(Str(&bytes));
        content.end_text();
    }

    fn draw_image(&mut self, image: &RasterImage, x: f32, y: f32, width: f32, height: f32) {
        let t = Instant::now();
        let xobj_ref = images::embed_image(&mut self.pdf, &mut self.refs, image);
        let name = format!("Im{}", self.image_resources.len() + 1);
        self.image_resources.push((name.clone(), xobj_ref));
        self.image_time += t.elapsed();

        let y = self.flip(y + height);
        let content = self.content();
        content.save_state();
        content.transform([width, 0.0, 0.0, height, x, y]);
        content.x_object(Name(name.as_bytes()));
        content.restore_state();
    }

    fn register_font(&mut self, font_id: &str, bold: bool, data: Vec<u8>) -> Result<(), Error> {
        let font = TrueTypeFont::parse(font_id, data)?;
        let font_ref = self.refs.next();
        let pdf_name = format!("F{}", self.font_resources.len() + 1);
        self.font_resources.push((pdf_name.clone(), font_ref));
        log::debug!("Embedding font {font_id} (bold={bold}) as {}", font.ps_name);
        self.embedded.insert(
            (font_id.to_string(), bold),
            EmbeddedFont {
                font,
                pdf_name,
                font_ref,
                used: BTreeSet::new(),
            },
        );
        Ok(())
    }

    fn has_font(&self, font_id: &str) -> bool {
        self.embedded.keys().any(|(id, _)| id == font_id)
    }
}
