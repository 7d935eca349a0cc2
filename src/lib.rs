mod error;

pub mod config;
pub mod extract;
pub mod fonts;
pub mod item;
pub mod model;
pub mod paginate;
pub mod pdf;
pub mod progress;
pub mod render;
pub mod schedule;
pub mod sink;
pub mod style;
pub mod text;
pub mod tree;
pub mod units;

pub use config::Config;
pub use error::{Error, ErrorCode, SelectorError};
pub use extract::assets::{AssetRasterizer, AssetRequest, FsRasterizer, NoAssets};
pub use fonts::{DirFontLoader, FontLoader, NoFonts};
pub use pdf::PdfSink;
pub use progress::{LogObserver, Observer, Progress};
pub use sink::{RecordingSink, VectorSink};
pub use tree::{DocumentTree, LayoutProvider};

use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};

use config::ScaleMode;
use extract::SectionGeometry;
use extract::assets::{join_assets, load_fonts};
use model::StyledBox;
use paginate::Paginator;
use schedule::Cadence;
use units::UnitConverter;

/// A section root: looked up by selector or handed over directly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target<N> {
    Selector(String),
    Node(N),
}

/// Summary of one conversion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: usize,
    pub items: usize,
    pub pages: usize,
    pub failed_assets: usize,
    pub skipped_images: usize,
    pub fonts_loaded: usize,
}

/// Runs the extract, load, paginate and render pipeline with pluggable asset,
/// font and event handling.
pub struct Converter {
    config: Config,
    rasterizer: Box<dyn AssetRasterizer>,
    fonts: Box<dyn FontLoader>,
    observer: Box<dyn Observer>,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rasterizer: Box::new(NoAssets),
            fonts: Box::new(NoFonts),
            observer: Box::new(LogObserver),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: impl AssetRasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    pub fn with_font_loader(mut self, loader: impl FontLoader + 'static) -> Self {
        self.fonts = Box::new(loader);
        self
    }

    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Draw every target onto `sink`, each as its own section starting on a
    /// fresh page. Failures are reported to the observer and returned.
    pub async fn convert<P, S>(&self, provider: &P, targets: &[Target<P::Node>], sink: &mut S) -> Result<Report, Error>
    where
        P: LayoutProvider,
        S: VectorSink + ?Sized,
    {
        self.run(provider, targets, sink).await.map_err(|err| self.report(err))
    }

    /// Hand a failure to the observer and give it back for propagation.
    fn report(&self, err: Error) -> Error {
        self.observer.on_error(&err);
        err
    }

    /// Like [`convert`](Self::convert), into a fresh PDF sink sized from the
    /// config. Returns the PDF bytes.
    pub async fn convert_to_pdf<P: LayoutProvider>(
        &self,
        provider: &P,
        targets: &[Target<P::Node>],
    ) -> Result<Vec<u8>, Error> {
        let (width, height) = self.config.page_dimensions();
        let mut sink = PdfSink::new(width, height);
        let report = self.convert(provider, targets, &mut sink).await?;
        log::debug!("{report:?}");

        self.observer.on_progress(&Progress::SaveStart);
        let bytes = sink.finish();
        self.observer.on_progress(&Progress::SaveDone { bytes: bytes.len() });
        Ok(bytes)
    }

    async fn wait_ready<P: LayoutProvider>(&self, provider: &P) {
        let limit = Duration::from_millis(self.config.ready_timeout_ms);
        if tokio::time::timeout(limit, provider.ready()).await.is_err() {
            log::warn!("Layout not ready after {}ms, continuing", self.config.ready_timeout_ms);
        }
    }

    fn resolve<P: LayoutProvider>(&self, provider: &P, target: &Target<P::Node>) -> Result<(P::Node, StyledBox), Error> {
        let (node, label) = match target {
            Target::Selector(sel) => {
                let node = provider
                    .query(sel)
                    .ok_or_else(|| Error::TargetNotFound(sel.clone()))?;
                (node, sel.clone())
            }
            Target::Node(node) => (node.clone(), format!("{node:?}")),
        };
        let b = provider.get_box(&node).ok_or(Error::TargetNotFound(label))?;
        if b.rect.width <= 0.0 || b.rect.height <= 0.0 {
            return Err(Error::TargetZeroSize(b.describe()));
        }
        Ok((node, b))
    }

    async fn run<P, S>(&self, provider: &P, targets: &[Target<P::Node>], sink: &mut S) -> Result<Report, Error>
    where
        P: LayoutProvider,
        S: VectorSink + ?Sized,
    {
        let config = &self.config;
        let observer = &*self.observer;
        config.validate()?;
        self.wait_ready(provider).await;

        let roots = targets
            .iter()
            .map(|t| self.resolve(provider, t))
            .collect::<Result<Vec<_>, _>>()?;
        observer.on_progress(&Progress::SelectionDone { sections: roots.len() });

        let mut sections = Vec::with_capacity(roots.len());
        let mut pending = Vec::new();
        let mut needed_fonts = BTreeSet::new();
        let mut next_slot = 0;
        for (index, (node, b)) in roots.iter().enumerate() {
            let units = match config.scale {
                ScaleMode::FitWidth => UnitConverter::fit(b.rect.width, config.content_width()),
                ScaleMode::Natural => UnitConverter::natural(),
            };
            let geo = SectionGeometry {
                units,
                origin_x: b.rect.x,
                origin_y: b.rect.y,
                margin_left: config.margins.left,
            };
            let mut extraction = extract::extract(provider, node, config, geo, &*self.rasterizer, next_slot).await;
            next_slot += extraction.assets.len();
            pending.append(&mut extraction.assets);
            needed_fonts.append(&mut extraction.fonts);
            observer.on_progress(&Progress::ElementParsed {
                section: index,
                items: extraction.items.len(),
            });
            log::debug!(
                "Section {index} ({}): {} boxes, {} items, {} forced breaks",
                b.describe(),
                extraction.boxes,
                extraction.items.len(),
                extraction.breaks.len()
            );
            sections.push((extraction.items, extraction.breaks));
        }

        let assets = join_assets(pending, config.strict_assets, observer).await?;
        let fonts_loaded = load_fonts(&*self.fonts, &needed_fonts, sink, config.strict_assets, observer).await?;

        let items: usize = sections.iter().map(|(items, _)| items.len()).sum();
        observer.on_progress(&Progress::RenderStart { items });

        let mut cadence = Cadence::new(config.yield_every_items, config.yield_every_ms);
        let mut skipped_images = 0;
        for (items, breaks) in sections {
            let start_page = sink.page_count() + 1;
            sink::ensure_page(sink, start_page);
            let pages = Paginator::new(breaks, config.content_height(), config.margins.top, start_page);
            let stats = render::render(&items, &assets, &pages, sink, &mut cadence).await;
            skipped_images += stats.skipped_images;
        }

        let pages = sink.page_count();
        observer.on_progress(&Progress::RenderDone { pages });
        log::debug!("Yielded {} times", cadence.yields());

        Ok(Report {
            sections: roots.len(),
            items,
            pages,
            failed_assets: assets.failed(),
            skipped_images,
            fonts_loaded,
        })
    }
}

/// Convert a box tree stored as JSON into a PDF file, one section per root.
pub async fn convert_json_file(converter: &Converter, input: &Path, output: &Path) -> Result<(), Error> {
    let t0 = Instant::now();

    let json = std::fs::read_to_string(input).map_err(|e| converter.report(e.into()))?;
    let tree = DocumentTree::from_json(&json).map_err(|e| converter.report(e.into()))?;
    let t_parse = t0.elapsed();

    let targets: Vec<Target<_>> = tree.roots().iter().copied().map(Target::Node).collect();
    let bytes = converter.convert_to_pdf(&tree, &targets).await?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(|e| converter.report(e.into()))?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, render={:.1}ms, write={:.1}ms, total={:.1}ms (output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_render - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        bytes.len(),
    );

    Ok(())
}
