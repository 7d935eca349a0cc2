//! Asynchronous asset and font loading, fanned out during extraction and
//! joined once before rendering.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::PathBuf;

use futures::future::{BoxFuture, join_all};

use crate::error::Error;
use crate::fonts::FontLoader;
use crate::progress::Observer;
use crate::sink::{ImageData, RasterImage, VectorSink};

/// What to rasterise and at which size.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetRequest {
    pub src: String,
    /// Target box in device pixels.
    pub width_px: f32,
    pub height_px: f32,
    /// Device pixels per output point.
    pub scale: f32,
    pub size: Option<String>,
    pub repeat: Option<String>,
    pub position: Option<String>,
}

pub trait AssetRasterizer {
    fn rasterize(&self, request: AssetRequest) -> BoxFuture<'_, Result<RasterImage, Error>>;
}

/// Rasteriser that has nothing: every request fails.
pub struct NoAssets;

impl AssetRasterizer for NoAssets {
    fn rasterize(&self, request: AssetRequest) -> BoxFuture<'_, Result<RasterImage, Error>> {
        Box::pin(async move { Err(Error::asset(request.src, "no asset source configured")) })
    }
}

/// Reads images from disk, relative paths resolved against `base`.
pub struct FsRasterizer {
    base: PathBuf,
}

impl FsRasterizer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn path_for(&self, src: &str) -> PathBuf {
        let src = src.strip_prefix("file://").unwrap_or(src);
        self.base.join(src)
    }
}

/// Decode PNG or JPEG bytes. JPEG data is kept encoded.
pub fn decode_image(bytes: Vec<u8>) -> Result<RasterImage, image::ImageError> {
    let reader = image::ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    if reader.format() == Some(image::ImageFormat::Jpeg) {
        let (width, height) = reader.into_dimensions()?;
        return Ok(RasterImage {
            width,
            height,
            data: ImageData::Jpeg(bytes),
        });
    }
    let rgba = reader.decode()?.to_rgba8();
    Ok(RasterImage {
        width: rgba.width(),
        height: rgba.height(),
        data: ImageData::Rgba(rgba.into_raw()),
    })
}

impl AssetRasterizer for FsRasterizer {
    fn rasterize(&self, request: AssetRequest) -> BoxFuture<'_, Result<RasterImage, Error>> {
        Box::pin(async move {
            if request.src.starts_with("data:") || request.src.contains("://") {
                return Err(Error::asset(request.src, "only local files are supported"));
            }
            let path = self.path_for(&request.src);
            let bytes = std::fs::read(&path).map_err(|e| Error::asset(&request.src, e))?;
            decode_image(bytes).map_err(|e| Error::asset(&request.src, e))
        })
    }
}

/// An image slot reserved during extraction and the task that fills it.
pub struct PendingAsset<'r> {
    pub slot: usize,
    pub src: String,
    pub task: BoxFuture<'r, Result<RasterImage, Error>>,
}

/// Resolved images by slot; `None` where loading failed.
#[derive(Debug, Default)]
pub struct AssetTable {
    slots: Vec<Option<RasterImage>>,
}

impl AssetTable {
    pub fn get(&self, slot: usize) -> Option<&RasterImage> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }
}

/// Await every pending asset. Each failure is classified on its own: in
/// lenient mode it is reported and its slot left empty, in strict mode the
/// first failure (in slot order) aborts.
pub async fn join_assets(
    pending: Vec<PendingAsset<'_>>,
    strict: bool,
    observer: &dyn Observer,
) -> Result<AssetTable, Error> {
    let slots_needed = pending.iter().map(|p| p.slot + 1).max().unwrap_or(0);
    let (meta, tasks): (Vec<_>, Vec<_>) = pending.into_iter().map(|p| ((p.slot, p.src), p.task)).unzip();
    let results = join_all(tasks).await;

    let mut table = AssetTable {
        slots: vec![None; slots_needed],
    };
    for ((slot, src), result) in meta.into_iter().zip(results) {
        match result {
            Ok(image) => table.slots[slot] = Some(image),
            Err(err) => {
                let err = match err {
                    e @ Error::AssetLoadFailed { .. } => e,
                    other => Error::asset(src, other),
                };
                if strict {
                    return Err(err);
                }
                log::warn!("{err}; slot {slot} left empty");
                observer.on_error(&err);
            }
        }
    }
    Ok(table)
}

/// Load every needed font into the sink. Failures fall back to the built-in
/// fonts unless `strict`.
pub async fn load_fonts<S: VectorSink + ?Sized>(
    loader: &dyn FontLoader,
    needed: &BTreeSet<(String, bool)>,
    sink: &mut S,
    strict: bool,
    observer: &dyn Observer,
) -> Result<usize, Error> {
    let tasks = needed.iter().map(|(id, bold)| loader.load_font(id, *bold));
    let results = join_all(tasks).await;

    let mut loaded = 0;
    for ((id, bold), result) in needed.iter().zip(results) {
        let outcome = result.and_then(|data| sink.register_font(id, *bold, data));
        match outcome {
            Ok(()) => loaded += 1,
            Err(err) => {
                let err = match err {
                    e @ Error::DependencyLoadFailed { .. } => e,
                    other => Error::font(id, other),
                };
                if strict {
                    return Err(err);
                }
                log::warn!("{err}; falling back to Helvetica");
                observer.on_error(&err);
            }
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Errors(RefCell<Vec<ErrorCode>>);

    impl Observer for Errors {
        fn on_error(&self, error: &Error) {
            self.0.borrow_mut().push(error.code());
        }
    }

    fn ok_image() -> BoxFuture<'static, Result<RasterImage, Error>> {
        Box::pin(async {
            Ok(RasterImage {
                width: 1,
                height: 1,
                data: ImageData::Rgba(vec![0, 0, 0, 255]),
            })
        })
    }

    fn failing(src: &str) -> BoxFuture<'static, Result<RasterImage, Error>> {
        let src = src.to_string();
        Box::pin(async move { Err(Error::asset(src, "404")) })
    }

    fn pending() -> Vec<PendingAsset<'static>> {
        vec![
            PendingAsset {
                slot: 0,
                src: "a.png".into(),
                task: ok_image(),
            },
            PendingAsset {
                slot: 1,
                src: "missing.png".into(),
                task: failing("missing.png"),
            },
            PendingAsset {
                slot: 2,
                src: "c.png".into(),
                task: ok_image(),
            },
        ]
    }

    #[tokio::test]
    async fn lenient_isolates_failures() {
        let observer = Errors::default();
        let table = join_assets(pending(), false, &observer).await.unwrap();
        assert!(table.get(0).is_some());
        assert!(table.get(1).is_none());
        assert!(table.get(2).is_some());
        assert_eq!(table.failed(), 1);
        assert_eq!(*observer.0.borrow(), vec![ErrorCode::AssetLoadFailed]);
    }

    #[tokio::test]
    async fn strict_promotes_first_failure() {
        let observer = Errors::default();
        let err = join_assets(pending(), true, &observer).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::AssetLoadFailed);
        assert!(err.to_string().contains("missing.png"));
    }

    #[tokio::test]
    async fn missing_file_is_asset_error() {
        let r = FsRasterizer::new("/nonexistent-asset-dir");
        let err = r
            .rasterize(AssetRequest {
                src: "logo.png".into(),
                width_px: 10.0,
                height_px: 10.0,
                scale: 1.0,
                size: None,
                repeat: None,
                position: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::AssetLoadFailed);
    }

    #[test]
    fn decodes_png() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 0, 128]))
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let img = decode_image(png).unwrap();
        assert_eq!((img.width, img.height), (2, 3));
        assert!(matches!(img.data, ImageData::Rgba(ref px) if px.len() == 24));
    }
}
