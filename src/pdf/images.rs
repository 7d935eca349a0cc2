use pdf_writer::{Filter, Pdf, Ref};

use super::Refs;
use crate::sink::{ImageData, RasterImage};

/// Write `image` as an image XObject and return its reference. JPEG data is
/// passed through with DCTDecode; RGBA pixels become a deflated RGB image
/// plus a soft mask when any pixel is not opaque.
pub(super) fn embed_image(pdf: &mut Pdf, refs: &mut Refs, image: &RasterImage) -> Ref {
    let xobj_ref = refs.next();
    let (w, h) = (image.width as i32, image.height as i32);

    match &image.data {
        ImageData::Jpeg(data) => {
            let mut xobj = pdf.image_xobject(xobj_ref, data);
            xobj.filter(Filter::DctDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        ImageData::Rgba(pixels) => {
            let has_alpha = pixels.chunks_exact(4).any(|p| p[3] < 255);
            let rgb: Vec<u8> = pixels.chunks_exact(4).flat_map(|p| [p[0], p[1], p[2]]).collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb, 6);

            let smask_ref = has_alpha.then(|| {
                let alpha: Vec<u8> = pixels.chunks_exact(4).map(|p| p[3]).collect();
                let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(&alpha, 6);
                let mask_ref = refs.next();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w);
                mask.height(h);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                mask_ref
            });

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w);
            xobj.height(h);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }
    xobj_ref
}
