//! Raster image helpers: embedding images as PDF pages and encoding
//! rendered pages.

use crate::error::PdfDeskError;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Write;
use tracing::debug;

/// Build a PDF with one page per image, each page sized to the image's
/// pixel dimensions in points.
///
/// JPEG input is embedded as-is (`DCTDecode`); other formats are decoded,
/// composited onto white and stored as Flate-compressed RGB.
pub fn images_to_pdf(images: &[&[u8]]) -> Result<Vec<u8>, PdfDeskError> {
    if images.is_empty() {
        return Err(PdfDeskError::OperationError("No images to convert".into()));
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::with_capacity(images.len());

    for (i, bytes) in images.iter().enumerate() {
        let (stream, width, height) = image_xobject(bytes)
            .map_err(|e| match e {
                PdfDeskError::DecodeError(detail) => {
                    PdfDeskError::DecodeError(format!("Image {}: {}", i, detail))
                }
                other => other,
            })?;
        debug!(image = i, width, height, "Embedding image");
        let image_id = doc.add_object(stream);

        let (w, h) = (width as f32, height as f32);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(w),
                        0.into(),
                        0.into(),
                        Object::Real(h),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content = content
            .encode()
            .map_err(|e| PdfDeskError::OperationError(format!("Content encoding failed: {}", e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(w), Object::Real(h)],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => Object::Reference(image_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    crate::page::save(&mut doc)
}

fn image_xobject(bytes: &[u8]) -> Result<(Stream, u32, u32), PdfDeskError> {
    let format = image::guess_format(bytes).map_err(|e| PdfDeskError::DecodeError(e.to_string()))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PdfDeskError::DecodeError(e.to_string()))?;
    let (width, height) = (decoded.width(), decoded.height());

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "BitsPerComponent" => 8,
    };

    let passthrough = match (format, decoded.color()) {
        (ImageFormat::Jpeg, ColorType::L8) => Some("DeviceGray"),
        (ImageFormat::Jpeg, ColorType::Rgb8) => Some("DeviceRGB"),
        _ => None,
    };

    let stream = match passthrough {
        Some(color_space) => {
            dict.set("ColorSpace", Object::Name(color_space.as_bytes().to_vec()));
            dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
            let mut stream = Stream::new(dict, bytes.to_vec());
            stream.allows_compression = false;
            stream
        }
        None => {
            let rgb = flatten_onto_white(&decoded);
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(rgb.as_raw())
                .map_err(|e| PdfDeskError::EncodeError(e.to_string()))?;
            let compressed = encoder
                .finish()
                .map_err(|e| PdfDeskError::EncodeError(e.to_string()))?;
            dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
            dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
            let mut stream = Stream::new(dict, compressed);
            stream.allows_compression = false;
            stream
        }
    };

    Ok((stream, width, height))
}

/// Drop the alpha channel by compositing onto a white background.
pub(crate) fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| -> u8 {
            let (c, a) = (c as u32, a as u32);
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Convert a 0.0-1.0 quality factor to the encoder's 1-100 scale.
pub(crate) fn jpeg_quality(quality: f32) -> u8 {
    ((quality.clamp(0.0, 1.0) * 100.0).round() as u8).max(1)
}

/// Encode a rendered page as JPEG.
pub fn encode_jpeg(image: &RgbaImage, quality: f32) -> Result<Vec<u8>, PdfDeskError> {
    let rgb = flatten_onto_white(&DynamicImage::ImageRgba8(image.clone()));
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality)))
        .map_err(|e| PdfDeskError::EncodeError(e.to_string()))?;
    Ok(out)
}

/// Encode a rendered page as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PdfDeskError> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(image.clone())
        .write_with_encoder(PngEncoder::new(&mut out))
        .map_err(|e| PdfDeskError::EncodeError(e.to_string()))?;
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::test_images::sample_rgba;
    use super::*;
    use image::Rgba;

    fn page_sizes(pdf: &[u8]) -> Vec<(f32, f32)> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|id| {
                let [_, _, w, h] = crate::page::media_box(&doc, *id);
                (w, h)
            })
            .collect()
    }

    #[test]
    fn test_jpeg_is_embedded_without_reencoding() {
        let jpeg = encode_jpeg(&sample_rgba(40, 30), 0.9).unwrap();
        let pdf = images_to_pdf(&[&jpeg]).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let embedded = doc.objects.values().any(|obj| match obj {
            Object::Stream(stream) => stream.content == jpeg,
            _ => false,
        });
        assert!(embedded);
        assert_eq!(page_sizes(&pdf), vec![(40.0, 30.0)]);
    }

    #[test]
    fn test_png_becomes_flate_image() {
        let png = encode_png(&sample_rgba(10, 20)).unwrap();
        let jpeg = encode_jpeg(&sample_rgba(8, 8), 0.5).unwrap();
        let pdf = images_to_pdf(&[&png, &jpeg]).unwrap();
        assert_eq!(page_sizes(&pdf), vec![(10.0, 20.0), (8.0, 8.0)]);
    }

    #[test]
    fn test_images_to_pdf_rejects_non_image() {
        let err = images_to_pdf(&[b"not an image at all"]).unwrap_err();
        assert!(err.is_unreadable_input());
    }

    #[test]
    fn test_images_to_pdf_rejects_empty_list() {
        assert!(images_to_pdf(&[]).is_err());
    }

    #[test]
    fn test_transparent_pixels_become_white() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(image));
        assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn test_quality_scale() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(3.0), 100);
    }
}
