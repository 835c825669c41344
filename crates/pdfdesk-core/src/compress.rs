//! PDF size reduction
//!
//! Re-encodes embedded 8-bit RGB and grayscale images as JPEG at the
//! requested quality, then prunes unreachable objects and Flate-compresses
//! the remaining streams.

use crate::error::PdfDeskError;
use crate::images::jpeg_quality;
use crate::page;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info};

/// What [`recompress`] did to the document's images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompressionReport {
    pub images_seen: usize,
    pub images_reencoded: usize,
}

/// Shrink a PDF. `quality` runs from 0.0 (smallest) to 1.0 (best).
///
/// An image is only replaced when the re-encoded stream is smaller than the
/// one it replaces.
pub fn recompress(bytes: &[u8], quality: f32) -> Result<(Vec<u8>, CompressionReport), PdfDeskError> {
    let mut doc = page::load(bytes)?;
    let quality = jpeg_quality(quality);
    let mut report = CompressionReport::default();

    let mut replacements: Vec<(ObjectId, Vec<u8>)> = Vec::new();
    for (&id, object) in doc.objects.iter() {
        let Object::Stream(stream) = object else {
            continue;
        };
        if !is_image(&stream.dict) {
            continue;
        }
        report.images_seen += 1;

        let Some(decoded) = decode_image(stream) else {
            debug!(?id, "Skipping image with unsupported encoding");
            continue;
        };
        let mut encoded = Vec::new();
        if let Err(e) = decoded.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality)) {
            debug!(?id, error = %e, "JPEG encoding failed");
            continue;
        }
        if encoded.len() < stream.content.len() {
            replacements.push((id, encoded));
        }
    }

    for (id, encoded) in replacements {
        if let Ok(Object::Stream(stream)) = doc.get_object_mut(id) {
            stream.dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
            stream.dict.remove(b"DecodeParms");
            stream.set_content(encoded);
            stream.allows_compression = false;
            report.images_reencoded += 1;
        }
    }

    doc.prune_objects();
    doc.compress();
    let output = page::save(&mut doc)?;

    info!(
        before = bytes.len(),
        after = output.len(),
        images_seen = report.images_seen,
        images_reencoded = report.images_reencoded,
        "Compressed document"
    );
    Ok((output, report))
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Channel count for the colour spaces this module re-encodes.
fn channels(dict: &Dictionary) -> Option<u32> {
    match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) if name == b"DeviceRGB" => Some(3),
        Ok(Object::Name(name)) if name == b"DeviceGray" => Some(1),
        _ => None,
    }
}

fn decode_image(stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;
    if dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok()? != 8 {
        return None;
    }
    if dict.has(b"SMask") || dict.has(b"Mask") || dict.has(b"Decode") {
        return None;
    }
    let channels = channels(dict)?;
    let width = u32::try_from(dict.get(b"Width").and_then(Object::as_i64).ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").and_then(Object::as_i64).ok()?).ok()?;

    let filters = filter_names(dict);
    let samples = match filters.as_slice() {
        [f] if f == b"DCTDecode" => {
            let image = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok()?;
            return (image.width() == width && image.height() == height).then_some(image);
        }
        [] => stream.content.clone(),
        [f] if f == b"FlateDecode" && !dict.has(b"DecodeParms") => stream.decompressed_content().ok()?,
        _ => return None,
    };

    match channels {
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        _ => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
    }
}
