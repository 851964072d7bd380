//! Encoding finished frames into image files.

use std::io::Cursor;
use std::path::Path;

use frame_common::MapFormat;
use image::{DynamicImage, ImageOutputFormat, RgbaImage};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::error::{RenderError, RenderResult};

const JPEG_QUALITY: u8 = 90;

/// Convert a premultiplied pixmap into a straight-alpha RGBA image.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RenderResult<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for pixel in pixmap.pixels() {
        let colour = pixel.demultiply();
        data.extend_from_slice(&[colour.red(), colour.green(), colour.blue(), colour.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or(
        RenderError::InvalidDimensions {
            width: pixmap.width(),
            height: pixmap.height(),
        },
    )
}

/// Encode a pixmap into the bytes of `format`.
///
/// JPEG has no alpha channel, so transparency is dropped. SVG frames are
/// vector output and cannot be produced from a raster.
pub fn encode(pixmap: &Pixmap, format: MapFormat) -> RenderResult<Vec<u8>> {
    let image = DynamicImage::ImageRgba8(pixmap_to_rgba(pixmap)?);
    let mut buffer = Cursor::new(Vec::new());

    match format {
        MapFormat::Png => image.write_to(&mut buffer, ImageOutputFormat::Png)?,
        MapFormat::Gif => image.write_to(&mut buffer, ImageOutputFormat::Gif)?,
        MapFormat::Jpg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY))?,
        MapFormat::Svg => {
            return Err(RenderError::UnsupportedFormat(format.extension().to_string()))
        }
    }

    Ok(buffer.into_inner())
}

/// Encode a pixmap and write it to `path`, creating parent directories.
pub fn encode_to_file(pixmap: &Pixmap, format: MapFormat, path: &Path) -> RenderResult<()> {
    let bytes = encode(pixmap, format)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    debug!(path = %path.display(), bytes = bytes.len(), "Wrote frame image");
    Ok(())
}
