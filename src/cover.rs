//! Cover thumbnail transcoding

use std::io::Cursor;

use anyhow::Context as _;
use image::{RgbImage, imageops::FilterType};
use reqwest::Url;

use crate::{error::ResolveError, source::Catalog};

/// Thumbnail width and height in pixels
pub(crate) const THUMBNAIL_SIZE: u32 = 128;

/// Size in bytes of a RGB565 thumbnail
pub(crate) const RGB565_LEN: usize = (THUMBNAIL_SIZE * THUMBNAIL_SIZE * 2) as usize;

/// Thumbnail encoding
#[derive(Debug, Copy, Clone, Eq, PartialEq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Encoding {
    /// Windows bitmap, 24-bit RGB
    Bmp,
    /// Raw big-endian RGB565 pixels, row-major, no header
    Rgb565,
}

impl Encoding {
    /// MIME type of encoded data
    pub(crate) fn content_type(self) -> &'static str {
        match self {
            Encoding::Bmp => "image/bmp",
            Encoding::Rgb565 => "application/octet-stream",
        }
    }

    /// Encode thumbnail
    pub(crate) fn encode(self, img: &RgbImage) -> anyhow::Result<Vec<u8>> {
        match self {
            Encoding::Bmp => encode_bmp(img),
            Encoding::Rgb565 => Ok(encode_rgb565(img)),
        }
    }
}

/// Decode undecoded image buffer and resize it to a square thumbnail
pub(crate) fn thumbnail(buf: &[u8]) -> anyhow::Result<RgbImage> {
    let img = image::load_from_memory(buf).context("Failed to decode cover")?;
    log::debug!(
        "Resizing {}x{} cover to {THUMBNAIL_SIZE}x{THUMBNAIL_SIZE}",
        img.width(),
        img.height()
    );
    Ok(img
        .resize_exact(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3)
        .to_rgb8())
}

/// Encode image as a BMP file
fn encode_bmp(img: &RgbImage) -> anyhow::Result<Vec<u8>> {
    let mut writer = Cursor::new(Vec::new());
    img.write_to(&mut writer, image::ImageFormat::Bmp)
        .context("Failed to encode BMP")?;
    Ok(writer.into_inner())
}

/// Pack a RGB888 pixel into RGB565, truncating low bits
pub(crate) fn rgb565([r, g, b]: [u8; 3]) -> u16 {
    ((u16::from(r) & 0xF8) << 8) | ((u16::from(g) & 0xFC) << 3) | (u16::from(b) >> 3)
}

/// Encode image as big-endian RGB565 pixels, top row first
fn encode_rgb565(img: &RgbImage) -> Vec<u8> {
    let mut data = Vec::with_capacity(RGB565_LEN);
    data.extend(img.pixels().flat_map(|p| rgb565(p.0).to_be_bytes()));
    data
}

/// Fetch cover and encode it as a thumbnail
pub(crate) async fn render(
    catalog: &dyn Catalog,
    cover_url: &str,
    encoding: Encoding,
) -> Result<Vec<u8>, ResolveError> {
    let url: Url = cover_url
        .parse()
        .with_context(|| format!("Invalid cover URL {cover_url:?}"))
        .map_err(ResolveError::Transcode)?;
    let buf = catalog.fetch_image(&url).await?;

    let data = tokio::task::spawn_blocking(move || encoding.encode(&thumbnail(&buf)?))
        .await
        .context("Transcoding task failed")
        .map_err(ResolveError::Transcode)?
        .map_err(ResolveError::Transcode)?;
    log::debug!("Rendered {url} as {encoding} ({} bytes)", data.len());
    Ok(data)
}
