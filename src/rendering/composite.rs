//! Compositor: allocate a surface, draw regions of decoded frames, encode

use crate::{Error, OutputFormat, Rect, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Largest surface we agree to allocate, in pixels (about 1 GiB of RGBA)
pub const MAX_SURFACE_PIXELS: u64 = 1 << 28;

/// Drawing backend used for the composite pass and for region crops
pub trait Compositor: Send + Sync {
    type Surface: Send;
    type Image: Send;

    /// Allocate a `width` x `height` surface filled with opaque white
    fn allocate_surface(&self, width: u32, height: u32) -> Result<Self::Surface>;

    /// Decode an encoded frame; failures are `CaptureFailure`s
    fn decode(&self, payload: &[u8]) -> Result<Self::Image>;

    fn image_size(&self, image: &Self::Image) -> (u32, u32);

    /// Copy `src` of `image` onto `surface` with its top-left corner at `(dst_x, dst_y)`
    fn draw_region(
        &self,
        surface: &mut Self::Surface,
        image: &Self::Image,
        src: Rect,
        dst_x: u32,
        dst_y: u32,
    ) -> Result<()>;

    fn encode(&self, surface: &Self::Surface, format: OutputFormat) -> Result<Vec<u8>>;
}

/// `image`-crate backed compositor working on RGBA8 buffers
#[derive(Debug, Clone)]
pub struct RasterCompositor {
    jpeg_quality: u8,
}

impl RasterCompositor {
    pub fn new() -> Self {
        Self { jpeg_quality: 90 }
    }

    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }
}

impl Default for RasterCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor for RasterCompositor {
    type Surface = RgbaImage;
    type Image = DynamicImage;

    fn allocate_surface(&self, width: u32, height: u32) -> Result<RgbaImage> {
        if width == 0 || height == 0 {
            return Err(Error::EncodeFailure(format!(
                "cannot allocate an empty {}x{} surface",
                width, height
            )));
        }
        if u64::from(width) * u64::from(height) > MAX_SURFACE_PIXELS {
            return Err(Error::EncodeFailure(format!(
                "{}x{} surface exceeds the {} pixel limit",
                width, height, MAX_SURFACE_PIXELS
            )));
        }
        Ok(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])))
    }

    fn decode(&self, payload: &[u8]) -> Result<DynamicImage> {
        image::load_from_memory(payload)
            .map_err(|e| Error::CaptureFailure(format!("cannot decode captured frame: {}", e)))
    }

    fn image_size(&self, image: &DynamicImage) -> (u32, u32) {
        (image.width(), image.height())
    }

    fn draw_region(
        &self,
        surface: &mut RgbaImage,
        image: &DynamicImage,
        src: Rect,
        dst_x: u32,
        dst_y: u32,
    ) -> Result<()> {
        if !src.fits_within(image.width(), image.height()) {
            return Err(Error::CaptureFailure(format!(
                "source region {}x{}+{}+{} exceeds the {}x{} frame",
                src.width,
                src.height,
                src.x,
                src.y,
                image.width(),
                image.height()
            )));
        }
        if src.is_empty() {
            return Ok(());
        }
        let region = image.crop_imm(src.x, src.y, src.width, src.height).to_rgba8();
        // replace() clips anything that falls outside the surface
        imageops::replace(surface, &region, i64::from(dst_x), i64::from(dst_y));
        Ok(())
    }

    fn encode(&self, surface: &RgbaImage, format: OutputFormat) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match format {
            OutputFormat::Png => surface
                .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
                .map_err(|e| Error::EncodeFailure(format!("PNG encoding failed: {}", e)))?,
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgba8(surface.clone()).into_rgb8();
                JpegEncoder::new_with_quality(&mut out, self.jpeg_quality)
                    .encode_image(&rgb)
                    .map_err(|e| Error::EncodeFailure(format!("JPEG encoding failed: {}", e)))?
            }
        }
        Ok(out)
    }
}
