//! Region cropping of a single captured frame

use super::composite::Compositor;
use crate::{Error, OutputFormat, Rect, Result};

/// Cut `rect` out of an encoded frame and re-encode it
///
/// The rectangle is in frame pixels and must lie entirely inside the frame.
pub fn crop_region<C: Compositor>(
    compositor: &C,
    frame: &[u8],
    rect: Rect,
    format: OutputFormat,
) -> Result<Vec<u8>> {
    if rect.is_empty() {
        return Err(Error::InvalidSelection(format!(
            "selection {}x{} has zero width or height",
            rect.width, rect.height
        )));
    }

    let image = compositor.decode(frame)?;
    let (width, height) = compositor.image_size(&image);
    if !rect.fits_within(width, height) {
        return Err(Error::InvalidSelection(format!(
            "selection ({},{},{},{}) exceeds the {}x{} frame",
            rect.x, rect.y, rect.width, rect.height, width, height
        )));
    }

    let mut surface = compositor.allocate_surface(rect.width, rect.height)?;
    compositor.draw_region(&mut surface, &image, rect, 0, 0)?;
    compositor.encode(&surface, format)
}
