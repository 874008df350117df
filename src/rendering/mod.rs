//! Rendering: tile geometry, compositing and region cropping

pub mod composite;
pub mod layout;
pub mod region;

pub use composite::{Compositor, RasterCompositor};
pub use layout::{draw_height, tile_count, tile_offsets};
pub use region::crop_region;
