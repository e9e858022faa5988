//! Frame compositor for the block pyramid overlay.
//!
//! Rendering is a fixed draw order on an `image::RgbImage`: translucent
//! faces (filled on a scratch copy, then alpha-blended), opaque edges, then a
//! camera position readout in a built-in bitmap font. There is no depth
//! buffer; later blocks and later faces paint over earlier ones.

mod compositor;
mod error;
mod font;
mod raster;
mod style;

pub use compositor::{draw_camera_position, format_camera_position, render, Compositor};
pub use error::RenderError;
pub use font::{draw_text, text_size};
pub use raster::{blend_into, draw_line, fill_polygon};
pub use style::RenderStyle;
