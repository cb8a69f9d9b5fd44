//! Procedural texture synthesis.
//!
//! Solid fills, two-stop gradients and text labels are rasterized on the CPU
//! into [`Raster`]s. [`TextureGenerator`] caches results by spec hash so specs
//! re-evaluated every frame cost a hash lookup.

mod cache;
mod generator;
mod gradient;
mod raster;
mod text;

pub use cache::TextureCache;
pub use generator::{TextureError, TextureGenerator, TextureSpec};
pub use gradient::{linear_endpoints, rasterize_gradient};
pub use raster::{Raster, RasterError};
pub use text::{
    FontLibrary, FontLoadError, GlyphCoverage, MAX_TEXT_CANVAS, TextShaper, rasterize_text,
    text_canvas_size,
};

#[cfg(test)]
pub(crate) use text::tests::BlockShaper;
