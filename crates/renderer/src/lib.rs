//! Raster drawing for animated map frames.
//!
//! Provides:
//! - Colour schemes and palettes for gridded fields
//! - Colour-scale legends (bars, tick labels, titles)
//! - Direction/magnitude arrow fields
//! - Vector overlays (CSV points, GeoJSON)
//! - A frame canvas with text, clipping and image encoding

pub mod arrows;
pub mod canvas;
pub mod color;
pub mod colour_scale;
pub mod encode;
pub mod error;
pub mod legend;
pub mod palette;
pub mod raster;
pub mod shapes;
pub mod text;

pub use arrows::{ArrowFieldRenderer, ArrowStyle, MagnitudeDomain};
pub use canvas::{FrameCanvas, TextAlign};
pub use color::Color;
pub use colour_scale::ColourScheme;
pub use error::{RenderError, RenderResult};
pub use legend::{LegendContent, LegendRenderer};
pub use palette::Palette;
pub use raster::{FieldGrid, TrueColourComposite};
pub use text::{TextStyle, Typeface};
