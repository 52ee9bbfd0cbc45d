//! PixelBoard editing core: a sparse 64×64 pixel grid with undo history,
//! a zoom/pan viewport, image-to-grid conversion and grid-to-raster
//! rendering for a scheduled pixel-art display board.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod ops;
pub mod project;
pub mod session;
pub mod viewport;

pub use crate::canvas::{Cell, PixelGrid, PixelGridStore};
pub use crate::components::colors::{ColorState, Hsv, Rgb};
pub use crate::components::tools::Tool;
pub use crate::config::BoardSettings;
pub use crate::error::{BoardError, Result};
pub use crate::ops::convert::{Conversion, ConversionQueue, ConvertOptions};
pub use crate::ops::render::RenderOptions;
pub use crate::session::EditingSession;
pub use crate::viewport::Viewport;

/// Logical spacing between addressable cells on the drawing canvas.
pub const GRID_PITCH: u32 = 8;

/// Number of cells along each axis of the board.
pub const GRID_CELLS: u32 = 64;

/// Logical canvas edge length (`GRID_CELLS * GRID_PITCH`).
pub const CANVAS_SIZE: u32 = GRID_CELLS * GRID_PITCH;

/// Background used for previews and thumbnails when none is configured.
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0, 0, 0);

/// Drawing color a fresh session starts with.
pub const DEFAULT_DRAW_COLOR: Rgb = Rgb::new(0xed, 0xf2, 0xc4);
