use image::RgbaImage;
use serde_json::Value;

use crate::canvas::{GridBounds, PixelGrid, PixelGridStore};
use crate::components::colors::{ColorState, Rgb};
use crate::components::tools::Tool;
use crate::config::BoardSettings;
use crate::error::Result;
use crate::io::{decode_pixel_data, encode_pixel_data};
use crate::ops::render::{RenderOptions, render};
use crate::viewport::{ArrowKey, Point, Viewport};
use crate::log_info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    /// Applies the active tool.
    Primary,
    /// Pans.
    Secondary,
    /// Pans.
    Middle,
}

/// Keyboard input after the shell has resolved modifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Arrow(ArrowKey),
    Undo,
    Redo,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    /// Plain character; tool hotkeys are looked up from this.
    Char(char),
}

/// One interactive drawing session: grid store, viewport, active tool and
/// drawing color.
#[derive(Clone, Debug)]
pub struct EditingSession {
    store: PixelGridStore,
    viewport: Viewport,
    tool: Tool,
    color: ColorState,
    /// Primary button held with a continuous tool.
    drawing: bool,
}

impl Default for EditingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditingSession {
    pub fn new() -> Self {
        Self {
            store: PixelGridStore::default(),
            viewport: Viewport::default(),
            tool: Tool::default(),
            color: ColorState::default(),
            drawing: false,
        }
    }

    pub fn with_settings(settings: &BoardSettings) -> Self {
        Self {
            store: PixelGridStore::default().with_history_limit(settings.history_limit),
            color: ColorState::new(settings.draw_color),
            ..Self::new()
        }
    }

    /// Open an existing design.  Pixel data may be an object or a JSON
    /// string; unusable data opens an empty board.
    pub fn load_design(&mut self, pixel_data: &Value) {
        self.load_grid(decode_pixel_data(pixel_data));
    }

    /// Start over from `grid` as snapshot 0.
    pub fn load_grid(&mut self, grid: PixelGrid) {
        self.drawing = false;
        self.store.load(grid);
        log_info!("Session loaded {} cells", self.store.grid().len());
    }

    /// Replace the board with an imported grid as one undoable edit.
    pub fn import_grid(&mut self, grid: PixelGrid) -> bool {
        self.drawing = false;
        self.store.replace(grid)
    }

    // -- accessors -----------------------------------------------------

    pub fn grid(&self) -> &PixelGrid {
        self.store.grid()
    }

    pub fn store(&self) -> &PixelGridStore {
        &self.store
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switching tools ends any stroke in progress.
    pub fn set_tool(&mut self, tool: Tool) {
        self.end_stroke();
        self.tool = tool;
    }

    pub fn color(&self) -> &ColorState {
        &self.color
    }

    pub fn color_mut(&mut self) -> &mut ColorState {
        &mut self.color
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Wire form of the current grid.
    pub fn pixel_data(&self) -> Result<String> {
        encode_pixel_data(self.store.grid())
    }

    pub fn render(&self, opts: &RenderOptions) -> RgbaImage {
        render(self.store.grid(), opts)
    }

    // -- tool dispatch -------------------------------------------------

    /// Apply `tool` at grid coordinate `(x, y)`.  Returns whether the grid
    /// or the drawing color changed.
    pub fn apply_tool(&mut self, tool: Tool, x: i32, y: i32) -> bool {
        let color = self.color.rgb();
        match tool {
            Tool::Pencil => {
                let changed = self.store.pick_color(x, y) != Some(color);
                self.store.draw(x, y, color) && changed
            }
            Tool::Eraser => self.store.erase(x, y),
            Tool::Fill => self.store.fill(x, y, color),
            Tool::Eyedropper => match self.store.pick_color(x, y) {
                Some(picked) if picked != color => {
                    self.color.set_rgb(picked);
                    true
                }
                _ => false,
            },
        }
    }

    // -- pointer -------------------------------------------------------

    pub fn pointer_down(&mut self, pos: Point, button: PointerButton) {
        match button {
            PointerButton::Primary => {
                let (x, y) = self.to_grid(pos);
                if self.tool.is_continuous() {
                    self.store.begin_stroke();
                    self.drawing = true;
                }
                self.apply_tool(self.tool, x, y);
            }
            PointerButton::Secondary | PointerButton::Middle => self.viewport.begin_drag(pos),
        }
    }

    pub fn pointer_move(&mut self, pos: Point) {
        if self.viewport.is_dragging() {
            self.viewport.drag_to(pos);
        }
        if self.drawing {
            let (x, y) = self.to_grid(pos);
            self.apply_tool(self.tool, x, y);
        }
    }

    pub fn pointer_up(&mut self, button: PointerButton) {
        match button {
            PointerButton::Primary => self.end_stroke(),
            PointerButton::Secondary | PointerButton::Middle => self.viewport.end_drag(),
        }
    }

    pub fn wheel(&mut self, pos: Point, delta_y: f32) {
        self.viewport.zoom_at(pos, delta_y);
    }

    // -- keyboard ------------------------------------------------------

    /// Returns whether the key was handled.
    pub fn key_down(&mut self, key: Key) -> bool {
        match key {
            Key::Arrow(arrow) => self.viewport.pan_key(arrow),
            Key::Undo => self.undo(),
            Key::Redo => self.redo(),
            Key::ZoomIn => {
                self.viewport.zoom_in();
                true
            }
            Key::ZoomOut => {
                self.viewport.zoom_out();
                true
            }
            Key::ResetZoom => {
                self.viewport.reset_zoom();
                true
            }
            Key::Char(c) => match Tool::from_hotkey(c) {
                Some(tool) => {
                    self.set_tool(tool);
                    true
                }
                None => false,
            },
        }
    }

    // -- history -------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.drawing = false;
        self.store.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.drawing = false;
        self.store.redo()
    }

    pub fn clear(&mut self) {
        self.drawing = false;
        self.store.clear();
    }

    pub fn set_color(&mut self, rgb: Rgb) {
        self.color.set_rgb(rgb);
    }

    fn end_stroke(&mut self) {
        if self.drawing {
            self.drawing = false;
            self.store.commit_stroke();
        }
    }

    fn to_grid(&self, pos: Point) -> (i32, i32) {
        self.viewport.pointer_to_grid(pos, self.bounds().pitch())
    }

    fn bounds(&self) -> GridBounds {
        self.store.bounds()
    }
}
