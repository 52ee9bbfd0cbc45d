use std::collections::BTreeMap;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::components::colors::Rgb;
use crate::components::history::History;
use crate::components::tools::flood_region;
use crate::error::BoardError;
use crate::{CANVAS_SIZE, GRID_PITCH};

// ============================================================================
// CELL
// ============================================================================

/// A committed grid coordinate in logical canvas units (multiples of the
/// grid pitch).  Ordered row-major so serialized grids are stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Wire key, `"x,y"`.
    pub fn key(&self) -> String {
        format!("{},{}", self.x, self.y)
    }

    /// Parse a `"x,y"` key.  Whitespace around each number is tolerated.
    pub fn from_key(key: &str) -> Option<Self> {
        let (x, y) = key.split_once(',')?;
        Some(Self::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Addressable area of a board: logical size plus pitch.  Width and height
/// are always non-zero multiples of a non-zero pitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    width: u32,
    height: u32,
    pitch: u32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            width: CANVAS_SIZE,
            height: CANVAS_SIZE,
            pitch: GRID_PITCH,
        }
    }
}

impl GridBounds {
    pub fn new(width: u32, height: u32, pitch: u32) -> crate::error::Result<Self> {
        if pitch == 0 {
            return Err(BoardError::InvalidInput("Grid pitch must be non-zero".to_string()));
        }
        if width == 0 || height == 0 || width % pitch != 0 || height % pitch != 0 {
            return Err(BoardError::InvalidInput(format!(
                "Board size {}x{} is not a non-zero multiple of pitch {}",
                width, height, pitch
            )));
        }
        Ok(Self {
            width,
            height,
            pitch,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> u32 {
        self.pitch
    }

    pub fn columns(&self) -> u32 {
        self.width / self.pitch
    }

    pub fn rows(&self) -> u32 {
        self.height / self.pitch
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width
            && cell.y < self.height
            && cell.x % self.pitch == 0
            && cell.y % self.pitch == 0
    }

    /// Validate a (possibly negative) pointer-derived coordinate.
    pub fn cell_at(&self, x: i32, y: i32) -> Option<Cell> {
        let cell = Cell::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        self.contains(cell).then_some(cell)
    }
}

// ============================================================================
// PIXEL GRID - sparse cell -> color map
// ============================================================================

/// Sparse board contents.  A missing cell is transparent and renders as the
/// background color.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelGrid {
    cells: BTreeMap<Cell, Rgb>,
}

impl PixelGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: Cell) -> Option<Rgb> {
        self.cells.get(&cell).copied()
    }

    pub fn set(&mut self, cell: Cell, color: Rgb) -> Option<Rgb> {
        self.cells.insert(cell, color)
    }

    pub fn remove(&mut self, cell: Cell) -> Option<Rgb> {
        self.cells.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, Rgb)> + '_ {
        self.cells.iter().map(|(c, rgb)| (*c, *rgb))
    }
}

impl FromIterator<(Cell, Rgb)> for PixelGrid {
    fn from_iter<I: IntoIterator<Item = (Cell, Rgb)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

impl Serialize for PixelGrid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (cell, color) in &self.cells {
            map.serialize_entry(&cell.key(), color)?;
        }
        map.end()
    }
}

/// Strict decoding: any bad key or color fails the whole grid.  The lenient
/// path for data off the wire lives in [`crate::io::decode_pixel_data`].
impl<'de> Deserialize<'de> for PixelGrid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GridVisitor;

        impl<'de> Visitor<'de> for GridVisitor {
            type Value = PixelGrid;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a map of \"x,y\" keys to \"#rrggbb\" colors")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PixelGrid, A::Error> {
                let mut grid = PixelGrid::new();
                while let Some((key, color)) = access.next_entry::<String, Rgb>()? {
                    let cell = Cell::from_key(&key).ok_or_else(|| {
                        serde::de::Error::custom(format!("bad cell key '{}'", key))
                    })?;
                    grid.set(cell, color);
                }
                Ok(grid)
            }
        }

        deserializer.deserialize_map(GridVisitor)
    }
}

// ============================================================================
// PIXEL GRID STORE - mutators + undo/redo
// ============================================================================

/// The editing session's data model: the live grid plus its history.
///
/// Mutations made between [`begin_stroke`](Self::begin_stroke) and
/// [`commit_stroke`](Self::commit_stroke) are recorded as one history entry,
/// and only if the grid actually changed.  Mutations made outside a stroke
/// are recorded immediately, one entry each.
#[derive(Clone, Debug)]
pub struct PixelGridStore {
    grid: PixelGrid,
    history: History,
    bounds: GridBounds,
    /// Grid as it was when the current stroke began.
    stroke_start: Option<PixelGrid>,
    /// Set while undo/redo installs a snapshot so the install itself is
    /// never recorded as a new edit.
    is_replaying_history: bool,
}

impl Default for PixelGridStore {
    fn default() -> Self {
        Self::new(GridBounds::default())
    }
}

impl PixelGridStore {
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            grid: PixelGrid::new(),
            history: History::default(),
            bounds,
            stroke_start: None,
            is_replaying_history: false,
        }
    }

    /// Open an existing design: `grid` becomes snapshot 0.
    pub fn with_grid(bounds: GridBounds, grid: PixelGrid) -> Self {
        let mut store = Self::new(bounds);
        store.load(grid);
        store
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = self.history.with_limit(limit);
        self
    }

    /// Replace contents and history with `grid` as the only snapshot.
    /// Cells outside the bounds are dropped.
    pub fn load(&mut self, grid: PixelGrid) {
        let bounds = self.bounds;
        let grid: PixelGrid = grid.iter().filter(|(c, _)| bounds.contains(*c)).collect();
        self.stroke_start = None;
        self.history.reset(grid.clone());
        self.grid = grid;
    }

    pub fn grid(&self) -> &PixelGrid {
        &self.grid
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    // -- strokes -------------------------------------------------------

    pub fn begin_stroke(&mut self) {
        if self.stroke_start.is_none() {
            self.stroke_start = Some(self.grid.clone());
        }
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke_start.is_some()
    }

    /// End the current stroke.  Returns `true` when a snapshot was recorded.
    pub fn commit_stroke(&mut self) -> bool {
        match self.stroke_start.take() {
            Some(start) if start != self.grid => {
                self.record();
                true
            }
            _ => false,
        }
    }

    /// Abandon the current stroke and restore the grid it started from.
    pub fn cancel_stroke(&mut self) {
        if let Some(start) = self.stroke_start.take() {
            self.grid = start;
        }
    }

    // -- mutators ------------------------------------------------------

    /// Paint one cell.  Returns `false` (and changes nothing) when `(x, y)`
    /// is outside the board or off the pitch.
    pub fn draw(&mut self, x: i32, y: i32, color: Rgb) -> bool {
        let Some(cell) = self.bounds.cell_at(x, y) else {
            return false;
        };
        let changed = self.grid.set(cell, color) != Some(color);
        if changed {
            self.record_unless_stroke();
        }
        true
    }

    /// Clear one cell.  No-op when the cell is already empty or out of range.
    pub fn erase(&mut self, x: i32, y: i32) -> bool {
        let Some(cell) = self.bounds.cell_at(x, y) else {
            return false;
        };
        let removed = self.grid.remove(cell).is_some();
        if removed {
            self.record_unless_stroke();
        }
        removed
    }

    /// 4-way flood fill from `(x, y)` with `color`.
    ///
    /// An empty start cell fills the contiguous empty region; a colored one
    /// fills contiguous cells of exactly that color.  Returns `false` without
    /// touching history when out of range or the start cell already has
    /// `color`.  A fill is always its own history entry, so an open stroke
    /// is committed first.
    pub fn fill(&mut self, x: i32, y: i32, color: Rgb) -> bool {
        let Some(start) = self.bounds.cell_at(x, y) else {
            return false;
        };
        if self.grid.get(start) == Some(color) {
            return false;
        }
        self.commit_stroke();
        for cell in flood_region(&self.grid, start, self.bounds) {
            self.grid.set(cell, color);
        }
        self.record();
        true
    }

    /// Color under `(x, y)`, if any.  Never mutates.
    pub fn pick_color(&self, x: i32, y: i32) -> Option<Rgb> {
        self.bounds.cell_at(x, y).and_then(|c| self.grid.get(c))
    }

    /// Empty the board.  Always recorded, even if it was already empty.
    pub fn clear(&mut self) {
        self.commit_stroke();
        self.grid = PixelGrid::new();
        self.record();
    }

    /// Swap in a whole new grid (e.g. an imported image) as one undoable
    /// edit.  Returns `false` when nothing changed.
    pub fn replace(&mut self, grid: PixelGrid) -> bool {
        let bounds = self.bounds;
        let grid: PixelGrid = grid.iter().filter(|(c, _)| bounds.contains(*c)).collect();
        self.commit_stroke();
        if grid == self.grid {
            return false;
        }
        self.grid = grid;
        self.record();
        true
    }

    // -- history -------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.commit_stroke();
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        self.replay(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.commit_stroke();
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        self.replay(snapshot);
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    fn replay(&mut self, snapshot: PixelGrid) {
        self.is_replaying_history = true;
        self.grid = snapshot;
        self.is_replaying_history = false;
    }

    fn record_unless_stroke(&mut self) {
        if self.stroke_start.is_none() {
            self.record();
        }
    }

    fn record(&mut self) {
        if self.is_replaying_history {
            return;
        }
        self.history.push(self.grid.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const GREEN: Rgb = Rgb::new(0, 255, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    #[test]
    fn cell_keys_round_trip() {
        let cell = Cell::new(16, 504);
        assert_eq!(cell.key(), "16,504");
        assert_eq!(Cell::from_key("16,504"), Some(cell));
        assert_eq!(Cell::from_key(" 16 , 504 "), Some(cell));
        assert_eq!(Cell::from_key("16;504"), None);
        assert_eq!(Cell::from_key("-8,0"), None);
    }

    #[test]
    fn grid_serializes_to_wire_shape() {
        let mut grid = PixelGrid::new();
        grid.set(Cell::new(8, 0), RED);
        grid.set(Cell::new(0, 8), Rgb::new(0xed, 0xf2, 0xc4));
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r##"{"8,0":"#ff0000","0,8":"#edf2c4"}"##);
        let back: PixelGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn strict_decode_rejects_bad_entries() {
        assert!(serde_json::from_str::<PixelGrid>(r##"{"a,b":"#ff0000"}"##).is_err());
        assert!(serde_json::from_str::<PixelGrid>(r#"{"0,0":"nope"}"#).is_err());
    }

    #[test]
    fn out_of_range_mutations_are_rejected() {
        let mut store = PixelGridStore::default();
        assert!(!store.draw(-8, 0, RED));
        assert!(!store.draw(512, 0, RED));
        assert!(!store.draw(3, 0, RED));
        assert!(!store.erase(0, 600));
        assert!(!store.fill(-1, -1, RED));
        assert!(store.grid().is_empty());
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn each_edit_outside_a_stroke_is_one_entry() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        store.draw(8, 0, RED);
        store.erase(0, 0);
        assert_eq!(store.history_len(), 4);
        assert_eq!(store.history_index(), 3);
    }

    #[test]
    fn redrawing_the_same_color_is_not_an_edit() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        assert!(store.draw(0, 0, RED));
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn stroke_is_a_single_history_entry() {
        let mut store = PixelGridStore::default();
        store.begin_stroke();
        for x in (0..64).step_by(8) {
            store.draw(x, 0, RED);
        }
        assert_eq!(store.history_len(), 1);
        assert!(store.commit_stroke());
        assert_eq!(store.history_len(), 2);
        assert_eq!(store.grid().len(), 8);
    }

    #[test]
    fn unchanged_stroke_records_nothing() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        store.begin_stroke();
        store.draw(0, 0, RED);
        store.erase(8, 8);
        assert!(!store.commit_stroke());
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn cancel_stroke_restores_start() {
        let mut store = PixelGridStore::default();
        store.begin_stroke();
        store.draw(0, 0, RED);
        store.cancel_stroke();
        assert!(store.grid().is_empty());
        assert!(!store.is_stroke_active());
        assert_eq!(store.history_len(), 1);
    }

    #[test]
    fn undo_redo_are_inverse() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        let before = store.grid().clone();
        store.fill(8, 8, BLUE);
        let after = store.grid().clone();

        assert!(store.undo());
        assert_eq!(store.grid(), &before);
        assert!(store.redo());
        assert_eq!(store.grid(), &after);
        assert!(!store.redo());
    }

    #[test]
    fn undo_then_edit_truncates_redo() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED); // A
        store.draw(8, 0, GREEN); // B
        store.undo();
        store.draw(16, 0, BLUE); // C
        assert_eq!(store.history_len(), 3);
        assert_eq!(store.history_index(), 2);
        assert!(!store.redo());
        assert_eq!(store.grid().get(Cell::new(8, 0)), None);
        assert_eq!(store.grid().get(Cell::new(16, 0)), Some(BLUE));
    }

    #[test]
    fn undo_at_start_is_noop() {
        let mut store = PixelGridStore::default();
        assert!(!store.undo());
        assert_eq!(store.history_index(), 0);
    }

    #[test]
    fn clear_is_recorded_and_undoable() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        store.clear();
        assert!(store.grid().is_empty());
        assert_eq!(store.history_len(), 3);
        store.undo();
        assert_eq!(store.grid().get(Cell::new(0, 0)), Some(RED));
    }

    #[test]
    fn fill_with_same_color_is_noop() {
        let mut store = PixelGridStore::default();
        store.draw(0, 0, RED);
        assert!(!store.fill(0, 0, RED));
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn fill_is_contained_by_other_colors() {
        let mut store = PixelGridStore::default();
        store.begin_stroke();
        for (x, y) in [(8, 0), (0, 8), (16, 8), (8, 16)] {
            store.draw(x, y, RED);
        }
        store.commit_stroke();
        assert!(store.fill(8, 8, GREEN));
        assert_eq!(store.grid().len(), 5);
        assert_eq!(store.grid().get(Cell::new(8, 8)), Some(GREEN));
    }

    #[test]
    fn fill_inside_a_stroke_is_recorded_separately() {
        let mut store = PixelGridStore::default();
        store.begin_stroke();
        store.draw(0, 0, RED);
        store.fill(8, 8, BLUE);
        assert!(!store.is_stroke_active());
        assert_eq!(store.history_len(), 3);
        store.undo();
        assert_eq!(store.grid().len(), 1);
    }

    #[test]
    fn pick_color_reads_without_mutating() {
        let mut store = PixelGridStore::default();
        store.draw(24, 32, BLUE);
        assert_eq!(store.pick_color(24, 32), Some(BLUE));
        assert_eq!(store.pick_color(0, 0), None);
        assert_eq!(store.pick_color(-8, 0), None);
        assert_eq!(store.history_len(), 2);
    }

    #[test]
    fn load_makes_grid_snapshot_zero() {
        let mut grid = PixelGrid::new();
        grid.set(Cell::new(0, 0), RED);
        grid.set(Cell::new(1000, 0), RED);
        let mut store = PixelGridStore::with_grid(GridBounds::default(), grid);
        assert_eq!(store.grid().len(), 1);
        assert_eq!(store.history_len(), 1);
        store.draw(8, 0, GREEN);
        store.undo();
        assert_eq!(store.grid().get(Cell::new(0, 0)), Some(RED));
        assert!(!store.undo());
    }
}
