use crate::canvas::{Cell, GridBounds, PixelGrid};

/// Active editing tool.  Exactly one is selected per session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Fill,
    Eyedropper,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Pencil, Tool::Eraser, Tool::Fill, Tool::Eyedropper]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Pencil => "Pencil",
            Tool::Eraser => "Eraser",
            Tool::Fill => "Fill",
            Tool::Eyedropper => "Eyedropper",
        }
    }

    /// Single-letter keyboard shortcut (case-insensitive).
    pub fn hotkey(&self) -> char {
        match self {
            Tool::Pencil => 'p',
            Tool::Eraser => 'e',
            Tool::Fill => 'f',
            Tool::Eyedropper => 'i',
        }
    }

    pub fn from_hotkey(c: char) -> Option<Tool> {
        let c = c.to_ascii_lowercase();
        Tool::all().iter().copied().find(|t| t.hotkey() == c)
    }

    /// Pencil and eraser paint continuously while the pointer is held;
    /// fill and eyedropper act once on press.
    pub fn is_continuous(&self) -> bool {
        matches!(self, Tool::Pencil | Tool::Eraser)
    }
}

/// Cells reachable from `start` through 4-way neighbours holding exactly the
/// start cell's value (a color, or empty).
///
/// DFS over a Vec stack with a flat visited mask indexed by cell column/row.
/// Every reachable cell is visited once.  Returns nothing when `start` is
/// outside `bounds`.
pub fn flood_region(grid: &PixelGrid, start: Cell, bounds: GridBounds) -> Vec<Cell> {
    if !bounds.contains(start) {
        return Vec::new();
    }
    let pitch = bounds.pitch();
    let cols = bounds.columns() as usize;
    let rows = bounds.rows() as usize;
    let target = grid.get(start);

    // mask doubles as the visited array
    let mut visited = vec![false; cols * rows];
    let index = |c: Cell| (c.y / pitch) as usize * cols + (c.x / pitch) as usize;

    let mut region = Vec::new();
    let mut stack: Vec<Cell> = Vec::with_capacity(256);
    visited[index(start)] = true;
    stack.push(start);

    while let Some(cell) = stack.pop() {
        region.push(cell);

        let mut neighbours = [None; 4];
        if cell.x >= pitch {
            neighbours[0] = Some(Cell::new(cell.x - pitch, cell.y));
        }
        if cell.x + pitch < bounds.width() {
            neighbours[1] = Some(Cell::new(cell.x + pitch, cell.y));
        }
        if cell.y >= pitch {
            neighbours[2] = Some(Cell::new(cell.x, cell.y - pitch));
        }
        if cell.y + pitch < bounds.height() {
            neighbours[3] = Some(Cell::new(cell.x, cell.y + pitch));
        }

        for n in neighbours.into_iter().flatten() {
            let ni = index(n);
            if !visited[ni] && grid.get(n) == target {
                visited[ni] = true;
                stack.push(n);
            }
        }
    }

    region
}
