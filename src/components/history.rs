use crate::canvas::PixelGrid;

// ============================================================================
// HISTORY - linear snapshot history with branch truncation
// ============================================================================

/// Ordered pixel-grid snapshots plus a cursor.
///
/// Invariants: there is always at least one snapshot, `index < len`, and
/// snapshot 0 is the grid the session opened with.  Pushing while the cursor
/// is behind the tip drops everything after the cursor first.
#[derive(Clone, Debug)]
pub struct History {
    snapshots: Vec<PixelGrid>,
    index: usize,
    /// Maximum number of snapshots kept, including snapshot 0.
    /// `None` keeps everything.
    max_len: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(PixelGrid::new())
    }
}

impl History {
    pub fn new(initial: PixelGrid) -> Self {
        Self {
            snapshots: vec![initial],
            index: 0,
            max_len: None,
        }
    }

    /// Limit the number of stored snapshots.  Values below 2 (or 0) mean
    /// unlimited, since snapshot 0 is never pruned.
    pub fn with_limit(mut self, max_len: usize) -> Self {
        self.max_len = (max_len >= 2).then_some(max_len);
        self.prune();
        self
    }

    /// Drop all snapshots and start over from `initial`.
    pub fn reset(&mut self, initial: PixelGrid) {
        self.snapshots.clear();
        self.snapshots.push(initial);
        self.index = 0;
    }

    /// Append a snapshot after the cursor, discarding any redo branch.
    pub fn push(&mut self, snapshot: PixelGrid) {
        self.snapshots.truncate(self.index + 1);
        self.snapshots.push(snapshot);
        self.index = self.snapshots.len() - 1;
        self.prune();
    }

    /// Step back one snapshot.  Returns the new current snapshot, or `None`
    /// when already at the start.
    pub fn undo(&mut self) -> Option<&PixelGrid> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.snapshots[self.index])
    }

    /// Step forward one snapshot.  Returns `None` at the tip.
    pub fn redo(&mut self) -> Option<&PixelGrid> {
        if self.index + 1 >= self.snapshots.len() {
            return None;
        }
        self.index += 1;
        Some(&self.snapshots[self.index])
    }

    pub fn current(&self) -> &PixelGrid {
        &self.snapshots[self.index]
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of cells stored across all snapshots (rough memory gauge).
    pub fn stored_cells(&self) -> usize {
        self.snapshots.iter().map(PixelGrid::len).sum()
    }

    /// Remove the oldest snapshots after snapshot 0 until within the limit.
    fn prune(&mut self) {
        let Some(max_len) = self.max_len else { return };
        while self.snapshots.len() > max_len && self.index > 1 {
            self.snapshots.remove(1);
            self.index -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Cell;
    use crate::components::colors::Rgb;

    fn grid_with(x: u32) -> PixelGrid {
        let mut g = PixelGrid::new();
        g.set(Cell::new(x, 0), Rgb::new(255, 0, 0));
        g
    }

    #[test]
    fn push_advances_cursor() {
        let mut h = History::default();
        h.push(grid_with(0));
        h.push(grid_with(8));
        assert_eq!(h.len(), 3);
        assert_eq!(h.index(), 2);
        assert_eq!(h.current(), &grid_with(8));
    }

    #[test]
    fn undo_stops_at_initial_snapshot() {
        let mut h = History::default();
        h.push(grid_with(0));
        assert!(h.undo().is_some());
        assert!(h.undo().is_none());
        assert_eq!(h.index(), 0);
        assert!(h.current().is_empty());
    }

    #[test]
    fn push_after_undo_truncates_redo_branch() {
        let mut h = History::default();
        h.push(grid_with(0));
        h.push(grid_with(8));
        h.undo();
        h.push(grid_with(16));
        assert_eq!(h.len(), 3);
        assert_eq!(h.index(), 2);
        assert!(!h.can_redo());
        assert!(h.redo().is_none());
        assert_eq!(h.current(), &grid_with(16));
    }

    #[test]
    fn limit_keeps_initial_snapshot() {
        let mut h = History::default().with_limit(3);
        for x in 0..5 {
            h.push(grid_with(x * 8));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.index(), 2);
        assert_eq!(h.current(), &grid_with(32));
        h.undo();
        h.undo();
        assert!(h.current().is_empty());
    }
}
