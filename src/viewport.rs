use crate::canvas::GridBounds;

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f32 = 0.25;
/// Largest allowed zoom factor.
pub const MAX_SCALE: f32 = 10.0;
/// Per-notch factor for cursor-anchored wheel zoom.
pub const WHEEL_ZOOM_FACTOR: f32 = 1.1;
/// Factor for the zoom in / zoom out buttons and shortcuts.
pub const STEP_ZOOM_FACTOR: f32 = 1.2;
/// Arrow-key pan distance at scale 1; divided by the current scale.
pub const KEY_PAN_DISTANCE: f32 = 20.0;

/// Screen-space position in surface pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

/// Zoom and pan state for one editing session.  Never persisted.
///
/// A surface point `p` maps to logical canvas coordinates as
/// `(p - offset) / scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub offset: Point,
    /// Pointer minus offset at the start of a pan drag.
    drag_start: Option<Point>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::ZERO,
            drag_start: None,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a surface position to the pitch-aligned grid coordinate under it.
    /// The result may lie outside the board; callers validate against
    /// [`GridBounds`].
    pub fn pointer_to_grid(&self, pointer: Point, pitch: u32) -> (i32, i32) {
        let pitch_f = pitch as f32;
        let step = pitch.clamp(1, i32::MAX as u32) as i32;
        let snap = |p: f32, off: f32| {
            let cell = ((p - off) / self.scale / pitch_f).floor();
            // saturating cast, then clamp so the product stays a multiple of pitch
            (cell as i32).clamp(i32::MIN / step, i32::MAX / step) * step
        };
        (snap(pointer.x, self.offset.x), snap(pointer.y, self.offset.y))
    }

    /// Like [`pointer_to_grid`](Self::pointer_to_grid) but `None` when the
    /// pointer is off the board.
    pub fn pointer_to_cell(&self, pointer: Point, bounds: GridBounds) -> Option<crate::Cell> {
        let (x, y) = self.pointer_to_grid(pointer, bounds.pitch());
        bounds.cell_at(x, y)
    }

    /// Wheel zoom anchored at `pointer`: a positive `delta_y` zooms out, a
    /// negative one zooms in, zero does nothing.
    pub fn zoom_at(&mut self, pointer: Point, delta_y: f32) {
        if delta_y == 0.0 || delta_y.is_nan() {
            return;
        }
        let old = self.scale;
        let new = if delta_y > 0.0 {
            old / WHEEL_ZOOM_FACTOR
        } else {
            old * WHEEL_ZOOM_FACTOR
        }
        .clamp(MIN_SCALE, MAX_SCALE);

        self.offset = Point::new(
            pointer.x - (pointer.x - self.offset.x) / old * new,
            pointer.y - (pointer.y - self.offset.y) / old * new,
        );
        self.scale = new;
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale * STEP_ZOOM_FACTOR).min(MAX_SCALE);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale / STEP_ZOOM_FACTOR).max(MIN_SCALE);
    }

    pub fn reset_zoom(&mut self) {
        self.scale = 1.0;
        self.offset = Point::ZERO;
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// Arrow-key panning; only active while zoomed in past 1×.
    /// Returns whether the offset moved.
    pub fn pan_key(&mut self, key: ArrowKey) -> bool {
        if self.scale <= 1.0 {
            return false;
        }
        let step = KEY_PAN_DISTANCE / self.scale;
        match key {
            ArrowKey::Up => self.pan(0.0, step),
            ArrowKey::Down => self.pan(0.0, -step),
            ArrowKey::Left => self.pan(step, 0.0),
            ArrowKey::Right => self.pan(-step, 0.0),
        }
        true
    }

    // -- drag panning ---------------------------------------------------

    pub fn begin_drag(&mut self, pointer: Point) {
        self.drag_start = Some(Point::new(
            pointer.x - self.offset.x,
            pointer.y - self.offset.y,
        ));
    }

    pub fn drag_to(&mut self, pointer: Point) {
        if let Some(start) = self.drag_start {
            self.offset = Point::new(pointer.x - start.x, pointer.y - start.y);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_start = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_in_converges_to_max() {
        let mut vp = Viewport::new();
        for _ in 0..100 {
            vp.zoom_in();
            assert!(vp.scale <= MAX_SCALE);
        }
        assert_eq!(vp.scale, MAX_SCALE);
    }

    #[test]
    fn zoom_out_converges_to_min() {
        let mut vp = Viewport::new();
        for _ in 0..100 {
            vp.zoom_out();
            assert!(vp.scale >= MIN_SCALE);
        }
        assert_eq!(vp.scale, MIN_SCALE);
    }

    #[test]
    fn wheel_zoom_keeps_point_under_cursor() {
        let mut vp = Viewport::new();
        vp.pan(13.0, -7.0);
        let cursor = Point::new(200.0, 150.0);
        let before = ((cursor.x - vp.offset.x) / vp.scale, (cursor.y - vp.offset.y) / vp.scale);
        vp.zoom_at(cursor, -120.0);
        let after = ((cursor.x - vp.offset.x) / vp.scale, (cursor.y - vp.offset.y) / vp.scale);
        assert!((vp.scale - 1.1).abs() < 1e-6);
        assert!((before.0 - after.0).abs() < 1e-3);
        assert!((before.1 - after.1).abs() < 1e-3);
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut vp = Viewport::new();
        for _ in 0..200 {
            vp.zoom_at(Point::new(10.0, 10.0), 1.0);
        }
        assert_eq!(vp.scale, MIN_SCALE);
        vp.zoom_at(Point::new(10.0, 10.0), 0.0);
        assert_eq!(vp.scale, MIN_SCALE);
    }

    #[test]
    fn pointer_to_grid_is_pitch_aligned() {
        let mut vp = Viewport::new();
        let samples = [-513.7f32, -8.0, -0.01, 0.0, 3.3, 7.99, 8.0, 255.5, 1023.9];
        for scale in [0.25f32, 0.7, 1.0, 1.3, 4.0, 10.0] {
            vp.scale = scale;
            vp.offset = Point::new(17.3, -4.9);
            for &x in &samples {
                for &y in &samples {
                    let (gx, gy) = vp.pointer_to_grid(Point::new(x, y), 8);
                    assert_eq!(gx.rem_euclid(8), 0);
                    assert_eq!(gy.rem_euclid(8), 0);
                }
            }
        }

        vp.scale = 1.0;
        vp.offset = Point::ZERO;
        for p in [1.0e30f32, -1.0e30, f32::MAX, f32::MIN, f32::INFINITY, f32::NAN] {
            let (gx, gy) = vp.pointer_to_grid(Point::new(p, 5.0), 8);
            assert_eq!(gx.rem_euclid(8), 0);
            assert_eq!(gy, 0);
        }
    }

    #[test]
    fn pointer_to_grid_floors() {
        let mut vp = Viewport::new();
        assert_eq!(vp.pointer_to_grid(Point::new(15.9, 8.0), 8), (8, 8));
        assert_eq!(vp.pointer_to_grid(Point::new(-0.5, 0.0), 8), (-8, 0));
        vp.scale = 2.0;
        vp.offset = Point::new(100.0, 0.0);
        assert_eq!(vp.pointer_to_grid(Point::new(132.0, 40.0), 8), (16, 16));
        assert_eq!(vp.pointer_to_cell(Point::new(50.0, 0.0), GridBounds::default()), None);
    }

    #[test]
    fn arrow_keys_pan_only_when_zoomed_in() {
        let mut vp = Viewport::new();
        assert!(!vp.pan_key(ArrowKey::Up));
        assert_eq!(vp.offset, Point::ZERO);

        vp.scale = 2.0;
        assert!(vp.pan_key(ArrowKey::Up));
        assert!(vp.pan_key(ArrowKey::Right));
        assert_eq!(vp.offset, Point::new(-10.0, 10.0));
    }

    #[test]
    fn drag_moves_offset_with_pointer() {
        let mut vp = Viewport::new();
        vp.pan(5.0, 5.0);
        vp.begin_drag(Point::new(100.0, 100.0));
        vp.drag_to(Point::new(130.0, 90.0));
        assert_eq!(vp.offset, Point::new(35.0, -5.0));
        vp.end_drag();
        vp.drag_to(Point::new(0.0, 0.0));
        assert_eq!(vp.offset, Point::new(35.0, -5.0));
    }

    #[test]
    fn reset_restores_identity() {
        let mut vp = Viewport::new();
        vp.zoom_at(Point::new(40.0, 40.0), -1.0);
        vp.pan(3.0, 4.0);
        vp.reset_zoom();
        assert_eq!(vp, Viewport::new());
    }
}
