//! Screen geometry of a detected board.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Color, Square};

/// A point in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Coordinate> for (f64, f64) {
    fn from(value: Coordinate) -> Self {
        (value.x, value.y)
    }
}

/// One detector hit: a piece (or board) bounding box in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub confidence: f32,
    pub class_id: u32,
}

/// The on-screen rectangle covered by the 8x8 grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Detected boxes plus the square-name to screen-coordinate map.
///
/// Immutable once built; the engine publishes layouts as `Arc` snapshots.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardLayout {
    boxes: Vec<DetectionBox>,
    squares: HashMap<Square, Coordinate>,
    jitter_radius: f64,
}

impl BoardLayout {
    #[must_use]
    pub fn new(
        boxes: Vec<DetectionBox>,
        squares: HashMap<Square, Coordinate>,
        jitter_radius: f64,
    ) -> Self {
        Self {
            boxes,
            squares,
            jitter_radius,
        }
    }

    /// Derive square midpoints from the board rectangle.
    ///
    /// With White at the bottom a8 is the top-left square; with Black at the
    /// bottom h1 is. The jitter radius is a quarter of the smaller square side.
    #[must_use]
    pub fn from_board_rect(rect: BoardRect, bottom: Color, boxes: Vec<DetectionBox>) -> Self {
        let square_w = rect.width / 8.0;
        let square_h = rect.height / 8.0;
        let mut squares = HashMap::with_capacity(64);

        for row in 0..8u8 {
            for col in 0..8u8 {
                let (file, rank) = match bottom {
                    Color::White => (col, 7 - row),
                    Color::Black => (7 - col, row),
                };
                let Some(square) = Square::new(file, rank) else {
                    continue;
                };
                let mid = Coordinate::new(
                    rect.x + f64::from(col) * square_w + square_w / 2.0,
                    rect.y + f64::from(row) * square_h + square_h / 2.0,
                );
                squares.insert(square, mid);
            }
        }

        Self {
            boxes,
            squares,
            jitter_radius: square_w.min(square_h) / 4.0,
        }
    }

    #[must_use]
    pub fn boxes(&self) -> &[DetectionBox] {
        &self.boxes
    }

    #[must_use]
    pub fn midpoint(&self, square: Square) -> Option<Coordinate> {
        self.squares.get(&square).copied()
    }

    #[must_use]
    pub fn square_count(&self) -> usize {
        self.squares.len()
    }

    /// Maximum random offset, in pixels, an actuator may add around a midpoint.
    #[must_use]
    pub fn jitter_radius(&self) -> f64 {
        self.jitter_radius
    }
}
