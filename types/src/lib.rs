//! Core domain types for ChessPilot.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod board;
mod castling;
mod layout;

pub use board::{BoardReading, FenError, Piece, PieceKind, Placement};
pub use castling::{CastlingRights, Wing};
pub use layout::{BoardLayout, BoardRect, Coordinate, DetectionBox};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a textual token cannot be parsed into a domain type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid color: {0:?}")]
    Color(String),
    #[error("invalid square: {0:?}")]
    Square(String),
    #[error("invalid move: {0:?}")]
    Move(String),
    #[error("invalid execution style: {0:?}")]
    Style(String),
    #[error("invalid castling rights: {0:?} (expected '-' or letters from KQkq)")]
    Castling(String),
}

// ============================================================================
// Colors
// ============================================================================

/// A side of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// FEN active-color token (`w` / `b`).
    #[must_use]
    pub const fn token(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// Parse a FEN active-color token. Anything but `w` or `b` is rejected.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "w" => Some(Color::White),
            "b" => Some(Color::Black),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }

    /// Stable index for per-color arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "w" | "white" => Ok(Color::White),
            "b" | "black" => Ok(Color::Black),
            _ => Err(ParseError::Color(s.to_string())),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.token().to_string()
    }
}

// ============================================================================
// Squares & Moves
// ============================================================================

/// A board square. `file` 0 is the a-file, `rank` 0 is the first rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    #[must_use]
    pub const fn new(file: u8, rank: u8) -> Option<Self> {
        if file < 8 && rank < 8 {
            Some(Self { file, rank })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn file(self) -> u8 {
        self.file
    }

    #[must_use]
    pub const fn rank(self) -> u8 {
        self.rank
    }

    /// Index into a rank-major 64-entry board (a1 = 0, h8 = 63).
    #[must_use]
    pub const fn index(self) -> usize {
        self.rank as usize * 8 + self.file as usize
    }

    /// All 64 squares, a1 first.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8u8).flat_map(|rank| (0..8u8).map(move |file| Square { file, rank }))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            char::from(b'a' + self.file),
            char::from(b'1' + self.rank)
        )
    }
}

impl FromStr for Square {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseError::Square(s.to_string()));
        }
        let file = bytes[0].to_ascii_lowercase().wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        Square::new(file, rank).ok_or_else(|| ParseError::Square(s.to_string()))
    }
}

/// A move in UCI long algebraic notation (`e2e4`, `e7e8q`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UciMove {
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
}

impl UciMove {
    #[must_use]
    pub const fn new(from: Square, to: Square, promotion: Option<PieceKind>) -> Self {
        Self {
            from,
            to,
            promotion,
        }
    }

    #[must_use]
    pub const fn from(self) -> Square {
        self.from
    }

    #[must_use]
    pub const fn to(self) -> Square {
        self.to
    }

    #[must_use]
    pub const fn promotion(self) -> Option<PieceKind> {
        self.promotion
    }
}

impl fmt::Display for UciMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.to_char())?;
        }
        Ok(())
    }
}

impl FromStr for UciMove {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || ParseError::Move(s.to_string());
        if !s.is_ascii() || !(s.len() == 4 || s.len() == 5) {
            return Err(invalid());
        }
        let from: Square = s[0..2].parse().map_err(|_| invalid())?;
        let to: Square = s[2..4].parse().map_err(|_| invalid())?;
        let promotion = match s[4..].chars().next() {
            None => None,
            Some(c) => match PieceKind::from_char(c) {
                Some(kind @ (PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop | PieceKind::Knight)) => {
                    Some(kind)
                }
                _ => return Err(invalid()),
            },
        };
        if from == to {
            return Err(invalid());
        }
        Ok(Self::new(from, to, promotion))
    }
}

// ============================================================================
// Execution style
// ============================================================================

/// How the actuator performs a move on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStyle {
    /// Press on the origin square, move, release on the destination.
    #[default]
    Drag,
    /// Click the origin square, then click the destination.
    Click,
}

impl ExecutionStyle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ExecutionStyle::Drag => "drag",
            ExecutionStyle::Click => "click",
        }
    }
}

impl FromStr for ExecutionStyle {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drag" => Ok(ExecutionStyle::Drag),
            "click" => Ok(ExecutionStyle::Click),
            _ => Err(ParseError::Style(s.to_string())),
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

/// A captured frame, referenced by a handle. The pixels stay with the
/// capture backend; the core only hands the handle on to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    id: u64,
    width: u32,
    height: u32,
}

impl Frame {
    #[must_use]
    pub fn handle(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
}
