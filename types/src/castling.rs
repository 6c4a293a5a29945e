//! Castling availability, as carried in the third FEN field.

use std::fmt;
use std::str::FromStr;

use crate::board::{Piece, PieceKind, Placement};
use crate::{Color, ParseError, Square};

/// Which side of the board a castle goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wing {
    King,
    Queen,
}

impl Wing {
    const fn rook_file(self) -> u8 {
        match self {
            Wing::King => 7,
            Wing::Queen => 0,
        }
    }
}

const KING_FILE: u8 = 4;

/// The four castling rights. A right is only ever rendered while the king
/// and that rook still stand on their home squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingRights {
    // Indexed by `Color::index() * 2`, king wing first.
    rights: [bool; 4],
}

impl Default for CastlingRights {
    fn default() -> Self {
        Self::ALL
    }
}

impl CastlingRights {
    pub const NONE: Self = Self { rights: [false; 4] };
    pub const ALL: Self = Self { rights: [true; 4] };

    const fn slot(color: Color, wing: Wing) -> usize {
        let base = color.index() * 2;
        match wing {
            Wing::King => base,
            Wing::Queen => base + 1,
        }
    }

    #[must_use]
    pub const fn has(self, color: Color, wing: Wing) -> bool {
        self.rights[Self::slot(color, wing)]
    }

    #[must_use]
    pub const fn with(mut self, color: Color, wing: Wing, allowed: bool) -> Self {
        self.rights[Self::slot(color, wing)] = allowed;
        self
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.rights.iter().all(|r| !r)
    }

    /// Drop every right whose king or rook is off its home square in
    /// `placement`.
    #[must_use]
    pub fn retain_possible(self, placement: &Placement) -> Self {
        let mut kept = self;
        for color in [Color::White, Color::Black] {
            let home_rank = match color {
                Color::White => 0,
                Color::Black => 7,
            };
            let holds = |file: u8, kind: PieceKind| {
                Square::new(file, home_rank)
                    .and_then(|sq| placement.piece_at(sq))
                    .is_some_and(|p| p == Piece::new(kind, color))
            };
            let king_home = holds(KING_FILE, PieceKind::King);
            for wing in [Wing::King, Wing::Queen] {
                if !king_home || !holds(wing.rook_file(), PieceKind::Rook) {
                    kept = kept.with(color, wing, false);
                }
            }
        }
        kept
    }
}

const LETTERS: [(char, Color, Wing); 4] = [
    ('K', Color::White, Wing::King),
    ('Q', Color::White, Wing::Queen),
    ('k', Color::Black, Wing::King),
    ('q', Color::Black, Wing::Queen),
];

impl fmt::Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("-");
        }
        for (letter, color, wing) in LETTERS {
            if self.has(color, wing) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for CastlingRights {
    type Err = ParseError;

    /// FEN castling field: `-` or any of `KQkq`, each at most once.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token == "-" {
            return Ok(Self::NONE);
        }
        if token.is_empty() {
            return Err(ParseError::Castling(s.to_string()));
        }
        let mut rights = Self::NONE;
        for c in token.chars() {
            let Some(&(_, color, wing)) = LETTERS.iter().find(|(letter, _, _)| *letter == c)
            else {
                return Err(ParseError::Castling(s.to_string()));
            };
            if rights.has(color, wing) {
                return Err(ParseError::Castling(s.to_string()));
            }
            rights = rights.with(color, wing, true);
        }
        Ok(rights)
    }
}
