//! Piece placement and board readings.
//!
//! A [`Placement`] is the first field of a FEN string. It is parsed into a
//! 64-square grid and re-rendered canonically, so two placements describing
//! the same arrangement always compare equal as text.

use std::fmt;

use thiserror::Error;

use crate::{CastlingRights, Color, Square, UciMove};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("empty board string")]
    Empty,
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),
    #[error("rank {rank} spans {width} squares")]
    RankWidth { rank: usize, width: usize },
    #[error("invalid piece character {0:?}")]
    InvalidPiece(char),
    #[error("missing active color")]
    MissingActiveColor,
    #[error("unrecognized active color {0:?}")]
    UnknownActiveColor(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Parse a piece letter, ignoring case.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }

    /// Lowercase piece letter.
    #[must_use]
    pub const fn to_char(self) -> char {
        match self {
            Self::Pawn => 'p',
            Self::Knight => 'n',
            Self::Bishop => 'b',
            Self::Rook => 'r',
            Self::Queen => 'q',
            Self::King => 'k',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    #[must_use]
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// FEN letter: uppercase for White, lowercase for Black.
    #[must_use]
    pub fn from_fen_char(c: char) -> Option<Self> {
        let kind = PieceKind::from_char(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { kind, color })
    }

    #[must_use]
    pub fn to_fen_char(self) -> char {
        let c = self.kind.to_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }
}

/// The piece-arrangement portion of a FEN string.
#[derive(Clone)]
pub struct Placement {
    grid: [Option<Piece>; 64],
    text: String,
}

impl Placement {
    /// Parse the placement field. Trailing FEN fields, if present, are ignored.
    pub fn parse(raw: &str) -> Result<Self, FenError> {
        let field = raw.split_whitespace().next().ok_or(FenError::Empty)?;
        let rows: Vec<&str> = field.split('/').collect();
        if rows.len() != 8 {
            return Err(FenError::RankCount(rows.len()));
        }

        let mut grid = [None; 64];
        for (row, text) in rows.iter().enumerate() {
            let rank = 7 - row;
            let mut file = 0usize;
            for c in text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if skip == 0 || skip > 8 {
                        return Err(FenError::InvalidPiece(c));
                    }
                    file += skip as usize;
                } else {
                    let piece = Piece::from_fen_char(c).ok_or(FenError::InvalidPiece(c))?;
                    if file < 8 {
                        grid[rank * 8 + file] = Some(piece);
                    }
                    file += 1;
                }
                if file > 8 {
                    break;
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth {
                    rank: rank + 1,
                    width: file,
                });
            }
        }

        Ok(Self::from_grid(grid))
    }

    fn from_grid(grid: [Option<Piece>; 64]) -> Self {
        let mut text = String::with_capacity(72);
        for rank in (0..8).rev() {
            let mut empty = 0u8;
            for file in 0..8 {
                match grid[rank * 8 + file] {
                    Some(piece) => {
                        if empty > 0 {
                            text.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        text.push(piece.to_fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                text.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                text.push('/');
            }
        }
        Self { grid, text }
    }

    /// Canonical placement text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.grid[square.index()]
    }

    /// Occupied squares, a1 first.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        Square::all().filter_map(|sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// The placement after playing `mv`, or `None` if the origin square is empty.
    ///
    /// Handles captures, promotion, the castling rook hop and en passant removal.
    /// Legality is not checked.
    #[must_use]
    pub fn apply_move(&self, mv: &UciMove) -> Option<Self> {
        let from = mv.from();
        let to = mv.to();
        let piece = self.piece_at(from)?;
        let mut grid = self.grid;

        if piece.kind == PieceKind::Pawn && from.file() != to.file() && grid[to.index()].is_none()
        {
            if let Some(captured) = Square::new(to.file(), from.rank()) {
                grid[captured.index()] = None;
            }
        }

        if piece.kind == PieceKind::King && from.file().abs_diff(to.file()) == 2 {
            let (rook_from, rook_to) = if to.file() > from.file() {
                (7, 5)
            } else {
                (0, 3)
            };
            if let (Some(rf), Some(rt)) = (
                Square::new(rook_from, from.rank()),
                Square::new(rook_to, from.rank()),
            ) {
                grid[rt.index()] = grid[rf.index()].take();
            }
        }

        let landed = match mv.promotion() {
            Some(kind) => Piece::new(kind, piece.color),
            None => piece,
        };
        grid[from.index()] = None;
        grid[to.index()] = Some(landed);
        Some(Self::from_grid(grid))
    }
}

impl PartialEq for Placement {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Placement {}

impl fmt::Debug for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Placement").field(&self.text).finish()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One successful perception + encode result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardReading {
    pub placement: Placement,
    pub active_color: Color,
}

impl BoardReading {
    #[must_use]
    pub fn new(placement: Placement, active_color: Color) -> Self {
        Self {
            placement,
            active_color,
        }
    }

    /// Read the first two FEN fields. Castling, en passant and clocks are ignored.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let mut fields = fen.split_whitespace();
        let placement = Placement::parse(fields.next().ok_or(FenError::Empty)?)?;
        let token = fields.next().ok_or(FenError::MissingActiveColor)?;
        let active_color =
            Color::from_token(token).ok_or_else(|| FenError::UnknownActiveColor(token.into()))?;
        Ok(Self::new(placement, active_color))
    }

    /// Full FEN. Rights the placement rules out are dropped; en passant is
    /// never claimed.
    #[must_use]
    pub fn to_fen(&self, castling: CastlingRights) -> String {
        format!(
            "{} {} {} - 0 1",
            self.placement,
            self.active_color.token(),
            castling.retain_possible(&self.placement)
        )
    }
}
