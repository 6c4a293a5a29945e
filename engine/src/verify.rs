//! Post-move verification against observed placements.

use chesspilot_types::{Color, Placement, UciMove};

use crate::collaborators::MoveVerifier;

/// Checks that the origin held one of our pieces, that piece left, and the
/// destination now holds our piece of the expected kind.
///
/// Captures, castling and en passant need no special casing: only the moving
/// piece's two squares are inspected.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlacementVerifier;

impl MoveVerifier for PlacementVerifier {
    fn verify_moved(
        &self,
        perspective: Color,
        before: &Placement,
        after: &Placement,
        mv: &UciMove,
    ) -> bool {
        let Some(moved) = before.piece_at(mv.from()) else {
            return false;
        };
        if moved.color != perspective {
            return false;
        }
        if after.piece_at(mv.from()) == Some(moved) {
            return false;
        }
        let expected_kind = mv.promotion().unwrap_or(moved.kind);
        after
            .piece_at(mv.to())
            .is_some_and(|p| p.color == perspective && p.kind == expected_kind)
    }
}
