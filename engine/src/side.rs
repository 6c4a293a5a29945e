use chesspilot_types::{Color, Placement};

/// Guess which side sits at the bottom of the screen.
///
/// `placement` must be read with White's perspective. Whoever owns more
/// pieces on the bottom four ranks is the player; ties go to Black.
#[must_use]
pub fn detect_side(placement: &Placement) -> Color {
    let (white, black) = placement
        .pieces()
        .filter(|(square, _)| square.rank() < 4)
        .fold((0u32, 0u32), |(w, b), (_, piece)| match piece.color {
            Color::White => (w + 1, b),
            Color::Black => (w, b + 1),
        });
    if white > black {
        Color::White
    } else {
        Color::Black
    }
}
