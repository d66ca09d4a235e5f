//! Game rules for tic-tac-toe.
//!
//! Pure functions over a [`Board`]. Callers decide when to evaluate; the
//! session engine runs [`evaluate`] after every accepted move.

pub mod draw;
pub mod win;

pub use draw::{is_draw, is_full};
pub use win::{LINES, check_winner, winning_line};

use crate::{Board, Outcome};
use tracing::{debug, instrument};

/// Determines whether the board is terminal.
///
/// A completed line wins; otherwise a full board is a draw; otherwise the game
/// goes on.
#[instrument]
pub fn evaluate(board: &Board) -> Option<Outcome> {
    if let Some((mark, line)) = winning_line(board) {
        debug!(%mark, ?line, "Line completed");
        Some(Outcome::Win(mark))
    } else if is_draw(board) {
        Some(Outcome::Draw)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mark;

    #[test]
    fn test_evaluate_in_progress() {
        let mut board = Board::new();
        board.place(4, Mark::X).unwrap();
        assert_eq!(evaluate(&board), None);
    }

    #[test]
    fn test_evaluate_win_on_full_board_beats_draw() {
        use Mark::{O, X};
        let board = Board::from_cells([
            Some(X), Some(O), Some(X),
            Some(O), Some(X), Some(O),
            Some(O), Some(X), Some(X),
        ]);
        assert_eq!(evaluate(&board), Some(Outcome::Win(X)));
    }

    #[test]
    fn test_evaluate_full_board_without_line() {
        use Mark::{O, X};
        let board = Board::from_cells([
            Some(X), Some(O), Some(X),
            Some(X), Some(O), Some(O),
            Some(O), Some(X), Some(X),
        ]);
        assert_eq!(evaluate(&board), Some(Outcome::Draw));
    }
}
