//! Tic-tac-toe rules shared by the lobby server and its clients.
//!
//! - [`Board`]: nine cells in row-major order
//! - [`Seat`]: join-order player position and its [`Mark`]
//! - [`rules`]: win and draw detection

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod rules;
mod types;

pub use rules::evaluate;
pub use types::{Board, CELL_COUNT, Mark, Outcome, PlaceError, Seat};
