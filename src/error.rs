//! Engine error types.

use derive_more::{Display, Error};
use tictactoe_rules::Outcome;
use tracing::instrument;

use crate::room::RoomCode;
use crate::store::StoreError;

/// Reason a move was refused. The room is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MoveRejection {
    /// No game is running; call start first.
    #[display("Game is not active")]
    GameNotActive,
    /// The game already ended.
    #[display("Game is already over ({})", _0)]
    GameOver(Outcome),
    /// Player index is neither 0 nor 1.
    #[display("Unknown player index {}", _0)]
    UnknownPlayer(i64),
    /// It is the other seat's move.
    #[display("Not your turn. Waiting for player {}", expected)]
    NotYourTurn {
        /// Index of the seat that may move.
        expected: usize,
    },
    /// Cell index is outside `0..=8`.
    #[display("Cell {} is out of range (must be 0-8)", _0)]
    CellOutOfRange(i64),
    /// Cell already holds a mark.
    #[display("Cell {} is already occupied", _0)]
    CellOccupied(usize),
}

impl std::error::Error for MoveRejection {}

/// Engine-internal consistency failure.
///
/// Never produced by a correct engine; seen only when stored data was
/// tampered with or decoded from an incompatible layout.
#[derive(Debug, Clone, Display, Error)]
#[display("Invariant violation: {} at {}:{}", message, file, line)]
pub struct InvariantViolation {
    /// Violated property.
    pub message: String,
    /// Line number where the check failed.
    pub line: u32,
    /// Source file where the check failed.
    pub file: &'static str,
}

impl InvariantViolation {
    /// Creates a new violation with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Failure of a session engine operation.
#[derive(Debug, Display)]
pub enum EngineError {
    /// No room with this code.
    #[display("Room {} not found", code)]
    RoomNotFound {
        /// Requested code, as sent by the caller.
        code: String,
    },
    /// Two players are already seated.
    #[display("Room {} is full", code)]
    RoomFull {
        /// Room that refused the join.
        code: RoomCode,
    },
    /// The move was illegal.
    #[display("Move rejected: {}", reason)]
    MoveRejected {
        /// Why.
        reason: MoveRejection,
    },
    /// Every generated code collided with an existing room.
    #[display("No free room code after {} attempts", attempts)]
    CapacityExhausted {
        /// Codes tried.
        attempts: usize,
    },
    /// The store failed.
    #[display("{}", _0)]
    Backend(StoreError),
}

impl EngineError {
    /// True for caller mistakes (bad code, full room, illegal move).
    ///
    /// Everything else is a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EngineError::RoomNotFound { .. }
                | EngineError::RoomFull { .. }
                | EngineError::MoveRejected { .. }
        )
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::MoveRejected { reason } => Some(reason),
            EngineError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Backend(err)
    }
}

impl From<MoveRejection> for EngineError {
    fn from(reason: MoveRejection) -> Self {
        EngineError::MoveRejected { reason }
    }
}
