//! Room state and its transitions.
//!
//! A [`Room`] is the unit stored under one [`RoomCode`]. All mutation goes
//! through the methods here so the invariants hold after every transition.

use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tictactoe_rules::{Board, Outcome, Seat, evaluate};
use tracing::{debug, instrument};

use crate::error::{InvariantViolation, MoveRejection};

/// Maximum number of players in a room.
pub const ROOM_CAPACITY: usize = 2;

/// Smallest generated room code.
pub const MIN_CODE: u16 = 1000;

/// Largest generated room code.
pub const MAX_CODE: u16 = 9999;

/// Four-digit room identifier (`1000`..=`9999`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Builds a code from a number in the generated range.
    pub fn from_number(number: u16) -> Option<Self> {
        (MIN_CODE..=MAX_CODE)
            .contains(&number)
            .then(|| Self(number.to_string()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for RoomCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Room code must be 4 digits, got '{}'", s));
        }
        s.parse::<u16>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| format!("Room code out of range: '{}'", s))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

/// Result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Appended at the given seat.
    Joined(Seat),
    /// Name already present; nothing changed.
    AlreadySeated(Seat),
}

impl JoinOutcome {
    /// Seat held by the player after the join.
    pub fn seat(self) -> Seat {
        match self {
            JoinOutcome::Joined(seat) | JoinOutcome::AlreadySeated(seat) => seat,
        }
    }
}

/// The room is at capacity and the name is not one of its players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("Room is full")]
pub struct RoomFull;

/// Read-only view of a room returned to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomStatus {
    /// Player names in join order.
    pub players: Vec<String>,
    /// Current board.
    pub board: Board,
    /// Whose move is next.
    pub turn: Seat,
    /// Whether moves are accepted.
    pub game_active: bool,
    /// Terminal result, if any.
    pub winner: Option<Outcome>,
}

/// One game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    code: RoomCode,
    name: String,
    players: Vec<String>,
    board: Board,
    turn: Seat,
    game_active: bool,
    winner: Option<Outcome>,
    last_active: DateTime<Utc>,
}

impl Room {
    /// Creates a room holding only its creator, inactive, with an empty board.
    #[instrument(skip(name, creator), fields(room_code = %code))]
    pub fn new(code: RoomCode, name: String, creator: String, now: DateTime<Utc>) -> Self {
        Self {
            code,
            name,
            players: vec![creator],
            board: Board::new(),
            turn: Seat::First,
            game_active: false,
            winner: None,
            last_active: now,
        }
    }

    /// Reassembles a room from stored parts, checking its invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        code: RoomCode,
        name: String,
        players: Vec<String>,
        board: Board,
        turn: Seat,
        game_active: bool,
        winner: Option<Outcome>,
        last_active: DateTime<Utc>,
    ) -> Result<Self, InvariantViolation> {
        let room = Self {
            code,
            name,
            players,
            board,
            turn,
            game_active,
            winner,
            last_active,
        };
        room.check_invariants()?;
        Ok(room)
    }

    /// Room code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Player names in join order.
    pub fn players(&self) -> &[String] {
        &self.players
    }

    /// Current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Seat to move next.
    pub fn turn(&self) -> Seat {
        self.turn
    }

    /// Whether moves are accepted.
    pub fn game_active(&self) -> bool {
        self.game_active
    }

    /// Terminal result, if any.
    pub fn winner(&self) -> Option<Outcome> {
        self.winner
    }

    /// Time of the last mutation.
    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// Adds a player, or recognises a returning one.
    #[instrument(skip(self, now), fields(room_code = %self.code))]
    pub fn join(&mut self, player: &str, now: DateTime<Utc>) -> Result<JoinOutcome, RoomFull> {
        if let Some(index) = self.players.iter().position(|p| p == player) {
            debug!(index, "Player already seated");
            return Ok(JoinOutcome::AlreadySeated(seat_at(index)));
        }
        if self.players.len() >= ROOM_CAPACITY {
            return Err(RoomFull);
        }
        let seat = seat_at(self.players.len());
        self.players.push(player.to_string());
        self.last_active = now;
        Ok(JoinOutcome::Joined(seat))
    }

    /// Clears the board and winner, hands the move to the first seat and
    /// activates the game.
    #[instrument(skip(self, now), fields(room_code = %self.code))]
    pub fn activate(&mut self, now: DateTime<Utc>) {
        self.board = Board::new();
        self.winner = None;
        self.turn = Seat::First;
        self.game_active = true;
        self.last_active = now;
    }

    /// Validates and applies a move, then evaluates the board.
    ///
    /// On rejection the room is left untouched.
    #[instrument(skip(self, now), fields(room_code = %self.code))]
    pub fn apply_move(
        &mut self,
        cell_index: i64,
        player_index: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Outcome>, MoveRejection> {
        if let Some(outcome) = self.winner {
            return Err(MoveRejection::GameOver(outcome));
        }
        if !self.game_active {
            return Err(MoveRejection::GameNotActive);
        }
        let seat = Seat::from_index(player_index).ok_or(MoveRejection::UnknownPlayer(player_index))?;
        if seat != self.turn {
            return Err(MoveRejection::NotYourTurn {
                expected: self.turn.index(),
            });
        }
        let cell = usize::try_from(cell_index)
            .ok()
            .filter(|c| self.board.get(*c).is_some())
            .ok_or(MoveRejection::CellOutOfRange(cell_index))?;
        if !self.board.is_empty(cell) {
            return Err(MoveRejection::CellOccupied(cell));
        }

        self.board
            .place(cell, seat.mark())
            .map_err(|_| MoveRejection::CellOccupied(cell))?;
        self.turn = seat.other();
        self.last_active = now;

        let outcome = evaluate(&self.board);
        if let Some(result) = outcome {
            self.winner = Some(result);
            self.game_active = false;
        }
        Ok(outcome)
    }

    /// Snapshot for pollers.
    pub fn status(&self) -> RoomStatus {
        RoomStatus {
            players: self.players.clone(),
            board: self.board,
            turn: self.turn,
            game_active: self.game_active,
            winner: self.winner,
        }
    }

    /// Verifies the structural invariants of a committed room.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        if self.players.len() > ROOM_CAPACITY {
            return Err(InvariantViolation::new(format!(
                "{} players in room {}",
                self.players.len(),
                self.code
            )));
        }
        if self.winner.is_some() && self.game_active {
            return Err(InvariantViolation::new("winner set while game is active"));
        }
        match (self.winner, evaluate(&self.board)) {
            (Some(winner), found) if found != Some(winner) => {
                return Err(InvariantViolation::new("winner does not match board"));
            }
            (None, Some(_)) => {
                return Err(InvariantViolation::new("terminal board without a winner"));
            }
            _ => {}
        }
        let xs = self.board.count(Seat::First.mark());
        let os = self.board.count(Seat::Second.mark());
        let expected_turn = match xs.checked_sub(os) {
            Some(0) => Seat::First,
            Some(1) => Seat::Second,
            _ => {
                return Err(InvariantViolation::new(format!(
                    "mark counts X={} O={} cannot arise from alternating moves",
                    xs, os
                )));
            }
        };
        // Finished games keep the flipped turn of their last move.
        if self.turn != expected_turn {
            return Err(InvariantViolation::new(format!(
                "turn {} does not follow from X={} O={}",
                self.turn.index(),
                xs,
                os
            )));
        }
        Ok(())
    }
}

fn seat_at(index: usize) -> Seat {
    if index == 0 { Seat::First } else { Seat::Second }
}
