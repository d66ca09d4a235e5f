//! Session engine: room lifecycle and move rules over an injected store.

use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tictactoe_rules::Outcome;
use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::room::{JoinOutcome, MAX_CODE, MIN_CODE, Room, RoomCode, RoomStatus};
use crate::store::{Commit, RoomStore, modify};

/// Default number of random codes tried before giving up on room creation.
pub const DEFAULT_CODE_ATTEMPTS: usize = 64;

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// Name of the joined room.
    pub room_name: String,
    /// Seat and whether it was newly taken.
    pub outcome: JoinOutcome,
}

/// Owns every state transition of every room.
///
/// Each mutating operation is one [`modify`] call, so validation and commit
/// happen under the store's per-room atomicity.
#[derive(Debug)]
pub struct SessionEngine {
    store: Arc<dyn RoomStore>,
    rng: Mutex<StdRng>,
    code_attempts: usize,
}

impl SessionEngine {
    /// Creates an engine over `store` with an entropy-seeded code generator.
    #[instrument(skip(store), fields(backend = store.backend()))]
    pub fn new(store: Arc<dyn RoomStore>) -> Self {
        info!("Creating session engine");
        Self {
            store,
            rng: Mutex::new(StdRng::from_entropy()),
            code_attempts: DEFAULT_CODE_ATTEMPTS,
        }
    }

    /// Creates an engine whose room codes are reproducible.
    #[instrument(skip(store), fields(backend = store.backend()))]
    pub fn with_seed(store: Arc<dyn RoomStore>, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..Self::new(store)
        }
    }

    /// Sets how many codes creation tries before reporting
    /// [`EngineError::CapacityExhausted`].
    pub fn with_code_attempts(mut self, attempts: usize) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    /// The injected store.
    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    fn next_code(&self) -> RoomCode {
        let number = self.rng.lock().gen_range(MIN_CODE..=MAX_CODE);
        RoomCode::from_number(number).unwrap_or_else(|| unreachable!("generated code in range"))
    }

    fn parse_code(code: &str) -> Result<RoomCode, EngineError> {
        code.parse().map_err(|_| EngineError::RoomNotFound {
            code: code.to_string(),
        })
    }

    /// Creates a room owned by `creator_name` and returns its code.
    ///
    /// A code that is already taken is regenerated, up to the configured
    /// number of attempts.
    #[instrument(skip(self))]
    pub fn create_room(&self, room_name: &str, creator_name: &str) -> Result<RoomCode, EngineError> {
        for attempt in 1..=self.code_attempts {
            let code = self.next_code();
            let created = modify(self.store.as_ref(), &code, |existing| match existing {
                Some(_) => (Commit::Keep, false),
                None => {
                    let room = Room::new(
                        code.clone(),
                        room_name.to_string(),
                        creator_name.to_string(),
                        Utc::now(),
                    );
                    (Commit::Write(room), true)
                }
            })?;
            if created {
                info!(room_code = %code, attempt, "Room created");
                return Ok(code);
            }
            debug!(room_code = %code, attempt, "Room code taken, regenerating");
        }
        warn!(attempts = self.code_attempts, "No free room code");
        Err(EngineError::CapacityExhausted {
            attempts: self.code_attempts,
        })
    }

    /// Seats `player_name` in the room, or confirms an existing seat.
    #[instrument(skip(self))]
    pub fn join_room(&self, room_code: &str, player_name: &str) -> Result<Joined, EngineError> {
        let code = Self::parse_code(room_code)?;
        let result = modify(self.store.as_ref(), &code, |existing| {
            let Some(mut room) = existing else {
                return (Commit::Keep, Err(EngineError::RoomNotFound { code: room_code.to_string() }));
            };
            match room.join(player_name, Utc::now()) {
                Ok(outcome @ JoinOutcome::Joined(_)) => {
                    let joined = Joined {
                        room_name: room.name().to_string(),
                        outcome,
                    };
                    (Commit::Write(room), Ok(joined))
                }
                Ok(outcome @ JoinOutcome::AlreadySeated(_)) => {
                    let joined = Joined {
                        room_name: room.name().to_string(),
                        outcome,
                    };
                    (Commit::Keep, Ok(joined))
                }
                Err(_) => (Commit::Keep, Err(EngineError::RoomFull { code: code.clone() })),
            }
        })?;
        match &result {
            Ok(joined) => info!(room_code = %code, seat = joined.outcome.seat().index(), "Player joined"),
            Err(e) => warn!(room_code = %code, error = %e, "Join refused"),
        }
        result
    }

    /// Starts a game: clears the board and gives the first move to seat 0.
    #[instrument(skip(self))]
    pub fn start_game(&self, room_code: &str) -> Result<(), EngineError> {
        self.activate(room_code, "start")
    }

    /// Starts a rematch. Same effect as [`SessionEngine::start_game`], callable
    /// at any point of a game.
    #[instrument(skip(self))]
    pub fn reset_game(&self, room_code: &str) -> Result<(), EngineError> {
        self.activate(room_code, "reset")
    }

    fn activate(&self, room_code: &str, action: &'static str) -> Result<(), EngineError> {
        let code = Self::parse_code(room_code)?;
        let found = modify(self.store.as_ref(), &code, |existing| match existing {
            Some(mut room) => {
                room.activate(Utc::now());
                (Commit::Write(room), true)
            }
            None => (Commit::Keep, false),
        })?;
        if !found {
            warn!(room_code = %code, action, "Activation on unknown room");
            return Err(EngineError::RoomNotFound {
                code: room_code.to_string(),
            });
        }
        info!(room_code = %code, action, "Game activated");
        Ok(())
    }

    /// Places the mark of `player_index` at `cell_index`.
    ///
    /// Returns the room status after the move. Illegal moves are reported as
    /// [`EngineError::MoveRejected`] and change nothing.
    #[instrument(skip(self))]
    pub fn make_move(
        &self,
        room_code: &str,
        cell_index: i64,
        player_index: i64,
    ) -> Result<RoomStatus, EngineError> {
        let code = Self::parse_code(room_code)?;
        let result = modify(self.store.as_ref(), &code, |existing| {
            let Some(mut room) = existing else {
                return (Commit::Keep, Err(EngineError::RoomNotFound { code: room_code.to_string() }));
            };
            match room.apply_move(cell_index, player_index, Utc::now()) {
                Ok(outcome) => {
                    let status = room.status();
                    (Commit::Write(room), Ok((status, outcome)))
                }
                Err(reason) => (Commit::Keep, Err(EngineError::from(reason))),
            }
        })?;

        match result {
            Ok((status, outcome)) => {
                match outcome {
                    Some(Outcome::Win(mark)) => info!(room_code = %code, %mark, "Game won"),
                    Some(Outcome::Draw) => info!(room_code = %code, "Game drawn"),
                    None => debug!(room_code = %code, cell_index, player_index, "Move accepted"),
                }
                Ok(status)
            }
            Err(e) => {
                warn!(room_code = %code, cell_index, player_index, error = %e, "Move rejected");
                Err(e)
            }
        }
    }

    /// Reads the committed state of a room.
    #[instrument(skip(self))]
    pub fn room_status(&self, room_code: &str) -> Result<RoomStatus, EngineError> {
        let code = Self::parse_code(room_code)?;
        match self.store.load(&code)? {
            Some(room) => {
                debug!(room_code = %code, "Room status read");
                Ok(room.status())
            }
            None => Err(EngineError::RoomNotFound {
                code: room_code.to_string(),
            }),
        }
    }
}
