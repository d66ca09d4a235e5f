//! Tic-tac-toe lobby: rooms, turns and win detection over pluggable stores.
//!
//! Players create a room, share its four-digit code, and poll the server for
//! the board while taking turns.
//!
//! # Architecture
//!
//! - **Engine**: [`SessionEngine`] owns every room transition
//! - **Stores**: [`RoomStore`] implementations (memory, JSON snapshot, SQLite)
//! - **API**: axum [`router`] exposing the JSON endpoints
//! - **Poller**: [`RoomWatcher`] terminal client
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tictactoe_lobby::{MemoryStore, SessionEngine};
//!
//! # fn example() -> Result<(), tictactoe_lobby::EngineError> {
//! let engine = SessionEngine::new(Arc::new(MemoryStore::new()));
//! let code = engine.create_room("Friendly", "Ana")?;
//! engine.join_room(code.as_str(), "Bo")?;
//! engine.start_game(code.as_str())?;
//! let status = engine.make_move(code.as_str(), 4, 0)?;
//! assert_eq!(status.turn.index(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod api;
mod config;
mod engine;
mod error;
mod poller;
mod room;
mod store;

// Crate-level exports - HTTP surface
pub use api::{
    ApiError, AppState, CreateRoomRequest, CreateRoomResponse, JoinRoomRequest, JoinRoomResponse,
    MakeMoveRequest, RoomCodeRequest, RoomStatusResponse, StatusQuery, SuccessResponse, router,
};

// Crate-level exports - Configuration
pub use config::{BackendConfig, ConfigError, LobbyConfig};

// Crate-level exports - Engine
pub use engine::{DEFAULT_CODE_ATTEMPTS, Joined, SessionEngine};
pub use error::{EngineError, InvariantViolation, MoveRejection};

// Crate-level exports - Rooms
pub use room::{JoinOutcome, MAX_CODE, MIN_CODE, ROOM_CAPACITY, Room, RoomCode, RoomFull, RoomStatus};

// Crate-level exports - Stores
pub use store::{
    Commit, DEFAULT_MAX_ATTEMPTS, FileBlob, MemoryBlob, MemoryStore, RoomStore, SnapshotBlob,
    SnapshotStore, SqliteStore, StoreError, StoreErrorKind, modify,
};

// Crate-level exports - Poller
pub use poller::{DEFAULT_POLL_INTERVAL, RoomWatcher, render_status};

// Crate-level exports - Game rules
pub use tictactoe_rules::{Board, Mark, Outcome, Seat};
