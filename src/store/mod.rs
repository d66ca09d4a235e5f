//! Room persistence.
//!
//! The engine talks to storage only through [`RoomStore`]. Every backend
//! provides an atomic per-room [`RoomStore::read_modify_write`]:
//!
//! - [`MemoryStore`]: one mutex per room code
//! - [`SnapshotStore`]: whole-document compare-and-swap with retries, over a
//!   [`SnapshotBlob`] ([`FileBlob`] on disk, [`MemoryBlob`] for object-store
//!   style buckets)
//! - [`SqliteStore`]: one `BEGIN IMMEDIATE` transaction per mutation

mod error;
mod file;
mod memory;
mod snapshot;
mod sqlite;

pub use error::{StoreError, StoreErrorKind};
pub use file::FileBlob;
pub use memory::MemoryStore;
pub use snapshot::{DEFAULT_MAX_ATTEMPTS, MemoryBlob, SnapshotBlob, SnapshotStore};
pub use sqlite::SqliteStore;

use tracing::instrument;

use crate::room::{Room, RoomCode};

/// What a transform wants done with the room it was shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Persist this room under the key.
    Write(Room),
    /// Leave storage untouched.
    Keep,
}

/// Key-value storage of rooms by code.
pub trait RoomStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Loads the committed room, or `None` if the code is unknown.
    fn load(&self, code: &RoomCode) -> Result<Option<Room>, StoreError>;

    /// Unconditionally stores `room` under its own code.
    fn save(&self, room: &Room) -> Result<(), StoreError>;

    /// Runs `transform` on the current room and commits its decision as one
    /// atomic unit with respect to other mutations of the same code.
    ///
    /// Optimistic backends may call `transform` more than once; it must depend
    /// only on its argument and captured immutable state. When an error is
    /// returned nothing was committed.
    fn read_modify_write(
        &self,
        code: &RoomCode,
        transform: &mut dyn FnMut(Option<Room>) -> Commit,
    ) -> Result<(), StoreError>;
}

/// Typed wrapper around [`RoomStore::read_modify_write`].
///
/// `transform` returns the commit decision together with the operation's
/// result; the result of the attempt that committed is returned.
#[instrument(skip(store, transform), fields(backend = store.backend(), room_code = %code))]
pub fn modify<T>(
    store: &dyn RoomStore,
    code: &RoomCode,
    mut transform: impl FnMut(Option<Room>) -> (Commit, T),
) -> Result<T, StoreError> {
    let mut result = None;
    store.read_modify_write(code, &mut |room| {
        let (commit, value) = transform(room);
        if let Commit::Write(next) = &commit {
            debug_assert_eq!(next.code(), code, "transform changed the room key");
            debug_assert!(next.check_invariants().is_ok(), "transform broke invariants");
        }
        result = Some(value);
        commit
    })?;
    result.ok_or_else(|| StoreError::unavailable("store returned without running the transform"))
}
