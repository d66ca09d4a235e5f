//! Whole-document snapshot store with optimistic concurrency.
//!
//! All rooms live in one serialized document. A mutation reads the document,
//! applies the transform to one room and writes the document back only if the
//! blob still holds the bytes that were read; otherwise it starts over.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use super::{Commit, RoomStore, StoreError, StoreErrorKind};
use crate::room::{Room, RoomCode};

/// Default number of optimistic attempts per mutation.
pub const DEFAULT_MAX_ATTEMPTS: usize = 16;

/// A single blob with conditional replacement, such as a file or an object in
/// a bucket.
pub trait SnapshotBlob: Send + Sync + std::fmt::Debug {
    /// Current contents, or `None` if the blob does not exist yet.
    fn fetch(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces the contents with `next` if they still equal `expected`
    /// (`None` meaning "does not exist"). Returns `false` when another writer
    /// got there first.
    fn compare_and_swap(&self, expected: Option<&[u8]>, next: &[u8]) -> Result<bool, StoreError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotDocument {
    revision: u64,
    rooms: BTreeMap<RoomCode, Room>,
}

/// Room store over a [`SnapshotBlob`].
#[derive(Debug)]
pub struct SnapshotStore<B> {
    blob: B,
    max_attempts: usize,
}

impl<B: SnapshotBlob> SnapshotStore<B> {
    /// Wraps `blob` with the default retry budget.
    #[instrument(skip(blob))]
    pub fn new(blob: B) -> Self {
        info!(?blob, "Opening snapshot store");
        Self {
            blob,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets how many optimistic attempts a mutation gets before failing with
    /// a conflict.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Underlying blob.
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Current document revision (0 when nothing was written yet).
    #[instrument(skip(self))]
    pub fn revision(&self) -> Result<u64, StoreError> {
        let (_, document) = self.read_document()?;
        Ok(document.revision)
    }

    fn read_document(&self) -> Result<(Option<Vec<u8>>, SnapshotDocument), StoreError> {
        let raw = self.blob.fetch()?;
        let document = match raw.as_deref() {
            None => SnapshotDocument::default(),
            Some(bytes) => serde_json::from_slice(bytes)?,
        };
        Ok((raw, document))
    }
}

fn checked(room: Option<&Room>) -> Result<Option<Room>, StoreError> {
    match room {
        Some(room) => {
            room.check_invariants()?;
            Ok(Some(room.clone()))
        }
        None => Ok(None),
    }
}

impl<B: SnapshotBlob> RoomStore for SnapshotStore<B> {
    fn backend(&self) -> &'static str {
        "snapshot"
    }

    #[instrument(skip(self), fields(room_code = %code))]
    fn load(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        let (_, document) = self.read_document()?;
        checked(document.rooms.get(code))
    }

    #[instrument(skip(self, room), fields(room_code = %room.code()))]
    fn save(&self, room: &Room) -> Result<(), StoreError> {
        self.read_modify_write(room.code(), &mut |_| Commit::Write(room.clone()))
    }

    #[instrument(skip(self, transform), fields(room_code = %code))]
    fn read_modify_write(
        &self,
        code: &RoomCode,
        transform: &mut dyn FnMut(Option<Room>) -> Commit,
    ) -> Result<(), StoreError> {
        for attempt in 1..=self.max_attempts {
            let (raw, mut document) = self.read_document()?;
            let current = checked(document.rooms.get(code))?;
            let next = match transform(current) {
                Commit::Keep => return Ok(()),
                Commit::Write(next) => next,
            };
            document.rooms.insert(code.clone(), next);
            document.revision += 1;
            let bytes = serde_json::to_vec_pretty(&document)?;

            if self.blob.compare_and_swap(raw.as_deref(), &bytes)? {
                debug!(attempt, revision = document.revision, "Snapshot committed");
                return Ok(());
            }
            warn!(attempt, max_attempts = self.max_attempts, "Snapshot changed underneath, retrying");
        }
        Err(StoreError::new(
            StoreErrorKind::Conflict,
            format!(
                "Room {} not written after {} optimistic attempts",
                code, self.max_attempts
            ),
        ))
    }
}

/// Blob held in process memory.
///
/// Behaves like an object-store key with conditional put; useful for tests and
/// as the reference for bucket-backed implementations.
#[derive(Debug, Default)]
pub struct MemoryBlob {
    contents: Mutex<Option<Vec<u8>>>,
}

impl MemoryBlob {
    /// Creates an empty blob.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBlob for MemoryBlob {
    fn fetch(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.contents.lock().clone())
    }

    fn compare_and_swap(&self, expected: Option<&[u8]>, next: &[u8]) -> Result<bool, StoreError> {
        let mut contents = self.contents.lock();
        if contents.as_deref() != expected {
            return Ok(false);
        }
        *contents = Some(next.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::modify;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn room(code: u16) -> Room {
        Room::new(
            RoomCode::from_number(code).unwrap(),
            "r".into(),
            "Ana".into(),
            Utc::now(),
        )
    }

    /// Blob whose first `lose` swaps fail as if another writer won.
    #[derive(Debug, Default)]
    struct ContendedBlob {
        inner: MemoryBlob,
        lose: AtomicUsize,
    }

    impl SnapshotBlob for ContendedBlob {
        fn fetch(&self) -> Result<Option<Vec<u8>>, StoreError> {
            self.inner.fetch()
        }

        fn compare_and_swap(&self, expected: Option<&[u8]>, next: &[u8]) -> Result<bool, StoreError> {
            let remaining = self.lose.load(Ordering::SeqCst);
            if remaining > 0 {
                self.lose.store(remaining - 1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.compare_and_swap(expected, next)
        }
    }

    #[test]
    fn test_rooms_share_one_document() {
        let store = SnapshotStore::new(MemoryBlob::new());
        store.save(&room(1111)).unwrap();
        store.save(&room(2222)).unwrap();
        assert_eq!(store.revision().unwrap(), 2);
        assert!(store.load(room(1111).code()).unwrap().is_some());
        assert!(store.load(room(2222).code()).unwrap().is_some());
    }

    #[test]
    fn test_conflict_retries_then_commits() {
        let blob = ContendedBlob {
            lose: AtomicUsize::new(3),
            ..Default::default()
        };
        let store = SnapshotStore::new(blob);
        let target = room(3333);
        let mut calls = 0;
        modify(&store, target.code(), |_| {
            calls += 1;
            (Commit::Write(target.clone()), ())
        })
        .unwrap();
        assert_eq!(calls, 4);
        assert_eq!(store.load(target.code()).unwrap(), Some(target));
    }

    #[test]
    fn test_conflict_exhaustion_leaves_blob_unchanged() {
        let blob = ContendedBlob {
            lose: AtomicUsize::new(100),
            ..Default::default()
        };
        let store = SnapshotStore::new(blob).with_max_attempts(3);
        let err = store.save(&room(4444)).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Conflict);
        assert_eq!(store.blob().fetch().unwrap(), None);
    }

    #[test]
    fn test_corrupt_document_is_reported() {
        let blob = MemoryBlob::new();
        blob.compare_and_swap(None, b"not json").unwrap();
        let store = SnapshotStore::new(blob);
        let err = store.load(room(5555).code()).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Corrupt);
    }
}
