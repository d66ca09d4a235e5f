//! Persistence of rooms across store instances.

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::{Connection, SqliteConnection};
use std::sync::Arc;
use std::time::Duration;
use tictactoe_lobby::{
    FileBlob, Mark, Outcome, Room, RoomCode, RoomStore, SessionEngine, SnapshotStore,
    SqliteStore, StoreErrorKind,
};

fn play_to_win(engine: &SessionEngine) -> RoomCode {
    let code = engine.create_room("Friendly", "Ana").unwrap();
    engine.join_room(code.as_str(), "Bo").unwrap();
    engine.start_game(code.as_str()).unwrap();
    for (cell, player) in [(0, 0), (4, 1), (1, 0), (8, 1), (2, 0)] {
        engine.make_move(code.as_str(), cell, player).unwrap();
    }
    code
}

fn open_sqlite(path: &std::path::Path) -> SqliteStore {
    SqliteStore::open(path.display().to_string(), Duration::from_secs(5)).unwrap()
}

#[test]
fn test_file_snapshot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data/rooms.json");

    let code = {
        let blob = FileBlob::open(&path, Duration::from_secs(1)).unwrap();
        play_to_win(&SessionEngine::new(Arc::new(SnapshotStore::new(blob))))
    };

    let blob = FileBlob::open(&path, Duration::from_secs(1)).unwrap();
    let engine = SessionEngine::new(Arc::new(SnapshotStore::new(blob)));
    let status = engine.room_status(code.as_str()).unwrap();
    assert_eq!(status.winner, Some(Outcome::Win(Mark::X)));
    assert_eq!(status.players, ["Ana", "Bo"]);
    assert!(!status.game_active);
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lobby.db");

    let code = play_to_win(&SessionEngine::new(Arc::new(open_sqlite(&path))));

    let engine = SessionEngine::new(Arc::new(open_sqlite(&path)));
    let status = engine.room_status(code.as_str()).unwrap();
    assert_eq!(status.winner, Some(Outcome::Win(Mark::X)));
    assert_eq!(status.board.get(4), Some(Some(Mark::O)));
    assert_eq!(status.board.get(3), Some(None));

    engine.reset_game(code.as_str()).unwrap();
    let status = engine.room_status(code.as_str()).unwrap();
    assert!(status.board.cells().iter().all(Option::is_none));
    assert_eq!(status.winner, None);
}

#[test]
fn test_sqlite_save_replaces_room() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_sqlite(&dir.path().join("lobby.db"));
    let code = RoomCode::from_number(4821).unwrap();

    let mut room = Room::new(code.clone(), "Lounge".into(), "Ana".into(), Utc::now());
    store.save(&room).unwrap();
    room.join("Bo", Utc::now()).unwrap();
    room.activate(Utc::now());
    room.apply_move(6, 0, Utc::now()).unwrap();
    store.save(&room).unwrap();

    let loaded = store.load(&code).unwrap().unwrap();
    assert_eq!(loaded.players(), ["Ana", "Bo"]);
    assert_eq!(loaded.board(), room.board());
    assert_eq!(loaded.turn(), room.turn());
    assert!(store.load(&RoomCode::from_number(1111).unwrap()).unwrap().is_none());
}

#[test]
fn test_corrupt_snapshot_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rooms.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let blob = FileBlob::open(&path, Duration::from_secs(1)).unwrap();
    let store = SnapshotStore::new(blob);
    let err = store.load(&RoomCode::from_number(1234).unwrap()).unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Corrupt);

    let engine = SessionEngine::new(Arc::new(store));
    let err = engine.create_room("r", "Ana").unwrap_err();
    assert!(!err.is_client_error());
    assert_eq!(std::fs::read(&path).unwrap(), b"{ not json");
}

#[test]
fn test_corrupt_sqlite_rows_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lobby.db");
    let engine = SessionEngine::new(Arc::new(open_sqlite(&path)));
    let code = engine.create_room("r", "Ana").unwrap();

    let mut conn = SqliteConnection::establish(&path.display().to_string()).unwrap();
    conn.batch_execute(&format!(
        "INSERT INTO board_cells (room_code, cell_index, mark) VALUES ('{0}', 0, 'X'), ('{0}', 1, 'X');",
        code
    ))
    .unwrap();

    let err = engine.room_status(code.as_str()).unwrap_err();
    assert!(!err.is_client_error());
    assert!(err.to_string().contains("Invariant"), "{err}");
}

#[test]
fn test_sqlite_open_fails_for_unreachable_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing/dir/lobby.db");
    let err = SqliteStore::open(path.display().to_string(), Duration::from_millis(100)).unwrap_err();
    assert_eq!(err.kind, StoreErrorKind::Unavailable);
}
