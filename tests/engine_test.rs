//! Session engine behaviour over the in-memory store.

use std::sync::Arc;
use tictactoe_lobby::{
    EngineError, JoinOutcome, Mark, MemoryStore, MoveRejection, Outcome, Room, RoomCode,
    RoomStore, Seat, SessionEngine, StoreErrorKind,
};

fn engine() -> SessionEngine {
    SessionEngine::with_seed(Arc::new(MemoryStore::new()), 7)
}

fn started_room(engine: &SessionEngine) -> RoomCode {
    let code = engine.create_room("Friendly", "Ana").unwrap();
    engine.join_room(code.as_str(), "Bo").unwrap();
    engine.start_game(code.as_str()).unwrap();
    code
}

fn rejection(err: EngineError) -> MoveRejection {
    match err {
        EngineError::MoveRejected { reason } => reason,
        other => panic!("expected a move rejection, got {other}"),
    }
}

#[test]
fn test_worked_example() {
    let engine = engine();
    let code = engine.create_room("Friendly", "Ana").unwrap();
    let code = code.as_str();

    let joined = engine.join_room(code, "Bo").unwrap();
    assert_eq!(joined.room_name, "Friendly");
    assert_eq!(joined.outcome, JoinOutcome::Joined(Seat::Second));

    engine.start_game(code).unwrap();
    engine.make_move(code, 0, 0).unwrap();
    assert_eq!(
        rejection(engine.make_move(code, 0, 1).unwrap_err()),
        MoveRejection::CellOccupied(0)
    );
    engine.make_move(code, 4, 1).unwrap();
    engine.make_move(code, 1, 0).unwrap();
    engine.make_move(code, 8, 1).unwrap();
    let status = engine.make_move(code, 2, 0).unwrap();

    assert_eq!(status.winner, Some(Outcome::Win(Mark::X)));
    assert!(!status.game_active);
    assert_eq!(status.players, ["Ana", "Bo"]);
    assert_eq!(engine.room_status(code).unwrap(), status);
}

#[test]
fn test_new_room_is_inactive_with_creator_seated() {
    let engine = engine();
    let code = engine.create_room("Lounge", "Ana").unwrap();
    let status = engine.room_status(code.as_str()).unwrap();
    assert_eq!(status.players, ["Ana"]);
    assert!(!status.game_active);
    assert_eq!(status.turn, Seat::First);
    assert_eq!(status.winner, None);
    assert!(status.board.cells().iter().all(Option::is_none));
    assert_eq!(
        rejection(engine.make_move(code.as_str(), 0, 0).unwrap_err()),
        MoveRejection::GameNotActive
    );
}

#[test]
fn test_turns_alternate() {
    let engine = engine();
    let code = started_room(&engine);
    let moves = [4, 0, 8, 2, 6, 3, 5, 1, 7];
    for (k, cell) in moves.into_iter().enumerate().take(5) {
        let status = engine.make_move(code.as_str(), cell, (k % 2) as i64).unwrap();
        assert_eq!(status.turn.index(), (k + 1) % 2);
        let expected = if k % 2 == 0 { Mark::X } else { Mark::O };
        assert_eq!(status.board.get(cell as usize), Some(Some(expected)));
    }
}

#[test]
fn test_out_of_turn_move_changes_nothing() {
    let engine = engine();
    let code = started_room(&engine);
    let before = engine.room_status(code.as_str()).unwrap();

    assert_eq!(
        rejection(engine.make_move(code.as_str(), 4, 1).unwrap_err()),
        MoveRejection::NotYourTurn { expected: 0 }
    );
    assert_eq!(
        rejection(engine.make_move(code.as_str(), 4, 5).unwrap_err()),
        MoveRejection::UnknownPlayer(5)
    );
    assert_eq!(
        rejection(engine.make_move(code.as_str(), 9, 0).unwrap_err()),
        MoveRejection::CellOutOfRange(9)
    );
    assert_eq!(engine.room_status(code.as_str()).unwrap(), before);
}

#[test]
fn test_every_line_wins_on_completing_move() {
    let lines: [[i64; 3]; 8] = [
        [0, 1, 2],
        [3, 4, 5],
        [6, 7, 8],
        [0, 3, 6],
        [1, 4, 7],
        [2, 5, 8],
        [0, 4, 8],
        [2, 4, 6],
    ];
    let engine = engine();
    let code = started_room(&engine);
    for line in lines {
        engine.reset_game(code.as_str()).unwrap();
        let fillers: Vec<i64> = (0..9).filter(|c| !line.contains(c)).collect();
        // X takes the line, O plays the first free cells off the line.
        for (i, cell) in line.iter().enumerate() {
            let status = engine.make_move(code.as_str(), *cell, 0).unwrap();
            if i < 2 {
                assert_eq!(status.winner, None, "line {line:?} won early");
                engine.make_move(code.as_str(), fillers[i], 1).unwrap();
            } else {
                assert_eq!(status.winner, Some(Outcome::Win(Mark::X)), "line {line:?}");
                assert!(!status.game_active);
            }
        }
        assert_eq!(
            rejection(engine.make_move(code.as_str(), fillers[2], 1).unwrap_err()),
            MoveRejection::GameOver(Outcome::Win(Mark::X))
        );
    }
}

#[test]
fn test_full_board_without_line_is_draw() {
    let engine = engine();
    let code = started_room(&engine);
    // X O X / X O O / O X X
    let moves = [0, 1, 2, 4, 3, 5, 7, 6, 8];
    let mut last = None;
    for (k, cell) in moves.into_iter().enumerate() {
        last = Some(engine.make_move(code.as_str(), cell, (k % 2) as i64).unwrap());
    }
    let status = last.unwrap();
    assert_eq!(status.winner, Some(Outcome::Draw));
    assert!(!status.game_active);
}

#[test]
fn test_win_on_last_cell_beats_draw() {
    let engine = engine();
    let code = started_room(&engine);
    // O O X / X O X / O X X, completed by X at 8.
    let moves = [3, 0, 7, 1, 2, 4, 5, 6, 8];
    let mut last = None;
    for (k, cell) in moves.into_iter().enumerate() {
        last = Some(engine.make_move(code.as_str(), cell, (k % 2) as i64).unwrap());
    }
    assert_eq!(last.unwrap().winner, Some(Outcome::Win(Mark::X)));
}

#[test]
fn test_join_rules() {
    let engine = engine();
    let code = engine.create_room("Lounge", "Ana").unwrap();
    let code = code.as_str();

    assert_eq!(
        engine.join_room(code, "Ana").unwrap().outcome,
        JoinOutcome::AlreadySeated(Seat::First)
    );
    assert_eq!(
        engine.join_room(code, "Bo").unwrap().outcome,
        JoinOutcome::Joined(Seat::Second)
    );
    assert_eq!(
        engine.join_room(code, "Bo").unwrap().outcome,
        JoinOutcome::AlreadySeated(Seat::Second)
    );
    let err = engine.join_room(code, "Cy").unwrap_err();
    assert!(matches!(err, EngineError::RoomFull { .. }));
    assert!(err.is_client_error());
    assert_eq!(engine.room_status(code).unwrap().players, ["Ana", "Bo"]);
}

#[test]
fn test_unknown_rooms_are_client_errors() {
    let engine = engine();
    for code in ["1234", "12", "abcd", ""] {
        let err = engine.room_status(code).unwrap_err();
        assert!(matches!(err, EngineError::RoomNotFound { .. }), "{code}");
        assert!(err.is_client_error());
        assert!(engine.join_room(code, "Bo").is_err());
        assert!(engine.start_game(code).is_err());
        assert!(engine.reset_game(code).is_err());
        assert!(engine.make_move(code, 0, 0).is_err());
    }
}

#[test]
fn test_reset_mid_game_clears_board() {
    let engine = engine();
    let code = started_room(&engine);
    engine.make_move(code.as_str(), 4, 0).unwrap();
    engine.make_move(code.as_str(), 0, 1).unwrap();
    engine.reset_game(code.as_str()).unwrap();

    let status = engine.room_status(code.as_str()).unwrap();
    assert!(status.game_active);
    assert_eq!(status.turn, Seat::First);
    assert!(status.board.cells().iter().all(Option::is_none));
    assert_eq!(status.players, ["Ana", "Bo"]);
}

#[test]
fn test_start_without_opponent_is_allowed() {
    let engine = engine();
    let code = engine.create_room("Solo", "Ana").unwrap();
    engine.start_game(code.as_str()).unwrap();
    assert!(engine.room_status(code.as_str()).unwrap().game_active);
}

#[test]
fn test_codes_are_unique_four_digit_numbers() {
    let engine = engine();
    let mut seen = std::collections::HashSet::new();
    for i in 0..200 {
        let code = engine.create_room(&format!("room {i}"), "Ana").unwrap();
        let number: u16 = code.as_str().parse().unwrap();
        assert!((1000..=9999).contains(&number));
        assert!(seen.insert(code));
    }
}

#[test]
fn test_capacity_exhausted_when_every_code_is_taken() {
    let store = Arc::new(MemoryStore::new());
    for number in 1000..=9999 {
        let code = RoomCode::from_number(number).unwrap();
        store
            .save(&Room::new(code, "full".into(), "Ana".into(), chrono::Utc::now()))
            .unwrap();
    }
    let engine = SessionEngine::with_seed(store, 1).with_code_attempts(8);
    let err = engine.create_room("One more", "Ana").unwrap_err();
    assert!(matches!(err, EngineError::CapacityExhausted { attempts: 8 }));
    assert!(!err.is_client_error());
}

#[test]
fn test_store_errors_are_server_errors() {
    let err = EngineError::from(tictactoe_lobby::StoreError::new(
        StoreErrorKind::Unavailable,
        "down",
    ));
    assert!(!err.is_client_error());
}
