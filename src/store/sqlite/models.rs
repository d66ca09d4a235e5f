//! Row types and their conversion to and from [`Room`].

use chrono::NaiveDateTime;
use derive_new::new;
use diesel::prelude::*;
use tictactoe_rules::{Board, Mark, Outcome, Seat};
use tracing::instrument;

use super::schema;
use crate::room::{Room, RoomCode};
use crate::store::StoreError;

/// Row of the `rooms` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::rooms)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RoomRow {
    code: String,
    name: String,
    turn_index: i32,
    game_active: bool,
    winner: Option<String>,
    last_active: NaiveDateTime,
}

/// Row of the `players` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, new)]
#[diesel(table_name = schema::players)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PlayerRow {
    room_code: String,
    seat: i32,
    name: String,
}

/// Row of the `board_cells` table. Only occupied cells are stored.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, new)]
#[diesel(table_name = schema::board_cells)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CellRow {
    room_code: String,
    cell_index: i32,
    mark: String,
}

impl RoomRow {
    /// Builds the room row for `room`.
    pub fn from_room(room: &Room) -> Self {
        Self {
            code: room.code().to_string(),
            name: room.name().to_string(),
            turn_index: room.turn().index() as i32,
            game_active: room.game_active(),
            winner: room.winner().map(|w| w.to_string()),
            last_active: room.last_active().naive_utc(),
        }
    }

    /// Reassembles a room from its rows.
    ///
    /// # Errors
    ///
    /// Returns a corrupt-data [`StoreError`] if any column holds a value a
    /// room cannot have.
    #[instrument(skip_all, fields(room_code = %self.code))]
    pub fn into_room(self, players: Vec<PlayerRow>, cells: Vec<CellRow>) -> Result<Room, StoreError> {
        let code: RoomCode = self.code.parse().map_err(StoreError::corrupt)?;
        let turn = Seat::from_index(i64::from(self.turn_index))
            .ok_or_else(|| StoreError::corrupt(format!("Invalid turn index {}", self.turn_index)))?;
        let winner = self
            .winner
            .map(|w| w.parse::<Outcome>())
            .transpose()
            .map_err(StoreError::corrupt)?;

        let mut names = Vec::with_capacity(players.len());
        for (expected, player) in players.into_iter().enumerate() {
            if player.seat != expected as i32 {
                return Err(StoreError::corrupt(format!(
                    "Player '{}' at seat {}, expected seat {}",
                    player.name, player.seat, expected
                )));
            }
            names.push(player.name);
        }

        let mut board = Board::new();
        for cell in cells {
            let mark: Mark = cell
                .mark
                .parse()
                .map_err(|_| StoreError::corrupt(format!("Invalid mark '{}'", cell.mark)))?;
            let index = usize::try_from(cell.cell_index)
                .map_err(|_| StoreError::corrupt(format!("Invalid cell {}", cell.cell_index)))?;
            board
                .place(index, mark)
                .map_err(|e| StoreError::corrupt(e.to_string()))?;
        }

        let room = Room::from_parts(
            code,
            self.name,
            names,
            board,
            turn,
            self.game_active,
            winner,
            self.last_active.and_utc(),
        )?;
        Ok(room)
    }
}

/// Player rows for `room`, in seat order.
pub fn player_rows(room: &Room) -> Vec<PlayerRow> {
    room.players()
        .iter()
        .enumerate()
        .map(|(seat, name)| PlayerRow::new(room.code().to_string(), seat as i32, name.clone()))
        .collect()
}

/// Rows for the occupied cells of `room`.
pub fn cell_rows(room: &Room) -> Vec<CellRow> {
    room.board()
        .cells()
        .iter()
        .enumerate()
        .filter_map(|(index, cell)| {
            cell.map(|mark| CellRow::new(room.code().to_string(), index as i32, mark.to_string()))
        })
        .collect()
}
