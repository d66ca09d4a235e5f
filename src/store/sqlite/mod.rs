//! SQLite room store.
//!
//! Rooms are spread over `rooms`, `players` and `board_cells`. Each mutation
//! runs in a `BEGIN IMMEDIATE` transaction, which takes the database write
//! lock before the room is read; concurrent writers wait up to the busy
//! timeout.

mod models;
mod schema;

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{Commit, RoomStore, StoreError};
use crate::room::{Room, RoomCode};
use models::{CellRow, PlayerRow, RoomRow, cell_rows, player_rows};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Room store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    database_url: String,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Connects to the database and applies pending migrations.
    ///
    /// Each operation opens its own connection, so `database_url` must name a
    /// file; `":memory:"` would give every operation a fresh empty database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the database cannot be opened or migrated.
    #[instrument(skip(database_url), fields(database_url = %database_url))]
    pub fn open(database_url: String, busy_timeout: Duration) -> Result<Self, StoreError> {
        info!("Opening SQLite room store");
        let store = Self {
            database_url,
            busy_timeout,
        };
        let mut conn = store.connection()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::unavailable(format!("Migrations failed: {}", e)))?;
        info!(applied = applied.len(), "Migrations applied");
        Ok(store)
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, StoreError> {
        debug!(url = %self.database_url, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.database_url).map_err(|e| {
            StoreError::unavailable(format!("Failed to connect to '{}': {}", self.database_url, e))
        })?;
        conn.batch_execute(&format!(
            "PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))?;
        Ok(conn)
    }
}

fn load_room(conn: &mut SqliteConnection, code: &RoomCode) -> Result<Option<Room>, StoreError> {
    use schema::{board_cells, players, rooms};

    let Some(row) = rooms::table
        .find(code.as_str())
        .select(RoomRow::as_select())
        .first(conn)
        .optional()?
    else {
        return Ok(None);
    };

    let seated = players::table
        .filter(players::room_code.eq(code.as_str()))
        .order(players::seat.asc())
        .select(PlayerRow::as_select())
        .load(conn)?;

    let cells = board_cells::table
        .filter(board_cells::room_code.eq(code.as_str()))
        .select(CellRow::as_select())
        .load(conn)?;

    row.into_room(seated, cells).map(Some)
}

fn write_room(conn: &mut SqliteConnection, room: &Room) -> Result<(), StoreError> {
    use schema::{board_cells, players, rooms};

    let code = room.code().as_str();
    diesel::replace_into(rooms::table)
        .values(&RoomRow::from_room(room))
        .execute(conn)?;

    diesel::delete(players::table.filter(players::room_code.eq(code))).execute(conn)?;
    diesel::insert_into(players::table)
        .values(&player_rows(room))
        .execute(conn)?;

    diesel::delete(board_cells::table.filter(board_cells::room_code.eq(code))).execute(conn)?;
    let cells = cell_rows(room);
    if !cells.is_empty() {
        diesel::insert_into(board_cells::table)
            .values(&cells)
            .execute(conn)?;
    }
    Ok(())
}

impl RoomStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self), fields(room_code = %code))]
    fn load(&self, code: &RoomCode) -> Result<Option<Room>, StoreError> {
        let mut conn = self.connection()?;
        // One read transaction so the three tables come from the same commit.
        conn.transaction(|conn| load_room(conn, code))
    }

    #[instrument(skip(self, room), fields(room_code = %room.code()))]
    fn save(&self, room: &Room) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction(|conn| write_room(conn, room))
    }

    #[instrument(skip(self, transform), fields(room_code = %code))]
    fn read_modify_write(
        &self,
        code: &RoomCode,
        transform: &mut dyn FnMut(Option<Room>) -> Commit,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        conn.immediate_transaction(|conn| {
            let current = load_room(conn, code)?;
            match transform(current) {
                Commit::Write(next) => {
                    write_room(conn, &next)?;
                    debug!("Room row committed");
                }
                Commit::Keep => debug!("Transform kept room unchanged"),
            }
            Ok(())
        })
    }
}
