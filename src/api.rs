//! HTTP surface of the lobby.
//!
//! JSON bodies use camelCase field names. Client errors (unknown room, full
//! room, illegal move) answer `200` with `success: false` and a `message`;
//! store failures answer `500` with the same body shape.

use axum::body::Body;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tictactoe_rules::{Board, Outcome};
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

use crate::engine::SessionEngine;
use crate::error::EngineError;
use crate::room::{RoomCode, RoomStatus};

/// Shared handler state.
pub type AppState = Arc<SessionEngine>;

/// Body of `POST /create-room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Display name of the room.
    pub room_name: String,
    /// Name of the creator, seated first.
    pub creator_name: String,
}

/// Reply to `POST /create-room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    /// Always `true`.
    pub success: bool,
    /// Code of the new room.
    pub room_code: RoomCode,
}

/// Body of `POST /join-room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Room to join.
    pub room_code: String,
    /// Joining player.
    pub player_name: String,
}

/// Reply to `POST /join-room`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    /// Always `true`; refusals use the failure body.
    pub success: bool,
    /// Display name of the joined room.
    pub room_name: String,
    /// Seat held by the player.
    pub player_index: usize,
}

/// Body of `POST /start-game` and `POST /reset-game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCodeRequest {
    /// Target room.
    pub room_code: String,
}

/// Body of `POST /make-move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeMoveRequest {
    /// Target room.
    pub room_code: String,
    /// Cell `0..=8`, row-major.
    #[serde(alias = "index")]
    pub cell_index: i64,
    /// Seat of the mover.
    pub player_index: i64,
}

/// Query of `GET /room-status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    /// Room code.
    #[serde(default)]
    pub code: String,
}

/// Bare acknowledgement, also used for every failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Whether the operation took effect.
    pub success: bool,
    /// Reason for a failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    /// Success without a message.
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    /// Failure carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Reply to `GET /room-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatusResponse {
    /// Always `true`; unknown rooms use the failure body.
    pub success: bool,
    /// Player names in join order.
    pub players: Vec<String>,
    /// Whether moves are accepted.
    pub game_active: bool,
    /// Seat to move next.
    pub turn_index: usize,
    /// `null`, `"X"`, `"O"` or `"Draw"`.
    pub winner: Option<Outcome>,
    /// Nine cells, `null` when empty.
    pub board: Board,
}

impl From<RoomStatus> for RoomStatusResponse {
    fn from(status: RoomStatus) -> Self {
        Self {
            success: true,
            players: status.players,
            game_active: status.game_active,
            turn_index: status.turn.index(),
            winner: status.winner,
            board: status.board,
        }
    }
}

/// Failure of a request handler.
#[derive(Debug, Display)]
pub enum ApiError {
    /// The engine refused or failed.
    #[display("{}", _0)]
    Engine(EngineError),
    /// The request body or query could not be decoded.
    #[display("Malformed request: {}", _0)]
    Malformed(String),
    /// The blocking task panicked or was cancelled.
    #[display("Worker task failed: {}", _0)]
    Worker(String),
}

impl std::error::Error for ApiError {}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Engine(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Malformed(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Worker(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Engine(e) if e.is_client_error() => {
                debug!(error = %e, "Client error");
                StatusCode::OK
            }
            ApiError::Malformed(reason) => {
                warn!(%reason, "Malformed request");
                StatusCode::BAD_REQUEST
            }
            other => {
                error!(error = %other, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match self {
            ApiError::Engine(e) => e.to_string(),
            other => other.to_string(),
        };
        (status, Json(SuccessResponse::failure(message))).into_response()
    }
}

/// Runs an engine call on the blocking pool.
async fn run_blocking<T, F>(engine: &AppState, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&SessionEngine) -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    let engine = Arc::clone(engine);
    let result = tokio::task::spawn_blocking(move || op(&engine)).await?;
    Ok(result?)
}

#[instrument]
async fn health() -> &'static str {
    "OK"
}

#[instrument(skip_all)]
async fn create_room(
    State(engine): State<AppState>,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let Json(req) = payload?;
    let room_code = run_blocking(&engine, move |engine| {
        engine.create_room(&req.room_name, &req.creator_name)
    })
    .await?;
    Ok(Json(CreateRoomResponse {
        success: true,
        room_code,
    }))
}

#[instrument(skip_all)]
async fn join_room(
    State(engine): State<AppState>,
    payload: Result<Json<JoinRoomRequest>, JsonRejection>,
) -> Result<Json<JoinRoomResponse>, ApiError> {
    let Json(req) = payload?;
    let joined =
        run_blocking(&engine, move |engine| engine.join_room(&req.room_code, &req.player_name))
            .await?;
    Ok(Json(JoinRoomResponse {
        success: true,
        room_name: joined.room_name,
        player_index: joined.outcome.seat().index(),
    }))
}

#[instrument(skip_all)]
async fn start_game(
    State(engine): State<AppState>,
    payload: Result<Json<RoomCodeRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    run_blocking(&engine, move |engine| engine.start_game(&req.room_code)).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip_all)]
async fn reset_game(
    State(engine): State<AppState>,
    payload: Result<Json<RoomCodeRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    run_blocking(&engine, move |engine| engine.reset_game(&req.room_code)).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip_all)]
async fn make_move(
    State(engine): State<AppState>,
    payload: Result<Json<MakeMoveRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(req) = payload?;
    run_blocking(&engine, move |engine| {
        engine.make_move(&req.room_code, req.cell_index, req.player_index)
    })
    .await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip_all)]
async fn room_status(
    State(engine): State<AppState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<RoomStatusResponse>, ApiError> {
    let Query(query) = query?;
    let status = run_blocking(&engine, move |engine| engine.room_status(&query.code)).await?;
    Ok(Json(status.into()))
}

fn log_request(req: Request<Body>) -> Request<Body> {
    debug!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

/// Builds the lobby router over `engine`.
#[instrument(skip(engine))]
pub fn router(engine: AppState) -> Router {
    info!("Building lobby router");
    Router::new()
        .route("/health", get(health))
        .route("/create-room", post(create_room))
        .route("/join-room", post(join_room))
        .route("/start-game", post(start_game))
        .route("/reset-game", post(reset_game))
        .route("/make-move", post(make_move))
        .route("/room-status", get(room_status))
        .layer(ServiceBuilder::new().map_request(log_request))
        .with_state(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_request_accepts_index_alias() {
        let req: MakeMoveRequest =
            serde_json::from_str(r#"{"roomCode":"4821","index":4,"playerIndex":1}"#).unwrap();
        assert_eq!(req.cell_index, 4);
        assert_eq!(req.player_index, 1);

        let req: MakeMoveRequest =
            serde_json::from_str(r#"{"roomCode":"4821","cellIndex":7,"playerIndex":0}"#).unwrap();
        assert_eq!(req.cell_index, 7);
    }

    #[test]
    fn test_failure_body_shape() {
        let json = serde_json::to_value(SuccessResponse::failure("Room 1234 not found")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "message": "Room 1234 not found"})
        );
        let json = serde_json::to_value(SuccessResponse::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));
    }
}
