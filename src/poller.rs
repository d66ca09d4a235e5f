//! Terminal poller for a room, the way a browser client watches it.

use anyhow::{Context, Result, bail};
use std::time::Duration;
use tictactoe_rules::{Outcome, Seat};
use tracing::{debug, info, instrument, warn};

use crate::api::RoomStatusResponse;

/// Default delay between two status requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Polls `GET /room-status` for one room.
#[derive(Debug, Clone)]
pub struct RoomWatcher {
    client: reqwest::Client,
    base_url: String,
    room_code: String,
}

impl RoomWatcher {
    /// Creates a watcher for `room_code` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, room_code: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            room_code: room_code.into(),
        }
    }

    /// Fetches the room once. `None` means the server does not know the room.
    ///
    /// # Errors
    ///
    /// Transport failures and non-2xx replies (such as a store outage) are
    /// errors; the room may still exist.
    #[instrument(skip(self), fields(room_code = %self.room_code))]
    pub async fn fetch(&self) -> Result<Option<RoomStatusResponse>> {
        let response = self
            .client
            .get(format!("{}/room-status?code={}", self.base_url, self.room_code))
            .send()
            .await
            .context("Status request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Server answered {}: {}", status, text);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .context("Status response is not JSON")?;

        if body.get("success").and_then(|s| s.as_bool()) != Some(true) {
            debug!(?body, "Room not available");
            return Ok(None);
        }
        let status = serde_json::from_value(body).context("Unexpected status layout")?;
        Ok(Some(status))
    }

    /// Prints the room on every change until it disappears or Ctrl-C.
    #[instrument(skip(self), fields(room_code = %self.room_code))]
    pub async fn watch(&self, interval: Duration) -> Result<()> {
        info!(?interval, "Watching room");
        let mut ticker = tokio::time::interval(interval);
        let mut last: Option<RoomStatusResponse> = None;
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }
            match self.fetch().await {
                Ok(Some(status)) => {
                    if last.as_ref() != Some(&status) {
                        println!("{}\n", render_status(&self.room_code, &status));
                        last = Some(status);
                    }
                }
                Ok(None) => {
                    println!("Room {} no longer exists.", self.room_code);
                    return Ok(());
                }
                Err(e) => warn!(error = %e, "Poll failed, retrying"),
            }
        }
    }
}

fn seat_label(players: &[String], seat: Seat) -> String {
    let name = players
        .get(seat.index())
        .map(String::as_str)
        .unwrap_or("(waiting)");
    format!("{} ({})", name, seat.mark())
}

/// Formats a room status for the terminal.
pub fn render_status(room_code: &str, status: &RoomStatusResponse) -> String {
    let header = format!(
        "Room {}: {} vs {}",
        room_code,
        seat_label(&status.players, Seat::First),
        seat_label(&status.players, Seat::Second)
    );
    let footer = match (status.winner, status.game_active) {
        (Some(Outcome::Draw), _) => "Result: draw".to_string(),
        (Some(Outcome::Win(mark)), _) => {
            let seat = if mark == Seat::First.mark() {
                Seat::First
            } else {
                Seat::Second
            };
            format!("Winner: {}", seat_label(&status.players, seat))
        }
        (None, true) => {
            let seat = Seat::from_index(status.turn_index as i64).unwrap_or(Seat::First);
            format!("Turn: {}", seat_label(&status.players, seat))
        }
        (None, false) => "Waiting for the game to start".to_string(),
    };
    format!("{}\n{}\n{}", header, status.board.display(), footer)
}
