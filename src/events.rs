//! Server-sent change feed. Mutating handlers broadcast which data
//! domain changed; clients re-fetch whatever views depend on it.

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::instrument;

use crate::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChanged {
    Meals,
    Water,
}

#[instrument(skip(state))]
pub async fn change_feed(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.id, "change feed subscribed");
    let stream = BroadcastStream::new(state.changes.subscribe()).filter_map(|msg| {
        // lagged receivers skip missed notifications
        let change = msg.ok()?;
        Event::default().json_data(&change).ok().map(Ok)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_serialize_as_snake_case() {
        assert_eq!(serde_json::to_string(&DataChanged::Meals).unwrap(), "\"meals\"");
        assert_eq!(serde_json::to_string(&DataChanged::Water).unwrap(), "\"water\"");
    }
}
