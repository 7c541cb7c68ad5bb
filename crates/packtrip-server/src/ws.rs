//! The realtime channel.
//!
//! One websocket per client. A connection is roomless until it sends a
//! `join_trip` frame; joining subscribes it to the trip's hub room, flips
//! the participant online, and announces `user_joined`. Leaving (explicit
//! or by disconnect) undoes all three.

use axum::{
  extract::{
    State, WebSocketUpgrade,
    ws::{Message, WebSocket},
  },
  response::Response,
};
use futures::{SinkExt as _, StreamExt as _, stream::SplitSink};
use packtrip_core::{
  event::{ClientFrame, ServerEvent},
  store::TripStore,
};
use packtrip_engine::ConnId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::AppState;

pub async fn handler<S: TripStore + 'static>(
  ws: WebSocketUpgrade,
  State(state): State<AppState<S>>,
) -> Response {
  ws.on_upgrade(move |socket| run(socket, state))
}

struct Session {
  trip_id: String,
  user_id: i64,
  conn:    ConnId,
  rx:      mpsc::UnboundedReceiver<serde_json::Value>,
}

async fn run<S: TripStore>(socket: WebSocket, state: AppState<S>) {
  let (mut sink, mut stream) = socket.split();
  let mut session: Option<Session> = None;

  loop {
    tokio::select! {
      inbound = stream.next() => {
        match inbound {
          Some(Ok(Message::Text(text))) => {
            let frame = match serde_json::from_str::<ClientFrame>(text.as_str()) {
              Ok(frame) => frame,
              Err(e) => {
                debug!(error = %e, "ignoring malformed client frame");
                continue;
              }
            };
            handle_frame(frame, &state, &mut session).await;
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            debug!(error = %e, "websocket read error");
            break;
          }
        }
      }
      Some(event) = room_event(&mut session) => {
        if forward(&mut sink, event).await.is_err() {
          break;
        }
      }
    }
  }

  // Disconnect without an explicit leave still announces the departure.
  leave(&state, &mut session).await;
}

/// The next hub event for the joined room; pends forever while roomless.
async fn room_event(session: &mut Option<Session>) -> Option<serde_json::Value> {
  match session {
    Some(s) => s.rx.recv().await,
    None => std::future::pending().await,
  }
}

async fn forward(
  sink: &mut SplitSink<WebSocket, Message>,
  event: serde_json::Value,
) -> Result<(), axum::Error> {
  sink.send(Message::Text(event.to_string().into())).await
}

async fn handle_frame<S: TripStore>(
  frame: ClientFrame,
  state: &AppState<S>,
  session: &mut Option<Session>,
) {
  match frame {
    ClientFrame::JoinTrip { trip_id, user_id } => {
      // Re-joining from the same socket moves the connection.
      leave(state, session).await;

      let hub = state.engine.hub();
      let (conn, rx) = hub.subscribe(&trip_id).await;
      if let Err(e) = state.engine.store().set_online(&trip_id, user_id, true).await {
        warn!(trip_id = %trip_id, user_id, error = %e, "failed to flip participant online");
      }
      hub.publish(&trip_id, &ServerEvent::UserJoined { user_id }, None).await;

      *session = Some(Session { trip_id, user_id, conn, rx });
    }
    ClientFrame::LeaveTrip => {
      leave(state, session).await;
    }
    ClientFrame::Typing => {
      if let Some(s) = session {
        state
          .engine
          .hub()
          .publish(&s.trip_id, &ServerEvent::Typing { user_id: s.user_id }, Some(s.conn))
          .await;
      }
    }
  }
}

async fn leave<S: TripStore>(state: &AppState<S>, session: &mut Option<Session>) {
  let Some(s) = session.take() else { return };

  let hub = state.engine.hub();
  hub.unsubscribe(&s.trip_id, s.conn).await;
  if let Err(e) = state.engine.store().set_online(&s.trip_id, s.user_id, false).await {
    warn!(trip_id = %s.trip_id, user_id = s.user_id, error = %e, "failed to flip participant offline");
  }
  hub.publish(&s.trip_id, &ServerEvent::UserLeft { user_id: s.user_id }, None).await;
}
