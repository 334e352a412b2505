//! WebSocket upgrade + message loop. Each connection owns at most one lesson
//! session; nothing about it is shared with other connections. Every client
//! message gets exactly one JSON reply.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::AppError;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::session::{LessonSession, SessionState};
use crate::state::AppState;
use crate::util::trunc_for_log;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "batak_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "batak_backend", "WebSocket connected");
  let mut session: Option<LessonSession> = None;

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "batak_backend", "WS received: {:?}", &incoming);
            respond(incoming, &state, &mut session).await
          }
          Err(e) => {
            warn!(target: "batak_backend", error = %e, payload = %trunc_for_log(&txt, 200), "WS invalid JSON");
            ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) }
          }
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "batak_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "batak_backend", in_lesson = session.is_some(), "WebSocket disconnected");
}

/// One reply per message; failures become an `error` reply and leave the session as it was.
async fn respond(msg: ClientWsMessage, state: &AppState, session: &mut Option<LessonSession>) -> ServerWsMessage {
  handle_client_ws(msg, state, session).await.unwrap_or_else(|e| {
    warn!(target: "session", error = %e, "WS request rejected");
    ServerWsMessage::Error { message: e.to_string() }
  })
}

fn active(session: &mut Option<LessonSession>) -> Result<&mut LessonSession, AppError> {
  session
    .as_mut()
    .ok_or_else(|| AppError::Validation("no lesson in progress; send start_lesson first".into()))
}

#[instrument(level = "debug", skip(state, session))]
async fn handle_client_ws(
  msg: ClientWsMessage,
  state: &AppState,
  session: &mut Option<LessonSession>,
) -> Result<ServerWsMessage, AppError> {
  match msg {
    ClientWsMessage::Ping => Ok(ServerWsMessage::Pong),

    ClientWsMessage::StartLesson { lesson_id, user_id } => {
      let mut store = state.store.write().await;
      let course = store.course_of_lesson(lesson_id);
      let started = LessonSession::start(&store, lesson_id, &user_id)?;
      store.ensure_user(&user_id, course);
      let snapshot = started.snapshot();
      if let Some(previous) = session.replace(started) {
        info!(target: "session", id = %previous.id, "WS session replaced by a new lesson");
      }
      Ok(ServerWsMessage::Session { session: snapshot })
    }

    ClientWsMessage::Action { action } => {
      let s = active(session)?;
      s.apply(action)?;
      Ok(ServerWsMessage::Session { session: s.snapshot() })
    }

    ClientWsMessage::Click { target } => {
      let s = active(session)?;
      s.click(target)?;
      Ok(ServerWsMessage::Session { session: s.snapshot() })
    }

    ClientWsMessage::Submit => {
      let s = active(session)?;
      let outcome = s.submit(&mut *state.store.write().await)?;
      Ok(ServerWsMessage::Result { outcome, session: s.snapshot() })
    }

    ClientWsMessage::Continue => {
      let s = active(session)?;
      let mut store = state.store.write().await;
      s.proceed(&mut store)?;
      if s.state() != SessionState::Finished {
        return Ok(ServerWsMessage::Session { session: s.snapshot() });
      }

      let lesson_id = s.lesson_id;
      let completed_challenge_ids = store
        .completed_challenges(&s.user_id)
        .into_iter()
        .filter(|id| store.challenges.get(*id).map(|c| c.lesson_id) == Some(lesson_id))
        .collect();
      *session = None;
      Ok(ServerWsMessage::Finished { lesson_id, completed_challenge_ids })
    }
  }
}
