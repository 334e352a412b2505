//! Application state: the shared content store and the registry of HTTP lesson sessions.
//!
//! This module owns:
//!   - the content store (course tree, answer material, word bank, progress)
//!   - HTTP lesson sessions keyed by session id
//!
//! HTTP sessions leave the registry when they finish, when the client deletes
//! them, or when they sit idle past the timeout (swept whenever a new session
//! starts).
//!
//! Startup loads the built-in seed course (unless LOAD_SEED=false) and then the
//! optional TOML content bank from CONTENT_PATH. WebSocket sessions are not kept
//! here; each connection owns its own.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_content_bank_from_env, seed_enabled_from_env, session_idle_timeout_from_env};
use crate::domain::Id;
use crate::error::AppError;
use crate::seeds::seed_bank;
use crate::session::{LessonSession, Outcome, SessionSnapshot};
use crate::render::{Action, Target};
use crate::store::Store;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub sessions: Arc<RwLock<HashMap<Uuid, LessonSession>>>,
    pub idle_timeout: Duration,
}

impl AppState {
    /// Build state from env: seed fixture, then the optional content bank.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let mut store = Store::default();

        if seed_enabled_from_env() {
            match seed_bank().load_into(&mut store) {
                Ok(summary) => info!(target: "content", courses = summary.courses, lessons = summary.lessons, challenges = summary.challenges, words = summary.words, "Seed course loaded"),
                Err(e) => error!(target: "content", error = %e, "Seed course failed to load"),
            }
        } else {
            info!(target: "content", "LOAD_SEED disabled; starting without the built-in course");
        }

        if let Some(bank) = load_content_bank_from_env() {
            match bank.load_into(&mut store) {
                Ok(summary) => info!(target: "content", courses = summary.courses, lessons = summary.lessons, challenges = summary.challenges, words = summary.words, "Content bank loaded"),
                Err(e) => error!(target: "content", error = %e, "Content bank rejected; keeping previously loaded content"),
            }
        }

        // Inventory summary: degenerate challenges render, but authors should hear about them.
        let lesson_ids: Vec<_> = store.lessons.iter().map(|l| l.id).collect();
        for lesson_id in lesson_ids {
            if let Ok(warnings) = store.validate_lesson(lesson_id) {
                for w in warnings {
                    warn!(target: "content", lesson_id, warning = %w, "Incomplete challenge");
                }
            }
        }
        info!(target: "content", courses = store.courses.len(), lessons = store.lessons.len(), challenges = store.challenges.len(), "Startup content inventory");

        Self::with_store(store).with_idle_timeout(session_idle_timeout_from_env())
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Drop sessions idle for at least `idle_timeout`. Returns how many went.
    pub async fn sweep_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let timeout = self.idle_timeout;
        sessions.retain(|_, s| s.idle_for() < timeout);
        let dropped = before - sessions.len();
        if dropped > 0 {
            info!(target: "session", dropped, remaining = sessions.len(), "Idle sessions released");
        }
        dropped
    }

    /// Abandon a session before it finishes.
    pub async fn end_session(&self, id: Uuid) -> Result<(), AppError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!(target: "session", %id, "Session abandoned");
                Ok(())
            }
            None => Err(AppError::NotFound { table: "sessions", id: id.to_string() }),
        }
    }

    /// Start a lesson session and register it.
    #[instrument(level = "info", skip(self))]
    pub async fn start_session(&self, lesson_id: Id, user_id: &str) -> Result<SessionSnapshot, AppError> {
        let session = {
            let mut store = self.store.write().await;
            let course = store.course_of_lesson(lesson_id);
            let session = LessonSession::start(&store, lesson_id, user_id)?;
            store.ensure_user(user_id, course);
            session
        };
        let snapshot = session.snapshot();
        self.sweep_idle().await;
        self.sessions.write().await.insert(session.id, session);
        Ok(snapshot)
    }

    pub async fn session_snapshot(&self, id: Uuid) -> Result<SessionSnapshot, AppError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .map(LessonSession::snapshot)
            .ok_or_else(|| AppError::NotFound { table: "sessions", id: id.to_string() })
    }

    async fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut LessonSession, &mut Store) -> Result<T, AppError>,
    ) -> Result<(T, SessionSnapshot), AppError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound { table: "sessions", id: id.to_string() })?;
        session.touch();
        let mut store = self.store.write().await;
        let out = f(session, &mut *store)?;
        Ok((out, session.snapshot()))
    }

    pub async fn session_action(&self, id: Uuid, action: Action) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, |s, _| s.apply(action)).await.map(|(_, snap)| snap)
    }

    pub async fn session_click(&self, id: Uuid, target: Target) -> Result<SessionSnapshot, AppError> {
        self.with_session(id, |s, _| s.click(target)).await.map(|(_, snap)| snap)
    }

    pub async fn session_submit(&self, id: Uuid) -> Result<(Outcome, SessionSnapshot), AppError> {
        self.with_session(id, |s, store| s.submit(store)).await
    }

    /// Retry after a wrong answer, advance otherwise. Finished sessions are dropped from the registry.
    pub async fn session_continue(&self, id: Uuid) -> Result<SessionSnapshot, AppError> {
        let (_, snap) = self.with_session(id, |s, store| s.proceed(store)).await?;
        if snap.view.is_none() {
            self.sessions.write().await.remove(&id);
            info!(target: "session", %id, "Finished session released");
        }
        Ok(snap)
    }
}
