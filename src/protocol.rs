//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{ChallengeOption, Id, Lesson, MatchingPair, UserProgress};
use crate::render::{Action, Selection, SubmissionStatus, Target};
use crate::session::{Outcome, SessionSnapshot};
use crate::store::ChallengeBundle;

fn anonymous() -> String {
    "anonymous".into()
}

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartLesson {
        #[serde(rename = "lessonId")]
        lesson_id: Id,
        #[serde(rename = "userId", default = "anonymous")]
        user_id: String,
    },
    Action {
        action: Action,
    },
    Click {
        target: Target,
    },
    Submit,
    Continue,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionSnapshot,
    },
    Result {
        outcome: Outcome,
        session: SessionSnapshot,
    },
    Finished {
        #[serde(rename = "lessonId")]
        lesson_id: Id,
        #[serde(rename = "completedChallengeIds")]
        completed_challenge_ids: Vec<Id>,
    },
    Error {
        message: String,
    },
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub parent_id: Option<Id>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOut {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub challenges: Vec<ChallengeBundle>,
    pub warnings: Vec<String>,
}

/// Stateless dispatcher call. `type` is taken raw: unknown tags render the fallback layout.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderIn {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<ChallengeOption>,
    #[serde(default)]
    pub matching_pairs: Vec<MatchingPair>,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub disabled: bool,
    #[serde(flatten)]
    pub selection: Selection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionIn {
    pub lesson_id: Id,
    #[serde(default = "anonymous")]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClickIn {
    pub target: Target,
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub outcome: Outcome,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub profile: Option<UserProgress>,
    pub completed_challenge_ids: Vec<Id>,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
