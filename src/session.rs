//! Lesson sessions: the explicit submission state machine and the controller
//! that owns one learner's ephemeral selection state while they work through a
//! lesson.
//!
//! The renderer stays stateless. A session keeps the selection for the current
//! challenge only, re-renders it on demand, evaluates submissions against the
//! `correct` flags of the options, and throws the selection away when the
//! learner moves on.

use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ChallengeOption, ChallengeType, Id};
use crate::error::AppError;
use crate::render::{
    arranged_options, render, Action, ArrangeMove, ChallengeHandler, ChallengeView, Exercise, PairSelection,
    Selection, SubmissionStatus, Target,
};
use crate::store::{ChallengeBundle, Store};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Presenting,
    Selecting,
    SubmittedCorrect,
    SubmittedWrong,
    Finished,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Presenting => "presenting",
            SessionState::Selecting => "selecting",
            SessionState::SubmittedCorrect => "submitted_correct",
            SessionState::SubmittedWrong => "submitted_wrong",
            SessionState::Finished => "finished",
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        match self {
            SessionState::SubmittedCorrect => SubmissionStatus::Correct,
            SessionState::SubmittedWrong => SubmissionStatus::Wrong,
            _ => SubmissionStatus::None,
        }
    }

    /// Input is locked once an answer has been judged.
    pub fn accepts_input(&self) -> bool {
        matches!(self, SessionState::Presenting | SessionState::Selecting)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The learner touched the current exercise.
    Interact,
    /// The controller judged the learner's answer.
    Submit { correct: bool },
    /// Try the same challenge again after a wrong answer.
    Retry,
    /// Move past the current challenge. `read_only` challenges need no answer.
    Advance { has_next: bool, read_only: bool },
}

impl SessionEvent {
    fn as_str(&self) -> &'static str {
        match self {
            SessionEvent::Interact => "interact",
            SessionEvent::Submit { .. } => "submit",
            SessionEvent::Retry => "retry",
            SessionEvent::Advance { .. } => "advance",
        }
    }
}

/// Pure transition function of the submission state machine.
pub fn transition(state: SessionState, event: SessionEvent) -> Result<SessionState, AppError> {
    use SessionEvent::*;
    use SessionState::*;

    let next_or_finished = |has_next: bool| if has_next { Presenting } else { Finished };

    match (state, event) {
        (Presenting | Selecting, Interact) => Ok(Selecting),
        (Selecting, Submit { correct: true }) => Ok(SubmittedCorrect),
        (Selecting, Submit { correct: false }) => Ok(SubmittedWrong),
        (SubmittedWrong, Retry) => Ok(Presenting),
        (SubmittedCorrect, Advance { has_next, .. }) => Ok(next_or_finished(has_next)),
        (Presenting, Advance { has_next, read_only: true }) => Ok(next_or_finished(has_next)),
        (state, event) => Err(AppError::InvalidTransition {
            state: state.as_str().to_string(),
            event: event.as_str().to_string(),
        }),
    }
}

/// Applies callbacks to a selection. Ids outside the challenge are ignored here;
/// `LessonSession::apply` rejects them before dispatching.
struct SelectionEditor<'a> {
    bundle: &'a ChallengeBundle,
    selection: &'a mut Selection,
    mismatches: &'a mut usize,
}

impl SelectionEditor<'_> {
    fn has_option(&self, id: Id) -> bool {
        self.bundle.options.iter().any(|o| o.id == id)
    }

    fn has_pair(&self, id: Id) -> bool {
        self.bundle.matching_pairs.iter().any(|p| p.id == id)
    }

    fn is_matched(&self, id: Id) -> bool {
        self.selection
            .selected_pairs
            .iter()
            .any(|s| s.is_resolved() && s.left == Some(id))
    }
}

impl ChallengeHandler for SelectionEditor<'_> {
    fn on_select(&mut self, option_id: Id) {
        if self.has_option(option_id) {
            self.selection.selected_option = Some(option_id);
        }
    }

    fn on_pair_select(&mut self, left: Option<Id>, right: Option<Id>) {
        let usable = |id: Option<Id>| id.filter(|id| self.has_pair(*id) && !self.is_matched(*id));
        let (left, right) = (usable(left), usable(right));
        if left.is_none() && right.is_none() {
            return;
        }

        let pairs = &mut self.selection.selected_pairs;
        let pending = match pairs.iter().position(|s| !s.is_resolved()) {
            Some(i) => i,
            None => {
                pairs.push(PairSelection::default());
                pairs.len() - 1
            }
        };
        let entry = &mut pairs[pending];
        if left.is_some() {
            entry.left = left;
        }
        if right.is_some() {
            entry.right = right;
        }
        // Both sides picked but naming different pairs: a miss, start over.
        if entry.left.is_some() && entry.right.is_some() && !entry.is_resolved() {
            pairs.remove(pending);
            *self.mismatches += 1;
        }
    }

    fn on_arrange(&mut self, option_id: Id, position: ArrangeMove) {
        if !self.has_option(option_id) {
            return;
        }
        let arranged = &mut self.selection.arranged_order;
        arranged.retain(|id| *id != option_id);
        if let ArrangeMove::InsertAt(pos) = position {
            let pos = pos.min(arranged.len());
            arranged.insert(pos, option_id);
        }
    }
}

/// Result of judging one submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub challenge_id: Id,
    pub correct: bool,
    /// Options flagged correct, in display order. Empty for MATCHING.
    pub correct_option_ids: Vec<Id>,
}

/// What a client needs to draw the session.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub lesson_id: Id,
    pub state: SessionState,
    pub position: usize,
    pub total: usize,
    pub challenge_id: Option<Id>,
    /// MATCHING attempts on the current challenge that paired different rows.
    pub mismatches: usize,
    pub view: Option<ChallengeView>,
}

/// One learner working through one lesson.
#[derive(Clone, Debug)]
pub struct LessonSession {
    pub id: Uuid,
    pub lesson_id: Id,
    pub user_id: String,
    challenges: Vec<ChallengeBundle>,
    index: usize,
    state: SessionState,
    selection: Selection,
    mismatches: usize,
    last_active: Instant,
}

fn correct_ids(options: &[ChallengeOption]) -> Vec<Id> {
    options.iter().filter(|o| o.correct).map(|o| o.id).collect()
}

impl LessonSession {
    /// Snapshot the lesson's challenges and start at the first one.
    #[instrument(level = "info", skip(store))]
    pub fn start(store: &Store, lesson_id: Id, user_id: &str) -> Result<Self, AppError> {
        let challenges = store.lesson_challenges(lesson_id)?;
        if challenges.is_empty() {
            return Err(AppError::Validation(format!("lesson {} has no challenges", lesson_id)));
        }
        let session = Self {
            id: Uuid::new_v4(),
            lesson_id,
            user_id: user_id.to_string(),
            challenges,
            index: 0,
            state: SessionState::Presenting,
            selection: Selection::default(),
            mismatches: 0,
            last_active: Instant::now(),
        };
        info!(target: "session", id = %session.id, lesson_id, total = session.challenges.len(), "Lesson session started");
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    pub fn current(&self) -> Option<&ChallengeBundle> {
        if self.state == SessionState::Finished {
            None
        } else {
            self.challenges.get(self.index)
        }
    }

    fn current_or_err(&self) -> Result<&ChallengeBundle, AppError> {
        self.current().ok_or_else(|| AppError::InvalidTransition {
            state: self.state.as_str().to_string(),
            event: "interact".to_string(),
        })
    }

    pub fn view(&self) -> Option<ChallengeView> {
        let bundle = self.current()?;
        let exercise = Exercise::new(
            bundle.challenge.kind,
            &bundle.options,
            &bundle.matching_pairs,
            &self.selection,
        );
        Some(render(&bundle.challenge.question, &exercise, self.state.status(), !self.state.accepts_input()))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            lesson_id: self.lesson_id,
            state: self.state,
            position: self.index.min(self.challenges.len()),
            total: self.challenges.len(),
            challenge_id: self.current().map(|b| b.challenge.id),
            mismatches: self.mismatches,
            view: self.view(),
        }
    }

    /// Apply a callback coming from the client.
    #[instrument(level = "debug", skip(self), fields(id = %self.id))]
    pub fn apply(&mut self, action: Action) -> Result<(), AppError> {
        let bundle = self.current_or_err()?;
        let kind = bundle.challenge.kind;
        let has_option = |id: Id| bundle.options.iter().any(|o| o.id == id);
        let has_pair = |id: Id| bundle.matching_pairs.iter().any(|p| p.id == id);

        match action {
            Action::Select { option_id } => {
                if !matches!(kind, ChallengeType::Select | ChallengeType::Assist | ChallengeType::FillBlank) {
                    return Err(AppError::Validation(format!("{} does not take single selections", kind)));
                }
                if !has_option(option_id) {
                    return Err(AppError::Validation(format!("option {} is not part of this challenge", option_id)));
                }
            }
            Action::PairSelect { left, right } => {
                if kind != ChallengeType::Matching {
                    return Err(AppError::Validation(format!("{} does not take pair selections", kind)));
                }
                if left.is_none() && right.is_none() {
                    return Err(AppError::Validation("pair selection names neither side".into()));
                }
                if let Some(bad) = [left, right].into_iter().flatten().find(|id| !has_pair(*id)) {
                    return Err(AppError::Validation(format!("pair {} is not part of this challenge", bad)));
                }
            }
            Action::Arrange { option_id, .. } => {
                if kind != ChallengeType::Arrange {
                    return Err(AppError::Validation(format!("{} does not take arrange moves", kind)));
                }
                if !has_option(option_id) {
                    return Err(AppError::Validation(format!("option {} is not part of this challenge", option_id)));
                }
            }
        }

        let next = transition(self.state, SessionEvent::Interact)?;
        let bundle = &self.challenges[self.index];
        action.dispatch(&mut SelectionEditor {
            bundle,
            selection: &mut self.selection,
            mismatches: &mut self.mismatches,
        });
        self.state = next;
        debug!(target: "session", id = %self.id, ?action, "Selection updated");
        Ok(())
    }

    /// Click an element of the current view.
    pub fn click(&mut self, target: Target) -> Result<(), AppError> {
        let view = self
            .view()
            .ok_or_else(|| AppError::Validation("session is finished".into()))?;
        let action = view
            .action_for(target)
            .ok_or_else(|| AppError::Validation(format!("{:?} is not clickable", target)))?;
        self.apply(action)
    }

    /// Judge the current selection. A correct answer is recorded as completed in `store`.
    #[instrument(level = "info", skip(self, store), fields(id = %self.id))]
    pub fn submit(&mut self, store: &mut Store) -> Result<Outcome, AppError> {
        let bundle = self.current_or_err()?;
        let challenge_id = bundle.challenge.id;
        let kind = bundle.challenge.kind;
        let correct_option_ids = correct_ids(&bundle.options);

        let correct = match kind {
            ChallengeType::VocabIntro => {
                return Err(AppError::Validation("VOCAB_INTRO has nothing to submit; continue instead".into()));
            }
            ChallengeType::Select | ChallengeType::Assist | ChallengeType::FillBlank => {
                let chosen = self
                    .selection
                    .selected_option
                    .ok_or_else(|| AppError::Validation("no option selected".into()))?;
                bundle.options.iter().any(|o| o.id == chosen && o.correct)
            }
            ChallengeType::Arrange => {
                let placed: Vec<Id> = arranged_options(&bundle.options, &self.selection.arranged_order)
                    .iter()
                    .map(|o| o.id)
                    .collect();
                if placed.is_empty() {
                    return Err(AppError::Validation("nothing arranged yet".into()));
                }
                placed == correct_option_ids
            }
            ChallengeType::Matching => {
                let exercise = Exercise::new(
                    ChallengeType::Matching,
                    &bundle.options,
                    &bundle.matching_pairs,
                    &self.selection,
                );
                if !exercise.is_complete() {
                    return Err(AppError::Validation("not every pair is matched yet".into()));
                }
                self.mismatches == 0
            }
        };

        let next = transition(self.state, SessionEvent::Submit { correct })?;
        if correct {
            store.mark_completed(&self.user_id, challenge_id)?;
        }
        self.state = next;
        info!(target: "session", id = %self.id, challenge_id, correct, "Submission judged");
        Ok(Outcome {
            challenge_id,
            correct,
            correct_option_ids,
        })
    }

    /// After a wrong answer: clear the selection and present the same challenge again.
    pub fn retry(&mut self) -> Result<(), AppError> {
        self.state = transition(self.state, SessionEvent::Retry)?;
        self.selection = Selection::default();
        self.mismatches = 0;
        Ok(())
    }

    /// Move to the next challenge, or finish. VOCAB_INTRO counts as completed here;
    /// a challenge without answer material is passed over without being recorded.
    #[instrument(level = "info", skip(self, store), fields(id = %self.id))]
    pub fn advance(&mut self, store: &mut Store) -> Result<(), AppError> {
        let bundle = self.current_or_err()?;
        let intro = bundle.challenge.kind == ChallengeType::VocabIntro;
        let read_only = intro || !bundle.has_material();
        let challenge_id = bundle.challenge.id;
        let has_next = self.index + 1 < self.challenges.len();

        let next = transition(self.state, SessionEvent::Advance { has_next, read_only })?;
        if intro {
            store.mark_completed(&self.user_id, challenge_id)?;
        } else if read_only && self.state == SessionState::Presenting {
            warn!(target: "session", id = %self.id, challenge_id, "Skipping challenge without answer material");
        }
        self.state = next;
        self.selection = Selection::default();
        self.mismatches = 0;
        if has_next {
            self.index += 1;
        } else {
            info!(target: "session", id = %self.id, lesson_id = self.lesson_id, "Lesson finished");
        }
        Ok(())
    }

    /// Retry after a wrong answer, advance otherwise.
    pub fn proceed(&mut self, store: &mut Store) -> Result<(), AppError> {
        if self.state == SessionState::SubmittedWrong {
            self.retry()
        } else {
            self.advance(store)
        }
    }
}
