//! In-memory relational content store.
//!
//! Each table is an id-ordered map with a serial id counter. Referential rules
//! live on the `Record` impls: `check` runs before a row is written and
//! `cascade` removes dependents before a row is deleted, mirroring the
//! `ON DELETE CASCADE` foreign keys of the relational schema:
//!
//!   course → unit → lesson → challenge → {option, matching pair, progress}
//!   course → user progress (active course)

use std::collections::{BTreeMap, BTreeSet};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::domain::*;
use crate::error::AppError;

/// A table row addressable by `Id`.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;

    fn id(&self) -> Id;
    fn set_id(&mut self, id: Id);

    /// Owning row, used by list filters.
    fn parent_id(&self) -> Option<Id> {
        None
    }

    fn table(store: &Store) -> &Table<Self>;
    fn table_mut(store: &mut Store) -> &mut Table<Self>;

    /// Schema checks before insert (`existing == None`) or update.
    fn check(&self, _store: &Store, _existing: Option<&Self>) -> Result<(), AppError> {
        Ok(())
    }

    /// Remove rows that reference `id`.
    fn cascade(_store: &mut Store, _id: Id) {}
}

#[derive(Clone, Debug)]
pub struct Table<T> {
    rows: BTreeMap<Id, T>,
    next_id: Id,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { rows: BTreeMap::new(), next_id: 1 }
    }
}

impl<T: Record> Table<T> {
    pub fn get(&self, id: Id) -> Option<&T> {
        self.rows.get(&id)
    }

    pub fn contains(&self, id: Id) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    fn insert(&mut self, mut row: T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        row.set_id(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn ids_where(&self, pred: impl Fn(&T) -> bool) -> Vec<Id> {
        self.rows.values().filter(|r| pred(r)).map(|r| r.id()).collect()
    }
}

/// A challenge together with its answer material, in display order.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeBundle {
    #[serde(flatten)]
    pub challenge: Challenge,
    pub options: Vec<ChallengeOption>,
    pub matching_pairs: Vec<MatchingPair>,
}

impl ChallengeBundle {
    /// Whether the challenge has the answer material its type needs.
    pub fn has_material(&self) -> bool {
        if self.challenge.kind.uses_options() {
            !self.options.is_empty()
        } else {
            !self.matching_pairs.is_empty()
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Store {
    pub courses: Table<Course>,
    pub units: Table<Unit>,
    pub lessons: Table<Lesson>,
    pub challenges: Table<Challenge>,
    pub options: Table<ChallengeOption>,
    pub pairs: Table<MatchingPair>,
    pub words: Table<Word>,
    pub phrases: Table<Phrase>,
    pub stop_words: Table<StopWord>,
    pub progress: Table<ChallengeProgress>,
    pub subscriptions: Table<UserSubscription>,
    pub users: BTreeMap<String, UserProgress>,
}

impl Store {
    pub fn get<T: Record>(&self, id: Id) -> Result<T, AppError> {
        T::table(self)
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(T::TABLE, id))
    }

    /// All rows of `T`, optionally restricted to children of `parent`.
    pub fn list<T: Record>(&self, parent: Option<Id>) -> Vec<T> {
        T::table(self)
            .iter()
            .filter(|r| match (parent, r.parent_id()) {
                (Some(p), Some(own)) => own == p,
                _ => true,
            })
            .cloned()
            .collect()
    }

    #[instrument(level = "debug", skip(self, row), fields(table = T::TABLE))]
    pub fn create<T: Record>(&mut self, row: T) -> Result<T, AppError> {
        row.check(self, None)?;
        let row = T::table_mut(self).insert(row);
        debug!(target: "content", table = T::TABLE, id = row.id(), "Row created");
        Ok(row)
    }

    #[instrument(level = "debug", skip(self, row), fields(table = T::TABLE))]
    pub fn update<T: Record>(&mut self, id: Id, mut row: T) -> Result<T, AppError> {
        let existing = self.get::<T>(id)?;
        row.set_id(id);
        row.check(self, Some(&existing))?;
        T::table_mut(self).rows.insert(id, row.clone());
        debug!(target: "content", table = T::TABLE, id, "Row updated");
        Ok(row)
    }

    /// Delete a row and everything that depends on it.
    #[instrument(level = "info", skip(self), fields(table = T::TABLE))]
    pub fn delete<T: Record>(&mut self, id: Id) -> Result<(), AppError> {
        if !T::table(self).contains(id) {
            return Err(AppError::not_found(T::TABLE, id));
        }
        self.remove_cascading::<T>(id);
        info!(target: "content", table = T::TABLE, id, "Row deleted (cascade)");
        Ok(())
    }

    fn remove_cascading<T: Record>(&mut self, id: Id) {
        T::cascade(self, id);
        T::table_mut(self).rows.remove(&id);
    }

    fn remove_all<T: Record>(&mut self, ids: Vec<Id>) {
        for id in ids {
            self.remove_cascading::<T>(id);
        }
    }

    pub fn challenge_bundle(&self, challenge_id: Id) -> Result<ChallengeBundle, AppError> {
        let challenge = self.get::<Challenge>(challenge_id)?;
        Ok(ChallengeBundle {
            options: self.list::<ChallengeOption>(Some(challenge_id)),
            matching_pairs: self.list::<MatchingPair>(Some(challenge_id)),
            challenge,
        })
    }

    /// Challenges of a lesson ascending by `order`.
    pub fn lesson_challenges(&self, lesson_id: Id) -> Result<Vec<ChallengeBundle>, AppError> {
        if !self.lessons.contains(lesson_id) {
            return Err(AppError::not_found(Lesson::TABLE, lesson_id));
        }
        let mut challenges = self.list::<Challenge>(Some(lesson_id));
        challenges.sort_by_key(|c| (c.order, c.id));
        challenges
            .into_iter()
            .map(|c| self.challenge_bundle(c.id))
            .collect()
    }

    /// Challenges that would render degenerate: no options, or a MATCHING board with no pairs.
    pub fn validate_lesson(&self, lesson_id: Id) -> Result<Vec<String>, AppError> {
        let warnings = self
            .lesson_challenges(lesson_id)?
            .into_iter()
            .filter(|b| !b.has_material())
            .map(|b| {
                format!(
                    "challenge {} ({}) has no {}",
                    b.challenge.id,
                    b.challenge.kind,
                    if b.challenge.kind.uses_options() { "options" } else { "matching pairs" }
                )
            })
            .collect();
        Ok(warnings)
    }

    pub fn course_of_lesson(&self, lesson_id: Id) -> Option<Id> {
        let lesson = self.lessons.get(lesson_id)?;
        self.units.get(lesson.unit_id).map(|u| u.course_id)
    }

    /// Fetch or create the progress profile of `user_id`, pointing it at `course_id`.
    pub fn ensure_user(&mut self, user_id: &str, course_id: Option<Id>) -> UserProgress {
        let profile = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserProgress::new(user_id));
        if course_id.is_some() {
            profile.active_course_id = course_id;
        }
        profile.clone()
    }

    /// Record that `user_id` solved `challenge_id`. Idempotent. A challenge deleted
    /// since the session started is skipped.
    pub fn mark_completed(&mut self, user_id: &str, challenge_id: Id) -> Result<(), AppError> {
        if !self.challenges.contains(challenge_id) {
            warn!(target: "content", user_id, challenge_id, "Challenge no longer exists; progress not recorded");
            return Ok(());
        }
        let already = self
            .progress
            .iter()
            .any(|p| p.user_id == user_id && p.challenge_id == challenge_id && p.completed);
        if already {
            return Ok(());
        }
        self.create(ChallengeProgress {
            id: 0,
            user_id: user_id.to_string(),
            challenge_id,
            completed: true,
        })?;
        Ok(())
    }

    pub fn completed_challenges(&self, user_id: &str) -> Vec<Id> {
        self.progress
            .iter()
            .filter(|p| p.user_id == user_id && p.completed)
            .map(|p| p.challenge_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

fn require<T: Record>(store: &Store, id: Id) -> Result<(), AppError> {
    if T::table(store).contains(id) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} {} does not exist", T::TABLE, id)))
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

impl Record for Course {
    const TABLE: &'static str = "courses";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn table(s: &Store) -> &Table<Self> { &s.courses }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.courses }

    fn check(&self, _: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("title", &self.title)
    }

    fn cascade(store: &mut Store, id: Id) {
        let units = store.units.ids_where(|u| u.course_id == id);
        store.remove_all::<Unit>(units);
        store.users.retain(|_, u| u.active_course_id != Some(id));
    }
}

impl Record for Unit {
    const TABLE: &'static str = "units";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.course_id) }
    fn table(s: &Store) -> &Table<Self> { &s.units }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.units }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("title", &self.title)?;
        require::<Course>(store, self.course_id)
    }

    fn cascade(store: &mut Store, id: Id) {
        let lessons = store.lessons.ids_where(|l| l.unit_id == id);
        store.remove_all::<Lesson>(lessons);
    }
}

impl Record for Lesson {
    const TABLE: &'static str = "lessons";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.unit_id) }
    fn table(s: &Store) -> &Table<Self> { &s.lessons }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.lessons }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("title", &self.title)?;
        require::<Unit>(store, self.unit_id)
    }

    fn cascade(store: &mut Store, id: Id) {
        let challenges = store.challenges.ids_where(|c| c.lesson_id == id);
        store.remove_all::<Challenge>(challenges);
    }
}

impl Record for Challenge {
    const TABLE: &'static str = "challenges";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.lesson_id) }
    fn table(s: &Store) -> &Table<Self> { &s.challenges }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.challenges }

    fn check(&self, store: &Store, existing: Option<&Self>) -> Result<(), AppError> {
        non_empty("question", &self.question)?;
        require::<Lesson>(store, self.lesson_id)?;

        let clash = store
            .challenges
            .iter()
            .any(|c| c.lesson_id == self.lesson_id && c.order == self.order && c.id != self.id);
        if clash {
            return Err(AppError::Conflict(format!(
                "lesson {} already has a challenge with order {}",
                self.lesson_id, self.order
            )));
        }

        if let Some(prev) = existing {
            let has_material = store.options.iter().any(|o| o.challenge_id == prev.id)
                || store.pairs.iter().any(|p| p.challenge_id == prev.id);
            if prev.kind != self.kind && has_material {
                return Err(AppError::Conflict(format!(
                    "challenge {} is {} and already has answer material; type cannot change to {}",
                    prev.id, prev.kind, self.kind
                )));
            }
        }
        Ok(())
    }

    fn cascade(store: &mut Store, id: Id) {
        store.options.rows.retain(|_, o| o.challenge_id != id);
        store.pairs.rows.retain(|_, p| p.challenge_id != id);
        store.progress.rows.retain(|_, p| p.challenge_id != id);
    }
}

impl Record for ChallengeOption {
    const TABLE: &'static str = "challenge_options";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.challenge_id) }
    fn table(s: &Store) -> &Table<Self> { &s.options }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.options }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("text", &self.text)?;
        let owner = store
            .challenges
            .get(self.challenge_id)
            .ok_or_else(|| AppError::Validation(format!("challenges {} does not exist", self.challenge_id)))?;
        if !owner.kind.uses_options() {
            return Err(AppError::Validation(format!(
                "challenge {} is {}; use matching pairs instead of options",
                owner.id, owner.kind
            )));
        }
        Ok(())
    }
}

impl Record for MatchingPair {
    const TABLE: &'static str = "matching_pairs";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.challenge_id) }
    fn table(s: &Store) -> &Table<Self> { &s.pairs }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.pairs }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        let owner = store
            .challenges
            .get(self.challenge_id)
            .ok_or_else(|| AppError::Validation(format!("challenges {} does not exist", self.challenge_id)))?;
        if owner.kind != ChallengeType::Matching {
            return Err(AppError::Validation(format!(
                "matching pairs belong to MATCHING challenges; challenge {} is {}",
                owner.id, owner.kind
            )));
        }
        Ok(())
    }
}

impl Record for Word {
    const TABLE: &'static str = "words";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn table(s: &Store) -> &Table<Self> { &s.words }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.words }

    fn check(&self, _: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("batak", &self.batak)?;
        non_empty("latin", &self.latin)?;
        non_empty("indonesia", &self.indonesia)
    }

    /// Phrases keep their row; the deleted word drops out of `componentWordIds`.
    fn cascade(store: &mut Store, id: Id) {
        for phrase in store.phrases.rows.values_mut() {
            let Some(ids) = &phrase.component_word_ids else { continue };
            let kept: Vec<&str> = ids
                .split(',')
                .map(str::trim)
                .filter(|raw| !raw.is_empty() && raw.parse::<Id>().ok() != Some(id))
                .collect();
            phrase.component_word_ids = if kept.is_empty() { None } else { Some(kept.join(",")) };
        }
    }
}

impl Record for Phrase {
    const TABLE: &'static str = "phrases";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn table(s: &Store) -> &Table<Self> { &s.phrases }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.phrases }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("batak", &self.batak)?;
        if let Some(ids) = &self.component_word_ids {
            for raw in ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let id: Id = raw
                    .parse()
                    .map_err(|_| AppError::Validation(format!("bad word id '{}' in componentWordIds", raw)))?;
                require::<Word>(store, id)?;
            }
        }
        Ok(())
    }
}

impl Record for StopWord {
    const TABLE: &'static str = "stop_words";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn table(s: &Store) -> &Table<Self> { &s.stop_words }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.stop_words }

    fn check(&self, _: &Store, _: Option<&Self>) -> Result<(), AppError> {
        non_empty("word", &self.word)
    }
}

impl Record for ChallengeProgress {
    const TABLE: &'static str = "challenge_progress";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn parent_id(&self) -> Option<Id> { Some(self.challenge_id) }
    fn table(s: &Store) -> &Table<Self> { &s.progress }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.progress }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        require::<Challenge>(store, self.challenge_id)
    }
}

impl Record for UserSubscription {
    const TABLE: &'static str = "user_subscriptions";
    fn id(&self) -> Id { self.id }
    fn set_id(&mut self, id: Id) { self.id = id; }
    fn table(s: &Store) -> &Table<Self> { &s.subscriptions }
    fn table_mut(s: &mut Store) -> &mut Table<Self> { &mut s.subscriptions }

    fn check(&self, store: &Store, _: Option<&Self>) -> Result<(), AppError> {
        let taken = store
            .subscriptions
            .iter()
            .any(|s| s.id != self.id && (s.user_id == self.user_id || s.stripe_customer_id == self.stripe_customer_id || s.stripe_subscription_id == self.stripe_subscription_id));
        if taken {
            return Err(AppError::Conflict(format!("subscription for user '{}' already exists", self.user_id)));
        }
        Ok(())
    }
}
