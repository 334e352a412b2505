//! Domain models: the course tree (course → unit → lesson → challenge), the
//! answer material owned by challenges (options, matching pairs), the word bank,
//! and per-user progress rows.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Row identifier. Tables assign ids serially starting at 1, so 0 never names a row.
pub type Id = u32;

/// Which exercise a challenge presents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeType {
  /// Pick the single correct answer.
  Select,
  /// Assisted word construction: one of several correct characters.
  Assist,
  /// Pick the word that fills the blank in the question.
  FillBlank,
  /// Pair Batak terms with their Indonesian translation.
  Matching,
  /// Put words in sentence order.
  Arrange,
  /// Read-only introduction of a new word.
  VocabIntro,
}

impl ChallengeType {
  pub const ALL: [ChallengeType; 6] = [
    ChallengeType::Select,
    ChallengeType::Assist,
    ChallengeType::FillBlank,
    ChallengeType::Matching,
    ChallengeType::Arrange,
    ChallengeType::VocabIntro,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      ChallengeType::Select => "SELECT",
      ChallengeType::Assist => "ASSIST",
      ChallengeType::FillBlank => "FILL_BLANK",
      ChallengeType::Matching => "MATCHING",
      ChallengeType::Arrange => "ARRANGE",
      ChallengeType::VocabIntro => "VOCAB_INTRO",
    }
  }

  /// Types whose answer material is a list of options (everything but MATCHING).
  pub fn uses_options(&self) -> bool {
    !matches!(self, ChallengeType::Matching)
  }
}

impl fmt::Display for ChallengeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ChallengeType {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ChallengeType::ALL
      .into_iter()
      .find(|t| t.as_str() == s)
      .ok_or_else(|| AppError::Validation(format!("unknown challenge type '{}'", s)))
  }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  #[serde(default)] pub id: Id,
  pub title: String,
  pub image_src: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
  #[serde(default)] pub id: Id,
  pub course_id: Id,
  pub title: String,
  pub description: String,
  pub order: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  #[serde(default)] pub id: Id,
  pub unit_id: Id,
  pub title: String,
  pub order: i32,
}

/// One exercise inside a lesson. `order` is unique within the lesson.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
  #[serde(default)] pub id: Id,
  pub lesson_id: Id,
  #[serde(rename = "type")]
  pub kind: ChallengeType,
  pub question: String,
  pub order: i32,
}

/// A selectable answer. Several options of one challenge may be correct (ASSIST, ARRANGE).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeOption {
  #[serde(default)] pub id: Id,
  #[serde(default)] pub challenge_id: Id,
  pub text: String,
  pub correct: bool,
  #[serde(default)] pub image_src: Option<String>,
  #[serde(default)] pub audio_src: Option<String>,
}

/// Batak/Indonesian term pair owned by a MATCHING challenge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
  #[serde(default)] pub id: Id,
  #[serde(default)] pub challenge_id: Id,
  pub batak: String,
  pub indonesia: String,
  #[serde(default)] pub image_src: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
  #[serde(default)] pub id: Id,
  pub batak: String,
  pub latin: String,
  pub indonesia: String,
  #[serde(default, rename = "type")] pub word_type: Option<String>,
  #[serde(default)] pub tags: Option<String>,
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub audio_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phrase {
  #[serde(default)] pub id: Id,
  pub batak: String,
  pub latin: String,
  pub indonesia: String,
  /// Comma separated word ids.
  #[serde(default)] pub component_word_ids: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopWord {
  #[serde(default)] pub id: Id,
  pub word: String,
  pub language: String,
}

/// Completion marker for one (user, challenge).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeProgress {
  #[serde(default)] pub id: Id,
  pub user_id: String,
  pub challenge_id: Id,
  #[serde(default)] pub completed: bool,
}

pub const MAX_HEARTS: i32 = 5;

/// Profile row keyed by user id. Data only; hearts/points are not driven here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
  pub user_id: String,
  pub user_name: String,
  pub user_image_src: String,
  #[serde(default)] pub active_course_id: Option<Id>,
  pub hearts: i32,
  pub points: i32,
}

impl UserProgress {
  pub fn new(user_id: impl Into<String>) -> Self {
    Self {
      user_id: user_id.into(),
      user_name: "User".into(),
      user_image_src: "/mascot.svg".into(),
      active_course_id: None,
      hearts: MAX_HEARTS,
      points: 0,
    }
  }
}

/// Billing snapshot. Stored as data only; nothing here talks to a payment provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
  #[serde(default)] pub id: Id,
  pub user_id: String,
  pub stripe_customer_id: String,
  pub stripe_subscription_id: String,
  pub stripe_price_id: String,
  /// Unix seconds.
  pub stripe_current_period_end: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn challenge_type_parses_every_tag() {
    for t in ChallengeType::ALL {
      assert_eq!(t.as_str().parse::<ChallengeType>().unwrap(), t);
    }
    assert!("TRUE_FALSE".parse::<ChallengeType>().is_err());
    assert!("select".parse::<ChallengeType>().is_err());
  }

  #[test]
  fn challenge_serializes_type_tag() {
    let c = Challenge { id: 1, lesson_id: 2, kind: ChallengeType::FillBlank, question: "q".into(), order: 3 };
    let v = serde_json::to_value(&c).unwrap();
    assert_eq!(v["type"], "FILL_BLANK");
    assert_eq!(v["lessonId"], 2);
  }
}
