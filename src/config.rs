//! Loading course content from a TOML content bank.
//!
//! The bank nests the course tree the way authors think about it:
//! course → units → lessons → challenges (with options or matching pairs),
//! plus the flat word bank tables. See `ContentBank` for the expected schema.
//! Orders default to the 1-based position inside the parent list.

use serde::Deserialize;
use tracing::{error, info, instrument};

use crate::domain::*;
use crate::error::AppError;
use crate::store::Store;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentBank {
  #[serde(default)] pub courses: Vec<CourseCfg>,
  #[serde(default)] pub words: Vec<WordCfg>,
  #[serde(default)] pub phrases: Vec<PhraseCfg>,
  #[serde(default)] pub stop_words: Vec<StopWordCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CourseCfg {
  pub title: String,
  pub image_src: String,
  #[serde(default)] pub units: Vec<UnitCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UnitCfg {
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub order: Option<i32>,
  #[serde(default)] pub lessons: Vec<LessonCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LessonCfg {
  pub title: String,
  #[serde(default)] pub order: Option<i32>,
  #[serde(default)] pub challenges: Vec<ChallengeCfg>,
}

/// Challenge entry. `type` is kept raw so a typo is reported with its location.
#[derive(Clone, Debug, Deserialize)]
pub struct ChallengeCfg {
  #[serde(rename = "type")] pub kind: String,
  pub question: String,
  #[serde(default)] pub order: Option<i32>,
  // SELECT / ASSIST / FILL_BLANK / ARRANGE / VOCAB_INTRO
  #[serde(default)] pub options: Vec<OptionCfg>,
  // MATCHING
  #[serde(default)] pub pairs: Vec<PairCfg>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OptionCfg {
  pub text: String,
  #[serde(default)] pub correct: bool,
  #[serde(default)] pub image_src: Option<String>,
  #[serde(default)] pub audio_src: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PairCfg {
  pub batak: String,
  pub indonesia: String,
  #[serde(default)] pub image_src: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WordCfg {
  pub batak: String,
  pub latin: String,
  pub indonesia: String,
  #[serde(default, rename = "type")] pub word_type: Option<String>,
  #[serde(default)] pub tags: Option<String>,
  #[serde(default)] pub image_url: Option<String>,
  #[serde(default)] pub audio_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PhraseCfg {
  pub batak: String,
  pub latin: String,
  pub indonesia: String,
  #[serde(default)] pub component_word_ids: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StopWordCfg {
  pub word: String,
  pub language: String,
}

/// Row counts inserted by one load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
  pub courses: usize,
  pub lessons: usize,
  pub challenges: usize,
  pub words: usize,
}

fn order_or_position(order: Option<i32>, index: usize) -> i32 {
  order.unwrap_or(index as i32 + 1)
}

impl ContentBank {
  pub fn parse(toml_src: &str) -> Result<Self, AppError> {
    toml::from_str(toml_src).map_err(|e| AppError::Config(e.to_string()))
  }

  /// Insert the whole bank. All-or-nothing: on error `store` is left untouched.
  #[instrument(level = "info", skip_all)]
  pub fn load_into(&self, store: &mut Store) -> Result<LoadSummary, AppError> {
    let mut staged = store.clone();
    let mut summary = LoadSummary::default();

    for course_cfg in &self.courses {
      let course = staged.create(Course {
        id: 0,
        title: course_cfg.title.clone(),
        image_src: course_cfg.image_src.clone(),
      })?;
      summary.courses += 1;

      for (ui, unit_cfg) in course_cfg.units.iter().enumerate() {
        let unit = staged.create(Unit {
          id: 0,
          course_id: course.id,
          title: unit_cfg.title.clone(),
          description: unit_cfg.description.clone(),
          order: order_or_position(unit_cfg.order, ui),
        })?;

        for (li, lesson_cfg) in unit_cfg.lessons.iter().enumerate() {
          let lesson = staged.create(Lesson {
            id: 0,
            unit_id: unit.id,
            title: lesson_cfg.title.clone(),
            order: order_or_position(lesson_cfg.order, li),
          })?;
          summary.lessons += 1;

          for (ci, ch_cfg) in lesson_cfg.challenges.iter().enumerate() {
            let kind: ChallengeType = ch_cfg.kind.parse().map_err(|_| {
              AppError::Validation(format!(
                "course '{}' / lesson '{}' / challenge #{}: unknown challenge type '{}'",
                course_cfg.title, lesson_cfg.title, ci + 1, ch_cfg.kind
              ))
            })?;
            let challenge = staged.create(Challenge {
              id: 0,
              lesson_id: lesson.id,
              kind,
              question: ch_cfg.question.clone(),
              order: order_or_position(ch_cfg.order, ci),
            })?;
            summary.challenges += 1;

            for o in &ch_cfg.options {
              staged.create(ChallengeOption {
                id: 0,
                challenge_id: challenge.id,
                text: o.text.clone(),
                correct: o.correct,
                image_src: o.image_src.clone(),
                audio_src: o.audio_src.clone(),
              })?;
            }
            for p in &ch_cfg.pairs {
              staged.create(MatchingPair {
                id: 0,
                challenge_id: challenge.id,
                batak: p.batak.clone(),
                indonesia: p.indonesia.clone(),
                image_src: p.image_src.clone(),
              })?;
            }
          }
        }
      }
    }

    for w in &self.words {
      staged.create(Word {
        id: 0,
        batak: w.batak.clone(),
        latin: w.latin.clone(),
        indonesia: w.indonesia.clone(),
        word_type: w.word_type.clone(),
        tags: w.tags.clone(),
        image_url: w.image_url.clone(),
        audio_url: w.audio_url.clone(),
      })?;
      summary.words += 1;
    }
    for p in &self.phrases {
      staged.create(Phrase {
        id: 0,
        batak: p.batak.clone(),
        latin: p.latin.clone(),
        indonesia: p.indonesia.clone(),
        component_word_ids: p.component_word_ids.clone(),
      })?;
    }
    for s in &self.stop_words {
      staged.create(StopWord { id: 0, word: s.word.clone(), language: s.language.clone() })?;
    }

    *store = staged;
    Ok(summary)
  }
}

/// Attempt to load the content bank from CONTENT_PATH. On any IO/parse error, returns None.
pub fn load_content_bank_from_env() -> Option<ContentBank> {
  let path = std::env::var("CONTENT_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match ContentBank::parse(&s) {
      Ok(bank) => {
        info!(target: "batak_backend", %path, courses = bank.courses.len(), "Loaded content bank (TOML)");
        Some(bank)
      }
      Err(e) => {
        error!(target: "batak_backend", %path, error = %e, "Failed to parse TOML content bank");
        None
      }
    },
    Err(e) => {
      error!(target: "batak_backend", %path, error = %e, "Failed to read TOML content bank");
      None
    }
  }
}

/// LOAD_SEED=false|0 skips the built-in fixture.
pub fn seed_enabled_from_env() -> bool {
  !matches!(
    std::env::var("LOAD_SEED").ok().as_deref().map(str::to_ascii_lowercase).as_deref(),
    Some("false") | Some("0") | Some("no")
  )
}

/// SESSION_IDLE_SECS: how long an HTTP session may sit untouched (default 30 minutes).
pub fn session_idle_timeout_from_env() -> std::time::Duration {
  std::env::var("SESSION_IDLE_SECS")
    .ok()
    .and_then(|v| v.parse::<u64>().ok())
    .map(std::time::Duration::from_secs)
    .unwrap_or(crate::state::DEFAULT_IDLE_TIMEOUT)
}
