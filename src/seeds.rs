//! Built-in Batak course: two lessons covering every challenge type, plus a
//! starter word bank. Guarantees the app is usable without a content bank.

use crate::config::{
  ChallengeCfg, ContentBank, CourseCfg, LessonCfg, OptionCfg, PairCfg, UnitCfg, WordCfg,
};

fn options(items: &[(&str, bool)]) -> Vec<OptionCfg> {
  items
    .iter()
    .map(|(text, correct)| OptionCfg { text: (*text).into(), correct: *correct, image_src: None, audio_src: None })
    .collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<PairCfg> {
  items
    .iter()
    .map(|(batak, indonesia)| PairCfg { batak: (*batak).into(), indonesia: (*indonesia).into(), image_src: None })
    .collect()
}

fn challenge(kind: &str, question: &str, opts: Vec<OptionCfg>, prs: Vec<PairCfg>) -> ChallengeCfg {
  ChallengeCfg { kind: kind.into(), question: question.into(), order: None, options: opts, pairs: prs }
}

fn word(batak: &str, latin: &str, indonesia: &str, word_type: &str, tags: &str) -> WordCfg {
  WordCfg {
    batak: batak.into(),
    latin: latin.into(),
    indonesia: indonesia.into(),
    word_type: Some(word_type.into()),
    tags: Some(tags.into()),
    image_url: None,
    audio_url: None,
  }
}

fn lesson_intro() -> LessonCfg {
  LessonCfg {
    title: "Pengenalan Kata".into(),
    order: Some(1),
    challenges: vec![
      challenge("VOCAB_INTRO", "Pelajari kata 'ibu' dalam aksara Batak", options(&[("ᯇᯉᯰᯰ", true)]), vec![]),
      challenge(
        "SELECT",
        "Yang mana terjemahan dari 'ibu'?",
        options(&[("ᯇᯉᯰᯰ", true), ("ᯎᯒ", false), ("ᯀ", false), ("ᯉᯰ", false)]),
        vec![],
      ),
      challenge(
        "FILL_BLANK",
        "______ berarti ibu dalam bahasa Batak",
        options(&[("ᯇᯉᯰᯰ", true), ("ᯒ", false), ("ᯎᯀ", false), ("ᯀ", false)]),
        vec![],
      ),
      challenge(
        "MATCHING",
        "Pasangkan kata Batak dengan terjemahan Indonesianya:",
        vec![],
        pairs(&[("ᯇᯉᯰᯰ", "ibu"), ("ᯎᯒ", "nama"), ("ᯀ", "dia")]),
      ),
      challenge(
        "ASSIST",
        "Tulis kata 'ibu' dalam aksara Batak",
        options(&[("ᯇ", true), ("ᯉᯰᯰ", true), ("ᯎ", false), ("ᯒ", false), ("ᯀ", false)]),
        vec![],
      ),
      challenge(
        "ARRANGE",
        "Susun kata-kata berikut untuk membentuk kalimat yang benar: 'Nama dia ibu'",
        options(&[("ᯎᯒ", true), ("ᯀ", true), ("ᯇᯉᯰᯰ", true), ("ᯎ", false)]),
        vec![],
      ),
    ],
  }
}

fn lesson_family() -> LessonCfg {
  LessonCfg {
    title: "Keluarga".into(),
    order: Some(2),
    challenges: vec![
      challenge("VOCAB_INTRO", "Pelajari kata 'ayah' dalam aksara Batak", options(&[("ᯇᯒ", true)]), vec![]),
      challenge(
        "SELECT",
        "Pilih terjemahan yang tepat untuk 'ᯇᯒ'",
        options(&[("ayah", true), ("ibu", false), ("anak", false), ("nama", false)]),
        vec![],
      ),
      challenge(
        "FILL_BLANK",
        "______ adalah cara mengatakan 'saya' dalam aksara Batak",
        options(&[("ᯀᯔ", true), ("ᯍᯭ", false), ("ᯀ", false), ("ᯇᯒ", false)]),
        vec![],
      ),
      challenge(
        "MATCHING",
        "Pasangkan kata ganti dengan terjemahannya:",
        vec![],
        pairs(&[("ᯀᯔ", "saya"), ("ᯍᯭ", "kamu"), ("ᯀ", "dia")]),
      ),
      challenge(
        "ASSIST",
        "Tulis kata 'ayah' dalam aksara Batak",
        options(&[("ᯇ", true), ("ᯒ", true), ("ᯉᯰᯰ", false), ("ᯎ", false), ("ᯀ", false)]),
        vec![],
      ),
      challenge(
        "ARRANGE",
        "Susun kata-kata untuk membentuk: 'Saya anak laki-laki'",
        options(&[("ᯀᯔ", true), ("ᯅᯩ", true), ("ᯇᯒ", false), ("ᯍᯭ", false)]),
        vec![],
      ),
    ],
  }
}

/// The built-in course as a content bank, loaded through the same path as TOML banks.
pub fn seed_bank() -> ContentBank {
  ContentBank {
    courses: vec![CourseCfg {
      title: "Batak".into(),
      image_src: "/batak.svg".into(),
      units: vec![UnitCfg {
        title: "Unit 1".into(),
        description: "Belajar dasar bahasa Batak".into(),
        order: Some(1),
        lessons: vec![lesson_intro(), lesson_family()],
      }],
    }],
    words: vec![
      word("ᯇ", "i", "ibu", "noun", "keluarga"),
      word("ᯉᯰᯰ", "nang", "ibu", "noun", "keluarga"),
      word("ᯎ", "a", "nama", "noun", "identitas"),
      word("ᯒ", "ru", "nama", "noun", "identitas"),
      word("ᯀ", "na", "dia", "pronoun", "pronomina"),
      word("ᯅᯩ", "boi", "anak laki-laki", "noun", "keluarga"),
      word("ᯅᯅᯩ", "boru", "anak perempuan", "noun", "keluarga"),
      word("ᯀᯔ", "au", "saya", "pronoun", "pronomina"),
      word("ᯍᯭ", "ho", "kamu", "pronoun", "pronomina"),
      word("ᯇᯒ", "ama", "ayah", "noun", "keluarga"),
    ],
    phrases: vec![],
    stop_words: vec![],
  }
}
