use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound shared by every technique score and the willingness signal.
pub const MAX_SCORE: u8 = 100;

/// One of the four coaching techniques scored on every user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    OpenQuestions,
    NeutralLanguage,
    CleanLanguage,
    Reframing,
}

impl Technique {
    /// All techniques in report display order.
    pub const ALL: [Technique; 4] = [
        Technique::OpenQuestions,
        Technique::NeutralLanguage,
        Technique::CleanLanguage,
        Technique::Reframing,
    ];

    /// Human-readable name used for chart labels.
    pub fn label(self) -> &'static str {
        match self {
            Technique::OpenQuestions => "Open questions",
            Technique::NeutralLanguage => "Neutral language",
            Technique::CleanLanguage => "Clean language",
            Technique::Reframing => "Reframing",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Feedback attached to a single simulated-partner reply.
///
/// The four technique scores rate the user utterance that the reply answers;
/// `willingness_to_change` is the partner's openness after hearing it. Every
/// score lies in `0..=100`; replies from the evaluation service are range
/// checked before a record is built from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub open_questions: u8,
    pub neutral_language: u8,
    pub clean_language: u8,
    pub reframing: u8,
    /// Short verdict on the turn.
    pub feedback: String,
    /// Rationale behind the scores.
    pub analysis: String,
    /// A better phrasing the user could have tried.
    pub alternative: String,
    pub willingness_to_change: u8,
}

impl EvaluationRecord {
    /// The record seeded on the opening message: no technique credit, and the
    /// partner's starting willingness.
    pub fn baseline(willingness_to_change: u8) -> Self {
        Self {
            open_questions: 0,
            neutral_language: 0,
            clean_language: 0,
            reframing: 0,
            feedback: String::new(),
            analysis: String::new(),
            alternative: String::new(),
            willingness_to_change,
        }
    }

    pub fn score(&self, technique: Technique) -> u8 {
        match technique {
            Technique::OpenQuestions => self.open_questions,
            Technique::NeutralLanguage => self.neutral_language,
            Technique::CleanLanguage => self.clean_language,
            Technique::Reframing => self.reframing,
        }
    }
}

/// Converts a raw integer from the collaborator into a score, rejecting
/// anything outside `0..=100`.
pub(crate) fn checked_score(field: &str, value: i64) -> Result<u8, String> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= MAX_SCORE)
        .ok_or_else(|| format!("`{}` must be between 0 and {}, got {}", field, MAX_SCORE, value))
}
