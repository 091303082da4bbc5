//! Score Aggregator
//!
//! Reduces a transcript to per-technique averages, an overall score and a rank.
//!
//! Rounding happens twice on purpose: each technique mean is rounded first,
//! and the overall score is the rounded mean of those rounded values. This can
//! differ by one point from rounding the grand mean of all raw scores, and
//! reports depend on the two-step result.

use crate::{
    evaluation::{EvaluationRecord, Technique},
    message::{Message, Sender},
};
use serde::Serialize;

/// A user utterance and the evaluation of it carried by the partner's reply.
#[derive(Debug, Clone, Copy)]
pub struct ScoredTurn<'a> {
    pub user_message: &'a Message,
    pub evaluation: &'a EvaluationRecord,
}

/// Pairs each user message with the evaluation on the partner message that
/// immediately follows it, in conversation order. User messages with no
/// evaluated reply right after them are skipped.
pub fn scored_turns(messages: &[Message]) -> Vec<ScoredTurn<'_>> {
    messages
        .windows(2)
        .filter_map(|pair| match (&pair[0], &pair[1]) {
            (user, reply)
                if user.sender == Sender::User && reply.sender == Sender::SimulatedPartner =>
            {
                reply.evaluation.as_ref().map(|evaluation| ScoredTurn {
                    user_message: user,
                    evaluation,
                })
            }
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechniqueAverage {
    pub technique: Technique,
    pub name: &'static str,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionScore {
    pub overall: u8,
    /// Empty when no turn was scored, otherwise one entry per technique in
    /// display order.
    pub per_technique: Vec<TechniqueAverage>,
    pub turns_scored: usize,
}

impl SessionScore {
    pub fn rank(&self) -> Rank {
        Rank::from_score(self.overall)
    }
}

/// Integer mean rounded half up. `count` must be non-zero.
fn rounded_mean(sum: u32, count: u32) -> u8 {
    // floor(sum / count + 1/2) without floating point
    let mean = (2 * sum + count) / (2 * count);
    u8::try_from(mean).unwrap_or(u8::MAX)
}

/// Aggregates every scored turn in `messages`.
///
/// With nothing scored the result is an overall score of 0 and an empty
/// breakdown.
pub fn aggregate(messages: &[Message]) -> SessionScore {
    aggregate_turns(&scored_turns(messages))
}

pub fn aggregate_turns(turns: &[ScoredTurn<'_>]) -> SessionScore {
    if turns.is_empty() {
        return SessionScore {
            overall: 0,
            per_technique: Vec::new(),
            turns_scored: 0,
        };
    }

    let count = turns.len() as u32;
    let per_technique: Vec<TechniqueAverage> = Technique::ALL
        .iter()
        .map(|&technique| {
            let sum: u32 = turns
                .iter()
                .map(|t| u32::from(t.evaluation.score(technique)))
                .sum();
            TechniqueAverage {
                technique,
                name: technique.label(),
                value: rounded_mean(sum, count),
            }
        })
        .collect();

    let rounded_sum: u32 = per_technique.iter().map(|a| u32::from(a.value)).sum();
    let overall = rounded_mean(rounded_sum, per_technique.len() as u32);

    SessionScore {
        overall,
        per_technique,
        turns_scored: turns.len(),
    }
}

/// Qualitative band for an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Legend,
    Master,
    Pro,
    Apprentice,
    Advisor,
}

impl Rank {
    /// Thresholds are inclusive lower bounds, checked from the top.
    pub fn from_score(score: u8) -> Self {
        match score {
            95.. => Rank::Legend,
            85.. => Rank::Master,
            70.. => Rank::Pro,
            50.. => Rank::Apprentice,
            _ => Rank::Advisor,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Rank::Legend => "Legendary Coach",
            Rank::Master => "Master Coach",
            Rank::Pro => "Pro Coach",
            Rank::Apprentice => "Apprentice Coach",
            Rank::Advisor => "Advisor Type",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Rank::Legend => {
                "You completely turned around a mind that seemed impossible to reach. \
                 Flawless, expert-level coaching."
            }
            Rank::Master => {
                "You handle coaching techniques with real skill. \
                 Your ability to draw out reflection is outstanding."
            }
            Rank::Pro => {
                "Great work! Try to cut back a little more on the personal judgments \
                 that occasionally slip in."
            }
            Rank::Apprentice => {
                "Your effort to listen shows, but you still reach for solutions \
                 more readily than for questions."
            }
            Rank::Advisor => {
                "Your partner most likely felt your advice as interference. \
                 Try asking more open questions."
            }
        }
    }
}
