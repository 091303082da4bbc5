//! The simulated coworker: who they are, how they open, and how their mood is
//! described to the user.
//!
//! The behavioral contract the language model follows lives in the
//! `system_prompt.md` prompt file; this module only holds the fixed pieces the
//! application itself renders.

use serde::Serialize;

pub const PERSONA_NAME: &str = "Kim Bulman";

/// Scripted first line seeded into every new session.
pub const OPENING_LINE: &str = "Ugh, seriously... Manager Park is at it again. \
He dumped the proposal back on my desk ten minutes before quitting time and told me to redo it. \
I'm sure he just has it in for me. This company is hopeless. \
Not like telling you is going to fix anything... I'm just so fed up.";

/// Willingness the partner starts every session with.
pub const BASELINE_WILLINGNESS: u8 = 10;

/// A coarse reading of the partner's willingness to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Defensive,
    Curious,
    Thawing,
    Reflecting,
    Committed,
}

impl Mood {
    pub fn from_willingness(willingness: u8) -> Self {
        match willingness {
            90.. => Mood::Committed,
            70.. => Mood::Reflecting,
            40.. => Mood::Thawing,
            20.. => Mood::Curious,
            _ => Mood::Defensive,
        }
    }

    /// Stable machine-readable name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Committed => "committed",
            Mood::Reflecting => "reflecting",
            Mood::Thawing => "thawing",
            Mood::Curious => "curious",
            Mood::Defensive => "defensive",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mood::Committed => "Determined to change / grateful",
            Mood::Reflecting => "Reflecting / opening up",
            Mood::Thawing => "Guard down / thinking it over",
            Mood::Curious => "A little curious",
            Mood::Defensive => "Extremely defensive / resentful",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GuideSkill {
    pub name: &'static str,
    pub summary: &'static str,
    pub example: &'static str,
}

/// Reference material shown next to the chat.
#[derive(Debug, Clone, Serialize)]
pub struct CoachingGuide {
    pub title: &'static str,
    pub situation: &'static str,
    pub what_is_coaching: &'static str,
    pub skills: Vec<GuideSkill>,
}

pub fn coaching_guide() -> CoachingGuide {
    CoachingGuide {
        title: "Coaching intervention guide",
        situation: "Kim Bulman (32, marketing, third year) is furious with his senior, Manager Park, \
who hands out work right before quitting time, gives vague feedback and takes credit for results.",
        what_is_coaching: "The leader acts as a helper so the other person finds their own solution. \
Draw out insight with questions instead of handing over answers.",
        skills: vec![
            GuideSkill {
                name: "Neutral language",
                summary: "Stay with the facts instead of judging.",
                example: "Rather than \"Why would you think that?\", ask \"What happened?\"",
            },
            GuideSkill {
                name: "Clean language",
                summary: "Accept their feelings and words as they are instead of advising.",
                example: "Drop \"If I were you...\" and reflect back the words they used.",
            },
            GuideSkill {
                name: "Reframing",
                summary: "Turn complaints into wishes or growth points.",
                example: "\"This is so annoying\" becomes \"What would you like to be different?\"",
            },
            GuideSkill {
                name: "Open questions",
                summary: "Ask questions that cannot be answered with yes or no.",
                example: "Rather than \"That felt bad, right?\", ask \"What was hardest for you in that moment?\"",
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_bands_use_inclusive_lower_bounds() {
        assert_eq!(Mood::from_willingness(0), Mood::Defensive);
        assert_eq!(Mood::from_willingness(19), Mood::Defensive);
        assert_eq!(Mood::from_willingness(20), Mood::Curious);
        assert_eq!(Mood::from_willingness(39), Mood::Curious);
        assert_eq!(Mood::from_willingness(40), Mood::Thawing);
        assert_eq!(Mood::from_willingness(70), Mood::Reflecting);
        assert_eq!(Mood::from_willingness(89), Mood::Reflecting);
        assert_eq!(Mood::from_willingness(90), Mood::Committed);
        assert_eq!(Mood::from_willingness(100), Mood::Committed);
    }

    #[test]
    fn baseline_mood_is_defensive() {
        assert_eq!(Mood::from_willingness(BASELINE_WILLINGNESS), Mood::Defensive);
    }

    #[test]
    fn as_str_matches_serialized_name() {
        for mood in [
            Mood::Defensive,
            Mood::Curious,
            Mood::Thawing,
            Mood::Reflecting,
            Mood::Committed,
        ] {
            assert_eq!(serde_json::to_value(mood).unwrap(), mood.as_str());
        }
    }

    #[test]
    fn guide_lists_the_four_scored_skills() {
        let guide = coaching_guide();
        assert_eq!(guide.skills.len(), 4);
        assert!(guide.skills.iter().any(|s| s.name == "Open questions"));
    }
}
