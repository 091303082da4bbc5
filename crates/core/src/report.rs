//! Reshapes a transcript and its aggregate into the end-of-session report.
//! No scoring happens here.

use crate::{
    aggregator::{self, Rank, SessionScore},
    message::Message,
};
use serde::Serialize;

/// One bar of the technique chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    pub name: &'static str,
    pub value: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnScores {
    pub open_questions: u8,
    pub neutral_language: u8,
    pub clean_language: u8,
    pub reframing: u8,
}

/// Expandable per-turn entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnFeedback {
    /// 1-based position among scored turns.
    pub number: usize,
    pub user_text: String,
    pub feedback: String,
    pub analysis: String,
    pub alternative: String,
    pub willingness_to_change: u8,
    pub scores: TurnScores,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub overall_score: u8,
    pub rank: Rank,
    pub rank_title: &'static str,
    pub rank_description: &'static str,
    pub chart: Vec<ChartEntry>,
    pub turns: Vec<TurnFeedback>,
}

impl SessionReport {
    /// Builds the report for `messages` from a precomputed aggregate.
    pub fn present(messages: &[Message], score: &SessionScore) -> Self {
        let rank = score.rank();
        let chart = score
            .per_technique
            .iter()
            .map(|a| ChartEntry {
                name: a.name,
                value: a.value,
            })
            .collect();
        let turns = aggregator::scored_turns(messages)
            .into_iter()
            .enumerate()
            .map(|(i, turn)| {
                let e = turn.evaluation;
                TurnFeedback {
                    number: i + 1,
                    user_text: turn.user_message.text.clone(),
                    feedback: e.feedback.clone(),
                    analysis: e.analysis.clone(),
                    alternative: e.alternative.clone(),
                    willingness_to_change: e.willingness_to_change,
                    scores: TurnScores {
                        open_questions: e.open_questions,
                        neutral_language: e.neutral_language,
                        clean_language: e.clean_language,
                        reframing: e.reframing,
                    },
                }
            })
            .collect();

        Self {
            overall_score: score.overall,
            rank,
            rank_title: rank.title(),
            rank_description: rank.description(),
            chart,
            turns,
        }
    }

    /// Aggregates `messages` and builds the report in one step.
    pub fn from_messages(messages: &[Message]) -> Self {
        Self::present(messages, &aggregator::aggregate(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationRecord;

    fn reply(scores: [u8; 4], willingness: u8, tag: &str) -> Message {
        Message::from_partner(
            format!("reply {}", tag),
            EvaluationRecord {
                open_questions: scores[0],
                neutral_language: scores[1],
                clean_language: scores[2],
                reframing: scores[3],
                feedback: format!("feedback {}", tag),
                analysis: format!("analysis {}", tag),
                alternative: format!("alternative {}", tag),
                willingness_to_change: willingness,
            },
        )
    }

    #[test]
    fn empty_session_report() {
        let messages = vec![Message::from_partner(
            "opening",
            EvaluationRecord::baseline(10),
        )];
        let report = SessionReport::from_messages(&messages);

        assert_eq!(report.overall_score, 0);
        assert_eq!(report.rank, Rank::Advisor);
        assert_eq!(report.rank_title, "Advisor Type");
        assert!(report.chart.is_empty());
        assert!(report.turns.is_empty());
    }

    #[test]
    fn single_turn_report_maps_every_field() {
        let messages = vec![
            Message::from_partner("opening", EvaluationRecord::baseline(10)),
            Message::from_user("What was the hardest part?"),
            reply([80, 90, 70, 60], 18, "a"),
        ];
        let report = SessionReport::from_messages(&messages);

        assert_eq!(report.overall_score, 75);
        assert_eq!(report.rank, Rank::Pro);
        assert_eq!(report.rank_title, "Pro Coach");
        assert_eq!(
            report.chart,
            vec![
                ChartEntry { name: "Open questions", value: 80 },
                ChartEntry { name: "Neutral language", value: 90 },
                ChartEntry { name: "Clean language", value: 70 },
                ChartEntry { name: "Reframing", value: 60 },
            ]
        );

        let turn = &report.turns[0];
        assert_eq!(turn.number, 1);
        assert_eq!(turn.user_text, "What was the hardest part?");
        assert_eq!(turn.feedback, "feedback a");
        assert_eq!(turn.analysis, "analysis a");
        assert_eq!(turn.alternative, "alternative a");
        assert_eq!(turn.willingness_to_change, 18);
        assert_eq!(
            turn.scores,
            TurnScores {
                open_questions: 80,
                neutral_language: 90,
                clean_language: 70,
                reframing: 60,
            }
        );
    }

    #[test]
    fn turns_keep_conversation_order() {
        let messages = vec![
            Message::from_partner("opening", EvaluationRecord::baseline(10)),
            Message::from_user("first"),
            reply([90, 90, 90, 90], 20, "1"),
            Message::from_user("second"),
            reply([10, 10, 10, 10], 12, "2"),
            Message::from_user("third"),
            reply([50, 50, 50, 50], 15, "3"),
        ];
        let report = SessionReport::from_messages(&messages);

        let texts: Vec<&str> = report.turns.iter().map(|t| t.user_text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        let numbers: Vec<usize> = report.turns.iter().map(|t| t.number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        assert_eq!(report.overall_score, 50);
    }

    #[test]
    fn report_serializes_for_the_dashboard() {
        let messages = vec![
            Message::from_partner("opening", EvaluationRecord::baseline(10)),
            Message::from_user("q"),
            reply([100, 100, 100, 100], 95, "x"),
        ];
        let json = serde_json::to_value(SessionReport::from_messages(&messages)).unwrap();
        assert_eq!(json["overall_score"], 100);
        assert_eq!(json["rank"], "legend");
        assert_eq!(json["chart"][0]["name"], "Open questions");
        assert_eq!(json["turns"][0]["scores"]["reframing"], 100);
    }
}
