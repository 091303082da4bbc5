//! API Models
//!
//! Wire shapes for the REST and WebSocket surfaces, with `utoipa` schemas for
//! the OpenAPI document. They are built from the core session types and never
//! flow back into them.

use crate::store::SessionRecord;
use chrono::{DateTime, Utc};
use coaching_core::{
    evaluation::EvaluationRecord,
    message::{Message, Sender},
    persona::{CoachingGuide, Mood},
    report::SessionReport,
    session::{IgnoreReason, SessionPhase, TURN_CAP},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseView {
    NotStarted,
    Active,
    Ended,
}

impl From<SessionPhase> for PhaseView {
    fn from(phase: SessionPhase) -> Self {
        match phase {
            SessionPhase::NotStarted => PhaseView::NotStarted,
            SessionPhase::Active => PhaseView::Active,
            SessionPhase::Ended => PhaseView::Ended,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderView {
    Partner,
    User,
}

impl From<Sender> for SenderView {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::SimulatedPartner => SenderView::Partner,
            Sender::User => SenderView::User,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationView {
    pub open_questions: u8,
    pub neutral_language: u8,
    pub clean_language: u8,
    pub reframing: u8,
    pub feedback: String,
    pub analysis: String,
    pub alternative: String,
    pub willingness_to_change: u8,
}

impl From<&EvaluationRecord> for EvaluationView {
    fn from(e: &EvaluationRecord) -> Self {
        Self {
            open_questions: e.open_questions,
            neutral_language: e.neutral_language,
            clean_language: e.clean_language,
            reframing: e.reframing,
            feedback: e.feedback.clone(),
            analysis: e.analysis.clone(),
            alternative: e.alternative.clone(),
            willingness_to_change: e.willingness_to_change,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MessageView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, example = "user")]
    pub sender: SenderView,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub evaluation: Option<EvaluationView>,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            sender: m.sender.into(),
            text: m.text.clone(),
            created_at: m.created_at,
            evaluation: m.evaluation.as_ref().map(EvaluationView::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MoodView {
    #[schema(example = 10)]
    pub willingness: u8,
    #[schema(example = "defensive")]
    pub mood: String,
    #[schema(example = "Extremely defensive / resentful")]
    pub label: String,
}

impl MoodView {
    pub fn new(willingness: u8) -> Self {
        let mood = Mood::from_willingness(willingness);
        Self {
            willingness,
            mood: mood.as_str().to_string(),
            label: mood.label().to_string(),
        }
    }
}

/// Full view of one practice session.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub user_id: String,
    #[schema(value_type = String, example = "active")]
    pub phase: PhaseView,
    pub started: bool,
    pub ended: bool,
    pub in_flight: bool,
    pub turn_count: u32,
    #[schema(example = 10)]
    pub turn_cap: u32,
    pub partner: MoodView,
    pub messages: Vec<MessageView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionView {
    fn from(record: &SessionRecord) -> Self {
        let state = &record.state;
        Self {
            id: record.id,
            user_id: record.user_id.clone(),
            phase: state.phase().into(),
            started: state.is_started(),
            ended: state.is_ended(),
            in_flight: state.is_in_flight(),
            turn_count: state.turn_count(),
            turn_cap: TURN_CAP,
            partner: MoodView::new(state.current_willingness()),
            messages: state.messages().iter().map(MessageView::from).collect(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Listing entry without the transcript.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SessionSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    #[schema(value_type = String, example = "active")]
    pub phase: PhaseView,
    pub turn_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        Self {
            id: record.id,
            phase: record.state.phase().into(),
            turn_count: record.state.turn_count(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitTurnPayload {
    #[schema(example = "What was the hardest part of that for you?")]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnDisposition {
    Completed,
    Ignored,
    Superseded,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReasonView {
    NotStarted,
    Ended,
    TurnInFlight,
    EmptyInput,
}

impl From<IgnoreReason> for IgnoreReasonView {
    fn from(reason: IgnoreReason) -> Self {
        match reason {
            IgnoreReason::NotStarted => IgnoreReasonView::NotStarted,
            IgnoreReason::Ended => IgnoreReasonView::Ended,
            IgnoreReason::TurnInFlight => IgnoreReasonView::TurnInFlight,
            IgnoreReason::EmptyInput => IgnoreReasonView::EmptyInput,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TurnResponse {
    #[schema(value_type = String, example = "completed")]
    pub disposition: TurnDisposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_reason: Option<IgnoreReasonView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<MessageView>,
    pub session: SessionView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct ChartEntryView {
    pub name: String,
    pub value: u8,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct TurnScoresView {
    pub open_questions: u8,
    pub neutral_language: u8,
    pub clean_language: u8,
    pub reframing: u8,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TurnFeedbackView {
    pub number: usize,
    pub user_text: String,
    pub feedback: String,
    pub analysis: String,
    pub alternative: String,
    pub willingness_to_change: u8,
    pub scores: TurnScoresView,
}

/// End-of-session report: score block, chart data, per-turn feedback.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ReportView {
    #[schema(example = 75)]
    pub overall_score: u8,
    #[schema(example = "Pro Coach")]
    pub rank_title: String,
    pub rank_description: String,
    pub chart: Vec<ChartEntryView>,
    pub turns: Vec<TurnFeedbackView>,
}

impl From<SessionReport> for ReportView {
    fn from(report: SessionReport) -> Self {
        Self {
            overall_score: report.overall_score,
            rank_title: report.rank_title.to_string(),
            rank_description: report.rank_description.to_string(),
            chart: report
                .chart
                .into_iter()
                .map(|c| ChartEntryView {
                    name: c.name.to_string(),
                    value: c.value,
                })
                .collect(),
            turns: report
                .turns
                .into_iter()
                .map(|t| TurnFeedbackView {
                    number: t.number,
                    user_text: t.user_text,
                    feedback: t.feedback,
                    analysis: t.analysis,
                    alternative: t.alternative,
                    willingness_to_change: t.willingness_to_change,
                    scores: TurnScoresView {
                        open_questions: t.scores.open_questions,
                        neutral_language: t.scores.neutral_language,
                        clean_language: t.scores.clean_language,
                        reframing: t.scores.reframing,
                    },
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuideSkillView {
    pub name: String,
    pub summary: String,
    pub example: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GuideView {
    pub persona: String,
    pub title: String,
    pub situation: String,
    pub what_is_coaching: String,
    pub skills: Vec<GuideSkillView>,
}

impl GuideView {
    pub fn new(persona: &str, guide: CoachingGuide) -> Self {
        Self {
            persona: persona.to_string(),
            title: guide.title.to_string(),
            situation: guide.situation.to_string(),
            what_is_coaching: guide.what_is_coaching.to_string(),
            skills: guide
                .skills
                .into_iter()
                .map(|s| GuideSkillView {
                    name: s.name.to_string(),
                    summary: s.summary.to_string(),
                    example: s.example.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
}
