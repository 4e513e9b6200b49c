use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{quiz::models::QuestionView, session::models::LeaderboardEntry};

/// Inbound frames. Host-only events sent from a participant connection
/// (and vice versa) are rejected by the dispatcher before reaching the
/// actor.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    StartSession,
    NextQuestion {
        expected_index: usize,
    },
    EndSession,
    ScoreAnswer {
        answer_id: Uuid,
        score: i32,
    },
    SubmitAnswer {
        question_id: Uuid,
        answer_text: String,
        time_taken_seconds: Option<f64>,
    },
}

impl ClientEvent {
    pub fn host_only(&self) -> bool {
        !matches!(self, ClientEvent::SubmitAnswer { .. })
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    ParticipantJoined {
        participant_id: Uuid,
        display_name: String,
    },
    QuestionStart {
        question_index: usize,
        question: QuestionView,
    },
    AnswerSubmitted {
        answer_id: Uuid,
        participant_id: Uuid,
        question_id: Uuid,
    },
    AnswerReceived {
        question_id: Uuid,
    },
    LeaderboardUpdate {
        ranking: Vec<LeaderboardEntry>,
    },
    SessionEnded {
        ranking: Vec<LeaderboardEntry>,
    },
    SessionError {
        code: &'static str,
        reason: String,
    },
    ProtocolError {
        reason: String,
    },
}
