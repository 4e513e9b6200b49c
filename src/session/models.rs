use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Waiting,
    Active,
    Ended,
}

/// Mutable state of one live session. Owned exclusively by its actor,
/// every mutation goes through a defined transition.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub code: String,
    pub quiz_id: Uuid,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub question_order: Vec<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(code: String, quiz_id: Uuid, question_order: Vec<Uuid>) -> Self {
        Self {
            code,
            quiz_id,
            status: SessionStatus::Waiting,
            current_question_index: 0,
            question_order,
            started_at: None,
            ended_at: None,
        }
    }
}

/// A player in a session. Survives disconnects, the score stays until
/// the session ends.
#[derive(Debug, Clone)]
pub struct ParticipantState {
    pub id: Uuid,
    pub display_name: String,
    pub total_score: i32,
    pub connected: bool,
    pub join_seq: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnswerRecord {
    pub id: Uuid,
    pub session_code: String,
    pub participant_id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub is_correct: bool,
    pub score: i32,
    pub time_taken: Option<f64>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub participant_id: Uuid,
    pub display_name: String,
    pub total_score: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub code: String,
    pub quiz_id: Uuid,
    pub question_count: usize,
}
