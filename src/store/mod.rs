pub mod pg;

#[cfg(test)]
pub mod mem;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{quiz::models::Question, session::models::AnswerRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Narrow persistence interface consumed by the session engine.
///
/// `save_answer` persists the record and credits the participant's score as
/// one unit, and `rescore_answer` updates a record and applies the score
/// diff the same way. Splitting either into two calls would let the record
/// and the running total diverge on partial failure.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_question(&self, id: Uuid) -> Result<Question, StoreError>;

    /// Question ids of a quiz in authored order.
    async fn fetch_question_order(&self, quiz_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn save_participant(
        &self,
        session_code: &str,
        participant_id: Uuid,
        display_name: &str,
    ) -> Result<(), StoreError>;

    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StoreError>;

    async fn rescore_answer(&self, answer_id: Uuid, new_score: i32) -> Result<(), StoreError>;
}
