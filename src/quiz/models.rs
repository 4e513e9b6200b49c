use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "question_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    OpenEnded,
    ShortAnswer,
    Estimation,
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub kind: QuestionKind,
    pub content: String,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
    pub points: i32,
    pub time_limit: i32,
}

/// Outbound shape of a question, without the correct answer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuestionView {
    pub id: Uuid,
    pub kind: QuestionKind,
    pub content: String,
    pub options: Option<Vec<String>>,
    pub points: i32,
    pub time_limit: i32,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            kind: question.kind,
            content: question.content.clone(),
            options: question.options.clone(),
            points: question.points,
            time_limit: question.time_limit,
        }
    }
}
