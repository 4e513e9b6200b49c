use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    quiz::models::Question,
    session::models::AnswerRecord,
    store::{Store, StoreError},
};

/// In-memory Store used by the engine tests, with failure injection for
/// the rollback paths.
#[derive(Default)]
pub struct MemStore {
    questions: Mutex<HashMap<Uuid, Question>>,
    order: Mutex<HashMap<Uuid, Vec<Uuid>>>,
    answers: Mutex<HashMap<Uuid, AnswerRecord>>,
    scores: Mutex<HashMap<Uuid, i32>>,
    fail_writes: AtomicBool,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_quiz(&self, quiz_id: Uuid, questions: Vec<Question>) {
        let ids = questions.iter().map(|q| q.id).collect();
        self.order.lock().unwrap().insert(quiz_id, ids);
        let mut map = self.questions.lock().unwrap();
        for question in questions {
            map.insert(question.id, question);
        }
    }

    /// Makes every subsequent write fail with a database error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn answer_count(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    pub fn persisted_score(&self, participant_id: Uuid) -> i32 {
        *self
            .scores
            .lock()
            .unwrap()
            .get(&participant_id)
            .unwrap_or(&0)
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemStore {
    async fn get_question(&self, id: Uuid) -> Result<Question, StoreError> {
        self.questions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("question {}", id)))
    }

    async fn fetch_question_order(&self, quiz_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        self.order
            .lock()
            .unwrap()
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("quiz {}", quiz_id)))
    }

    async fn save_participant(
        &self,
        _session_code: &str,
        participant_id: Uuid,
        _display_name: &str,
    ) -> Result<(), StoreError> {
        self.check_writes()?;
        self.scores.lock().unwrap().entry(participant_id).or_insert(0);
        Ok(())
    }

    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StoreError> {
        self.check_writes()?;
        self.answers
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        if record.score > 0 {
            *self
                .scores
                .lock()
                .unwrap()
                .entry(record.participant_id)
                .or_insert(0) += record.score;
        }
        Ok(())
    }

    async fn rescore_answer(&self, answer_id: Uuid, new_score: i32) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut answers = self.answers.lock().unwrap();
        let Some(record) = answers.get_mut(&answer_id) else {
            return Err(StoreError::NotFound(format!("answer {}", answer_id)));
        };

        let diff = new_score - record.score;
        record.score = new_score;
        record.is_correct = new_score > 0;
        *self
            .scores
            .lock()
            .unwrap()
            .entry(record.participant_id)
            .or_insert(0) += diff;
        Ok(())
    }
}
