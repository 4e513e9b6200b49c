use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    quiz::models::Question,
    session::models::AnswerRecord,
    store::{Store, StoreError},
};

pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_question(&self, id: Uuid) -> Result<Question, StoreError> {
        let question = sqlx::query_as::<_, Question>(
            r#"
            SELECT id, quiz_id, kind, content, options, correct_answer, points, time_limit
            FROM question
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        question.ok_or_else(|| StoreError::NotFound(format!("question {}", id)))
    }

    async fn fetch_question_order(&self, quiz_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM question
            WHERE quiz_id = $1
            ORDER BY ordering
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn save_participant(
        &self,
        session_code: &str,
        participant_id: Uuid,
        display_name: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO participant (id, session_code, display_name, total_score)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(participant_id)
        .bind(session_code)
        .bind(display_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_answer(&self, record: &AnswerRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO answer
                (id, session_code, participant_id, question_id,
                 answer_text, is_correct, score, time_taken, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(&record.session_code)
        .bind(record.participant_id)
        .bind(record.question_id)
        .bind(&record.answer_text)
        .bind(record.is_correct)
        .bind(record.score)
        .bind(record.time_taken)
        .bind(record.submitted_at)
        .execute(&mut *tx)
        .await?;

        if record.score > 0 {
            sqlx::query(
                r#"
                UPDATE participant
                SET total_score = total_score + $1
                WHERE id = $2
                "#,
            )
            .bind(record.score)
            .bind(record.participant_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn rescore_answer(&self, answer_id: Uuid, new_score: i32) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (Uuid, i32)>(
            r#"
            SELECT participant_id, score FROM answer
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(answer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((participant_id, old_score)) = row else {
            return Err(StoreError::NotFound(format!("answer {}", answer_id)));
        };

        sqlx::query(
            r#"
            UPDATE answer
            SET score = $1, is_correct = $2
            WHERE id = $3
            "#,
        )
        .bind(new_score)
        .bind(new_score > 0)
        .bind(answer_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE participant
            SET total_score = total_score + $1
            WHERE id = $2
            "#,
        )
        .bind(new_score - old_score)
        .bind(participant_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
