use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::{
    session::{
        error::SessionError,
        grader,
        leaderboard,
        models::{AnswerRecord, LeaderboardEntry, ParticipantState, SessionState, SessionStatus},
    },
    store::Store,
    ws::{events::ServerEvent, registry::ConnectionRegistry},
};

const COMMAND_QUEUE: usize = 128;

#[derive(Debug)]
pub enum SessionCommand {
    Start,
    AdvanceQuestion {
        expected_index: usize,
    },
    End,
    Join {
        display_name: String,
        reply: oneshot::Sender<Result<JoinAck, SessionError>>,
    },
    Rejoin {
        participant_id: Uuid,
        reply: oneshot::Sender<Result<JoinAck, SessionError>>,
    },
    Leave {
        participant_id: Uuid,
    },
    HostGone,
    SubmitAnswer {
        participant_id: Uuid,
        question_id: Uuid,
        answer_text: String,
        time_taken_seconds: Option<f64>,
    },
    Rescore {
        answer_id: Uuid,
        score: i32,
    },
    Snapshot {
        reply: oneshot::Sender<SessionOverview>,
    },
}

#[derive(Debug, Clone)]
pub struct JoinAck {
    pub participant_id: Uuid,
    pub display_name: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct SessionOverview {
    pub code: String,
    pub quiz_id: Uuid,
    pub status: SessionStatus,
    pub current_question_index: usize,
    pub question_count: usize,
    pub connected_participants: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ranking: Vec<LeaderboardEntry>,
}

/// Cloneable handle to one session's command queue. All mutations of the
/// session go through here and are processed strictly in arrival order.
#[derive(Clone)]
pub struct SessionHandle {
    code: String,
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Builds the handle and the command queue it feeds. The receiving end
    /// goes to [`SessionActor::spawn`] once the code is reserved.
    pub(crate) fn channel(code: String) -> (Self, mpsc::Receiver<SessionCommand>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        (Self { code, tx }, rx)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub async fn start(&self) {
        self.send(SessionCommand::Start).await;
    }

    pub async fn advance_question(&self, expected_index: usize) {
        self.send(SessionCommand::AdvanceQuestion { expected_index })
            .await;
    }

    pub async fn end(&self) {
        self.send(SessionCommand::End).await;
    }

    pub async fn join(&self, display_name: String) -> Result<JoinAck, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Join {
            display_name,
            reply,
        })
        .await;
        rx.await.map_err(|_| SessionError::SessionNotFound)?
    }

    pub async fn rejoin(&self, participant_id: Uuid) -> Result<JoinAck, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Rejoin {
            participant_id,
            reply,
        })
        .await;
        rx.await.map_err(|_| SessionError::SessionNotFound)?
    }

    pub async fn leave(&self, participant_id: Uuid) {
        self.send(SessionCommand::Leave { participant_id }).await;
    }

    pub async fn host_gone(&self) {
        self.send(SessionCommand::HostGone).await;
    }

    pub async fn submit_answer(
        &self,
        participant_id: Uuid,
        question_id: Uuid,
        answer_text: String,
        time_taken_seconds: Option<f64>,
    ) {
        self.send(SessionCommand::SubmitAnswer {
            participant_id,
            question_id,
            answer_text,
            time_taken_seconds,
        })
        .await;
    }

    pub async fn rescore(&self, answer_id: Uuid, score: i32) {
        self.send(SessionCommand::Rescore { answer_id, score })
            .await;
    }

    pub async fn snapshot(&self) -> Result<SessionOverview, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot { reply }).await;
        rx.await.map_err(|_| SessionError::SessionNotFound)
    }

    async fn send(&self, command: SessionCommand) {
        if self.tx.send(command).await.is_err() {
            debug!("Session {} is gone, command dropped", self.code);
        }
    }
}

/// One actor per active session. Owns the session state, every participant
/// and every answer record; processes its queue strictly sequentially so
/// concurrent submissions and host transitions never race.
pub struct SessionActor {
    state: SessionState,
    participants: HashMap<Uuid, ParticipantState>,
    answers: HashMap<Uuid, AnswerRecord>,
    answered: HashSet<(Uuid, Uuid)>,
    next_join_seq: u32,
    store: Arc<dyn Store>,
    connections: Arc<ConnectionRegistry>,
    handles: Arc<DashMap<String, SessionHandle>>,
    rx: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    /// Spawns the actor task behind an already reserved handle. The caller
    /// owns the handle's map entry; the actor only ever removes it.
    pub fn spawn(
        state: SessionState,
        rx: mpsc::Receiver<SessionCommand>,
        store: Arc<dyn Store>,
        connections: Arc<ConnectionRegistry>,
        handles: Arc<DashMap<String, SessionHandle>>,
    ) {
        let actor = Self {
            state,
            participants: HashMap::new(),
            answers: HashMap::new(),
            answered: HashSet::new(),
            next_join_seq: 0,
            store,
            connections,
            handles,
            rx,
        };
        tokio::spawn(actor.run());
    }

    async fn run(mut self) {
        info!("Session {} actor started", self.state.code);

        while let Some(command) = self.rx.recv().await {
            self.handle(command).await;

            if self.state.status == SessionStatus::Ended {
                break;
            }
        }

        // Drain: dropping the bucket makes further sends to the code no-ops.
        self.handles.remove(&self.state.code);
        self.connections.remove_session(&self.state.code);
        info!("Session {} actor stopped", self.state.code);
    }

    async fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start => {
                if let Err(e) = self.start().await {
                    self.report_to_host(e);
                }
            }
            SessionCommand::AdvanceQuestion { expected_index } => {
                if let Err(e) = self.advance_question(expected_index).await {
                    self.report_to_host(e);
                }
            }
            SessionCommand::End => {
                if let Err(e) = self.end() {
                    self.report_to_host(e);
                }
            }
            SessionCommand::Join {
                display_name,
                reply,
            } => {
                let _ = reply.send(self.join(display_name).await);
            }
            SessionCommand::Rejoin {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.rejoin(participant_id));
            }
            SessionCommand::Leave { participant_id } => {
                if let Some(participant) = self.participants.get_mut(&participant_id) {
                    participant.connected = false;
                }
            }
            SessionCommand::HostGone => {
                // Current question stays live, submissions keep flowing.
                // Host-only transitions wait for a host to reconnect.
                info!("Session {} host disconnected", self.state.code);
            }
            SessionCommand::SubmitAnswer {
                participant_id,
                question_id,
                answer_text,
                time_taken_seconds,
            } => {
                if let Err(e) = self
                    .submit_answer(participant_id, question_id, answer_text, time_taken_seconds)
                    .await
                {
                    self.report_to_participant(participant_id, e);
                }
            }
            SessionCommand::Rescore { answer_id, score } => {
                if let Err(e) = self.rescore(answer_id, score).await {
                    self.report_to_host(e);
                }
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.overview());
            }
        }
    }

    /* Transitions */

    async fn start(&mut self) -> Result<(), SessionError> {
        if self.state.status != SessionStatus::Waiting {
            return Err(SessionError::InvalidState);
        }
        if self.state.question_order.is_empty() {
            return Err(SessionError::OutOfRange);
        }

        // Fetch before mutating so a storage failure leaves us in Waiting.
        let event = self.question_start_event(0).await?;

        self.state.status = SessionStatus::Active;
        self.state.started_at = Some(Utc::now());
        self.state.current_question_index = 0;

        info!("Session {} started", self.state.code);
        self.connections.broadcast(&self.state.code, event);
        Ok(())
    }

    async fn advance_question(&mut self, expected_index: usize) -> Result<(), SessionError> {
        if self.state.status != SessionStatus::Active {
            return Err(SessionError::InvalidState);
        }

        let next = self.state.current_question_index + 1;
        if expected_index != next {
            return Err(SessionError::OutOfOrder {
                expected: next,
                got: expected_index,
            });
        }
        if next >= self.state.question_order.len() {
            return Err(SessionError::OutOfRange);
        }

        let event = self.question_start_event(next).await?;

        self.state.current_question_index = next;
        debug!("Session {} advanced to question {}", self.state.code, next);
        self.connections.broadcast(&self.state.code, event);
        Ok(())
    }

    fn end(&mut self) -> Result<(), SessionError> {
        if self.state.status == SessionStatus::Ended {
            return Err(SessionError::InvalidState);
        }

        self.state.status = SessionStatus::Ended;
        self.state.ended_at = Some(Utc::now());

        // Unreachable for new joins before anyone sees the final event.
        self.handles.remove(&self.state.code);

        info!("Session {} ended", self.state.code);
        self.connections.broadcast(
            &self.state.code,
            ServerEvent::SessionEnded {
                ranking: leaderboard::rank(&self.participants),
            },
        );
        Ok(())
    }

    /* Participants */

    async fn join(&mut self, display_name: String) -> Result<JoinAck, SessionError> {
        if self.state.status == SessionStatus::Ended {
            return Err(SessionError::SessionNotFound);
        }

        let participant = ParticipantState {
            id: Uuid::new_v4(),
            display_name,
            total_score: 0,
            connected: true,
            join_seq: self.next_join_seq,
        };

        self.store
            .save_participant(&self.state.code, participant.id, &participant.display_name)
            .await?;

        self.next_join_seq += 1;
        let ack = JoinAck {
            participant_id: participant.id,
            display_name: participant.display_name.clone(),
        };
        info!(
            "Participant {} joined session {}",
            participant.id, self.state.code
        );
        self.participants.insert(participant.id, participant);
        Ok(ack)
    }

    fn rejoin(&mut self, participant_id: Uuid) -> Result<JoinAck, SessionError> {
        if self.state.status == SessionStatus::Ended {
            return Err(SessionError::SessionNotFound);
        }

        let participant = self
            .participants
            .get_mut(&participant_id)
            .ok_or_else(|| SessionError::NotFound(format!("participant {}", participant_id)))?;

        participant.connected = true;
        Ok(JoinAck {
            participant_id: participant.id,
            display_name: participant.display_name.clone(),
        })
    }

    /* Grading */

    async fn submit_answer(
        &mut self,
        participant_id: Uuid,
        question_id: Uuid,
        answer_text: String,
        time_taken_seconds: Option<f64>,
    ) -> Result<(), SessionError> {
        if self.state.status != SessionStatus::Active {
            return Err(SessionError::InvalidState);
        }
        if !self.participants.contains_key(&participant_id) {
            return Err(SessionError::NotFound(format!(
                "participant {}",
                participant_id
            )));
        }

        let index = self
            .state
            .question_order
            .iter()
            .position(|id| *id == question_id)
            .ok_or_else(|| SessionError::NotFound(format!("question {}", question_id)))?;
        if index > self.state.current_question_index {
            return Err(SessionError::OutOfRange);
        }
        if self.answered.contains(&(participant_id, question_id)) {
            return Err(SessionError::DuplicateSubmission);
        }

        let question = self.store.get_question(question_id).await?;
        let (is_correct, score) = grader::grade(&question, &answer_text);

        let record = AnswerRecord {
            id: Uuid::new_v4(),
            session_code: self.state.code.clone(),
            participant_id,
            question_id,
            answer_text,
            is_correct,
            score,
            time_taken: time_taken_seconds,
            submitted_at: Utc::now(),
        };

        // One failure unit: nothing is applied in memory until the store
        // confirmed both the record and the score credit.
        self.store.save_answer(&record).await?;

        let answer_id = record.id;
        self.answered.insert((participant_id, question_id));
        self.answers.insert(answer_id, record);
        if score > 0 {
            if let Some(participant) = self.participants.get_mut(&participant_id) {
                participant.total_score += score;
            }
        }

        self.connections.send_to_host(
            &self.state.code,
            ServerEvent::AnswerSubmitted {
                answer_id,
                participant_id,
                question_id,
            },
        );
        self.connections.send_to_participant(
            &self.state.code,
            participant_id,
            ServerEvent::AnswerReceived { question_id },
        );
        if score > 0 {
            self.broadcast_leaderboard();
        }

        Ok(())
    }

    async fn rescore(&mut self, answer_id: Uuid, score: i32) -> Result<(), SessionError> {
        let record = self
            .answers
            .get(&answer_id)
            .ok_or_else(|| SessionError::NotFound(format!("answer {}", answer_id)))?;

        let participant_id = record.participant_id;
        let diff = score - record.score;

        self.store.rescore_answer(answer_id, score).await?;

        let record = self
            .answers
            .get_mut(&answer_id)
            .ok_or_else(|| SessionError::NotFound(format!("answer {}", answer_id)))?;
        record.score = score;
        record.is_correct = score > 0;
        if let Some(participant) = self.participants.get_mut(&participant_id) {
            participant.total_score += diff;
        }

        if diff != 0 {
            self.broadcast_leaderboard();
        }
        Ok(())
    }

    /* Outbound */

    async fn question_start_event(&self, index: usize) -> Result<ServerEvent, SessionError> {
        let question_id = self.state.question_order[index];
        let question = self.store.get_question(question_id).await?;

        Ok(ServerEvent::QuestionStart {
            question_index: index,
            question: (&question).into(),
        })
    }

    fn broadcast_leaderboard(&self) {
        self.connections.broadcast(
            &self.state.code,
            ServerEvent::LeaderboardUpdate {
                ranking: leaderboard::rank(&self.participants),
            },
        );
    }

    fn overview(&self) -> SessionOverview {
        SessionOverview {
            code: self.state.code.clone(),
            quiz_id: self.state.quiz_id,
            status: self.state.status,
            current_question_index: self.state.current_question_index,
            question_count: self.state.question_order.len(),
            connected_participants: self.participants.values().filter(|p| p.connected).count(),
            started_at: self.state.started_at,
            ended_at: self.state.ended_at,
            ranking: leaderboard::rank(&self.participants),
        }
    }

    fn report_to_host(&self, error: SessionError) {
        error!("Session {} host command failed: {}", self.state.code, error);
        self.connections.send_to_host(
            &self.state.code,
            ServerEvent::SessionError {
                code: error.code(),
                reason: error.to_string(),
            },
        );
    }

    fn report_to_participant(&self, participant_id: Uuid, error: SessionError) {
        debug!(
            "Session {} submission by {} failed: {}",
            self.state.code, participant_id, error
        );
        self.connections.send_to_participant(
            &self.state.code,
            participant_id,
            ServerEvent::SessionError {
                code: error.code(),
                reason: error.to_string(),
            },
        );
    }
}
