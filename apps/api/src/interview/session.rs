//! Per-candidate interview state. Pure data plus transition rules; all I/O lives
//! in `engine`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interview::fallback::DEGRADED_NOTICE;
use crate::interview::mode::{self, ConversationMode, NextQuestion};
use crate::interview::persona::InterviewContext;
use crate::llm_client::{ChatRole, ChatTurn};
use crate::uploads::validation::AssetKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    LoadingRoleData,
    Greeting,
    AwaitingUserInput,
    AwaitingModelReply,
    Complete,
}

impl SessionPhase {
    pub fn can_transition_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (LoadingRoleData, Greeting)
                | (Greeting, AwaitingUserInput)
                | (AwaitingUserInput, AwaitingModelReply)
                | (AwaitingModelReply, AwaitingUserInput)
                | (AwaitingModelReply, Complete)
                | (AwaitingUserInput, Complete)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QnAPair {
    pub q: String,
    pub a: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Uploading,
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedAsset {
    pub id: Uuid,
    pub kind: AssetKind,
    pub name: String,
    pub size: u64,
    pub url: Option<String>,
    pub status: AssetStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub fit_score: f64,
    pub summary_candidate: String,
    pub summary_recruiter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub context: InterviewContext,
    pub phase: SessionPhase,
    pub messages: Vec<ChatMessage>,
    pub answers: Vec<QnAPair>,
    pub current_question: Option<String>,
    pub question_index: usize,
    pub progress_percentage: u8,
    pub interview_complete: bool,
    pub error: Option<String>,
    pub uploaded_assets: Vec<UploadedAsset>,
    /// Text pulled out of an uploaded PDF resume, offered to the model as context.
    pub resume_text: Option<String>,
    pub evaluation: Option<Evaluation>,
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
    pub candidate_id: Option<Uuid>,
    /// One-way switch: once set, replies come from the local table for the rest of the session.
    pub test_mode: bool,
    pub has_api_error: bool,
    pub consecutive_failures: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(context: InterviewContext) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            context,
            phase: SessionPhase::LoadingRoleData,
            messages: Vec::new(),
            answers: Vec::new(),
            current_question: None,
            question_index: 0,
            progress_percentage: 0,
            interview_complete: false,
            error: None,
            uploaded_assets: Vec::new(),
            resume_text: None,
            evaluation: None,
            candidate_name: None,
            candidate_email: None,
            candidate_id: None,
            test_mode: false,
            has_api_error: false,
            consecutive_failures: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mode(&self) -> ConversationMode {
        self.context.persona.mode
    }

    pub fn total_questions(&self) -> usize {
        self.context.persona.questions.len()
    }

    pub fn transition(&mut self, next: SessionPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(
                "Session {}: unexpected phase change {:?} -> {:?}",
                self.id,
                self.phase,
                next
            );
        }
        self.phase = next;
        self.updated_at = Utc::now();
    }

    pub fn next_question(&self) -> NextQuestion {
        mode::next_question(self.mode(), self.answers.len(), &self.context.persona.questions)
    }

    pub fn push_user_message(&mut self, content: impl Into<String>) {
        self.push_message(ChatRole::User, content.into());
    }

    /// Appends an assistant reply and works out which question the candidate is now answering.
    pub fn push_assistant_message(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.current_question = if self.interview_complete {
            None
        } else {
            match self.next_question() {
                NextQuestion::Fixed(q) => Some(q),
                NextQuestion::ModelDecides => Some(content.clone()),
                NextQuestion::Done => None,
            }
        };
        self.push_message(ChatRole::Assistant, content);
    }

    fn push_message(&mut self, role: ChatRole, content: String) {
        let now = Utc::now();
        self.messages.push(ChatMessage {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// Records `answer` against the current question, if there is one, and advances progress.
    /// Returns true when an answer was recorded.
    pub fn record_answer(&mut self, answer: &str) -> bool {
        let Some(question) = self.current_question.take() else {
            return false;
        };
        self.answers.push(QnAPair {
            q: question,
            a: answer.to_string(),
            timestamp: Utc::now(),
        });
        self.question_index += 1;

        let (mode, answered, total) = (self.mode(), self.answers.len(), self.total_questions());
        self.interview_complete = mode::is_complete(mode, answered, total);
        self.progress_percentage = if self.interview_complete {
            100
        } else {
            mode::progress_percentage(mode, answered, total)
        };
        true
    }

    /// Ends the interview once the candidate has been saved, whether or not
    /// every question was answered. No further messages or uploads are accepted.
    pub fn close(&mut self) {
        self.interview_complete = true;
        self.current_question = None;
        self.progress_percentage = 100;
        if self.phase != SessionPhase::Complete {
            self.transition(SessionPhase::Complete);
        }
    }

    pub fn enter_test_mode(&mut self) {
        if !self.test_mode {
            tracing::warn!("Session {} switching to local fallback replies", self.id);
        }
        self.test_mode = true;
        self.has_api_error = true;
        self.error = Some(DEGRADED_NOTICE.to_string());
    }

    /// Conversation so far in completion-API form.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.messages
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn add_asset(&mut self, asset: UploadedAsset) {
        self.uploaded_assets.push(asset);
        self.updated_at = Utc::now();
    }

    pub fn remove_asset(&mut self, asset_id: Uuid) -> bool {
        let before = self.uploaded_assets.len();
        self.uploaded_assets.retain(|a| a.id != asset_id);
        self.updated_at = Utc::now();
        self.uploaded_assets.len() != before
    }

    /// URL of the most recent successfully stored resume.
    pub fn resume_url(&self) -> Option<&str> {
        self.uploaded_assets
            .iter()
            .rev()
            .find(|a| a.kind == AssetKind::Resume && a.status == AssetStatus::Success)
            .and_then(|a| a.url.as_deref())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            session_id: self.id,
            role_id: self.context.role.id,
            role_title: self.context.role.title.clone(),
            company_name: self.context.company.name.clone(),
            persona_name: self.context.persona.name.clone(),
            avatar_url: self.context.persona.avatar_url.clone(),
            conversation_mode: self.mode(),
            phase: self.phase,
            messages: self.messages.clone(),
            answers: self.answers.clone(),
            current_question: self.current_question.clone(),
            question_index: self.question_index,
            total_questions: self.total_questions(),
            progress_percentage: self.progress_percentage,
            interview_complete: self.interview_complete,
            error: self.error.clone(),
            uploaded_assets: self.uploaded_assets.clone(),
            evaluation: self.evaluation.clone(),
            test_mode: self.test_mode,
            has_api_error: self.has_api_error,
            retry_count: self.consecutive_failures,
        }
    }
}

/// What clients see of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub role_id: Uuid,
    pub role_title: String,
    pub company_name: String,
    pub persona_name: String,
    pub avatar_url: Option<String>,
    pub conversation_mode: ConversationMode,
    pub phase: SessionPhase,
    pub messages: Vec<ChatMessage>,
    pub answers: Vec<QnAPair>,
    pub current_question: Option<String>,
    pub question_index: usize,
    pub total_questions: usize,
    pub progress_percentage: u8,
    pub interview_complete: bool,
    pub error: Option<String>,
    pub uploaded_assets: Vec<UploadedAsset>,
    pub evaluation: Option<Evaluation>,
    pub test_mode: bool,
    pub has_api_error: bool,
    pub retry_count: u32,
}
