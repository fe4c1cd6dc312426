//! Drives an `InterviewSession` through its turns: greeting, replies, uploads.
//!
//! Remote failures never surface to the candidate. Each turn retries the model
//! per `RetryPolicy`; once a turn exhausts its attempts the session drops into
//! test mode and every later reply comes from the local keyword table.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::fallback::{local_greeting, local_reply};
use crate::interview::mode::NextQuestion;
use crate::interview::persona::InterviewContext;
use crate::interview::prompts::{self, OPEN_QUESTION_DIRECTIVE};
use crate::interview::session::{AssetStatus, InterviewSession, SessionPhase, UploadedAsset};
use crate::llm_client::{CompletionProvider, CompletionRequest};
use crate::storage::{object_key, ObjectStore};
use crate::uploads::validation::{validate_file, AssetKind, UploadedFile, MAX_FILE_SIZE};

const UPLOAD_FAILED: &str = "Upload failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per turn, including the first.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Model,
    Fallback,
    EndMessage,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub reply: String,
    pub source: ReplySource,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetTurn {
    pub asset: UploadedAsset,
    /// Present when the upload succeeded and was announced in the chat.
    pub turn: Option<Turn>,
}

#[derive(Clone)]
pub struct InterviewEngine {
    llm: Arc<dyn CompletionProvider>,
    retry: RetryPolicy,
}

impl InterviewEngine {
    pub fn new(llm: Arc<dyn CompletionProvider>, retry: RetryPolicy) -> Self {
        Self { llm, retry }
    }

    /// New session for `context` with its greeting already in place.
    pub async fn start(&self, context: InterviewContext) -> (InterviewSession, Turn) {
        let mut session = InterviewSession::new(context);
        session.transition(SessionPhase::Greeting);

        let first_question = match session.next_question() {
            NextQuestion::Fixed(q) => Some(q),
            _ => None,
        };
        let directive = prompts::greeting_directive(first_question.as_deref());

        let turn = match self.model_reply(&mut session, &directive).await {
            Some(text) => Turn {
                reply: text,
                source: ReplySource::Model,
            },
            None => {
                let ctx = &session.context;
                let mut text = local_greeting(&ctx.persona.name, &ctx.role);
                if let Some(q) = &first_question {
                    text.push_str("\n\n");
                    text.push_str(q);
                }
                Turn {
                    reply: text,
                    source: ReplySource::Fallback,
                }
            }
        };

        session.push_assistant_message(turn.reply.clone());
        session.transition(SessionPhase::AwaitingUserInput);
        info!(
            "Started session {} for role {} ({} mode)",
            session.id,
            session.context.role.id,
            session.mode()
        );
        (session, turn)
    }

    /// Fresh session and greeting for the same role and persona as `old`.
    pub async fn restart(&self, old: &InterviewSession) -> (InterviewSession, Turn) {
        self.start(old.context.clone()).await
    }

    pub async fn send(&self, session: &mut InterviewSession, message: &str) -> Result<Turn, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::Validation("Message cannot be empty".into()));
        }
        if session.interview_complete {
            return Err(AppError::Validation("This interview is already complete".into()));
        }

        session.push_user_message(message);
        session.record_answer(message);
        session.transition(SessionPhase::AwaitingModelReply);

        if session.interview_complete {
            let text = session.context.persona.end_message().to_string();
            session.push_assistant_message(text.clone());
            session.transition(SessionPhase::Complete);
            info!("Session {} complete after {} answers", session.id, session.answers.len());
            return Ok(Turn {
                reply: text,
                source: ReplySource::EndMessage,
            });
        }

        let next = session.next_question();
        let directive = match &next {
            NextQuestion::Fixed(q) => prompts::fixed_question_directive(q),
            _ => OPEN_QUESTION_DIRECTIVE.to_string(),
        };

        let turn = match self.model_reply(session, &directive).await {
            Some(text) => Turn {
                reply: text,
                source: ReplySource::Model,
            },
            None => {
                let mut text = local_reply(message, &session.context.role);
                if let NextQuestion::Fixed(q) = &next {
                    text.push_str("\n\n");
                    text.push_str(q);
                }
                Turn {
                    reply: text,
                    source: ReplySource::Fallback,
                }
            }
        };

        session.push_assistant_message(turn.reply.clone());
        session.transition(SessionPhase::AwaitingUserInput);
        Ok(turn)
    }

    /// Validates and stores `file`, records it on the session, and on success
    /// announces it in the conversation.
    pub async fn attach_asset(
        &self,
        session: &mut InterviewSession,
        storage: &dyn ObjectStore,
        kind: AssetKind,
        file: UploadedFile,
    ) -> Result<AssetTurn, AppError> {
        if session.interview_complete {
            return Err(AppError::Validation("This interview is already complete".into()));
        }

        let validated = validate_file(file, kind.allowed_types(), MAX_FILE_SIZE)?;
        let file = validated.file();
        let mut asset = UploadedAsset {
            id: Uuid::new_v4(),
            kind,
            name: file.file_name.clone(),
            size: file.size() as u64,
            url: None,
            status: AssetStatus::Uploading,
            error: None,
        };

        let role_id = session.context.role.id.to_string();
        let key = object_key(&[kind.storage_prefix(), &role_id], &file.file_name);

        match storage.put(&key, &validated).await {
            Ok(stored) => {
                asset.url = Some(stored.url);
                asset.status = AssetStatus::Success;
            }
            Err(e) => {
                warn!("Session {}: asset upload failed: {e}", session.id);
                asset.status = AssetStatus::Error;
                asset.error = Some(UPLOAD_FAILED.to_string());
            }
        }

        if asset.status == AssetStatus::Success && kind == AssetKind::Resume && file.is_pdf() {
            if let Some(text) = extract_pdf_text(file.data.clone()).await {
                session.resume_text = Some(text);
            }
        }

        session.add_asset(asset.clone());

        let turn = if asset.status == AssetStatus::Success {
            let announcement = format!("I've uploaded my {}: {}", kind.as_str(), asset.name);
            Some(self.send(session, &announcement).await?)
        } else {
            None
        };

        Ok(AssetTurn { asset, turn })
    }

    /// One model reply for the session's current history, or `None` when the
    /// session is (or has just become) limited to local replies.
    async fn model_reply(&self, session: &mut InterviewSession, directive: &str) -> Option<String> {
        if session.test_mode {
            return None;
        }

        let system = prompts::turn_system_prompt(
            &session.context,
            session.resume_text.as_deref(),
            directive,
        );
        let request = CompletionRequest::chat(system, session.history());
        let attempts = self.retry.max_attempts.max(1);

        for attempt in 1..=attempts {
            match self.llm.complete(&request).await {
                Ok(completion) => {
                    if completion.used_fallback_model {
                        info!("Session {} answered by fallback model {}", session.id, completion.model);
                    }
                    session.consecutive_failures = 0;
                    session.has_api_error = false;
                    return Some(completion.text);
                }
                Err(e) => {
                    session.consecutive_failures += 1;
                    warn!(
                        "Session {}: completion attempt {attempt}/{attempts} failed: {e}",
                        session.id
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        session.enter_test_mode();
        None
    }
}

async fn extract_pdf_text(data: Bytes) -> Option<String> {
    match tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            warn!("PDF text extraction failed: {e}");
            None
        }
        Err(e) => {
            warn!("PDF text extraction task aborted: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::fallback::DEGRADED_NOTICE;
    use crate::interview::persona::fixtures;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::storage::memory::MemoryObjectStore;

    fn engine(provider: &Arc<ScriptedProvider>) -> InterviewEngine {
        InterviewEngine::new(provider.clone(), RetryPolicy::default())
    }

    fn pdf(name: &str, size: usize) -> UploadedFile {
        let mut data = b"%PDF-1.4\n".to_vec();
        data.resize(size, b' ');
        UploadedFile {
            file_name: name.into(),
            content_type: "application/pdf".into(),
            data: Bytes::from(data),
        }
    }

    #[tokio::test]
    async fn test_structured_interview_completes_after_every_question() {
        let provider = Arc::new(ScriptedProvider::always("Thanks! Next one."));
        let engine = engine(&provider);
        let (mut session, greeting) = engine.start(fixtures::context(&["Q1?", "Q2?", "Q3?"])).await;
        assert_eq!(greeting.source, ReplySource::Model);
        assert_eq!(session.phase, SessionPhase::AwaitingUserInput);

        engine.send(&mut session, "first").await.unwrap();
        let system = provider.last_request().unwrap().system;
        assert!(system.contains("ask exactly this next question: \"Q2?\""));
        assert_eq!(session.progress_percentage, 33);

        engine.send(&mut session, "second").await.unwrap();
        let last = engine.send(&mut session, "third").await.unwrap();

        assert_eq!(last.source, ReplySource::EndMessage);
        assert_eq!(last.reply, "Thanks, Maya will be in touch.");
        assert!(session.interview_complete);
        assert_eq!(session.progress_percentage, 100);
        assert_eq!(session.phase, SessionPhase::Complete);
        let asked: Vec<_> = session.answers.iter().map(|a| a.q.as_str()).collect();
        assert_eq!(asked, ["Q1?", "Q2?", "Q3?"]);
        // greeting plus two replies; the closing line is local
        assert_eq!(provider.calls(), 3);

        let err = engine.send(&mut session, "one more").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_messages_and_uploads() {
        let provider = Arc::new(ScriptedProvider::always("Thanks."));
        let engine = engine(&provider);
        let storage = MemoryObjectStore::default();
        let (mut session, _) = engine.start(fixtures::context(&["Q1?", "Q2?", "Q3?"])).await;
        engine.send(&mut session, "first").await.unwrap();

        session.candidate_id = Some(Uuid::new_v4());
        session.close();
        let calls = provider.calls();

        let err = engine.send(&mut session, "one more thing").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = engine
            .attach_asset(&mut session, &storage, AssetKind::Resume, pdf("cv.pdf", 100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_eq!(session.answers.len(), 1);
        assert_eq!(provider.calls(), calls);
        assert_eq!(storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let provider = Arc::new(ScriptedProvider::always("Hi"));
        let engine = engine(&provider);
        let (mut session, _) = engine.start(fixtures::context(&["Q1?"])).await;
        assert!(matches!(
            engine.send(&mut session, "   ").await,
            Err(AppError::Validation(_))
        ));
        assert!(session.answers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_switch_to_test_mode_for_good() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(()), Err(()), Err(())],
            Ok("back online"),
        ));
        let engine = engine(&provider);
        let (mut session, greeting) = engine.start(fixtures::context(&["Q1?", "Q2?", "Q3?"])).await;

        assert_eq!(provider.calls(), 3);
        assert!(session.test_mode);
        assert!(session.has_api_error);
        assert_eq!(session.error.as_deref(), Some(DEGRADED_NOTICE));
        assert_eq!(greeting.source, ReplySource::Fallback);
        assert!(greeting.reply.contains("Maya Verma"));
        assert!(greeting.reply.ends_with("Q1?"));

        let turn = engine.send(&mut session, "What's the salary?").await.unwrap();
        assert_eq!(turn.source, ReplySource::Fallback);
        assert!(turn.reply.contains("competitive"));
        assert!(turn.reply.ends_with("Q2?"));
        assert_eq!(provider.calls(), 3);
        assert!(session.test_mode);
        assert_eq!(session.answers[0].q, "Q1?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_before_limit() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(()), Err(())], Ok("Hello there")));
        let engine = engine(&provider);
        let (session, greeting) = engine.start(fixtures::context(&["Q1?"])).await;

        assert_eq!(greeting.reply, "Hello there");
        assert_eq!(provider.calls(), 3);
        assert!(!session.test_mode);
        assert_eq!(session.consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_role_without_persona_still_greets() {
        let provider = Arc::new(ScriptedProvider::failing());
        let engine = engine(&provider);
        let (session, greeting) = engine.start(fixtures::context(&[])).await;

        assert!(session.context.persona.is_default);
        assert!(greeting.reply.contains("AI Recruiter"));
        assert!(greeting.reply.contains("Financial Controller"));
        assert_eq!(session.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_default_persona_greeting_from_model() {
        let provider = Arc::new(ScriptedProvider::always("Hi, I'm the AI Recruiter."));
        let engine = engine(&provider);
        let (session, greeting) = engine.start(fixtures::context(&[])).await;

        assert_eq!(greeting.source, ReplySource::Model);
        let system = provider.last_request().unwrap().system;
        assert!(system.contains("You are AI Recruiter"));
        assert_eq!(
            session.current_question.as_deref(),
            Some("Hi, I'm the AI Recruiter.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_clears_state_and_test_mode() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(()), Err(()), Err(())], Ok("Welcome back")));
        let engine = engine(&provider);
        let (mut old, _) = engine.start(fixtures::context(&["Q1?", "Q2?"])).await;
        engine.send(&mut old, "answer").await.unwrap();
        assert!(old.test_mode);

        let (fresh, turn) = engine.restart(&old).await;
        assert_ne!(fresh.id, old.id);
        assert!(!fresh.test_mode);
        assert!(fresh.answers.is_empty());
        assert_eq!(fresh.messages.len(), 1);
        assert_eq!(turn.reply, "Welcome back");
        assert_eq!(fresh.current_question.as_deref(), Some("Q1?"));
    }

    #[tokio::test]
    async fn test_valid_pdf_is_stored_and_announced() {
        let provider = Arc::new(ScriptedProvider::always("Got it, thanks."));
        let engine = engine(&provider);
        let storage = MemoryObjectStore::default();
        let (mut session, _) = engine.start(fixtures::context(&["Q1?", "Q2?"])).await;

        let outcome = engine
            .attach_asset(&mut session, &storage, AssetKind::Resume, pdf("My CV.pdf", 2048))
            .await
            .unwrap();

        assert_eq!(outcome.asset.status, AssetStatus::Success);
        let url = outcome.asset.url.as_deref().unwrap();
        assert!(url.contains("/resumes/"));
        assert!(url.ends_with("My_CV.pdf"));
        assert_eq!(storage.put_count(), 1);
        let prefix = format!("resumes/{}/", session.context.role.id);
        assert!(storage.keys()[0].starts_with(&prefix));
        assert!(outcome.turn.is_some());
        assert_eq!(session.resume_url(), Some(url));
        assert!(session
            .messages
            .iter()
            .any(|m| m.content == "I've uploaded my resume: My CV.pdf"));
    }

    #[tokio::test]
    async fn test_oversize_asset_never_reaches_storage() {
        let provider = Arc::new(ScriptedProvider::always("ok"));
        let engine = engine(&provider);
        let storage = MemoryObjectStore::default();
        let (mut session, _) = engine.start(fixtures::context(&["Q1?"])).await;

        let err = engine
            .attach_asset(&mut session, &storage, AssetKind::Resume, pdf("big.pdf", MAX_FILE_SIZE + 1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(storage.put_count(), 0);
        assert!(session.uploaded_assets.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_marks_asset_error() {
        let provider = Arc::new(ScriptedProvider::always("ok"));
        let engine = engine(&provider);
        let storage = MemoryObjectStore::failing();
        let (mut session, _) = engine.start(fixtures::context(&["Q1?"])).await;

        let outcome = engine
            .attach_asset(&mut session, &storage, AssetKind::Resume, pdf("cv.pdf", 100))
            .await
            .unwrap();

        assert_eq!(outcome.asset.status, AssetStatus::Error);
        assert_eq!(outcome.asset.error.as_deref(), Some(UPLOAD_FAILED));
        assert!(outcome.turn.is_none());
        assert_eq!(session.uploaded_assets.len(), 1);
        assert!(session.answers.is_empty());
    }
}
