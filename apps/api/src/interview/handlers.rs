use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::engine::{AssetTurn, Turn};
use crate::interview::session::{Evaluation, InterviewSession, SessionView};
use crate::interview::{evaluation, load_context, responder};
use crate::llm_client::ChatTurn;
use crate::state::AppState;
use crate::uploads::form::MultipartForm;
use crate::uploads::validation::{AssetKind, FileValidationError};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "roleId")]
    pub role_id: Option<String>,
    pub message: Option<String>,
    #[serde(default, alias = "isInitial")]
    pub is_initial: bool,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteRequest {
    pub candidate_name: Option<String>,
    pub candidate_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub turn: Turn,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct AssetResponse {
    #[serde(flatten)]
    pub outcome: AssetTurn,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub candidate_id: Uuid,
    pub evaluation: Option<Evaluation>,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
pub struct FollowUpEmailResponse {
    pub email: String,
}

async fn load_session(state: &AppState, id: Uuid) -> Result<InterviewSession, AppError> {
    state
        .sessions
        .load(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat session {id} not found")))
}

/// POST /api/chat
/// Stateless persona reply; the client sends the conversation so far.
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<responder::ChatReply>, AppError> {
    let raw_id = req
        .role_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Role ID is required".into()))?;
    let role_id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::Validation("Invalid role ID format".into()))?;

    let ctx = load_context(&state.db, role_id).await?;
    let reply = responder::reply(
        state.llm.as_ref(),
        &ctx,
        req.conversation_history,
        req.message.as_deref(),
        req.is_initial,
    )
    .await;

    Ok(Json(reply))
}

/// POST /api/chat/start/:role_id
pub async fn handle_start_session(
    State(state): State<AppState>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<TurnResponse>, AppError> {
    let ctx = load_context(&state.db, role_id).await?;
    let (session, turn) = state.engine.start(ctx).await;
    state.sessions.save(&session).await?;

    Ok(Json(TurnResponse {
        turn,
        session: session.view(),
    }))
}

/// GET /api/chat/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(load_session(&state, id).await?.view()))
}

/// POST /api/chat/sessions/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    let mut session = load_session(&state, id).await?;
    let turn = state.engine.send(&mut session, &req.message).await?;
    state.sessions.save(&session).await?;

    Ok(Json(TurnResponse {
        turn,
        session: session.view(),
    }))
}

/// POST /api/chat/sessions/:id/assets
/// Multipart: `file`, optional `kind` (resume | portfolio | other, default resume).
pub async fn handle_upload_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<AssetResponse>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let kind = form
        .text("kind")
        .map(|k| k.parse::<AssetKind>())
        .transpose()?
        .unwrap_or(AssetKind::Resume);
    let file = form.take_file("file").ok_or(FileValidationError::Missing)?;

    let mut session = load_session(&state, id).await?;
    let outcome = state
        .engine
        .attach_asset(&mut session, state.storage.as_ref(), kind, file)
        .await?;
    state.sessions.save(&session).await?;

    Ok(Json(AssetResponse {
        outcome,
        session: session.view(),
    }))
}

/// DELETE /api/chat/sessions/:id/assets/:asset_id
pub async fn handle_remove_asset(
    State(state): State<AppState>,
    Path((id, asset_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = load_session(&state, id).await?;
    if !session.remove_asset(asset_id) {
        return Err(AppError::NotFound(format!("Asset {asset_id} not found")));
    }
    state.sessions.save(&session).await?;
    Ok(Json(session.view()))
}

/// POST /api/chat/sessions/:id/restart
/// Replaces the session with a fresh one for the same role and persona.
pub async fn handle_restart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TurnResponse>, AppError> {
    let old = load_session(&state, id).await?;
    let (session, turn) = state.engine.restart(&old).await;
    state.sessions.save(&session).await?;
    state.sessions.delete(old.id).await?;
    info!("Session {} restarted as {}", old.id, session.id);

    Ok(Json(TurnResponse {
        turn,
        session: session.view(),
    }))
}

/// POST /api/chat/sessions/:id/complete
/// Optional JSON body with the candidate's name and email.
/// Scores the interview, saves a candidate record and closes the session.
/// Repeat calls return the saved result.
pub async fn handle_complete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteRequest>>,
) -> Result<Json<CompleteResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let mut session = load_session(&state, id).await?;

    if let Some(candidate_id) = session.candidate_id {
        return Ok(Json(CompleteResponse {
            candidate_id,
            evaluation: session.evaluation.clone(),
            session: session.view(),
        }));
    }
    if session.answers.is_empty() {
        return Err(AppError::Validation(
            "Answer at least one question before completing the interview".into(),
        ));
    }

    session.candidate_name = req.candidate_name.filter(|n| !n.trim().is_empty());
    session.candidate_email = req.candidate_email.filter(|e| !e.trim().is_empty());

    session.evaluation = match evaluation::evaluate(state.llm.as_ref(), &session).await {
        Ok(eval) => Some(eval),
        Err(e) => {
            warn!("Scoring failed for session {}: {e}", session.id);
            None
        }
    };

    let candidate = evaluation::insert_candidate(&state.db, &session).await?;
    session.candidate_id = Some(candidate.id);
    session.close();
    state.sessions.save(&session).await?;

    Ok(Json(CompleteResponse {
        candidate_id: candidate.id,
        evaluation: session.evaluation.clone(),
        session: session.view(),
    }))
}

/// POST /api/chat/sessions/:id/follow-up-email
pub async fn handle_follow_up_email(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FollowUpEmailResponse>, AppError> {
    let session = load_session(&state, id).await?;
    if session.answers.is_empty() {
        return Err(AppError::Validation(
            "There are no answers to base a follow-up email on yet".into(),
        ));
    }

    let email = evaluation::draft_follow_up_email(state.llm.as_ref(), &session)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    Ok(Json(FollowUpEmailResponse { email }))
}
