use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::interview::prompts::{self, EmailInputs};
use crate::interview::session::{Evaluation, InterviewSession};
use crate::llm_client::prompts::{format_answers, JSON_ONLY_SYSTEM};
use crate::llm_client::{complete_json, ChatTurn, CompletionProvider, CompletionRequest, LlmError};
use crate::models::candidate::CandidateRow;

/// What the scoring prompt asks the model to return.
#[derive(Debug, Deserialize)]
struct ScoringReply {
    fit_score: f64,
    #[serde(default)]
    summary_candidate: String,
    #[serde(default)]
    summary_recruiter: String,
}

/// Scores arrive as a 0-1 fraction, or occasionally as a 0-100 percentage
/// despite the instructions. Anything else has no safe reading.
fn normalize_score(raw: f64) -> Result<f64, LlmError> {
    if !(0.0..=100.0).contains(&raw) {
        return Err(LlmError::InvalidOutput(format!("fit_score {raw} is outside 0-1 and 0-100")));
    }
    Ok(if raw > 1.0 { raw / 100.0 } else { raw })
}

fn answers_text(session: &InterviewSession) -> String {
    format_answers(session.answers.iter().map(|p| (p.q.as_str(), p.a.as_str())))
}

pub async fn evaluate(
    provider: &dyn CompletionProvider,
    session: &InterviewSession,
) -> Result<Evaluation, LlmError> {
    let prompt = prompts::scoring_prompt(&session.context, &answers_text(session));
    let request = CompletionRequest::structured(JSON_ONLY_SYSTEM, prompt);
    let reply: ScoringReply = complete_json(provider, &request).await?;

    let fit_score = normalize_score(reply.fit_score).map_err(|e| {
        warn!("Rejected scoring reply for session {}: {e}", session.id);
        e
    })?;

    Ok(Evaluation {
        fit_score,
        summary_candidate: reply.summary_candidate,
        summary_recruiter: reply.summary_recruiter,
    })
}

pub async fn insert_candidate(
    pool: &PgPool,
    session: &InterviewSession,
) -> Result<CandidateRow, sqlx::Error> {
    let answers = json!(session
        .answers
        .iter()
        .map(|p| json!({ "q": p.q, "a": p.a }))
        .collect::<Vec<_>>());
    let evaluation = session.evaluation.as_ref();

    let row = sqlx::query_as::<_, CandidateRow>(
        r#"
        INSERT INTO candidates
            (role_id, answers, fit_score, summary_candidate, summary_recruiter,
             resume_url, candidate_name, candidate_email)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, role_id, answers, fit_score, summary_candidate, summary_recruiter,
                  resume_url, candidate_name, candidate_email, created_at
        "#,
    )
    .bind(session.context.role.id)
    .bind(answers)
    .bind(evaluation.map(|e| e.fit_score))
    .bind(evaluation.map(|e| e.summary_candidate.as_str()))
    .bind(evaluation.map(|e| e.summary_recruiter.as_str()))
    .bind(session.resume_url())
    .bind(session.candidate_name.as_deref())
    .bind(session.candidate_email.as_deref())
    .fetch_one(pool)
    .await?;

    info!("Saved candidate {} for role {}", row.id, row.role_id);
    Ok(row)
}

pub async fn draft_follow_up_email(
    provider: &dyn CompletionProvider,
    session: &InterviewSession,
) -> Result<String, LlmError> {
    let answers = answers_text(session);
    let prompt = prompts::email_prompt(
        &session.context,
        &EmailInputs {
            answers: &answers,
            candidate: session.candidate_name.as_deref().unwrap_or("the candidate"),
            score: session.evaluation.as_ref().map(|e| e.fit_score),
        },
    );
    let request = CompletionRequest::chat(
        "You write concise, friendly recruiting emails.",
        vec![ChatTurn::user(prompt)],
    );
    Ok(provider.complete(&request).await?.text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::persona::fixtures;
    use crate::llm_client::testing::ScriptedProvider;

    fn answered_session() -> InterviewSession {
        let mut session = InterviewSession::new(fixtures::context(&["Why finance?"]));
        session.push_assistant_message("Why finance?");
        session.record_answer("I like closing the books.");
        session
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(0.75).unwrap(), 0.75);
        assert_eq!(normalize_score(1.0).unwrap(), 1.0);
        assert_eq!(normalize_score(82.0).unwrap(), 0.82);
        assert!(matches!(normalize_score(-1.0), Err(LlmError::InvalidOutput(_))));
        assert!(matches!(normalize_score(250.0), Err(LlmError::InvalidOutput(_))));
        assert!(normalize_score(f64::NAN).is_err());
    }

    #[tokio::test]
    async fn test_evaluate_rejects_out_of_range_score() {
        let provider = ScriptedProvider::always("{\"fit_score\": 450, \"summary_candidate\": \"\", \"summary_recruiter\": \"\"}");
        let err = evaluate(&provider, &answered_session()).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidOutput(_)));
        let prompt = &provider.last_request().unwrap().messages[0].content;
        assert!(prompt.contains("fraction between 0.0 and 1.0"));
    }

    #[tokio::test]
    async fn test_evaluate_parses_fenced_json() {
        let provider = ScriptedProvider::always(
            "```json\n{\"fit_score\": 0.8, \"summary_candidate\": \"Great chat\", \"summary_recruiter\": \"Strong CA\"}\n```",
        );
        let evaluation = evaluate(&provider, &answered_session()).await.unwrap();
        assert_eq!(evaluation.fit_score, 0.8);
        assert_eq!(evaluation.summary_recruiter, "Strong CA");

        let request = provider.last_request().unwrap();
        assert_eq!(request.system, JSON_ONLY_SYSTEM);
        assert!(request.messages[0].content.contains("A1: I like closing the books."));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_prose() {
        let provider = ScriptedProvider::always("The candidate seems strong.");
        let err = evaluate(&provider, &answered_session()).await.unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[tokio::test]
    async fn test_email_uses_candidate_name() {
        let provider = ScriptedProvider::always("  Dear Asha,\nThank you.  ");
        let mut session = answered_session();
        session.candidate_name = Some("Asha".into());
        let email = draft_follow_up_email(&provider, &session).await.unwrap();
        assert_eq!(email, "Dear Asha,\nThank you.");
        let prompt = &provider.last_request().unwrap().messages[0].content;
        assert!(prompt.contains("to Asha"));
    }
}
