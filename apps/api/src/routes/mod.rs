pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::catalog::handlers as catalog;
use crate::interview::handlers as chat;
use crate::state::AppState;
use crate::uploads::handlers as uploads;
use crate::uploads::validation::MAX_FILE_SIZE;

/// Leaves room for form fields around a maximum-size file so size checks
/// happen in validation rather than as a bare 413.
const MAX_BODY_BYTES: usize = MAX_FILE_SIZE * 2;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/test-key", get(health::test_key_handler))
        // Catalog
        .route(
            "/api/roles",
            get(catalog::handle_list_roles).post(catalog::handle_create_role),
        )
        .route("/api/roles/:id", get(catalog::handle_get_role))
        .route("/api/companies/:id", get(catalog::handle_get_company))
        // Persona chat
        .route("/api/chat", post(chat::handle_chat))
        .route("/api/chat/start/:role_id", post(chat::handle_start_session))
        .route("/api/chat/sessions/:id", get(chat::handle_get_session))
        .route(
            "/api/chat/sessions/:id/messages",
            post(chat::handle_send_message),
        )
        .route(
            "/api/chat/sessions/:id/assets",
            post(chat::handle_upload_asset),
        )
        .route(
            "/api/chat/sessions/:id/assets/:asset_id",
            delete(chat::handle_remove_asset),
        )
        .route("/api/chat/sessions/:id/restart", post(chat::handle_restart))
        .route(
            "/api/chat/sessions/:id/complete",
            post(chat::handle_complete),
        )
        .route(
            "/api/chat/sessions/:id/follow-up-email",
            post(chat::handle_follow_up_email),
        )
        // Applications and uploads
        .route("/api/apply", post(applications::handle_apply))
        .route(
            "/api/applications/quick-apply/:role_id",
            post(applications::handle_quick_apply),
        )
        .route("/api/upload", post(uploads::handle_upload))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::interview::engine::{InterviewEngine, RetryPolicy};
    use crate::interview::persona::fixtures;
    use crate::interview::store::memory::MemorySessionStore;
    use crate::interview::store::SessionStore;
    use crate::llm_client::testing::ScriptedProvider;
    use crate::llm_client::CompletionProvider;
    use crate::storage::memory::MemoryObjectStore;

    const BOUNDARY: &str = "recruit-test-boundary";

    struct Harness {
        app: Router,
        storage: Arc<MemoryObjectStore>,
        sessions: Arc<MemorySessionStore>,
        engine: InterviewEngine,
    }

    /// Router over memory stores and a scripted model. The pool is lazy and
    /// never connects, so these tests only reach paths that stop before the database.
    fn harness() -> Harness {
        let llm: Arc<dyn CompletionProvider> = Arc::new(ScriptedProvider::always("Thanks! Next question."));
        let storage = Arc::new(MemoryObjectStore::default());
        let sessions = Arc::new(MemorySessionStore::default());
        let engine = InterviewEngine::new(llm.clone(), RetryPolicy::default());
        let state = AppState {
            db: PgPoolOptions::new()
                .connect_lazy("postgres://postgres@localhost/recruit_test")
                .unwrap(),
            sessions: sessions.clone(),
            storage: storage.clone(),
            llm,
            engine: engine.clone(),
        };
        Harness {
            app: build_router(state),
            storage,
            sessions,
            engine,
        }
    }

    fn multipart(
        uri: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &str, Vec<u8>)>,
    ) -> Request<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                    .as_bytes(),
            );
        }
        if let Some((field, file_name, content_type, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(&data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn applicant_fields(role_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("roleId", role_id.to_string()),
            ("name", "Asha Rao".to_string()),
            ("email", "asha@example.com".to_string()),
            ("phone", "+91 98100 00000".to_string()),
        ]
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(h: &Harness, request: Request<Body>) -> (StatusCode, Value) {
        let response = h.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn apply(h: &Harness, file: Option<(&str, &str, &str, Vec<u8>)>) -> (StatusCode, Value) {
        let role_id = Uuid::new_v4().to_string();
        let owned = applicant_fields(&role_id);
        let fields: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();
        send(h, multipart("/api/apply", &fields, file)).await
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_apply_without_resume_is_rejected() {
        let h = harness();
        let (status, body) = apply(&h, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Missing required fields");
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_with_oversize_resume_is_rejected() {
        let h = harness();
        let data = vec![b'x'; MAX_FILE_SIZE + 1];
        let (status, body) = apply(&h, Some(("resume", "cv.pdf", "application/pdf", data))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Resume must be less than 5MB");
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_apply_with_image_resume_is_rejected() {
        let h = harness();
        let (status, body) = apply(&h, Some(("resume", "me.png", "image/png", vec![1, 2, 3]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Resume must be a PDF or Word document");
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_quick_apply_route_rejects_blank_resume_part() {
        let h = harness();
        let uri = format!("/api/applications/quick-apply/{}", Uuid::new_v4());
        let fields = [
            ("name", "Asha Rao"),
            ("email", "asha@example.com"),
            ("phone", "+91 98100 00000"),
        ];
        let blank = Some(("resume", "", "application/octet-stream", Vec::new()));
        let (status, body) = send(&h, multipart(&uri, &fields, blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Missing required fields");
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_file_is_rejected() {
        let h = harness();
        let role_id = Uuid::new_v4().to_string();
        let (status, body) = send(&h, multipart("/api/upload", &[("roleId", role_id.as_str())], None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No file was provided");
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_with_executable_is_rejected() {
        let h = harness();
        let role_id = Uuid::new_v4().to_string();
        let exe = Some(("file", "setup.exe", "application/x-msdownload", b"MZ\x90\x00".to_vec()));
        let (status, body) = send(&h, multipart("/api/upload", &[("roleId", role_id.as_str())], exe)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "File type 'application/x-msdownload' is not allowed"
        );
        assert_eq!(h.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_session_asset_blank_file_part_is_rejected() {
        let h = harness();
        let (session, _) = h.engine.start(fixtures::context(&["Q1?", "Q2?"])).await;
        h.sessions.save(&session).await.unwrap();

        let uri = format!("/api/chat/sessions/{}/assets", session.id);
        let blank = Some(("file", "", "application/octet-stream", Vec::new()));
        let (status, body) = send(&h, multipart(&uri, &[("kind", "resume")], blank)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "No file was provided");
        assert_eq!(h.storage.put_count(), 0);

        let stored = h.sessions.load(session.id).await.unwrap().unwrap();
        assert!(stored.uploaded_assets.is_empty());
        assert!(stored.answers.is_empty());
    }

    #[tokio::test]
    async fn test_session_asset_is_stored_and_announced() {
        let h = harness();
        let (session, _) = h.engine.start(fixtures::context(&["Q1?", "Q2?"])).await;
        h.sessions.save(&session).await.unwrap();

        let uri = format!("/api/chat/sessions/{}/assets", session.id);
        let cv = Some(("file", "notes.txt", "text/plain", b"Eight years in audit".to_vec()));
        let (status, body) = send(&h, multipart(&uri, &[("kind", "resume")], cv)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["asset"]["status"], "success");
        assert_eq!(h.storage.put_count(), 1);
        assert_eq!(body["session"]["uploaded_assets"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_post_role_validates_before_touching_the_database() {
        let h = harness();
        let body = json!({
            "company_id": Uuid::new_v4(),
            "title": "Energy Analyst",
            "persona": { "persona_name": "Ravi", "conversation_mode": "structured" }
        });
        let (status, body) = send(&h, json_request("POST", "/api/roles", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "Invalid persona: structured mode needs at least one question"
        );
    }

    #[tokio::test]
    async fn test_company_profile_requires_uuid() {
        let h = harness();
        let response = h
            .app
            .oneshot(Request::get("/api/companies/smartjoules").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_requires_role_id() {
        let h = harness();
        let response = h
            .app
            .clone()
            .oneshot(json_request("POST", "/api/chat", json!({ "message": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = h
            .app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({ "roleId": "test-role-id", "message": "hi" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["message"], "Invalid role ID format");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let h = harness();
        let uri = format!("/api/chat/sessions/{}", Uuid::new_v4());
        let response = h
            .app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_message_turn_is_persisted() {
        let h = harness();
        let (session, _) = h.engine.start(fixtures::context(&["Q1?", "Q2?"])).await;
        h.sessions.save(&session).await.unwrap();

        let uri = format!("/api/chat/sessions/{}/messages", session.id);
        let response = h
            .app
            .oneshot(json_request("POST", &uri, json!({ "message": "Eight years in audit" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["turn"]["source"], "model");
        assert_eq!(body["session"]["progress_percentage"], 50);
        assert_eq!(body["session"]["current_question"], "Q2?");

        let stored = h.sessions.load(session.id).await.unwrap().unwrap();
        assert_eq!(stored.answers.len(), 1);
        assert_eq!(stored.answers[0].a, "Eight years in audit");
        assert_eq!(h.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn test_test_key_reports_valid() {
        let h = harness();
        let response = h
            .app
            .oneshot(Request::get("/api/test-key").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["valid"], true);
        assert!(body.get("error").is_none());
    }
}
