use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use recruit_api::config::Config;
use recruit_api::db::create_pool;
use recruit_api::interview::engine::{InterviewEngine, RetryPolicy};
use recruit_api::interview::store::RedisSessionStore;
use recruit_api::llm_client::{CompletionProvider, LlmClient};
use recruit_api::routes::build_router;
use recruit_api::state::AppState;
use recruit_api::storage::S3ObjectStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    recruit_api::init_tracing(env!("CARGO_CRATE_NAME"), &config.rust_log);

    info!("Starting Recruit API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url, 10).await?;

    // Initialize Redis-backed chat sessions
    let redis = redis::Client::open(config.redis_url.clone())?;
    let sessions = Arc::new(RedisSessionStore::connect(&redis, config.session_ttl_secs).await?);
    info!("Session store initialized (ttl {}s)", config.session_ttl_secs);

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    let storage = Arc::new(S3ObjectStore::new(
        s3,
        config.s3_bucket.clone(),
        config.storage_public_url.clone(),
    ));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Initialize LLM client
    let llm_client = LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_api_url.clone(),
        config.openai_model.clone(),
    )?;
    info!("LLM client initialized (model: {})", llm_client.primary_model());
    let llm: Arc<dyn CompletionProvider> = Arc::new(llm_client);

    let retry = RetryPolicy {
        max_attempts: config.chat_max_attempts,
        delay: config.chat_retry_delay,
    };
    let engine = InterviewEngine::new(llm.clone(), retry);

    // Build app state
    let state = AppState {
        db,
        sessions,
        storage,
        llm,
        engine,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the deployed frontend

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "recruit-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
