use std::sync::{Arc, Mutex};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::Method,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use ideaboard_shared::commands::{FeedbackPayload, IdeaPayload, TopicPayload};
use ideaboard_shared::{FeedbackCommand, IdeaCommand, TopicCommand};
use ideaboard_store::{
    Database, Entity, Feedback, IdeaView, StoreError, TopicDetail, TopicView,
};

use crate::auth::require_api_key;
use crate::config::ServerConfig;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    let api = Router::new()
        .route("/topics", get(list_topics).post(create_topic))
        .route(
            "/topics/:id",
            get(get_topic).put(update_topic).delete(archive_topic),
        )
        .route("/ideas", post(create_idea))
        .route(
            "/ideas/:id",
            get(get_idea).put(update_idea).delete(archive_idea),
        )
        .route(
            "/ideas/:id/feedback",
            put(set_feedback).delete(clear_feedback),
        )
        .route("/tags", get(list_tags))
        .route("/archive/topics", get(list_archived_topics))
        .route("/archive/ideas", get(list_archived_ideas))
        .route("/archive/topics/:id/restore", post(restore_topic))
        .route("/archive/ideas/:id/restore", post(restore_idea))
        .route(
            "/archive/topics/:id/permanent-delete",
            delete(purge_topic),
        )
        .route("/archive/ideas/:id/permanent-delete", delete(purge_idea))
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct SuccessResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

impl SuccessResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
        })
    }

    fn with_message(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message),
        })
    }
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Helpers ───

/// Run `f` against the database on the blocking pool, holding the lock for
/// the whole operation.
async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ServerError>
where
    T: Send + 'static,
    F: FnOnce(&mut Database) -> Result<T, StoreError> + Send + 'static,
{
    let db = Arc::clone(&state.db);
    tokio::task::spawn_blocking(move || {
        let mut guard = db
            .lock()
            .map_err(|_| ServerError::Internal("database lock poisoned".into()))?;
        f(&mut *guard).map_err(ServerError::from)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("database task failed: {e}")))?
}

/// Ids that aren't UUIDs can't name anything that exists.
fn parse_id(raw: &str, entity: Entity) -> Result<Uuid, ServerError> {
    Uuid::parse_str(raw).map_err(|_| StoreError::NotFound(entity).into())
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServerError::BadRequest(rejection.body_text()))
}

// ─── Topics ───

async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<TopicView>>, ServerError> {
    with_db(&state, |db| db.list_topics()).await.map(Json)
}

async fn create_topic(
    State(state): State<AppState>,
    body: Result<Json<TopicPayload>, JsonRejection>,
) -> Result<Json<TopicView>, ServerError> {
    let cmd = TopicCommand::try_from(json_body(body)?)?;
    with_db(&state, move |db| db.create_topic(&cmd)).await.map(Json)
}

async fn get_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TopicDetail>, ServerError> {
    let id = parse_id(&id, Entity::Topic)?;
    with_db(&state, move |db| db.topic_detail(id)).await.map(Json)
}

async fn update_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TopicPayload>, JsonRejection>,
) -> Result<Json<TopicView>, ServerError> {
    let id = parse_id(&id, Entity::Topic)?;
    let cmd = TopicCommand::try_from(json_body(body)?)?;
    with_db(&state, move |db| db.update_topic(id, &cmd)).await.map(Json)
}

async fn archive_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let id = parse_id(&id, Entity::Topic)?;
    with_db(&state, move |db| db.archive_topic(id)).await?;
    Ok(SuccessResponse::ok())
}

// ─── Ideas ───

async fn create_idea(
    State(state): State<AppState>,
    body: Result<Json<IdeaPayload>, JsonRejection>,
) -> Result<Json<IdeaView>, ServerError> {
    let cmd = IdeaCommand::try_from(json_body(body)?)?;
    with_db(&state, move |db| db.create_idea(&cmd)).await.map(Json)
}

async fn get_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdeaView>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    with_db(&state, move |db| db.project_idea(id)).await.map(Json)
}

async fn update_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<IdeaPayload>, JsonRejection>,
) -> Result<Json<IdeaView>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    let cmd = IdeaCommand::try_from(json_body(body)?)?;
    with_db(&state, move |db| db.update_idea(id, &cmd)).await.map(Json)
}

async fn archive_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    with_db(&state, move |db| db.archive_idea(id)).await?;
    Ok(SuccessResponse::ok())
}

async fn set_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<FeedbackPayload>, JsonRejection>,
) -> Result<Json<Feedback>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    let cmd = FeedbackCommand::try_from(json_body(body)?)?;
    with_db(&state, move |db| db.set_feedback(id, &cmd)).await.map(Json)
}

async fn clear_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    let removed = with_db(&state, move |db| db.clear_feedback(id)).await?;
    Ok(Json(SuccessResponse {
        success: removed,
        message: None,
    }))
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<String>>, ServerError> {
    with_db(&state, |db| db.list_tags()).await.map(Json)
}

// ─── Archive ───

async fn list_archived_topics(
    State(state): State<AppState>,
) -> Result<Json<Vec<TopicView>>, ServerError> {
    with_db(&state, |db| db.list_archived_topics()).await.map(Json)
}

async fn list_archived_ideas(
    State(state): State<AppState>,
) -> Result<Json<Vec<IdeaView>>, ServerError> {
    with_db(&state, |db| db.list_archived_ideas()).await.map(Json)
}

async fn restore_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TopicView>, ServerError> {
    let id = parse_id(&id, Entity::Topic)?;
    with_db(&state, move |db| db.restore_topic(id)).await.map(Json)
}

async fn restore_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IdeaView>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    with_db(&state, move |db| db.restore_idea(id)).await.map(Json)
}

async fn purge_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let id = parse_id(&id, Entity::Topic)?;
    with_db(&state, move |db| db.purge_topic(id)).await?;
    Ok(SuccessResponse::with_message("Topic permanently deleted"))
}

async fn purge_idea(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServerError> {
    let id = parse_id(&id, Entity::Idea)?;
    with_db(&state, move |db| db.purge_idea(id)).await?;
    Ok(SuccessResponse::with_message("Idea permanently deleted"))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
