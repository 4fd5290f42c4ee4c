//! Route definitions for the profiles API.
//!
//! Provides HTTP endpoints for login, user profiles, the status feed,
//! sentiment analysis, stored messages, and health checks.

use crate::auth::{auth_middleware, AuthState, AuthUser};
use crate::feed::{FeedItem, FeedItemRequest, FeedStore};
use crate::message::{MessageItem, MessageRequest, MessageStore, MAX_MESSAGE_CHARS};
use crate::permissions::{check_object_permission, UpdateOwnProfile, UpdateOwnStatus};
use crate::profile::{NewProfile, ProfileChanges, ProfileStore, UserProfile};
use crate::store::{require_text, PaginationQuery};
use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use profiles_common::config::Config;
use profiles_common::Error;
use profiles_sentiment::{AnalysisResult, TextAnalyzer};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Signing secret used when none is configured. Development only.
const DEFAULT_JWT_SECRET: &str = "profiles-api-default-secret-change-me!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub profiles: Arc<ProfileStore>,
    pub feed: Arc<FeedStore>,
    pub messages: Arc<MessageStore>,
    pub analyzer: Arc<TextAnalyzer>,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: &str, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.into(),
        }),
    )
}

/// Map a service error onto its HTTP status and code.
///
/// Server-side failures are logged and reported without their details.
pub fn api_error(err: Error) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
        tracing::error!(error = %err, "Request failed");
        return error_response(status, "Internal server error", err.code());
    }
    if status == StatusCode::BAD_GATEWAY {
        tracing::warn!(error = %err, "Upstream service failed");
    }
    error_response(status, &err.to_string(), err.code())
}

fn not_found(what: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, &format!("{what} not found"), "NOT_FOUND")
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
}

/// Login request body. `username` is the profile email.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Login response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
}

/// Public view of a profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            name: profile.name,
        }
    }
}

/// A page of results with the total count.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub results: Vec<T>,
}

/// Profile list query: optional search term plus pagination.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

impl ProfileListQuery {
    fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            limit: self.limit,
            offset: self.offset,
        }
    }

    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Sentiment request body.
#[derive(Debug, Default, Deserialize)]
pub struct SentimentRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Sentiment response: the analyzed message and its analysis.
#[derive(Debug, Serialize, Deserialize)]
pub struct SentimentResponse {
    pub message: String,
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

/// Build the complete router with all routes.
pub fn build_all_routes(config: &Config) -> anyhow::Result<Router> {
    let analyzer =
        TextAnalyzer::from_config(config).context("Failed to initialize text analyzer")?;
    build_all_routes_with_db(config, None, Arc::new(analyzer))
}

/// Build the complete router using a custom database path and analyzer.
/// Tests use this with isolated databases and fake collaborators.
pub fn build_all_routes_with_db(
    config: &Config,
    db_path: Option<PathBuf>,
    analyzer: Arc<TextAnalyzer>,
) -> anyhow::Result<Router> {
    let jwt_secret = config.auth.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("No JWT secret configured, using the development default");
        DEFAULT_JWT_SECRET.to_string()
    });
    let auth_state = AuthState::new(jwt_secret, config.auth.token_expiry_secs);

    let db_path = db_path.unwrap_or_else(|| config.storage.resolved_db_path());
    // Profiles first: the feed table references it.
    let profiles = Arc::new(
        ProfileStore::new(&db_path)
            .with_context(|| format!("Failed to open profile store at {}", db_path.display()))?,
    );
    let feed = Arc::new(FeedStore::new(&db_path).context("Failed to open feed store")?);
    let messages = Arc::new(MessageStore::new(&db_path).context("Failed to open message store")?);

    let app_state = AppState {
        auth: auth_state.clone(),
        profiles,
        feed,
        messages,
        analyzer,
    };

    let app_routes = Router::new()
        // Login
        .route("/api/login", post(login_handler))
        .route("/api/login/me", get(me_handler))
        // Profiles
        .route(
            "/api/profile",
            get(list_profiles_handler).post(create_profile_handler),
        )
        .route(
            "/api/profile/:id",
            get(get_profile_handler)
                .put(replace_profile_handler)
                .patch(patch_profile_handler)
                .delete(delete_profile_handler),
        )
        // Feed (authenticated)
        .route("/api/feed", get(list_feed_handler).post(create_feed_handler))
        .route(
            "/api/feed/:id",
            get(get_feed_handler)
                .put(replace_feed_handler)
                .patch(patch_feed_handler)
                .delete(delete_feed_handler),
        )
        // Sentiment
        .route("/api/sentiment", post(sentiment_handler))
        .route(
            "/api/messages",
            get(list_messages_handler).post(create_message_handler),
        )
        .route(
            "/api/messages/:id",
            get(get_message_handler)
                .put(replace_message_handler)
                .patch(patch_message_handler)
                .delete(delete_message_handler),
        )
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(app_state);

    Ok(Router::new().merge(app_routes).merge(health_routes()))
}

/// Build health check routes.
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "profiles-api".into(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Login Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let username = request.username.as_deref().unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();
    if username.trim().is_empty() || password.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Must include \"username\" and \"password\"",
            "INVALID_INPUT",
        ));
    }

    let profile = state
        .profiles
        .verify_credentials(username, password)
        .map_err(api_error)?;

    let Some(profile) = profile else {
        tracing::info!("Rejected login attempt");
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Unable to log in with provided credentials",
            "AUTH_INVALID_CREDENTIALS",
        ));
    };

    let token = state.auth.generate_token(profile.id).map_err(|e| {
        tracing::error!(error = %e, "Failed to generate token");
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate token",
            "AUTH_TOKEN_ERROR",
        )
    })?;

    tracing::info!(profile_id = profile.id, "Issued login token");
    Ok(Json(LoginResponse {
        token,
        expires_in: state.auth.token_expiry_secs,
    }))
}

async fn me_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    current_profile(&state, user).map(|p| Json(p.into()))
}

/// Load the authenticated profile, rejecting tokens whose profile is gone
/// or deactivated.
fn current_profile(state: &AppState, user: AuthUser) -> Result<UserProfile, ApiError> {
    match state.profiles.get(user.profile_id).map_err(api_error)? {
        Some(profile) if profile.is_active => Ok(profile),
        _ => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "User inactive or deleted",
            "AUTH_INVALID_TOKEN",
        )),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Profile Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_profiles_handler(
    State(state): State<AppState>,
    Query(query): Query<ProfileListQuery>,
) -> Result<Json<Page<ProfileResponse>>, ApiError> {
    let page = query.pagination();
    let search = query.search_term();

    let count = state.profiles.count(search).map_err(api_error)?;
    let profiles = state
        .profiles
        .list(search, page.limit(), page.offset())
        .map_err(api_error)?;

    Ok(Json(Page {
        count,
        results: profiles.into_iter().map(ProfileResponse::from).collect(),
    }))
}

async fn create_profile_handler(
    State(state): State<AppState>,
    Json(request): Json<NewProfile>,
) -> Result<(StatusCode, Json<ProfileResponse>), ApiError> {
    let profile = state.profiles.create(&request).map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(profile.into())))
}

async fn get_profile_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.get(id).map_err(api_error)?;
    profile
        .map(|p| Json(p.into()))
        .ok_or_else(|| not_found("Profile"))
}

/// Fetch a profile and check the caller may write to it.
fn writable_profile(
    state: &AppState,
    method: &Method,
    user: Option<AuthUser>,
    id: i64,
) -> Result<UserProfile, ApiError> {
    let profile = state
        .profiles
        .get(id)
        .map_err(api_error)?
        .ok_or_else(|| not_found("Profile"))?;
    check_object_permission::<UpdateOwnProfile, _>(method, user.as_ref(), &profile)?;
    Ok(profile)
}

async fn replace_profile_handler(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<i64>,
    Json(request): Json<NewProfile>,
) -> Result<Json<ProfileResponse>, ApiError> {
    writable_profile(&state, &method, user, id)?;

    for (field, value) in [
        ("email", &request.email),
        ("name", &request.name),
        ("password", &request.password),
    ] {
        if value.is_none() {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("{field} is required"),
                "INVALID_INPUT",
            ));
        }
    }

    update_profile(&state, id, &ProfileChanges::from(request))
}

async fn patch_profile_handler(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<i64>,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<ProfileResponse>, ApiError> {
    writable_profile(&state, &method, user, id)?;
    update_profile(&state, id, &changes)
}

fn update_profile(
    state: &AppState,
    id: i64,
    changes: &ProfileChanges,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = state.profiles.update(id, changes).map_err(api_error)?;
    profile
        .map(|p| Json(p.into()))
        .ok_or_else(|| not_found("Profile"))
}

async fn delete_profile_handler(
    State(state): State<AppState>,
    method: Method,
    user: Option<AuthUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    writable_profile(&state, &method, user, id)?;
    if !state.profiles.delete(id).map_err(api_error)? {
        return Err(not_found("Profile"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_feed_handler(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Page<FeedItem>>, ApiError> {
    let count = state.feed.count().map_err(api_error)?;
    let results = state
        .feed
        .list(page.limit(), page.offset())
        .map_err(api_error)?;
    Ok(Json(Page { count, results }))
}

async fn create_feed_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<FeedItemRequest>,
) -> Result<(StatusCode, Json<FeedItem>), ApiError> {
    let profile = current_profile(&state, user)?;
    let item = state
        .feed
        .create(profile.id, request.status_text.as_deref())
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_feed_handler(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<FeedItem>, ApiError> {
    let item = state.feed.get(id).map_err(api_error)?;
    item.map(Json).ok_or_else(|| not_found("Feed item"))
}

/// Fetch a feed item and check the caller authored it.
fn writable_feed_item(
    state: &AppState,
    method: &Method,
    user: AuthUser,
    id: i64,
) -> Result<FeedItem, ApiError> {
    let item = state
        .feed
        .get(id)
        .map_err(api_error)?
        .ok_or_else(|| not_found("Feed item"))?;
    check_object_permission::<UpdateOwnStatus, _>(method, Some(&user), &item)?;
    Ok(item)
}

async fn replace_feed_handler(
    State(state): State<AppState>,
    method: Method,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<FeedItemRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    writable_feed_item(&state, &method, user, id)?;
    let item = state
        .feed
        .update(id, request.status_text.as_deref())
        .map_err(api_error)?;
    item.map(Json).ok_or_else(|| not_found("Feed item"))
}

async fn patch_feed_handler(
    State(state): State<AppState>,
    method: Method,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<FeedItemRequest>,
) -> Result<Json<FeedItem>, ApiError> {
    let current = writable_feed_item(&state, &method, user, id)?;
    let Some(status_text) = request.status_text.as_deref() else {
        return Ok(Json(current));
    };
    let item = state
        .feed
        .update(id, Some(status_text))
        .map_err(api_error)?;
    item.map(Json).ok_or_else(|| not_found("Feed item"))
}

async fn delete_feed_handler(
    State(state): State<AppState>,
    method: Method,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    writable_feed_item(&state, &method, user, id)?;
    if !state.feed.delete(id).map_err(api_error)? {
        return Err(not_found("Feed item"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ─────────────────────────────────────────────────────────────────────────────
// Sentiment Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Analyze a message. Nothing is stored.
async fn sentiment_handler(
    State(state): State<AppState>,
    Json(request): Json<SentimentRequest>,
) -> Result<Json<SentimentResponse>, ApiError> {
    let message = require_text("message", request.message.as_deref(), MAX_MESSAGE_CHARS)
        .map_err(api_error)?;

    let analysis = state
        .analyzer
        .analyze(Some(&message))
        .await
        .map_err(|e| api_error(e.into()))?;

    Ok(Json(SentimentResponse { message, analysis }))
}

async fn list_messages_handler(
    State(state): State<AppState>,
    Query(page): Query<PaginationQuery>,
) -> Result<Json<Page<MessageItem>>, ApiError> {
    let count = state.messages.count().map_err(api_error)?;
    let results = state
        .messages
        .list(page.limit(), page.offset())
        .map_err(api_error)?;
    Ok(Json(Page { count, results }))
}

async fn create_message_handler(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> Result<(StatusCode, Json<MessageItem>), ApiError> {
    let item = state
        .messages
        .create(request.message.as_deref())
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_message_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageItem>, ApiError> {
    let item = state.messages.get(id).map_err(api_error)?;
    item.map(Json).ok_or_else(|| not_found("Message"))
}

async fn replace_message_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageItem>, ApiError> {
    let item = state
        .messages
        .update(id, request.message.as_deref())
        .map_err(api_error)?;
    item.map(Json).ok_or_else(|| not_found("Message"))
}

async fn patch_message_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<MessageItem>, ApiError> {
    match request.message.as_deref() {
        Some(message) => {
            let item = state
                .messages
                .update(id, Some(message))
                .map_err(api_error)?;
            item.map(Json).ok_or_else(|| not_found("Message"))
        }
        None => get_message_handler(State(state), Path(id)).await,
    }
}

async fn delete_message_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.messages.delete(id).map_err(api_error)? {
        return Err(not_found("Message"));
    }
    Ok(StatusCode::NO_CONTENT)
}
