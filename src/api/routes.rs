//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Institution, NormalizedAccount, OperationContext, TransactionDetail, UserProfile,
};
use crate::error::AppError;
use crate::handlers::{
    AggregationHandler, CreateTestLinksResult, DeleteUserCommand, DeleteUserHandler,
    LoginCommand, LoginHandler, LoginResult, LogoutCommand, LogoutHandler, RefreshHandler,
    RefreshResult, RegisterUserCommand, RegisterUserHandler, RequestPasswordResetCommand,
    RequestPasswordResetHandler, ResetPasswordCommand, ResetPasswordHandler,
    TransactionsCommand, TransactionsReport,
};
use crate::state::AppState;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::middleware::{auth_middleware, AuthenticatedUser};

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResetCodeResponse {
    pub message: String,
    pub expires_at: DateTime<Utc>,
    /// Only present when codes are returned in-band
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    #[serde(default)]
    pub link_id: Option<String>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router. Everything except registration, password reset,
/// login and refresh requires a bearer access token.
pub fn create_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/users/", post(register_user))
        .route("/users/reset_password/request/", post(request_password_reset))
        .route("/users/reset_password/", post(reset_password))
        .route("/auth/login/", post(login))
        .route("/auth/refresh/", post(refresh));

    let protected = Router::new()
        .route("/users/:user_id/", delete(delete_user))
        .route("/auth/logout/", post(logout))
        .route("/belvo/create_test_links/", post(create_test_links))
        .route("/belvo/all_accounts/", get(all_accounts))
        .route("/belvo/accounts/", get(accounts))
        .route("/belvo/institutions/", get(institutions))
        .route("/belvo/transactions/", get(transactions))
        .route("/belvo/:transaction_id/details/", get(transaction_details))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    public.merge(protected)
}

// =========================================================================
// Users
// =========================================================================

/// POST /api/users/
async fn register_user(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    let command = RegisterUserCommand {
        email: request.email,
        password: request.password,
        first_name: request.first_name,
        last_name: request.last_name,
    };

    let profile = RegisterUserHandler::new(&state)
        .execute(command, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

/// DELETE /api/users/:user_id/
async fn delete_user(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<StatusCode, AppError> {
    let command = DeleteUserCommand {
        target_user_id: user_id,
        requested_by: user.user_id,
    };

    DeleteUserHandler::new(&state)
        .execute(command, &context)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/users/reset_password/request/
async fn request_password_reset(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(command): ApiJson<RequestPasswordResetCommand>,
) -> Result<Json<ResetCodeResponse>, AppError> {
    let issued = RequestPasswordResetHandler::new(&state)
        .execute(command, &context)
        .await?;

    Ok(Json(ResetCodeResponse {
        message: "Password reset code issued".to_string(),
        expires_at: issued.expires_at,
        code: state.expose_reset_codes.then_some(issued.code),
    }))
}

/// POST /api/users/reset_password/
async fn reset_password(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(command): ApiJson<ResetPasswordCommand>,
) -> Result<Json<MessageResponse>, AppError> {
    ResetPasswordHandler::new(&state)
        .execute(command, &context)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}

// =========================================================================
// Sessions
// =========================================================================

/// POST /api/auth/login/
async fn login(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResult>, AppError> {
    let command = LoginCommand {
        email: request.email,
        password: request.password,
    };

    let result = LoginHandler::new(&state).execute(command, &context).await?;
    Ok(Json(result))
}

/// POST /api/auth/refresh/
async fn refresh(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResult>, AppError> {
    let result = RefreshHandler::new(&state).execute(&request.refresh).await?;
    Ok(Json(result))
}

/// POST /api/auth/logout/
async fn logout(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<LogoutRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    LogoutHandler::new(&state)
        .execute(
            LogoutCommand::new(request.refresh_token, user.user_id),
            &context,
        )
        .await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

// =========================================================================
// Belvo
// =========================================================================

/// POST /api/belvo/create_test_links/
async fn create_test_links(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<(StatusCode, Json<CreateTestLinksResult>), AppError> {
    let result = AggregationHandler::new(&state)
        .create_test_links(user.user_id, &context)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /api/belvo/all_accounts/
async fn all_accounts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<NormalizedAccount>>, AppError> {
    let accounts = AggregationHandler::new(&state)
        .all_accounts(user.user_id)
        .await?;
    Ok(Json(accounts))
}

/// GET /api/belvo/accounts/?link_id=
async fn accounts(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(query): ApiQuery<AccountsQuery>,
) -> Result<Json<Vec<NormalizedAccount>>, AppError> {
    let link_id = query.link_id.unwrap_or_default();
    let accounts = AggregationHandler::new(&state)
        .accounts_for_link(user.user_id, &link_id)
        .await?;
    Ok(Json(accounts))
}

/// GET /api/belvo/institutions/
async fn institutions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Institution>>, AppError> {
    let institutions = AggregationHandler::new(&state).institutions().await?;
    Ok(Json(institutions))
}

/// GET /api/belvo/transactions/?link_id&account_id&date_from&date_to
async fn transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiQuery(command): ApiQuery<TransactionsCommand>,
) -> Result<Json<TransactionsReport>, AppError> {
    let report = AggregationHandler::new(&state)
        .transactions(user.user_id, command)
        .await?;
    Ok(Json(report))
}

/// GET /api/belvo/:transaction_id/details/
async fn transaction_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(transaction_id): ApiPath<String>,
) -> Result<Json<TransactionDetail>, AppError> {
    let detail = AggregationHandler::new(&state)
        .transaction_details(user.user_id, &transaction_id)
        .await?;
    Ok(Json(detail))
}
