//! Handlers for the `/auth` resource (signup, login, refresh, logout).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Datelike, Utc};
use cruisemall_core::error::CoreError;
use cruisemall_core::phone::normalize_phone;
use cruisemall_core::roles::ROLE_CUSTOMER;
use cruisemall_core::schedule::kst_date;
use cruisemall_core::types::DbId;
use cruisemall_core::username::{suggest_usernames, validate_username, SUGGESTION_COUNT};
use cruisemall_db::models::session::CreateSession;
use cruisemall_db::models::user::{CreateUser, User};
use cruisemall_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use validator::Validate;

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Consecutive failed logins before the account locks.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub display_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct UsernameCheckParams {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameCheck {
    pub username: String,
    pub available: bool,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/signup
///
/// Register a customer account. A taken username answers 409 with up to
/// three available alternatives.
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AuthResponse>>)> {
    input.validate()?;
    let username = input.username.trim().to_lowercase();
    validate_username(&username)?;
    validate_password_strength(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let phone = match input.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(raw) => Some(normalize_phone(raw).ok_or_else(|| {
            AppError::Core(CoreError::Validation(format!("Invalid phone number: {raw}")))
        })?),
        None => None,
    };

    if UserRepo::find_by_username(&state.pool, &username).await?.is_some() {
        return Err(username_taken(&state.pool, username).await?);
    }
    let email = input.email.trim().to_lowercase();
    if UserRepo::email_exists(&state.pool, &email).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "An account with this email already exists".into(),
        )));
    }

    let role = RoleRepo::find_by_name(&state.pool, ROLE_CUSTOMER)
        .await?
        .ok_or_else(|| AppError::InternalError("customer role is not seeded".into()))?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let created = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.clone(),
            email,
            password_hash,
            role_id: role.id,
            display_name: input.display_name.clone(),
            phone,
        },
    )
    .await;

    let user = match created {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same name.
        Err(sqlx::Error::Database(db_err))
            if db_err.constraint() == Some("uq_users_username") =>
        {
            return Err(username_taken(&state.pool, username).await?);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = user.id, username = %user.username, "Customer signed up");

    let response = create_auth_response(&state, &user, ROLE_CUSTOMER).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: response })))
}

/// GET /api/v1/auth/username-check?username=
pub async fn username_check(
    State(state): State<AppState>,
    Query(params): Query<UsernameCheckParams>,
) -> AppResult<Json<DataResponse<UsernameCheck>>> {
    let username = params.username.trim().to_lowercase();
    validate_username(&username)?;

    let available = UserRepo::find_by_username(&state.pool, &username)
        .await?
        .is_none();
    let suggestions = if available {
        Vec::new()
    } else {
        available_suggestions(&state.pool, &username).await?
    };

    Ok(Json(DataResponse {
        data: UsernameCheck {
            username,
            available,
            suggestions,
        },
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let username = input.username.trim().to_lowercase();
    let user = UserRepo::find_by_username(&state.pool, &username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if user.failed_login_count + 1 >= MAX_FAILED_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = user.id, "Account locked after repeated failed logins");
        }
        return Err(invalid_credentials());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    let role = role_name(&state.pool, user.role_id).await?;
    let response = create_auth_response(&state, &user, &role).await?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new pair. The old session is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<DataResponse<AuthResponse>>> {
    let hash = hash_refresh_token(&input.refresh_token);
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    SessionRepo::revoke(&state.pool, session.id).await?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let role = role_name(&state.pool, user.role_id).await?;
    let response = create_auth_response(&state, &user, &role).await?;
    Ok(Json(DataResponse { data: response }))
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, revoked, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

async fn role_name(pool: &PgPool, role_id: DbId) -> AppResult<String> {
    RoleRepo::find_by_id(pool, role_id)
        .await?
        .map(|r| r.name)
        .ok_or_else(|| AppError::InternalError(format!("Role {role_id} missing")))
}

/// Up to [`SUGGESTION_COUNT`] unregistered alternatives to `base`.
async fn available_suggestions(pool: &PgPool, base: &str) -> AppResult<Vec<String>> {
    let year = kst_date(Utc::now()).year();
    let candidates = suggest_usernames(base, year);
    let taken = UserRepo::taken_usernames(pool, &candidates).await?;
    Ok(candidates
        .into_iter()
        .filter(|c| !taken.contains(c))
        .take(SUGGESTION_COUNT)
        .collect())
}

async fn username_taken(pool: &PgPool, username: String) -> AppResult<AppError> {
    let suggestions = available_suggestions(pool, &username).await?;
    Ok(AppError::UsernameTaken {
        username,
        suggestions,
    })
}

/// Issue tokens and persist the refresh session.
async fn create_auth_response(
    state: &AppState,
    user: &User,
    role: &str,
) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;
    let access_token = generate_access_token(user.id, role, jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh_hash,
            expires_at: Utc::now() + chrono::Duration::days(jwt.refresh_token_expiry_days),
            user_agent: None,
            ip_address: None,
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: jwt.access_token_expiry_mins * 60,
        user: UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: role.to_string(),
        },
    })
}
