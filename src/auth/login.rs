use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::auth::middleware::{AuthUser, DISABLED_ACCOUNT};
use crate::auth::models::{LoginRequest, LoginResponse, UserProfile};
use crate::auth::token::TokenService;
use crate::content::hooks::apply_hooks;
use crate::db::models::{new_id, Entity, Role, User};
use crate::db::query::Filter;
use crate::db::repository::Repository;
use crate::error::AppError;

pub const INVALID_CREDENTIALS: &str = "البريد الإلكتروني أو كلمة المرور غير صحيحة";
pub const DEFAULT_ADMIN_NAME: &str = "مدير النظام";

/// Hash a password on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

async fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("Failed to verify password: {e}")))
}

/// Core login logic, separated from the HTTP layer for testability.
pub async fn process_login(
    users: &dyn Repository<User>,
    tokens: &TokenService,
    request: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let email = request.email.trim().to_lowercase();
    if email.is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "البريد الإلكتروني وكلمة المرور مطلوبان".into(),
        ));
    }

    let user = users
        .find_one(&Filter::new().eq("email", &email))
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&request.password, &user.password_hash).await? {
        tracing::info!(email = %email, "Rejected login");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    if !user.is_active {
        return Err(AppError::Unauthorized(DISABLED_ACCOUNT.into()));
    }

    let token = tokens.issue(&user.id)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(LoginResponse {
        token,
        user: UserProfile::from(&user),
    })
}

/// Create the default admin account when no account uses `email`.
///
/// Returns `true` when an account was created.
pub async fn seed_default_admin(
    users: &dyn Repository<User>,
    email: &str,
    password: &str,
    bcrypt_cost: u32,
) -> Result<bool, AppError> {
    let email = email.trim().to_lowercase();
    if users
        .find_one(&Filter::new().eq("email", &email))
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let now = Utc::now();
    let mut admin = User {
        id: new_id(),
        email,
        password_hash: hash_password(password, bcrypt_cost).await?,
        name: DEFAULT_ADMIN_NAME.to_string(),
        role: Role::Admin,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    apply_hooks(None, &mut admin, now);
    admin.validate()?;
    users.create(&admin).await?;

    tracing::info!(email = %admin.email, "Default admin user created");
    Ok(true)
}

/// `POST /api/auth/login`
pub async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let response = process_login(state.users.as_ref(), &state.tokens, request).await?;
    Ok(Json(ApiResponse::data(response)))
}

/// `GET /api/auth/me`
pub async fn me_handler(AuthUser(user): AuthUser) -> Json<ApiResponse<UserProfile>> {
    Json(ApiResponse::data(UserProfile::from(&user)))
}
