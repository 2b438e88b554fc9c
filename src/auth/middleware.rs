use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app::AppState;
use crate::db::models::{Role, User};
use crate::error::AppError;

pub const MISSING_TOKEN: &str = "غير مصرح - لا يوجد توكن";
pub const UNKNOWN_USER: &str = "غير مصرح - المستخدم غير موجود";
pub const DISABLED_ACCOUNT: &str = "الحساب معطل";
pub const ADMIN_REQUIRED: &str = "غير مصرح - صلاحيات المدير مطلوبة";

/// Bearer token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// An authenticated, active account.
///
/// Rejects with 401 when the token is missing, invalid or expired, or when
/// the account no longer exists or is disabled.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token =
            bearer_token(header).ok_or_else(|| AppError::Unauthorized(MISSING_TOKEN.into()))?;

        let claims = state.tokens.verify(token)?;

        let user = state
            .users
            .find_by_id(&claims.id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(UNKNOWN_USER.into()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized(DISABLED_ACCOUNT.into()));
        }

        Ok(AuthUser(user))
    }
}

/// An authenticated account with the admin role; 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            tracing::debug!(user_id = %user.id, "Admin role required");
            return Err(AppError::Forbidden(ADMIN_REQUIRED.into()));
        }
        Ok(AdminUser(user))
    }
}
