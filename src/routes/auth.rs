/// Authentication Routes
///
/// Refresh-token rotation and logout. The refresh secret only ever travels
/// in the `refresh_token` cookie, scoped to the auth route prefix.

use actix_web::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::auth::{RefreshSessionManager, TokenSigner};
use crate::error::{ApiError, AppError, AuthError, ErrorHandler};
use crate::middleware::{AuthenticatedUser, RequestId};

pub const REFRESH_COOKIE: &str = "refresh_token";
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth";

/// Token refresh response
#[derive(Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Current user response
#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: String,
}

fn refresh_cookie(value: String, expires: OffsetDateTime) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, value)
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .expires(expires)
        .finish()
}

fn presented_refresh_token(req: &HttpRequest) -> Option<String> {
    req.cookie(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// POST /api/v1/auth/refresh
///
/// Exchanges the refresh cookie for a new access token and a rotated
/// refresh cookie. The presented refresh token is single-use.
///
/// # Errors
/// - 401: Missing, unknown, expired or already rotated refresh token
/// - 500: Session store or signing failure
pub async fn refresh(
    req: HttpRequest,
    request_id: RequestId,
    signer: web::Data<TokenSigner>,
    sessions: web::Data<RefreshSessionManager>,
) -> Result<HttpResponse, ApiError> {
    let scoped = |e: AppError| e.scoped(request_id.as_str());

    let old_token = presented_refresh_token(&req)
        .ok_or_else(|| scoped(AuthError::MissingRefreshToken.into()))?;

    let (new_token, user_id) = sessions.rotate(&old_token).await.map_err(scoped)?;

    let access_token = signer
        .issue_access_token(&user_id)
        .map_err(|e| scoped(e.into()))?;

    let ttl = CookieDuration::try_from(sessions.ttl())
        .map_err(|e| scoped(AppError::Internal(e.to_string())))?;
    let cookie = refresh_cookie(new_token, OffsetDateTime::now_utc() + ttl);

    tracing::info!(
        request_id = %request_id,
        user_id = %user_id,
        "Token refreshed successfully"
    );

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(AccessTokenResponse { access_token }))
}

/// POST /api/v1/auth/logout
///
/// Revokes the presented refresh token, if any, and clears the cookie.
/// Always answers 204; store failures are logged only.
pub async fn logout(
    req: HttpRequest,
    request_id: RequestId,
    sessions: web::Data<RefreshSessionManager>,
) -> HttpResponse {
    if let Some(token) = presented_refresh_token(&req) {
        if let Err(e) = sessions.revoke(&token).await {
            e.log_error(request_id.as_str());
        }
    }

    HttpResponse::NoContent()
        .cookie(refresh_cookie(String::new(), OffsetDateTime::UNIX_EPOCH))
        .finish()
}

/// GET /api/v1/me
///
/// **Requires valid JWT access token** in Authorization header.
pub async fn get_current_user(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(UserResponse {
        user_id: user.user_id().to_string(),
    })
}
