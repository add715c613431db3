/// Google sign-in
///
/// The state minted at the start of the flow travels in an http-only cookie and
/// must come back unchanged as the `state` query parameter of the callback.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::accounts::AccountService;
use crate::auth::SessionService;
use crate::error::AppError;
use crate::routes::auth::AuthResponse;
use crate::routes::users::UserResponse;
use crate::validators::is_valid_token;

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;
const OAUTH_COOKIE_PATH: &str = "/auth/google";

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn state_cookie(value: String) -> Cookie<'static> {
    Cookie::build(OAUTH_STATE_COOKIE, value)
        .path(OAUTH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(OAUTH_STATE_TTL_MINUTES))
        .finish()
}

fn expired_state_cookie() -> Cookie<'static> {
    let mut cookie = state_cookie(String::new());
    cookie.make_removal();
    cookie
}

/// GET /auth/google
///
/// Redirects the browser to the provider's consent page.
pub async fn google_login(accounts: web::Data<AccountService>) -> Result<HttpResponse, AppError> {
    let authorization = accounts.oauth_authorization()?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, authorization.auth_url))
        .cookie(state_cookie(authorization.state))
        .finish())
}

/// GET /auth/google/callback?code=&state=
///
/// # Errors
/// - 401: Missing or mismatched state, or the user denied consent
/// - 409: Email already linked to a different Google account
/// - 502: Code exchange or profile fetch failed
pub async fn google_callback(
    req: HttpRequest,
    query: web::Query<CallbackQuery>,
    accounts: web::Data<AccountService>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    if let Some(reason) = &query.error {
        tracing::warn!(reason = %reason, "OAuth consent was not granted");
        return Err(AppError::Unauthorized("authorization was denied"));
    }

    let expected = req
        .cookie(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::Unauthorized("missing OAuth state"))?;
    match query.state.as_deref() {
        Some(state) if state == expected => {}
        _ => {
            tracing::warn!("OAuth state mismatch");
            return Err(AppError::Unauthorized("invalid OAuth state"));
        }
    }

    let code = is_valid_token("code", query.code.as_deref().unwrap_or_default())?;

    let user = accounts.handle_oauth_callback(&code).await?;
    let tokens = sessions.start(user.id).await?;

    Ok(HttpResponse::Ok()
        .cookie(expired_state_cookie())
        .json(AuthResponse {
            tokens,
            user: UserResponse::from(user),
        }))
}
