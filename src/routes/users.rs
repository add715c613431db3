/// User Profile Routes
///
/// Everything here sits behind the JWT middleware; the caller's identity comes
/// from the injected `Claims`.

use actix_web::{web, HttpResponse};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accounts::AccountService;
use crate::auth::{Claims, SessionService};
use crate::domain::{RefreshToken, User};
use crate::error::{AppError, ValidationError};
use crate::validators::{is_valid_name, is_valid_phone};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_AVATAR_URL_LENGTH: usize = 2048;

/// Public view of a user; credentials and one-time tokens never leave the service
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub oauth_provider: Option<String>,
    pub email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email,
            name: user.name,
            phone: user.phone,
            avatar_url: user.avatar_url,
            oauth_provider: user.oauth_provider,
            email_verified: user.email_verified,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub created_at: String,
    pub expires_at: String,
}

impl From<RefreshToken> for SessionResponse {
    fn from(token: RefreshToken) -> Self {
        Self {
            id: token.id.to_string(),
            created_at: token.created_at.to_rfc3339(),
            expires_at: token.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateAvatarRequest {
    pub avatar_url: String,
}

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn parse_avatar_url(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("avatar_url"));
    }
    if trimmed.len() > MAX_AVATAR_URL_LENGTH {
        return Err(ValidationError::TooLong("avatar_url", MAX_AVATAR_URL_LENGTH));
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.into()),
        _ => Err(ValidationError::InvalidFormat("avatar_url")),
    }
}

/// GET /api/users/me
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let user = accounts.get_user(claims.user_id()?).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/users/me
///
/// Replaces name and phone; an omitted or blank phone clears it.
pub async fn update_current_user(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateProfileRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let name = is_valid_name(&form.name)?;
    let phone = is_valid_phone(form.phone.as_deref())?;

    let user = accounts.update_profile(claims.user_id()?, name, phone).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// PUT /api/users/me/avatar
///
/// Records the URL of an image hosted elsewhere.
pub async fn update_avatar(
    claims: web::ReqData<Claims>,
    form: web::Json<UpdateAvatarRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let avatar_url = parse_avatar_url(&form.avatar_url)?;

    let user = accounts.update_avatar(claims.user_id()?, avatar_url).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /api/users/me
///
/// Revokes every session first so no refresh token outlives the account.
pub async fn delete_current_user(
    claims: web::ReqData<Claims>,
    accounts: web::Data<AccountService>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    sessions.logout(user_id).await?;
    accounts.delete_user(user_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/users/me/sessions
pub async fn list_sessions(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let active: Vec<SessionResponse> = sessions
        .active_sessions(claims.user_id()?)
        .await?
        .into_iter()
        .map(SessionResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(active))
}

/// GET /api/users/{id}
pub async fn get_user_by_id(
    path: web::Path<String>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let user_id =
        Uuid::parse_str(&path).map_err(|_| ValidationError::InvalidFormat("user id"))?;

    let user = accounts.get_user(user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// GET /api/users?limit=&offset=
pub async fn list_users(
    query: web::Query<ListUsersQuery>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let users: Vec<UserResponse> = accounts
        .list_users(
            query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            query.offset.unwrap_or(0),
        )
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}
