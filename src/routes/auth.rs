/// Authentication Routes
///
/// Registration, login, token refresh, email verification, password reset and logout.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::accounts::AccountService;
use crate::auth::{Claims, SessionService, TokenPair};
use crate::error::AppError;
use crate::routes::users::UserResponse;
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_password, is_valid_phone, is_valid_token,
};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Body of resend-verification and forgot-password
#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Tokens plus the profile of the user they were issued for
#[derive(Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// POST /auth/register
///
/// Creates an unverified account and emails a verification link.
/// No tokens are issued until the email is verified and the user logs in.
///
/// # Errors
/// - 400: Validation errors (invalid email/password/name/phone)
/// - 409: Email already registered
/// - 500: Hashing or storage failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;
    is_valid_password(&form.password)?;
    let phone = is_valid_phone(form.phone.as_deref())?;

    let user = accounts.register(email, &form.password, name, phone).await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// POST /auth/login
///
/// # Errors
/// - 400: Account has no password (OAuth-only)
/// - 401: Invalid credentials (email not found or wrong password, same response)
/// - 403: Email not verified
pub async fn login(
    form: web::Json<LoginRequest>,
    accounts: web::Data<AccountService>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    // A malformed email cannot belong to anyone
    let email = is_valid_email(&form.email).map_err(|_| AppError::InvalidCredentials)?;

    let user = accounts.login(&email, &form.password).await?;
    let tokens = sessions.start(user.id).await?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        tokens,
        user: UserResponse::from(user),
    }))
}

/// POST /auth/refresh
///
/// Single-use rotation: the presented refresh token is revoked and a new pair issued.
///
/// # Errors
/// - 401: Invalid, expired, revoked or unknown refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let presented = is_valid_token("refresh_token", &form.refresh_token)?;
    let (_, tokens) = sessions.refresh(&presented).await?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/verify-email
///
/// # Errors
/// - 400: Unknown token
/// - 410: Token expired
pub async fn verify_email(
    form: web::Json<VerifyEmailRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let token = is_valid_token("token", &form.token)?;
    let user = accounts.verify_email(&token).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// POST /auth/resend-verification
///
/// # Errors
/// - 400: Already verified
/// - 404: Unknown email
/// - 503: Email could not be sent
pub async fn resend_verification(
    form: web::Json<EmailRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    accounts.resend_verification_email(&email).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Verification email sent")))
}

/// POST /auth/forgot-password
///
/// Always 200 for a well-formed email, whether or not an account exists.
pub async fn forgot_password(
    form: web::Json<EmailRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    accounts.forgot_password(&email).await;

    Ok(HttpResponse::Ok().json(MessageResponse::new(
        "If an account exists for this email, a password reset link has been sent",
    )))
}

/// POST /auth/reset-password
///
/// # Errors
/// - 400: Unknown token or invalid new password
/// - 410: Token expired
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    accounts: web::Data<AccountService>,
) -> Result<HttpResponse, AppError> {
    let token = is_valid_token("token", &form.token)?;
    is_valid_password(&form.new_password)?;

    accounts.reset_password(&token, &form.new_password).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password has been reset")))
}

/// POST /api/auth/logout
///
/// Revokes every refresh token of the caller, on all devices.
pub async fn logout(
    claims: web::ReqData<Claims>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    sessions.logout(user_id).await?;

    tracing::info!(user_id = %user_id, "User logged out");
    Ok(HttpResponse::Ok().json(MessageResponse::new("Logged out")))
}
