use actix_web::dev::Server;
use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, App, HttpRequest, HttpServer};
use std::net::TcpListener;

use crate::accounts::AccountService;
use crate::auth::SessionService;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    delete_current_user, forgot_password, get_current_user, get_user_by_id, google_callback,
    google_login, health_check, list_sessions, list_users, login, logout, refresh, register,
    resend_verification, reset_password, update_avatar, update_current_user, verify_email,
};

/// Malformed or mistyped JSON bodies get the same error shape as everything else
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(error = %err, "Rejected malformed JSON payload");
    AppError::from(ValidationError::InvalidFormat("request body")).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::warn!(error = %err, "Rejected malformed query string");
    AppError::from(ValidationError::InvalidFormat("query string")).into()
}

pub fn run(
    listener: TcpListener,
    accounts: AccountService,
    sessions: SessionService,
) -> Result<Server, std::io::Error> {
    let guard = sessions.clone();
    let accounts = web::Data::new(accounts);
    let sessions = web::Data::new(sessions);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            // Shared state
            .app_data(accounts.clone())
            .app_data(sessions.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(query_error_handler))
            // Public routes (no authentication required)
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/refresh", web::post().to(refresh))
                    .route("/verify-email", web::post().to(verify_email))
                    .route("/resend-verification", web::post().to(resend_verification))
                    .route("/forgot-password", web::post().to(forgot_password))
                    .route("/reset-password", web::post().to(reset_password))
                    .route("/google", web::get().to(google_login))
                    .route("/google/callback", web::get().to(google_callback)),
            )
            // Protected routes (require an access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(guard.clone()))
                    .route("/auth/logout", web::post().to(logout))
                    .route("/users/me", web::get().to(get_current_user))
                    .route("/users/me", web::put().to(update_current_user))
                    .route("/users/me", web::delete().to(delete_current_user))
                    .route("/users/me/avatar", web::put().to(update_avatar))
                    .route("/users/me/sessions", web::get().to(list_sessions))
                    .route("/users/{id}", web::get().to(get_user_by_id))
                    .route("/users", web::get().to(list_users)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
