mod auth;
mod health_check;
mod oauth;
mod users;

pub use auth::{
    forgot_password, login, logout, refresh, register, resend_verification, reset_password,
    verify_email, AuthResponse, MessageResponse,
};
pub use health_check::health_check;
pub use oauth::{google_callback, google_login, OAUTH_STATE_COOKIE};
pub use users::{
    delete_current_user, get_current_user, get_user_by_id, list_sessions, list_users,
    update_avatar, update_current_user, SessionResponse, UserResponse,
};
