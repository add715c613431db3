/// Domain entities
///
/// Plain records shared by the account engine, the session layer and the stores.

mod refresh_token;
mod user;

pub use refresh_token::RefreshToken;
pub use user::User;
