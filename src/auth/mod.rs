/// Authentication module
///
/// Password hashing, opaque one-time tokens, JWT issuance/validation,
/// refresh token bookkeeping and the session protocol built on top of them.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod session;
mod token;

pub use claims::{Claims, TokenType};
pub use jwt::JwtService;
pub use password::PasswordHasher;
pub use refresh_token::RefreshTokenService;
pub use session::{SessionService, TokenPair};
pub use token::{
    generate_secure_token, has_expired, OneTimeToken, RESET_TOKEN_TTL_HOURS,
    VERIFICATION_TOKEN_TTL_HOURS,
};
