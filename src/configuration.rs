use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub email: EmailSettings,
    pub oauth: OAuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// bcrypt work factor used for every password hash
    pub bcrypt_cost: u32,
    /// How often expired refresh tokens are purged
    pub token_sweep_interval_secs: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "{}/{}{}",
            self.connection_string_without_db(),
            self.database_name,
            self.ssl_suffix()
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    fn ssl_suffix(&self) -> &'static str {
        if self.require_ssl {
            "?sslmode=require"
        } else {
            ""
        }
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

/// Transactional email API settings
#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    pub base_url: String,
    pub sender: String,
    /// Base URL of the web client; verification and reset links point here
    pub frontend_url: String,
    pub timeout_ms: u64,
}

impl EmailSettings {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Google OAuth client settings
#[derive(serde::Deserialize, Clone)]
pub struct OAuthSettings {
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

/// Load settings from defaults, `configuration.yaml` and `APP_*` environment variables.
///
/// Nested keys use a double underscore, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("application.bcrypt_cost", i64::from(bcrypt::DEFAULT_COST))?
        .set_default("application.token_sweep_interval_secs", 3600)?
        .set_default("database.require_ssl", false)?
        .set_default("jwt.access_token_expiry", 900)?
        .set_default("jwt.refresh_token_expiry", 604_800)?
        .set_default("jwt.issuer", "account_service")?
        .set_default("email.timeout_ms", 10_000)?
        .set_default("oauth.auth_url", "https://accounts.google.com/o/oauth2/v2/auth")?
        .set_default("oauth.token_url", "https://oauth2.googleapis.com/token")?
        .set_default(
            "oauth.userinfo_url",
            "https://www.googleapis.com/oauth2/v2/userinfo",
        )?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
