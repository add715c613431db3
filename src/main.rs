use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use account_service::accounts::AccountService;
use account_service::auth::{JwtService, PasswordHasher, RefreshTokenService, SessionService};
use account_service::configuration::get_configuration;
use account_service::email_client::EmailClient;
use account_service::oauth::GoogleOAuthClient;
use account_service::startup::run;
use account_service::store::{PgRefreshTokenStore, PgUserStore};
use account_service::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

/// Periodically delete refresh tokens past their expiry
fn spawn_token_sweep(refresh_tokens: RefreshTokenService, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            if let Err(e) = refresh_tokens.purge_expired().await {
                tracing::error!(error = %e.chain(), "Refresh token sweep failed");
            }
        }
    });
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;
    tracing::info!("Database connection pool created successfully");

    let email_client = EmailClient::new(&configuration.email).map_err(|e| {
        tracing::error!("Failed to build email client: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, "Email client error")
    })?;

    let refresh_tokens = RefreshTokenService::new(Arc::new(PgRefreshTokenStore::new(pool.clone())));
    let sessions = SessionService::new(JwtService::new(&configuration.jwt), refresh_tokens.clone());
    let accounts = AccountService::new(
        Arc::new(PgUserStore::new(pool)),
        PasswordHasher::new(configuration.application.bcrypt_cost),
        Arc::new(email_client),
        Arc::new(GoogleOAuthClient::new(configuration.oauth.clone())),
    );

    spawn_token_sweep(
        refresh_tokens,
        Duration::from_secs(configuration.application.token_sweep_interval_secs.max(1)),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, accounts, sessions)?.await
}
