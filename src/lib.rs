pub mod accounts;
pub mod auth;
pub mod configuration;
pub mod domain;
pub mod email_client;
pub mod error;
pub mod logger;
pub mod middleware;
pub mod oauth;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validators;
