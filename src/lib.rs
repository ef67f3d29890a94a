// Library exports for binary tools and tests
pub mod app;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use services::{otp::OtpManager, sms::SmsSender};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub otp: Arc<OtpManager>,
    pub sms: Arc<dyn SmsSender>,
}
