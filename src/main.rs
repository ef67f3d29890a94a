use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fizyo_clinic_api::{
    app, db,
    config::Config,
    services::{
        otp::OtpManager,
        otp_store::PgOtpStore,
        otp_sweeper,
        sms::{ClinicSmsSender, SmsSender},
    },
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let sms: Arc<dyn SmsSender> = Arc::new(ClinicSmsSender::new(pool.clone()));
    if config.otp_log_fallback {
        warn!("OTP log fallback enabled: codes are logged when SMS delivery fails");
    }
    let otp = Arc::new(OtpManager::new(
        Arc::new(PgOtpStore::new(pool.clone())),
        sms.clone(),
        config.otp_log_fallback,
    ));

    otp_sweeper::start(otp.clone(), config.otp_sweep_interval_secs);
    info!("OTP sweeper started (every {}s)", config.otp_sweep_interval_secs);

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        otp,
        sms,
    };

    let app = app::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Clinic API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
