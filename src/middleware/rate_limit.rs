use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;

/// Checks a keyed rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
///
/// Redis errors fail open.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(0);

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        tracing::warn!("rate limit exceeded for {key}");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Çok fazla deneme. Lütfen birkaç dakika sonra tekrar deneyin." })),
        ));
    }

    Ok(())
}

/// Real client IP as forwarded by the reverse proxy.
pub fn client_ip(h: &HeaderMap) -> String {
    h.get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            h.get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim())
        })
        .unwrap_or("unknown")
        .to_string()
}
