use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::services::otp::OtpManager;

/// Spawn a background task that deletes expired OTP challenges every
/// `interval_secs` seconds. Failures are logged and the loop carries on.
pub fn start(otp: Arc<OtpManager>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            ticker.tick().await;
            match otp.sweep().await {
                Ok(0) => {}
                Ok(n) => info!("OTP sweep: removed {} expired challenge(s)", n),
                Err(e) => warn!("OTP sweep failed: {}", e),
            }
        }
    });
}
