use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::services::session_registry::SessionRegistry;

/// Periodically destroy sessions idle for longer than `idle_timeout`.
/// A zero timeout disables the job.
pub async fn start_session_sweeper_job(
    sessions: SessionRegistry,
    idle_timeout: Duration,
    sweep_interval: Duration,
) {
    if idle_timeout.is_zero() {
        tracing::info!("Session idle expiry disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = interval(sweep_interval.max(Duration::from_secs(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            idle_timeout_secs = idle_timeout.as_secs(),
            "Starting session sweeper"
        );

        loop {
            interval.tick().await;

            let expired = sessions.expire_idle(idle_timeout).await;
            if !expired.is_empty() {
                tracing::info!(
                    expired = expired.len(),
                    remaining = sessions.len(),
                    "Expired idle MCP sessions"
                );
            }
        }
    });
}
