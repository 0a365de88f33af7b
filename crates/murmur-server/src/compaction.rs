use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use murmur_api::state::AppStateInner;

/// Background task that removes messages both participants have deleted, and
/// revocations for sessions that have expired anyway.
pub async fn run_compaction_loop(state: Arc<AppStateInner>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // First tick fires immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let db_state = state.clone();
        let result = tokio::task::spawn_blocking(move || {
            let messages = db_state.db.purge_fully_deleted()?;
            let revocations = db_state.db.purge_expired_revocations(Utc::now())?;
            anyhow::Ok((messages, revocations))
        })
        .await;

        match result {
            Ok(Ok((messages, revocations))) => {
                if messages + revocations > 0 {
                    info!(
                        "Compaction: removed {} fully deleted messages, {} stale revocations",
                        messages, revocations
                    );
                }
            }
            Ok(Err(e)) => warn!("Compaction error: {:#}", e),
            Err(e) => warn!("Compaction task failed: {}", e),
        }
    }
}
