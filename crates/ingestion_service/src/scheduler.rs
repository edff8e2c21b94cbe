//! Periodic ingestion.
//!
//! Runs the job on a fixed interval using `tokio::time::interval_at` until the
//! cancellation token fires. A failed run is logged and the next tick runs again.

use crate::IngestionJob;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Default scheduling period: 120 minutes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120 * 60);

/// Run the ingestion loop.
///
/// The first run happens one `period` after start, or immediately when
/// `run_immediately` is set.
pub async fn run(
    job: Arc<IngestionJob>,
    period: Duration,
    run_immediately: bool,
    cancel: CancellationToken,
) {
    let start = if run_immediately {
        Instant::now()
    } else {
        Instant::now() + period
    };
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_secs = period.as_secs(),
        run_immediately,
        "Ingestion schedule started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Ingestion schedule stopping");
                break;
            }
            _ = interval.tick() => {
                match job.run().await {
                    Ok(report) => tracing::info!(
                        pages = report.pages,
                        written = report.written,
                        "Scheduled ingestion completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Scheduled ingestion failed"),
                }
            }
        }
    }
}
