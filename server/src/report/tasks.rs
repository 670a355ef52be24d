use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use strum::Display;
use tracing::Instrument;

use crate::error::AppResult;

use super::mailer::DailyReportMailer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunTrigger {
    Startup,
    Scheduled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Sent,
    /// Another run was still in flight.
    Skipped,
}

/// Shared handle the scheduler jobs call into. At most one run is in flight.
#[derive(Clone)]
pub struct ReportRunner {
    mailer: Arc<DailyReportMailer>,
    running: Arc<AtomicBool>,
    run_count: Arc<AtomicU64>,
}

impl ReportRunner {
    pub fn new(mailer: DailyReportMailer) -> Self {
        Self {
            mailer: Arc::new(mailer),
            running: Arc::new(AtomicBool::new(false)),
            run_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn run(&self, trigger: RunTrigger) -> AppResult<RunOutcome> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::warn!("Report run ({}) skipped, previous run still in flight", trigger);
            return Ok(RunOutcome::Skipped);
        };

        let run_id = self.run_count.fetch_add(1, Ordering::Relaxed) + 1;
        let span = tracing::info_span!("report_run", run_id, %trigger);
        let result = async {
            tracing::info!("Starting report run");
            self.mailer.send_report().await
        }
        .instrument(span)
        .await;

        result.map(|_| RunOutcome::Sent)
    }

    /// Runs once and logs the outcome; errors never escape to the scheduler.
    pub async fn run_and_log(&self, trigger: RunTrigger) {
        match self.run(trigger).await {
            Ok(RunOutcome::Sent) => tracing::info!("Report run ({}) sent", trigger),
            Ok(RunOutcome::Skipped) => {}
            Err(e) => tracing::error!(kind = e.kind(), "Report run ({}) failed: {}", trigger, e),
        }
    }
}

/// Holds the in-flight flag for one run. Dropping it, including when the
/// run future is cancelled or panics, lets the next trigger through.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                running: running.clone(),
            })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
