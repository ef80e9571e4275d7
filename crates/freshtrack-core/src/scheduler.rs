use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::pipeline::{ExpiryPipeline, RunOutcome};

/// Fires once per calendar day at a fixed local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Next trigger strictly after `now`
    pub fn next_run_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            (now.date() + Duration::days(1)).and_time(self.at)
        }
    }
}

/// One scheduled expiry check: whole store, operator recipient
#[derive(Clone)]
pub struct DailyJob {
    pipeline: Arc<ExpiryPipeline>,
    recipient: String,
}

impl DailyJob {
    pub fn new(pipeline: Arc<ExpiryPipeline>, recipient: impl Into<String>) -> Self {
        Self {
            pipeline,
            recipient: recipient.into(),
        }
    }

    /// Run the pipeline, logging instead of propagating failures
    ///
    /// A failed cycle changes no flags, so the next tick re-evaluates the
    /// same candidates.
    pub async fn run_once(&self, today: NaiveDate) -> Option<RunOutcome> {
        info!("Running scheduled expiry check for {}", today);
        match self.pipeline.run_scheduled(today, &self.recipient).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!("Scheduled expiry check failed: {}", e);
                None
            }
        }
    }
}

/// Owns the background task that runs [`DailyJob`] on a [`DailySchedule`]
pub struct Scheduler {
    job: DailyJob,
    schedule: DailySchedule,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(job: DailyJob, schedule: DailySchedule) -> Self {
        Self {
            job,
            schedule,
            shutdown: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Spawn the daily loop. Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            warn!("Scheduler already running");
            return;
        }

        let (tx, rx) = watch::channel(false);
        let job = self.job.clone();
        let schedule = self.schedule;
        self.handle = Some(tokio::spawn(run_loop(job, schedule, rx)));
        self.shutdown = Some(tx);
        info!("Daily expiry check scheduled at {}", schedule.at().format("%H:%M"));
    }

    /// Signal the loop to exit and wait for it
    ///
    /// A run already in progress finishes first.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Scheduler task ended abnormally: {}", e);
            }
        }
        debug!("Scheduler stopped");
    }
}

/// Dropping without [`Scheduler::stop`] aborts the task, cutting short any run in progress
impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Slot to wait for next; `last_run` is the slot that already fired
///
/// Timers can wake a hair early, so a slot at or before `last_run` is never
/// returned again.
fn next_slot(
    schedule: &DailySchedule,
    now: NaiveDateTime,
    last_run: Option<NaiveDateTime>,
) -> NaiveDateTime {
    let from = last_run.map_or(now, |last| last.max(now));
    schedule.next_run_after(from)
}

/// Wall-clock wait until the local slot `next`
///
/// Resolved through the zone so DST shifts are honoured. An ambiguous
/// time takes its first occurrence; a time skipped by the clock moving
/// forward fires an hour later.
fn delay_until<Tz: TimeZone>(tz: &Tz, next: NaiveDateTime, now: DateTime<Tz>) -> StdDuration {
    let target = tz
        .from_local_datetime(&next)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(next + Duration::hours(1))).earliest());

    match target {
        Some(target) => target
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(StdDuration::ZERO),
        None => StdDuration::ZERO,
    }
}

async fn run_loop(job: DailyJob, schedule: DailySchedule, mut shutdown: watch::Receiver<bool>) {
    let mut last_run: Option<NaiveDateTime> = None;

    loop {
        let now = Local::now();
        let next = next_slot(&schedule, now.naive_local(), last_run);
        let delay = delay_until(&Local, next, now);
        debug!("Next expiry check at {}", next);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                info!("Scheduler shutting down");
                return;
            }
        }

        job.run_once(next.date()).await;
        last_run = Some(next);
    }
}
