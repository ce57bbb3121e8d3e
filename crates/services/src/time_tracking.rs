//! Background task that measures time spent in a tutorial.
//!
//! The task owns a [`TimeTracker`], ticks it once per second, publishes the
//! displayed total on a `watch` channel and sends flushes without waiting for
//! them. Stopping the handle issues the final flush and waits for every
//! outstanding flush to settle.

use std::sync::Arc;
use std::time::Duration;

use diy_core::model::TutorialId;
use diy_core::timer::{Flush, TimeTracker, FLUSH_INTERVAL};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::LearningApi;
use crate::error::ApiError;

const TICK: Duration = Duration::from_secs(1);

/// Final accounting once the task has stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeReport {
    /// Seconds the backend holds for this tutorial, including earlier
    /// sessions.
    pub confirmed_secs: u64,
    /// Seconds whose flush failed.
    pub dropped_secs: u64,
    /// Size of every flush sent, in order.
    pub flushes: Vec<u64>,
    /// Total shown when the task stopped.
    pub display_secs: u64,
}

pub struct TimeTrackingTask;

impl TimeTrackingTask {
    /// Start measuring on top of `confirmed_secs` already stored remotely.
    #[must_use]
    pub fn spawn(
        api: Arc<dyn LearningApi>,
        tutorial_id: TutorialId,
        confirmed_secs: u64,
    ) -> TimerHandle {
        Self::spawn_with_interval(api, tutorial_id, confirmed_secs, FLUSH_INTERVAL)
    }

    #[must_use]
    pub fn spawn_with_interval(
        api: Arc<dyn LearningApi>,
        tutorial_id: TutorialId,
        confirmed_secs: u64,
        flush_interval: Duration,
    ) -> TimerHandle {
        let tracker =
            TimeTracker::new(confirmed_secs, now()).with_flush_interval(flush_interval);
        let (display_tx, display_rx) = watch::channel(confirmed_secs);
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run(api, tutorial_id, tracker, display_tx, stop_rx));
        TimerHandle {
            display: display_rx,
            stop: Some(stop_tx),
            join,
        }
    }
}

/// Owner side of a running timer. Dropping it also stops the task, but only
/// [`TimerHandle::stop`] waits for the final flush.
pub struct TimerHandle {
    display: watch::Receiver<u64>,
    stop: Option<oneshot::Sender<()>>,
    join: JoinHandle<TimeReport>,
}

impl TimerHandle {
    /// Seconds currently shown to the learner.
    #[must_use]
    pub fn display(&self) -> u64 {
        *self.display.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.display.clone()
    }

    /// Stop ticking, flush the remainder and wait for every flush to settle.
    pub async fn stop(mut self) -> TimeReport {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let last_seen = self.display();
        match (&mut self.join).await {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "time tracking task ended abnormally");
                TimeReport {
                    display_secs: last_seen,
                    ..TimeReport::default()
                }
            }
        }
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

type FlushResult = (u64, Result<(), ApiError>);

async fn run(
    api: Arc<dyn LearningApi>,
    tutorial_id: TutorialId,
    mut tracker: TimeTracker,
    display: watch::Sender<u64>,
    mut stop: oneshot::Receiver<()>,
) -> TimeReport {
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut pending: JoinSet<FlushResult> = JoinSet::new();
    let mut flushes = Vec::new();

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let tick = tracker.tick(now());
                display.send_replace(tick.display_secs);
                if let Some(flush) = tick.flush {
                    flushes.push(flush.secs);
                    send_flush(&mut pending, &api, &tutorial_id, flush);
                }
            }
            Some(done) = pending.join_next(), if !pending.is_empty() => {
                settle(&mut tracker, &tutorial_id, done);
            }
        }
    }

    if let Some(flush) = tracker.finish(now()) {
        flushes.push(flush.secs);
        send_flush(&mut pending, &api, &tutorial_id, flush);
    }
    while let Some(done) = pending.join_next().await {
        settle(&mut tracker, &tutorial_id, done);
    }

    let display_secs = tracker.display_secs(now());
    display.send_replace(display_secs);
    debug!(
        tutorial = %tutorial_id,
        confirmed = tracker.confirmed_secs(),
        dropped = tracker.dropped_secs(),
        "time tracking stopped"
    );
    TimeReport {
        confirmed_secs: tracker.confirmed_secs(),
        dropped_secs: tracker.dropped_secs(),
        flushes,
        display_secs,
    }
}

fn send_flush(
    pending: &mut JoinSet<FlushResult>,
    api: &Arc<dyn LearningApi>,
    tutorial_id: &TutorialId,
    flush: Flush,
) {
    let api = Arc::clone(api);
    let tutorial_id = tutorial_id.clone();
    pending.spawn(async move {
        let result = api.update_time_spent(&tutorial_id, flush.secs).await;
        (flush.id, result)
    });
}

fn settle(
    tracker: &mut TimeTracker,
    tutorial_id: &TutorialId,
    done: Result<FlushResult, JoinError>,
) {
    match done {
        Ok((id, Ok(()))) => tracker.acknowledge(id),
        Ok((id, Err(err))) => {
            warn!(tutorial = %tutorial_id, error = %err, "time flush failed; not retried");
            tracker.fail(id);
        }
        Err(err) => warn!(tutorial = %tutorial_id, error = %err, "time flush task panicked"),
    }
}
