//! Async host loop around a [`WorkoutSession`].

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::events::{CoachingSink, deliver};
use crate::models::{RawFix, SessionSnapshot};
use crate::session::WorkoutSession;
use crate::store::KeyValueStore;
use crate::summary::WorkoutSummary;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    StartOrResume,
    Pause,
    StopAndReset,
    Fix(RawFix),
    Steps(u32),
}

/// Drives `session` until it is stopped or the command channel closes.
///
/// Ticks every `period` while the workout is active and never while paused.
/// Every coaching phrase goes to `sink` and every state change is published
/// on `snapshots`.
pub async fn run_session<K, S>(
    mut session: WorkoutSession<K>,
    mut commands: mpsc::Receiver<SessionCommand>,
    sink: &mut S,
    snapshots: watch::Sender<SessionSnapshot>,
    period: Duration,
) -> Option<WorkoutSummary>
where
    K: KeyValueStore,
    S: CoachingSink,
{
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    snapshots.send_replace(session.snapshot());

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else {
                    info!("Command channel closed, leaving session as is");
                    return None;
                };
                match command {
                    SessionCommand::StartOrResume => {
                        let was_active = session.is_active();
                        session.start_or_resume();
                        if !was_active {
                            ticker.reset();
                        }
                    }
                    SessionCommand::Pause => session.pause(),
                    SessionCommand::StopAndReset => {
                        let summary = session.stop_and_reset();
                        snapshots.send_replace(session.snapshot());
                        return summary;
                    }
                    SessionCommand::Fix(fix) => {
                        session.push_fix(fix);
                        continue;
                    }
                    SessionCommand::Steps(steps) => {
                        session.push_steps(steps);
                        continue;
                    }
                }
                snapshots.send_replace(session.snapshot());
            }

            _ = ticker.tick(), if session.is_active() => {
                let report = session.tick();
                if !report.events.is_empty() {
                    debug!(count = report.events.len(), "Delivering coaching events");
                    deliver(&report.events, sink);
                }
                snapshots.send_replace(report.snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PacerConfig;
    use crate::events::RecordingSink;
    use crate::models::{GoalParams, WorkoutMode};
    use crate::scenario::IntervalPlan;
    use crate::store::{MemoryStore, PacerStore};

    fn interval_store() -> MemoryStore {
        let mut store = PacerStore::new(MemoryStore::new());
        let mut goal = GoalParams::with_time(0.0, 1);
        goal.mode = WorkoutMode::Interval;
        store.save_goal(&goal).unwrap();
        let plan = IntervalPlan::new().work(30, 300).rest(30, None).build().unwrap();
        store.save_interval_scenario(&plan).unwrap();
        store.into_inner()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_only_while_running() {
        let session = WorkoutSession::new(PacerConfig::default(), interval_store());
        let (tx, rx) = mpsc::channel(16);
        let (snap_tx, snap_rx) = watch::channel(session.snapshot());
        let mut sink = RecordingSink::default();

        let feeder = async move {
            tx.send(SessionCommand::StartOrResume).await.unwrap();
            for _ in 0..5 {
                tx.send(SessionCommand::Steps(3)).await.unwrap();
                time::sleep(Duration::from_secs(1)).await;
            }
            time::sleep(Duration::from_millis(500)).await;
            tx.send(SessionCommand::Pause).await.unwrap();
            time::sleep(Duration::from_secs(10)).await;
            tx.send(SessionCommand::StopAndReset).await.unwrap();
        };

        let (summary, ()) = tokio::join!(
            run_session(session, rx, &mut sink, snap_tx, Duration::from_secs(1)),
            feeder
        );

        let summary = summary.unwrap();
        assert_eq!(summary.elapsed_sec, 5);
        assert_eq!(summary.mode, WorkoutMode::Interval);
        assert!(sink.phrases[0].starts_with("Work"));
        assert!(!snap_rx.borrow().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_returns_none() {
        let session = WorkoutSession::new(PacerConfig::default(), MemoryStore::new());
        let (tx, rx) = mpsc::channel(4);
        let (snap_tx, _snap_rx) = watch::channel(session.snapshot());
        let mut sink = RecordingSink::default();

        tx.send(SessionCommand::StartOrResume).await.unwrap();
        drop(tx);
        let summary = run_session(session, rx, &mut sink, snap_tx, Duration::from_secs(1)).await;
        assert!(summary.is_none());
        assert!(sink.phrases.is_empty());
    }
}
