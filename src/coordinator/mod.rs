//! Run coordination
//!
//! Guards against concurrent runs of the same site and tracks each site's
//! last known status:
//!
//! ```text
//! Idle --try_start--> Running --finish--> Completed | Failed
//! ```
//!
//! A finished site stays locked for a short cooldown; the lock is released
//! lazily by the next `try_start` once the cooldown has elapsed.

mod job;

pub use job::{JobContext, SiteRunSummary};

use crate::Platform;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Last known status of a site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed(String),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Running => f.write_str("running"),
            RunState::Completed => f.write_str("completed"),
            RunState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// How a site run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
}

#[derive(Debug)]
struct SiteSlot {
    state: RunState,
    running: bool,
    finished_at: Option<Instant>,
}

impl Default for SiteSlot {
    fn default() -> Self {
        Self {
            state: RunState::Idle,
            running: false,
            finished_at: None,
        }
    }
}

impl SiteSlot {
    fn cooling_down(&self, cooldown: Duration) -> bool {
        self.finished_at.is_some_and(|t| t.elapsed() < cooldown)
    }
}

/// Per-site "already running" guard and status registry
#[derive(Debug)]
pub struct RunCoordinator {
    slots: Mutex<HashMap<Platform, SiteSlot>>,
    cooldown: Duration,
}

impl RunCoordinator {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            cooldown,
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<Platform, SiteSlot>> {
        // A panic while holding the lock cannot leave a slot half-written
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Marks `platform` running unless a run is active or cooling down
    ///
    /// # Returns
    ///
    /// * `true` - The caller owns the run and must call `finish`
    /// * `false` - The site is busy; nothing changed
    pub fn try_start(&self, platform: Platform) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(platform).or_default();

        if slot.running || slot.cooling_down(self.cooldown) {
            return false;
        }

        slot.running = true;
        slot.finished_at = None;
        slot.state = RunState::Running;
        true
    }

    /// Like `try_start`, but hands back a guard that fails the run if it is
    /// dropped without being finished, e.g. when the job panics
    pub fn start(&self, platform: Platform) -> Option<RunGuard<'_>> {
        self.try_start(platform).then(|| RunGuard {
            coordinator: self,
            platform,
            finished: false,
        })
    }

    /// Records the end of a run started with `try_start`
    pub fn finish(&self, platform: Platform, outcome: RunOutcome) {
        let mut slots = self.slots();
        let slot = slots.entry(platform).or_default();

        slot.running = false;
        slot.finished_at = Some(Instant::now());
        slot.state = match outcome {
            RunOutcome::Completed => RunState::Completed,
            RunOutcome::Failed(reason) => RunState::Failed(reason),
        };
    }

    /// Whether `platform` is running or still in its cooldown
    pub fn is_active(&self, platform: Platform) -> bool {
        self.slots()
            .get(&platform)
            .is_some_and(|slot| slot.running || slot.cooling_down(self.cooldown))
    }

    pub fn status(&self, platform: Platform) -> RunState {
        self.slots()
            .get(&platform)
            .map(|slot| slot.state.clone())
            .unwrap_or(RunState::Idle)
    }

    /// Status of every known platform, in platform order
    pub fn statuses(&self) -> Vec<(Platform, RunState)> {
        Platform::ALL
            .into_iter()
            .map(|p| (p, self.status(p)))
            .collect()
    }
}

/// An active run of one site, see [`RunCoordinator::start`]
#[must_use = "dropping the guard fails the run"]
#[derive(Debug)]
pub struct RunGuard<'a> {
    coordinator: &'a RunCoordinator,
    platform: Platform,
    finished: bool,
}

impl RunGuard<'_> {
    /// Records how the run ended and releases the guard
    pub fn finish(mut self, outcome: RunOutcome) {
        self.finished = true;
        self.coordinator.finish(self.platform, outcome);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::error!("{} run ended without finishing, marking it failed", self.platform);
            self.coordinator.finish(
                self.platform,
                RunOutcome::Failed("run aborted before finishing".to_string()),
            );
        }
    }
}

impl Default for RunCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_idle() {
        let coordinator = RunCoordinator::default();
        assert_eq!(coordinator.status(Platform::SiteA), RunState::Idle);
        assert!(!coordinator.is_active(Platform::SiteA));
    }

    #[test]
    fn test_second_start_rejected() {
        let coordinator = RunCoordinator::new(Duration::ZERO);
        assert!(coordinator.try_start(Platform::SiteB));
        assert!(!coordinator.try_start(Platform::SiteB));
        assert_eq!(coordinator.status(Platform::SiteB), RunState::Running);

        // Other sites are independent
        assert!(coordinator.try_start(Platform::SiteC));
    }

    #[test]
    fn test_restart_after_finish_without_cooldown() {
        let coordinator = RunCoordinator::new(Duration::ZERO);
        assert!(coordinator.try_start(Platform::SiteA));
        coordinator.finish(Platform::SiteA, RunOutcome::Completed);
        assert_eq!(coordinator.status(Platform::SiteA), RunState::Completed);
        assert!(coordinator.try_start(Platform::SiteA));
    }

    #[test]
    fn test_cooldown_blocks_restart() {
        let coordinator = RunCoordinator::new(Duration::from_secs(60));
        assert!(coordinator.try_start(Platform::SiteA));
        coordinator.finish(Platform::SiteA, RunOutcome::Failed("boom".to_string()));

        assert!(coordinator.is_active(Platform::SiteA));
        assert!(!coordinator.try_start(Platform::SiteA));
        assert_eq!(
            coordinator.status(Platform::SiteA),
            RunState::Failed("boom".to_string())
        );
    }

    #[test]
    fn test_guard_finish_records_outcome() {
        let coordinator = RunCoordinator::new(Duration::ZERO);
        let guard = coordinator.start(Platform::SiteB).unwrap();
        assert!(coordinator.start(Platform::SiteB).is_none());

        guard.finish(RunOutcome::Completed);
        assert_eq!(coordinator.status(Platform::SiteB), RunState::Completed);
    }

    #[test]
    fn test_dropped_guard_fails_run() {
        let coordinator = RunCoordinator::new(Duration::ZERO);
        drop(coordinator.start(Platform::SiteA).unwrap());

        assert!(matches!(coordinator.status(Platform::SiteA), RunState::Failed(_)));
        assert!(coordinator.try_start(Platform::SiteA));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stay_running() {
        let coordinator = std::sync::Arc::new(RunCoordinator::new(Duration::ZERO));

        let job = {
            let coordinator = std::sync::Arc::clone(&coordinator);
            tokio::spawn(async move {
                let _guard = coordinator.start(Platform::SiteC).unwrap();
                panic!("job blew up");
            })
        };

        assert!(job.await.unwrap_err().is_panic());
        assert!(matches!(coordinator.status(Platform::SiteC), RunState::Failed(_)));
        assert!(!coordinator.is_active(Platform::SiteC));
    }

    #[test]
    fn test_statuses_cover_all_platforms() {
        let coordinator = RunCoordinator::default();
        coordinator.try_start(Platform::SiteC);
        let statuses = coordinator.statuses();
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[2], (Platform::SiteC, RunState::Running));
        assert_eq!(RunState::Failed("x".into()).to_string(), "failed (x)");
    }
}
