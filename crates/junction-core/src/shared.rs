//! Thread-safe handle around a [`JunctionScheduler`].
//!
//! The tick loop and the observer API run on different tasks. Both mutate
//! the junction (ticks and overrides), so all mutation goes through a
//! single mutex. Each mutation publishes its snapshot into a
//! [`watch`] channel; readers take the latest `Arc<JunctionSnapshot>` from
//! there and never contend for the scheduler lock.
//!
//! The mutex is a `std` mutex: it is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use junction_types::{ApproachId, JunctionEvent, JunctionSnapshot, OverrideCommand};
use tokio::sync::watch;

use crate::scheduler::{JunctionScheduler, SchedulerError};

/// Shared junction: one writer at a time, lock-free snapshot reads.
#[derive(Debug)]
pub struct SharedJunction {
    scheduler: Mutex<JunctionScheduler>,
    published: watch::Sender<Arc<JunctionSnapshot>>,
    name: String,
}

impl SharedJunction {
    /// Wrap a scheduler, publishing its current snapshot.
    pub fn new(scheduler: JunctionScheduler) -> Self {
        let (published, _) = watch::channel(scheduler.snapshot());
        let name = scheduler.name().to_owned();
        Self {
            scheduler: Mutex::new(scheduler),
            published,
            name,
        }
    }

    /// Run one tick. See [`JunctionScheduler::advance`].
    pub fn advance(&self) -> Result<Arc<JunctionSnapshot>, SchedulerError> {
        let mut scheduler = self.lock();
        let snapshot = scheduler.advance()?;
        // Publish under the lock so readers never see sequences go backwards.
        self.published.send_replace(Arc::clone(&snapshot));
        drop(scheduler);
        Ok(snapshot)
    }

    /// Apply an override. See [`JunctionScheduler::override_approach`].
    pub fn apply_override(
        &self,
        id: &ApproachId,
        command: OverrideCommand,
    ) -> Result<Arc<JunctionSnapshot>, SchedulerError> {
        let mut scheduler = self.lock();
        let snapshot = scheduler.override_approach(id, command)?;
        self.published.send_replace(Arc::clone(&snapshot));
        drop(scheduler);
        Ok(snapshot)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<JunctionSnapshot> {
        self.published.borrow().clone()
    }

    /// Receiver that is notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<JunctionSnapshot>> {
        self.published.subscribe()
    }

    /// Most recent junction events, oldest first.
    pub fn recent_events(&self, limit: usize) -> Vec<JunctionEvent> {
        self.lock().recent_events(limit)
    }

    /// Junction display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every mutation leaves the scheduler valid, so a poisoned lock is
    /// still safe to use.
    fn lock(&self) -> MutexGuard<'_, JunctionScheduler> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use junction_types::Phase;

    use super::*;
    use crate::config::JunctionConfig;
    use crate::scheduler::init_junction;

    fn shared() -> SharedJunction {
        SharedJunction::new(init_junction(&JunctionConfig::default()).unwrap())
    }

    #[test]
    fn advance_publishes_to_readers() {
        let junction = shared();
        let mut rx = junction.subscribe();
        assert_eq!(junction.snapshot().tick, 0);

        let snapshot = junction.advance().unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().tick, 1);
        assert!(Arc::ptr_eq(&snapshot, &junction.snapshot()));
    }

    #[test]
    fn failed_override_does_not_publish() {
        let junction = shared();
        let mut rx = junction.subscribe();
        let _ = rx.borrow_and_update();

        let result = junction.apply_override(
            &ApproachId::from("south"),
            OverrideCommand::ForcePhase(Phase::Stop),
        );
        assert!(result.is_err());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn concurrent_overrides_and_ticks_never_tear() {
        let junction = Arc::new(shared());
        let mut handles = Vec::new();
        for i in 0..8 {
            let junction = Arc::clone(&junction);
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        junction.advance().unwrap();
                    } else {
                        let _ = junction.apply_override(
                            &ApproachId::from("east"),
                            OverrideCommand::AdjustTimer(-3),
                        );
                    }
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = junction.snapshot();
        assert_eq!(snapshot.tick, 200);
        assert_eq!(snapshot.approaches.len(), 4);
        assert_eq!(snapshot.sequence, 400);
    }
}
