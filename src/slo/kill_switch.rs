//! Global emergency stop backed by the durable feature flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::constants::flags::{EMERGENCY_STOP_KEY, GLOBAL_SCOPE};
use crate::store::{SharedStore, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Armed,
    EmergencyStopped,
}

/// Local mirror of the persisted flag. Loops read the mirror on every tick; the store is
/// re-read by [`KillSwitch::refresh`].
///
/// A stop engaged while the store was unreachable stays pending until the flag write
/// succeeds. A pending stop is never cleared by a refresh, only by [`KillSwitch::release`].
#[derive(Debug, Clone)]
pub struct KillSwitch {
    store: SharedStore,
    engaged: Arc<AtomicBool>,
    unpersisted: Arc<AtomicBool>,
}

impl KillSwitch {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            engaged: Arc::new(AtomicBool::new(false)),
            unpersisted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    /// Engaged locally but the flag has not reached the store yet
    pub fn is_pending_persist(&self) -> bool {
        self.unpersisted.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SwitchState {
        if self.is_engaged() {
            SwitchState::EmergencyStopped
        } else {
            SwitchState::Armed
        }
    }

    /// Re-read the persisted flag, retrying a pending stop write first. A missing flag
    /// means armed unless a local stop is still pending.
    pub async fn refresh(&self) -> StoreResult<bool> {
        if self.is_pending_persist() {
            match self
                .store
                .set_flag(EMERGENCY_STOP_KEY, GLOBAL_SCOPE, true)
                .await
            {
                Ok(()) => {
                    self.unpersisted.store(false, Ordering::SeqCst);
                    info!("Pending emergency stop persisted");
                }
                Err(e) => warn!(error = %e, "Pending emergency stop still not persisted"),
            }
        }

        let persisted = self
            .store
            .get_flag(EMERGENCY_STOP_KEY, GLOBAL_SCOPE)
            .await?
            .unwrap_or(false);
        let engaged = persisted || self.is_pending_persist();
        let previous = self.engaged.swap(engaged, Ordering::SeqCst);
        if previous != engaged {
            info!(engaged = engaged, "Emergency stop flag changed in store");
        }
        Ok(engaged)
    }

    /// Engage locally first so loops halt even when the store write fails
    pub async fn engage(&self) -> StoreResult<()> {
        self.engaged.store(true, Ordering::SeqCst);
        self.unpersisted.store(true, Ordering::SeqCst);
        if let Err(e) = self
            .store
            .set_flag(EMERGENCY_STOP_KEY, GLOBAL_SCOPE, true)
            .await
        {
            warn!(error = %e, "Emergency stop engaged locally but not persisted");
            return Err(e);
        }
        self.unpersisted.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Clear the persisted flag; the local mirror only follows once the store accepts it
    pub async fn release(&self) -> StoreResult<()> {
        self.store
            .set_flag(EMERGENCY_STOP_KEY, GLOBAL_SCOPE, false)
            .await?;
        self.unpersisted.store(false, Ordering::SeqCst);
        self.engaged.store(false, Ordering::SeqCst);
        Ok(())
    }
}
