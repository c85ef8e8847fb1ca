use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Idle,
    Armed,
    Expired,
    Disarmed,
}

#[derive(Debug)]
struct Slot {
    state: WatchdogState,
    /// bumped on every arm so a timer thread only acts on its own arming
    generation: u64,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    changed: Condvar,
}

/// Single-shot, cancellable delayed action.
///
/// Each arming runs on its own short-lived thread that sleeps on a condition
/// variable until either the deadline passes or the timer is disarmed. The
/// decision to fire is taken under the slot lock, so once `disarm` returns
/// `true` the callback is guaranteed not to run, and once the state is
/// `Expired` a late `disarm` is a no-op.
#[derive(Debug)]
pub struct WatchdogTimer {
    name: String,
    shared: Arc<Shared>,
}

impl WatchdogTimer {
    pub fn new(name: impl Into<String>) -> Self {
        WatchdogTimer {
            name: name.into(),
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    state: WatchdogState::Idle,
                    generation: 0,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.shared.slot.lock().state
    }

    /// Schedules `on_expire` to run once `duration` from now.
    ///
    /// Arming a timer that is still armed is an error; disarm it first.
    pub fn arm<F>(&self, duration: Duration, on_expire: F) -> AppResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = {
            let mut slot = self.shared.slot.lock();
            if slot.state == WatchdogState::Armed {
                return Err(AppError::IllegalStateError(
                    format!("watchdog '{}' is already armed", self.name).into(),
                ));
            }
            slot.state = WatchdogState::Armed;
            slot.generation += 1;
            slot.generation
        };

        let shared = Arc::clone(&self.shared);
        let deadline = Instant::now() + duration;
        let spawned = thread::Builder::new()
            .name(format!("{}-watchdog", self.name))
            .spawn(move || wait_for_expiry(shared, generation, deadline, on_expire));

        if let Err(err) = spawned {
            let mut slot = self.shared.slot.lock();
            if slot.generation == generation {
                slot.state = WatchdogState::Idle;
            }
            return Err(err.into());
        }
        trace!("watchdog '{}' armed for {:?}", self.name, duration);
        Ok(())
    }

    /// Cancels a pending expiry. Returns `false` when nothing was armed or the
    /// timer already fired.
    pub fn disarm(&self) -> bool {
        let mut slot = self.shared.slot.lock();
        if slot.state != WatchdogState::Armed {
            return false;
        }
        slot.state = WatchdogState::Disarmed;
        self.shared.changed.notify_all();
        true
    }
}

impl Drop for WatchdogTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

fn wait_for_expiry<F: FnOnce()>(shared: Arc<Shared>, generation: u64, deadline: Instant, on_expire: F) {
    let mut slot = shared.slot.lock();
    loop {
        if slot.generation != generation || slot.state != WatchdogState::Armed {
            return;
        }
        if shared.changed.wait_until(&mut slot, deadline).timed_out() {
            if slot.generation == generation && slot.state == WatchdogState::Armed {
                slot.state = WatchdogState::Expired;
                break;
            }
            return;
        }
    }
    drop(slot);
    on_expire();
}
