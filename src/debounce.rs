//! Cancellable, restartable delayed action.
//!
//! One worker thread owns the deadline. Arming while a deadline is pending
//! replaces it instead of stacking timers; cancelling drops it. The fire
//! callback receives the generation it was armed with so callers can
//! detect a fire that lost the race to a newer arm.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use log::{trace, warn};

enum TimerCommand {
    Arm { window: Duration, generation: u64 },
    Cancel,
    Shutdown,
}

/// Handle to a debounce worker thread.
pub struct DebounceTimer {
    commands: Sender<TimerCommand>,
}

impl DebounceTimer {
    /// Spawns the worker. `on_fire` runs on the worker thread after a
    /// window elapses without a newer arm or a cancel.
    pub fn spawn<F>(name: &str, on_fire: F) -> Self
    where
        F: Fn(u64) + Send + 'static,
    {
        let (commands, receiver) = mpsc::channel();
        let thread_name = name.to_string();
        if let Err(e) = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_worker(receiver, on_fire))
        {
            warn!(
                "DebounceTimer: failed to spawn worker thread {}: {}",
                thread_name, e
            );
        }
        Self { commands }
    }

    /// Starts or restarts the window. A pending deadline is replaced.
    pub fn arm(&self, window: Duration, generation: u64) {
        let _ = self.commands.send(TimerCommand::Arm { window, generation });
    }

    /// Drops any pending deadline without firing.
    pub fn cancel(&self) {
        let _ = self.commands.send(TimerCommand::Cancel);
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        let _ = self.commands.send(TimerCommand::Shutdown);
    }
}

fn run_worker<F>(receiver: Receiver<TimerCommand>, on_fire: F)
where
    F: Fn(u64),
{
    let mut armed: Option<(Instant, u64)> = None;
    loop {
        match armed {
            None => match receiver.recv() {
                Ok(TimerCommand::Arm { window, generation }) => {
                    armed = Some((Instant::now() + window, generation));
                }
                Ok(TimerCommand::Cancel) => {}
                Ok(TimerCommand::Shutdown) | Err(_) => return,
            },
            Some((deadline, generation)) => {
                let now = Instant::now();
                if now >= deadline {
                    armed = None;
                    trace!("DebounceTimer: window elapsed, generation={}", generation);
                    on_fire(generation);
                    continue;
                }
                match receiver.recv_timeout(deadline - now) {
                    Ok(TimerCommand::Arm { window, generation }) => {
                        armed = Some((Instant::now() + window, generation));
                    }
                    Ok(TimerCommand::Cancel) => armed = None,
                    Ok(TimerCommand::Shutdown) => return,
                    Err(RecvTimeoutError::Timeout) => {
                        armed = None;
                        trace!("DebounceTimer: window elapsed, generation={}", generation);
                        on_fire(generation);
                    }
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        }
    }
}
