use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

/// Tick emitted by a question timer, tagged with the generation it was
/// started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerTick {
    pub generation: u64,
}

/// Aborts the wrapped task when dropped.
#[derive(Debug)]
pub(crate) struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Periodic countdown driver for the active question.
///
/// Exactly one is live per session; replacing or dropping it cancels the
/// previous task. Ticks that were already queued still arrive, which is why
/// each one carries its generation.
#[derive(Debug)]
pub(crate) struct QuestionTimer {
    generation: u64,
    _task: TaskGuard,
}

impl QuestionTimer {
    /// Spawn a timer whose first tick fires one `interval` from now.
    pub(crate) fn start<T>(generation: u64, interval: Duration, tx: mpsc::Sender<T>) -> Self
    where
        T: From<TimerTick> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(TimerTick { generation }.into()).await.is_err() {
                    break;
                }
            }
        });

        Self {
            generation,
            _task: TaskGuard::new(handle),
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}
