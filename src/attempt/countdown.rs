use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::attempt::controller::AttemptController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Running,
    Expired,
    Stopped,
}

/// Remaining time is counted in whole seconds, one per tick.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Once-per-second ticker for a loaded attempt. Aborted when dropped.
pub(crate) struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    pub(crate) fn start(controller: Weak<AttemptController>) -> Self {
        Self { handle: tokio::spawn(run(controller)) }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(controller: Weak<AttemptController>) {
    let already_expired = match controller.upgrade() {
        Some(controller) => controller.remaining_seconds() == 0,
        None => return,
    };
    if already_expired {
        expire(controller);
        return;
    }

    let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(strong) = controller.upgrade() else {
            break;
        };
        match strong.tick() {
            TickOutcome::Running => {}
            TickOutcome::Expired => {
                drop(strong);
                expire(controller);
                break;
            }
            TickOutcome::Stopped => break,
        }
    }
}

// Submission finishes by dropping this countdown, which aborts the task; the
// finalize call therefore runs on its own task.
fn expire(controller: Weak<AttemptController>) {
    let Some(controller) = controller.upgrade() else {
        return;
    };
    tokio::spawn(async move {
        controller.auto_submit().await;
    });
}
