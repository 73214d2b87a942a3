//! The immediate-input writer thread.
//!
//! Runs at the game's visual rate (64 Hz), independent of the 192 Hz
//! monitor. It owns continuous-hold and timed-press semantics for
//! synthesized input: subsystems request a desired mask through
//! [`SharedContext`], and this thread turns the request into the
//! per-frame effective mask the hook writes into the game, inserting the
//! neutral edges the engine needs to register a fresh press.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::context::{ImmediateMode, SIDES, SharedContext};
use crate::monitor::FixedRateScheduler;

/// Visual-frame period: 64 Hz.
pub const WRITER_PERIOD: Duration = Duration::from_nanos(15_625_000);

pub struct ImmediateInputWriter {
    ctx: Arc<SharedContext>,
}

impl ImmediateInputWriter {
    pub fn new(ctx: Arc<SharedContext>) -> Self {
        Self { ctx }
    }

    /// Spawn the writer thread. Exits when shutdown or the online latch is
    /// set.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("input-writer".into())
            .spawn(move || self.run())
            .expect("failed to spawn input-writer thread")
    }

    fn run(self) {
        info!("immediate-input writer running at 64 Hz");
        let mut scheduler = FixedRateScheduler::new(WRITER_PERIOD);

        loop {
            if self.ctx.shutdown.load(Ordering::Acquire)
                || self.ctx.online.load(Ordering::Acquire)
            {
                break;
            }

            for side in 0..SIDES {
                self.step_side(side);
            }

            // Pacing only; press-edge correctness does not need the spin
            // phase, so always take the cheap sleep path.
            scheduler.wait(false);
        }

        for side in 0..SIDES {
            self.ctx.immediate[side].deactivate();
        }
        debug!("immediate-input writer exited");
    }

    /// Advance one side's desired state by one visual frame.
    fn step_side(&self, side: usize) {
        let slot = &self.ctx.immediate[side];

        match slot.mode() {
            ImmediateMode::Off => {
                slot.set_current(0);
            }
            ImmediateMode::Hold => {
                if slot.take_edge_pending() {
                    // One neutral frame so the re-asserted mask lands as a
                    // genuine press, not a held level.
                    slot.set_current(0);
                } else {
                    slot.set_current(slot.desired_mask());
                }
            }
            ImmediateMode::Press => {
                if slot.take_edge_pending() {
                    slot.set_current(0);
                    return;
                }
                let remaining = slot.ticks_remaining();
                if remaining == 0 {
                    slot.deactivate();
                    return;
                }
                slot.set_current(slot.desired_mask());
                slot.set_ticks(remaining - 1);
            }
        }
    }
}
