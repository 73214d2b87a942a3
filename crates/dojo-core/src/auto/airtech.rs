//! Forced airtech via code patching.
//!
//! The engine gates air recovery behind a conditional branch per
//! direction; NOPing the branch makes the tech always eligible. The patch
//! is strictly temporary: it is removed on a short countdown so it cannot
//! linger into AI-controlled behavior, and proactively whenever either
//! side is inside the native airtech animation so the engine's own timing
//! is never contaminated.

use std::sync::atomic::Ordering;

use tracing::debug;

use crate::context::SharedContext;
use crate::input::InputMask;
use crate::memory::{GameMemory, layout};
use crate::sample::PerFrameSample;
use crate::settings::{Settings, TechDirection};
use crate::state;

/// Visual frames a temporary patch stays applied before auto-removal.
const PATCH_LINGER_FRAMES: u32 = 12;

pub struct AutoAirtech {
    applied: Option<TechDirection>,
    remove_countdown: u32,
    /// Per-side countdown from the launch edge to the forced tech.
    delay_left: [Option<u32>; 2],
}

impl AutoAirtech {
    pub fn new() -> Self {
        Self {
            applied: None,
            remove_countdown: 0,
            delay_left: [None; 2],
        }
    }

    pub fn patches_applied(&self) -> bool {
        self.applied.is_some()
    }

    /// Remove any active patch and forget transient state.
    pub fn restore(&mut self, mem: &dyn GameMemory) {
        if self.applied.take().is_some() {
            write_site(mem, &layout::patch::AIRTECH_FORWARD, false);
            write_site(mem, &layout::patch::AIRTECH_BACKWARD, false);
            debug!("airtech patches restored");
        }
        self.remove_countdown = 0;
        self.delay_left = [None; 2];
    }

    pub fn tick(
        &mut self,
        sample: &PerFrameSample,
        settings: &Settings,
        ctx: &SharedContext,
        mem: &dyn GameMemory,
    ) {
        if !ctx.features.auto_airtech.load(Ordering::Acquire) || !settings.auto_airtech.enabled {
            self.restore(mem);
            return;
        }

        // Native airtech in progress on either side: get out of the way.
        if state::is_airtech(sample.move_id[0]) || state::is_airtech(sample.move_id[1]) {
            self.restore(mem);
            return;
        }

        let visual_frame = sample.tick.is_multiple_of(3);

        // Age out a lingering patch before any (re)application this tick,
        // so a fresh apply always gets the full window.
        if self.applied.is_some() && visual_frame && self.remove_countdown > 0 {
            self.remove_countdown -= 1;
            if self.remove_countdown == 0 {
                self.restore(mem);
            }
        }

        for side in 0..2 {
            if !settings.trigger_side.applies_to(side) {
                continue;
            }

            if sample.entered(side, state::is_launched) {
                self.delay_left[side] = Some(settings.auto_airtech.delay_frames);
            } else if !state::is_launched(sample.move_id[side]) {
                self.delay_left[side] = None;
            }

            let Some(left) = self.delay_left[side] else {
                continue;
            };
            if !visual_frame {
                continue;
            }

            if left > 0 {
                self.delay_left[side] = Some(left - 1);
                continue;
            }

            self.delay_left[side] = None;
            self.apply(settings.auto_airtech.direction, mem);
            // Hold the direction so the freed tech goes the intended way.
            let dir = match settings.auto_airtech.direction {
                TechDirection::Forward if sample.facing_right[side] => InputMask::RIGHT,
                TechDirection::Forward => InputMask::LEFT,
                TechDirection::Backward if sample.facing_right[side] => InputMask::LEFT,
                TechDirection::Backward => InputMask::RIGHT,
            };
            ctx.press(side, dir, 2);
        }
    }

    fn apply(&mut self, direction: TechDirection, mem: &dyn GameMemory) {
        if self.applied != Some(direction) {
            // The inactive direction's bytes stay original at all times.
            match direction {
                TechDirection::Forward => {
                    write_site(mem, &layout::patch::AIRTECH_BACKWARD, false);
                    write_site(mem, &layout::patch::AIRTECH_FORWARD, true);
                }
                TechDirection::Backward => {
                    write_site(mem, &layout::patch::AIRTECH_FORWARD, false);
                    write_site(mem, &layout::patch::AIRTECH_BACKWARD, true);
                }
            }
            self.applied = Some(direction);
            debug!(?direction, "airtech patch applied");
        }
        self.remove_countdown = PATCH_LINGER_FRAMES;
    }
}

impl Default for AutoAirtech {
    fn default() -> Self {
        Self::new()
    }
}

fn write_site(mem: &dyn GameMemory, site: &layout::patch::PatchSite, patched: bool) {
    let bytes = if patched { &site.patched } else { &site.original };
    let _ = mem.write_bytes(mem.base_address() + site.address, bytes);
}
