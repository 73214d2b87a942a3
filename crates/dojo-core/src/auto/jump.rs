//! Auto-jump: make the dummy jump whenever it regains control.

use std::sync::atomic::Ordering;

use crate::auto::AutoActionActivity;
use crate::context::SharedContext;
use crate::input::InputMask;
use crate::sample::PerFrameSample;
use crate::settings::Settings;

pub struct AutoJump {
    was_actionable: [bool; 2],
}

impl AutoJump {
    pub fn new() -> Self {
        Self {
            was_actionable: [false; 2],
        }
    }

    pub fn reset(&mut self) {
        self.was_actionable = [false; 2];
    }

    /// Press the configured jump direction on each actionable edge.
    ///
    /// Auto-action activity is consulted through the injected query so a
    /// pending trigger is never stomped by a jump input.
    pub fn tick(
        &mut self,
        sample: &PerFrameSample,
        settings: &Settings,
        ctx: &SharedContext,
        activity: &dyn AutoActionActivity,
    ) {
        if !ctx.features.auto_jump.load(Ordering::Acquire) || !settings.auto_jump.enabled {
            self.reset();
            return;
        }

        for side in 0..2 {
            if !settings.trigger_side.applies_to(side) {
                continue;
            }
            let actionable = sample.actionable[side];
            let rising = actionable && !self.was_actionable[side];
            self.was_actionable[side] = actionable;

            if !rising || activity.is_active_for(side) {
                continue;
            }

            let mask = InputMask::from_direction_digit(settings.auto_jump.direction_digit)
                .filter(|m| m.has(InputMask::UP))
                .unwrap_or(InputMask::new(InputMask::UP));
            ctx.press(side, mask.bits(), 2);
        }
    }
}

impl Default for AutoJump {
    fn default() -> Self {
        Self::new()
    }
}
