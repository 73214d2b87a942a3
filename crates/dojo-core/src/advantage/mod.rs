//! Frame-advantage calculation.
//!
//! Tracks, per attacking side, when the attacker can next act and when the
//! defender is released, and publishes the signed difference in internal
//! frames. The two sides run the same logic as mirror images, each with
//! its own exchange state.

mod display;

pub use display::format_advantage;

use tracing::debug;

use crate::context::SharedContext;
use crate::sample::PerFrameSample;
use crate::state::{self, GamePhase};

/// Connect-to-connect window (internal frames) for string-gap reporting.
const GAP_WINDOW: u64 = 60;
/// Window after an attack edge in which a defender lockup is attributed to
/// that attack even without a recognized stun transition.
const FALLBACK_CONNECT_WINDOW: u64 = 60;
/// Internal frames a fresh connect suppresses duplicate detection.
const CONNECT_COOLDOWN: u64 = 3;
/// How long the transient gap overlay stays up.
const GAP_DISPLAY_MS: i64 = 333;
/// Unresolved-and-not-waiting ticks before the state machine force-resets.
pub const STALE_RESET_TICKS: u64 = 1152;

/// One tracked exchange, keyed by attacker side.
#[derive(Debug, Default, Clone, Copy)]
struct Exchange {
    active: bool,
    /// Latest attack startup edge; also used by fallback connect detection.
    attack_edge_tick: Option<u64>,
    connected: bool,
    /// Defender was driven non-actionable at some point in this exchange.
    defender_locked: bool,
    attacker_actionable: Option<u64>,
    defender_free: Option<u64>,
    /// Freeze frames seen after the attacker recovered, before release.
    freeze_after_recovery: u64,
    stale_ticks: u64,
}

impl Exchange {
    fn begin(&mut self, tick: u64) {
        self.active = true;
        self.attack_edge_tick = Some(tick);
        self.connected = false;
        self.defender_locked = false;
        self.attacker_actionable = None;
        self.defender_free = None;
        self.freeze_after_recovery = 0;
        self.stale_ticks = 0;
    }

    fn finish(&mut self) {
        self.active = false;
        self.attack_edge_tick = None;
        self.connected = false;
        self.defender_locked = false;
        self.attacker_actionable = None;
        self.defender_free = None;
        self.freeze_after_recovery = 0;
        self.stale_ticks = 0;
    }
}

/// Per-defender bookkeeping for gaps between hits of a string. Kept apart
/// from [`Exchange`] so connects and staleness resets cannot clobber it.
#[derive(Debug, Default, Clone, Copy)]
struct GapTrack {
    last_free_tick: Option<u64>,
    freeze_since_free: u64,
}

pub struct FrameAdvantage {
    /// Indexed by attacker side.
    exchanges: [Exchange; 2],
    /// Indexed by defender side.
    gaps: [GapTrack; 2],
    connect_cooldown_until: [u64; 2],
    resets: u64,
}

impl FrameAdvantage {
    pub fn new() -> Self {
        Self {
            exchanges: Default::default(),
            gaps: Default::default(),
            connect_cooldown_until: [0; 2],
            resets: 0,
        }
    }

    /// Number of staleness force-resets so far.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn has_active_tracking(&self) -> bool {
        self.exchanges.iter().any(|e| e.active)
    }

    /// Full reset, dropping gap bookkeeping too. Used on phase exits.
    pub fn reset_full(&mut self) {
        self.exchanges = Default::default();
        self.gaps = Default::default();
        self.connect_cooldown_until = [0; 2];
    }

    /// Staleness reset: clears exchange tracking but explicitly keeps the
    /// per-side gap bookkeeping for the next string.
    fn reset_stale(&mut self) {
        self.exchanges = Default::default();
        self.connect_cooldown_until = [0; 2];
        self.resets += 1;
    }

    /// Advance one internal frame. Runs every monitor tick during a match.
    pub fn tick(&mut self, sample: &PerFrameSample, ctx: &SharedContext, display_ms: i64) {
        if sample.phase != GamePhase::Match {
            self.reset_full();
            return;
        }

        self.accumulate_freeze(sample);

        for attacker in 0..2 {
            self.track_attack_start(attacker, sample);
            if !sample.global_freeze {
                self.detect_connect(attacker, sample, ctx);
            }
            self.track_marks(attacker, sample);
            self.try_resolve(attacker, sample, ctx, display_ms);
        }

        // Free edges re-arm gap tracking regardless of exchange state.
        for side in 0..2 {
            if sample.became_actionable(side) {
                self.gaps[side] = GapTrack {
                    last_free_tick: Some(sample.tick),
                    freeze_since_free: 0,
                };
            }
        }

        self.check_staleness(sample);
    }

    fn accumulate_freeze(&mut self, sample: &PerFrameSample) {
        if !sample.global_freeze {
            return;
        }
        for gap in &mut self.gaps {
            if gap.last_free_tick.is_some() {
                gap.freeze_since_free += 1;
            }
        }
        for e in &mut self.exchanges {
            if e.active && e.attacker_actionable.is_some() && e.defender_free.is_none() {
                e.freeze_after_recovery += 1;
            }
        }
    }

    fn track_attack_start(&mut self, attacker: usize, sample: &PerFrameSample) {
        if !sample.entered(attacker, state::is_attack) {
            return;
        }
        let e = &mut self.exchanges[attacker];
        if e.active {
            // Follow-up in a string: refresh the fallback window only.
            e.attack_edge_tick = Some(sample.tick);
        } else {
            e.begin(sample.tick);
        }
    }

    fn detect_connect(&mut self, attacker: usize, sample: &PerFrameSample, ctx: &SharedContext) {
        let defender = 1 - attacker;
        if sample.tick < self.connect_cooldown_until[attacker] {
            return;
        }

        let stun_edge = sample.entered(defender, state::is_blockstun)
            || sample.entered(defender, state::is_hitstun)
            || sample.entered(defender, state::is_thrown);

        let fallback = !stun_edge
            && sample.became_locked(defender)
            && self.exchanges[attacker]
                .attack_edge_tick
                .is_some_and(|t| sample.tick.saturating_sub(t) <= FALLBACK_CONNECT_WINDOW);

        if !stun_edge && !fallback {
            return;
        }

        // Gap between release from the previous hit and this connect.
        let gap = &mut self.gaps[defender];
        if let Some(free) = gap.last_free_tick {
            let value = sample
                .tick
                .saturating_sub(free)
                .saturating_sub(gap.freeze_since_free);
            if value > 0 && value <= GAP_WINDOW {
                ctx.advantage
                    .publish_gap(value as i32, sample.wall_ms + GAP_DISPLAY_MS);
            }
            gap.last_free_tick = None;
        }

        let e = &mut self.exchanges[attacker];
        if !e.active {
            e.begin(sample.tick);
        }
        // New connect: reset the attack-side marks, keep defender-side gap
        // bookkeeping (handled above, in its own struct).
        e.connected = true;
        e.defender_locked = true;
        e.attacker_actionable = None;
        e.defender_free = None;
        e.freeze_after_recovery = 0;
        e.stale_ticks = 0;

        self.connect_cooldown_until[attacker] = sample.tick + CONNECT_COOLDOWN;
    }

    fn track_marks(&mut self, attacker: usize, sample: &PerFrameSample) {
        let defender = 1 - attacker;
        let e = &mut self.exchanges[attacker];
        if !e.active {
            return;
        }

        if e.attacker_actionable.is_none() && sample.became_actionable(attacker) {
            e.attacker_actionable = Some(sample.tick);
            if !e.defender_locked {
                // Whiffed or canceled: the defender was never taken out of
                // neutral, so synthesize the release at the same tick.
                e.defender_free = Some(sample.tick);
            }
        }

        if e.connected
            && e.defender_locked
            && e.defender_free.is_none()
            && sample.became_actionable(defender)
        {
            e.defender_free = Some(sample.tick);
        }
    }

    fn try_resolve(
        &mut self,
        attacker: usize,
        sample: &PerFrameSample,
        ctx: &SharedContext,
        display_ms: i64,
    ) {
        let e = &mut self.exchanges[attacker];
        if !e.active {
            return;
        }
        let (Some(recovered), Some(freed)) = (e.attacker_actionable, e.defender_free) else {
            return;
        };

        let advantage = freed as i64 - recovered as i64 - e.freeze_after_recovery as i64;
        debug!(
            attacker,
            advantage,
            formatted = %format_advantage(advantage),
            "exchange resolved"
        );
        ctx.advantage
            .publish_value(advantage as i32, sample.wall_ms + display_ms);
        e.finish();
    }

    fn check_staleness(&mut self, sample: &PerFrameSample) {
        let mut reset = false;
        for attacker in 0..2 {
            let e = &mut self.exchanges[attacker];
            if !e.active {
                continue;
            }
            if Self::still_waiting(e, sample, attacker) {
                e.stale_ticks = 0;
            } else {
                e.stale_ticks += 1;
                if e.stale_ticks > STALE_RESET_TICKS {
                    reset = true;
                }
            }
        }
        if reset {
            debug!("frame-advantage tracking went stale, resetting");
            self.reset_stale();
        }
    }

    /// Whether an unresolved exchange is legitimately blocked on a state
    /// transition we expect the engine to deliver.
    fn still_waiting(e: &Exchange, sample: &PerFrameSample, attacker: usize) -> bool {
        let defender = 1 - attacker;
        if e.attacker_actionable.is_none() && !sample.actionable[attacker] {
            return true;
        }
        if e.connected
            && e.defender_locked
            && e.defender_free.is_none()
            && !sample.actionable[defender]
        {
            return true;
        }
        false
    }
}

impl Default for FrameAdvantage {
    fn default() -> Self {
        Self::new()
    }
}
