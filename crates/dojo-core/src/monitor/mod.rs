//! The frame monitor: a dedicated 192 Hz thread that samples game memory,
//! derives semantic state, and drives every reactive subsystem.
//!
//! Three internal ticks compose one of the game's 64 Hz visual frames.
//! The monitor's tick counter is the canonical time base: every delay and
//! timeout in the trainer is expressed in these units, never wall clock.

mod scheduler;

pub use scheduler::FixedRateScheduler;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::advantage::FrameAdvantage;
use crate::auto::{AutoActionEngine, AutoAirtech, AutoBlockMachine, AutoJump};
use crate::context::SharedContext;
use crate::macros::MacroController;
use crate::memory::{GameMemory, layout};
use crate::sample::PerFrameSample;
use crate::settings::{Settings, TargetSide};
use crate::snapshot::FrameSnapshot;
use crate::state::{self, GameMode, GamePhase, PhaseDetector, PhaseTransition};

/// 192 Hz internal tick.
pub const MONITOR_PERIOD: Duration = Duration::from_nanos(5_208_333);

/// How often cached character pointers are re-resolved (~2 s).
const POINTER_REFRESH_TICKS: u64 = 384;

/// Cadence of low-frequency reads that do not need per-tick freshness.
const SLOW_READ_TICKS: u64 = 384;

pub struct FrameMonitor {
    ctx: Arc<SharedContext>,
    mem: Arc<dyn GameMemory>,
    settings: Settings,

    phase: PhaseDetector,
    prev_move_id: [u16; 2],
    facing_right: [bool; 2],
    char_base: [u32; 2],
    move_addr: [Option<u32>; 2],
    last_pointer_refresh: u64,
    timer_high_res: bool,
    char_select_latched: bool,

    // Slow-read caches.
    rf_cache: [f32; 2],
    hits_cache: [u32; 2],

    advantage: FrameAdvantage,
    action: AutoActionEngine,
    airtech: AutoAirtech,
    jump: AutoJump,
    block: AutoBlockMachine,
    macros: Arc<Mutex<MacroController>>,
}

impl FrameMonitor {
    pub fn new(ctx: Arc<SharedContext>, mem: Arc<dyn GameMemory>, settings: Settings) -> Self {
        let record_side = match settings.trigger_side {
            TargetSide::P1 => 0,
            _ => 1,
        };
        Self {
            ctx,
            mem,
            settings,
            phase: PhaseDetector::new(),
            prev_move_id: [0; 2],
            facing_right: [true, false],
            char_base: [0; 2],
            move_addr: [None; 2],
            last_pointer_refresh: 0,
            timer_high_res: false,
            char_select_latched: false,
            rf_cache: [0.0; 2],
            hits_cache: [0; 2],
            advantage: FrameAdvantage::new(),
            action: AutoActionEngine::new(),
            airtech: AutoAirtech::new(),
            jump: AutoJump::new(),
            block: AutoBlockMachine::new(),
            macros: Arc::new(Mutex::new(MacroController::new(record_side))),
        }
    }

    /// Shared handle to the macro controller for status/import/export.
    /// The monitor only locks it while a macro is active or a command is
    /// pending, so UI access never contends with the hot path.
    pub fn macro_controller(&self) -> Arc<Mutex<MacroController>> {
        Arc::clone(&self.macros)
    }

    /// Spawn the monitor thread. It runs until shutdown is requested or a
    /// netplay match is detected; the netplay stop is permanent.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("frame-monitor".into())
            .spawn(move || self.run())
            .expect("failed to spawn frame-monitor thread")
    }

    fn run(mut self) {
        info!("frame monitor running at 192 Hz");
        self.ctx.monitor_running.store(true, Ordering::Release);
        let mut scheduler = FixedRateScheduler::new(MONITOR_PERIOD);

        loop {
            if self.ctx.shutdown.load(Ordering::Acquire) {
                break;
            }
            // Tight pacing only matters while a match is running; outside
            // one, plain sleeps keep CPU use down.
            let in_match = self.phase.current() == GamePhase::Match;
            scheduler.wait(in_match);

            let tick = self.ctx.tick.fetch_add(1, Ordering::AcqRel) + 1;
            if !self.tick_once(tick) {
                break;
            }
        }

        self.set_high_res_timer(false);
        self.ctx.monitor_running.store(false, Ordering::Release);
        info!("frame monitor stopped");
    }

    /// One internal frame. Returns `false` on the permanent netplay stop.
    fn tick_once(&mut self, tick: u64) -> bool {
        let base = self.mem.base_address();

        // Phase detection gates everything else; if even this read fails
        // the game is not in a state worth touching this tick.
        let Ok(raw_phase) = self.mem.read_u8(base + layout::game::SCREEN_STATE) else {
            return true;
        };
        if let Some(transition) = self.phase.observe(raw_phase) {
            self.on_phase_change(transition);
        }

        let phase = self.phase.current();
        self.update_timer_mode(phase);
        if phase != GamePhase::Match {
            return true;
        }

        let mode_raw = self.mem.read_u8(base + layout::game::GAME_MODE).unwrap_or(u8::MAX);
        let mode = GameMode::from_raw(mode_raw);
        let netplay = mode == GameMode::Netplay
            || self
                .mem
                .read_u32(base + layout::game::NETPLAY_FLAG)
                .is_ok_and(|v| v != 0);
        if netplay {
            self.online_stop();
            return false;
        }

        self.refresh_pointers(tick);
        let move_id = self.read_move_ids();
        self.read_facing();

        let sample = PerFrameSample {
            tick,
            wall_ms: Utc::now().timestamp_millis(),
            phase,
            mode,
            move_id,
            prev_move_id: self.prev_move_id,
            actionable: [
                state::is_actionable(move_id[0]),
                state::is_actionable(move_id[1]),
            ],
            neutral: [state::is_neutral(move_id[0]), state::is_neutral(move_id[1])],
            facing_right: self.facing_right,
            char_base: self.char_base,
            global_freeze: self
                .mem
                .read_u32(base + layout::game::FREEZE_TIMER)
                .is_ok_and(|v| v != 0),
            paused: self
                .mem
                .read_u8(base + layout::game::PAUSE_FLAG)
                .is_ok_and(|v| v != 0),
            online: false,
        };

        // Timing-exact subsystems run unconditionally.
        if self.ctx.features.frame_advantage.load(Ordering::Acquire) {
            self.advantage
                .tick(&sample, &self.ctx, self.settings.advantage_display_ms());
        }
        self.block.tick(&sample, &self.settings, &self.ctx, &*self.mem);

        // The rest only needs a tick when something moved or a feature
        // depends on continuous countdowns.
        let critical = self.action.has_pending()
            || self.airtech.patches_applied()
            || self.ctx.features.auto_airtech.load(Ordering::Acquire)
            || self.ctx.features.auto_jump.load(Ordering::Acquire);
        if sample.any_move_changed() || critical {
            self.action
                .tick(&sample, &self.settings, &self.ctx, &*self.mem);
            self.jump
                .tick(&sample, &self.settings, &self.ctx, &self.action);
            self.airtech
                .tick(&sample, &self.settings, &self.ctx, &*self.mem);
        }

        self.drive_macros(&sample);
        self.publish_snapshot(&sample);

        if tick.is_multiple_of(SLOW_READ_TICKS) {
            self.slow_reads();
        }

        self.prev_move_id = move_id;
        true
    }

    fn on_phase_change(&mut self, transition: PhaseTransition) {
        info!("game phase: {:?} -> {:?}", transition.from, transition.to);

        if transition.from == GamePhase::Match {
            // Leaving a match invalidates every delay, trigger, and
            // override; restore anything we patched.
            self.ctx.clear_all_injection();
            self.action.reset();
            self.jump.reset();
            self.airtech.restore(&*self.mem);
            self.advantage.reset_full();
            self.block.reset();
            self.macros.lock().unwrap().stop(&self.ctx);
            self.move_addr = [None; 2];
            self.char_base = [0; 2];
        }

        if transition.to == GamePhase::Match {
            self.advantage.reset_full();
            self.action.reset();
            self.prev_move_id = [0; 2];
            self.last_pointer_refresh = 0;
            let mode_raw = self
                .mem
                .read_u8(self.mem.base_address() + layout::game::GAME_MODE)
                .unwrap_or(u8::MAX);
            if GameMode::from_raw(mode_raw) == GameMode::Practice {
                self.block.reset();
            }
        }

        if transition.to == GamePhase::CharacterSelect {
            // Cross-check against character initialization: a transient
            // phase glitch with live characters must not nuke triggers.
            let chars_live = self
                .mem
                .read_u8(self.mem.base_address() + layout::game::CHAR_INIT_FLAG)
                .is_ok_and(|v| v != 0);
            if !chars_live && !self.char_select_latched {
                self.char_select_latched = true;
                info!("character select: clearing all triggers");
                self.ctx.features.auto_action.store(false, Ordering::Release);
                self.action.reset();
                self.ctx.clear_all_injection();
            }
        } else {
            self.char_select_latched = false;
        }
    }

    /// Re-resolve cached character pointers when invalid or on schedule.
    fn refresh_pointers(&mut self, tick: u64) {
        let due = tick.saturating_sub(self.last_pointer_refresh) >= POINTER_REFRESH_TICKS;
        for side in 0..2 {
            if self.move_addr[side].is_some() && !due {
                continue;
            }
            match self
                .mem
                .resolve_base(self.mem.base_address() + layout::player::BASE_SLOT[side])
            {
                Some(base) => {
                    self.char_base[side] = base;
                    self.move_addr[side] = Some(base + layout::player::MOVE_ID);
                }
                None => {
                    self.char_base[side] = 0;
                    self.move_addr[side] = None;
                }
            }
        }
        if due {
            self.last_pointer_refresh = tick;
        }
    }

    /// Read both move-IDs. A failed read invalidates that side's cached
    /// address and leaves the previous value standing for this tick.
    fn read_move_ids(&mut self) -> [u16; 2] {
        let mut out = self.prev_move_id;
        for side in 0..2 {
            let Some(addr) = self.move_addr[side] else {
                continue;
            };
            match self.mem.read_u16(addr) {
                Ok(value) => out[side] = value,
                Err(_) => {
                    debug!(side, "move-ID read failed, invalidating pointer");
                    self.move_addr[side] = None;
                }
            }
        }
        out
    }

    fn read_facing(&mut self) {
        for side in 0..2 {
            if self.char_base[side] == 0 {
                continue;
            }
            if let Ok(raw) = self
                .mem
                .read_u8(self.char_base[side] + layout::player::FACING)
            {
                self.facing_right[side] = raw == 1;
            }
        }
    }

    fn drive_macros(&mut self, sample: &PerFrameSample) {
        if let Some((command, slot)) = self.ctx.macro_control.take() {
            let mut mc = self.macros.lock().unwrap();
            match command {
                crate::context::MacroCommand::RecordKey => {
                    let _ = mc.select_slot(slot);
                    mc.handle_record_key();
                }
                crate::context::MacroCommand::Play => {
                    mc.start_replay(slot);
                }
                crate::context::MacroCommand::Stop => mc.stop(&self.ctx),
            }
            self.ctx.macro_control.publish_state(mc.state().raw());
        }

        // Idle fast path: no lock taken at all.
        if self.ctx.macro_control.state_raw() != 0 {
            self.macros
                .lock()
                .unwrap()
                .tick(sample, &self.ctx, &*self.mem);
        }
    }

    fn publish_snapshot(&mut self, sample: &PerFrameSample) {
        let mut snapshot = FrameSnapshot {
            tick: sample.tick,
            wall_ms: sample.wall_ms,
            phase: sample.phase,
            move_id: sample.move_id,
            rf: self.rf_cache,
            hits_landed: self.hits_cache,
            ..Default::default()
        };

        for side in 0..2 {
            let base = self.char_base[side];
            if base != 0 {
                snapshot.pos_x[side] =
                    self.mem.read_f32(base + layout::player::POS_X).unwrap_or(0.0);
                snapshot.pos_y[side] =
                    self.mem.read_f32(base + layout::player::POS_Y).unwrap_or(0.0);
                snapshot.hp[side] = self.mem.read_u16(base + layout::player::HP).unwrap_or(0);
                snapshot.meter[side] =
                    self.mem.read_u16(base + layout::player::METER).unwrap_or(0);
            }
            snapshot.in_blockstun[side] = state::is_blockstun(sample.move_id[side]);
            snapshot.in_hitstun[side] = state::is_hitstun(sample.move_id[side]);
            snapshot.blockstun_edge[side] = sample.entered(side, state::is_blockstun);
            snapshot.hitstun_edge[side] = sample.entered(side, state::is_hitstun);
        }

        self.ctx.snapshot.publish(snapshot);
    }

    /// Values that only feed the HUD refresh on a ~2 s cadence.
    fn slow_reads(&mut self) {
        for side in 0..2 {
            let base = self.char_base[side];
            if base == 0 {
                continue;
            }
            if let Ok(rf) = self.mem.read_f32(base + layout::player::RF) {
                self.rf_cache[side] = rf;
            }
            if let Ok(hits) = self.mem.read_u32(base + layout::player::HITS_LANDED) {
                self.hits_cache[side] = hits;
            }
        }
    }

    /// Permanent stop on netplay detection: clean up every injection and
    /// patch, latch the online flag, and let the thread exit for good.
    fn online_stop(&mut self) {
        warn!("netplay match detected: trainer shutting down for this session");
        self.ctx.clear_all_injection();
        self.action.reset();
        self.jump.reset();
        self.airtech.restore(&*self.mem);
        self.macros.lock().unwrap().stop(&self.ctx);
        self.ctx.online.store(true, Ordering::Release);
    }

    fn update_timer_mode(&mut self, phase: GamePhase) {
        let want = phase == GamePhase::Match;
        if want != self.timer_high_res {
            self.set_high_res_timer(want);
        }
    }

    #[cfg(target_os = "windows")]
    fn set_high_res_timer(&mut self, enable: bool) {
        use windows::Win32::Media::{timeBeginPeriod, timeEndPeriod};
        // SAFETY: plain scheduler-resolution requests, paired on toggle.
        unsafe {
            if enable {
                timeBeginPeriod(1);
            } else if self.timer_high_res {
                timeEndPeriod(1);
            }
        }
        self.timer_high_res = enable;
        debug!(enable, "high-resolution timer mode");
    }

    #[cfg(not(target_os = "windows"))]
    fn set_high_res_timer(&mut self, enable: bool) {
        self.timer_high_res = enable;
    }
}
