//! Fixed memory layout for the one supported game binary.
//!
//! Offsets were recovered against the retail build and are not expected to
//! work anywhere else; version drift is detected at attach time by the CLI,
//! not compensated for here.

/// Global engine state, addressed from the module base.
pub mod game {
    /// Raw screen-state byte; decoded by [`crate::state::GamePhase`].
    pub const SCREEN_STATE: u32 = 0x0035_C02C;
    /// Raw mode byte; decoded by [`crate::state::GameMode`].
    pub const GAME_MODE: u32 = 0x0035_C030;
    /// Nonzero while a netplay session is active.
    pub const NETPLAY_FLAG: u32 = 0x0035_C034;
    /// Nonzero while the practice pause menu halts the engine.
    pub const PAUSE_FLAG: u32 = 0x0035_C044;
    /// Increments once per engine frame advanced while paused (frame-step).
    pub const FRAME_STEP_COUNTER: u32 = 0x0035_C048;
    /// Remaining superflash/global-freeze frames; zero when the clock runs.
    pub const FREEZE_TIMER: u32 = 0x0035_C050;
    /// Set by the engine once both characters finished initialization.
    pub const CHAR_INIT_FLAG: u32 = 0x0035_C058;
}

/// Per-character state, addressed from a character struct pointer.
///
/// The character struct pointers live in two fixed slots (one per side,
/// module-base-relative like everything in [`super::game`]) and are only
/// valid during a match; a null slot means "no character".
pub mod player {
    /// Pointer slots holding each side's character struct address.
    pub const BASE_SLOT: [u32; 2] = [0x0039_4854, 0x0039_4858];

    pub const MOVE_ID: u32 = 0x0130; // u16
    /// 1 when facing right, 255 (-1) when facing left.
    pub const FACING: u32 = 0x0134; // u8
    pub const POS_X: u32 = 0x00EC; // f32
    pub const POS_Y: u32 = 0x00F0; // f32
    pub const HP: u32 = 0x0184; // u16
    pub const METER: u32 = 0x0188; // u16
    pub const RF: u32 = 0x018C; // f32
    pub const BLOCKSTUN_TIMER: u32 = 0x01A0; // u16
    /// 0 standing, 1 crouching.
    pub const STANCE: u32 = 0x01A4; // u8
    /// Engine block-mode byte consumed by the guard check.
    pub const BLOCK_MODE: u32 = 0x01A8; // u8
    /// The game's own practice auto-block flag.
    pub const AUTOBLOCK_FLAG: u32 = 0x01AC; // u8
    /// Frame index within the current animation.
    pub const ANIM_FRAME: u32 = 0x01B0; // u16
    /// Pointer to the animation's per-frame attack property table.
    pub const FRAME_PROPS_PTR: u32 = 0x01B4; // u32 -> [u8]
    /// Number of hits this side has landed this round.
    pub const HITS_LANDED: u32 = 0x01BC; // u32

    /// Immediate input register the engine samples each visual frame.
    pub const INPUT_IMMEDIATE: u32 = 0x0200; // u8
    /// Circular input-history buffer used by motion detection.
    pub const INPUT_RING: u32 = 0x0208; // [u8; RING_LEN]
    pub const INPUT_RING_INDEX: u32 = 0x0248; // u16
    pub const RING_LEN: u32 = 0x40;
}

/// Attack property bits in the per-frame table pointed to by
/// [`player::FRAME_PROPS_PTR`].
pub mod frame_props {
    pub const HITS_HIGH: u8 = 0x01;
    pub const HITS_LOW: u8 = 0x02;
    pub const GUARD_REQUIRED: u8 = 0x04;
}

/// Code patch sites for the airtech-eligibility gate.
///
/// Each site is a conditional branch that rejects the tech attempt; NOPing
/// it makes the corresponding direction always eligible. Original bytes are
/// kept here so a patch can always be reversed.
pub mod patch {
    pub struct PatchSite {
        pub address: u32,
        pub original: [u8; 6],
        pub patched: [u8; 6],
    }

    pub const NOP6: [u8; 6] = [0x90, 0x90, 0x90, 0x90, 0x90, 0x90];

    pub const AIRTECH_FORWARD: PatchSite = PatchSite {
        address: 0x000E_2A41,
        original: [0x0F, 0x84, 0x9B, 0x00, 0x00, 0x00],
        patched: NOP6,
    };

    pub const AIRTECH_BACKWARD: PatchSite = PatchSite {
        address: 0x000E_2B0D,
        original: [0x0F, 0x84, 0xCF, 0x00, 0x00, 0x00],
        patched: NOP6,
    };
}
