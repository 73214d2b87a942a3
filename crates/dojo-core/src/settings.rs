//! Runtime tunables.
//!
//! The core never parses configuration text; the CLI (or any other host)
//! deserializes this struct and hands it over. Defaults match a fresh
//! install.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which side a feature drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum TargetSide {
    P1,
    #[default]
    P2,
    Both,
}

impl TargetSide {
    pub fn applies_to(self, side: usize) -> bool {
        match self {
            TargetSide::P1 => side == 0,
            TargetSide::P2 => side == 1,
            TargetSide::Both => true,
        }
    }
}

/// Button strength used by trigger actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum Strength {
    #[default]
    A,
    B,
    C,
}

impl Strength {
    pub fn button_bit(self) -> u8 {
        use crate::input::InputMask;
        match self {
            Strength::A => InputMask::A,
            Strength::B => InputMask::B,
            Strength::C => InputMask::C,
        }
    }
}

/// Symbolic action a trigger can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum ActionKind {
    #[default]
    Jump,
    Backdash,
    ForwardDash,
    StandingNormal,
    CrouchingNormal,
    QuarterCircleForward,
    QuarterCircleBack,
    DragonPunch,
    Super,
    /// Write the configured move-ID directly instead of synthesizing input.
    CustomMoveId,
}

/// Direction of a forced airtech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum TechDirection {
    #[default]
    Forward,
    Backward,
}

/// Dummy auto-block policy.
///
/// `Adaptive` is kept for old config files and behaves as `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
pub enum AutoBlockPolicy {
    #[default]
    None,
    All,
    FirstHitThenOff,
    EnableAfterFirstHit,
    Adaptive,
}

impl AutoBlockPolicy {
    /// Collapse deprecated variants to their replacement.
    pub fn normalized(self) -> Self {
        match self {
            AutoBlockPolicy::Adaptive => AutoBlockPolicy::All,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSettings {
    pub enabled: bool,
    pub action: ActionKind,
    pub strength: Strength,
    pub custom_move_id: u16,
    /// Delay before the action, in visual frames.
    pub delay_frames: u32,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            action: ActionKind::Jump,
            strength: Strength::A,
            custom_move_id: 0,
            delay_frames: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirtechSettings {
    pub enabled: bool,
    pub direction: TechDirection,
    /// Visual frames to stay in hitstun before teching; 0 techs instantly.
    pub delay_frames: u32,
}

impl Default for AirtechSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            direction: TechDirection::Forward,
            delay_frames: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpSettings {
    pub enabled: bool,
    /// Numpad direction of the jump: 7, 8, or 9.
    pub direction_digit: u8,
}

impl Default for JumpSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            direction_digit: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockSettings {
    pub policy: AutoBlockPolicy,
    /// Visual frames of sustained neutral before the policy re-arms;
    /// 0 means edge-only.
    pub neutral_timeout_frames: u32,
    /// Continuously match the dummy's stance to incoming highs/lows.
    pub adaptive_stance: bool,
}

impl Default for BlockSettings {
    fn default() -> Self {
        Self {
            policy: AutoBlockPolicy::None,
            neutral_timeout_frames: 0,
            adaptive_stance: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub trigger_side: TargetSide,
    pub after_block: TriggerSettings,
    pub on_wakeup: TriggerSettings,
    pub after_hitstun: TriggerSettings,
    pub after_airtech: TriggerSettings,
    pub auto_airtech: AirtechSettings,
    pub auto_jump: JumpSettings,
    pub auto_block: BlockSettings,
    /// How long a resolved frame-advantage value stays on screen.
    pub advantage_display_secs: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            trigger_side: TargetSide::P2,
            after_block: TriggerSettings::default(),
            on_wakeup: TriggerSettings::default(),
            after_hitstun: TriggerSettings::default(),
            after_airtech: TriggerSettings::default(),
            auto_airtech: AirtechSettings::default(),
            auto_jump: JumpSettings::default(),
            auto_block: BlockSettings::default(),
            advantage_display_secs: 5.0,
        }
    }
}

impl Settings {
    /// Display duration clamped to the supported range.
    pub fn advantage_display_ms(&self) -> i64 {
        let secs = self.advantage_display_secs.clamp(0.5, 30.0);
        (secs * 1000.0) as i64
    }
}
