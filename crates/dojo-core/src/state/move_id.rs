//! Move-ID classification.
//!
//! The game identifies a character's current animation state with a single
//! integer drawn from its animation table. These predicates partition that
//! space into the semantic categories the trainer reacts to. All of them
//! are pure range tests; the ranges were mapped empirically against the
//! target binary's animation table.
//!
//! Classification fails closed: an ID covered by neither the neutral
//! whitelist nor a prohibited category is treated as non-actionable, and
//! logged at debug level so gaps in the mapping can be found in play.

use tracing::debug;

// Neutral whitelist: states a character can always act out of.
pub const MOVE_STAND: u16 = 0;
pub const MOVE_WALK_FORWARD: u16 = 1;
pub const MOVE_WALK_BACKWARD: u16 = 2;
pub const MOVE_CROUCH: u16 = 3;
pub const MOVE_CROUCH_RECOVERY: u16 = 4;
pub const MOVE_LANDING: u16 = 7;

const NEUTRAL_WHITELIST: [u16; 6] = [
    MOVE_STAND,
    MOVE_WALK_FORWARD,
    MOVE_WALK_BACKWARD,
    MOVE_CROUCH,
    MOVE_CROUCH_RECOVERY,
    MOVE_LANDING,
];

// Known passive states: classified, not actionable-by-whitelist, but also
// not prohibited (stance shifts, turnarounds, pre-jump).
const STANCE_SHIFT_RANGE: std::ops::RangeInclusive<u16> = 5..=6;
const TURNAROUND_RANGE: std::ops::RangeInclusive<u16> = 8..=10;
const JUMP_RANGE: std::ops::RangeInclusive<u16> = 35..=49;

const HITSTUN_RANGE: std::ops::RangeInclusive<u16> = 50..=79;
const LAUNCHED_RANGE: std::ops::RangeInclusive<u16> = 80..=99;
const AIRTECH_RANGE: std::ops::RangeInclusive<u16> = 100..=103;
const GROUNDTECH_RANGE: std::ops::RangeInclusive<u16> = 104..=108;
const FROZEN_RANGE: std::ops::RangeInclusive<u16> = 110..=115;
const SPECIAL_STUN_RANGE: std::ops::RangeInclusive<u16> = 116..=125;
const THROWN_RANGE: std::ops::RangeInclusive<u16> = 130..=145;

const BLOCKSTUN_STAND_RANGE: std::ops::RangeInclusive<u16> = 150..=154;
const BLOCKSTUN_CROUCH_RANGE: std::ops::RangeInclusive<u16> = 155..=159;
const BLOCKSTUN_AIR_RANGE: std::ops::RangeInclusive<u16> = 160..=164;
const GUARD_STANCE_RANGE: std::ops::RangeInclusive<u16> = 165..=169;

pub const MOVE_DASH_START: u16 = 170;
pub const MOVE_DASH: u16 = 171;
pub const MOVE_BACKDASH_START: u16 = 172;
const DASH_RANGE: std::ops::RangeInclusive<u16> = 170..=174;

const NORMAL_LIGHT_RANGE: std::ops::RangeInclusive<u16> = 200..=249;
const NORMAL_MEDIUM_RANGE: std::ops::RangeInclusive<u16> = 250..=299;
const NORMAL_HEAVY_RANGE: std::ops::RangeInclusive<u16> = 300..=399;
const SPECIAL_RANGE: std::ops::RangeInclusive<u16> = 400..=499;
const SUPER_RANGE: std::ops::RangeInclusive<u16> = 500..=599;

pub fn is_hitstun(id: u16) -> bool {
    HITSTUN_RANGE.contains(&id)
}

pub fn is_launched(id: u16) -> bool {
    LAUNCHED_RANGE.contains(&id)
}

pub fn is_airtech(id: u16) -> bool {
    AIRTECH_RANGE.contains(&id)
}

pub fn is_groundtech(id: u16) -> bool {
    GROUNDTECH_RANGE.contains(&id)
}

pub fn is_frozen(id: u16) -> bool {
    FROZEN_RANGE.contains(&id)
}

pub fn is_special_stun(id: u16) -> bool {
    SPECIAL_STUN_RANGE.contains(&id)
}

pub fn is_thrown(id: u16) -> bool {
    THROWN_RANGE.contains(&id)
}

pub fn is_blockstun(id: u16) -> bool {
    BLOCKSTUN_STAND_RANGE.contains(&id)
        || BLOCKSTUN_CROUCH_RANGE.contains(&id)
        || BLOCKSTUN_AIR_RANGE.contains(&id)
}

pub fn is_guard_stance(id: u16) -> bool {
    GUARD_STANCE_RANGE.contains(&id)
}

pub fn is_dash(id: u16) -> bool {
    DASH_RANGE.contains(&id)
}

pub fn is_attack(id: u16) -> bool {
    NORMAL_LIGHT_RANGE.contains(&id)
        || NORMAL_MEDIUM_RANGE.contains(&id)
        || NORMAL_HEAVY_RANGE.contains(&id)
        || SPECIAL_RANGE.contains(&id)
        || SUPER_RANGE.contains(&id)
}

/// Any stun the defender cannot act out of.
pub fn is_stun(id: u16) -> bool {
    is_hitstun(id)
        || is_launched(id)
        || is_frozen(id)
        || is_special_stun(id)
        || is_thrown(id)
        || is_blockstun(id)
}

/// States that commit the character to a move in flight. Used by macro
/// replay to decide when restoring control can no longer desync a
/// buffered command.
pub fn is_commitment(id: u16) -> bool {
    id == MOVE_DASH_START
        || id == MOVE_BACKDASH_START
        || SPECIAL_RANGE.contains(&id)
        || SUPER_RANGE.contains(&id)
}

/// Whether the character can immediately respond to new input.
///
/// True for the explicit neutral whitelist, false for every prohibited
/// category, and false (conservatively) for anything unclassified.
pub fn is_actionable(id: u16) -> bool {
    if NEUTRAL_WHITELIST.contains(&id) {
        return true;
    }
    if is_attack(id)
        || is_blockstun(id)
        || is_hitstun(id)
        || is_launched(id)
        || is_airtech(id)
        || is_groundtech(id)
        || is_frozen(id)
        || is_special_stun(id)
        || is_thrown(id)
        || is_guard_stance(id)
    {
        return false;
    }
    if STANCE_SHIFT_RANGE.contains(&id)
        || TURNAROUND_RANGE.contains(&id)
        || JUMP_RANGE.contains(&id)
        || DASH_RANGE.contains(&id)
    {
        return false;
    }
    debug!("unclassified move-ID {id}, treating as non-actionable");
    false
}

/// Whether the ID is in the neutral whitelist (stricter than actionable).
pub fn is_neutral(id: u16) -> bool {
    NEUTRAL_WHITELIST.contains(&id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackLevel {
    Light,
    Medium,
    Heavy,
}

/// Strength band of a normal attack; specials and supers report `Heavy`.
pub fn attack_level(id: u16) -> Option<AttackLevel> {
    if NORMAL_LIGHT_RANGE.contains(&id) {
        Some(AttackLevel::Light)
    } else if NORMAL_MEDIUM_RANGE.contains(&id) {
        Some(AttackLevel::Medium)
    } else if NORMAL_HEAVY_RANGE.contains(&id) || SPECIAL_RANGE.contains(&id) || SUPER_RANGE.contains(&id) {
        Some(AttackLevel::Heavy)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Standing,
    Crouching,
    Air,
}

pub fn block_state_kind(id: u16) -> Option<BlockState> {
    if BLOCKSTUN_STAND_RANGE.contains(&id) {
        Some(BlockState::Standing)
    } else if BLOCKSTUN_CROUCH_RANGE.contains(&id) {
        Some(BlockState::Crouching)
    } else if BLOCKSTUN_AIR_RANGE.contains(&id) {
        Some(BlockState::Air)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_is_actionable() {
        for id in [0, 1, 2, 3, 4, 7] {
            assert!(is_actionable(id), "id {id}");
            assert!(is_neutral(id), "id {id}");
        }
    }

    #[test]
    fn prohibited_states_are_not_actionable() {
        for id in [55, 85, 101, 106, 112, 120, 135, 152, 157, 162, 167, 210, 450, 550] {
            assert!(!is_actionable(id), "id {id}");
        }
    }

    #[test]
    fn unknown_ids_fail_closed() {
        for id in [11, 34, 146, 199, 600, 9999] {
            assert!(!is_actionable(id), "id {id}");
        }
    }

    #[test]
    fn categories_are_disjoint() {
        for id in 0..=700u16 {
            let cats = [
                is_hitstun(id),
                is_launched(id),
                is_airtech(id),
                is_groundtech(id),
                is_frozen(id),
                is_special_stun(id),
                is_thrown(id),
                is_blockstun(id),
                is_guard_stance(id),
                is_attack(id),
                is_dash(id),
            ];
            assert!(
                cats.iter().filter(|&&c| c).count() <= 1,
                "id {id} in multiple categories"
            );
        }
    }

    #[test]
    fn attack_levels_by_band() {
        assert_eq!(attack_level(210), Some(AttackLevel::Light));
        assert_eq!(attack_level(260), Some(AttackLevel::Medium));
        assert_eq!(attack_level(310), Some(AttackLevel::Heavy));
        assert_eq!(attack_level(450), Some(AttackLevel::Heavy));
        assert_eq!(attack_level(0), None);
    }

    #[test]
    fn block_state_kinds() {
        assert_eq!(block_state_kind(150), Some(BlockState::Standing));
        assert_eq!(block_state_kind(155), Some(BlockState::Crouching));
        assert_eq!(block_state_kind(160), Some(BlockState::Air));
        assert_eq!(block_state_kind(149), None);
    }

    #[test]
    fn commitment_states() {
        assert!(is_commitment(MOVE_DASH_START));
        assert!(is_commitment(430));
        assert!(is_commitment(510));
        assert!(!is_commitment(MOVE_STAND));
        assert!(!is_commitment(210));
    }
}
