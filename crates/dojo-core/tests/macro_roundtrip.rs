//! Macro round-trip: a recorded sequence survives export, clear, and
//! import byte for byte, and mirroring is a true involution.

use std::sync::Arc;

use dojo_core::context::SharedContext;
use dojo_core::input::InputMask;
use dojo_core::macros::{MacroController, MacroState, export_slot, import_slot};
use dojo_core::memory::{GameMemory, MockMemory, MockMemoryBuilder, layout};
use dojo_core::sample::PerFrameSample;
use dojo_core::state::GamePhase;

const CHAR1: u32 = 0x400;

fn mem_with_char() -> MockMemory {
    // Sized to cover the module-base-relative globals and the side-1
    // character struct, with BASE_SLOT[1] pointing at it so
    // `push_ring_entry` resolves the same base that `sample()` reports.
    MockMemoryBuilder::new()
        .with_size(0x3A_0000)
        .pointer(layout::player::BASE_SLOT[1] as usize, CHAR1 as usize)
        .build()
}

fn sample(tick: u64, mem: &MockMemory) -> PerFrameSample {
    let mut s = PerFrameSample::empty();
    s.tick = tick;
    s.phase = GamePhase::Match;
    s.char_base = [0, mem.base_address() + CHAR1];
    s.facing_right = [true, false];
    s
}

/// Simulate the engine writing `entries` into the ring since last tick.
fn engine_writes(mem: &MockMemory, entries: &[u8], prev_index: u16) -> u16 {
    let base = mem.base_address() + CHAR1;
    let mut index = prev_index;
    for &e in entries {
        index = (index + 1) % layout::player::RING_LEN as u16;
        mem.write_u8(base + layout::player::INPUT_RING + index as u32, e)
            .unwrap();
    }
    mem.write_u16(base + layout::player::INPUT_RING_INDEX, index)
        .unwrap();
    if let Some(&last) = entries.last() {
        mem.write_u8(base + layout::player::INPUT_IMMEDIATE, last)
            .unwrap();
    }
    index
}

#[test]
fn recorded_sequence_round_trips_through_text() {
    let mem = mem_with_char();
    let ctx = Arc::new(SharedContext::new());
    let mut mc = MacroController::new(1);

    mc.handle_record_key();
    mc.handle_record_key();
    assert_eq!(mc.state(), MacroState::Recording);

    // Baseline.
    mc.tick(&sample(0, &mem), &ctx, &mem);

    // A scripted take: walk forward, press A, two-write tick, quiet tick.
    let script: Vec<Vec<u8>> = vec![
        vec![0x08],
        vec![0x08],
        vec![0x18],
        vec![0x08, 0x18],
        vec![],
        vec![0x02],
    ];
    let mut index = 0u16;
    for (i, writes) in script.iter().enumerate() {
        index = engine_writes(&mem, writes, index);
        mc.tick(&sample((i as u64 + 1) * 3, &mem), &ctx, &mem);
    }
    mc.handle_record_key();
    assert_eq!(mc.state(), MacroState::Idle);

    let recorded = mc.slot(0).unwrap().clone();
    assert_eq!(recorded.tick_count(), script.len());
    assert!(recorded.invariants_hold());
    // The quiet tick synthesized exactly one write.
    assert_eq!(recorded.buf_counts[4], 1);

    // Export, clear, import: streams must be identical.
    let text = export_slot(&recorded);
    let slot = mc.slot_mut(0).unwrap();
    slot.clear();
    import_slot(slot, &text).unwrap();

    assert_eq!(slot.mask_stream, recorded.mask_stream);
    assert_eq!(slot.buf_counts, recorded.buf_counts);
    assert_eq!(slot.buf_stream, recorded.buf_stream);
    assert!(slot.invariants_hold());
}

#[test]
fn mirroring_twice_is_identity_for_all_byte_values() {
    for bits in 0..=255u8 {
        let mask = InputMask::new(bits);
        assert_eq!(mask.mirror().mirror(), mask);
    }
}

#[test]
fn replayed_ring_writes_match_recording_cadence() {
    let mem = mem_with_char();
    let ctx = Arc::new(SharedContext::new());
    let mut mc = MacroController::new(1);

    // Hand-load a slot: two ticks, three raw writes total.
    {
        let slot = mc.slot_mut(0).unwrap();
        slot.push_tick(0x08, false, &[0x08, 0x18]);
        slot.push_tick(0x02, false, &[0x02]);
    }
    assert!(mc.start_replay(0));

    // Track every ring write the replay performs.
    let base = mem.base_address() + CHAR1;
    let mut written = Vec::new();
    let mut last_index = 0u16;
    for tick in 0..6u64 {
        mc.tick(&sample(tick, &mem), &ctx, &mem);
        let index = mem.read_u16(base + layout::player::INPUT_RING_INDEX).unwrap();
        while last_index != index {
            last_index = (last_index + 1) % layout::player::RING_LEN as u16;
            written.push(
                mem.read_u8(base + layout::player::INPUT_RING + last_index as u32)
                    .unwrap(),
            );
        }
    }

    // Same writes, same order, no extras and no mirroring (facing match).
    assert_eq!(written, vec![0x08, 0x18, 0x02]);
}
