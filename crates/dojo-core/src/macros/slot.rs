//! Macro slot storage.
//!
//! A slot keeps three parallel representations of one recording:
//! run-length-encoded spans (the compact form the UI lists), a flat
//! per-tick mask stream, and the exact raw engine-buffer writes observed
//! each tick. The flat streams are authoritative for replay; the spans
//! are derived and kept in sync by [`MacroSlot::push_tick`].

use crate::input::InputMask;

pub const SLOT_COUNT: usize = 8;

const BUTTON_BITS: u8 = InputMask::A | InputMask::B | InputMask::C | InputMask::D;

/// One run of identical ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroSpan {
    pub mask: u8,
    /// Resolved buffer mask for the run (last raw write of each tick).
    pub buf_mask: u8,
    pub ticks: u32,
    pub facing_right: bool,
}

/// Per-slot summary for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotStats {
    pub ticks: usize,
    pub spans: usize,
    pub buf_writes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MacroSlot {
    pub spans: Vec<MacroSpan>,
    /// One resolved mask per recorded 64 Hz tick.
    pub mask_stream: Vec<u8>,
    /// Facing at capture time, parallel to `mask_stream`.
    pub facing_stream: Vec<bool>,
    /// Raw engine-buffer writes per tick, parallel to `mask_stream`.
    pub buf_counts: Vec<u16>,
    /// Concatenated raw writes; `buf_counts` gives the per-tick split.
    pub buf_stream: Vec<u8>,
    #[cfg(feature = "heavy-diagnostics")]
    pub raw_immediate: Vec<u8>,
}

impl MacroSlot {
    pub fn clear(&mut self) {
        self.spans.clear();
        self.mask_stream.clear();
        self.facing_stream.clear();
        self.buf_counts.clear();
        self.buf_stream.clear();
        #[cfg(feature = "heavy-diagnostics")]
        self.raw_immediate.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.mask_stream.is_empty()
    }

    pub fn tick_count(&self) -> usize {
        self.mask_stream.len()
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            ticks: self.mask_stream.len(),
            spans: self.spans.len(),
            buf_writes: self.buf_stream.len(),
        }
    }

    /// Append one recorded tick. `buf_writes` must hold at least one
    /// entry; the recorder synthesizes one for write-less ticks.
    pub fn push_tick(&mut self, mask: u8, facing_right: bool, buf_writes: &[u8]) {
        debug_assert!(!buf_writes.is_empty(), "recorder must synthesize a write");

        self.mask_stream.push(mask);
        self.facing_stream.push(facing_right);
        self.buf_counts.push(buf_writes.len() as u16);
        self.buf_stream.extend_from_slice(buf_writes);

        let buf_mask = buf_writes.last().copied().unwrap_or(mask);
        match self.spans.last_mut() {
            Some(span)
                if span.mask == mask
                    && span.buf_mask == buf_mask
                    && span.facing_right == facing_right =>
            {
                span.ticks += 1;
            }
            _ => self.spans.push(MacroSpan {
                mask,
                buf_mask,
                ticks: 1,
                facing_right,
            }),
        }
    }

    /// Byte offset into `buf_stream` where tick `index`'s writes begin.
    pub fn buf_offset(&self, index: usize) -> usize {
        self.buf_counts[..index].iter().map(|&c| c as usize).sum()
    }

    /// Raw writes captured for tick `index`.
    pub fn buf_writes(&self, index: usize) -> &[u8] {
        let start = self.buf_offset(index);
        let len = self.buf_counts[index] as usize;
        &self.buf_stream[start..start + len]
    }

    /// Structural invariants tying the parallel streams together.
    pub fn invariants_hold(&self) -> bool {
        self.buf_counts.len() == self.mask_stream.len()
            && self.facing_stream.len() == self.mask_stream.len()
            && self.buf_counts.iter().map(|&c| c as usize).sum::<usize>() == self.buf_stream.len()
            && self.spans.iter().map(|s| s.ticks as usize).sum::<usize>()
                == self.mask_stream.len()
    }

    /// Rebuild the span list from the flat streams (after an import).
    pub fn rebuild_spans(&mut self) {
        self.spans.clear();
        for i in 0..self.mask_stream.len() {
            let mask = self.mask_stream[i];
            let facing = self.facing_stream[i];
            let buf_mask = self.buf_writes(i).last().copied().unwrap_or(mask);
            match self.spans.last_mut() {
                Some(span)
                    if span.mask == mask
                        && span.buf_mask == buf_mask
                        && span.facing_right == facing =>
                {
                    span.ticks += 1;
                }
                _ => self.spans.push(MacroSpan {
                    mask,
                    buf_mask,
                    ticks: 1,
                    facing_right: facing,
                }),
            }
        }
    }

    /// Union of button bits across a tick's raw writes plus the mask.
    pub fn buttons_seen(&self, index: usize) -> u8 {
        self.buf_writes(index)
            .iter()
            .fold(self.mask_stream[index] & BUTTON_BITS, |acc, w| {
                acc | (w & BUTTON_BITS)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_tick_keeps_streams_parallel() {
        let mut slot = MacroSlot::default();
        slot.push_tick(0x08, true, &[0x08]);
        slot.push_tick(0x08, true, &[0x08]);
        slot.push_tick(0x18, true, &[0x08, 0x18]);

        assert!(slot.invariants_hold());
        assert_eq!(slot.tick_count(), 3);
        assert_eq!(slot.buf_stream.len(), 4);
        assert_eq!(slot.buf_writes(2), &[0x08, 0x18]);
        assert_eq!(slot.buf_offset(2), 2);
    }

    #[test]
    fn identical_ticks_collapse_into_spans() {
        let mut slot = MacroSlot::default();
        for _ in 0..5 {
            slot.push_tick(0x04, true, &[0x04]);
        }
        slot.push_tick(0x04, false, &[0x04]); // facing change breaks the run

        assert_eq!(slot.spans.len(), 2);
        assert_eq!(slot.spans[0].ticks, 5);
        assert_eq!(slot.spans[1].ticks, 1);
        assert!(slot.invariants_hold());
    }

    #[test]
    fn rebuild_spans_matches_incremental() {
        let mut slot = MacroSlot::default();
        for (mask, writes) in [(0x08u8, vec![0x08u8]), (0x08, vec![0x08]), (0x10, vec![0x10, 0x10])] {
            slot.push_tick(mask, true, &writes);
        }
        let incremental = slot.spans.clone();
        slot.rebuild_spans();
        assert_eq!(slot.spans, incremental);
    }

    #[test]
    fn clear_empties_everything() {
        let mut slot = MacroSlot::default();
        slot.push_tick(0x01, true, &[0x01]);
        slot.clear();
        assert!(slot.is_empty());
        assert!(slot.invariants_hold());
        assert_eq!(slot.stats(), SlotStats::default());
    }
}
