// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Packed lock state word.
// - Bits 0..27 count granted reader slots.
// - Bit 31 marks the exclusive writer.
// - Bit 30 is set while at least one writer is parked.
// - Bit 29 is set while the upgrade owner is parked waiting to write.

const READER_MASK: u32 = (1 << 28) - 1; // 0x0FFF_FFFF
const WRITER_HELD: u32 = 1 << 31;
const WRITERS_WAITING: u32 = 1 << 30;
const UPGRADER_WAITING: u32 = 1 << 29;

/// Highest reader count the word may carry.
pub(crate) const MAX_READERS: u32 = READER_MASK - 1;

/// Decoded view of the lock state word.
///
/// Never mutated in place on the shared word: callers decode a snapshot,
/// derive a new value and publish it with a compare-and-swap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LockState {
    pub reader_count: u32,
    pub writer_held: bool,
    pub writers_waiting: bool,
    pub upgrader_waiting: bool,
}

impl LockState {
    pub(crate) const fn decode(word: u32) -> Self {
        Self {
            reader_count: word & READER_MASK,
            writer_held: word & WRITER_HELD != 0,
            writers_waiting: word & WRITERS_WAITING != 0,
            upgrader_waiting: word & UPGRADER_WAITING != 0,
        }
    }

    pub(crate) fn encode(self) -> u32 {
        debug_assert!(self.reader_count <= READER_MASK);
        debug_assert!(!(self.writer_held && self.reader_count > 0));
        let mut word = self.reader_count & READER_MASK;
        if self.writer_held {
            word |= WRITER_HELD;
        }
        if self.writers_waiting {
            word |= WRITERS_WAITING;
        }
        if self.upgrader_waiting {
            word |= UPGRADER_WAITING;
        }
        word
    }

    /// Room for one more reader slot, ignoring pending writers.
    #[inline]
    pub(crate) fn has_reader_room(self) -> bool {
        !self.writer_held && self.reader_count < MAX_READERS
    }

    /// A newcomer may take a reader slot: nobody writes, nobody is queued to
    /// write, and the count has room.
    #[inline]
    pub(crate) fn admits_reader(self) -> bool {
        self.has_reader_room() && !self.writers_waiting && !self.upgrader_waiting
    }

    /// The writer slot is free once `own_slots` (the caller's reader slots)
    /// are the only readers left.
    #[inline]
    pub(crate) fn admits_writer(self, own_slots: u32, upgrading: bool) -> bool {
        !self.writer_held
            && self.reader_count == own_slots
            && (upgrading || !self.upgrader_waiting)
    }

    #[inline]
    pub(crate) fn is_idle(self) -> bool {
        !self.writer_held && self.reader_count == 0
    }
}
