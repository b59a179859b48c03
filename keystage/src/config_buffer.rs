//! The two physical configuration buffers and which of them is live.
//!
//! Buffers never move or get copied. The registry keeps a single `live` flag, the other slot is
//! the staging target for uploads. Promotion flips the flag.

use crate::buffer::ParserBuffer;
use crate::types::protocol::config::StatusCode;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    A,
    B,
}

impl Slot {
    fn index(self) -> usize {
        match self {
            Slot::A => 0,
            Slot::B => 1,
        }
    }

    fn other(self) -> Self {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }
}

/// Proof that the current staging contents passed a dry run.
///
/// Only the validator hands these out. Any upload or promotion after the dry run makes the token
/// stale.
#[derive(Debug)]
pub struct Validated {
    slot: Slot,
    generation: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PromoteError {
    /// Staging buffer changed since it was validated
    Stale,
}

pub struct UserConfigBuffers<const N: usize> {
    slots: [ParserBuffer<N>; 2],
    live: Slot,
    /// Bumped whenever the staging contents or the slot roles change
    generation: u32,
}

impl<const N: usize> Default for UserConfigBuffers<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> UserConfigBuffers<N> {
    pub const fn new() -> Self {
        // Offsets are reported to the host as u16
        const { assert!(N <= u16::MAX as usize, "config buffer must be addressable by a u16 offset") };
        Self {
            slots: [ParserBuffer::new(), ParserBuffer::new()],
            live: Slot::A,
            generation: 0,
        }
    }

    pub fn live_slot(&self) -> Slot {
        self.live
    }

    pub fn staging_slot(&self) -> Slot {
        self.live.other()
    }

    /// Buffer holding the most recent upload, not trusted yet
    pub fn staging(&self) -> &ParserBuffer<N> {
        &self.slots[self.staging_slot().index()]
    }

    pub(crate) fn staging_mut(&mut self) -> &mut ParserBuffer<N> {
        &mut self.slots[self.staging_slot().index()]
    }

    /// Buffer holding the configuration that is, or is about to be, in effect
    pub fn validated(&self) -> &ParserBuffer<N> {
        &self.slots[self.live.index()]
    }

    pub(crate) fn validated_mut(&mut self) -> &mut ParserBuffer<N> {
        &mut self.slots[self.live.index()]
    }

    /// Write an uploaded chunk into the staging buffer.
    pub fn write_staging(&mut self, offset: usize, data: &[u8]) -> Result<(), StatusCode> {
        self.staging_mut().write_at(offset, data)?;
        self.generation = self.generation.wrapping_add(1);
        Ok(())
    }

    /// Issue a token for the current staging contents, called after a successful dry run.
    pub(crate) fn mark_validated(&self) -> Validated {
        Validated {
            slot: self.staging_slot(),
            generation: self.generation,
        }
    }

    /// Swap the roles of the two buffers: the validated staging buffer becomes live and the
    /// previously live buffer becomes the next upload target.
    pub fn promote(&mut self, validated: Validated) -> Result<(), PromoteError> {
        if validated.slot != self.staging_slot() || validated.generation != self.generation {
            return Err(PromoteError::Stale);
        }
        self.live = validated.slot;
        self.generation = self.generation.wrapping_add(1);
        debug!("Promoted config buffer {:?} to live", self.live);
        Ok(())
    }
}
