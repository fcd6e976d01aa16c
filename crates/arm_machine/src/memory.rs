use alloc::vec;
use alloc::vec::Vec;

use crate::{MAX_STACK_SLOTS, MachineError};

/// Width of one stack slot.
pub const SLOT_SIZE_BYTES: usize = 8;

const SLOT_SIZE: i128 = SLOT_SIZE_BYTES as i128;
const BYTE_MASK: u64 = 0xFF;

/// Where a byte address lands inside the stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ByteLocation {
    pub slot: usize,
    /// Byte inside the slot, counted from the low order byte.
    pub byte: usize,
}

impl ByteLocation {
    fn shift(self) -> u32 {
        // byte < SLOT_SIZE_BYTES so this is at most 56
        (self.byte as u32).saturating_mul(8)
    }
}

/// Fixed number of 8 byte slots. Slot 0 is the lowest address and the
/// stack grows down towards it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryStack {
    slots: Vec<u64>,
}

impl MemoryStack {
    pub fn new(slot_count: usize) -> Result<Self, MachineError> {
        if slot_count == 0 || slot_count > MAX_STACK_SLOTS {
            return Err(MachineError::InvalidStackSize(slot_count));
        }
        Ok(Self {
            slots: vec![0; slot_count],
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[u64] {
        &self.slots
    }

    /// Byte address of the highest slot, where `sp` and `fp` start.
    pub fn top_address(&self) -> u64 {
        let top_slot = self.len().saturating_sub(1);
        (top_slot as u64).saturating_mul(SLOT_SIZE_BYTES as u64)
    }

    /// Stores `value` truncated to `size` bytes, replacing the whole slot.
    pub fn write(&mut self, slot: usize, value: u64, size: usize) -> Result<(), MachineError> {
        let mask = size_mask(size)?;
        let target = self
            .slots
            .get_mut(slot)
            .ok_or(MachineError::OutOfBounds(slot_address(slot)))?;
        *target = value & mask;
        Ok(())
    }

    /// Reads the low `size` bytes of a slot.
    pub fn read(&self, slot: usize, size: usize) -> Result<u64, MachineError> {
        let mask = size_mask(size)?;
        let value = self
            .slots
            .get(slot)
            .ok_or(MachineError::OutOfBounds(slot_address(slot)))?;
        Ok(value & mask)
    }

    /// Resolves a byte address. Negative addresses and anything at or past
    /// the end of the last slot are out of bounds, never wrapped.
    pub fn locate(&self, address: i128) -> Result<ByteLocation, MachineError> {
        let out_of_bounds = MachineError::OutOfBounds(address);
        if address < 0 {
            return Err(out_of_bounds);
        }
        let slot = address.checked_div(SLOT_SIZE).ok_or(out_of_bounds.clone())?;
        let byte = address.checked_rem(SLOT_SIZE).ok_or(out_of_bounds.clone())?;
        let slot = usize::try_from(slot).map_err(|_| out_of_bounds.clone())?;
        let byte = usize::try_from(byte).map_err(|_| out_of_bounds.clone())?;
        if slot >= self.len() {
            return Err(out_of_bounds);
        }
        Ok(ByteLocation { slot, byte })
    }

    pub fn read_byte(&self, location: ByteLocation) -> Result<u8, MachineError> {
        let value = self.read(location.slot, SLOT_SIZE_BYTES)?;
        let byte = value.checked_shr(location.shift()).unwrap_or(0) & BYTE_MASK;
        Ok(byte as u8)
    }

    /// Replaces one byte of a slot and leaves the other seven alone.
    pub fn write_byte(&mut self, location: ByteLocation, byte: u8) -> Result<(), MachineError> {
        let current = self.read(location.slot, SLOT_SIZE_BYTES)?;
        let shift = location.shift();
        let cleared = current & !BYTE_MASK.checked_shl(shift).unwrap_or(0);
        let merged = cleared | u64::from(byte).checked_shl(shift).unwrap_or(0);
        self.write(location.slot, merged, SLOT_SIZE_BYTES)
    }
}

fn size_mask(size: usize) -> Result<u64, MachineError> {
    if size == 0 || size > SLOT_SIZE_BYTES {
        return Err(MachineError::SizeExceeded(size));
    }
    let bits = (size as u32).saturating_mul(8);
    Ok(1u64.checked_shl(bits).map_or(u64::MAX, |bit| bit.wrapping_sub(1)))
}

fn slot_address(slot: usize) -> i128 {
    (slot as i128).saturating_mul(SLOT_SIZE)
}

#[cfg(test)]
mod test;
