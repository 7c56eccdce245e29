use crate::constants::MTU_SIZE_BYTES;

pub trait BitWrite {
    fn write_bit(&mut self, bit: bool);
    fn write_byte(&mut self, byte: u8);
    fn count_bits(&mut self, bits: u32);
    fn is_counter(&self) -> bool;
}

/// Writes bits LSB-first into bytes. The writer has a soft capacity: it will
/// keep accepting bits past `max_bits`, but reports the overflow so packet
/// builders can refuse to ship the result.
pub struct BitWriter {
    scratch: u8,
    scratch_index: u8,
    buffer: Vec<u8>,
    current_bits: u32,
    max_bits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::with_max_bytes(MTU_SIZE_BYTES)
    }

    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            scratch: 0,
            scratch_index: 0,
            buffer: Vec::with_capacity(max_bytes),
            current_bits: 0,
            max_bits: (max_bytes as u32).saturating_mul(8),
        }
    }

    pub fn bits_written(&self) -> u32 {
        self.current_bits
    }

    pub fn bytes_written(&self) -> usize {
        self.current_bits.div_ceil(8) as usize
    }

    pub fn bits_free(&self) -> u32 {
        self.max_bits.saturating_sub(self.current_bits)
    }

    /// Holds back `bits` of capacity, e.g. for a terminator written last.
    pub fn reserve_bits(&mut self, bits: u32) {
        self.max_bits = self.max_bits.saturating_sub(bits);
    }

    pub fn release_bits(&mut self, bits: u32) {
        self.max_bits = self.max_bits.saturating_add(bits);
    }

    pub fn is_overflowed(&self) -> bool {
        self.current_bits > self.max_bits
    }

    pub fn to_bytes(mut self) -> Vec<u8> {
        if self.scratch_index > 0 {
            self.buffer.push(self.scratch);
            self.scratch = 0;
            self.scratch_index = 0;
        }
        self.buffer
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitWriter {
    fn write_bit(&mut self, bit: bool) {
        if bit {
            self.scratch |= 1 << self.scratch_index;
        }
        self.scratch_index += 1;
        self.current_bits += 1;

        if self.scratch_index >= 8 {
            self.buffer.push(self.scratch);
            self.scratch = 0;
            self.scratch_index = 0;
        }
    }

    fn write_byte(&mut self, byte: u8) {
        let mut temp = byte;
        for _ in 0..8 {
            self.write_bit(temp & 1 != 0);
            temp >>= 1;
        }
    }

    fn count_bits(&mut self, _bits: u32) {}

    fn is_counter(&self) -> bool {
        false
    }
}

/// Measures how many bits a sequence of writes would take, without storing
/// anything.
pub struct BitCounter {
    bits: u32,
}

impl BitCounter {
    pub fn new() -> Self {
        Self { bits: 0 }
    }

    pub fn bits_needed(&self) -> u32 {
        self.bits
    }
}

impl Default for BitCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitCounter {
    fn write_bit(&mut self, _bit: bool) {
        self.bits += 1;
    }

    fn write_byte(&mut self, _byte: u8) {
        self.bits += 8;
    }

    fn count_bits(&mut self, bits: u32) {
        self.bits += bits;
    }

    fn is_counter(&self) -> bool {
        true
    }
}
