use crate::error::SerdeErr;

pub struct BitReader<'b> {
    buffer: &'b [u8],
    bit_index: usize,
}

impl<'b> BitReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self {
            buffer,
            bit_index: 0,
        }
    }

    pub fn bits_remaining(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.bit_index)
    }

    /// Whole bytes not yet touched by the reader.
    pub fn remaining_bytes(&self) -> &'b [u8] {
        let start = self.bit_index.div_ceil(8);
        self.buffer.get(start..).unwrap_or(&[])
    }

    pub fn read_bit(&mut self) -> Result<bool, SerdeErr> {
        let byte = *self.buffer.get(self.bit_index / 8).ok_or(SerdeErr)?;
        let bit = (byte >> (self.bit_index % 8)) & 1 != 0;
        self.bit_index += 1;
        Ok(bit)
    }

    pub fn read_byte(&mut self) -> Result<u8, SerdeErr> {
        let mut output = 0u8;
        for index in 0..8 {
            if self.read_bit()? {
                output |= 1 << index;
            }
        }
        Ok(output)
    }
}
