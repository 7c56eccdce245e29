use crate::{
    bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr, serde::Serde, ConstBitLength,
};

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<true, BITS>;

/// An unsigned integer written with `BITS` bits. The variable form writes
/// `BITS`-wide groups, each preceded by a "more follows" bit, so small values
/// stay small on the wire.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const VARIABLE: bool, const BITS: u8> {
    value: u64,
}

impl<const VARIABLE: bool, const BITS: u8> SerdeInteger<VARIABLE, BITS> {
    /// Fixed-width values that do not fit are clamped to the largest
    /// representable value; use `try_new` to detect that instead.
    pub fn new(value: u64) -> Self {
        match Self::try_new(value) {
            Some(integer) => integer,
            None => Self {
                value: Self::max_fixed_value(),
            },
        }
    }

    pub fn try_new(value: u64) -> Option<Self> {
        if BITS == 0 || BITS > 64 {
            return None;
        }
        if !VARIABLE && value > Self::max_fixed_value() {
            return None;
        }
        Some(Self { value })
    }

    pub fn get(&self) -> u64 {
        self.value
    }

    fn max_fixed_value() -> u64 {
        if BITS >= 64 {
            u64::MAX
        } else {
            (1u64 << BITS) - 1
        }
    }
}

impl<const VARIABLE: bool, const BITS: u8> Serde for SerdeInteger<VARIABLE, BITS> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        let mut value = self.value;

        if VARIABLE {
            loop {
                let proceed = BITS < 64 && value >> BITS != 0;
                writer.write_bit(proceed);
                for _ in 0..BITS {
                    writer.write_bit(value & 1 != 0);
                    value >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        } else {
            for _ in 0..BITS {
                writer.write_bit(value & 1 != 0);
                value >>= 1;
            }
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let mut output: u64 = 0;
        let mut shift: u32 = 0;

        loop {
            let proceed = if VARIABLE { reader.read_bit()? } else { false };

            for _ in 0..BITS {
                let bit = reader.read_bit()?;
                if bit {
                    if shift >= 64 {
                        return Err(SerdeErr);
                    }
                    output |= 1 << shift;
                }
                shift += 1;
            }

            if !proceed {
                return Ok(Self { value: output });
            }
            if shift >= 64 {
                return Err(SerdeErr);
            }
        }
    }

    fn bit_length(&self) -> u32 {
        if !VARIABLE {
            return BITS as u32;
        }
        let mut output: u32 = 0;
        let mut value = self.value;
        loop {
            output += 1 + BITS as u32;
            if BITS >= 64 {
                return output;
            }
            value >>= BITS;
            if value == 0 {
                return output;
            }
        }
    }
}

impl<const BITS: u8> ConstBitLength for SerdeInteger<false, BITS> {
    fn const_bit_length() -> u32 {
        BITS as u32
    }
}
