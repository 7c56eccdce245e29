use crate::{bit_reader::BitReader, bit_writer::BitWrite, error::SerdeErr};

/// A type that can be written to and read from a bit stream.
pub trait Serde: Sized {
    fn ser(&self, writer: &mut dyn BitWrite);

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Exact number of bits `ser` will write.
    fn bit_length(&self) -> u32;
}

/// Types whose encoding always has the same width.
pub trait ConstBitLength {
    fn const_bit_length() -> u32;
}
