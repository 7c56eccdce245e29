use voxnet_serde::{BitWriter, Serde};

use crate::packet::{PacketOverflow, StandardHeader};

/// Writes a header followed by payload items into a size-bounded datagram,
/// refusing any item that would not fit.
pub struct PacketBuilder {
    header: StandardHeader,
    writer: BitWriter,
    header_bits: u32,
    items: usize,
}

impl PacketBuilder {
    pub fn new(header: StandardHeader, max_bytes: usize) -> Self {
        let mut writer = BitWriter::with_max_bytes(max_bytes);
        header.write(&mut writer);
        let header_bits = writer.bits_written();
        Self {
            header,
            writer,
            header_bits,
            items: 0,
        }
    }

    /// Header plus one payload, as a finished datagram
    pub fn single<T: Serde>(
        header: StandardHeader,
        max_bytes: usize,
        payload: &T,
    ) -> Result<Vec<u8>, PacketOverflow> {
        let mut builder = Self::new(header, max_bytes);
        builder.try_write(payload)?;
        Ok(builder.finish())
    }

    pub fn header(&self) -> &StandardHeader {
        &self.header
    }

    pub fn bits_free(&self) -> u32 {
        self.writer.bits_free()
    }

    /// Bits available to payload in a fresh packet with this header.
    pub fn payload_capacity(header: &StandardHeader, max_bytes: usize) -> u32 {
        ((max_bytes as u32).saturating_mul(8)).saturating_sub(header.bit_length())
    }

    pub fn fits<T: Serde>(&self, item: &T) -> bool {
        item.bit_length() <= self.bits_free()
    }

    pub fn try_write<T: Serde>(&mut self, item: &T) -> Result<(), PacketOverflow> {
        let bits_needed = item.bit_length();
        let bits_free = self.bits_free();
        if bits_needed > bits_free {
            return Err(PacketOverflow {
                bits_needed,
                bits_free,
            });
        }
        item.ser(&mut self.writer);
        self.items += 1;
        Ok(())
    }

    pub fn reserve_bits(&mut self, bits: u32) {
        self.writer.reserve_bits(bits);
    }

    pub fn release_bits(&mut self, bits: u32) {
        self.writer.release_bits(bits);
    }

    /// Number of successful `try_write` calls
    pub fn item_count(&self) -> usize {
        self.items
    }

    pub fn has_payload(&self) -> bool {
        self.writer.bits_written() > self.header_bits
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.to_bytes()
    }
}
