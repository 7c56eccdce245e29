use std::fmt;

use thiserror::Error;
use voxnet_serde::{BitReader, BitWrite, Serde, SerdeErr, UnsignedInteger};

pub const MAX_ADDRESS_DEPTH: usize = 255;
/// Deepest level `for_voxel` will resolve to.
pub const MAX_VOXEL_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AddressError {
    #[error("Octal digit {digit} is out of range 0..=7")]
    InvalidDigit { digit: u8 },
    #[error("Address depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: usize },
    #[error("Octal code is truncated or malformed")]
    InvalidOctalCode,
    #[error("Octal code hex string could not be decoded: {0}")]
    InvalidHex(String),
    #[error("Voxel at ({x}, {y}, {z}) with size {size} is not inside the unit volume")]
    InvalidVoxel { x: f32, y: f32, z: f32, size: f32 },
}

/// Path from the root of the octree, one child index (0..=7) per level.
///
/// Ordering is lexicographic over digits, with an ancestor sorting before
/// its descendants.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SpatialAddress {
    digits: Vec<u8>,
}

impl SpatialAddress {
    pub fn root() -> Self {
        Self { digits: Vec::new() }
    }

    pub fn new(digits: &[u8]) -> Result<Self, AddressError> {
        Self::from_digits(digits.to_vec())
    }

    pub fn from_digits(digits: Vec<u8>) -> Result<Self, AddressError> {
        if digits.len() > MAX_ADDRESS_DEPTH {
            return Err(AddressError::TooDeep {
                depth: digits.len(),
                max: MAX_ADDRESS_DEPTH,
            });
        }
        if let Some(digit) = digits.iter().find(|digit| **digit > 7) {
            return Err(AddressError::InvalidDigit { digit: *digit });
        }
        Ok(Self { digits })
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn depth(&self) -> usize {
        self.digits.len()
    }

    pub fn is_root(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn child(&self, digit: u8) -> Result<Self, AddressError> {
        if digit > 7 {
            return Err(AddressError::InvalidDigit { digit });
        }
        if self.digits.len() >= MAX_ADDRESS_DEPTH {
            return Err(AddressError::TooDeep {
                depth: self.digits.len() + 1,
                max: MAX_ADDRESS_DEPTH,
            });
        }
        let mut digits = self.digits.clone();
        digits.push(digit);
        Ok(Self { digits })
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.digits.split_last()?;
        Some(Self {
            digits: rest.to_vec(),
        })
    }

    /// Strict: an address is not its own ancestor.
    pub fn is_ancestor_of(&self, other: &SpatialAddress) -> bool {
        self.digits.len() < other.digits.len() && other.digits.starts_with(&self.digits)
    }

    pub fn is_ancestor_or_equal(&self, other: &SpatialAddress) -> bool {
        other.digits.starts_with(&self.digits)
    }

    /// Child index of `self` on the path toward `descendant`.
    pub fn branch_toward(&self, descendant: &SpatialAddress) -> Option<u8> {
        if !self.is_ancestor_of(descendant) {
            return None;
        }
        descendant.digits.get(self.digits.len()).copied()
    }

    /// Address of the cube of side `size` that encloses `(x, y, z)` in the
    /// unit volume. Sizes are rounded down to the nearest power of one half.
    pub fn for_voxel(x: f32, y: f32, z: f32, size: f32) -> Result<Self, AddressError> {
        let invalid = || AddressError::InvalidVoxel { x, y, z, size };
        let in_unit = |value: f32| (0.0..1.0).contains(&value);
        if !(in_unit(x) && in_unit(y) && in_unit(z)) || !(size > 0.0 && size <= 1.0) {
            return Err(invalid());
        }

        let mut depth = 0;
        let mut side = 1.0f32;
        while side > size && depth < MAX_VOXEL_DEPTH {
            side /= 2.0;
            depth += 1;
        }

        let mut digits = Vec::with_capacity(depth);
        let (mut x, mut y, mut z) = (x, y, z);
        for _ in 0..depth {
            let mut digit = 0;
            x *= 2.0;
            y *= 2.0;
            z *= 2.0;
            if x >= 1.0 {
                digit |= 4;
                x -= 1.0;
            }
            if y >= 1.0 {
                digit |= 2;
                y -= 1.0;
            }
            if z >= 1.0 {
                digit |= 1;
                z -= 1.0;
            }
            digits.push(digit);
        }

        Ok(Self { digits })
    }

    /// Byte form: section count, then 3-bit sections packed high bit first,
    /// with unused trailing bits set.
    pub fn to_octal_code(&self) -> Vec<u8> {
        let section_bytes = (self.digits.len() * 3).div_ceil(8);
        let mut output = vec![0xff; 1 + section_bytes];
        output[0] = self.digits.len() as u8;

        for (index, digit) in self.digits.iter().enumerate() {
            for bit in 0..3 {
                let bit_index = index * 3 + bit;
                let byte = &mut output[1 + bit_index / 8];
                let mask = 0x80 >> (bit_index % 8);
                if (digit >> (2 - bit)) & 1 == 0 {
                    *byte &= !mask;
                }
            }
        }

        output
    }

    pub fn from_octal_code(code: &[u8]) -> Result<Self, AddressError> {
        let (count, sections) = code.split_first().ok_or(AddressError::InvalidOctalCode)?;
        let count = *count as usize;
        if sections.len() < (count * 3).div_ceil(8) {
            return Err(AddressError::InvalidOctalCode);
        }

        let mut digits = Vec::with_capacity(count);
        for index in 0..count {
            let mut digit = 0u8;
            for bit in 0..3 {
                let bit_index = index * 3 + bit;
                let byte = sections[bit_index / 8];
                let value = (byte >> (7 - bit_index % 8)) & 1;
                digit = (digit << 1) | value;
            }
            digits.push(digit);
        }

        Ok(Self { digits })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_octal_code())
    }

    pub fn from_hex(text: &str) -> Result<Self, AddressError> {
        let bytes =
            hex::decode(text.trim()).map_err(|err| AddressError::InvalidHex(err.to_string()))?;
        Self::from_octal_code(&bytes)
    }
}

impl fmt::Display for SpatialAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits.is_empty() {
            return write!(f, "/");
        }
        for digit in &self.digits {
            write!(f, "/{}", digit)?;
        }
        Ok(())
    }
}

impl Serde for SpatialAddress {
    fn ser(&self, writer: &mut dyn BitWrite) {
        (self.digits.len() as u8).ser(writer);
        for digit in &self.digits {
            UnsignedInteger::<3>::new(u64::from(*digit)).ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let depth = u8::de(reader)? as usize;
        let mut digits = Vec::with_capacity(depth);
        for _ in 0..depth {
            digits.push(UnsignedInteger::<3>::de(reader)?.get() as u8);
        }
        Ok(Self { digits })
    }

    fn bit_length(&self) -> u32 {
        8 + 3 * self.digits.len() as u32
    }
}
