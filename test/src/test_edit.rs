use voxnet_shared::{BitReader, BitWrite, Serde, SerdeErr};

/// Edit record used by the tests
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoxelEdit {
    Paint { colors: Vec<u32> },
    Erase,
}

impl VoxelEdit {
    pub fn paint(color: u32) -> Self {
        VoxelEdit::Paint {
            colors: vec![color],
        }
    }
}

impl Serde for VoxelEdit {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            VoxelEdit::Paint { colors } => {
                true.ser(writer);
                colors.ser(writer);
            }
            VoxelEdit::Erase => false.ser(writer),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if bool::de(reader)? {
            Ok(VoxelEdit::Paint {
                colors: Vec::<u32>::de(reader)?,
            })
        } else {
            Ok(VoxelEdit::Erase)
        }
    }

    fn bit_length(&self) -> u32 {
        match self {
            VoxelEdit::Paint { colors } => 1 + colors.bit_length(),
            VoxelEdit::Erase => 1,
        }
    }
}
