/// Largest datagram voxnet will build by default. Stays under common path
/// MTUs once IP/UDP headers are added.
pub const MTU_SIZE_BYTES: usize = 1400;
pub const MTU_SIZE_BITS: u32 = (MTU_SIZE_BYTES * 8) as u32;
