use crate::error::Result;

/// Bounds-checked access to the target game's address space.
///
/// This trait is the seam between the trainer core and the platform: the
/// real implementation reads the live process, the mock reads a test
/// buffer. Every fallible call maps to "unavailable this tick" for the
/// caller — nothing in the core treats a failed read as fatal.
///
/// Addresses are 32-bit because the target binary is.
pub trait GameMemory: Send + Sync {
    /// Read exactly `buf.len()` bytes at `address`. All-or-nothing.
    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Write all of `bytes` at `address`. All-or-nothing.
    fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()>;

    /// Base address of the game's main module.
    fn base_address(&self) -> u32;

    fn read_u8(&self, address: u32) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_bytes(address, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&self, address: u32) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(address, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&self, address: u32) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_i32(&self, address: u32) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_f32(&self, address: u32) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn write_u8(&self, address: u32, value: u8) -> Result<()> {
        self.write_bytes(address, &[value])
    }

    fn write_u16(&self, address: u32, value: u16) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    fn write_u32(&self, address: u32, value: u32) -> Result<()> {
        self.write_bytes(address, &value.to_le_bytes())
    }

    /// Follow a two-hop pointer chain: `[[slot] + first] + second`.
    ///
    /// A read failure or a null pointer at either hop resolves to `None`.
    fn resolve_pointer(&self, slot: u32, first: u32, second: u32) -> Option<u32> {
        let p1 = self.read_u32(slot).ok()?;
        if p1 == 0 {
            return None;
        }
        let p2 = self.read_u32(p1.wrapping_add(first)).ok()?;
        if p2 == 0 {
            return None;
        }
        Some(p2.wrapping_add(second))
    }

    /// Dereference a single pointer slot, treating null as unresolved.
    fn resolve_base(&self, slot: u32) -> Option<u32> {
        match self.read_u32(slot) {
            Ok(0) | Err(_) => None,
            Ok(addr) => Some(addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    #[test]
    fn typed_reads_are_little_endian() {
        let mem = MockMemoryBuilder::new()
            .write_bytes(0, &[0x78, 0x56, 0x34, 0x12])
            .build();
        assert_eq!(mem.read_u32(0x1000).unwrap(), 0x1234_5678);
        assert_eq!(mem.read_u16(0x1000).unwrap(), 0x5678);
        assert_eq!(mem.read_u8(0x1000).unwrap(), 0x78);
    }

    #[test]
    fn resolve_pointer_follows_two_hops() {
        // slot at 0x1000 -> 0x1100; [0x1100 + 4] -> 0x1200; result 0x1200 + 8
        let mem = MockMemoryBuilder::new()
            .with_size(0x300)
            .write_u32(0x000, 0x1100)
            .write_u32(0x104, 0x1200)
            .build();
        assert_eq!(mem.resolve_pointer(0x1000, 4, 8), Some(0x1208));
    }

    #[test]
    fn resolve_pointer_treats_null_as_unresolved() {
        let mem = MockMemoryBuilder::new().with_size(0x100).build();
        assert_eq!(mem.resolve_pointer(0x1000, 4, 8), None);
        assert_eq!(mem.resolve_base(0x1000), None);
    }

    #[test]
    fn resolve_pointer_fails_closed_on_bad_reads() {
        let mem = MockMemoryBuilder::new()
            .with_size(8)
            .write_u32(0, 0xDEAD_0000)
            .build();
        // First hop points outside the mock buffer.
        assert_eq!(mem.resolve_pointer(0x1000, 4, 8), None);
    }
}
