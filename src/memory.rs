use crate::error::Chip8Error;
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const MEMORY_SIZE: usize = 4096;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// the biggest program that fits between PROGRAM_ADDR and the top of RAM
pub const PROGRAM_CAPACITY: usize = MEMORY_SIZE - PROGRAM_ADDR as usize;

/// where the hex digit glyphs live; Fx29 relies on this being zero
pub const FONT_ADDR: u16 = 0x000;

/// bytes per glyph
pub const FONT_GLYPH_BYTES: u16 = 5;

/// Represents memory map; instructions and data share the one address space
pub trait MemoryMap {
    /// total addressable bytes
    fn size(&self) -> usize;

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];

    /// write a chunk of bytes into "RAM"; refuses anything that would run off
    /// the end rather than writing part of it
    fn write(&mut self, data: &[u8], addr: u16) -> Result<(), Chip8Error> {
        if addr as usize + data.len() > self.size() {
            return Err(Chip8Error::MemoryRange {
                addr,
                len: data.len(),
            });
        }
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
        Ok(())
    }

    /// single byte; the address wraps at the top of RAM
    fn get_byte(&self, addr: u16) -> u8 {
        let a = addr as usize % self.size();
        self.get_ro_slice(a as u16, 1)[0]
    }

    /// single byte; the address wraps at the top of RAM
    fn set_byte(&mut self, addr: u16, value: u8) {
        let a = addr as usize % self.size();
        self.get_rw_slice(a as u16, 1)[0] = value;
    }

    /// get a big-endian two-byte word (opcode fetch)
    fn get_word(&self, addr: u16) -> u16 {
        let word = self.get_ro_slice(addr, 2);
        u16::from_be_bytes([word[0], word[1]])
    }
}

/// the 4K CHIP-8 address space:
///   0x0000-0x004f  hex digit glyphs
///   0x0050-0x01ff  reserved for the interpreter, left zeroed
///   0x0200-0x0fff  program and data
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Chip8MemoryMap {
    bytes: [u8; MEMORY_SIZE],
}

impl MemoryMap for Chip8MemoryMap {
    fn size(&self) -> usize {
        MEMORY_SIZE
    }
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Chip8MemoryMap {
    /// zeroed RAM with the glyph table baked in
    pub fn new() -> Self {
        let mut bytes = [0u8; MEMORY_SIZE];
        let font = FONT_ADDR as usize;
        bytes[font..font + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Chip8MemoryMap { bytes }
    }

    /// rebuild from a full memory image (state restore)
    pub fn from_bytes(bytes: [u8; MEMORY_SIZE]) -> Self {
        Chip8MemoryMap { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; MEMORY_SIZE] {
        &self.bytes
    }

    /// load a CHIP-8 program at 0x200, returning its length. oversized
    /// programs are rejected before anything is written
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let mut buf = Vec::with_capacity(PROGRAM_CAPACITY);
        reader.read_to_end(&mut buf)?;
        if buf.len() > PROGRAM_CAPACITY {
            return Err(Chip8Error::ProgramTooLarge {
                size: buf.len(),
                capacity: PROGRAM_CAPACITY,
            });
        }
        self.write(&buf, PROGRAM_ADDR)?;
        Ok(buf.len())
    }
}

pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_zeroed() {
        let m = Chip8MemoryMap::new();
        // NB. memory is zeroed from 0x50 because before that we bake in the font
        assert_eq!(m.bytes[..80], CHIP8_FONT);
        assert!(m.bytes[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_write_slice_ok() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new();
        let src: &[u8] = &[0, 1, 2, 3, 4, 5, 6, 7];
        dst.write(src, 0x308)?;
        assert_eq!(
            dst.bytes[0x300..0x310],
            [0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7]
        );
        Ok(())
    }

    #[test]
    fn test_write_too_much_refused() {
        let mut dst = Chip8MemoryMap::new();
        let src: &[u8] = &[0xaa; 8];
        let r = dst.write(src, 4089);
        assert!(matches!(r, Err(Chip8Error::MemoryRange { addr: 4089, len: 8 })));
        // nothing written
        assert_eq!(dst.bytes[4089..], [0; 7]);
    }

    #[test]
    fn test_read_ro() {
        let m = Chip8MemoryMap::new();
        assert_eq!(m.get_ro_slice(0, 5), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
    }

    #[test]
    fn test_read_word() -> Result<(), Chip8Error> {
        let mut m = Chip8MemoryMap::new();
        m.write(&[0, 1, 2, 3, 4, 5, 6, 7], 0x200)?;
        assert_eq!(m.get_word(0x204), 0x0405);
        Ok(())
    }

    #[test]
    fn test_byte_access_wraps() {
        let mut m = Chip8MemoryMap::new();
        m.set_byte(0x1000, 0x42);
        assert_eq!(m.bytes[0], 0x42);
        assert_eq!(m.get_byte(0x1000), 0x42);
        m.set_byte(0x0fff, 0x24);
        assert_eq!(m.get_byte(0xffff), 0x24);
    }

    #[test]
    fn test_program_load_ok() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(dst.load_program(&mut prog)?, 2);
        assert_eq!(dst.get_ro_slice(0x200, 2), &[0x00, 0xe0]);
        Ok(())
    }

    #[test]
    fn test_program_exactly_fills_memory() -> Result<(), Chip8Error> {
        let mut dst = Chip8MemoryMap::new();
        let prog = vec![0x12; PROGRAM_CAPACITY];
        assert_eq!(dst.load_program(&mut prog.as_slice())?, PROGRAM_CAPACITY);
        assert_eq!(dst.bytes[MEMORY_SIZE - 1], 0x12);
        Ok(())
    }

    #[test]
    fn test_program_too_large() {
        let mut dst = Chip8MemoryMap::new();
        let prog = vec![0x12; PROGRAM_CAPACITY + 1];
        let r = dst.load_program(&mut prog.as_slice());
        assert!(matches!(
            r,
            Err(Chip8Error::ProgramTooLarge {
                size: 3585,
                capacity: 3584
            })
        ));
        assert_eq!(dst.bytes[0x200], 0);
    }
}
