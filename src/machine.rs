use crate::memory::{Chip8MemoryMap, PROGRAM_ADDR};

/// number of general registers, V0-VF
pub const REGISTER_COUNT: usize = 16;

/// call stack depth
pub const STACK_DEPTH: usize = 16;

/// SP value meaning "nothing pushed yet"; the first CALL wraps it to 0
pub const SP_IDLE: u8 = 0xff;

/// VF doubles as the carry/borrow/collision flag
pub const VF: usize = 0xf;

/// the whole architectural state of the machine. plain fixed-size arrays so
/// a snapshot is just a copy
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Machine {
    pub pc: u16,
    /// NB. never bounds-checked; only the low nibble indexes the stack
    pub sp: u8,
    pub stack: [u16; STACK_DEPTH],
    pub memory: Chip8MemoryMap,
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub delay_timer: u8,
    pub sound_timer: u8,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    /// power-on state: zeroed registers, glyphs loaded, PC at the program
    pub fn new() -> Self {
        Machine {
            pc: PROGRAM_ADDR,
            sp: SP_IDLE,
            stack: [0; STACK_DEPTH],
            memory: Chip8MemoryMap::new(),
            v: [0; REGISTER_COUNT],
            i: 0,
            delay_timer: 0,
            sound_timer: 0,
        }
    }

    /// CALL half of the stack discipline: increment, then store
    pub fn push(&mut self, addr: u16) {
        self.sp = self.sp.wrapping_add(1);
        self.stack[self.stack_slot()] = addr;
    }

    /// RET half: read, then decrement
    pub fn pop(&mut self) -> u16 {
        let addr = self.stack[self.stack_slot()];
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    fn stack_slot(&self) -> usize {
        self.sp as usize % STACK_DEPTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_state() {
        let m = Machine::new();
        assert_eq!(m.pc, 0x200);
        assert_eq!(m.sp, 0xff);
        assert_eq!(m.stack, [0; 16]);
        assert_eq!(m.v, [0; 16]);
        assert_eq!(m.i, 0);
        assert_eq!(m.delay_timer, 0);
        assert_eq!(m.sound_timer, 0);
    }

    #[test]
    fn test_push_pop() {
        let mut m = Machine::new();
        m.push(0x202);
        assert_eq!(m.sp, 0);
        assert_eq!(m.stack[0], 0x202);
        m.push(0x304);
        assert_eq!(m.sp, 1);
        assert_eq!(m.pop(), 0x304);
        assert_eq!(m.pop(), 0x202);
        assert_eq!(m.sp, 0xff);
    }

    #[test]
    fn test_pop_when_empty_wraps() {
        let mut m = Machine::new();
        m.stack[15] = 0x0abc;
        // sp 0xff reads slot 15 and carries on down
        assert_eq!(m.pop(), 0x0abc);
        assert_eq!(m.sp, 0xfe);
    }

    #[test]
    fn test_seventeenth_push_overwrites_bottom() {
        let mut m = Machine::new();
        for n in 0..17u16 {
            m.push(0x200 + 2 * n);
        }
        assert_eq!(m.sp, 16);
        assert_eq!(m.stack[0], 0x220);
    }
}
