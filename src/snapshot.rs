//! flat, fixed-size save state. all multi-byte values are big-endian:
//!
//! | offset | size | contents            |
//! |-------:|-----:|---------------------|
//! |      0 |    2 | PC                  |
//! |      2 |    1 | SP                  |
//! |      3 |    2 | I                   |
//! |      5 |    1 | ST                  |
//! |      6 |    1 | DT                  |
//! |      7 |   16 | V0-VF               |
//! |     23 |   32 | stack, 16 x u16     |
//! |     55 | 4096 | memory              |
//! |   4151 | 8192 | pixel map, 2048 x u32 |

use crate::display::{PixelMap, DISPLAY_CELLS};
use crate::error::Chip8Error;
use crate::machine::{Machine, REGISTER_COUNT, STACK_DEPTH};
use crate::memory::{Chip8MemoryMap, MEMORY_SIZE};

pub const PC_OFFSET: usize = 0;
pub const SP_OFFSET: usize = 2;
pub const I_OFFSET: usize = 3;
pub const ST_OFFSET: usize = 5;
pub const DT_OFFSET: usize = 6;
pub const V_OFFSET: usize = 7;
pub const STACK_OFFSET: usize = V_OFFSET + REGISTER_COUNT;
pub const MEMORY_OFFSET: usize = STACK_OFFSET + 2 * STACK_DEPTH;
pub const PIXEL_OFFSET: usize = MEMORY_OFFSET + MEMORY_SIZE;

/// 12343 bytes
pub const STATE_SIZE: usize = PIXEL_OFFSET + 4 * DISPLAY_CELLS;

/// flatten machine + screen into the save layout
pub fn encode(machine: &Machine, pixels: &PixelMap) -> Vec<u8> {
    let mut out = vec![0u8; STATE_SIZE];
    out[PC_OFFSET..PC_OFFSET + 2].copy_from_slice(&machine.pc.to_be_bytes());
    out[SP_OFFSET] = machine.sp;
    out[I_OFFSET..I_OFFSET + 2].copy_from_slice(&machine.i.to_be_bytes());
    out[ST_OFFSET] = machine.sound_timer;
    out[DT_OFFSET] = machine.delay_timer;
    out[V_OFFSET..STACK_OFFSET].copy_from_slice(&machine.v);
    for (chunk, addr) in out[STACK_OFFSET..MEMORY_OFFSET]
        .chunks_exact_mut(2)
        .zip(machine.stack.iter())
    {
        chunk.copy_from_slice(&addr.to_be_bytes());
    }
    out[MEMORY_OFFSET..PIXEL_OFFSET].copy_from_slice(machine.memory.as_bytes());
    for (chunk, colour) in out[PIXEL_OFFSET..].chunks_exact_mut(4).zip(pixels.iter()) {
        chunk.copy_from_slice(&colour.to_be_bytes());
    }
    out
}

/// inverse of encode. the length is checked before anything is built
pub fn decode(bytes: &[u8]) -> Result<(Machine, PixelMap), Chip8Error> {
    if bytes.len() != STATE_SIZE {
        return Err(Chip8Error::StateSize {
            expected: STATE_SIZE,
            found: bytes.len(),
        });
    }

    let word = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);

    let mut v = [0u8; REGISTER_COUNT];
    v.copy_from_slice(&bytes[V_OFFSET..STACK_OFFSET]);

    let mut stack = [0u16; STACK_DEPTH];
    for (n, slot) in stack.iter_mut().enumerate() {
        *slot = word(STACK_OFFSET + 2 * n);
    }

    let mut memory = [0u8; MEMORY_SIZE];
    memory.copy_from_slice(&bytes[MEMORY_OFFSET..PIXEL_OFFSET]);

    let mut pixels = [0u32; DISPLAY_CELLS];
    for (colour, chunk) in pixels.iter_mut().zip(bytes[PIXEL_OFFSET..].chunks_exact(4)) {
        *colour = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    let machine = Machine {
        pc: word(PC_OFFSET),
        sp: bytes[SP_OFFSET],
        stack,
        memory: Chip8MemoryMap::from_bytes(memory),
        v,
        i: word(I_OFFSET),
        delay_timer: bytes[DT_OFFSET],
        sound_timer: bytes[ST_OFFSET],
    };
    Ok((machine, pixels))
}
