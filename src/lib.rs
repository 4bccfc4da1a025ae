//! # chip8vm
//!
//! a CHIP-8 virtual machine that runs in a terminal.
//!
//! ## Design
//!
//! * the machine state (memory, registers, stack, timers) is plain data, so
//!   it can be cloned, compared and written out as a save state
//! * display, input and sound sit behind traits, so the interpreter doesn't
//!   need to know what kind of screen/keyboard/speaker it's driving; there's
//!   a terminal implementation of each plus in-memory ones for tests
//! * CHIP-8 instructions run as fast as possible, then sleep to match the
//!   configured clock rate; timers and repaints run off their own 60Hz
//!   clocks
//! * Fx0A blocks everything until a key goes down (configurable)
//!
//! Model
//!
//! main
//!  |-- config (chip8.toml or $CHIP8_CONFIG)
//!  |-- display, input, sound
//!  |-- interpreter(display, input, sound, config)
//!  |    |-- machine: memory, V0-VF, I, PC, SP, stack, DT, ST
//!  |    |-- instruction decode
//!  |    `-- random byte source (seedable)
//!  `-- main loop
//!       |-- step: fetch, execute, drain host signals
//!       |-- tick timers for every 60th of a second gone by
//!       |-- repaint when a frame is due (or at the boundary after a draw)
//!       `-- sleep until the next instruction slot

pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod machine;
pub mod memory;
pub mod random;
pub mod snapshot;
pub mod sound;
pub mod timing;

pub use error::Chip8Error;
