//! # interpreter
//!
//! fetch/decode/execute for the 35 CHIP-8 instructions, plus the loop that
//! keeps three clocks in step:
//!  * the CPU, at `Config::cycles_per_second`
//!  * the delay and sound timers, at 60Hz
//!  * the display, repainted at 60Hz (or at the next frame boundary after a
//!    draw, whichever comes first)
//!
//! quirks:
//!  * SP is never bounds-checked; it wraps, and only its low nibble picks a
//!    stack slot
//!  * unknown opcodes do nothing (beyond the PC moving on)
//!  * Fx0A stops the world, timers included, until a key goes down
//!  * sprites are clipped at the screen edge, not wrapped
//!  * 8xy_ write VF before the result, so with x == F the result wins
use crate::config::Config;
use crate::display::{Display, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::error::Chip8Error;
use crate::input::{Input, Signal};
use crate::instruction::Instruction;
use crate::machine::{Machine, VF};
use crate::memory::{MemoryMap, FONT_ADDR, FONT_GLYPH_BYTES, MEMORY_SIZE, PROGRAM_CAPACITY};
use crate::random::ByteSource;
use crate::snapshot;
use crate::sound::Sound;
use crate::timing::{Cadence, REFRESH_HZ, TIMER_HZ};
use log::{debug, info, trace, warn};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::Instant;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunState {
    Running,
    BlockedOnInput,
    Halted,
}

struct Clocks {
    cpu: Cadence,
    timers: Cadence,
    frames: Cadence,
}

impl Clocks {
    fn new(cycles_per_second: u32, now: Instant) -> Self {
        Clocks {
            cpu: Cadence::new(cycles_per_second, now),
            timers: Cadence::new(TIMER_HZ, now),
            frames: Cadence::new(REFRESH_HZ, now),
        }
    }

    /// forget about time spent blocked
    fn resync(&mut self, now: Instant) {
        self.cpu.reset(now);
        self.timers.reset(now);
        self.frames.reset(now);
    }
}

pub struct Chip8Interpreter<'a> {
    machine: Machine,
    display: &'a mut dyn Display,
    input: &'a mut dyn Input,
    sound: &'a mut dyn Sound,
    random: ByteSource,
    config: Config,
    clocks: Clocks,
    state: RunState,
    quit: bool,
    draw: bool,
}

impl<'a> Chip8Interpreter<'a> {
    pub fn new(
        display: &'a mut dyn Display,
        input: &'a mut dyn Input,
        sound: &'a mut dyn Sound,
        config: Config,
    ) -> Chip8Interpreter<'a> {
        let random = match config.seed {
            Some(seed) => ByteSource::seeded(seed),
            None => ByteSource::from_entropy(),
        };
        Chip8Interpreter {
            machine: Machine::new(),
            display,
            input,
            sound,
            random,
            clocks: Clocks::new(config.cycles_per_second, Instant::now()),
            config,
            state: RunState::Running,
            quit: false,
            draw: false,
        }
    }

    /// swap the random source (deterministic tests)
    pub fn with_random(mut self, random: ByteSource) -> Self {
        self.random = random;
        self
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn display(&self) -> &dyn Display {
        &*self.display
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// the host asked us to stop
    pub fn quit(&self) -> bool {
        self.quit
    }

    /// whether the last instruction drew on the screen
    pub fn draw(&self) -> bool {
        self.draw
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize, Chip8Error> {
        let len = self.machine.memory.load_program(reader)?;
        info!("loaded {} byte program", len);
        Ok(len)
    }

    /// load a chip8 program from a file, insisting that we read back as many
    /// bytes as the file claims to have. anything too big is turned away
    /// before it's read
    pub fn load_program_file(&mut self, path: &Path) -> Result<usize, Chip8Error> {
        let mut f = File::open(path)?;
        let expected = f.metadata()?.len();
        if expected > PROGRAM_CAPACITY as u64 {
            return Err(Chip8Error::ProgramTooLarge {
                size: usize::try_from(expected).unwrap_or(usize::MAX),
                capacity: PROGRAM_CAPACITY,
            });
        }
        let mut buf = Vec::with_capacity(expected as usize);
        f.read_to_end(&mut buf)?;
        if buf.len() as u64 != expected {
            return Err(Chip8Error::ProgramSizeMismatch {
                expected,
                read: buf.len(),
            });
        }
        info!("loading {:?}", path);
        self.load_program(&mut buf.as_slice())
    }

    /// run until the program runs off the end of memory or the host quits
    pub fn main_loop(&mut self) -> Result<(), Chip8Error> {
        info!(
            "running from {:#05x} at {} instructions per second",
            self.machine.pc, self.config.cycles_per_second
        );
        self.clocks = Clocks::new(self.config.cycles_per_second, Instant::now());
        while self.state != RunState::Halted {
            let draw = self.step()?;
            if self.state == RunState::Halted {
                break;
            }
            self.run_timers()?;
            self.refresh(draw)?;
            self.pace();
        }
        Ok(())
    }

    /// fetch, execute, then deal with whatever the host has sent. returns
    /// whether the instruction drew anything
    pub fn step(&mut self) -> Result<bool, Chip8Error> {
        if self.state == RunState::Halted {
            return Ok(false);
        }
        let pc = self.machine.pc;
        if pc as usize + 1 >= MEMORY_SIZE {
            self.halt(&format!("program counter {:#05x} is off the end of memory", pc));
            return Ok(false);
        }
        let opcode = self.machine.memory.get_word(pc);
        trace!("{:03x}: {:04x}  {}", pc, opcode, Instruction::decode(opcode));
        self.draw = self.execute(opcode)?;
        self.poll_peripherals()?;
        Ok(self.draw)
    }

    /// execute one instruction. PC moves on first, so jumps and calls land
    /// exactly where they say. returns true only for a sprite draw
    pub fn execute(&mut self, opcode: u16) -> Result<bool, Chip8Error> {
        self.machine.pc = self.machine.pc.wrapping_add(2);

        match Instruction::decode(opcode) {
            Instruction::Clear => self.display.clear(),
            Instruction::Return => self.machine.pc = self.machine.pop(),
            Instruction::Jump(addr) => self.machine.pc = addr,
            Instruction::Call(addr) => {
                let ret = self.machine.pc;
                self.machine.push(ret);
                self.machine.pc = addr;
            }
            Instruction::SkipEqByte(x, kk) => self.skip_if(self.v(x) == kk),
            Instruction::SkipNeByte(x, kk) => self.skip_if(self.v(x) != kk),
            Instruction::SkipEqReg(x, y) => self.skip_if(self.v(x) == self.v(y)),
            Instruction::SkipNeReg(x, y) => self.skip_if(self.v(x) != self.v(y)),
            Instruction::LoadByte(x, kk) => self.set_v(x, kk),
            Instruction::AddByte(x, kk) => self.set_v(x, self.v(x).wrapping_add(kk)),
            Instruction::LoadReg(x, y) => self.set_v(x, self.v(y)),
            Instruction::Or(x, y) => self.set_v(x, self.v(x) | self.v(y)),
            Instruction::And(x, y) => self.set_v(x, self.v(x) & self.v(y)),
            Instruction::Xor(x, y) => self.set_v(x, self.v(x) ^ self.v(y)),
            Instruction::AddReg(x, y) => {
                let carry = self.v(x).checked_add(self.v(y)).is_none();
                self.flag_then_store(x, y, carry, u8::wrapping_add);
            }
            Instruction::Sub(x, y) => {
                let no_borrow = self.v(x) > self.v(y);
                self.flag_then_store(x, y, no_borrow, u8::wrapping_sub);
            }
            Instruction::SubN(x, y) => {
                let no_borrow = self.v(y) > self.v(x);
                self.flag_then_store(x, y, no_borrow, |vx, vy| vy.wrapping_sub(vx));
            }
            Instruction::ShiftRight(x) => {
                let out = self.v(x) & 0x01 != 0;
                self.flag_then_store(x, x, out, |vx, _| vx >> 1);
            }
            Instruction::ShiftLeft(x) => {
                let out = self.v(x) & 0x80 != 0;
                self.flag_then_store(x, x, out, |vx, _| vx << 1);
            }
            Instruction::LoadI(addr) => self.machine.i = addr,
            Instruction::JumpV0(addr) => self.machine.pc = u16::from(self.v(0)) + addr,
            Instruction::Random(x, kk) => {
                let byte = self.random.next_byte();
                self.set_v(x, byte & kk);
            }
            Instruction::Draw(x, y, n) => return Ok(self.draw_sprite(x, y, n)),
            Instruction::SkipKeyDown(x) => self.skip_if(self.input.is_key_down(self.v(x))),
            Instruction::SkipKeyUp(x) => self.skip_if(!self.input.is_key_down(self.v(x))),
            Instruction::LoadDelay(x) => self.set_v(x, self.machine.delay_timer),
            Instruction::WaitKey(x) => self.wait_for_key(x)?,
            Instruction::SetDelay(x) => self.machine.delay_timer = self.v(x),
            Instruction::SetSound(x) => self.machine.sound_timer = self.v(x),
            Instruction::AddI(x) => {
                self.machine.i = self.machine.i.wrapping_add(u16::from(self.v(x)))
            }
            Instruction::Glyph(x) => {
                self.machine.i = FONT_ADDR + FONT_GLYPH_BYTES * u16::from(self.v(x))
            }
            Instruction::Bcd(x) => {
                let (vx, i) = (self.v(x), self.machine.i);
                let memory = &mut self.machine.memory;
                memory.set_byte(i, vx / 100);
                memory.set_byte(i.wrapping_add(1), (vx % 100) / 10);
                memory.set_byte(i.wrapping_add(2), vx % 10);
            }
            Instruction::StoreRegs(x) => {
                let i = self.machine.i;
                for n in 0..=x {
                    let value = self.v(n);
                    self.machine.memory.set_byte(i.wrapping_add(u16::from(n)), value);
                }
            }
            Instruction::LoadRegs(x) => {
                let i = self.machine.i;
                for n in 0..=x {
                    let value = self.machine.memory.get_byte(i.wrapping_add(u16::from(n)));
                    self.set_v(n, value);
                }
            }
            Instruction::Unknown(op) => debug!("ignoring unknown opcode {:04x}", op),
        }
        Ok(false)
    }

    fn v(&self, reg: u8) -> u8 {
        self.machine.v[reg as usize]
    }

    fn set_v(&mut self, reg: u8, value: u8) {
        self.machine.v[reg as usize] = value;
    }

    /// VF goes in first; the result is then worked out from the registers as
    /// they stand, so with x or y == F the flag feeds into it
    fn flag_then_store(&mut self, x: u8, y: u8, flag: bool, op: impl Fn(u8, u8) -> u8) {
        self.machine.v[VF] = flag as u8;
        let result = op(self.v(x), self.v(y));
        self.set_v(x, result);
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.machine.pc = self.machine.pc.wrapping_add(2);
        }
    }

    /// XOR an n-row sprite from memory[I..] onto the screen at (Vx, Vy). VF
    /// reports whether any lit pixel got switched off
    fn draw_sprite(&mut self, x: u8, y: u8, rows: u8) -> bool {
        let (x0, y0) = (u16::from(self.v(x)), u16::from(self.v(y)));
        self.machine.v[VF] = 0;
        let mut collided = false;
        for row in 0..u16::from(rows) {
            let byte = self.machine.memory.get_byte(self.machine.i.wrapping_add(row));
            let py = y0 + row;
            for bit in 0..8u16 {
                let px = x0 + bit;
                if byte & (0x80 >> bit) == 0
                    || px >= DISPLAY_WIDTH as u16
                    || py >= DISPLAY_HEIGHT as u16
                {
                    continue;
                }
                if self.display.xor_pixel(px as u8, py as u8) {
                    collided = true;
                }
            }
        }
        self.machine.v[VF] = collided as u8;
        true
    }

    /// Fx0A
    fn wait_for_key(&mut self, x: u8) -> Result<(), Chip8Error> {
        if !self.config.blocking_key_wait {
            match self.input.first_key_down() {
                Some(key) => self.set_v(x, key),
                // go round again
                None => self.machine.pc = self.machine.pc.wrapping_sub(2),
            }
            return Ok(());
        }

        debug!("waiting for a key for V{:X}", x);
        self.state = RunState::BlockedOnInput;
        while self.state == RunState::BlockedOnInput {
            match self.input.wait_signal()? {
                Signal::KeyDown(key) => {
                    self.set_v(x, key);
                    self.state = RunState::Running;
                }
                Signal::Quit => self.request_quit(),
                other => self.handle_signal(other)?,
            }
        }
        self.clocks.resync(Instant::now());
        Ok(())
    }

    /// window went to the background; hang about until it comes back
    fn wait_for_focus(&mut self) -> Result<(), Chip8Error> {
        debug!("lost focus; pausing");
        loop {
            match self.input.wait_signal()? {
                Signal::FocusGained => break,
                Signal::Quit => {
                    self.request_quit();
                    break;
                }
                Signal::FocusLost => {}
                other => self.handle_signal(other)?,
            }
            if self.state == RunState::Halted {
                break;
            }
        }
        self.clocks.resync(Instant::now());
        Ok(())
    }

    fn poll_peripherals(&mut self) -> Result<(), Chip8Error> {
        while let Some(signal) = self.input.poll_signal()? {
            self.handle_signal(signal)?;
            if self.state == RunState::Halted {
                break;
            }
        }
        Ok(())
    }

    fn handle_signal(&mut self, signal: Signal) -> Result<(), Chip8Error> {
        match signal {
            // key state is already tracked by the input device
            Signal::KeyDown(_) | Signal::KeyUp(_) | Signal::FocusGained => {}
            Signal::Quit => self.request_quit(),
            Signal::CycleColours => {
                self.display.randomize_colour_scheme();
                self.display.present()?;
            }
            Signal::SaveState => {
                let path = self.config.state_file.clone();
                if let Err(e) = self.save_state(&path) {
                    warn!("couldn't save state to {:?}: {}", path, e);
                }
            }
            Signal::LoadState => {
                let path = self.config.state_file.clone();
                if let Err(e) = self.load_state(&path) {
                    warn!("couldn't load state from {:?}: {}", path, e);
                }
            }
            Signal::Resize(cols, rows) => {
                self.display.handle_resize(cols, rows);
                self.display.present()?;
            }
            Signal::FocusLost => self.wait_for_focus()?,
        }
        Ok(())
    }

    fn request_quit(&mut self) {
        self.quit = true;
        self.halt("quit requested");
    }

    fn halt(&mut self, why: &str) {
        info!("halting: {}", why);
        self.state = RunState::Halted;
    }

    /// one decrement of each timer per 60th of a second gone by
    fn run_timers(&mut self) -> Result<(), Chip8Error> {
        let ticks = self.clocks.timers.ticks_due(Instant::now());
        self.tick_timers(ticks);
        if let Err(e) = self.sound.update() {
            warn!("sound: {}", e);
        }
        Ok(())
    }

    /// count both timers down by `ticks`, stopping at zero. every tick the
    /// sound timer is running asks for a tick's worth of tone
    pub fn tick_timers(&mut self, ticks: u32) {
        for _ in 0..ticks {
            if self.machine.delay_timer > 0 {
                self.machine.delay_timer -= 1;
            }
            if self.machine.sound_timer > 0 {
                self.machine.sound_timer -= 1;
                self.sound
                    .enqueue_tone(self.config.tone_frequency, self.clocks.timers.period());
            }
        }
    }

    /// repaint when a frame is due; a draw before then waits for the frame
    /// boundary rather than tearing along at CPU speed
    fn refresh(&mut self, draw: bool) -> Result<(), Chip8Error> {
        let now = Instant::now();
        if self.clocks.frames.is_due(now) {
            self.display.present()?;
            self.clocks.frames.reset(now);
        } else if draw {
            spin_sleep::sleep(self.clocks.frames.until_due(now));
            self.display.present()?;
            self.clocks.frames.reset(Instant::now());
        }
        Ok(())
    }

    /// sleep until the next instruction slot
    fn pace(&mut self) {
        spin_sleep::sleep(self.clocks.cpu.until_due(Instant::now()));
        let slack = self.clocks.frames.period();
        self.clocks.cpu.advance(Instant::now(), slack);
    }

    /// write the whole machine, screen included, to a state file
    pub fn save_state(&self, path: &Path) -> Result<(), Chip8Error> {
        let bytes = snapshot::encode(&self.machine, &self.display.pixel_map());
        fs::write(path, bytes)?;
        info!("saved state to {:?}", path);
        Ok(())
    }

    /// replace the whole machine from a state file and repaint. a bad file
    /// leaves everything as it was
    pub fn load_state(&mut self, path: &Path) -> Result<(), Chip8Error> {
        let bytes = fs::read(path)?;
        let (machine, pixels) = snapshot::decode(&bytes)?;
        self.machine = machine;
        self.display.clear();
        self.display.set_pixel_map(&pixels);
        self.display.present()?;
        info!("restored state from {:?}", path);
        Ok(())
    }
}
