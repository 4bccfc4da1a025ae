use crate::config::Config;
use crate::error::Chip8Error;
use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// the COSMAC hex pad has 16 keys
pub const KEY_COUNT: usize = 16;

/// what a host event means to the emulator. each host event becomes at most
/// one of these
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Signal {
    KeyDown(u8),
    KeyUp(u8),
    Quit,
    CycleColours,
    SaveState,
    LoadState,
    Resize(u16, u16),
    FocusLost,
    FocusGained,
}

/// pressed/released state of the 16 keys, one bit each
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Keypad(u16);

impl Keypad {
    /// keys above 0xf are never down
    pub fn is_down(&self, key: u8) -> bool {
        (key as usize) < KEY_COUNT && self.0 & (1 << key) != 0
    }

    pub fn set(&mut self, key: u8, down: bool) {
        if (key as usize) < KEY_COUNT {
            if down {
                self.0 |= 1 << key;
            } else {
                self.0 &= !(1 << key);
            }
        }
    }

    pub fn flip(&mut self, key: u8) {
        self.set(key, !self.is_down(key));
    }

    /// lowest-numbered key that's down, if any
    pub fn first_down(&self) -> Option<u8> {
        (0..KEY_COUNT as u8).find(|&k| self.is_down(k))
    }

    /// keep the bitset in step with a signal
    pub fn apply(&mut self, signal: Signal) {
        match signal {
            Signal::KeyDown(k) => self.set(k, true),
            Signal::KeyUp(k) => self.set(k, false),
            _ => {}
        }
    }
}

/// reads keypresses
pub trait Input {
    /// next pending signal without blocking, or None when there's nothing
    /// (more) to handle right now
    fn poll_signal(&mut self) -> Result<Option<Signal>, Chip8Error>;

    /// block until the host has something to say
    fn wait_signal(&mut self) -> Result<Signal, Chip8Error>;

    fn is_key_down(&self, key: u8) -> bool;

    /// lowest-numbered key that's down, if any
    fn first_key_down(&self) -> Option<u8>;

    /// force a key up or down (testing, scripted input)
    fn set_key_state(&mut self, key: u8, down: bool);
}

/// map of characters read from the keyboard to what the chip8 might expect,
/// plus the emulator's own hotkeys
pub struct Keymap {
    keys: HashMap<char, u8>,
    colour_key: char,
    save_key: char,
    load_key: char,
}

impl Keymap {
    pub fn from_config(config: &Config) -> Self {
        Keymap {
            keys: config.key_pairs().collect(),
            colour_key: config.colour_key.to_ascii_lowercase(),
            save_key: config.save_key.to_ascii_lowercase(),
            load_key: config.load_key.to_ascii_lowercase(),
        }
    }

    /// turn one crossterm event into (at most) one signal
    pub fn translate_event(&self, event: &Event) -> Option<Signal> {
        match event {
            Event::Key(key) => match key.code {
                KeyCode::Esc => Some(Signal::Quit),
                // raw mode swallows SIGINT, so do it by hand
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(Signal::Quit)
                }
                KeyCode::Char(c) => {
                    let c = c.to_ascii_lowercase();
                    if let Some(mapped_key) = self.keys.get(&c) {
                        Some(Signal::KeyDown(*mapped_key))
                    } else if c == self.colour_key {
                        Some(Signal::CycleColours)
                    } else if c == self.save_key {
                        Some(Signal::SaveState)
                    } else if c == self.load_key {
                        Some(Signal::LoadState)
                    } else {
                        warn!("can't map {:?} to a COSMAC key", c);
                        None
                    }
                }
                _ => None,
            },
            Event::Resize(cols, rows) => Some(Signal::Resize(*cols, *rows)),
            Event::Mouse(_) => None,
        }
    }
}

/// keyboard input from the terminal, using crossterm. terminals only report
/// presses, so a key counts as held for a while after it was last seen
pub struct TermInput {
    keymap: Keymap,
    keypad: Keypad,
    held_since: [Option<Instant>; KEY_COUNT],
    hold: Duration,
}

impl TermInput {
    pub fn new(config: &Config) -> Result<Self, Chip8Error> {
        terminal::enable_raw_mode()?;
        Ok(TermInput {
            keymap: Keymap::from_config(config),
            keypad: Keypad::default(),
            held_since: [None; KEY_COUNT],
            hold: Duration::from_millis(config.key_hold_ms),
        })
    }

    fn record(&mut self, signal: Signal) {
        if let Signal::KeyDown(k) = signal {
            self.held_since[k as usize] = Some(Instant::now());
        }
        self.keypad.apply(signal);
    }

    /// let go of the first key held for longer than the hold time
    fn expire_key(&mut self) -> Option<Signal> {
        let now = Instant::now();
        for key in 0..KEY_COUNT {
            if let Some(since) = self.held_since[key] {
                if now.duration_since(since) >= self.hold {
                    self.held_since[key] = None;
                    let signal = Signal::KeyUp(key as u8);
                    self.keypad.apply(signal);
                    return Some(signal);
                }
            }
        }
        None
    }
}

impl Drop for TermInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for TermInput {
    fn poll_signal(&mut self) -> Result<Option<Signal>, Chip8Error> {
        if let Some(released) = self.expire_key() {
            return Ok(Some(released));
        }
        while poll(Duration::from_millis(0))? {
            if let Some(signal) = self.keymap.translate_event(&read()?) {
                self.record(signal);
                return Ok(Some(signal));
            }
        }
        Ok(None)
    }

    fn wait_signal(&mut self) -> Result<Signal, Chip8Error> {
        loop {
            if let Some(signal) = self.keymap.translate_event(&read()?) {
                debug!("woken by {:?}", signal);
                self.record(signal);
                return Ok(signal);
            }
        }
    }

    fn is_key_down(&self, key: u8) -> bool {
        self.keypad.is_down(key)
    }

    fn first_key_down(&self) -> Option<u8> {
        self.keypad.first_down()
    }

    fn set_key_state(&mut self, key: u8, down: bool) {
        if (key as usize) < KEY_COUNT {
            self.held_since[key as usize] = if down { Some(Instant::now()) } else { None };
        }
        self.keypad.set(key, down);
    }
}

/// plays back a fixed list of signals; for testing and headless runs
#[derive(Default)]
pub struct ScriptedInput {
    // None marks the end of a poll round
    script: VecDeque<Option<Signal>>,
    keypad: Keypad,
}

impl ScriptedInput {
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        ScriptedInput {
            script: signals.into_iter().map(Some).collect(),
            keypad: Keypad::default(),
        }
    }

    /// queue a signal
    pub fn then(mut self, signal: Signal) -> Self {
        self.script.push_back(Some(signal));
        self
    }

    /// have the next `polls` poll rounds come back empty
    pub fn idle(mut self, polls: usize) -> Self {
        self.script.extend(std::iter::repeat(None).take(polls));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.iter().filter(|s| s.is_some()).count()
    }
}

impl Input for ScriptedInput {
    fn poll_signal(&mut self) -> Result<Option<Signal>, Chip8Error> {
        match self.script.pop_front() {
            Some(Some(signal)) => {
                self.keypad.apply(signal);
                Ok(Some(signal))
            }
            _ => Ok(None),
        }
    }

    /// an exhausted script reads as Quit, so nothing waits forever
    fn wait_signal(&mut self) -> Result<Signal, Chip8Error> {
        while let Some(entry) = self.script.pop_front() {
            if let Some(signal) = entry {
                self.keypad.apply(signal);
                return Ok(signal);
            }
        }
        Ok(Signal::Quit)
    }

    fn is_key_down(&self, key: u8) -> bool {
        self.keypad.is_down(key)
    }

    fn first_key_down(&self) -> Option<u8> {
        self.keypad.first_down()
    }

    fn set_key_state(&mut self, key: u8, down: bool) {
        self.keypad.set(key, down);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, MouseEvent, MouseEventKind};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_keypad_bits() {
        let mut k = Keypad::default();
        assert_eq!(k.first_down(), None);
        k.set(0xa, true);
        k.flip(0x3);
        assert!(k.is_down(0xa));
        assert!(k.is_down(0x3));
        assert_eq!(k.first_down(), Some(0x3));
        k.flip(0x3);
        assert!(!k.is_down(0x3));
        k.apply(Signal::KeyUp(0xa));
        assert_eq!(k, Keypad::default());
    }

    #[test]
    fn test_keypad_ignores_out_of_range() {
        let mut k = Keypad::default();
        k.set(16, true);
        k.set(0xff, true);
        assert!(!k.is_down(16));
        assert!(!k.is_down(0xff));
        assert_eq!(k, Keypad::default());
    }

    #[test]
    fn test_translate_keys() {
        let m = Keymap::from_config(&Config::default());
        assert_eq!(m.translate_event(&key('x')), Some(Signal::KeyDown(0x0)));
        assert_eq!(m.translate_event(&key('1')), Some(Signal::KeyDown(0x1)));
        assert_eq!(m.translate_event(&key('V')), Some(Signal::KeyDown(0xf)));
        assert_eq!(m.translate_event(&key('4')), Some(Signal::KeyDown(0xc)));
        assert_eq!(m.translate_event(&key('k')), None);
    }

    #[test]
    fn test_translate_hotkeys() {
        let m = Keymap::from_config(&Config::default());
        assert_eq!(m.translate_event(&key('t')), Some(Signal::CycleColours));
        assert_eq!(m.translate_event(&key('p')), Some(Signal::SaveState));
        assert_eq!(m.translate_event(&key('l')), Some(Signal::LoadState));
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(m.translate_event(&esc), Some(Signal::Quit));
        let ctrl_c = Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(m.translate_event(&ctrl_c), Some(Signal::Quit));
    }

    #[test]
    fn test_translate_uppercase_config() -> Result<(), Chip8Error> {
        let c = Config::from_toml("keymap = \"X123QWEASDZC4RFV\"\ncolour_key = \"T\"")?;
        let m = Keymap::from_config(&c);
        assert_eq!(m.translate_event(&key('x')), Some(Signal::KeyDown(0x0)));
        assert_eq!(m.translate_event(&key('Q')), Some(Signal::KeyDown(0x4)));
        assert_eq!(m.translate_event(&key('t')), Some(Signal::CycleColours));
        Ok(())
    }

    #[test]
    fn test_translate_window_events() {
        let m = Keymap::from_config(&Config::default());
        assert_eq!(
            m.translate_event(&Event::Resize(100, 40)),
            Some(Signal::Resize(100, 40))
        );
        let mouse = Event::Mouse(MouseEvent {
            kind: MouseEventKind::Moved,
            column: 1,
            row: 1,
            modifiers: KeyModifiers::NONE,
        });
        assert_eq!(m.translate_event(&mouse), None);
    }

    #[test]
    fn test_scripted_poll_rounds() -> Result<(), Chip8Error> {
        let mut i = ScriptedInput::new([Signal::KeyDown(5)])
            .idle(1)
            .then(Signal::KeyUp(5));
        assert_eq!(i.remaining(), 2);
        assert_eq!(i.poll_signal()?, Some(Signal::KeyDown(5)));
        assert!(i.is_key_down(5));
        assert_eq!(i.poll_signal()?, None);
        assert_eq!(i.poll_signal()?, Some(Signal::KeyUp(5)));
        assert!(!i.is_key_down(5));
        assert_eq!(i.poll_signal()?, None);
        Ok(())
    }

    #[test]
    fn test_scripted_wait_skips_idle_and_quits_when_done() -> Result<(), Chip8Error> {
        let mut i = ScriptedInput::default().idle(3).then(Signal::KeyDown(9));
        assert_eq!(i.wait_signal()?, Signal::KeyDown(9));
        assert_eq!(i.wait_signal()?, Signal::Quit);
        Ok(())
    }

    #[test]
    fn test_scripted_set_key_state() {
        let mut i = ScriptedInput::default();
        assert_eq!(i.first_key_down(), None);
        i.set_key_state(0xe, true);
        assert!(i.is_key_down(0xe));
        i.set_key_state(0x2, true);
        assert_eq!(i.first_key_down(), Some(0x2));
        i.set_key_state(0x2, false);
        assert_eq!(i.first_key_down(), Some(0xe));
        i.set_key_state(0xe, false);
        assert!(!i.is_key_down(0xe));
    }
}
