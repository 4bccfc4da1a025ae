use crate::error::Chip8Error;
use beep::beep;
use log::debug;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// queued tone output. the interpreter asks for a short tone every timer tick
/// the sound timer is running; implementations play them back to back
pub trait Sound {
    fn init(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }

    fn enqueue_tone(&mut self, frequency: u16, duration: Duration);

    /// move playback along; called regularly from the run loop
    fn update(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }

    /// block until everything queued has been played
    fn drain_until_empty(&mut self) -> Result<(), Chip8Error>;
}

struct Tone {
    frequency: u16,
    duration: Duration,
}

/// square wave from the PC speaker, via the beep crate
pub struct SimpleBeep {
    queue: VecDeque<Tone>,
    sounding: Option<u16>,
    until: Instant,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep {
            queue: VecDeque::new(),
            sounding: None,
            until: Instant::now(),
        }
    }

    fn set_pitch(&mut self, frequency: Option<u16>) -> Result<(), Chip8Error> {
        if self.sounding != frequency {
            beep(frequency.unwrap_or(0)).map_err(|e| Chip8Error::Sound(e.to_string()))?;
            self.sounding = frequency;
        }
        Ok(())
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.sounding.is_none()
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn init(&mut self) -> Result<(), Chip8Error> {
        // silence doubles as a check that we can reach the speaker at all
        beep(0).map_err(|e| Chip8Error::SoundInit(e.to_string()))?;
        Ok(())
    }

    fn enqueue_tone(&mut self, frequency: u16, duration: Duration) {
        self.queue.push_back(Tone {
            frequency,
            duration,
        });
    }

    fn update(&mut self) -> Result<(), Chip8Error> {
        let now = Instant::now();
        while now >= self.until {
            match self.queue.pop_front() {
                Some(tone) => {
                    // back-to-back tones run on from the last one
                    let start = if self.sounding.is_some() { self.until } else { now };
                    self.set_pitch(Some(tone.frequency))?;
                    self.until = start + tone.duration;
                }
                None => {
                    self.set_pitch(None)?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn drain_until_empty(&mut self) -> Result<(), Chip8Error> {
        debug!("draining {} queued tones", self.queue.len());
        loop {
            self.update()?;
            if self.is_idle() {
                return Ok(());
            }
            spin_sleep::sleep(self.until.saturating_duration_since(Instant::now()));
        }
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        if self.sounding.is_some() {
            let _ = beep(0);
        }
    }
}

/// no sound at all
#[derive(Default)]
pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Sound for Mute {
    fn enqueue_tone(&mut self, _frequency: u16, _duration: Duration) {}

    fn drain_until_empty(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }
}

/// remembers every tone asked for; for testing
#[derive(Default)]
pub struct ToneRecorder {
    tones: Vec<(u16, Duration)>,
    drained: usize,
}

impl ToneRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tones(&self) -> &[(u16, Duration)] {
        &self.tones
    }

    /// how many times the queue was drained
    pub fn drained(&self) -> usize {
        self.drained
    }
}

impl Sound for ToneRecorder {
    fn enqueue_tone(&mut self, frequency: u16, duration: Duration) {
        self.tones.push((frequency, duration));
    }

    fn drain_until_empty(&mut self) -> Result<(), Chip8Error> {
        self.drained += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder() -> Result<(), Chip8Error> {
        let mut s = ToneRecorder::new();
        s.init()?;
        s.enqueue_tone(440, Duration::from_millis(16));
        s.enqueue_tone(880, Duration::from_millis(16));
        s.update()?;
        s.drain_until_empty()?;
        assert_eq!(
            s.tones(),
            &[(440, Duration::from_millis(16)), (880, Duration::from_millis(16))]
        );
        assert_eq!(s.drained(), 1);
        Ok(())
    }

    #[test]
    fn test_mute() -> Result<(), Chip8Error> {
        let mut s = Mute::new();
        s.enqueue_tone(440, Duration::from_secs(10));
        // returns straight away
        s.drain_until_empty()
    }

    #[test]
    fn test_simple_beep_starts_idle() {
        let s = SimpleBeep::new();
        assert!(s.is_idle());
    }

    #[test]
    #[ignore]
    // NB. needs a speaker (and permission to use it)
    fn test_simple_beep_plays() -> Result<(), Chip8Error> {
        let mut s = SimpleBeep::new();
        s.init()?;
        s.enqueue_tone(440, Duration::from_millis(100));
        s.drain_until_empty()?;
        assert!(s.is_idle());
        Ok(())
    }
}
