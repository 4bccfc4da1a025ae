use crate::error::Chip8Error;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// environment variable naming an alternative config file
pub const CONFIG_ENV_VAR: &str = "CHIP8_CONFIG";

/// looked for in the working directory when the env var isn't set
pub const DEFAULT_CONFIG_FILE: &str = "chip8.toml";

/// left-hand side of a qwerty keyboard laid out like the COSMAC hex pad:
///   1 2 3 4        1 2 3 C
///   q w e r   =>   4 5 6 D
///   a s d f        7 8 9 E
///   z x c v        A 0 B F
/// character n of the string is the key for CHIP-8 key n
pub const CONVENTIONAL_KEYMAP: &str = "x123qweasdzc4rfv";

/// runtime tunables; everything has a default so a partial TOML file works
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// logical CPU clock, in instructions per second
    pub cycles_per_second: u32,
    /// pitch of the tone played while the sound timer is running
    pub tone_frequency: u16,
    /// Fx0A suspends everything (timers included) until a key is pressed.
    /// turning this off makes Fx0A spin on the instruction instead
    pub blocking_key_wait: bool,
    /// where the save/load hotkeys put the machine snapshot
    pub state_file: PathBuf,
    /// 16 characters, one per CHIP-8 key
    pub keymap: String,
    pub colour_key: char,
    pub save_key: char,
    pub load_key: char,
    /// terminals don't report key releases, so keys are let go after this
    pub key_hold_ms: u64,
    pub foreground: u32,
    pub background: u32,
    /// fixes the random source for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycles_per_second: 700,
            tone_frequency: 440,
            blocking_key_wait: true,
            state_file: PathBuf::from("chip8.sv"),
            keymap: CONVENTIONAL_KEYMAP.to_string(),
            colour_key: 't',
            save_key: 'p',
            load_key: 'l',
            key_hold_ms: 150,
            foreground: 0x00FF_FFFF,
            background: 0x0000_0000,
            seed: None,
        }
    }
}

impl Config {
    /// find and load the config file, falling back to defaults when there
    /// isn't one. a file that exists but doesn't parse is an error
    pub fn load() -> Result<Self, Chip8Error> {
        match env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    debug!("no {} found; using default config", DEFAULT_CONFIG_FILE);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Chip8Error> {
        info!("loading config from {:?}", path);
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, Chip8Error> {
        let config: Config =
            toml::from_str(text).map_err(|e| Chip8Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Chip8Error> {
        if self.cycles_per_second == 0 {
            return Err(Chip8Error::Config(
                "cycles_per_second must be greater than zero".to_string(),
            ));
        }
        if self.foreground & 0x00FF_FFFF == self.background & 0x00FF_FFFF {
            return Err(Chip8Error::Config(
                "foreground and background must be different colours".to_string(),
            ));
        }
        // keys are matched case-insensitively
        let keys: Vec<char> = self.keymap.chars().map(|c| c.to_ascii_lowercase()).collect();
        if keys.len() != 16 {
            return Err(Chip8Error::Config(format!(
                "keymap needs 16 characters, got {}",
                keys.len()
            )));
        }
        let mut seen: HashSet<char> = keys.iter().copied().collect();
        if seen.len() != 16 {
            return Err(Chip8Error::Config(
                "keymap characters must be distinct".to_string(),
            ));
        }
        for hotkey in [self.colour_key, self.save_key, self.load_key] {
            if !seen.insert(hotkey.to_ascii_lowercase()) {
                return Err(Chip8Error::Config(format!(
                    "hotkey '{}' clashes with another key",
                    hotkey
                )));
            }
        }
        Ok(())
    }

    /// (lowercase character, CHIP-8 key) pairs
    pub fn key_pairs(&self) -> impl Iterator<Item = (char, u8)> + '_ {
        self.keymap.chars().map(|c| c.to_ascii_lowercase()).zip(0u8..)
    }
}
