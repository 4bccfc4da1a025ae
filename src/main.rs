use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use chip8vm::config::Config;
use chip8vm::display::{Display, MonoTermDisplay};
use chip8vm::input::TermInput;
use chip8vm::interpreter::Chip8Interpreter;
use chip8vm::sound::{SimpleBeep, Sound};
use chip8vm::Chip8Error;
use log::{error, info};

fn run(config: Config, rom: PathBuf) -> Result<(), Chip8Error> {
    // initialise
    let mut display = MonoTermDisplay::new(config.foreground, config.background)?;
    let mut sound = SimpleBeep::new();
    sound.init()?;
    let mut input = TermInput::new(&config)?;
    display.init()?;

    {
        let mut interpreter = Chip8Interpreter::new(&mut display, &mut input, &mut sound, config);
        interpreter.load_program_file(&rom)?;
        interpreter.main_loop()?;
    }

    // let the last beep finish before the speaker goes away
    sound.drain_until_empty()
}

fn main() -> ExitCode {
    env_logger::init();

    let rom = match env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: chip8vm <program.ch8>");
            return ExitCode::FAILURE;
        }
    };
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            eprintln!("chip8vm: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // NB. the terminal is restored (collaborators dropped) before we report
    match run(config, rom) {
        Ok(()) => {
            info!("bye");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("chip8vm: {}", e);
            ExitCode::FAILURE
        }
    }
}
