use crate::error::Chip8Error;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use log::{debug, warn};
use rand::Rng;
use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

/// logical resolution of the CHIP-8 screen
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const DISPLAY_CELLS: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

pub const BLACK: u32 = 0x0000_0000;
pub const WHITE: u32 = 0x00FF_FFFF;

/// one 32-bit colour per cell, row-major (index = y * 64 + x)
pub type PixelMap = [u32; DISPLAY_CELLS];

struct Frame {
    cells: PixelMap,
    foreground: u32,
    background: u32,
}

/// the pixel buffer behind every Display. cloning shares the same buffer, so
/// another thread (a colour cycler, say) can work on it; every
/// read-modify-write happens with the lock held
#[derive(Clone)]
pub struct FrameBuffer {
    inner: Arc<Mutex<Frame>>,
}

impl FrameBuffer {
    pub fn new(foreground: u32, background: u32) -> Self {
        FrameBuffer {
            inner: Arc::new(Mutex::new(Frame {
                cells: [background; DISPLAY_CELLS],
                foreground,
                background,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Frame> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index(x: u8, y: u8) -> Option<usize> {
        let (x, y) = (x as usize, y as usize);
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            Some(y * DISPLAY_WIDTH + x)
        } else {
            None
        }
    }

    pub fn clear(&self) {
        let mut frame = self.lock();
        let bg = frame.background;
        frame.cells = [bg; DISPLAY_CELLS];
    }

    /// off-screen writes are dropped
    pub fn draw_pixel(&self, x: u8, y: u8, colour: u32) {
        if let Some(idx) = Self::index(x, y) {
            self.lock().cells[idx] = colour;
        }
    }

    /// flip a cell. returns true if a lit cell was switched off (collision).
    /// anything that isn't the background colour counts as lit
    pub fn xor_pixel(&self, x: u8, y: u8) -> bool {
        let idx = match Self::index(x, y) {
            Some(idx) => idx,
            None => return false,
        };
        let mut frame = self.lock();
        if frame.cells[idx] == frame.background {
            frame.cells[idx] = frame.foreground;
            false
        } else {
            frame.cells[idx] = frame.background;
            true
        }
    }

    pub fn is_lit(&self, x: u8, y: u8) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                let frame = self.lock();
                frame.cells[idx] != frame.background
            }
            None => false,
        }
    }

    /// swap in a new colour scheme, repainting every cell to match
    pub fn recolour(&self, foreground: u32, background: u32) {
        let mut frame = self.lock();
        let old_bg = frame.background;
        for cell in frame.cells.iter_mut() {
            *cell = if *cell == old_bg { background } else { foreground };
        }
        frame.foreground = foreground;
        frame.background = background;
    }

    /// (foreground, background)
    pub fn colours(&self) -> (u32, u32) {
        let frame = self.lock();
        (frame.foreground, frame.background)
    }

    pub fn pixel_map(&self) -> PixelMap {
        self.lock().cells
    }

    /// replace every cell. the colour scheme comes along with the map: its
    /// commonest colour is taken as the background and any other as the
    /// foreground, so a map saved under different colours still reads right
    pub fn set_pixel_map(&self, map: &PixelMap) {
        let mut frame = self.lock();
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for &cell in map.iter() {
            *counts.entry(cell).or_insert(0) += 1;
        }
        let current_bg = frame.background;
        let background = counts
            .iter()
            .max_by_key(|&(&colour, &n)| (n, colour == current_bg))
            .map(|(&colour, _)| colour)
            .unwrap_or(current_bg);
        let foreground = match map.iter().find(|&&cell| cell != background) {
            Some(&colour) => colour,
            None if frame.foreground != background => frame.foreground,
            None => !background & WHITE,
        };
        if (foreground, background) != (frame.foreground, frame.background) {
            debug!(
                "restored map brings its own colours: {:06x} on {:06x}",
                foreground, background
            );
        }
        frame.cells = *map;
        frame.foreground = foreground;
        frame.background = background;
    }
}

/// Display is used by the interpreter to draw things on the screen. It should
/// abstract the implementation details, so a variety of kinds of screen would
/// work. pixel state lives in the FrameBuffer; implementations decide how to
/// show it
pub trait Display {
    /// get the screen ready; failure here is fatal at startup
    fn init(&mut self) -> Result<(), Chip8Error> {
        Ok(())
    }

    fn frame(&self) -> &FrameBuffer;

    /// push the current pixel map out to whatever is looking at it
    fn present(&mut self) -> Result<(), Chip8Error>;

    /// host window/terminal changed size
    fn handle_resize(&mut self, _cols: u16, _rows: u16) {}

    fn clear(&mut self) {
        self.frame().clear()
    }

    fn draw_pixel(&mut self, x: u8, y: u8, colour: u32) {
        self.frame().draw_pixel(x, y, colour)
    }

    fn xor_pixel(&mut self, x: u8, y: u8) -> bool {
        self.frame().xor_pixel(x, y)
    }

    fn randomize_colour_scheme(&mut self) {
        let mut rng = rand::thread_rng();
        let foreground = rng.gen::<u32>() & WHITE;
        let mut background = rng.gen::<u32>() & WHITE;
        while background == foreground {
            background = rng.gen::<u32>() & WHITE;
        }
        debug!(
            "colour scheme now {:06x} on {:06x}",
            foreground, background
        );
        self.frame().recolour(foreground, background)
    }

    fn pixel_map(&self) -> PixelMap {
        self.frame().pixel_map()
    }

    fn set_pixel_map(&mut self, map: &PixelMap) {
        self.frame().set_pixel_map(map)
    }
}

// store useful metadata about the canvas
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates for every cell, grouped by colour so each colour is
    /// one Points shape
    fn points_by_colour(&self, cells: &[u32]) -> BTreeMap<u32, Vec<(f64, f64)>> {
        let w = self.0;
        let mut planes: BTreeMap<u32, Vec<(f64, f64)>> = BTreeMap::new();
        for (count, colour) in cells.iter().enumerate().take(self.pixel_count()) {
            planes.entry(*colour).or_default().push((
                (count % w) as f64,        // x
                -1.0 * (count / w) as f64, // y
            ));
        }
        planes
    }
}

fn rgb(colour: u32) -> Color {
    Color::Rgb((colour >> 16) as u8, (colour >> 8) as u8, colour as u8)
}

/// monochrome display in a terminal, rendered using TUI and Crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    frame: FrameBuffer,
    area: (u16, u16),
    active: bool,
}

impl MonoTermDisplay {
    pub fn new(foreground: u32, background: u32) -> Result<MonoTermDisplay, Chip8Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let terminal =
            Terminal::new(backend).map_err(|e| Chip8Error::DisplayInit(e.to_string()))?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(DISPLAY_WIDTH, DISPLAY_HEIGHT),
            frame: FrameBuffer::new(foreground, background),
            area: (2 + DISPLAY_WIDTH as u16, 2 + DISPLAY_HEIGHT as u16),
            active: false,
        })
    }

    /// where the bordered canvas goes; clipped to the terminal
    fn canvas_rect(&self) -> Rect {
        Rect::new(
            0,
            0,
            self.area.0.min(2 + self.resolution.0 as u16),
            self.area.1.min(2 + self.resolution.1 as u16),
        )
    }
}

impl Display for MonoTermDisplay {
    fn init(&mut self) -> Result<(), Chip8Error> {
        execute!(io::stdout(), EnterAlternateScreen)
            .map_err(|e| Chip8Error::DisplayInit(e.to_string()))?;
        self.active = true;
        self.terminal
            .hide_cursor()
            .map_err(|e| Chip8Error::DisplayInit(e.to_string()))?;
        self.terminal
            .clear()
            .map_err(|e| Chip8Error::DisplayInit(e.to_string()))?;
        let size = self
            .terminal
            .size()
            .map_err(|e| Chip8Error::DisplayInit(e.to_string()))?;
        self.area = (size.width, size.height);
        self.present()
    }

    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    fn present(&mut self) -> Result<(), Chip8Error> {
        let cells = self.frame.pixel_map();
        let (_, background) = self.frame.colours();
        let planes = self.resolution.points_by_colour(&cells);
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        let size = self.canvas_rect();

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(rgb(background))),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    for (colour, coords) in planes.iter() {
                        ctx.draw(&Points {
                            coords,
                            color: rgb(*colour),
                        });
                    }
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        debug!("terminal resized to {}x{}", cols, rows);
        if cols < 2 + DISPLAY_WIDTH as u16 || rows < 2 + DISPLAY_HEIGHT as u16 {
            warn!(
                "terminal is {}x{}; the screen needs {}x{} to show in full",
                cols,
                rows,
                2 + DISPLAY_WIDTH,
                2 + DISPLAY_HEIGHT
            );
        }
        self.area = (cols, rows);
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        if self.active {
            let _ = self.terminal.show_cursor();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}

/// keeps the picture in memory only. useful for testing and for running
/// programs without a terminal
pub struct HeadlessDisplay {
    frame: FrameBuffer,
    presents: usize,
    area: (u16, u16),
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        HeadlessDisplay {
            frame: FrameBuffer::new(WHITE, BLACK),
            presents: 0,
            area: (DISPLAY_WIDTH as u16, DISPLAY_HEIGHT as u16),
        }
    }

    /// how many times the picture has been pushed out
    pub fn presents(&self) -> usize {
        self.presents
    }

    pub fn area(&self) -> (u16, u16) {
        self.area
    }

    pub fn is_lit(&self, x: u8, y: u8) -> bool {
        self.frame.is_lit(x, y)
    }

    /// the screen as rows of '#' and '.', handy in assertions
    pub fn render_text(&self) -> Vec<String> {
        (0..DISPLAY_HEIGHT as u8)
            .map(|y| {
                (0..DISPLAY_WIDTH as u8)
                    .map(|x| if self.is_lit(x, y) { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    fn present(&mut self) -> Result<(), Chip8Error> {
        self.presents += 1;
        Ok(())
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        self.area = (cols, rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // Resolution tests
    #[test]
    fn test_pixel_count() {
        let r = Resolution(64, 32);
        assert_eq!(r.pixel_count(), 2048)
    }

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_points_by_colour() {
        let r = Resolution(64, 32);
        let mut cells = [BLACK; DISPLAY_CELLS];
        cells[65] = WHITE;
        let planes = r.points_by_colour(&cells);
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[&WHITE], vec![(1.0, -1.0)]);
        assert_eq!(planes[&BLACK].len(), 2047);
    }

    #[test]
    fn test_rgb() {
        assert_eq!(rgb(0x123456), Color::Rgb(0x12, 0x34, 0x56));
    }

    // FrameBuffer tests
    #[test]
    fn test_xor_and_collision() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        assert!(!fb.xor_pixel(3, 4));
        assert!(fb.is_lit(3, 4));
        assert!(fb.xor_pixel(3, 4));
        assert!(!fb.is_lit(3, 4));
    }

    #[test]
    fn test_off_screen_dropped() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        assert!(!fb.xor_pixel(64, 0));
        assert!(!fb.xor_pixel(0, 32));
        fb.draw_pixel(200, 200, WHITE);
        assert!(fb.pixel_map().iter().all(|&c| c == BLACK));
    }

    #[test]
    fn test_clear_uses_background() {
        let fb = FrameBuffer::new(WHITE, 0x000080);
        fb.xor_pixel(0, 0);
        fb.clear();
        assert!(fb.pixel_map().iter().all(|&c| c == 0x000080));
    }

    #[test]
    fn test_recolour_keeps_picture() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        fb.xor_pixel(10, 10);
        fb.recolour(0xff0000, 0x00ff00);
        assert_eq!(fb.colours(), (0xff0000, 0x00ff00));
        let map = fb.pixel_map();
        assert_eq!(map[10 * 64 + 10], 0xff0000);
        assert_eq!(map[0], 0x00ff00);
        assert!(fb.is_lit(10, 10));
        // and xor still works against the new scheme
        assert!(fb.xor_pixel(10, 10));
        assert!(!fb.is_lit(10, 10));
    }

    #[test]
    fn test_foreign_colour_counts_as_lit() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        fb.draw_pixel(1, 1, 0xabcdef);
        assert!(fb.xor_pixel(1, 1));
        assert_eq!(fb.pixel_map()[64 + 1], BLACK);
    }

    #[test]
    fn test_set_pixel_map_takes_its_colours() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        let mut map = [0x112233; DISPLAY_CELLS];
        map[3] = 0x445566;
        fb.set_pixel_map(&map);
        assert_eq!(fb.colours(), (0x445566, 0x112233));
        assert!(fb.is_lit(3, 0));
        assert!(!fb.is_lit(4, 0));
        // blank cells light up rather than collide
        assert!(!fb.xor_pixel(4, 0));
        assert!(fb.is_lit(4, 0));
        assert_eq!(fb.pixel_map()[4], 0x445566);
    }

    #[test]
    fn test_set_pixel_map_blank_keeps_foreground() {
        let fb = FrameBuffer::new(0x00ff00, 0x0000ff);
        fb.set_pixel_map(&[BLACK; DISPLAY_CELLS]);
        assert_eq!(fb.colours(), (0x00ff00, BLACK));

        // a blank map in the current foreground colour gets a visible one
        fb.set_pixel_map(&[0x00ff00; DISPLAY_CELLS]);
        assert_eq!(fb.colours(), (0xff00ff, 0x00ff00));
        assert!(!fb.xor_pixel(0, 0));
    }

    #[test]
    fn test_shared_between_threads() {
        let fb = FrameBuffer::new(WHITE, BLACK);
        let cycler = fb.clone();
        let handle = thread::spawn(move || {
            for n in 0..100u32 {
                cycler.recolour(0x100 + n, n);
            }
        });
        for _ in 0..100 {
            fb.xor_pixel(5, 5);
        }
        handle.join().unwrap();
        // 100 flips leave it dark whatever the colours ended up as
        assert!(!fb.is_lit(5, 5));
    }

    // HeadlessDisplay tests
    #[test]
    fn test_headless_counts_presents() -> Result<(), Chip8Error> {
        let mut d = HeadlessDisplay::new();
        d.present()?;
        d.present()?;
        assert_eq!(d.presents(), 2);
        Ok(())
    }

    #[test]
    fn test_headless_randomize_keeps_picture() {
        let mut d = HeadlessDisplay::new();
        d.xor_pixel(7, 7);
        d.randomize_colour_scheme();
        let (fg, bg) = d.frame().colours();
        assert_ne!(fg, bg);
        assert!(d.is_lit(7, 7));
        assert_eq!(d.render_text()[7].chars().filter(|&c| c == '#').count(), 1);
    }
}
