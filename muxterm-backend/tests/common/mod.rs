//! Shared mock screen, recording listener, and manual timer for the
//! integration suites.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use muxterm_backend::ansi::attr::Attr;
use muxterm_backend::ansi::graphics::GraphicData;
use muxterm_backend::ansi::{ClearMode, LineClearMode, PromptMark};
use muxterm_backend::event::{EventListener, TermEvent};
use muxterm_backend::input::{KeyEncoder, KeyEvent};
use muxterm_backend::{Emulation, Screen, Timeout};
use muxterm_backend::ansi::mode::TermMode;

pub const LINES: usize = 24;
pub const COLUMNS: usize = 80;

/// A cell written through `input`, with the attributes active at the
/// time of the write.
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenCell {
    pub c: char,
    pub attrs: Vec<Attr>,
}

/// A small in-memory grid that records everything interesting.
#[derive(Default)]
pub struct MockScreen {
    pub grid: Grid,
    pub saved_grid: Option<Grid>,
    pub saved_cursor: (i32, usize),
    pub alt: bool,

    pub cells: Vec<WrittenCell>,
    pub attrs: Vec<Attr>,
    pub graphics: Vec<(GraphicData, bool)>,
    pub prompts: Vec<PromptMark>,
    pub scrolling_region: Option<(usize, Option<usize>)>,
    pub resized_columns: Option<usize>,
    pub resets: usize,
}

#[derive(Clone)]
pub struct Grid {
    pub rows: Vec<Vec<char>>,
    pub cursor: (i32, usize),
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            rows: vec![vec![' '; COLUMNS]; LINES],
            cursor: (0, 0),
        }
    }
}

impl MockScreen {
    pub fn char_at(&self, line: usize, col: usize) -> char {
        self.grid.rows[line][col]
    }

    pub fn text(&self, line: usize) -> String {
        self.grid.rows[line].iter().collect::<String>().trim_end().to_owned()
    }
}

impl Screen for MockScreen {
    fn input(&mut self, c: char) {
        let (line, col) = self.grid.cursor;
        if (0..LINES as i32).contains(&line) && col < COLUMNS {
            self.grid.rows[line as usize][col] = c;
        }
        self.grid.cursor.1 = (col + 1).min(COLUMNS);
        self.cells.push(WrittenCell {
            c,
            attrs: self.attrs.clone(),
        });
    }

    fn goto(&mut self, line: i32, col: usize) {
        self.grid.cursor = (
            line.clamp(0, LINES as i32 - 1),
            col.min(COLUMNS - 1),
        );
    }

    fn goto_line(&mut self, line: i32) {
        self.grid.cursor.0 = line.clamp(0, LINES as i32 - 1);
    }

    fn goto_col(&mut self, col: usize) {
        self.grid.cursor.1 = col.min(COLUMNS - 1);
    }

    fn move_up(&mut self, rows: usize) {
        self.grid.cursor.0 = (self.grid.cursor.0 - rows as i32).max(0);
    }

    fn move_down(&mut self, rows: usize) {
        self.grid.cursor.0 = (self.grid.cursor.0 + rows as i32).min(LINES as i32 - 1);
    }

    fn move_forward(&mut self, cols: usize) {
        self.grid.cursor.1 = (self.grid.cursor.1 + cols).min(COLUMNS - 1);
    }

    fn move_backward(&mut self, cols: usize) {
        self.grid.cursor.1 = self.grid.cursor.1.saturating_sub(cols);
    }

    fn carriage_return(&mut self) {
        self.grid.cursor.1 = 0;
    }

    fn linefeed(&mut self) {
        if self.grid.cursor.0 < LINES as i32 - 1 {
            self.grid.cursor.0 += 1;
        }
    }

    fn backspace(&mut self) {
        self.grid.cursor.1 = self.grid.cursor.1.saturating_sub(1);
    }

    fn terminal_attribute(&mut self, attr: Attr) {
        if attr == Attr::Reset {
            self.attrs.clear();
        } else {
            self.attrs.push(attr);
        }
    }

    fn save_cursor(&mut self) {
        self.saved_cursor = self.grid.cursor;
    }

    fn restore_cursor(&mut self) {
        self.grid.cursor = self.saved_cursor;
    }

    fn clear_screen(&mut self, mode: ClearMode) {
        if mode == ClearMode::All {
            for row in &mut self.grid.rows {
                row.fill(' ');
            }
        }
    }

    fn clear_line(&mut self, mode: LineClearMode) {
        let (line, col) = self.grid.cursor;
        let row = &mut self.grid.rows[line as usize];
        match mode {
            LineClearMode::Right => row[col..].fill(' '),
            LineClearMode::Left => row[..=col].fill(' '),
            LineClearMode::All => row.fill(' '),
        }
    }

    fn swap_alt_screen(&mut self, alt: bool) {
        if alt == self.alt {
            return;
        }
        self.alt = alt;
        if alt {
            self.saved_grid = Some(std::mem::take(&mut self.grid));
        } else if let Some(grid) = self.saved_grid.take() {
            self.grid = grid;
        }
    }

    fn set_scrolling_region(&mut self, top: usize, bottom: Option<usize>) {
        self.scrolling_region = Some((top, bottom));
    }

    fn resize_columns(&mut self, columns: usize) {
        self.resized_columns = Some(columns);
    }

    fn reset_state(&mut self, _preserve_prompt: bool) {
        self.resets += 1;
        self.grid = Grid::default();
        self.saved_grid = None;
        self.alt = false;
        self.attrs.clear();
    }

    fn semantic_prompt(&mut self, mark: PromptMark) {
        self.prompts.push(mark);
    }

    fn commit_graphic(&mut self, graphic: GraphicData, scrolls: bool) {
        self.graphics.push((graphic, scrolls));
    }

    fn screen_lines(&self) -> usize {
        LINES
    }

    fn columns(&self) -> usize {
        COLUMNS
    }

    fn cursor_position(&self) -> (i32, usize) {
        self.grid.cursor
    }

    fn cell_size_pixels(&self) -> (usize, usize) {
        (10, 20)
    }

    fn char_at(&self, line: i32, col: usize) -> char {
        if (0..LINES as i32).contains(&line) && col < COLUMNS {
            self.grid.rows[line as usize][col]
        } else {
            ' '
        }
    }
}

/// Listener collecting every event.
#[derive(Clone, Default)]
pub struct Recorder {
    pub events: Rc<RefCell<Vec<TermEvent>>>,
}

impl EventListener for Recorder {
    fn send_event(&self, event: TermEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Recorder {
    pub fn take(&self) -> Vec<TermEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn written(&self) -> Vec<u8> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                TermEvent::PtyWrite(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Timeout driven by hand from the tests.
#[derive(Default)]
pub struct ManualTimeout {
    pub armed: RefCell<Option<Duration>>,
}

impl Timeout for ManualTimeout {
    fn set_timeout(&mut self, duration: Duration) {
        *self.armed.borrow_mut() = Some(duration);
    }

    fn clear_timeout(&mut self) {
        *self.armed.borrow_mut() = None;
    }

    fn pending_timeout(&self) -> bool {
        self.armed.borrow().is_some()
    }
}

pub type TestEmulation = Emulation<MockScreen, Recorder, ManualTimeout>;

pub fn emulation() -> (TestEmulation, Recorder) {
    let recorder = Recorder::default();
    let emulation = Emulation::new(MockScreen::default(), recorder.clone());
    (emulation, recorder)
}

/// A key encoder good enough for the tests: printable characters pass
/// through, cursor keys honor the application mode bit.
pub struct AsciiEncoder;

impl KeyEncoder for AsciiEncoder {
    fn encode(&self, event: &KeyEvent, mode: TermMode) -> Vec<u8> {
        use muxterm_backend::input::Key;

        match event.key {
            Key::Char(c) => c.to_string().into_bytes(),
            Key::Enter => b"\r".to_vec(),
            Key::Up | Key::Down | Key::Left | Key::Right => {
                let arrow = match event.key {
                    Key::Up => b'A',
                    Key::Down => b'B',
                    Key::Right => b'C',
                    _ => b'D',
                };
                let mut bytes = if mode.contains(TermMode::APP_CURSOR) {
                    b"\x1bO".to_vec()
                } else {
                    b"\x1b[".to_vec()
                };
                bytes.push(arrow);
                bytes
            }
            _ => Vec::new(),
        }
    }
}
