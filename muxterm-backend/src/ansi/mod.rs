pub mod attr;
pub mod charset;
pub mod control;
pub mod graphics;
pub mod iterm2_image_protocol;
pub mod mode;
pub mod sixel;

/// Terminal cursor rendering shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CursorShape {
    #[default]
    Block,
    Underline,
    Beam,
}

/// Mode for clearing the terminal.
///
/// Relative to the cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClearMode {
    /// Clear below the cursor.
    Below,
    /// Clear above the cursor.
    Above,
    /// Clear the entire terminal.
    All,
    /// Clear 'saved' lines (scrollback).
    Saved,
}

/// Mode for clearing a line.
///
/// Relative to the cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineClearMode {
    /// Clear right of the cursor.
    Right,
    /// Clear left of the cursor.
    Left,
    /// Clear the entire line.
    All,
}

/// Mode for clearing tab stops.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TabulationClearMode {
    /// Clear the stop under the cursor.
    Current,
    /// Clear all stops.
    All,
}

/// Semantic prompt marks (OSC 133).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PromptMark {
    /// `A` - start of a fresh prompt line.
    PromptStart,
    /// `B` - start of user command input.
    CommandStart,
    /// `C` - command has been accepted, output follows.
    OutputStart,
    /// `D` - command finished, with optional exit code.
    CommandFinished(Option<i32>),
}

/// An OSC 8 hyperlink attached to subsequent cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub id: Option<String>,
    pub uri: String,
}

impl Hyperlink {
    pub fn new(id: Option<&str>, uri: &str) -> Self {
        Self {
            id: id.map(str::to_owned),
            uri: uri.to_owned(),
        }
    }
}
