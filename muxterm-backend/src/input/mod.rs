//! Encoding of keyboard and mouse input into bytes for the child
//! process.
//!
//! Key-to-bytes translation itself lives outside the crate behind
//! [`KeyEncoder`]; this module carries the event types for that seam and
//! the mouse protocol encoders, which depend only on the mode bits.

use bitflags::bitflags;

use crate::ansi::mode::TermMode;

bitflags! {
    /// Keyboard modifiers held during an input event.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT   = 1;
        const ALT     = 2;
        const CONTROL = 4;
    }
}

/// Keys the emulation forwards to the external translator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: Modifiers,
}

/// External keyboard translator.
///
/// The emulation passes its current mode bits so application cursor
/// keys, the keypad mode, and similar toggles can influence the chosen
/// byte sequence.
pub trait KeyEncoder {
    fn encode(&self, event: &KeyEvent, mode: TermMode) -> Vec<u8>;
}

/// Mouse buttons as reported to the child.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    /// Motion without any button held.
    None,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
}

impl MouseButton {
    fn code(self) -> u8 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::None => 3,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
            MouseButton::WheelLeft => 66,
            MouseButton::WheelRight => 67,
        }
    }

    fn is_wheel(self) -> bool {
        matches!(
            self,
            MouseButton::WheelUp
                | MouseButton::WheelDown
                | MouseButton::WheelLeft
                | MouseButton::WheelRight
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MouseEventType {
    Press,
    Release,
    Motion,
}

/// Encode a mouse event for the active tracking and coordinate modes.
///
/// `column` and `line` are one-based. Returns `None` when the active
/// modes do not report this event.
pub fn encode_mouse(
    button: MouseButton,
    event: MouseEventType,
    mods: Modifiers,
    column: usize,
    line: usize,
    mode: TermMode,
) -> Option<Vec<u8>> {
    // Which events get reported at all.
    if mode.contains(TermMode::MOUSE_MOTION) {
        // All motion.
    } else if mode.contains(TermMode::MOUSE_DRAG) {
        if event == MouseEventType::Motion && button == MouseButton::None {
            return None;
        }
    } else if mode.intersects(TermMode::MOUSE_REPORT_CLICK | TermMode::MOUSE_HIGHLIGHT) {
        if event == MouseEventType::Motion {
            return None;
        }
    } else {
        return None;
    }

    // Wheel buttons never report release.
    if button.is_wheel() && event == MouseEventType::Release {
        return None;
    }

    let mut cb = button.code();
    if mods.contains(Modifiers::SHIFT) {
        cb += 4;
    }
    if mods.contains(Modifiers::ALT) {
        cb += 8;
    }
    if mods.contains(Modifiers::CONTROL) {
        cb += 16;
    }
    if event == MouseEventType::Motion {
        cb += 32;
    }

    let column = column.max(1);
    let line = line.max(1);

    if mode.contains(TermMode::SGR_MOUSE) {
        let suffix = if event == MouseEventType::Release { 'm' } else { 'M' };
        return Some(
            format!("\x1b[<{};{};{}{}", cb, column, line, suffix).into_bytes(),
        );
    }

    // The legacy encodings fold release into the button code.
    if event == MouseEventType::Release {
        cb = (cb & !0b11) | 3;
    }

    if mode.contains(TermMode::URXVT_MOUSE) {
        return Some(format!("\x1b[{};{};{}M", cb + 32, column, line).into_bytes());
    }

    if mode.contains(TermMode::UTF8_MOUSE) {
        let mut bytes = b"\x1b[M".to_vec();
        bytes.push(cb + 32);
        encode_utf8_coordinate(column, &mut bytes)?;
        encode_utf8_coordinate(line, &mut bytes)?;
        return Some(bytes);
    }

    // X10 encoding tops out one byte per coordinate.
    if column > 222 || line > 222 {
        return None;
    }

    Some(vec![
        0x1b,
        b'[',
        b'M',
        cb + 32,
        (column + 32) as u8,
        (line + 32) as u8,
    ])
}

/// Extended coordinates for mode 1005: `0x20 + coord` as UTF-8.
fn encode_utf8_coordinate(coord: usize, out: &mut Vec<u8>) -> Option<()> {
    let coord = u32::try_from(coord + 32).ok()?;
    if coord > 2047 {
        return None;
    }
    let c = char::from_u32(coord)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Some(())
}

/// Mode 1007: wheel events on the alternate screen become arrow keys.
pub fn alternate_scroll_bytes(button: MouseButton, mode: TermMode) -> Option<Vec<u8>> {
    let arrow = match button {
        MouseButton::WheelUp => b'A',
        MouseButton::WheelDown => b'B',
        _ => return None,
    };

    let prefix: &[u8] = if mode.contains(TermMode::APP_CURSOR) {
        b"\x1bO"
    } else {
        b"\x1b["
    };

    let mut bytes = prefix.to_vec();
    bytes.push(arrow);
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_mode() -> TermMode {
        TermMode::default() | TermMode::MOUSE_REPORT_CLICK
    }

    #[test]
    fn x10_press_and_release() {
        let press = encode_mouse(
            MouseButton::Left,
            MouseEventType::Press,
            Modifiers::empty(),
            1,
            1,
            click_mode(),
        )
        .unwrap();
        assert_eq!(press, b"\x1b[M\x20\x21\x21");

        let release = encode_mouse(
            MouseButton::Left,
            MouseEventType::Release,
            Modifiers::empty(),
            1,
            1,
            click_mode(),
        )
        .unwrap();
        assert_eq!(release, b"\x1b[M\x23\x21\x21");
    }

    #[test]
    fn x10_coordinates_are_clamped() {
        let encoded = encode_mouse(
            MouseButton::Left,
            MouseEventType::Press,
            Modifiers::empty(),
            500,
            1,
            click_mode(),
        );
        assert_eq!(encoded, None);
    }

    #[test]
    fn sgr_reports_release_with_suffix() {
        let mode = click_mode() | TermMode::SGR_MOUSE;
        let press = encode_mouse(
            MouseButton::Right,
            MouseEventType::Press,
            Modifiers::CONTROL,
            120,
            40,
            mode,
        )
        .unwrap();
        assert_eq!(press, b"\x1b[<18;120;40M");

        let release = encode_mouse(
            MouseButton::Right,
            MouseEventType::Release,
            Modifiers::CONTROL,
            120,
            40,
            mode,
        )
        .unwrap();
        assert_eq!(release, b"\x1b[<18;120;40m");
    }

    #[test]
    fn urxvt_encoding() {
        let mode = click_mode() | TermMode::URXVT_MOUSE;
        let press = encode_mouse(
            MouseButton::Middle,
            MouseEventType::Press,
            Modifiers::empty(),
            300,
            100,
            mode,
        )
        .unwrap();
        assert_eq!(press, b"\x1b[33;300;100M");
    }

    #[test]
    fn utf8_coordinates_extend_past_one_byte() {
        let mode = click_mode() | TermMode::UTF8_MOUSE;
        let press = encode_mouse(
            MouseButton::Left,
            MouseEventType::Press,
            Modifiers::empty(),
            300,
            1,
            mode,
        )
        .unwrap();

        // 300 + 32 = 332 encodes as a two-byte UTF-8 sequence.
        let mut expected = b"\x1b[M\x20".to_vec();
        let mut buf = [0u8; 4];
        expected
            .extend_from_slice(char::from_u32(332).unwrap().encode_utf8(&mut buf).as_bytes());
        expected.push(0x21);
        assert_eq!(press, expected);
    }

    #[test]
    fn motion_requires_motion_mode() {
        let encoded = encode_mouse(
            MouseButton::Left,
            MouseEventType::Motion,
            Modifiers::empty(),
            2,
            2,
            click_mode(),
        );
        assert_eq!(encoded, None);

        let drag = click_mode() | TermMode::MOUSE_DRAG;
        assert!(encode_mouse(
            MouseButton::Left,
            MouseEventType::Motion,
            Modifiers::empty(),
            2,
            2,
            drag,
        )
        .is_some());
        assert!(encode_mouse(
            MouseButton::None,
            MouseEventType::Motion,
            Modifiers::empty(),
            2,
            2,
            drag,
        )
        .is_none());

        let all = click_mode() | TermMode::MOUSE_MOTION;
        let encoded = encode_mouse(
            MouseButton::None,
            MouseEventType::Motion,
            Modifiers::empty(),
            2,
            2,
            all,
        )
        .unwrap();
        // Button 3 (none) + 32 motion + 32 bias.
        assert_eq!(encoded, b"\x1b[M\x43\x22\x22");
    }

    #[test]
    fn alternate_scroll_translates_wheel() {
        let mode = TermMode::default();
        assert_eq!(
            alternate_scroll_bytes(MouseButton::WheelUp, mode).unwrap(),
            b"\x1b[A"
        );
        assert_eq!(
            alternate_scroll_bytes(MouseButton::WheelDown, mode | TermMode::APP_CURSOR)
                .unwrap(),
            b"\x1bOB"
        );
        assert_eq!(alternate_scroll_bytes(MouseButton::Left, mode), None);
    }
}
