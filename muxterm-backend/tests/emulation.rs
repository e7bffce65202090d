//! End-to-end scenarios for the terminal side of the emulation.

mod common;

use common::{emulation, AsciiEncoder};

use muxterm_backend::ansi::attr::Attr;
use muxterm_backend::ansi::mode::TermMode;
use muxterm_backend::colors::{AnsiColor, ColorRgb, NamedColor};
use muxterm_backend::event::TermEvent;
use muxterm_backend::input::{
    Key, KeyEvent, Modifiers, MouseButton, MouseEventType,
};
use muxterm_backend::Timeout;

#[test]
fn bold_red_cell() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[31;1mA");

    let cells = &emulation.screen().cells;
    assert_eq!(cells.len(), 1);
    assert_eq!(cells[0].c, 'A');
    assert_eq!(
        cells[0].attrs,
        vec![
            Attr::Foreground(AnsiColor::Named(NamedColor::Red)),
            Attr::Bold,
        ]
    );
    assert_eq!(emulation.screen().grid.cursor, (0, 1));
}

#[test]
fn truecolor_sgr_colon_form() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[38:2:17:128:250mX");

    let cells = &emulation.screen().cells;
    assert_eq!(
        cells[0].attrs,
        vec![Attr::Foreground(AnsiColor::Spec(ColorRgb::new(17, 128, 250)))]
    );
}

#[test]
fn truecolor_sgr_semicolon_form() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[48;2;1;2;3m\x1b[38;5;17mX");

    let cells = &emulation.screen().cells;
    assert_eq!(
        cells[0].attrs,
        vec![
            Attr::Background(AnsiColor::Spec(ColorRgb::new(1, 2, 3))),
            Attr::Foreground(AnsiColor::Indexed(17)),
        ]
    );
}

#[test]
fn alt_screen_round_trip() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"before");
    let cursor_before = emulation.screen().grid.cursor;

    emulation.receive(b"\x1b[?1049h\x1b[HX\x1b[?1049l");

    assert!(!emulation.mode().contains(TermMode::ALT_SCREEN));
    assert_eq!(emulation.screen().text(0), "before");
    assert_eq!(emulation.screen().grid.cursor, cursor_before);
}

#[test]
fn cursor_position_is_one_based() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[3;2H");
    assert_eq!(emulation.screen().grid.cursor, (2, 1));

    // Out-of-range coordinates clip to the screen.
    emulation.receive(b"\x1b[999;999H");
    assert_eq!(emulation.screen().grid.cursor, (23, 79));
}

#[test]
fn title_updates_coalesce_and_last_value_wins() {
    let (mut emulation, recorder) = emulation();

    emulation.receive(b"\x1b]0;first\x07");
    assert!(emulation.session_attribute_timer().pending_timeout());
    emulation.receive(b"\x1b]0;hello\x07\x1b]1;icon\x07");

    // Nothing emitted before the flush.
    assert!(recorder.take().is_empty());

    emulation.flush_session_attributes();
    assert_eq!(
        recorder.take(),
        vec![
            TermEvent::SessionAttribute {
                id: 0,
                value: "hello".into()
            },
            TermEvent::SessionAttribute {
                id: 1,
                value: "icon".into()
            },
        ]
    );
    assert!(!emulation.session_attribute_timer().pending_timeout());
}

#[test]
fn osc_string_terminator_variant() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b]2;st-form\x1b\\");
    emulation.flush_session_attributes();

    assert_eq!(
        recorder.take(),
        vec![TermEvent::SessionAttribute {
            id: 2,
            value: "st-form".into()
        }]
    );
}

#[test]
fn primary_device_attributes() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[c");
    assert_eq!(recorder.written(), b"\x1b[?62;4;6;22c");
}

#[test]
fn cursor_position_report() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[5;10H\x1b[6n");
    assert_eq!(recorder.written(), b"\x1b[5;10R");
}

#[test]
fn checksum_request_reports_rectangle() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"AB");

    // Rectangle covering "AB": sum = 0x41 + 0x42, negated.
    emulation.receive(b"\x1b[1;1;1;1;1;2*y");
    let expected_sum = (0x41u16 + 0x42).wrapping_neg();
    assert_eq!(
        recorder.written(),
        format!("\x1bP1!~{:04X}\x1b\\", expected_sum).into_bytes()
    );
}

#[test]
fn sixel_image_committed_at_cursor() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1bPq\"1;1;2;2#0;2;100;0;0~~\x1b\\");

    let screen = emulation.screen();
    assert_eq!(screen.graphics.len(), 1);
    let (graphic, scrolls) = &screen.graphics[0];
    assert_eq!((graphic.width, graphic.height), (2, 6));
    assert_eq!(&graphic.pixels[..4], &[255, 0, 0, 255]);
    assert!(*scrolls);

    // Scrolling mode advances the cursor past the image.
    assert_eq!(screen.grid.cursor, (1, 0));
}

#[test]
fn sixel_display_mode_keeps_cursor() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[?80h\x1bPq\"1;1;2;2#0;2;100;0;0~~\x1b\\");

    let screen = emulation.screen();
    assert_eq!(screen.graphics.len(), 1);
    assert!(!screen.graphics[0].1);
    assert_eq!(screen.grid.cursor, (0, 0));
}

#[test]
fn sixel_background_handling() {
    // P2 = 1 keeps untouched pixels transparent.
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1bP0;1q\"1;1#0;2;0;0;100@\x1b\\");
    let (graphic, _) = &emulation.screen().graphics[0];
    assert!(!graphic.is_opaque);

    // Default P2 fills the background from register zero.
    let (mut emulation2, _recorder2) = common::emulation();
    emulation2.receive(b"\x1bPq\"1;1#1;2;0;0;100@\x1b\\");
    let (graphic, _) = &emulation2.screen().graphics[0];
    assert!(graphic.is_opaque);
}

#[test]
fn charset_line_drawing() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b(0qqx\x1b(Bq");

    let written: String = emulation.screen().cells.iter().map(|c| c.c).collect();
    assert_eq!(written, "──│q");
}

#[test]
fn shift_out_uses_g1() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b)0q\x0eq\x0fq");

    let written: String = emulation.screen().cells.iter().map(|c| c.c).collect();
    assert_eq!(written, "q─q");
}

#[test]
fn deccolm_respects_permission_gate() {
    let (mut emulation, _recorder) = emulation();

    emulation.receive(b"\x1b[?3h");
    assert_eq!(emulation.screen().resized_columns, None);

    emulation.receive(b"\x1b[?40h\x1b[?3h");
    assert_eq!(emulation.screen().resized_columns, Some(132));
    assert!(emulation.mode().contains(TermMode::COLUMN_132));

    emulation.receive(b"\x1b[?3l");
    assert_eq!(emulation.screen().resized_columns, Some(80));
}

#[test]
fn bracketed_paste_wraps_text() {
    let (mut emulation, recorder) = emulation();

    emulation.send_text("plain");
    assert_eq!(recorder.written(), b"plain");
    recorder.take();

    emulation.receive(b"\x1b[?2004h");
    emulation.send_text("pasted");
    assert_eq!(recorder.written(), b"\x1b[200~pasted\x1b[201~");
}

#[test]
fn focus_reports_follow_mode() {
    let (mut emulation, recorder) = emulation();

    emulation.focus_changed(true);
    assert!(recorder.written().is_empty());

    emulation.receive(b"\x1b[?1004h");
    emulation.focus_changed(true);
    emulation.focus_changed(false);
    assert_eq!(recorder.written(), b"\x1b[I\x1b[O");
}

#[test]
fn key_encoding_sees_mode_bits() {
    let (mut emulation, recorder) = emulation();
    let up = KeyEvent {
        key: Key::Up,
        mods: Modifiers::empty(),
    };

    emulation.send_key_event(&up, &AsciiEncoder);
    assert_eq!(recorder.written(), b"\x1b[A");
    recorder.take();

    emulation.receive(b"\x1b[?1h");
    emulation.send_key_event(&up, &AsciiEncoder);
    assert_eq!(recorder.written(), b"\x1bOA");
}

#[test]
fn sgr_mouse_through_emulation() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[?1000h\x1b[?1006h");

    emulation.send_mouse_event(
        MouseButton::Left,
        MouseEventType::Press,
        Modifiers::empty(),
        3,
        7,
    );
    assert_eq!(recorder.written(), b"\x1b[<0;3;7M");
}

#[test]
fn alternate_scroll_on_alt_screen() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[?1049h\x1b[?1007h");
    recorder.take();

    emulation.send_mouse_event(
        MouseButton::WheelUp,
        MouseEventType::Press,
        Modifiers::empty(),
        1,
        1,
    );
    assert_eq!(recorder.written(), b"\x1b[A");
}

#[test]
fn decrqm_reports_mode_state() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[?2004$p");
    assert_eq!(recorder.written(), b"\x1b[?2004;2$y");
    recorder.take();

    emulation.receive(b"\x1b[?2004h\x1b[?2004$p");
    assert_eq!(recorder.written(), b"\x1b[?2004;1$y");
}

#[test]
fn mode_save_restore_round_trip() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[?1h\x1b[?s\x1b[?1l");
    assert!(!emulation.mode().contains(TermMode::APP_CURSOR));

    emulation.receive(b"\x1b[?r");
    assert!(emulation.mode().contains(TermMode::APP_CURSOR));
}

#[test]
fn soft_reset_keeps_screen_contents() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"keepme\x1b[?6h\x1b[!p");

    assert_eq!(emulation.screen().text(0), "keepme");
    assert!(!emulation.mode().contains(TermMode::ORIGIN));
    assert_eq!(emulation.screen().resets, 0);
}

#[test]
fn hard_reset_clears_everything() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b[?40h\x1b[?2004hgone\x1bc");

    assert_eq!(emulation.screen().resets, 1);
    assert!(!emulation.mode().contains(TermMode::BRACKETED_PASTE));
    // The 132-column permission survives RIS.
    assert!(emulation.mode().contains(TermMode::ALLOW_COLUMN_CHANGE));
}

#[test]
fn reset_is_idempotent() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"state\x1b]0;title\x07");

    emulation.reset(false, false);
    let mode_once = emulation.mode();
    let resets_once = emulation.screen().resets;
    recorder.take();

    emulation.reset(false, false);
    assert_eq!(emulation.mode(), mode_once);
    assert_eq!(emulation.screen().resets, resets_once + 1);
    assert!(recorder.take().is_empty());
}

#[test]
fn vt52_mode_round_trip() {
    let (mut emulation, recorder) = emulation();

    // Drop to VT52, draw, position, identify, and return to ANSI.
    emulation.receive(b"\x1b[?2lA\x1bY\x22\x25B\x1bZ\x1b<\x1b[31mC");

    let screen = emulation.screen();
    // 'A' written before the cursor move, 'B' after ESC Y row 2 col 5.
    assert_eq!(screen.cells[0].c, 'A');
    assert_eq!(screen.cells[1].c, 'B');
    assert_eq!(screen.char_at(2, 5), 'B');

    // VT52 identify response.
    assert_eq!(recorder.written(), b"\x1b/Z");

    // Back in ANSI mode, CSI works again.
    assert!(emulation.mode().contains(TermMode::ANSI));
    assert_eq!(
        screen.cells[2].attrs,
        vec![Attr::Foreground(AnsiColor::Named(NamedColor::Red))]
    );
}

#[test]
fn osc_notification_event() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b]777;notify;Build done;All tests passed\x07");

    assert_eq!(
        recorder.take(),
        vec![TermEvent::Notification {
            title: "Build done".into(),
            body: "All tests passed".into()
        }]
    );
}

#[test]
fn semantic_prompt_marks() {
    use muxterm_backend::ansi::PromptMark;

    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"\x1b]133;A\x07\x1b]133;B\x07\x1b]133;C\x07\x1b]133;D;1\x07");

    assert_eq!(
        emulation.screen().prompts,
        vec![
            PromptMark::PromptStart,
            PromptMark::CommandStart,
            PromptMark::OutputStart,
            PromptMark::CommandFinished(Some(1)),
        ]
    );
}

#[test]
fn palette_set_and_query() {
    let (mut emulation, recorder) = emulation();

    emulation.receive(b"\x1b]4;17;rgb:10/20/30\x07");
    assert_eq!(
        recorder.take(),
        vec![TermEvent::PaletteUpdated {
            index: 17,
            color: ColorRgb::new(0x10, 0x20, 0x30)
        }]
    );

    emulation.receive(b"\x1b]4;17;?\x07");
    assert_eq!(recorder.written(), b"\x1b]4;17;rgb:1010/2020/3030\x07");
    recorder.take();

    emulation.receive(b"\x1b]104\x07");
    assert_eq!(recorder.take(), vec![TermEvent::PaletteReset(None)]);
}

#[test]
fn window_report_operations() {
    let (mut emulation, recorder) = emulation();
    emulation.receive(b"\x1b[18t");
    assert_eq!(recorder.written(), b"\x1b[8;24;80t");
    recorder.take();

    emulation.receive(b"\x1b[14t");
    assert_eq!(recorder.written(), b"\x1b[4;480;800t");
    recorder.take();

    // Destructive resize requests are ignored.
    emulation.receive(b"\x1b[4;100;200t");
    assert!(recorder.written().is_empty());
}

#[test]
fn repeat_preceding_character() {
    let (mut emulation, _recorder) = emulation();
    emulation.receive(b"x\x1b[3b");

    let written: String = emulation.screen().cells.iter().map(|c| c.c).collect();
    assert_eq!(written, "xxxx");
}
