use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use padseq::shared::InputEvent;

use super::mode::TuiState;

// poll for input from tui, tracks local toggles in tuistate,
// resolves keys to input events for the middle layer to handle
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(vec![InputEvent::Quit]); // raw mode swallows SIGINT
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    let step = ts.trim_step();
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],

        // any keys on the 4x4 grid pad
        KeyCode::Char(c @ ('1' | '2' | '3' | '4'
            | 'q' | 'w' | 'e' | 'r'
            | 'a' | 's' | 'd' | 'f'
            | 'z' | 'x' | 'c' | 'v')) => match char_to_pad(c) {
            Some(n) => vec![InputEvent::TapPad(n)],
            None => vec![],
        },

        // transport
        KeyCode::Char(' ') => vec![InputEvent::PreviewPress],
        KeyCode::Char('.') => vec![InputEvent::StopPress],
        KeyCode::Char('b') => vec![InputEvent::RecordPress],

        // sequence list
        KeyCode::Char('j') | KeyCode::Down => vec![InputEvent::SelectSequence(1)],
        KeyCode::Char('k') | KeyCode::Up => vec![InputEvent::SelectSequence(-1)],
        KeyCode::Char('p') | KeyCode::Enter => {
            if ts.replaying {
                vec![InputEvent::StopPress]
            } else {
                vec![InputEvent::PlaySequence]
            }
        }
        KeyCode::Char('o') => vec![InputEvent::ExportSequence],
        KeyCode::Backspace | KeyCode::Delete => vec![InputEvent::DeleteSequence],

        // trim handles, lowercase = left and the key next to it = right
        KeyCode::Char('[') => vec![InputEvent::AdjustTrimStart(-step)],
        KeyCode::Char(']') => vec![InputEvent::AdjustTrimStart(step)],
        KeyCode::Char('-') => vec![InputEvent::AdjustTrimEnd(-step)],
        KeyCode::Char('=') => vec![InputEvent::AdjustTrimEnd(step)],
        KeyCode::Char(',') => vec![InputEvent::ShiftTrim(-step)],
        KeyCode::Char(';') => vec![InputEvent::ShiftTrim(step)],
        KeyCode::Char('0') => vec![InputEvent::ResetTrim],
        KeyCode::Tab => {
            ts.fine_trim = !ts.fine_trim;
            vec![]
        }

        KeyCode::Char('n') => vec![InputEvent::NextPreset],
        KeyCode::Char('N') => vec![InputEvent::PrevPreset],

        _ => vec![],
    }
}

// convert char to pad index
fn char_to_pad(c: char) -> Option<u8> {
    let idx = match c {
        '1' => 0, '2' => 1, '3' => 2, '4' => 3,
        'q' => 4, 'w' => 5, 'e' => 6, 'r' => 7,
        'a' => 8, 's' => 9, 'd' => 10, 'f' => 11,
        'z' => 12, 'x' => 13, 'c' => 14, 'v' => 15,
        _ => return None,
    };
    Some(idx)
}
