use padseq::shared::DisplayState;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph};

use super::grid::draw_pad_grid;
use super::waveform::draw_waveform;

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // preset + status line
            Constraint::Length(10), // waveform with trim window
            Constraint::Min(12), // pad grid + sequence list
            Constraint::Length(1), // key hints
        ])
        .split(area);

    draw_header(frame, sections[0], state, blink_on);
    let title = format!("Pad {}", state.pad_name);
    draw_waveform(frame, sections[1], state.waveform.as_ref(), &title);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(sections[2]);
    draw_pad_grid(frame, body[0], &state.leds, blink_on);
    draw_sequences(frame, body[1], state);

    let hints = Paragraph::new(
        "pads 1-v  space preview  b rec  p play  o export  [ ] - = , ; trim  n/N preset  esc quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, sections[3]);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let mut spans = vec![Span::styled(
        state.preset_name.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if !state.load_report.is_empty() {
        spans.push(Span::raw(format!("  {}", state.load_report)));
    }
    if state.recording {
        let style = if blink_on {
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("  ● REC {} hits", state.recorded_hits), style));
    }
    if let Some(w) = &state.waveform {
        spans.push(Span::raw(format!(
            "  trim {:.3}s - {:.3}s of {:.3}s",
            w.trim_start_sec, w.trim_end_sec, w.duration_sec
        )));
    }

    let block = Block::default().borders(Borders::ALL).title("padseq");
    let text = vec![
        Line::from(spans),
        Line::from(Span::styled(
            state.status_text.clone(),
            Style::default().fg(Color::Cyan),
        )),
    ];
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Paragraph::new(text), inner);
}

fn draw_sequences(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = state
        .sequences
        .iter()
        .map(|name| ListItem::new(name.clone()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Sequences"))
        .highlight_style(Style::default().fg(Color::Black).bg(Color::LightMagenta));
    let mut list_state = ListState::default();
    list_state.select(state.selected_sequence);
    frame.render_stateful_widget(list, chunks[0], &mut list_state);

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Replay"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(if state.replaying { state.replay_progress.clamp(0.0, 1.0) } else { 0.0 });
    frame.render_widget(gauge, chunks[1]);
}
