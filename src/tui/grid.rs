use padseq::shared::{GRID_COLS, LedState};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

const PAD_LABELS: [&str; 16] = [
    "1", "2", "3", "4",
    "Q", "W", "E", "R",
    "A", "S", "D", "F",
    "Z", "X", "C", "V",
];

fn led_style(led: LedState, blink_on: bool) -> Style {
    match led {
        LedState::Off => Style::default().fg(Color::DarkGray),
        LedState::Loading if blink_on => Style::default().fg(Color::Yellow),
        LedState::Loading => Style::default().fg(Color::DarkGray),
        LedState::Loaded => Style::default().fg(Color::Gray),
        LedState::Failed => Style::default().fg(Color::Red),
        LedState::Selected => Style::default().fg(Color::LightMagenta),
        LedState::Hit => Style::default()
            .fg(Color::White)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    }
}

// pads beyond the keyboard grid get a number instead of a key
fn pad_label(idx: usize) -> String {
    PAD_LABELS
        .get(idx)
        .map(|s| s.to_string())
        .unwrap_or_else(|| (idx + 1).to_string())
}

pub fn draw_pad_grid(frame: &mut Frame, area: Rect, leds: &[LedState], blink_on: bool) {
    if leds.is_empty() {
        return;
    }
    let rows = leds.len().div_ceil(GRID_COLS);
    let row_constraints = vec![Constraint::Ratio(1, rows as u32); rows];
    let col_constraints = [Constraint::Ratio(1, GRID_COLS as u32); GRID_COLS];

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(area);

    for (row_idx, row_area) in row_areas.iter().enumerate() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(col_constraints)
            .split(*row_area);

        for (col_idx, cell_area) in cols.iter().enumerate() {
            let pad_idx = row_idx * GRID_COLS + col_idx;
            let Some(&led) = leds.get(pad_idx) else {
                continue;
            };
            let style = led_style(led, blink_on);
            let block = Block::default().borders(Borders::ALL).border_style(style);
            let label = Paragraph::new(pad_label(pad_idx))
                .alignment(Alignment::Center)
                .style(style)
                .block(block);
            frame.render_widget(label, *cell_area);
        }
    }
}
