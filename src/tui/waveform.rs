use padseq::shared::WaveformView;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

pub fn draw_waveform(frame: &mut Frame, area: Rect, view: Option<&WaveformView>, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title.to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(view) = view else {
        let empty = Paragraph::new("no sample")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    };
    let lines = waveform_lines(view, inner.width as usize, inner.height as usize);
    frame.render_widget(Paragraph::new(lines), inner);
}

// One line per text row, top row = +1.0. Columns inside the trim window are
// bright, the rest dim, and the playhead column is drawn over everything.
fn waveform_lines(view: &WaveformView, width: usize, height: usize) -> Vec<Line<'static>> {
    if width == 0 || height == 0 || view.peaks.is_empty() || view.duration_sec <= 0.0 {
        return Vec::new();
    }
    let columns: Vec<(f32, f32)> = (0..width)
        .map(|x| view.peaks[x * view.peaks.len() / width])
        .collect();
    let col_of = |t: f64| ((t / view.duration_sec) * width as f64).floor() as i64;
    let trim = col_of(view.trim_start_sec)..col_of(view.trim_end_sec).max(col_of(view.trim_start_sec) + 1);
    let playhead = view.playhead_sec.map(col_of);

    (0..height)
        .map(|row| {
            let top = 1.0 - row as f32 * 2.0 / height as f32;
            let bottom = 1.0 - (row + 1) as f32 * 2.0 / height as f32;
            let spans: Vec<Span<'static>> = columns
                .iter()
                .enumerate()
                .map(|(x, &(lo, hi))| {
                    let x = x as i64;
                    if playhead == Some(x) {
                        return Span::styled("│", Style::default().fg(Color::Yellow));
                    }
                    let filled = hi >= bottom && lo <= top;
                    let color = if trim.contains(&x) { Color::Cyan } else { Color::DarkGray };
                    Span::styled(if filled { "█" } else { " " }, Style::default().fg(color))
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}
