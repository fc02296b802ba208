use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use runner_service::RunOutcome;

use crate::app::OutputKind;

pub fn render_header(title: &str, frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(title)
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

pub fn render_footer(text: &str, frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(footer, area);
}

/// Single-line text input drawn over whatever is below it
pub fn render_input(title: &str, value: &str, hint: &str, frame: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::styled(format!("{}_", value), Style::default().fg(Color::White)),
        ]),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray))),
    ];
    let input = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(Clear, area);
    frame.render_widget(input, area);
}

pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        format!("{}m {:.0}s", mins, secs - mins * 60.0)
    }
}

pub fn output_color(kind: &OutputKind) -> Color {
    match kind {
        OutputKind::Success => Color::Green,
        OutputKind::Failure => Color::Red,
        OutputKind::Error => Color::Red,
        OutputKind::Warning => Color::Yellow,
        OutputKind::JobHeader => Color::Cyan,
        OutputKind::Info => Color::Gray,
        OutputKind::Output => Color::White,
    }
}

pub fn outcome_color(outcome: &RunOutcome) -> Color {
    match outcome {
        RunOutcome::Success => Color::Green,
        RunOutcome::CompletedWithWarnings => Color::Yellow,
        RunOutcome::Cancelled => Color::DarkGray,
        RunOutcome::Failed(_) | RunOutcome::LaunchFailed => Color::Red,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(2.34), "2.3s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }
}
