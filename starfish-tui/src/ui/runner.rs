use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap},
    Frame,
};

use runner_service::RunState;

use crate::app::{App, OutputKind, OutputLine};
use crate::ui::{components, layout};

pub fn render(app: &App, frame: &mut Frame) {
    let chunks = layout::create_runner_layout(frame.area());

    // Header
    components::render_header(
        &format!("Starfish Runner - {}", app.status.status_text),
        frame,
        chunks[0],
    );

    // Progress bar
    render_progress(app, frame, chunks[1]);

    // Split main area: queue on left, console on right
    let main_sections = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[2]);

    render_queue_panel(app, frame, main_sections[0]);
    render_output_panel(&app.output_lines, frame, main_sections[1]);

    // Notice line: continuation question wins over other notices
    if let Some(question) = app.continuation_question() {
        let line = Paragraph::new(Span::styled(
            question,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(line, chunks[3]);
    } else if let Some(notice) = &app.notice {
        let color = if notice.is_error {
            Color::Red
        } else {
            Color::Yellow
        };
        frame.render_widget(
            Paragraph::new(Span::styled(notice.text.as_str(), Style::default().fg(color))),
            chunks[3],
        );
    }

    // Footer
    let footer = if app.status.continuation_offered {
        "y: Continue queue | n: Pause queue | l: View Logs | q: Quit"
    } else if app.status.is_active() {
        "x: Stop | p: Pause | a: Add | c: Clear queue | l: View Logs | q: Quit"
    } else {
        "a: Add | s: Start | c: Clear queue | l: View Logs | q: Quit"
    };
    components::render_footer(footer, frame, chunks[4]);
}

fn render_progress(app: &App, frame: &mut Frame, area: Rect) {
    let status = &app.status;

    let (label, color) = match (&status.state, &status.current_job) {
        (RunState::Running, Some(job)) => (
            format!("{} {}%", job.display_name, status.last_progress),
            Color::Cyan,
        ),
        (RunState::Stopping, Some(job)) => {
            (format!("Stopping {}...", job.display_name), Color::Yellow)
        }
        _ => match &app.last_finished {
            Some(finished) => (
                format!(
                    "{}: {} ({})",
                    finished.name,
                    finished.outcome.status_text(),
                    components::format_duration(finished.duration.as_secs_f64())
                ),
                components::outcome_color(&finished.outcome),
            ),
            None => ("Idle".to_string(), Color::DarkGray),
        },
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(color))
        .label(label)
        .ratio(app.execution_progress().clamp(0.0, 1.0));
    frame.render_widget(gauge, area);
}

fn render_queue_panel(app: &App, frame: &mut Frame, area: Rect) {
    let mut items: Vec<ListItem> = Vec::new();

    if let Some(job) = &app.status.current_job {
        items.push(ListItem::new(Line::from(vec![
            Span::styled("~ ", Style::default().fg(Color::Cyan)),
            Span::styled(
                job.display_name.as_str(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ])));
    }

    for (i, job) in app.status.queued.iter().enumerate() {
        items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
            Span::styled(job.display_name.as_str(), Style::default().fg(Color::White)),
            Span::styled(
                format!("  {}", job.working_directory.display()),
                Style::default().fg(Color::DarkGray),
            ),
        ])));
    }

    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "Queue is empty. Press a to add a simulation file.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Queue ({})", app.status.queued.len()))
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(list, area);
}

fn render_output_panel(lines: &[OutputLine], frame: &mut Frame, area: Rect) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let start = lines.len().saturating_sub(visible_height);

    let visible_lines: Vec<Line> = lines
        .iter()
        .skip(start)
        .map(|line| {
            let modifier = match line.kind {
                OutputKind::JobHeader
                | OutputKind::Success
                | OutputKind::Failure => Modifier::BOLD,
                _ => Modifier::empty(),
            };
            Line::from(Span::styled(
                line.text.as_str(),
                Style::default()
                    .fg(components::output_color(&line.kind))
                    .add_modifier(modifier),
            ))
        })
        .collect();

    let output = Paragraph::new(visible_lines)
        .block(Block::default().borders(Borders::ALL).title("Console"))
        .wrap(Wrap { trim: false });
    frame.render_widget(output, area);
}
