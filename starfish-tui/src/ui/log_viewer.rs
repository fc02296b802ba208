use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, LogViewerState, OutputKind, OutputLine};
use crate::ui::{components, layout};

const SEARCH_FOOTER: &str = "Type to search | Enter: Jump to match | Esc: Cancel";
const BROWSE_FOOTER: &str =
    "j/k: Scroll | PgUp/PgDn: Page | /: Search | n: Next match | f: Filter job | g/G: Top/Bottom | q/Esc: Back";

pub fn render(app: &App, frame: &mut Frame) {
    let chunks = layout::create_layout(frame.area());
    let viewer = &app.log_viewer;

    let header = match &viewer.filter_job {
        Some(job) => format!("Simulation Log: {}", job),
        None => "Simulation Log".to_string(),
    };
    components::render_header(&header, frame, chunks[0]);

    let lines = app.filtered_output_lines();
    render_history(&lines, viewer, frame, chunks[1]);

    let footer = if viewer.search_active {
        SEARCH_FOOTER
    } else {
        BROWSE_FOOTER
    };
    components::render_footer(footer, frame, chunks[2]);
}

fn render_history(lines: &[&OutputLine], viewer: &LogViewerState, frame: &mut Frame, area: Rect) {
    let border = if viewer.search_active {
        Color::Yellow
    } else {
        Color::Cyan
    };
    let rows = area.height.saturating_sub(2) as usize;
    let offset = viewer.scroll_offset.min(lines.len().saturating_sub(rows));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(history_title(viewer, offset, lines.len()))
        .border_style(Style::default().fg(border));

    if lines.is_empty() {
        let empty = Paragraph::new("Nothing has been run yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let current = viewer.search_matches.get(viewer.current_match).copied();
    let show_job = viewer.filter_job.is_none();
    let visible: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(offset)
        .take(rows)
        .map(|(index, line)| {
            let highlight = if current == Some(index) {
                Some(Color::Yellow)
            } else if viewer.search_matches.contains(&index) {
                Some(Color::DarkGray)
            } else {
                None
            };
            history_line(line, highlight, show_job)
        })
        .collect();

    let history = Paragraph::new(visible)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(history, area);
}

/// Engine output is tagged with its job when lines from several jobs are shown
fn history_line(line: &OutputLine, highlight: Option<Color>, show_job: bool) -> Line<'_> {
    let mut style = Style::default().fg(components::output_color(&line.kind));
    if line.kind == OutputKind::JobHeader {
        style = style.add_modifier(Modifier::BOLD);
    }
    if let Some(bg) = highlight {
        style = style.bg(bg);
    }

    let mut spans = Vec::with_capacity(2);
    if show_job && line.kind == OutputKind::Output {
        if let Some(job) = &line.job_name {
            spans.push(Span::styled(
                format!("[{}] ", job),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    spans.push(Span::styled(line.text.as_str(), style));
    Line::from(spans)
}

fn history_title(viewer: &LogViewerState, offset: usize, total: usize) -> String {
    if viewer.search_active {
        return format!("Search: {}_", viewer.search_query);
    }
    if !viewer.search_query.is_empty() {
        let matches = viewer.search_matches.len();
        if matches == 0 {
            return format!("No matches for '{}'", viewer.search_query);
        }
        return format!(
            "Match {}/{} for '{}'",
            viewer.current_match + 1,
            matches,
            viewer.search_query
        );
    }
    if total == 0 {
        return "Log".to_string();
    }
    format!("Line {}/{}", offset + 1, total)
}
