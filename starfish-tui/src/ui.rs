pub mod components;
pub mod layout;
pub mod log_viewer;
pub mod runner;

use ratatui::Frame;

use crate::app::{App, AppState};

pub fn render(app: &App, frame: &mut Frame) {
    match app.state {
        AppState::Runner => runner::render(app, frame),
        AppState::AddFile => {
            runner::render(app, frame);
            render_add_file(app, frame);
        }
        AppState::ExecutionLog => log_viewer::render(app, frame),
    }
}

fn render_add_file(app: &App, frame: &mut Frame) {
    let area = layout::centered_rect(70, 5, frame.area());
    components::render_input(
        "Add simulation file",
        &app.input,
        "Enter: Queue | Esc: Cancel",
        frame,
        area,
    );
}
