mod app;
mod events;
mod ui;

use std::path::PathBuf;

use app::App;
use color_eyre::Result;

use runner_service::{Options, RunController};

/// Run the terminal UI on top of a process-backed controller, queueing `files` first
pub async fn run(options: Options, files: Vec<PathBuf>) -> Result<()> {
    let mut controller = RunController::with_process_engine(options);
    let events = controller.subscribe();
    let handle = controller.spawn();

    for file in files {
        handle.enqueue(file).await?;
    }

    let terminal = ratatui::init();
    let result = App::new(handle.clone(), events).run(terminal).await;
    ratatui::restore();

    handle.shutdown().await?;
    result
}
