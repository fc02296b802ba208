use color_eyre::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, AppState, PendingAction};

const PAGE: usize = 10;

pub trait EventHandler {
    fn handle_events(&mut self) -> Result<()>;
    fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<()>;
}

impl EventHandler for App {
    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    self.handle_key_event(key_event)?
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handle_key_event(&mut self, key_event: KeyEvent) -> Result<()> {
        if key_event.modifiers.contains(KeyModifiers::CONTROL)
            && key_event.code == KeyCode::Char('c')
        {
            self.quit();
            return Ok(());
        }

        match self.state {
            AppState::Runner => {
                if self.status.continuation_offered {
                    match key_event.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') => {
                            self.request(PendingAction::Continue);
                            return Ok(());
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') => {
                            self.request(PendingAction::Decline);
                            return Ok(());
                        }
                        _ => {}
                    }
                }

                match key_event.code {
                    KeyCode::Char('q') | KeyCode::Esc => self.quit(),
                    KeyCode::Char('a') => self.open_add_file(),
                    KeyCode::Char('s') => self.request(PendingAction::Start),
                    KeyCode::Char('x') => self.request(PendingAction::Stop),
                    KeyCode::Char('p') => self.explain_pause(),
                    KeyCode::Char('c') => self.request(PendingAction::ClearQueue),
                    KeyCode::Char('l') => self.open_log_viewer(),
                    _ => {}
                }
            }

            AppState::AddFile => match key_event.code {
                KeyCode::Enter => self.confirm_add_file(),
                KeyCode::Esc => self.cancel_add_file(),
                KeyCode::Backspace => self.input_pop(),
                KeyCode::Char(c) => self.input_push(c),
                _ => {}
            },

            AppState::ExecutionLog => {
                if self.log_viewer.search_active {
                    match key_event.code {
                        KeyCode::Enter => self.confirm_search(),
                        KeyCode::Esc => self.cancel_search(),
                        KeyCode::Backspace => self.search_pop_char(),
                        KeyCode::Char(c) => self.search_push_char(c),
                        _ => {}
                    }
                    return Ok(());
                }

                match key_event.code {
                    KeyCode::Char('q') | KeyCode::Esc => self.go_back(),
                    KeyCode::Up | KeyCode::Char('k') => self.scroll_up(1),
                    KeyCode::Down | KeyCode::Char('j') => self.scroll_down(1),
                    KeyCode::PageUp => self.scroll_up(PAGE),
                    KeyCode::PageDown => self.scroll_down(PAGE),
                    KeyCode::Char('g') => self.scroll_to_top(),
                    KeyCode::Char('G') => self.scroll_to_bottom(),
                    KeyCode::Char('/') => self.start_search(),
                    KeyCode::Char('n') => self.next_search_match(),
                    KeyCode::Char('f') => self.toggle_job_filter(),
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
