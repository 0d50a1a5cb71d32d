//! Upload dialog: a file-path field that posts the dataset (or auxiliary
//! mapping file) to the backend.

use std::path::PathBuf;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use crate::action::Action;
use crate::components::Component;
use crate::components::dialog_layout::split_dialog_area;
use crate::config::{Config, Mode};
use crate::style::StyleConfig;

#[derive(Debug, Default)]
pub struct UploadDialog {
    styles: StyleConfig,
    config: Config,
    path: String,
    busy: bool,
    notice: Option<String>,
    show_instructions: bool,
}

impl UploadDialog {
    pub fn new(styles: StyleConfig) -> Self {
        Self {
            styles,
            config: Config::default(),
            path: String::new(),
            busy: false,
            notice: None,
            show_instructions: true,
        }
    }

    /// Disable the form while the upload is in flight
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    fn confirm(&mut self) -> Option<Action> {
        if self.busy {
            return None;
        }
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            self.notice = Some("Enter a file path to upload".to_string());
            return None;
        }
        Some(Action::UploadRequested(PathBuf::from(trimmed)))
    }

    fn build_instructions_from_config(&self) -> String {
        self.config.actions_to_instructions(&[
            (Mode::Upload, Action::Enter),
            (Mode::Upload, Action::Escape),
            (Mode::Global, Action::ToggleInstructions),
        ])
    }
}

impl Component for UploadDialog {
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }

        if let Some(global_action) = self.config.action_for_key(Mode::Global, key) {
            if global_action == Action::ToggleInstructions {
                self.show_instructions = !self.show_instructions;
                return Ok(None);
            }
        }

        if let Some(action) = self.config.action_for_key(Mode::Upload, key) {
            match action {
                Action::Escape => return Ok(Some(Action::DialogClose)),
                Action::Enter => return Ok(self.confirm()),
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(Action::DialogClose)),
            KeyCode::Enter => return Ok(self.confirm()),
            KeyCode::Backspace if !self.busy => {
                self.path.pop();
                self.notice = None;
            }
            KeyCode::Char(c) if !self.busy => {
                self.path.push(c);
                self.notice = None;
            }
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let buf = frame.buffer_mut();
        Clear.render(area, buf);

        let outer = Block::default()
            .title("Upload Dataset")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .style(self.styles.dialog);
        let inner_total = outer.inner(area);
        outer.render(area, buf);

        let instructions = self.build_instructions_from_config();
        let layout = split_dialog_area(
            inner_total,
            self.show_instructions,
            if instructions.is_empty() {
                None
            } else {
                Some(instructions.as_str())
            },
        );
        let content = layout.content_area;

        buf.set_string(content.x, content.y, "File path:", self.styles.label);
        buf.set_string(content.x, content.y + 1, &self.path, self.styles.value);
        let cursor_x = content.x + self.path.chars().count() as u16;
        if !self.busy && cursor_x < content.right() {
            buf.set_string(cursor_x, content.y + 1, " ", self.styles.cursor.block());
        }

        let status_y = content.y + 3;
        if self.busy {
            buf.set_string(content.x, status_y, "Uploading...", self.styles.notice);
        } else if let Some(notice) = &self.notice {
            buf.set_string(content.x, status_y, notice, self.styles.notice);
        }

        if self.show_instructions && let Some(instructions_area) = layout.instructions_area {
            Paragraph::new(instructions.as_str())
                .block(Block::default().borders(Borders::ALL).title("Instructions"))
                .style(self.styles.notice)
                .wrap(Wrap { trim: true })
                .render(instructions_area, buf);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(dialog: &mut UploadDialog, code: KeyCode) -> Option<Action> {
        dialog
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn empty_path_is_rejected_inline() {
        let mut dialog = UploadDialog::new(StyleConfig::default());
        assert_eq!(press(&mut dialog, KeyCode::Enter), None);
        assert!(dialog.notice.is_some());
    }

    #[test]
    fn confirm_emits_trimmed_path() {
        let mut dialog = UploadDialog::new(StyleConfig::default());
        for c in " data.csv ".chars() {
            press(&mut dialog, KeyCode::Char(c));
        }
        assert_eq!(
            press(&mut dialog, KeyCode::Enter),
            Some(Action::UploadRequested(PathBuf::from("data.csv")))
        );
    }

    #[test]
    fn busy_form_ignores_input_and_confirm() {
        let mut dialog = UploadDialog::new(StyleConfig::default());
        dialog.set_busy(true);
        press(&mut dialog, KeyCode::Char('x'));
        assert_eq!(press(&mut dialog, KeyCode::Enter), None);
        assert!(dialog.path.is_empty());
        // Escape still closes; the in-flight upload resolves on its own
        assert_eq!(press(&mut dialog, KeyCode::Esc), Some(Action::DialogClose));
    }
}
