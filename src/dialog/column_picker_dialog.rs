//! Column picker: a filter input over the column directory with a
//! keyboard-driven dropdown.
//!
//! Contract: Down/Up move a bounded highlight (clamped, never wraps);
//! Enter selects the highlighted entry or, with no highlight, commits the
//! trimmed free text; Escape closes without selecting.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use crate::action::Action;
use crate::columns::{ColumnDirectory, Commit};
use crate::components::Component;
use crate::components::dialog_layout::split_dialog_area;
use crate::config::{Config, Mode};
use crate::style::StyleConfig;

#[derive(Debug)]
pub struct ColumnPickerDialog {
    styles: StyleConfig,
    config: Config,
    directory: ColumnDirectory,
    input: String,
    notice: Option<String>,
    show_instructions: bool,
    scroll_offset: usize,
}

impl ColumnPickerDialog {
    pub fn new(styles: StyleConfig, columns: Vec<String>) -> Self {
        let mut directory = ColumnDirectory::new();
        directory.replace(columns);
        Self {
            styles,
            config: Config::default(),
            directory,
            input: String::new(),
            notice: None,
            show_instructions: true,
            scroll_offset: 0,
        }
    }

    fn edit_input(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char(c) => {
                self.input.push(c);
            }
            KeyCode::Backspace => {
                if self.input.pop().is_none() {
                    return false;
                }
            }
            _ => return false,
        }
        self.directory.set_filter(&self.input);
        self.notice = None;
        true
    }

    fn confirm(&mut self) -> Option<Action> {
        match self.directory.commit(&self.input) {
            Commit::Active(name) => Some(Action::ColumnSelected(name)),
            Commit::Typed(name) => {
                if !self.directory.is_empty() && !self.directory.contains(&name) {
                    // Off-list names are allowed, with a visible nudge
                    self.notice = Some(format!("\"{name}\" is not in the column list"));
                }
                Some(Action::ColumnSelected(name))
            }
            Commit::None => {
                self.notice = Some("Type or pick a column name".to_string());
                None
            }
        }
    }

    fn keep_active_visible(&mut self, visible_rows: usize) {
        let Some(active) = self.directory.active_index() else {
            return;
        };
        if active < self.scroll_offset {
            self.scroll_offset = active;
        } else if visible_rows > 0 && active >= self.scroll_offset + visible_rows {
            self.scroll_offset = active + 1 - visible_rows;
        }
    }

    fn build_instructions_from_config(&self) -> String {
        self.config.actions_to_instructions(&[
            (Mode::ColumnPicker, Action::Up),
            (Mode::ColumnPicker, Action::Down),
            (Mode::ColumnPicker, Action::Enter),
            (Mode::ColumnPicker, Action::Escape),
            (Mode::Global, Action::ToggleInstructions),
        ])
    }
}

impl Component for ColumnPickerDialog {
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

        if let Some(action) = self.config.action_for_key(Mode::ColumnPicker, key) {
            match action {
                Action::Escape => return Ok(Some(Action::DialogClose)),
                Action::Enter => return Ok(self.confirm()),
                Action::Down => {
                    self.directory.move_down();
                    return Ok(None);
                }
                Action::Up => {
                    self.directory.move_up();
                    return Ok(None);
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(Action::DialogClose)),
            KeyCode::Enter => return Ok(self.confirm()),
            KeyCode::Down => {
                self.directory.move_down();
                return Ok(None);
            }
            KeyCode::Up => {
                self.directory.move_up();
                return Ok(None);
            }
            _ => {
                self.edit_input(key);
            }
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let buf = frame.buffer_mut();
        Clear.render(area, buf);

        let outer = Block::default()
            .title("Select Column")
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

        // Filter input with a block cursor at the end
        buf.set_string(content.x, content.y, "Filter:", self.styles.label);
        let value_x = content.x + 8;
        buf.set_string(value_x, content.y, &self.input, self.styles.value);
        let cursor_x = value_x + self.input.chars().count() as u16;
        if cursor_x < content.right() {
            buf.set_string(cursor_x, content.y, " ", self.styles.cursor.block());
        }

        let mut y = content.y + 1;
        if let Some(notice) = &self.notice {
            buf.set_string(content.x, y, notice, self.styles.notice);
            y += 1;
        }

        let list_area = Rect {
            x: content.x,
            y,
            width: content.width,
            height: content.bottom().saturating_sub(y),
        };
        let visible_rows = list_area.height as usize;
        self.keep_active_visible(visible_rows);

        if self.directory.filtered().is_empty() {
            buf.set_string(list_area.x, list_area.y, "No matches", self.styles.muted);
            return Ok(());
        }

        for (row, (index, name)) in self
            .directory
            .filtered()
            .iter()
            .enumerate()
            .skip(self.scroll_offset)
            .take(visible_rows)
            .enumerate()
        {
            let style = if Some(index) == self.directory.active_index() {
                self.styles.selected_item
            } else {
                self.styles.value
            };
            buf.set_string(list_area.x, list_area.y + row as u16, name, style);
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

    fn picker() -> ColumnPickerDialog {
        ColumnPickerDialog::new(
            StyleConfig::default(),
            vec!["Age".into(), "Wage".into(), "Name".into()],
        )
    }

    fn press(dialog: &mut ColumnPickerDialog, code: KeyCode) -> Option<Action> {
        dialog
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap()
    }

    #[test]
    fn typing_filters_and_enter_selects_highlight() {
        let mut dialog = picker();
        press(&mut dialog, KeyCode::Char('a'));
        press(&mut dialog, KeyCode::Char('g'));
        press(&mut dialog, KeyCode::Char('e'));
        assert_eq!(
            dialog.directory.filtered(),
            ["Age".to_string(), "Wage".to_string()]
        );
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Down);
        press(&mut dialog, KeyCode::Down); // clamped at "Wage"
        assert_eq!(
            press(&mut dialog, KeyCode::Enter),
            Some(Action::ColumnSelected("Wage".into()))
        );
    }

    #[test]
    fn enter_commits_typed_text_without_highlight() {
        let mut dialog = picker();
        for c in "Custom".chars() {
            press(&mut dialog, KeyCode::Char(c));
        }
        assert_eq!(
            press(&mut dialog, KeyCode::Enter),
            Some(Action::ColumnSelected("Custom".into()))
        );
        assert!(dialog.notice.is_some(), "off-list selection gets a notice");
    }

    #[test]
    fn empty_enter_shows_validation_notice() {
        let mut dialog = picker();
        assert_eq!(press(&mut dialog, KeyCode::Enter), None);
        assert!(dialog.notice.is_some());
    }

    #[test]
    fn escape_closes_without_selecting() {
        let mut dialog = picker();
        press(&mut dialog, KeyCode::Char('a'));
        assert_eq!(press(&mut dialog, KeyCode::Esc), Some(Action::DialogClose));
    }

    #[test]
    fn backspace_refilters() {
        let mut dialog = picker();
        press(&mut dialog, KeyCode::Char('n'));
        assert_eq!(dialog.directory.filtered(), ["Name".to_string()]);
        press(&mut dialog, KeyCode::Backspace);
        assert_eq!(dialog.directory.filtered().len(), 3);
    }
}
