//! Grouped selection modal: pick multiple columns for one combined chart.

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};

use crate::action::Action;
use crate::components::Component;
use crate::components::dialog_layout::split_dialog_area;
use crate::config::{Config, Mode};
use crate::style::StyleConfig;

/// Assemble the confirmed column set: checked entries, optionally led by the
/// single selection, trimmed and deduplicated preserving order.
pub fn build_selection(
    columns: &[String],
    checked: &[bool],
    include_selected: bool,
    selected_col: Option<&str>,
) -> Vec<String> {
    let mut cols: Vec<String> = columns
        .iter()
        .zip(checked)
        .filter(|(_, on)| **on)
        .map(|(name, _)| name.clone())
        .collect();
    if include_selected {
        if let Some(selected) = selected_col {
            if !cols.iter().any(|c| c == selected) {
                cols.insert(0, selected.to_string());
            }
        }
    }
    let mut seen = Vec::new();
    for col in cols {
        let trimmed = col.trim().to_string();
        if !trimmed.is_empty() && !seen.contains(&trimmed) {
            seen.push(trimmed);
        }
    }
    seen
}

#[derive(Debug)]
pub struct GroupedColumnsDialog {
    styles: StyleConfig,
    config: Config,
    columns: Vec<String>,
    checked: Vec<bool>,
    cursor: usize,
    include_selected: bool,
    selected_col: Option<String>,
    notice: Option<String>,
    show_instructions: bool,
    scroll_offset: usize,
}

impl GroupedColumnsDialog {
    /// The current single selection starts pre-checked
    pub fn new(styles: StyleConfig, columns: Vec<String>, selected_col: Option<String>) -> Self {
        let checked = columns
            .iter()
            .map(|c| selected_col.as_deref() == Some(c.as_str()))
            .collect();
        Self {
            styles,
            config: Config::default(),
            columns,
            checked,
            cursor: 0,
            include_selected: false,
            selected_col,
            notice: None,
            show_instructions: true,
            scroll_offset: 0,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        let last = self.columns.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    fn toggle_current(&mut self) {
        if let Some(flag) = self.checked.get_mut(self.cursor) {
            *flag = !*flag;
            self.notice = None;
        }
    }

    fn set_all(&mut self, value: bool) {
        for flag in &mut self.checked {
            *flag = value;
        }
    }

    fn apply(&mut self) -> Option<Action> {
        let cols = build_selection(
            &self.columns,
            &self.checked,
            self.include_selected,
            self.selected_col.as_deref(),
        );
        if cols.is_empty() {
            self.notice = Some("Select at least one column".to_string());
            return None;
        }
        Some(Action::GroupedColumnsApplied(cols))
    }

    fn build_instructions_from_config(&self) -> String {
        self.config.actions_to_instructions(&[
            (Mode::GroupedColumns, Action::ToggleItem),
            (Mode::GroupedColumns, Action::SelectAll),
            (Mode::GroupedColumns, Action::ClearAll),
            (Mode::GroupedColumns, Action::ToggleIncludeSelected),
            (Mode::GroupedColumns, Action::Enter),
            (Mode::GroupedColumns, Action::Escape),
        ])
    }
}

impl Component for GroupedColumnsDialog {
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

        if let Some(action) = self.config.action_for_key(Mode::GroupedColumns, key) {
            match action {
                Action::Escape => return Ok(Some(Action::DialogClose)),
                Action::Enter => return Ok(self.apply()),
                Action::Up => {
                    self.move_cursor(-1);
                    return Ok(None);
                }
                Action::Down => {
                    self.move_cursor(1);
                    return Ok(None);
                }
                Action::ToggleItem => {
                    self.toggle_current();
                    return Ok(None);
                }
                Action::SelectAll => {
                    self.set_all(true);
                    return Ok(None);
                }
                Action::ClearAll => {
                    self.set_all(false);
                    return Ok(None);
                }
                Action::ToggleIncludeSelected => {
                    self.include_selected = !self.include_selected;
                    return Ok(None);
                }
                _ => {}
            }
        }

        match key.code {
            KeyCode::Esc => return Ok(Some(Action::DialogClose)),
            KeyCode::Enter => return Ok(self.apply()),
            KeyCode::Up => self.move_cursor(-1),
            KeyCode::Down => self.move_cursor(1),
            KeyCode::Char(' ') => self.toggle_current(),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let buf = frame.buffer_mut();
        Clear.render(area, buf);

        let outer = Block::default()
            .title("Grouped Chart Columns")
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

        let include_marker = if self.include_selected { "[x]" } else { "[ ]" };
        let include_line = match &self.selected_col {
            Some(col) => format!("{include_marker} include current selection ({col})"),
            None => format!("{include_marker} include current selection (none)"),
        };
        buf.set_string(content.x, content.y, include_line, self.styles.value);

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
        if self.columns.is_empty() {
            buf.set_string(list_area.x, list_area.y, "No columns", self.styles.muted);
            return Ok(());
        }

        let visible_rows = list_area.height as usize;
        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        } else if visible_rows > 0 && self.cursor >= self.scroll_offset + visible_rows {
            self.scroll_offset = self.cursor + 1 - visible_rows;
        }

        for (row, index) in (self.scroll_offset..self.columns.len())
            .take(visible_rows)
            .enumerate()
        {
            let marker = if self.checked[index] { "[x]" } else { "[ ]" };
            let style = if index == self.cursor {
                self.styles.selected_item
            } else {
                self.styles.value
            };
            buf.set_string(
                list_area.x,
                list_area.y + row as u16,
                format!("{marker} {}", self.columns[index]),
                style,
            );
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
