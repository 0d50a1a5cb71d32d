use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders};

use crate::action::Action;
use crate::components::Component;
use crate::config::{Config, Mode};
use crate::style::StyleConfig;

/// Severity of a transient notice; picks the border style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

/// Reusable transient notice overlay. Non-blocking by design: it consumes
/// keys only while shown and closes on Enter or Escape.
#[derive(Debug, Clone)]
pub struct MessageDialog {
    title: String,
    message: String,
    kind: MessageKind,
    styles: StyleConfig,
    config: Config,
}

impl MessageDialog {
    pub fn info(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind: MessageKind::Info,
            styles: StyleConfig::default(),
            config: Config::default(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            message: message.into(),
            kind: MessageKind::Error,
            styles: StyleConfig::default(),
            config: Config::default(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    fn modal_area(&self, area: Rect) -> Rect {
        let max_width = area.width.clamp(20, 48);
        let wrap_width = max_width.saturating_sub(4) as usize;
        let wrapped = textwrap::wrap(&self.message, wrap_width);
        let content_lines = wrapped.len() as u16;
        let height = content_lines
            .saturating_add(4)
            .clamp(5, area.height.saturating_sub(4));
        let x = area.x + (area.width.saturating_sub(max_width)) / 2;
        let y = area.y + (area.height.saturating_sub(height)) / 2;
        Rect {
            x,
            y,
            width: max_width,
            height,
        }
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        // Overlay on top of underlying content; no full-area clear
        let styles = &self.styles;
        let border_style = match self.kind {
            MessageKind::Info => styles.notice,
            MessageKind::Error => styles.error,
        };
        let modal = self.modal_area(area);

        let block = Block::default()
            .title(self.title.as_str())
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(border_style);
        let inner = block.inner(modal);
        block.render(modal, buf);

        let wrap_width = inner.width.saturating_sub(2) as usize;
        let wrapped = textwrap::wrap(&self.message, wrap_width);

        for (i, line) in wrapped.iter().enumerate() {
            if i as u16 >= inner.height {
                break;
            }
            buf.set_string(inner.x + 1, inner.y + i as u16, line, styles.dialog);
        }

        let hint = "Enter/Esc to close";
        let hint_x = inner.x + inner.width.saturating_sub(hint.len() as u16 + 1);
        let hint_y = inner.y + inner.height.saturating_sub(1);
        buf.set_string(hint_x, hint_y, hint, styles.muted);
    }
}

impl Component for MessageDialog {
    fn register_config_handler(&mut self, config: Config) -> Result<()> {
        self.config = config;
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.kind != KeyEventKind::Press {
            return Ok(None);
        }
        if let Some(Action::DialogClose) = self.config.action_for_key(Mode::MessageDialog, key) {
            return Ok(Some(Action::DialogClose));
        }
        match key.code {
            KeyCode::Enter | KeyCode::Esc => Ok(Some(Action::DialogClose)),
            _ => Ok(None),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame, area: Rect) -> Result<()> {
        self.render(area, frame.buffer_mut());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn closes_on_enter_and_escape() {
        let mut dialog = MessageDialog::error("nope");
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            dialog.handle_key_event(enter).unwrap(),
            Some(Action::DialogClose)
        );
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(
            dialog.handle_key_event(esc).unwrap(),
            Some(Action::DialogClose)
        );
        let other = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE);
        assert_eq!(dialog.handle_key_event(other).unwrap(), None);
    }

    #[test]
    fn severity_is_tracked() {
        assert_eq!(MessageDialog::error("x").kind(), MessageKind::Error);
        assert_eq!(MessageDialog::info("x", "Note").kind(), MessageKind::Info);
    }
}
