use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    pub dialog: Style,
    pub dialog_title: Style,
    pub label: Style,
    pub value: Style,
    pub selected_item: Style,
    pub error: Style,
    pub notice: Style,
    pub muted: Style,
    pub user_bubble: Style,
    pub bot_bubble: Style,
    pub cursor: CursorStyle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorStyle {
    /// Style for block cursor (used in simple text input fields)
    pub block: Style,
    /// Style for hidden cursor (used when field is not focused)
    pub hidden: Style,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            dialog: Style::default().fg(Color::White),
            dialog_title: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Yellow),
            value: Style::default().fg(Color::White),
            selected_item: Style::default().fg(Color::Black).bg(Color::Yellow),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            notice: Style::default().fg(Color::Yellow),
            muted: Style::default().fg(Color::Gray),
            user_bubble: Style::default().fg(Color::Cyan),
            bot_bubble: Style::default().fg(Color::White),
            cursor: CursorStyle::default(),
        }
    }
}

impl Default for CursorStyle {
    fn default() -> Self {
        Self {
            block: Style::default().fg(Color::Black).bg(Color::White),
            hidden: Style::default().fg(Color::Gray),
        }
    }
}

impl StyleConfig {
    pub fn with_error(mut self, style: Style) -> Self {
        self.error = style;
        self
    }

    pub fn with_selected_item(mut self, style: Style) -> Self {
        self.selected_item = style;
        self
    }
}

impl CursorStyle {
    /// Get the block cursor style
    pub fn block(&self) -> Style {
        self.block
    }

    /// Get the hidden cursor style
    pub fn hidden(&self) -> Style {
        self.hidden
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_styles() {
        let style = StyleConfig::default();
        assert_eq!(style.error.fg, Some(Color::Red));
        assert!(style.error.add_modifier.contains(Modifier::BOLD));
        assert_eq!(style.selected_item.bg, Some(Color::Yellow));
        assert_eq!(style.cursor.block.bg, Some(Color::White));
    }

    #[test]
    fn test_builder_overrides() {
        let custom = StyleConfig::default()
            .with_error(Style::default().fg(Color::Magenta))
            .with_selected_item(Style::default().bg(Color::Blue));
        assert_eq!(custom.error.fg, Some(Color::Magenta));
        assert_eq!(custom.selected_item.bg, Some(Color::Blue));
    }
}
