//! Chat popup: transcript, prompt input, and the loading-placeholder
//! lifecycle for one send/reply cycle.
//!
//! The dialog never talks to the backend itself. Submitting emits
//! `ChatPromptSubmitted`; the app claims the chat slot, spawns the request,
//! and resolves the placeholder when the completion action arrives.

use chrono::{DateTime, Local};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use tui_textarea::TextArea;
use uuid::Uuid;

use crate::action::Action;
use crate::components::Component;
use crate::components::dialog_layout::split_dialog_area;
use crate::config::{Config, Mode};
use crate::markdown;
use crate::style::StyleConfig;

const LOADING_FRAMES: [&str; 4] = ["   ", ".  ", ".. ", "..."];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub is_error: bool,
    /// Set while this message is a loading placeholder awaiting its reply
    pub loading_id: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    fn new(sender: Sender, text: String) -> Self {
        Self {
            sender,
            text,
            is_error: false,
            loading_id: None,
            timestamp: Local::now(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading_id.is_some()
    }
}

/// Canned follow-up prompts offered once a chart is rendered
pub fn suggestion_prompts(col: &str, chart_type: &str) -> [String; 3] {
    [
        format!(
            "**Request**: based on the chart for column \"{col}\" (type: {chart_type}), \
             propose *3 concrete improvements* to the result or its presentation. \
             Give one short implementation step for each."
        ),
        format!(
            "List *3 criteria* for judging the visual quality of the chart for column \
             \"{col}\" (type: {chart_type}), each with one improvement hint."
        ),
        format!(
            "Suggest *3 ways* to analyze the chart for column \"{col}\" (type: {chart_type}) \
             more deeply, such as sub-grouping, statistical tests, or an alternative chart form."
        ),
    ]
}

const SUGGESTION_LABELS: [&str; 3] = ["propose fixes", "chart criteria", "more ideas"];

#[derive(Debug)]
pub struct ChatDialog {
    styles: StyleConfig,
    config: Config,
    pub messages: Vec<ChatMessage>,
    input: TextArea<'static>,
    /// Selected column and chart type backing the suggestion prompts;
    /// None hides the suggestion strip
    suggestion_context: Option<(String, String)>,
    notice: Option<String>,
    busy: bool,
    show_instructions: bool,
    tick: usize,
}

impl Default for ChatDialog {
    fn default() -> Self {
        Self::new(StyleConfig::default())
    }
}

impl ChatDialog {
    pub fn new(styles: StyleConfig) -> Self {
        let mut input = TextArea::default();
        input.set_block(Block::default().borders(Borders::ALL).title("Prompt"));
        Self {
            styles,
            config: Config::default(),
            messages: Vec::new(),
            input,
            suggestion_context: None,
            notice: None,
            busy: false,
            show_instructions: true,
            tick: 0,
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::new(Sender::User, text.into()));
    }

    pub fn push_bot(&mut self, text: impl Into<String>, is_error: bool) {
        let mut message = ChatMessage::new(Sender::Bot, text.into());
        message.is_error = is_error;
        self.messages.push(message);
    }

    /// Append a loading placeholder and return its id
    pub fn push_loading(&mut self) -> String {
        let id = format!("loading-{}", Uuid::new_v4());
        let mut message = ChatMessage::new(Sender::Bot, String::new());
        message.loading_id = Some(id.clone());
        self.messages.push(message);
        id
    }

    /// Replace a loading placeholder in place. A placeholder that is no
    /// longer present falls back to appending a fresh bot message.
    pub fn resolve_loading(&mut self, loading_id: &str, text: impl Into<String>, is_error: bool) {
        let text = text.into();
        match self
            .messages
            .iter_mut()
            .find(|m| m.loading_id.as_deref() == Some(loading_id))
        {
            Some(message) => {
                message.text = text;
                message.is_error = is_error;
                message.loading_id = None;
                message.timestamp = Local::now();
            }
            None => self.push_bot(text, is_error),
        }
    }

    /// Latest resolved, non-error bot reply
    pub fn last_bot_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Bot && !m.is_error && !m.is_loading())
            .map(|m| m.text.as_str())
    }

    /// Disable the prompt controls while a chat request is pending
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        if !busy {
            self.notice = None;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    /// Show or hide the suggestion strip; col/chart type feed the prompts
    pub fn set_suggestion_context(&mut self, context: Option<(String, String)>) {
        self.suggestion_context = context;
    }

    pub fn suggestion(&self, index: usize) -> Option<String> {
        let (col, chart_type) = self.suggestion_context.as_ref()?;
        suggestion_prompts(col, chart_type).get(index).cloned()
    }

    /// Render the transcript as a standalone HTML document. Unresolved
    /// placeholders are skipped.
    pub fn transcript_html(&self) -> String {
        let mut out = String::from(
            "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
             <title>ChartChat transcript</title></head><body>\n",
        );
        for message in self.messages.iter().filter(|m| !m.is_loading()) {
            let who = match message.sender {
                Sender::User => "user",
                Sender::Bot => "bot",
            };
            let class = if message.is_error {
                format!("{who} error")
            } else {
                who.to_string()
            };
            out.push_str(&format!(
                "<div class=\"message {class}\" data-time=\"{}\"><b>{who}:</b> {}</div>\n",
                message.timestamp.format("%Y-%m-%d %H:%M:%S"),
                markdown::md_to_html(&message.text),
            ));
        }
        out.push_str("</body></html>\n");
        out
    }

    fn submit(&mut self) -> Option<Action> {
        if self.busy {
            self.notice = Some("Waiting for the current reply".to_string());
            return None;
        }
        let prompt = self.input.lines().join("\n").trim().to_string();
        if prompt.is_empty() {
            return None;
        }
        let mut fresh = TextArea::default();
        fresh.set_block(Block::default().borders(Borders::ALL).title("Prompt"));
        self.input = fresh;
        self.notice = None;
        Some(Action::ChatPromptSubmitted(prompt))
    }

    fn suggest(&mut self, index: usize) -> Option<Action> {
        if self.busy {
            self.notice = Some("Waiting for the current reply".to_string());
            return None;
        }
        self.suggestion(index).map(Action::ChatPromptSubmitted)
    }

    fn build_instructions_from_config(&self) -> String {
        self.config.actions_to_instructions(&[
            (Mode::ChatPopup, Action::Enter),
            (Mode::ChatPopup, Action::CloseChatPopup),
            (Mode::ChatPopup, Action::CopyLastReply),
            (Mode::ChatPopup, Action::ExportTranscript),
            (Mode::Global, Action::ToggleInstructions),
        ])
    }

    fn transcript_lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        for message in &self.messages {
            let (prefix, prefix_style) = match message.sender {
                Sender::User => ("you> ", self.styles.user_bubble),
                Sender::Bot => ("bot> ", self.styles.bot_bubble),
            };
            if message.is_loading() {
                let dots = LOADING_FRAMES[self.tick % LOADING_FRAMES.len()];
                lines.push(Line::from(vec![
                    Span::styled(prefix.to_string(), prefix_style),
                    Span::styled(format!("working{dots}"), self.styles.muted),
                ]));
                continue;
            }
            let body = markdown::md_to_text(&message.text);
            for (i, body_line) in body.lines.into_iter().enumerate() {
                let mut spans: Vec<Span<'static>> = Vec::new();
                if i == 0 {
                    spans.push(Span::styled(prefix.to_string(), prefix_style));
                    if message.is_error {
                        spans.push(Span::styled("Error: ".to_string(), self.styles.error));
                    }
                } else {
                    spans.push(Span::raw("     ".to_string()));
                }
                spans.extend(body_line.spans);
                let mut line = Line::from(spans);
                if message.is_error {
                    line = line.style(self.styles.error);
                }
                lines.push(line);
            }
        }
        lines
    }
}

impl Component for ChatDialog {
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

        if let Some(action) = self.config.action_for_key(Mode::ChatPopup, key) {
            match action {
                Action::CloseChatPopup | Action::Escape => {
                    return Ok(Some(Action::CloseChatPopup));
                }
                Action::Enter => return Ok(self.submit()),
                Action::SuggestPrompt(index) => return Ok(self.suggest(index)),
                Action::CopyLastReply => return Ok(Some(Action::CopyLastReply)),
                Action::ExportTranscript => return Ok(Some(Action::ExportTranscript)),
                _ => {}
            }
        }

        // Fallback for hardcoded keys
        match key.code {
            KeyCode::Esc => return Ok(Some(Action::CloseChatPopup)),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
                if !self.busy {
                    self.input.insert_newline();
                }
                return Ok(None);
            }
            KeyCode::Enter => return Ok(self.submit()),
            _ => {}
        }

        // Everything else edits the prompt, unless controls are disabled
        if !self.busy {
            self.input.input(key);
        }
        Ok(None)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if action == Action::Tick {
            self.tick = self.tick.wrapping_add(1);
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let buf = frame.buffer_mut();
        Clear.render(area, buf);

        let outer = Block::default()
            .title("Chat")
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

        // Bottom-up: suggestion strip, notice line, input box, transcript
        let suggestions_height = u16::from(self.suggestion_context.is_some());
        let notice_height = u16::from(self.notice.is_some());
        let input_height = 3u16;
        let transcript_height = content
            .height
            .saturating_sub(input_height + notice_height + suggestions_height);

        let transcript_area = Rect {
            height: transcript_height,
            ..content
        };
        let mut y = content.y + transcript_height;

        let lines = self.transcript_lines();
        let scroll = (lines.len() as u16).saturating_sub(transcript_area.height);
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .render(transcript_area, buf);

        if let Some(notice) = &self.notice {
            buf.set_string(content.x, y, notice, self.styles.notice);
            y += 1;
        }

        let input_area = Rect {
            x: content.x,
            y,
            width: content.width,
            height: input_height.min(content.height),
        };
        if self.busy {
            let waiting = Paragraph::new("waiting for reply...")
                .style(self.styles.muted)
                .block(Block::default().borders(Borders::ALL).title("Prompt"));
            waiting.render(input_area, buf);
        } else {
            self.input.render(input_area, buf);
        }
        y += input_height;

        if self.suggestion_context.is_some() {
            let strip = SUGGESTION_LABELS
                .iter()
                .enumerate()
                .map(|(i, label)| format!("ctrl-{}: {label}", i + 1))
                .collect::<Vec<_>>()
                .join("  ");
            buf.set_string(content.x, y, strip, self.styles.muted);
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
