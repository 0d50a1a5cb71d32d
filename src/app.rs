//! Application state: routes key events to the focused surface, owns the
//! session and the column directory, spawns backend tasks, and applies
//! their completion actions.
//!
//! Backend calls never run on the UI loop. Each spawned task folds its
//! result into a completion action carrying the request token it started
//! with; completions with stale tokens are logged and dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::Frame;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::action::Action;
use crate::api::{
    BackendClient, ChartType, ChatOutcome, ChatRequest, ImageSource, PlotOutcome, PlotRequest,
    PlotSpec, UploadOutcome,
};
use crate::columns::ColumnDirectory;
use crate::components::chart_pane::{ChartPane, RenderedChart};
use crate::components::dialog_layout::centered_rect;
use crate::components::Component;
use crate::config::{Config, Mode};
use crate::dialog::{
    ChatDialog, ColumnPickerDialog, GroupedColumnsDialog, MessageDialog, UploadDialog,
};
use crate::session::{RequestToken, SessionState};
use crate::style::StyleConfig;

const AUTO_ANALYZE_DELAY: Duration = Duration::from_millis(300);

fn auto_analyze_prompt(columns: &str, chart_type: &str) -> String {
    format!(
        "Analyze the chart just rendered for column(s) \"{columns}\" (type: {chart_type}). \
         Give 3 key observations, 1 suggestion to improve the presentation, and any \
         figures worth calling out."
    )
}

pub struct App {
    config: Config,
    styles: StyleConfig,
    session: SessionState,
    directory: ColumnDirectory,
    client: Arc<BackendClient>,
    action_tx: UnboundedSender<Action>,

    chart_pane: ChartPane,
    chat_dialog: ChatDialog,
    chat_open: bool,
    column_picker: Option<ColumnPickerDialog>,
    grouped_dialog: Option<GroupedColumnsDialog>,
    upload_dialog: Option<UploadDialog>,
    message_dialog: Option<MessageDialog>,

    /// Loading placeholder id of the pending chat request
    pending_chat_loading: Option<String>,
    /// Column description of the pending plot, for auto-analyze
    pending_plot_desc: Option<String>,

    /// Non-blocking status line in the main view
    status: Option<String>,
    should_quit: bool,
    charts_dir: PathBuf,
}

impl App {
    pub fn new(config: Config, client: BackendClient, action_tx: UnboundedSender<Action>) -> Self {
        let styles = StyleConfig::default();
        let charts_dir = config.config.data_dir.join("charts");
        let mut chat_dialog = ChatDialog::new(styles.clone());
        let _ = chat_dialog.register_config_handler(config.clone());
        let chart_pane = ChartPane::new(styles.clone());
        Self {
            config,
            styles,
            session: SessionState::new(),
            directory: ColumnDirectory::new(),
            client: Arc::new(client),
            action_tx,
            chart_pane,
            chat_dialog,
            chat_open: false,
            column_picker: None,
            grouped_dialog: None,
            upload_dialog: None,
            message_dialog: None,
            pending_chat_loading: None,
            pending_plot_desc: None,
            status: None,
            should_quit: false,
            charts_dir,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn directory(&self) -> &ColumnDirectory {
        &self.directory
    }

    pub fn chat_dialog(&self) -> &ChatDialog {
        &self.chat_dialog
    }

    pub fn chart_pane(&self) -> &ChartPane {
        &self.chart_pane
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn open_dialog<C: Component>(&self, mut dialog: C) -> C {
        let _ = dialog.register_config_handler(self.config.clone());
        dialog
    }

    /// Route a key event to the focused surface
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if let Some(dialog) = &mut self.message_dialog {
            if let Some(action) = dialog.handle_key_event(key)? {
                self.handle_action(action)?;
            }
            return Ok(());
        }
        if let Some(dialog) = &mut self.upload_dialog {
            if let Some(action) = dialog.handle_key_event(key)? {
                self.handle_action(action)?;
            }
            return Ok(());
        }
        if let Some(dialog) = &mut self.grouped_dialog {
            if let Some(action) = dialog.handle_key_event(key)? {
                self.handle_action(action)?;
            }
            return Ok(());
        }
        if let Some(dialog) = &mut self.column_picker {
            if let Some(action) = dialog.handle_key_event(key)? {
                self.handle_action(action)?;
            }
            return Ok(());
        }
        if self.chat_open {
            if let Some(action) = self.chat_dialog.handle_key_event(key)? {
                self.handle_action(action)?;
            }
            return Ok(());
        }

        if let Some(action) = self
            .config
            .action_for_key(Mode::Global, key)
            .or_else(|| self.config.action_for_key(Mode::Main, key))
        {
            return self.handle_action(action);
        }
        if key.code == KeyCode::Char('q') {
            self.should_quit = true;
        }
        Ok(())
    }

    /// Apply a routed action
    pub fn handle_action(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Tick => {
                self.chart_pane.tick();
                let _ = self.chat_dialog.update(Action::Tick)?;
            }
            Action::Error(message) => {
                self.message_dialog = Some(self.open_dialog(MessageDialog::error(message)));
            }
            Action::DialogClose => self.close_top_dialog(),

            Action::OpenChatPopup => self.chat_open = true,
            Action::CloseChatPopup => self.chat_open = false,
            Action::OpenColumnPicker => {
                let picker = ColumnPickerDialog::new(
                    self.styles.clone(),
                    self.directory.columns().to_vec(),
                );
                self.column_picker = Some(self.open_dialog(picker));
            }
            Action::OpenGroupedColumns => self.open_grouped_dialog(),
            Action::OpenUploadDialog => {
                self.upload_dialog = Some(self.open_dialog(UploadDialog::new(self.styles.clone())));
            }
            Action::RefreshColumns => self.spawn_fetch_columns(),
            Action::ToggleShowValues => {
                self.session.show_values = !self.session.show_values;
                self.status = Some(format!(
                    "Value labels {}",
                    if self.session.show_values { "on" } else { "off" }
                ));
            }
            Action::ToggleAutoAnalyze => {
                self.session.auto_analyze = !self.session.auto_analyze;
                self.status = Some(format!(
                    "Auto-analyze {}",
                    if self.session.auto_analyze { "on" } else { "off" }
                ));
            }

            Action::SelectChartType(chart_type) => self.select_chart_type(chart_type),
            Action::ColumnSelected(name) => self.apply_column_selection(name),
            Action::GroupedColumnsApplied(cols) => {
                self.grouped_dialog = None;
                self.request_grouped_plot(cols);
            }
            Action::ChatPromptSubmitted(prompt) => self.submit_chat(prompt),
            Action::CopyLastReply => self.copy_last_reply(),
            Action::ExportTranscript => self.export_transcript(),
            Action::UploadRequested(path) => self.spawn_upload(path),

            Action::ChatFinished { token, outcome } => {
                self.apply_chat_finished(RequestToken(token), outcome)
            }
            Action::PlotFinished { token, outcome } => {
                self.apply_plot_finished(RequestToken(token), outcome)
            }
            Action::UploadFinished { outcome } => self.apply_upload_finished(outcome),
            Action::ColumnsFetched(columns) => {
                if columns.is_empty() {
                    self.directory.clear();
                } else {
                    self.directory.replace(columns);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close_top_dialog(&mut self) {
        if self.message_dialog.take().is_some() {
            return;
        }
        if self.upload_dialog.take().is_some() {
            return;
        }
        if self.grouped_dialog.take().is_some() {
            return;
        }
        self.column_picker = None;
    }

    fn open_grouped_dialog(&mut self) {
        let dialog = GroupedColumnsDialog::new(
            self.styles.clone(),
            self.directory.columns().to_vec(),
            self.session.selected_col.clone(),
        );
        self.grouped_dialog = Some(self.open_dialog(dialog));
    }

    fn apply_column_selection(&mut self, name: String) {
        self.column_picker = None;
        let off_list = !self.directory.is_empty() && !self.directory.contains(&name);
        self.status = Some(if off_list {
            format!("Selected column: {name} (not in the column list)")
        } else {
            format!("Selected column: {name}")
        });
        self.session.set_selected_col(Some(name));
        // Re-render the last chart for the new column, as the picker's
        // confirm button did
        if let Some(chart_type) = self.session.last_chart_type {
            if chart_type != ChartType::Grouped {
                self.select_chart_type(chart_type);
            }
        }
    }

    /// Plot controller entry point: validate, then request or open the
    /// grouped modal. Not gated on a pending chat request.
    fn select_chart_type(&mut self, chart_type: ChartType) {
        self.session.last_chart_type = Some(chart_type);
        if chart_type == ChartType::Grouped {
            self.open_grouped_dialog();
            return;
        }
        let Some(col) = self.session.selected_col.clone() else {
            self.status = Some("No column selected. Open the column picker first.".to_string());
            return;
        };
        let spec = PlotSpec::single(col.clone(), chart_type, self.session.show_values);
        self.request_plot(vec![spec], col);
    }

    fn request_grouped_plot(&mut self, cols: Vec<String>) {
        self.session.last_chart_type = Some(ChartType::Grouped);
        self.session.grouped_cols = cols.clone();
        let desc = cols.join(", ");
        let spec = PlotSpec::grouped(cols, self.session.show_values);
        self.request_plot(vec![spec], desc);
    }

    fn request_plot(&mut self, plots: Vec<PlotSpec>, desc: String) {
        let token = self.session.begin_plot();
        self.pending_plot_desc = Some(desc);
        self.chart_pane.set_loading(true);
        let request = PlotRequest {
            plots,
            dataset_id: self.session.dataset_id().map(str::to_string),
        };
        let client = Arc::clone(&self.client);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = match client.plot(&request).await {
                Ok(outcome) => outcome,
                Err(e) => PlotOutcome::TransportError {
                    message: e.to_string(),
                },
            };
            let _ = tx.send(Action::PlotFinished {
                token: token.0,
                outcome,
            });
        });
    }

    fn apply_plot_finished(&mut self, token: RequestToken, outcome: PlotOutcome) {
        if !self.session.finish_plot(token) {
            debug!("dropping stale plot completion for token {}", token.0);
            return;
        }
        self.chart_pane.set_loading(false);
        match outcome {
            PlotOutcome::Images(images) => {
                let rendered_any = self.render_images(images);
                if rendered_any && self.session.auto_analyze {
                    self.schedule_auto_analyze();
                }
            }
            PlotOutcome::BackendError { message } | PlotOutcome::TransportError { message } => {
                self.chart_pane.show_error(message);
                self.chat_dialog.set_suggestion_context(None);
            }
        }
    }

    /// Normalize, persist, and list the returned chart images. Returns
    /// whether anything was rendered.
    fn render_images(&mut self, images: Vec<String>) -> bool {
        if images.is_empty() {
            self.chart_pane.show_charts(Vec::new());
            self.chat_dialog.set_suggestion_context(None);
            return false;
        }
        let mut rendered = Vec::with_capacity(images.len());
        for raw in &images {
            let source = ImageSource::normalize(raw);
            let mut path = None;
            let mut byte_len = None;
            if let Some(bytes) = source.png_bytes() {
                byte_len = Some(bytes.len());
                match self.save_chart(&bytes) {
                    Ok(saved) => path = Some(saved),
                    Err(e) => error!("could not save chart image: {e}"),
                }
            }
            rendered.push(RenderedChart {
                source,
                path,
                byte_len,
            });
        }
        self.session.last_image = rendered
            .first()
            .map(|chart| chart.source.as_str().to_string());
        self.chart_pane.show_charts(rendered);

        let context = self.session.selected_col.clone().map(|col| {
            let chart_type = self
                .session
                .last_chart_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            (col, chart_type)
        });
        self.chat_dialog.set_suggestion_context(context);
        true
    }

    fn save_chart(&self, bytes: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.charts_dir)?;
        let path = self
            .charts_dir
            .join(format!("chart-{}.png", uuid::Uuid::new_v4()));
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    fn schedule_auto_analyze(&self) {
        let Some(desc) = self.pending_plot_desc.clone() else {
            return;
        };
        let chart_type = self
            .session
            .last_chart_type
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let prompt = auto_analyze_prompt(&desc, &chart_type);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(AUTO_ANALYZE_DELAY).await;
            let _ = tx.send(Action::ChatPromptSubmitted(prompt));
        });
    }

    /// Chat controller entry point. A pending chat request rejects the
    /// send outright; there is no queue.
    fn submit_chat(&mut self, prompt: String) {
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }
        let Some(token) = self.session.begin_chat() else {
            debug!("chat request already pending; dropping prompt");
            return;
        };
        self.chat_open = true;
        self.chat_dialog.push_user(prompt.clone());
        self.pending_chat_loading = Some(self.chat_dialog.push_loading());
        self.chat_dialog.set_busy(true);

        let request = ChatRequest {
            prompt,
            image: self.session.last_image.clone(),
            selected_col: self.session.selected_col.clone(),
            plot_type: self.session.last_chart_type,
            dataset_id: self.session.dataset_id().map(str::to_string),
        };
        let client = Arc::clone(&self.client);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = match client.chat(&request).await {
                Ok(outcome) => outcome,
                Err(e) => ChatOutcome::TransportError {
                    message: e.to_string(),
                },
            };
            let _ = tx.send(Action::ChatFinished {
                token: token.0,
                outcome,
            });
        });
    }

    fn apply_chat_finished(&mut self, token: RequestToken, outcome: ChatOutcome) {
        if !self.session.finish_chat(token) {
            debug!("dropping stale chat completion for token {}", token.0);
            return;
        }
        self.chat_dialog.set_busy(false);
        let loading_id = self.pending_chat_loading.take().unwrap_or_default();
        match outcome {
            ChatOutcome::Reply { text, image_url } => {
                let sanitized = strip_ansi_escapes::strip_str(&text);
                self.chat_dialog.resolve_loading(&loading_id, sanitized, false);
                if let Some(url) = image_url {
                    self.render_images(vec![url]);
                }
            }
            ChatOutcome::Unconfigured { constructed_prompt } => {
                self.chat_dialog.resolve_loading(
                    &loading_id,
                    format!(
                        "Backend AI is not configured. Constructed prompt (for debug):\n\n{constructed_prompt}"
                    ),
                    true,
                );
            }
            ChatOutcome::BackendError { message } | ChatOutcome::TransportError { message } => {
                self.chat_dialog.resolve_loading(&loading_id, message, true);
            }
        }
    }

    fn spawn_fetch_columns(&self) {
        let dataset_id = self.session.dataset_id().map(str::to_string);
        let client = Arc::clone(&self.client);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let columns = match client.columns(dataset_id.as_deref()).await {
                Ok(columns) => columns,
                Err(e) => {
                    error!("failed to fetch columns: {e}");
                    Vec::new()
                }
            };
            let _ = tx.send(Action::ColumnsFetched(columns));
        });
    }

    fn spawn_upload(&mut self, path: PathBuf) {
        if let Some(dialog) = &mut self.upload_dialog {
            dialog.set_busy(true);
        }
        let client = Arc::clone(&self.client);
        let tx = self.action_tx.clone();
        tokio::spawn(async move {
            let outcome = match client.upload(&path).await {
                Ok(outcome) => outcome,
                Err(e) => UploadOutcome::Failed {
                    message: e.to_string(),
                },
            };
            let _ = tx.send(Action::UploadFinished { outcome });
        });
    }

    fn apply_upload_finished(&mut self, outcome: UploadOutcome) {
        if let Some(dialog) = &mut self.upload_dialog {
            dialog.set_busy(false);
        }
        match outcome {
            UploadOutcome::DatasetRegistered {
                dataset_id,
                original_filename,
                columns,
            } => {
                self.status = Some(format!(
                    "Uploaded {}",
                    original_filename.as_deref().unwrap_or(&dataset_id)
                ));
                self.session.replace_dataset(dataset_id, original_filename);
                self.directory.replace(columns);
                self.upload_dialog = None;
            }
            UploadOutcome::AuxiliaryAccepted { filename, message } => {
                self.spawn_fetch_columns();
                self.upload_dialog = None;
                let text = message
                    .or(filename)
                    .unwrap_or_else(|| "Uploaded mapping file".to_string());
                self.message_dialog = Some(self.open_dialog(MessageDialog::info(text, "Upload")));
            }
            UploadOutcome::Accepted { filename, columns } => {
                if let Some(columns) = columns.filter(|c| !c.is_empty()) {
                    self.directory.replace(columns);
                }
                self.status = Some(format!(
                    "Uploaded {}",
                    filename.as_deref().unwrap_or("file")
                ));
                self.upload_dialog = None;
            }
            UploadOutcome::Failed { message } => {
                if let Some(dialog) = &mut self.upload_dialog {
                    dialog.set_notice(format!("Upload failed: {message}"));
                } else {
                    self.message_dialog =
                        Some(self.open_dialog(MessageDialog::error(format!(
                            "Upload failed: {message}"
                        ))));
                }
            }
        }
    }

    fn copy_last_reply(&mut self) {
        let Some(reply) = self.chat_dialog.last_bot_reply().map(str::to_string) else {
            self.chat_dialog.set_notice("No reply to copy yet");
            return;
        };
        match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(reply)) {
            Ok(()) => self.chat_dialog.set_notice("Reply copied to clipboard"),
            Err(e) => self.chat_dialog.set_notice(format!("Clipboard error: {e}")),
        }
    }

    fn export_transcript(&mut self) {
        let html = self.chat_dialog.transcript_html();
        let dir = &self.config.config.data_dir;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let path = dir.join(format!("transcript-{stamp}.html"));
        let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, html));
        match result {
            Ok(()) => self
                .chat_dialog
                .set_notice(format!("Transcript saved to {}", path.display())),
            Err(e) => self.chat_dialog.set_notice(format!("Export failed: {e}")),
        }
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let dataset = match &self.session.dataset {
            Some(d) => d
                .original_filename
                .clone()
                .unwrap_or_else(|| d.id.clone()),
            None => "none (upload with 'u')".to_string(),
        };
        let column = self
            .session
            .selected_col
            .clone()
            .unwrap_or_else(|| "none".to_string());
        let mut type_spans: Vec<Span<'static>> = vec![Span::styled(
            "Chart: ".to_string(),
            self.styles.label,
        )];
        for (i, chart_type) in ChartType::ALL.iter().enumerate() {
            let label = format!("[{}] {}", i + 1, chart_type.label());
            let style = if self.session.last_chart_type == Some(*chart_type) {
                self.styles.selected_item
            } else {
                self.styles.value
            };
            type_spans.push(Span::styled(label, style));
            type_spans.push(Span::raw("  "));
        }
        let toggles = format!(
            "values:{}  auto-analyze:{}",
            if self.session.show_values { "on" } else { "off" },
            if self.session.auto_analyze { "on" } else { "off" },
        );
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Dataset: ".to_string(), self.styles.label),
                Span::styled(dataset, self.styles.value),
                Span::raw("    "),
                Span::styled("Column: ".to_string(), self.styles.label),
                Span::styled(column, self.styles.value),
            ]),
            Line::from(type_spans),
            Line::styled(toggles, self.styles.muted),
        ];
        if let Some(status) = &self.status {
            lines.push(Line::styled(status.clone(), self.styles.notice));
        }
        lines
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, chart_area, footer_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        let header = Paragraph::new(self.header_lines())
            .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(header, header_area);

        let _ = self.chart_pane.draw(frame, chart_area);

        let hints = self.config.actions_to_instructions(&[
            (Mode::Main, Action::OpenChatPopup),
            (Mode::Main, Action::OpenColumnPicker),
            (Mode::Main, Action::OpenUploadDialog),
            (Mode::Main, Action::RefreshColumns),
            (Mode::Main, Action::Quit),
        ]);
        frame.render_widget(
            Paragraph::new(hints).style(self.styles.muted),
            footer_area,
        );

        if self.chat_open {
            let chat_area = centered_rect(72, 76, area);
            let _ = self.chat_dialog.draw(frame, chat_area);
        }
        if let Some(dialog) = &mut self.column_picker {
            let _ = dialog.draw(frame, centered_rect(50, 60, area));
        }
        if let Some(dialog) = &mut self.grouped_dialog {
            let _ = dialog.draw(frame, centered_rect(50, 60, area));
        }
        if let Some(dialog) = &mut self.upload_dialog {
            let _ = dialog.draw(frame, centered_rect(60, 40, area));
        }
        if let Some(dialog) = &mut self.message_dialog {
            let _ = dialog.draw(frame, area);
        }
    }
}
