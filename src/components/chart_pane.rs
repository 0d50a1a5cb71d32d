//! Chart pane: the region of the main view that shows rendered charts,
//! the request spinner, and inline plot errors.
//!
//! Terminals cannot display raster images, so each chart arriving as a
//! base64 data URI is written out as a PNG under the data directory and the
//! pane lists what was rendered; URL sources are listed as-is.

use std::path::PathBuf;

use color_eyre::Result;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::api::ImageSource;
use crate::components::Component;
use crate::style::StyleConfig;

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// One chart the backend returned, after normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub source: ImageSource,
    /// Where the decoded PNG landed, for data-URI sources
    pub path: Option<PathBuf>,
    pub byte_len: Option<usize>,
}

impl RenderedChart {
    fn describe(&self) -> String {
        match (&self.path, &self.source) {
            (Some(path), _) => {
                let size = self
                    .byte_len
                    .map(|len| format!(" ({len} bytes)"))
                    .unwrap_or_default();
                format!("saved {}{size}", path.display())
            }
            (None, ImageSource::Url(url)) => format!("remote {url}"),
            (None, ImageSource::DataUri(_)) => "data URI (payload not decodable)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
enum PaneContent {
    #[default]
    Empty,
    Charts(Vec<RenderedChart>),
    /// Backend reported success but sent no images
    NoImages,
    Error(String),
}

#[derive(Debug, Default)]
pub struct ChartPane {
    styles: StyleConfig,
    content: PaneContent,
    loading: bool,
    spinner_tick: usize,
}

impl ChartPane {
    pub fn new(styles: StyleConfig) -> Self {
        Self {
            styles,
            content: PaneContent::Empty,
            loading: false,
            spinner_tick: 0,
        }
    }

    /// Show or clear the spinner overlay. Cleared unconditionally on every
    /// completion path.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if !loading {
            self.spinner_tick = 0;
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Advance the spinner animation
    pub fn tick(&mut self) {
        if self.loading {
            self.spinner_tick = self.spinner_tick.wrapping_add(1);
        }
    }

    pub fn show_charts(&mut self, charts: Vec<RenderedChart>) {
        self.content = if charts.is_empty() {
            PaneContent::NoImages
        } else {
            PaneContent::Charts(charts)
        };
    }

    pub fn show_error(&mut self, message: String) {
        self.content = PaneContent::Error(message);
    }

    pub fn has_charts(&self) -> bool {
        matches!(self.content, PaneContent::Charts(_))
    }

    pub fn has_error(&self) -> bool {
        matches!(self.content, PaneContent::Error(_))
    }

    fn body_lines(&self) -> Vec<Line<'static>> {
        match &self.content {
            PaneContent::Empty => vec![Line::styled(
                "No chart yet. Pick a column and a chart type.",
                self.styles.muted,
            )],
            PaneContent::NoImages => {
                vec![Line::styled("No images returned", self.styles.muted)]
            }
            PaneContent::Error(message) => vec![
                Line::styled("Plot request failed", self.styles.error),
                Line::styled(message.clone(), self.styles.error),
            ],
            PaneContent::Charts(charts) => charts
                .iter()
                .enumerate()
                .map(|(i, chart)| {
                    Line::from(vec![
                        Span::styled(format!("chart {}: ", i + 1), self.styles.label),
                        Span::styled(chart.describe(), self.styles.value),
                    ])
                })
                .collect(),
        }
    }
}

impl Component for ChartPane {
    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let block = Block::default().title("Charts").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let body = Paragraph::new(self.body_lines()).wrap(Wrap { trim: true });
        frame.render_widget(body, inner);

        if self.loading && inner.height > 0 {
            let frame_glyph = SPINNER_FRAMES[self.spinner_tick % SPINNER_FRAMES.len()];
            let overlay = Line::styled(
                format!("{frame_glyph} rendering chart..."),
                self.styles.notice,
            );
            let overlay_area = Rect {
                x: inner.x,
                y: inner.y + inner.height / 2,
                width: inner.width,
                height: 1,
            };
            frame.render_widget(
                Paragraph::new(overlay).alignment(Alignment::Center),
                overlay_area,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(path: Option<&str>) -> RenderedChart {
        RenderedChart {
            source: ImageSource::normalize("AAAA"),
            path: path.map(PathBuf::from),
            byte_len: Some(3),
        }
    }

    #[test]
    fn empty_image_list_shows_notice() {
        let mut pane = ChartPane::new(StyleConfig::default());
        pane.show_charts(vec![]);
        assert_eq!(pane.content, PaneContent::NoImages);
        assert!(!pane.has_charts());
    }

    #[test]
    fn error_replaces_charts() {
        let mut pane = ChartPane::new(StyleConfig::default());
        pane.show_charts(vec![chart(Some("a.png"))]);
        assert!(pane.has_charts());
        pane.show_error("boom".into());
        assert!(pane.has_error());
        assert!(!pane.has_charts());
    }

    #[test]
    fn loading_clears_on_completion_and_resets_spinner() {
        let mut pane = ChartPane::new(StyleConfig::default());
        pane.set_loading(true);
        pane.tick();
        pane.tick();
        assert!(pane.is_loading());
        pane.set_loading(false);
        assert!(!pane.is_loading());
        assert_eq!(pane.spinner_tick, 0);
    }

    #[test]
    fn chart_description_mentions_saved_path() {
        let described = chart(Some("charts/c1.png")).describe();
        assert!(described.contains("charts/c1.png"));
        assert!(described.contains("3 bytes"));
    }
}
