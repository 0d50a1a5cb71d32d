//! Markdown-lite rendering for chat messages.
//!
//! Backend replies use a deliberately tiny marker grammar: `**bold**`,
//! `_italic_` (word-boundary only), and plain line breaks. The same grammar
//! renders two ways: to styled terminal text for the chat view, and to
//! escaped HTML for transcript export.

use lazy_static::lazy_static;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use regex::Regex;

lazy_static! {
    static ref BOLD_RE: Regex = Regex::new(r"\*\*(.+?)\*\*").unwrap();
    // Underscores inside words (a_b_c) stay literal: the marker must sit on
    // a boundary on both sides.
    static ref ITALIC_RE: Regex = Regex::new(r"(^|[\s>])_(.+?)_([\s.!?,;:]|$)").unwrap();
}

/// Escape the five HTML-significant characters. `&` goes first so the other
/// entities are not double-escaped.
pub fn escape_html(unsafe_text: &str) -> String {
    unsafe_text
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Render markdown-lite to a safe HTML fragment: escape, then bold, italic,
/// and line-break substitutions in that order.
pub fn md_to_html(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD_RE.replace_all(&escaped, "<strong>$1</strong>");
    let emphasized = ITALIC_RE.replace_all(&bolded, "$1<em>$2</em>$3");
    emphasized.replace("\r\n", "<br>").replace('\n', "<br>")
}

/// Render markdown-lite to styled terminal text. No escaping is involved:
/// a terminal buffer has no injection surface.
pub fn md_to_text(text: &str) -> Text<'static> {
    let normalized = text.replace('\r', "");
    let lines: Vec<Line<'static>> = normalized
        .split('\n')
        .map(|raw| Line::from(line_spans(raw)))
        .collect();
    Text::from(lines)
}

fn line_spans(line: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut last = 0usize;
    for caps in BOLD_RE.captures_iter(line) {
        let whole = caps.get(0).unwrap();
        if whole.start() > last {
            italic_spans(&line[last..whole.start()], &mut spans);
        }
        spans.push(Span::styled(
            caps.get(1).unwrap().as_str().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        last = whole.end();
    }
    if last < line.len() {
        italic_spans(&line[last..], &mut spans);
    }
    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    spans
}

fn italic_spans(segment: &str, out: &mut Vec<Span<'static>>) {
    let mut last = 0usize;
    for caps in ITALIC_RE.captures_iter(segment) {
        let whole = caps.get(0).unwrap();
        let lead = caps.get(1).unwrap().as_str();
        let body = caps.get(2).unwrap().as_str();
        let trail = caps.get(3).unwrap().as_str();
        if whole.start() > last {
            out.push(Span::raw(segment[last..whole.start()].to_string()));
        }
        if !lead.is_empty() {
            out.push(Span::raw(lead.to_string()));
        }
        out.push(Span::styled(
            body.to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        ));
        if !trail.is_empty() {
            out.push(Span::raw(trail.to_string()));
        }
        last = whole.end();
    }
    if last < segment.len() {
        out.push(Span::raw(segment[last..].to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_all_html_significant_characters() {
        let html = md_to_html(r#"<img src="x" onerror='alert(1)'> & more"#);
        assert_eq!(
            html,
            "&lt;img src=&quot;x&quot; onerror=&#039;alert(1)&#039;&gt; &amp; more"
        );
    }

    #[test]
    fn escaped_output_has_no_stray_specials_outside_tags() {
        let html = md_to_html("a < b > c & \"d\" 'e' **f**");
        // Strip the tags we inserted ourselves; nothing unescaped may remain.
        let stripped = html.replace("<strong>", "").replace("</strong>", "");
        assert!(!stripped.contains('<'));
        assert!(!stripped.contains('>'));
        assert!(!stripped.contains('"'));
        assert!(!stripped.contains('\''));
    }

    #[test]
    fn bold_markers_become_strong_tags() {
        assert_eq!(md_to_html("say **hi** twice"), "say <strong>hi</strong> twice");
    }

    #[test]
    fn italic_requires_word_boundaries() {
        assert_eq!(md_to_html("an _aside_ here"), "an <em>aside</em> here");
        // Underscores inside identifiers are left alone
        assert_eq!(md_to_html("snake a_b_c case"), "snake a_b_c case");
    }

    #[test]
    fn italic_matches_at_line_edges_and_punctuation() {
        assert_eq!(md_to_html("_lead_ word"), "<em>lead</em> word");
        assert_eq!(md_to_html("end _tail_"), "end <em>tail</em>");
        assert_eq!(md_to_html("so _this_."), "so <em>this</em>.");
    }

    #[test]
    fn line_breaks_become_br() {
        assert_eq!(md_to_html("a\nb\r\nc"), "a<br>b<br>c");
    }

    #[test]
    fn terminal_text_styles_bold_and_italic() {
        let text = md_to_text("plain **bold** and _soft_ end");
        assert_eq!(text.lines.len(), 1);
        let spans = &text.lines[0].spans;
        let bold = spans
            .iter()
            .find(|s| s.style.add_modifier.contains(Modifier::BOLD))
            .expect("bold span");
        assert_eq!(bold.content.as_ref(), "bold");
        let italic = spans
            .iter()
            .find(|s| s.style.add_modifier.contains(Modifier::ITALIC))
            .expect("italic span");
        assert_eq!(italic.content.as_ref(), "soft");
    }

    #[test]
    fn terminal_text_splits_lines() {
        let text = md_to_text("one\ntwo\nthree");
        assert_eq!(text.lines.len(), 3);
    }

    #[test]
    fn empty_input_yields_single_empty_line() {
        let text = md_to_text("");
        assert_eq!(text.lines.len(), 1);
    }
}
