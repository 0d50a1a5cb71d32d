use ratatui::layout::{Constraint, Layout, Rect};

/// Content/instructions split used by every dialog
pub struct DialogLayout {
    pub content_area: Rect,
    pub instructions_area: Option<Rect>,
}

/// Reserve a wrapped instructions strip at the bottom of a dialog.
/// When instructions are hidden the full area is content.
pub fn split_dialog_area(
    area: Rect,
    show_instructions: bool,
    instructions: Option<&str>,
) -> DialogLayout {
    let Some(instructions) = instructions.filter(|_| show_instructions) else {
        return DialogLayout {
            content_area: area,
            instructions_area: None,
        };
    };
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;
    let wrapped_lines = textwrap::wrap(instructions, wrap_width).len() as u16;
    let instructions_height = wrapped_lines.max(1) + 2;
    let [content_area, instructions_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(instructions_height),
    ])
    .areas(area);
    DialogLayout {
        content_area,
        instructions_area: Some(instructions_area),
    }
}

/// Centered overlay rectangle, sized as a percentage of the parent area
pub fn centered_rect(percent_w: u16, percent_h: u16, area: Rect) -> Rect {
    let width = (area.width * percent_w) / 100;
    let height = (area.height * percent_h) / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width,
        height,
    }
}
