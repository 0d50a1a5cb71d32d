use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::Display;

use crate::api::{ChartType, ChatOutcome, PlotOutcome, UploadOutcome};

/// High-level actions that can be triggered by keys, dialogs, or completing
/// backend tasks.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
pub enum Action {
    Tick,
    Render,
    Quit,
    Suspend,
    Error(String),
    /// Close any active dialog
    DialogClose,
    ToggleInstructions,

    // Basic keys dialogs resolve through their mode bindings
    Escape,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Tab,
    Backspace,
    /// Toggle the highlighted entry in a multi-select list
    ToggleItem,
    SelectAll,
    ClearAll,
    /// Toggle "include the single selection" in the grouped modal
    ToggleIncludeSelected,

    /// Toggle the chat popup
    OpenChatPopup,
    CloseChatPopup,
    /// Open the filterable column picker
    OpenColumnPicker,
    /// Open the multi-column grouped selection modal
    OpenGroupedColumns,
    /// Open the dataset upload dialog
    OpenUploadDialog,
    /// Re-fetch the column directory for the active dataset
    RefreshColumns,
    ToggleShowValues,
    ToggleAutoAnalyze,

    /// User chose a chart type from the strip
    SelectChartType(ChartType),
    /// User confirmed the grouped modal with a deduplicated column set
    GroupedColumnsApplied(Vec<String>),
    /// User committed a column selection in the picker
    ColumnSelected(String),
    /// User submitted a chat prompt (typed, suggestion, or auto-analyze)
    ChatPromptSubmitted(String),
    /// One of the canned follow-up prompts in the chat popup
    SuggestPrompt(usize),
    /// Copy the last bot reply to the system clipboard
    CopyLastReply,
    /// Export the chat transcript as an HTML file
    ExportTranscript,
    /// User confirmed the upload dialog with a file path
    UploadRequested(PathBuf),

    // Completions sent back by spawned backend tasks. Tokens tie them to
    // the pending slot that started them; stale tokens are discarded.
    ChatFinished {
        token: u64,
        outcome: ChatOutcome,
    },
    PlotFinished {
        token: u64,
        outcome: PlotOutcome,
    },
    UploadFinished {
        outcome: UploadOutcome,
    },
    /// Column fetch result; failures arrive as an empty list
    ColumnsFetched(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_display() {
        let a1 = Action::DialogClose;
        let a2 = Action::SelectChartType(ChartType::Count);
        assert!(!format!("{a1}").is_empty());
        assert!(!format!("{a2}").is_empty());
    }

    #[test]
    fn payload_actions_round_trip_through_json5() {
        let parsed: Action = json5::from_str(r#"{ "SelectChartType": "hist" }"#).unwrap();
        assert_eq!(parsed, Action::SelectChartType(ChartType::Histogram));
        let unit: Action = json5::from_str("\"Quit\"").unwrap();
        assert_eq!(unit, Action::Quit);
    }
}
