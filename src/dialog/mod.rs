pub mod chat_dialog;
pub mod column_picker_dialog;
pub mod grouped_columns_dialog;
pub mod message_dialog;
pub mod upload_dialog;

pub use chat_dialog::ChatDialog;
pub use column_picker_dialog::ColumnPickerDialog;
pub use grouped_columns_dialog::GroupedColumnsDialog;
pub use message_dialog::{MessageDialog, MessageKind};
pub use upload_dialog::UploadDialog;
