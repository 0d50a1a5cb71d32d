//! Wire types for the chart/analysis backend.
//!
//! The backend is an external collaborator; everything here mirrors its
//! observed request and response shapes. Responses are lenient by design:
//! fields are optional and bodies are interpreted by shape, never rejected
//! for carrying extras.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

/// Chart aggregation selector. Wire names are fixed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChartType {
    Count,
    Percent,
    #[serde(rename = "hist")]
    #[strum(serialize = "hist")]
    Histogram,
    Grouped,
}

impl ChartType {
    pub const ALL: [ChartType; 4] = [
        ChartType::Count,
        ChartType::Percent,
        ChartType::Histogram,
        ChartType::Grouped,
    ];

    /// Human label for the chart-type strip
    pub fn label(&self) -> &'static str {
        match self {
            ChartType::Count => "Count",
            ChartType::Percent => "Percent",
            ChartType::Histogram => "Histogram",
            ChartType::Grouped => "Grouped",
        }
    }
}

/// `POST /api/chat` request body. Missing context fields are sent as null,
/// matching what the backend expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub image: Option<String>,
    pub selected_col: Option<String>,
    pub plot_type: Option<ChartType>,
    pub dataset_id: Option<String>,
}

/// `POST /api/plot` request body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRequest {
    pub plots: Vec<PlotSpec>,
    pub dataset_id: Option<String>,
}

/// One requested chart. Single-column charts send `col`, grouped charts send
/// `cols`; the two are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub show_values: bool,
}

impl PlotSpec {
    pub fn single(col: impl Into<String>, chart_type: ChartType, show_values: bool) -> Self {
        Self {
            col: Some(col.into()),
            cols: None,
            chart_type,
            show_values,
        }
    }

    pub fn grouped(cols: Vec<String>, show_values: bool) -> Self {
        Self {
            col: None,
            cols: Some(cols),
            chart_type: ChartType::Grouped,
            show_values,
        }
    }
}

/// Interpreted result of one chat round trip. Transport failures are folded
/// in by the caller so a completion action can carry any outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatOutcome {
    /// A reply to render, optionally with a chart image side effect
    Reply {
        text: String,
        image_url: Option<String>,
    },
    /// In-band `error` field from an otherwise successful response
    BackendError { message: String },
    /// The `{error, constructed}` diagnostic shape: the backend AI is not
    /// configured and echoes the prompt it would have sent
    Unconfigured { constructed_prompt: String },
    /// Non-2xx status or connection failure
    TransportError { message: String },
}

/// Interpreted result of one plot round trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlotOutcome {
    Images(Vec<String>),
    BackendError { message: String },
    TransportError { message: String },
}

/// Upload responses are classified by shape, not by a type tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UploadOutcome {
    /// A new dataset was registered; its columns replace the directory
    DatasetRegistered {
        dataset_id: String,
        original_filename: Option<String>,
        columns: Vec<String>,
    },
    /// An auxiliary mapping file was accepted; columns must be re-fetched
    AuxiliaryAccepted {
        filename: Option<String>,
        message: Option<String>,
    },
    /// Generic success echo
    Accepted {
        filename: Option<String>,
        columns: Option<Vec<String>>,
    },
    Failed { message: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct ColumnsResponseBody {
    pub columns: Option<Vec<String>>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlotResponseBody {
    pub images: Option<Vec<String>>,
    pub error: Option<String>,
}

/// Classify a 2xx chat body. Precedence: `constructed` diagnostic, then
/// in-band error, then reply (falling back to the raw JSON when the backend
/// echoes something unexpected).
pub fn interpret_chat_body(body: Value) -> ChatOutcome {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        if let Some(constructed) = body.get("constructed") {
            let constructed_prompt = constructed
                .get("user")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| constructed.to_string());
            return ChatOutcome::Unconfigured { constructed_prompt };
        }
        return ChatOutcome::BackendError {
            message: error.to_string(),
        };
    }
    let image_url = body
        .get("image_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    let text = match body.get("reply").and_then(Value::as_str) {
        Some(reply) => reply.to_string(),
        None => body.to_string(),
    };
    ChatOutcome::Reply { text, image_url }
}

/// Classify a 2xx upload body by shape
pub fn interpret_upload_body(body: Value) -> UploadOutcome {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return UploadOutcome::Failed {
            message: error.to_string(),
        };
    }
    if let Some(dataset_id) = body.get("dataset_id").and_then(Value::as_str) {
        return UploadOutcome::DatasetRegistered {
            dataset_id: dataset_id.to_string(),
            original_filename: body
                .get("original_filename")
                .and_then(Value::as_str)
                .map(str::to_string),
            columns: string_list(body.get("columns")),
        };
    }
    if body.get("status").and_then(Value::as_str) == Some("ok") {
        return UploadOutcome::AuxiliaryAccepted {
            filename: body.get("filename").and_then(Value::as_str).map(str::to_string),
            message: body.get("message").and_then(Value::as_str).map(str::to_string),
        };
    }
    UploadOutcome::Accepted {
        filename: body
            .get("original_filename")
            .or_else(|| body.get("filename"))
            .and_then(Value::as_str)
            .map(str::to_string),
        columns: body.get("columns").map(|v| string_list(Some(v))),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// A displayable chart image. Backends return either a bare base64 PNG
/// payload, a full data URI, or an absolute URL; bare payloads are
/// normalized into data URIs before anything renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSource {
    DataUri(String),
    Url(String),
}

impl ImageSource {
    pub fn normalize(raw: &str) -> Self {
        if raw.starts_with("data:image") {
            ImageSource::DataUri(raw.to_string())
        } else if raw.starts_with("http") {
            ImageSource::Url(raw.to_string())
        } else {
            ImageSource::DataUri(format!("data:image/png;base64,{raw}"))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageSource::DataUri(s) | ImageSource::Url(s) => s,
        }
    }

    /// Decode the PNG payload of a base64 data URI. URLs and malformed
    /// payloads yield None.
    pub fn png_bytes(&self) -> Option<Vec<u8>> {
        use base64::Engine as _;
        let ImageSource::DataUri(uri) = self else {
            return None;
        };
        let (_, payload) = uri.split_once(";base64,")?;
        base64::engine::general_purpose::STANDARD.decode(payload).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn chart_type_wire_names() {
        assert_eq!(serde_json::to_string(&ChartType::Count).unwrap(), "\"count\"");
        assert_eq!(serde_json::to_string(&ChartType::Histogram).unwrap(), "\"hist\"");
        assert_eq!(ChartType::Histogram.to_string(), "hist");
        assert_eq!(ChartType::Grouped.to_string(), "grouped");
    }

    #[test]
    fn single_plot_spec_serializes_col_only() {
        let spec = PlotSpec::single("Age", ChartType::Count, true);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({"col": "Age", "type": "count", "show_values": true})
        );
    }

    #[test]
    fn grouped_plot_spec_serializes_cols_only() {
        let spec = PlotSpec::grouped(vec!["A".into(), "B".into()], false);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({"cols": ["A", "B"], "type": "grouped", "show_values": false})
        );
    }

    #[test]
    fn chat_request_sends_missing_context_as_null() {
        let request = ChatRequest {
            prompt: "hi".into(),
            image: None,
            selected_col: None,
            plot_type: None,
            dataset_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["image"], Value::Null);
        assert_eq!(value["selected_col"], Value::Null);
    }

    #[test]
    fn chat_reply_with_image_side_effect() {
        let outcome = interpret_chat_body(json!({"reply": "done", "image_url": "http://x/y.png"}));
        assert_eq!(
            outcome,
            ChatOutcome::Reply {
                text: "done".into(),
                image_url: Some("http://x/y.png".into())
            }
        );
    }

    #[test]
    fn chat_reply_falls_back_to_raw_json() {
        let outcome = interpret_chat_body(json!({"unexpected": 1}));
        match outcome {
            ChatOutcome::Reply { text, image_url } => {
                assert!(text.contains("unexpected"));
                assert_eq!(image_url, None);
            }
            other => panic!("expected Reply, got {other:?}"),
        }
    }

    #[test]
    fn chat_error_with_constructed_prompt_is_diagnostic() {
        let body = json!({"error": "x", "constructed": {"user": "prompt text"}});
        assert_eq!(
            interpret_chat_body(body),
            ChatOutcome::Unconfigured {
                constructed_prompt: "prompt text".into()
            }
        );
    }

    #[test]
    fn chat_constructed_without_user_field_echoes_json() {
        let body = json!({"error": "x", "constructed": {"system": "s"}});
        match interpret_chat_body(body) {
            ChatOutcome::Unconfigured { constructed_prompt } => {
                assert!(constructed_prompt.contains("system"));
            }
            other => panic!("expected Unconfigured, got {other:?}"),
        }
    }

    #[test]
    fn chat_plain_error_is_backend_error() {
        assert_eq!(
            interpret_chat_body(json!({"error": "nope"})),
            ChatOutcome::BackendError {
                message: "nope".into()
            }
        );
    }

    #[test]
    fn upload_dataset_shape_registers_dataset() {
        let body = json!({"dataset_id": "d1", "original_filename": "t.csv", "columns": ["A", "B"]});
        assert_eq!(
            interpret_upload_body(body),
            UploadOutcome::DatasetRegistered {
                dataset_id: "d1".into(),
                original_filename: Some("t.csv".into()),
                columns: vec!["A".into(), "B".into()],
            }
        );
    }

    #[test]
    fn upload_ok_status_is_auxiliary() {
        let body = json!({"status": "ok", "filename": "map.docx", "message": "mapping stored"});
        assert_eq!(
            interpret_upload_body(body),
            UploadOutcome::AuxiliaryAccepted {
                filename: Some("map.docx".into()),
                message: Some("mapping stored".into()),
            }
        );
    }

    #[test]
    fn upload_other_shapes_echo() {
        let body = json!({"filename": "x.bin"});
        assert_eq!(
            interpret_upload_body(body),
            UploadOutcome::Accepted {
                filename: Some("x.bin".into()),
                columns: None,
            }
        );
    }

    #[test]
    fn bare_base64_normalizes_to_data_uri() {
        let source = ImageSource::normalize("iVBORw0KGgoAAAANSUhEUg");
        assert!(source.as_str().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn data_uris_and_urls_pass_through() {
        let uri = "data:image/png;base64,AAAA";
        assert_eq!(ImageSource::normalize(uri).as_str(), uri);
        let url = "https://charts.example/c.png";
        assert_eq!(ImageSource::normalize(url), ImageSource::Url(url.into()));
    }

    #[test]
    fn png_bytes_round_trip() {
        use base64::Engine as _;
        let payload = base64::engine::general_purpose::STANDARD.encode([0x89, 0x50, 0x4e, 0x47]);
        let source = ImageSource::normalize(&payload);
        assert_eq!(source.png_bytes(), Some(vec![0x89, 0x50, 0x4e, 0x47]));
        assert_eq!(ImageSource::Url("http://x".into()).png_bytes(), None);
    }
}
