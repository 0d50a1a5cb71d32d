//! HTTP client for the chart/analysis backend.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::types::{
    ChatOutcome, ChatRequest, ColumnsResponseBody, PlotOutcome, PlotRequest, PlotResponseBody,
    UploadOutcome, interpret_chat_body, interpret_upload_body,
};

/// Transport-level failure talking to the backend. In-band application
/// errors (an `error` field in a 2xx body) are not transport failures and
/// surface through the outcome types instead.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP {status} - {body}")]
    Http { status: u16, body: String },
    #[error("error calling API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("could not read upload file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new<S: Into<String>>(base_url: S) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chartchat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One chat round trip. 2xx bodies are classified by shape; non-2xx
    /// statuses carry the response text back for display.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatOutcome, ApiError> {
        debug!("chat request for dataset {:?}", request.dataset_id);
        let response = self
            .http
            .post(self.endpoint("/api/chat"))
            .json(request)
            .send()
            .await?;
        let response = Self::require_success(response).await?;
        let body: Value = response.json().await?;
        Ok(interpret_chat_body(body))
    }

    /// Request one or more chart images
    pub async fn plot(&self, request: &PlotRequest) -> Result<PlotOutcome, ApiError> {
        debug!("plot request: {} spec(s)", request.plots.len());
        let response = self
            .http
            .post(self.endpoint("/api/plot"))
            .json(request)
            .send()
            .await?;
        let response = Self::require_success(response).await?;
        let body: PlotResponseBody = response.json().await?;
        if let Some(message) = body.error {
            return Ok(PlotOutcome::BackendError { message });
        }
        Ok(PlotOutcome::Images(body.images.unwrap_or_default()))
    }

    /// Fetch the column names of a dataset (or of the backend's default
    /// dataset when no id is given)
    pub async fn columns(&self, dataset_id: Option<&str>) -> Result<Vec<String>, ApiError> {
        let mut request = self.http.get(self.endpoint("/api/columns"));
        if let Some(id) = dataset_id {
            request = request.query(&[("dataset_id", id)]);
        }
        let response = Self::require_success(request.send().await?).await?;
        let body: ColumnsResponseBody = response.json().await?;
        if let Some(message) = body.error {
            return Err(ApiError::Backend(message));
        }
        Ok(body.columns.unwrap_or_default())
    }

    /// Post a file as multipart form data under the `file` field and
    /// classify the response by shape
    pub async fn upload(&self, path: &Path) -> Result<UploadOutcome, ApiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::require_success(response).await?;
        let body: Value = response.json().await?;
        Ok(interpret_upload_body(body))
    }

    async fn require_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:8000/").unwrap();
        assert_eq!(client.endpoint("/api/chat"), "http://localhost:8000/api/chat");
    }

    #[test]
    fn http_error_display_carries_status_and_body() {
        let error = ApiError::Http {
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(error.to_string(), "HTTP 502 - bad gateway");
    }
}
